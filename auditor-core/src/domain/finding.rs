//! Finding domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// One normalized vulnerability record produced by a scanner for a job
///
/// Findings are created server-side while the job runs and never change
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub id: Uuid,
    pub job_id: Uuid,
    pub severity: Severity,
    pub title: String,
    pub description: Option<String>,
    pub evidence: Option<String>,
    pub recommendation: Option<String>,
    pub tool: String,
    pub created_at: DateTime<Utc>,
}

/// Ordinal risk classification, `Info < Low < Medium < High < Critical`
///
/// The wire format is lowercase. Uppercase spellings are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Info,
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// Uppercase label used in listings
    pub fn label(self) -> String {
        self.as_str().to_ascii_uppercase()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl Finding {
    /// Orders findings most severe first, newest first within a severity
    pub fn sort_for_display(findings: &mut [Finding]) {
        findings.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(severity: Severity, minutes: i64) -> Finding {
        Finding {
            id: Uuid::new_v4(),
            job_id: Uuid::nil(),
            severity,
            title: format!("{} issue", severity),
            description: None,
            evidence: None,
            recommendation: None,
            tool: "Nuclei".to_string(),
            created_at: DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::minutes(minutes),
        }
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Info < Severity::Low);
        assert!(Severity::High < Severity::Critical);
        assert_eq!(Severity::ALL.iter().max(), Some(&Severity::Critical));
    }

    #[test]
    fn test_severity_accepts_both_cases() {
        let lower: Severity = serde_json::from_str("\"medium\"").unwrap();
        let upper: Severity = serde_json::from_str("\"MEDIUM\"").unwrap();
        assert_eq!(lower, upper);
        assert_eq!(serde_json::to_string(&upper).unwrap(), "\"medium\"");
        assert!(serde_json::from_str::<Severity>("\"severe\"").is_err());
    }

    #[test]
    fn test_sort_for_display() {
        let mut findings = vec![
            finding(Severity::Low, 1),
            finding(Severity::Critical, 1),
            finding(Severity::Low, 5),
            finding(Severity::Info, 9),
        ];

        Finding::sort_for_display(&mut findings);

        let order: Vec<_> = findings
            .iter()
            .map(|f| (f.severity, f.created_at.timestamp() / 60))
            .collect();
        assert_eq!(
            order,
            vec![
                (Severity::Critical, 1),
                (Severity::Low, 5),
                (Severity::Low, 1),
                (Severity::Info, 9),
            ]
        );
    }
}
