//! Target DTOs

use serde::{Deserialize, Serialize};

/// Request to register a new target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTarget {
    pub url: String,
}
