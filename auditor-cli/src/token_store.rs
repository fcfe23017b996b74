//! File-backed token storage
//!
//! The session token lives in a single file named after its storage key.
//! Storage failures are logged and treated as "no token": the worst outcome
//! is having to log in again.

use auditor_sync::TokenStore;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Storage key of the session token
pub const TOKEN_KEY: &str = "auditor_web_token";

/// Token store persisting to a file
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Default token file path
    /// - `<config dir>/auditor/auditor_web_token` where a config dir exists
    /// - `~/.config/auditor/auditor_web_token` otherwise
    pub fn default_path() -> PathBuf {
        let dir = if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("auditor")
        } else if let Some(home_dir) = dirs::home_dir() {
            home_dir.join(".config").join("auditor")
        } else {
            PathBuf::from(".auditor")
        };
        dir.join(TOKEN_KEY)
    }

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, token: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, token)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                (!token.is_empty()).then(|| token.to_string())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(err) => {
                warn!("Cannot read token file {}: {}", self.path.display(), err);
                None
            }
        }
    }

    fn save(&self, token: &str) {
        match self.write(token) {
            Ok(()) => debug!("Token saved to {}", self.path.display()),
            Err(err) => warn!("Cannot write token file {}: {}", self.path.display(), err),
        }
    }

    fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("Token removed from {}", self.path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => warn!("Cannot remove token file {}: {}", self.path.display(), err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_store() -> FileTokenStore {
        let dir = std::env::temp_dir().join(format!("auditor-test-{}", Uuid::new_v4()));
        FileTokenStore::new(dir.join(TOKEN_KEY))
    }

    #[test]
    fn test_missing_file_means_no_token() {
        let store = temp_store();
        assert_eq!(store.load(), None);
        store.clear();
    }

    #[test]
    fn test_save_load_clear() {
        let store = temp_store();

        store.save("eyJhbGciOiJIUzI1NiJ9.payload.sig");
        assert_eq!(
            store.load().as_deref(),
            Some("eyJhbGciOiJIUzI1NiJ9.payload.sig")
        );

        store.clear();
        assert_eq!(store.load(), None);
        assert!(!store.path().exists());

        if let Some(parent) = store.path().parent() {
            let _ = fs::remove_dir_all(parent);
        }
    }

    #[test]
    fn test_blank_file_is_ignored() {
        let store = temp_store();
        store.save("  \n");
        assert_eq!(store.load(), None);

        if let Some(parent) = store.path().parent() {
            let _ = fs::remove_dir_all(parent);
        }
    }
}
