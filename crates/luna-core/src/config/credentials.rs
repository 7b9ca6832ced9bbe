use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variables checked for the completion-service key, in order.
const KEY_ENV_VARS: &[&str] = &["LUNA_API_KEY", "OPENROUTER_API_KEY"];

/// Secret material for the completion service.
///
/// The key is never compiled in. It comes from the environment (a `.env` file
/// is honored by the binaries) or from `~/.luna/credentials.json`, which the
/// onboarding prompt writes with owner-only permissions.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    pub api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &if self.api_key.is_empty() { "<empty>" } else { "<redacted>" })
            .finish()
    }
}

impl Credentials {
    pub fn path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".luna")
            .join("credentials.json")
    }

    /// Environment first, then the credentials file.
    pub fn load() -> Result<Option<Self>> {
        if let Some(creds) = Self::from_env() {
            return Ok(Some(creds));
        }
        Self::load_from(&Self::path())
    }

    pub fn from_env() -> Option<Self> {
        KEY_ENV_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty())
            .map(|api_key| Self { api_key })
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(path)?;
        let creds: Credentials = serde_json::from_str(&data)?;
        Ok(Some(creds))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}
