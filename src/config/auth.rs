use std::fmt;
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::MAX_SESSION_TTL;
use crate::error::{Error, Result};

const DEFAULT_TENANT: &str = "admin";
const DEFAULT_SESSION_TTL_SECONDS: u64 = 24 * 60 * 60;
const DEFAULT_ANONYMOUS_SESSION_TTL_SECONDS: u64 = 60 * 60;
const DEFAULT_ANONYMOUS_DISPLAY_NAME: &str = "User";

/// Identity provider credentials and access-mode settings, loaded from TOML.
///
/// ```toml
/// endpoint = "https://door.example.com"
/// client_id = "0ba528121ea87b3eb54d"
/// client_secret = "..."
/// organization = "built-in"
/// application = "app-chat"
/// public_key_path = "token_jwt_key.pem"
/// public_domain = "chat.example.com"
/// trusted_proxies = ["127.0.0.1"]
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Base URL of the identity provider.
    pub endpoint: String,
    pub client_id: String,
    pub client_secret: String,
    /// Identity provider organization; anonymous principals are created under it.
    pub organization: String,
    pub application: String,
    /// PEM-encoded RSA public key used to verify identity tokens.
    pub public_key: Option<String>,
    /// Alternative to `public_key`. Relative paths resolve against the config file.
    pub public_key_path: Option<PathBuf>,
    /// Host name that serves anonymous visitors. Empty disables public mode.
    pub public_domain: String,
    /// Storage namespace that owns conversations, messages and store configs.
    pub tenant: String,
    pub session_ttl_seconds: u64,
    pub anonymous_session_ttl_seconds: u64,
    pub anonymous_display_name: String,
    pub anonymous_avatar: String,
    /// Peers whose `X-Forwarded-For` / `X-Real-IP` headers are believed.
    pub trusted_proxies: Vec<IpAddr>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            organization: String::new(),
            application: String::new(),
            public_key: None,
            public_key_path: None,
            public_domain: String::new(),
            tenant: DEFAULT_TENANT.to_string(),
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            anonymous_session_ttl_seconds: DEFAULT_ANONYMOUS_SESSION_TTL_SECONDS,
            anonymous_display_name: DEFAULT_ANONYMOUS_DISPLAY_NAME.to_string(),
            anonymous_avatar: String::new(),
            trusted_proxies: Vec::new(),
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("endpoint", &self.endpoint)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("organization", &self.organization)
            .field("application", &self.application)
            .field("public_key_path", &self.public_key_path)
            .field("public_domain", &self.public_domain)
            .field("tenant", &self.tenant)
            .field("session_ttl_seconds", &self.session_ttl_seconds)
            .field("anonymous_session_ttl_seconds", &self.anonymous_session_ttl_seconds)
            .field("trusted_proxies", &self.trusted_proxies)
            .finish_non_exhaustive()
    }
}

impl AuthConfig {
    /// Reads and validates a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let mut config = Self::from_toml_str(&content)?;

        let resolved = match (&config.public_key_path, path.parent()) {
            (Some(key_path), Some(dir)) if key_path.is_relative() => Some(dir.join(key_path)),
            _ => None,
        };
        if resolved.is_some() {
            config.public_key_path = resolved;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(Error::Config("endpoint is required".into()));
        }
        if self.client_id.trim().is_empty() {
            return Err(Error::Config("client_id is required".into()));
        }
        if self.organization.trim().is_empty() {
            return Err(Error::Config("organization is required".into()));
        }
        if self.tenant.trim().is_empty() {
            return Err(Error::Config("tenant cannot be empty".into()));
        }
        if self.public_key.is_none() && self.public_key_path.is_none() {
            return Err(Error::Config(
                "one of public_key or public_key_path is required".into(),
            ));
        }
        check_ttl("session_ttl_seconds", self.session_ttl_seconds)?;
        check_ttl(
            "anonymous_session_ttl_seconds",
            self.anonymous_session_ttl_seconds,
        )?;
        Ok(())
    }

    /// The verification key material, read from disk when configured by path.
    pub fn public_key_pem(&self) -> Result<String> {
        if let Some(pem) = &self.public_key {
            return Ok(pem.clone());
        }
        let path = self
            .public_key_path
            .as_ref()
            .ok_or_else(|| Error::Config("no public key configured".into()))?;
        fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))
    }

    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_seconds)
    }

    #[must_use]
    pub fn anonymous_session_ttl(&self) -> Duration {
        Duration::from_secs(self.anonymous_session_ttl_seconds)
    }

    #[must_use]
    pub fn public_mode_enabled(&self) -> bool {
        !self.public_domain.is_empty()
    }
}

fn check_ttl(field: &str, seconds: u64) -> Result<()> {
    let max = MAX_SESSION_TTL.as_secs();
    if seconds == 0 || seconds > max {
        return Err(Error::Config(format!(
            "{field} must be between 1 and {max}, got {seconds}"
        )));
    }
    Ok(())
}
