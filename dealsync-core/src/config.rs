//! Service configuration.
//!
//! # Sources
//!
//! ```text
//! --config <file>                      (explicit YAML file)
//! <config_dir>/dealsync/config.yaml    (default YAML file, if present)
//! environment                          (B24_ID, B24_KEY, ...)
//! ```
//!
//! The first source that exists wins; sources are never merged.
//!
//! # API pattern
//!
//! As with file lookups elsewhere, every function that touches the outside
//! world has an explicit form (`load_at`, `from_vars`, `resolve_at`) used in
//! tests, and a convenience wrapper that reads the real environment.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const ENV_PORTAL: &str = "B24_ID";
pub const ENV_WEBHOOK_KEY: &str = "B24_KEY";
pub const ENV_USER_ID: &str = "B24_USER_ID";
pub const ENV_DOMAIN: &str = "B24_DOMAIN";
pub const ENV_TIMEOUT_SECS: &str = "B24_TIMEOUT_SECS";
pub const ENV_BIND: &str = "DEALSYNC_BIND";

pub const DEFAULT_DOMAIN: &str = "bitrix24.ru";
pub const DEFAULT_BIND: &str = "127.0.0.1:8000";

/// Connection details of the CRM inbound webhook.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrmSettings {
    /// Portal name, the first label of the CRM host name.
    pub portal: String,
    /// Secret part of the inbound webhook URL.
    pub webhook_key: String,
    #[serde(default = "default_user_id")]
    pub user_id: u32,
    #[serde(default = "default_domain")]
    pub domain: String,
    /// Overall per-request timeout. `None` keeps the HTTP agent default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl CrmSettings {
    /// `https://<portal>.<domain>/rest/<user_id>/<webhook_key>`
    pub fn base_url(&self) -> String {
        format!(
            "https://{}.{}/rest/{}/{}",
            self.portal, self.domain, self.user_id, self.webhook_key
        )
    }
}

impl fmt::Debug for CrmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrmSettings")
            .field("portal", &self.portal)
            .field("webhook_key", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("domain", &self.domain)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl ServerSettings {
    /// Build server settings from a variable lookup function. A blank bind
    /// falls back to [`DEFAULT_BIND`].
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            bind: non_blank(&lookup, ENV_BIND).unwrap_or_else(default_bind),
        }
    }

    /// `from_vars` over the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Root of the configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub crm: CrmSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

impl Settings {
    /// Load settings from a YAML file.
    ///
    /// Returns `ConfigError::Parse` (with path + line context) if malformed.
    pub fn load_at(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Build settings from a variable lookup function.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| non_blank(&lookup, name);

        let portal = var(ENV_PORTAL).ok_or(ConfigError::MissingVar(ENV_PORTAL))?;
        let webhook_key = var(ENV_WEBHOOK_KEY).ok_or(ConfigError::MissingVar(ENV_WEBHOOK_KEY))?;
        let user_id = match var(ENV_USER_ID) {
            Some(raw) => parse_var(ENV_USER_ID, raw)?,
            None => default_user_id(),
        };
        let timeout_secs = var(ENV_TIMEOUT_SECS)
            .map(|raw| parse_var(ENV_TIMEOUT_SECS, raw))
            .transpose()?;

        Ok(Self {
            crm: CrmSettings {
                portal,
                webhook_key,
                user_id,
                domain: var(ENV_DOMAIN).unwrap_or_else(default_domain),
                timeout_secs,
            },
            server: ServerSettings::from_vars(&lookup),
        })
    }

    /// `from_vars` over the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Pick the first available source: explicit file, default file under
    /// `config_dir`, then the process environment.
    pub fn resolve_at(explicit: Option<&Path>, config_dir: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_at(path);
        }
        if let Some(dir) = config_dir {
            let path = default_path_in(dir);
            if path.exists() {
                return Self::load_at(&path);
            }
        }
        Self::from_env()
    }

    /// `resolve_at` using the user's config directory.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config_dir = dirs::config_dir();
        Self::resolve_at(explicit, config_dir.as_deref())
    }
}

/// `<config_dir>/dealsync/config.yaml`: pure, no I/O.
pub fn default_path_in(config_dir: &Path) -> PathBuf {
    config_dir.join("dealsync").join("config.yaml")
}

/// Default config file location for the current user.
pub fn default_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| default_path_in(&dir))
        .ok_or(ConfigError::ConfigDirNotFound)
}

fn non_blank<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).filter(|value| !value.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &'static str, raw: String) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidVar { name, value: raw })
}

fn default_user_id() -> u32 {
    1
}

fn default_domain() -> String {
    DEFAULT_DOMAIN.to_owned()
}

fn default_bind() -> String {
    DEFAULT_BIND.to_owned()
}
