//! Optional TOML configuration for the daemon
//!
//! Values resolve in order: built-in default, then `skiffd.toml` (or an
//! explicit `--config` path), then command-line flags.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_BIND: &str = "0.0.0.0:9030";
pub const DEFAULT_ROOT: &str = "hosted";
const CONFIG_FILE: &str = "skiffd.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfig {
    /// Bind address (host:port).
    pub bind: Option<String>,
    /// Directory to serve.
    pub root: Option<PathBuf>,
    /// Timestamped text log destination.
    pub log_file: Option<PathBuf>,
}

impl DaemonConfig {
    /// Load an explicit config file; a broken file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parse config {}", path.display()))
    }

    /// Load `skiffd.toml` from the working directory if present.
    pub fn load_default() -> Result<Self> {
        let path = PathBuf::from(CONFIG_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let c: DaemonConfig = toml::from_str(
            r#"
            bind = "127.0.0.1:4044"
            root = "/srv/files"
            log_file = "/var/log/skiffd.log"
            "#,
        )
        .unwrap();
        assert_eq!(c.bind.as_deref(), Some("127.0.0.1:4044"));
        assert_eq!(c.root.as_deref(), Some(Path::new("/srv/files")));
        assert!(c.log_file.is_some());
    }

    #[test]
    fn empty_config_is_all_defaults() {
        let c: DaemonConfig = toml::from_str("").unwrap();
        assert!(c.bind.is_none() && c.root.is_none() && c.log_file.is_none());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<DaemonConfig>("prot = 9030").is_err());
    }
}
