//! Configuration file handling.
//!
//! Two locations are merged, later entries winning:
//!
//! 1. The per-user file under the platform config directory
//!    (e.g. `~/.config/promflash/config.toml` on Linux)
//! 2. `./promflash.toml` in the current directory
//!
//! All keys are optional; CLI flags override both files.
//!
//! ```toml
//! [connection]
//! port = "/dev/ttyUSB0"
//!
//! [transfer]
//! verify_idle_ms = 500
//! settle_ms = 2000
//! ```

use directories::ProjectDirs;
use log::{debug, warn};
use serde::Deserialize;
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Config {
    /// Serial connection defaults.
    pub connection: ConnectionSection,
    /// Transfer timing defaults.
    pub transfer: TransferSection,
}

/// `[connection]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ConnectionSection {
    /// Default serial port.
    pub port: Option<String>,
}

/// `[transfer]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct TransferSection {
    /// Verify inactivity threshold in milliseconds.
    pub verify_idle_ms: Option<u64>,
    /// Settle delay after opening the port, in milliseconds.
    pub settle_ms: Option<u64>,
}

impl Config {
    /// Load configuration from the standard locations. Missing files are
    /// normal; malformed ones are reported and skipped so one bad file
    /// never bricks the tool.
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(dirs) = ProjectDirs::from("", "", "promflash") {
            let global = dirs.config_dir().join("config.toml");
            if let Some(loaded) = Self::read_file(&global) {
                config.merge(loaded);
            }
        }

        let local = Path::new("promflash.toml");
        if let Some(loaded) = Self::read_file(local) {
            config.merge(loaded);
        }

        config
    }

    /// Load configuration from an explicit path only.
    pub fn load_from_path(path: &Path) -> Self {
        Self::read_file(path).unwrap_or_else(|| {
            warn!("Config file '{}' could not be loaded", path.display());
            Self::default()
        })
    }

    fn read_file(path: &Path) -> Option<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Can't read config file '{}': {e}", path.display());
                return None;
            },
        };
        match toml::from_str(&text) {
            Ok(config) => {
                debug!("Loaded config from '{}'", path.display());
                Some(config)
            },
            Err(e) => {
                warn!("Invalid config file '{}': {e}", path.display());
                None
            },
        }
    }

    /// Overlay `other` on top of `self`, taking any value `other` sets.
    fn merge(&mut self, other: Self) {
        if other.connection.port.is_some() {
            self.connection.port = other.connection.port;
        }
        if other.transfer.verify_idle_ms.is_some() {
            self.transfer.verify_idle_ms = other.transfer.verify_idle_ms;
        }
        if other.transfer.settle_ms.is_some() {
            self.transfer.settle_ms = other.transfer.settle_ms;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_full_config() {
        let text = r#"
            [connection]
            port = "/dev/ttyUSB0"

            [transfer]
            verify_idle_ms = 750
            settle_ms = 0
        "#;
        let config: Config = toml::from_str(text).unwrap();
        assert_eq!(config.connection.port.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(config.transfer.verify_idle_ms, Some(750));
        assert_eq!(config.transfer.settle_ms, Some(0));
    }

    #[test]
    fn test_parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.connection.port.is_none());
        assert!(config.transfer.verify_idle_ms.is_none());
        assert!(config.transfer.settle_ms.is_none());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(toml::from_str::<Config>("[transfer]\nchunk = 64\n").is_err());
    }

    #[test]
    fn test_merge_prefers_later_values() {
        let mut base: Config = toml::from_str(
            "[connection]\nport = \"/dev/ttyUSB0\"\n[transfer]\nverify_idle_ms = 500\n",
        )
        .unwrap();
        let overlay: Config = toml::from_str("[transfer]\nverify_idle_ms = 900\n").unwrap();

        base.merge(overlay);
        assert_eq!(base.connection.port.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(base.transfer.verify_idle_ms, Some(900));
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[transfer]\nsettle_ms = 100").unwrap();

        let config = Config::load_from_path(file.path());
        assert_eq!(config.transfer.settle_ms, Some(100));
    }

    #[test]
    fn test_load_from_missing_path_yields_defaults() {
        let config = Config::load_from_path(Path::new("/nonexistent/promflash.toml"));
        assert!(config.connection.port.is_none());
    }
}
