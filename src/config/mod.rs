//! User settings loaded from `$XDG_CONFIG_HOME/linux-setup/config.toml`.
pub mod toml_loader;

use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Application directory name under the XDG config root.
const APP_DIR: &str = "linux-setup";

/// Optional settings; every key has a default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Where backups are written (default `~/.config/base-linux-setup/backups`).
    pub backup_dir: Option<PathBuf>,
    /// Host probed by the connectivity check.
    pub connectivity_host: String,
    /// Path whose filesystem usage is reported before a run.
    pub disk_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backup_dir: None,
            connectivity_host: "8.8.8.8".to_string(),
            disk_path: "/".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file exists but is invalid.
    pub fn load(home: &Path) -> Result<Self> {
        Self::load_from(&settings_path(home))
    }

    /// Load settings from an explicit file; a missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        toml_loader::load_config(path)
    }
}

/// `$XDG_CONFIG_HOME/linux-setup/config.toml`, defaulting the config root to
/// `~/.config`.
#[must_use]
pub fn settings_path(home: &Path) -> PathBuf {
    std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map_or_else(|| home.join(".config"), PathBuf::from)
        .join(APP_DIR)
        .join("config.toml")
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let s = Settings::default();
        assert_eq!(s.backup_dir, None);
        assert_eq!(s.connectivity_host, "8.8.8.8");
        assert_eq!(s.disk_path, "/");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = Settings::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "backup_dir = \"/srv/backups\"\n").unwrap();
        let s = Settings::load_from(&path).unwrap();
        assert_eq!(s.backup_dir, Some(PathBuf::from("/srv/backups")));
        assert_eq!(s.connectivity_host, "8.8.8.8");
    }

    #[test]
    fn unknown_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "bakup_dir = \"/typo\"\n").unwrap();
        assert!(Settings::load_from(&path).is_err());
    }

    #[test]
    fn settings_file_lives_under_app_dir() {
        let path = settings_path(Path::new("/home/pi"));
        assert!(path.ends_with("linux-setup/config.toml"));
    }
}
