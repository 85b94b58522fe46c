/*============================================================
  Synavera Project: Syn-Pak
  Module: synpak_core::config
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Load and validate the operator configuration: content
    server, package selection, execution mode, and paths.

  Security / Safety Notes:
    The optional package key is held in memory only and never
    logged. Package names are rejected if they could escape the
    cache directory.

  Dependencies:
    serde + toml for parsing, dirs for platform directories.

  Operational Scope:
    Read once at startup by the CLI; the resulting value is
    threaded explicitly into the updater and its transports.

  Revision History:
    2026-10-12 COD  Authored configuration surface.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Explicit configuration over hidden global state
    - Validation before any network or disk activity
    - Sensible defaults for first-run operators
============================================================*/

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{Result, SynpakError};

const APP_DIR: &str = "syn-pak";
const CONFIG_FILE: &str = "config.toml";

/// Execution mode of the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Never enforces updates.
    #[default]
    Development,
    /// No network calls; local content only.
    Offline,
    /// Version mismatches block until the operator resolves them.
    Production,
}

impl ExecutionMode {
    /// Whether a detected version mismatch must be confirmed and downloaded.
    pub fn enforces_updates(self) -> bool {
        matches!(self, ExecutionMode::Production)
    }

    /// Whether transports may reach the content server.
    pub fn allows_network(self) -> bool {
        !matches!(self, ExecutionMode::Offline)
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ExecutionMode::Development => "development",
            ExecutionMode::Offline => "offline",
            ExecutionMode::Production => "production",
        };
        f.write_str(label)
    }
}

impl FromStr for ExecutionMode {
    type Err = SynpakError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "develop" => Ok(ExecutionMode::Development),
            "offline" | "local" => Ok(ExecutionMode::Offline),
            "production" | "build" => Ok(ExecutionMode::Production),
            other => Err(SynpakError::Config(format!(
                "Unknown execution mode `{other}`"
            ))),
        }
    }
}

/// Content server settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout: u64,
    pub max_retries: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:7888/DLC/".to_string(),
            timeout: 30,
            max_retries: 3,
        }
    }
}

/// Which package to keep in sync and how.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PackageConfig {
    pub name: String,
    pub key: Option<String>,
    pub check_integrity: bool,
    pub next_scene: Option<String>,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            name: "Main".to_string(),
            key: None,
            check_integrity: true,
            next_scene: None,
        }
    }
}

/// Filesystem locations; unset entries fall back to platform defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub cache_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
}

/// Top-level Syn-Pak configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SynpakConfig {
    pub mode: ExecutionMode,
    pub app_version: String,
    pub server: ServerConfig,
    pub package: PackageConfig,
    pub paths: PathsConfig,
}

impl Default for SynpakConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::default(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            server: ServerConfig::default(),
            package: PackageConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

impl SynpakConfig {
    /// Load configuration from `path`, or from the default location.
    ///
    /// A missing default file yields defaults; a missing explicit file is
    /// an error.
    pub fn load_from_optional_path(path: Option<&Path>) -> Result<Self> {
        let (resolved, explicit) = match path {
            Some(path) => (Some(path.to_path_buf()), true),
            None => (default_config_path(), false),
        };

        let config = match resolved {
            Some(ref file) if file.exists() => {
                let raw = std::fs::read_to_string(file).map_err(|err| {
                    SynpakError::Config(format!("Failed to read {}: {err}", file.display()))
                })?;
                Self::from_toml_str(&raw)?
            }
            Some(ref file) if explicit => {
                return Err(SynpakError::Config(format!(
                    "Configuration file {} not found",
                    file.display()
                )));
            }
            _ => Self::default(),
        };

        config.normalized()
    }

    /// Parse and validate configuration text.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let parsed: SynpakConfig = toml::from_str(raw)
            .map_err(|err| SynpakError::Config(format!("Invalid configuration: {err}")))?;
        parsed.normalized()
    }

    fn normalized(mut self) -> Result<Self> {
        let base = self.server.base_url.trim().to_string();
        if base.is_empty() {
            return Err(SynpakError::Config("server.base_url must not be empty".into()));
        }
        self.server.base_url = if base.ends_with('/') {
            base
        } else {
            format!("{base}/")
        };

        if self.server.timeout == 0 {
            return Err(SynpakError::Config("server.timeout must be positive".into()));
        }
        validate_package_name(&self.package.name)?;

        if self.package.key.as_deref().is_some_and(str::is_empty) {
            self.package.key = None;
        }
        if self.package.next_scene.as_deref().is_some_and(str::is_empty) {
            self.package.next_scene = None;
        }
        Ok(self)
    }

    /// Root directory holding one subdirectory per package.
    pub fn cache_dir(&self) -> PathBuf {
        self.paths.cache_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR)
                .join("packages")
        })
    }

    /// Directory for session logs.
    pub fn log_dir(&self) -> PathBuf {
        self.paths.log_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR)
                .join("logs")
        })
    }
}

/// Default configuration file location.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

/// Reject package names that are empty or could escape the cache root.
pub fn validate_package_name(name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(SynpakError::Config("package name must not be empty".into()));
    }
    if trimmed.contains(['/', '\\']) || trimmed == "." || trimmed.contains("..") {
        return Err(SynpakError::Config(format!(
            "package name `{name}` is not a plain directory name"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let config = SynpakConfig::from_toml_str(
            r#"
            mode = "production"
            [server]
            base_url = "https://cdn.example.net/dlc"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.base_url, "https://cdn.example.net/dlc/");
        assert_eq!(config.mode, ExecutionMode::Production);
        assert_eq!(config.package.name, "Main");
    }

    #[test]
    fn empty_key_and_scene_become_none() {
        let config = SynpakConfig::from_toml_str(
            r#"
            [package]
            name = "Extra"
            key = ""
            next_scene = ""
            check_integrity = false
            "#,
        )
        .unwrap();
        assert!(config.package.key.is_none());
        assert!(config.package.next_scene.is_none());
        assert!(!config.package.check_integrity);
    }

    #[test]
    fn traversal_package_names_are_rejected() {
        let err = SynpakConfig::from_toml_str("[package]\nname = \"../etc\"\n").unwrap_err();
        assert!(matches!(err, SynpakError::Config(_)));
        assert!(validate_package_name("a/b").is_err());
        assert!(validate_package_name("Main").is_ok());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(SynpakConfig::from_toml_str("[server]\ntimeout = 0\n").is_err());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = SynpakConfig::load_from_optional_path(Some(Path::new(
            "/nonexistent/syn-pak/config.toml",
        )))
        .unwrap_err();
        assert!(matches!(err, SynpakError::Config(_)));
    }

    #[test]
    fn mode_labels_parse() {
        assert_eq!("Build".parse::<ExecutionMode>().unwrap(), ExecutionMode::Production);
        assert_eq!("offline".parse::<ExecutionMode>().unwrap(), ExecutionMode::Offline);
        assert!("staging".parse::<ExecutionMode>().is_err());
        assert!(!ExecutionMode::Offline.allows_network());
        assert!(!ExecutionMode::Development.enforces_updates());
    }
}
