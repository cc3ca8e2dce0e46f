//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/biblion/config.toml)
//! 3. Environment variables (BIBLION_* prefix)
//!
//! Environment variables take precedence over config file values.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cite::Style;
use crate::error::{LibraryError, LibraryResult};
use crate::lookup::LOOKUP_TIMEOUT;
use crate::reference_note::DEFAULT_TEMPLATE;

/// Environment variable prefix
const ENV_PREFIX: &str = "BIBLION";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Library folder holding `.bib`, `.md` and `.pdf` files
    #[serde(default = "default_library_dir")]
    pub library_dir: PathBuf,

    /// Note template file; the built-in template is used when unset
    #[serde(default)]
    pub template: Option<PathBuf>,

    /// Whether imports query CrossRef
    #[serde(default = "default_true")]
    pub lookup_enabled: bool,

    /// CrossRef request timeout in seconds
    #[serde(default = "default_lookup_timeout")]
    pub lookup_timeout_secs: u64,

    /// Contact address sent to CrossRef
    #[serde(default)]
    pub mailto: Option<String>,

    /// Citation style for generated notes
    #[serde(default = "default_style")]
    pub style: String,

    /// Log destination when BIBLION_LOG is set; stderr otherwise
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            library_dir: default_library_dir(),
            template: None,
            lookup_enabled: true,
            lookup_timeout_secs: LOOKUP_TIMEOUT,
            mailto: None,
            style: default_style(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (BIBLION_LIBRARY_DIR, BIBLION_LOOKUP_ENABLED, ...)
    /// 2. Config file (~/.config/biblion/config.toml or BIBLION_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load from the given path if any, else from the default location
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(format!("{}_LIBRARY_DIR", ENV_PREFIX)) {
            self.library_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var(format!("{}_LOOKUP_ENABLED", ENV_PREFIX)) {
            self.lookup_enabled = val.eq_ignore_ascii_case("true") || val == "1";
        }

        // Unparseable values keep the current timeout
        if let Ok(val) = std::env::var(format!("{}_LOOKUP_TIMEOUT", ENV_PREFIX)) {
            if let Ok(secs) = val.trim().parse() {
                self.lookup_timeout_secs = secs;
            }
        }

        if let Ok(val) = std::env::var(format!("{}_MAILTO", ENV_PREFIX)) {
            self.mailto = if val.is_empty() { None } else { Some(val) };
        }

        if let Ok(val) = std::env::var(format!("{}_STYLE", ENV_PREFIX)) {
            if !val.is_empty() {
                self.style = val;
            }
        }
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with BIBLION_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("biblion")
            .join("config.toml")
    }

    /// Parsed citation style (unknown names fall back to APA)
    pub fn citation_style(&self) -> Style {
        Style::parse(&self.style)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }

    /// Text of the note template
    pub fn template_text(&self) -> LibraryResult<String> {
        let Some(path) = &self.template else {
            return Ok(DEFAULT_TEMPLATE.to_string());
        };
        let text = fs::read_to_string(path).map_err(|e| LibraryError::InvalidTemplate {
            path: path.clone(),
            details: e.to_string(),
        })?;
        if text.trim().is_empty() {
            return Err(LibraryError::InvalidTemplate {
                path: path.clone(),
                details: "template is empty".to_string(),
            });
        }
        Ok(text)
    }
}

/// Get the default library directory
fn default_library_dir() -> PathBuf {
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("biblion")
}

fn default_true() -> bool {
    true
}

fn default_lookup_timeout() -> u64 {
    LOOKUP_TIMEOUT
}

fn default_style() -> String {
    Style::default().to_string()
}
