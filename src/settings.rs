//! Settings loader
//!
//! Reads `settings.json`, which identifies which uploader identity is "us".
//! Every other identity found in an export counts as "them".
//!
//! # Example
//!
//! ```
//! use rdmreport::settings::Settings;
//!
//! let settings: Settings = serde_json::from_str(r#"{"our_id": "site-k-team"}"#).unwrap();
//! assert_eq!(settings.require_our_id().unwrap(), "site-k-team");
//! assert_eq!(settings.output_dir.to_str(), Some("output"));
//! ```

use crate::error::{ReportError, Result};
use crate::view::DEFAULT_DEVICE_TYPES;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides `our_id` from the settings file
pub const OUR_ID_ENV: &str = "RDM_OUR_ID";

/// Run configuration, built once at startup and passed to each report
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Uploader identity treated as "us"
    pub our_id: Option<String>,

    /// Closed device-type enumeration for the view report, in column order
    #[serde(default = "default_device_types")]
    pub device_types: Vec<String>,

    /// Directory the CSV view report is written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_device_types() -> Vec<String> {
    DEFAULT_DEVICE_TYPES.iter().map(|s| s.to_string()).collect()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            our_id: None,
            device_types: default_device_types(),
            output_dir: default_output_dir(),
        }
    }
}

impl Settings {
    /// Load settings from `path`, then apply the `RDM_OUR_ID` override
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with_override(path, std::env::var(OUR_ID_ENV).ok())
    }

    /// Load settings from `path`, replacing `our_id` with `our_id_override` when given
    ///
    /// A missing file yields defaults; whether that is acceptable is decided
    /// by the report that needs the identity (see [`Settings::require_our_id`]).
    pub fn load_with_override(path: &Path, our_id_override: Option<String>) -> Result<Self> {
        let mut settings = if path.exists() {
            Self::from_file(path)?
        } else {
            tracing::debug!(path = %path.display(), "settings file not found, using defaults");
            Self::default()
        };

        if let Some(id) = our_id_override {
            tracing::debug!("our_id taken from {}", OUR_ID_ENV);
            settings.our_id = Some(id);
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Parse a settings file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ReportError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| ReportError::Config(format!("invalid {}: {}", path.display(), e)))
    }

    fn validate(&self) -> Result<()> {
        if self.device_types.is_empty() {
            return Err(ReportError::Config(
                "device_types must list at least one device type".to_string(),
            ));
        }
        if let Some(bad) = self.device_types.iter().find(|t| t.chars().count() != 3) {
            return Err(ReportError::Config(format!(
                "device type '{}' is not a 3-character prefix",
                bad
            )));
        }
        Ok(())
    }

    /// Identity of "us", required by the diff report
    pub fn require_our_id(&self) -> Result<&str> {
        match self.our_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err(ReportError::Config(format!(
                "our_id is not set; add it to settings.json or export {}",
                OUR_ID_ENV
            ))),
        }
    }
}
