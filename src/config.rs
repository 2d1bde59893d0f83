//! Settings file (TOML). Every key is optional.
//!
//! ```toml
//! output_dir = "exports"
//! log_file = "ifc-quantities.log"
//! log_level = "info"
//!
//! [annotator]
//! pset_name = "CalculatedQuantities"
//! property_name = "Volume"
//! value_type = "IfcReal"
//! max_cached_models = 16
//!
//! [measure]
//! representation = "Body"
//! length_scale = 0.001
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::annotator::AnnotatorSettings;
use crate::error::ConfigError;
use crate::geometry::MeasureContext;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Where exported and imported files are saved.
    pub output_dir: PathBuf,
    /// Log file used while the terminal UI is running.
    pub log_file: PathBuf,
    /// Default filter when `RUST_LOG` is unset.
    pub log_level: String,
    pub annotator: AnnotatorSettings,
    pub measure: MeasureContext,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("exports"),
            log_file: PathBuf::from("ifc-quantities.log"),
            log_level: "info".to_string(),
            annotator: AnnotatorSettings::default(),
            measure: MeasureContext::default(),
        }
    }
}

impl Settings {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads `path` when given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        path.map_or_else(|| Ok(Self::default()), Self::from_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_file_keeps_defaults() {
        let settings: Settings = toml::from_str(
            "output_dir = \"out\"\n[measure]\nlength_scale = 0.001\n[annotator]\nproperty_name = \"NetVolume\"\n",
        )
        .unwrap();

        assert_eq!(settings.output_dir, PathBuf::from("out"));
        assert_eq!(settings.measure.representation, "Body");
        assert_eq!(settings.measure.length_scale, Some(0.001));
        assert_eq!(settings.annotator.property_name, "NetVolume");
        assert_eq!(settings.annotator.pset_name, "CalculatedQuantities");
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn missing_file_is_reported() {
        let err = Settings::load(Some(Path::new("/nonexistent/settings.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }
}
