//! Configuration files

use crate::domain::config::ModelConfig;
use crate::error::ModelError;
use std::path::Path;

/// Read a whole file, tagging IO failures with the path
pub(crate) fn read_file(path: &Path) -> Result<String, ModelError> {
    std::fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })
}

impl ModelConfig {
    /// Load a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let config = Self::from_json_str(&read_file(path)?)?;
        tracing::debug!(path = %path.display(), ?config, "configuration loaded");
        Ok(config)
    }
}

/// Load a configuration file, or the defaults when `path` is `None`
pub fn load_config(path: Option<&Path>) -> Result<ModelConfig, ModelError> {
    match path {
        Some(path) => ModelConfig::from_json_file(path),
        None => Ok(ModelConfig::default()),
    }
}
