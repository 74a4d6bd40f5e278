//! Operator manifests and the configured operator list

use schema::Schema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use types::{OperatorError, OPERATOR_MANIFEST_FILE};

/// Contents of `operator_config.yaml` inside an operator directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorManifest {
    /// Registry name, defaults to the operator directory name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Short description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Redeploying updates the deployment in place
    #[serde(default = "default_true")]
    pub idempotent_update: bool,
    /// Leaf schema for the operator's spec fields
    #[serde(default)]
    pub operator_schema: Schema,
}

fn default_true() -> bool {
    true
}

impl OperatorManifest {
    /// Load the manifest from an operator directory
    pub fn load(dir: &Path) -> Result<Self, OperatorError> {
        let path = dir.join(OPERATOR_MANIFEST_FILE);
        if !path.is_file() {
            return Err(OperatorError::ManifestNotFound { path });
        }

        let content = std::fs::read_to_string(&path).map_err(|source| OperatorError::Io {
            path: path.clone(),
            source,
        })?;

        serde_yaml::from_str(&content).map_err(|e| OperatorError::InvalidManifest {
            path,
            message: e.to_string(),
        })
    }

    /// Name to register under: explicit name, else the directory name
    pub fn resolve_name(&self, dir: &Path) -> Option<String> {
        self.name.clone().or_else(|| {
            dir.file_name()
                .and_then(|name| name.to_str())
                .map(str::to_string)
        })
    }
}

/// Configured list of operator directories, stored as YAML
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorList {
    #[serde(default)]
    pub operators: Vec<PathBuf>,
}

impl OperatorList {
    /// Load the list; a missing file is an empty list
    pub fn load(path: &Path) -> Result<Self, OperatorError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| OperatorError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&content).map_err(|e| OperatorError::InvalidManifest {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Write the list, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<(), OperatorError> {
        let io_err = |source| OperatorError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let yaml = serde_yaml::to_string(self).map_err(|e| OperatorError::InvalidManifest {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        std::fs::write(path, yaml).map_err(io_err)
    }

    /// Add a directory unless already present. Returns true if added.
    pub fn add(&mut self, dir: PathBuf) -> bool {
        if self.operators.contains(&dir) {
            return false;
        }
        self.operators.push(dir);
        true
    }
}
