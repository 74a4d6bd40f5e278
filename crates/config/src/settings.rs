//! Tool settings definitions

use bento::LocalBentoStore;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use types::utils::expand_home;

/// Main settings structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// bentoctl home directory
    #[serde(default = "default_home")]
    pub home: PathBuf,
    /// Operator list file (defaults to `<home>/operators.yaml`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operators_file: Option<PathBuf>,
    /// BentoML home holding the local bento store
    #[serde(default = "default_bentoml_home")]
    pub bentoml_home: PathBuf,
    /// Directory deployables are generated in
    #[serde(default = "default_workdir")]
    pub workdir: PathBuf,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_home() -> PathBuf {
    expand_home("~/bentoctl")
}

fn default_bentoml_home() -> PathBuf {
    expand_home("~/bentoml")
}

fn default_workdir() -> PathBuf {
    PathBuf::from("deployable")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Settings {
    /// Operator list file in effect
    pub fn operators_file(&self) -> PathBuf {
        self.operators_file
            .clone()
            .unwrap_or_else(|| self.home.join("operators.yaml"))
    }

    /// Local bento store under the BentoML home
    pub fn bento_store(&self) -> LocalBentoStore {
        LocalBentoStore::new(&self.bentoml_home)
    }

    /// Expand `~` in every path setting
    pub(crate) fn expand_paths(mut self) -> Self {
        let expand = |path: &PathBuf| expand_home(&path.to_string_lossy());
        self.home = expand(&self.home);
        self.bentoml_home = expand(&self.bentoml_home);
        self.workdir = expand(&self.workdir);
        self.operators_file = self.operators_file.as_ref().map(expand);
        self
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            home: default_home(),
            operators_file: None,
            bentoml_home: default_bentoml_home(),
            workdir: default_workdir(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}
