//! Manifest-backed operator

use crate::manifest::OperatorManifest;
use crate::traits::Operator;
use chrono::Utc;
use schema::Schema;
use serde_yaml::Mapping;
use std::path::{Path, PathBuf};
use tracing::info;
use types::OperatorError;

/// File holding the validated operator spec inside a deployable
pub const DEPLOYMENT_SPEC_FILE: &str = "deployment_spec.yaml";

/// File holding the bento path inside a deployable
pub const BENTO_PATH_FILE: &str = "bento_path";

/// Operator described by an `operator_config.yaml` manifest.
///
/// Deploying writes a deployable directory under the working directory with
/// the validated spec and the bento location; the platform tooling picks it
/// up from there.
#[derive(Debug, Clone)]
pub struct ManifestOperator {
    name: String,
    source: PathBuf,
    manifest: OperatorManifest,
}

impl ManifestOperator {
    /// Load an operator from its directory
    pub fn load(dir: &Path) -> Result<Self, OperatorError> {
        let manifest = OperatorManifest::load(dir)?;
        let name = manifest
            .resolve_name(dir)
            .ok_or_else(|| OperatorError::InvalidManifest {
                path: dir.to_path_buf(),
                message: "cannot derive operator name from path".to_string(),
            })?;

        Ok(Self {
            name,
            source: dir.to_path_buf(),
            manifest,
        })
    }

    /// Directory the operator was loaded from
    pub fn source(&self) -> &Path {
        &self.source
    }

    fn deploy_error(&self, message: impl Into<String>) -> OperatorError {
        OperatorError::Deploy {
            name: self.name.clone(),
            message: message.into(),
        }
    }
}

impl Operator for ManifestOperator {
    fn name(&self) -> &str {
        &self.name
    }

    fn leaf_schema(&self) -> &Schema {
        &self.manifest.operator_schema
    }

    fn deploy(
        &self,
        bento_path: &Path,
        deployment_name: &str,
        deployment_spec: &Mapping,
        workdir: &Path,
    ) -> Result<PathBuf, OperatorError> {
        if deployment_name.is_empty()
            || deployment_name.contains(['/', '\\'])
            || deployment_name == "."
            || deployment_name == ".."
        {
            return Err(self.deploy_error(format!(
                "invalid deployment name '{}'",
                deployment_name
            )));
        }

        let deployable = workdir.join(deployment_name);
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| OperatorError::Io { path, source }
        };

        std::fs::create_dir_all(&deployable).map_err(io_err(&deployable))?;

        let spec_yaml = serde_yaml::to_string(deployment_spec)
            .map_err(|e| self.deploy_error(format!("cannot serialize spec: {}", e)))?;
        let spec_path = deployable.join(DEPLOYMENT_SPEC_FILE);
        let content = format!(
            "# operator: {}\n# deployment: {}\n# generated_at: {}\n{}",
            self.name,
            deployment_name,
            Utc::now().to_rfc3339(),
            spec_yaml
        );
        std::fs::write(&spec_path, content).map_err(io_err(&spec_path))?;

        let bento_file = deployable.join(BENTO_PATH_FILE);
        std::fs::write(&bento_file, bento_path.to_string_lossy().as_bytes())
            .map_err(io_err(&bento_file))?;

        info!(
            operator = %self.name,
            deployment = %deployment_name,
            path = %deployable.display(),
            "Generated deployable"
        );
        Ok(deployable)
    }

    fn supports_idempotent_update(&self) -> bool {
        self.manifest.idempotent_update
    }

    fn description(&self) -> Option<&str> {
        self.manifest.description.as_deref()
    }
}
