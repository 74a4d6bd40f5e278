//! Operator capability interface

use schema::Schema;
use serde_yaml::Mapping;
use std::path::{Path, PathBuf};
use types::OperatorError;

/// Trait for deployment operators
pub trait Operator: Send + Sync {
    /// Name the operator is registered under
    fn name(&self) -> &str;

    /// Operator specific spec fields, help messages included
    fn leaf_schema(&self) -> &Schema;

    /// Produce a deployable for the bento and return its path
    fn deploy(
        &self,
        bento_path: &Path,
        deployment_name: &str,
        deployment_spec: &Mapping,
        workdir: &Path,
    ) -> Result<PathBuf, OperatorError>;

    /// Whether deploying over an existing deployment updates it in place
    fn supports_idempotent_update(&self) -> bool {
        false
    }

    /// Update an existing deployment.
    ///
    /// Operators whose deploy is declarative get this for free; the rest must
    /// override it or updates are refused.
    fn update(
        &self,
        bento_path: &Path,
        deployment_name: &str,
        deployment_spec: &Mapping,
        workdir: &Path,
    ) -> Result<PathBuf, OperatorError> {
        if self.supports_idempotent_update() {
            self.deploy(bento_path, deployment_name, deployment_spec, workdir)
        } else {
            Err(OperatorError::UpdateUnsupported {
                name: self.name().to_string(),
                deployment: deployment_name.to_string(),
            })
        }
    }

    /// One line description shown by `operator list`
    fn description(&self) -> Option<&str> {
        None
    }
}
