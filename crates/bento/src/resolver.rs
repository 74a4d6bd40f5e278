//! `spec.bento` resolution

use crate::store::BentoStore;
use std::path::{Path, PathBuf};
use tracing::debug;
use types::utils::has_bento_descriptor;
use types::{BentoStoreError, DeploymentConfigError, Result};

/// Resolve `bento` to a directory containing a bento descriptor.
///
/// A path to a built bento directory is returned unchanged. Anything else is
/// looked up as a tag in `store`. The returned path always holds a
/// descriptor; nothing unverified is handed back.
pub fn get_bento_path(bento: &str, store: &dyn BentoStore) -> Result<PathBuf> {
    let as_path = Path::new(bento);
    if has_bento_descriptor(as_path) {
        debug!(bento = %bento, "Using bento directory");
        return Ok(as_path.to_path_buf());
    }

    match store.get(bento) {
        Ok(path) if has_bento_descriptor(&path) => Ok(path),
        Ok(path) => Err(DeploymentConfigError::invalid(format!(
            "Bento store returned {} for '{}' but it holds no bento",
            path.display(),
            bento
        ))),
        Err(BentoStoreError::NotFound { .. }) | Err(BentoStoreError::InvalidTag { .. }) => {
            Err(DeploymentConfigError::invalid(format!(
                "Unable to find bento '{}': not a bento directory and not a tag in the bento store",
                bento
            )))
        }
        Err(e) => Err(DeploymentConfigError::invalid(format!(
            "Unable to look up bento '{}': {}",
            bento, e
        ))),
    }
}
