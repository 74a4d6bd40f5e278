//! Operator registry

use crate::local::ManifestOperator;
use crate::manifest::OperatorList;
use crate::traits::Operator;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};
use types::OperatorError;

/// A registered operator and where it came from
#[derive(Clone)]
pub struct OperatorEntry {
    pub name: String,
    /// Operator directory, `None` for operators registered in-process
    pub path: Option<PathBuf>,
    pub operator: Arc<dyn Operator>,
}

impl std::fmt::Debug for OperatorEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorEntry")
            .field("name", &self.name)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Registry mapping operator names to operators
#[derive(Debug, Default, Clone)]
pub struct OperatorRegistry {
    operators: BTreeMap<String, OperatorEntry>,
}

impl OperatorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from the configured operator list file.
    ///
    /// Operators that fail to load are skipped with a warning so one broken
    /// operator does not hide the others.
    pub fn from_list_file(path: &Path) -> Result<Self, OperatorError> {
        let list = OperatorList::load(path)?;
        let mut registry = Self::new();

        for dir in &list.operators {
            if let Err(e) = registry.add(dir) {
                warn!(path = %dir.display(), error = %e, "Skipping operator");
            }
        }

        info!(
            count = registry.len(),
            list = %path.display(),
            "Loaded operator registry"
        );
        Ok(registry)
    }

    /// Register the operator found in `dir` and return its name
    pub fn add<P: AsRef<Path>>(&mut self, dir: P) -> Result<String, OperatorError> {
        let dir = dir.as_ref();
        let operator = ManifestOperator::load(dir)?;
        let name = operator.name().to_string();

        debug!(operator = %name, path = %dir.display(), "Registering operator");
        self.insert(OperatorEntry {
            name: name.clone(),
            path: Some(dir.to_path_buf()),
            operator: Arc::new(operator),
        });
        Ok(name)
    }

    /// Register an in-process operator under `name`
    pub fn register(&mut self, name: impl Into<String>, operator: Arc<dyn Operator>) {
        let name = name.into();
        if name != operator.name() {
            warn!(
                key = %name,
                operator = %operator.name(),
                "Operator registered under a name it does not report; errors will use its own name"
            );
        }
        self.insert(OperatorEntry {
            name,
            path: None,
            operator,
        });
    }

    fn insert(&mut self, entry: OperatorEntry) {
        if let Some(previous) = self.operators.insert(entry.name.clone(), entry) {
            warn!(operator = %previous.name, "Replaced previously registered operator");
        }
    }

    /// Look up an operator by name
    pub fn get(&self, name: &str) -> Result<Arc<dyn Operator>, OperatorError> {
        self.entry(name)
            .map(|entry| Arc::clone(&entry.operator))
            .ok_or_else(|| OperatorError::NotInstalled {
                name: name.to_string(),
            })
    }

    /// Registered entry for `name`
    pub fn entry(&self, name: &str) -> Option<&OperatorEntry> {
        self.operators.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operators.contains_key(name)
    }

    /// All entries in name order
    pub fn list(&self) -> impl Iterator<Item = &OperatorEntry> {
        self.operators.values()
    }

    pub fn names(&self) -> Vec<String> {
        self.operators.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }
}

static LOCAL_REGISTRY: OnceLock<OperatorRegistry> = OnceLock::new();

/// Process-wide registry, built from `list_file` on first use.
///
/// Only the first call's `list_file` is used. A list that cannot be read
/// yields an empty registry. Validation code takes a registry argument
/// instead of calling this directly.
pub fn local_registry(list_file: &Path) -> &'static OperatorRegistry {
    LOCAL_REGISTRY.get_or_init(|| {
        OperatorRegistry::from_list_file(list_file).unwrap_or_else(|e| {
            warn!(error = %e, "Could not load operator list, starting with no operators");
            OperatorRegistry::new()
        })
    })
}
