//! Deployment config loading and validation
//!
//! A deployment config is a YAML document of the form
//!
//! ```yaml
//! api_version: v1
//! metadata:
//!   name: iris-classifier
//!   operator: aws-lambda
//! spec:
//!   bento: iris_classifier:latest
//!   instances:
//!     min: 1
//!     max: 2
//!   region: us-west-1   # operator specific
//! ```
//!
//! [`DeploymentConfig`] only exists once the whole document has passed the
//! merged base + operator schema and its bento has been located.

use bento::{get_bento_path, BentoStore};
use operator::OperatorRegistry;
use schema::{merge_operator_schema, Validator, COMMON_SPEC_FIELDS};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use types::utils::{display_value, value_type_name};
use types::{DeploymentConfigError, OperatorError, Result, API_VERSION};

/// Instance scaling bounds from `spec.instances`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instances {
    pub min: i64,
    pub max: i64,
}

/// Validated deployment config
#[derive(Debug, Clone)]
pub struct DeploymentConfig {
    api_version: String,
    name: String,
    operator_name: String,
    bento: String,
    bento_path: PathBuf,
    instances: Instances,
    spec: Mapping,
    document: Value,
}

impl DeploymentConfig {
    /// Validate `document` and build the config.
    ///
    /// Fails with [`DeploymentConfigError::Invalid`] when the document is
    /// empty, has the wrong `api_version`, lacks a deployment name, names an
    /// operator that is not installed, violates the merged schema or points
    /// at a bento that cannot be found.
    pub fn new(
        document: &Value,
        registry: &OperatorRegistry,
        store: &dyn BentoStore,
    ) -> Result<Self> {
        let mapping = match document {
            Value::Null => return Err(DeploymentConfigError::invalid("No deployment config found")),
            Value::Mapping(mapping) if mapping.is_empty() => {
                return Err(DeploymentConfigError::invalid("No deployment config found"))
            }
            Value::Mapping(mapping) => mapping,
            other => {
                return Err(DeploymentConfigError::invalid(format!(
                    "Deployment config must be a mapping, got {}",
                    value_type_name(other)
                )))
            }
        };

        check_api_version(mapping)?;
        let name = required_metadata(document, "name")?;
        let operator_name = required_metadata(document, "operator")?;

        let operator = registry.get(&operator_name).map_err(|e| match e {
            OperatorError::NotInstalled { .. } => DeploymentConfigError::invalid(format!(
                "metadata.operator: {}. Installed operators: [{}]",
                e,
                registry.names().join(", ")
            )),
            other => other.into(),
        })?;

        let schema = merge_operator_schema(operator.leaf_schema());
        let (normalized, report) = Validator::new(&schema).run(document);
        for warning in &report.warnings {
            debug!(field = %warning.field, "{}", warning.message);
        }
        if report.has_errors() {
            return Err(DeploymentConfigError::with_errors(
                format!(
                    "deployment '{}' does not match the schema of operator '{}'",
                    name, operator_name
                ),
                report.field_errors(),
            ));
        }

        let spec = match normalized.get("spec") {
            Some(Value::Mapping(spec)) => spec.clone(),
            _ => return Err(DeploymentConfigError::invalid("spec must be a mapping")),
        };
        let bento = spec
            .get("bento")
            .and_then(Value::as_str)
            .ok_or_else(|| DeploymentConfigError::invalid("spec.bento must be a string"))?
            .to_string();
        let instances: Instances = spec
            .get("instances")
            .cloned()
            .map(serde_yaml::from_value::<Instances>)
            .transpose()
            .map_err(|e| DeploymentConfigError::invalid(format!("spec.instances: {}", e)))?
            .ok_or_else(|| DeploymentConfigError::invalid("spec.instances is required"))?;

        let bento_path = get_bento_path(&bento, store)?;

        info!(
            deployment = %name,
            operator = %operator_name,
            bento_path = %bento_path.display(),
            "Deployment config validated"
        );

        Ok(Self {
            api_version: API_VERSION.to_string(),
            name,
            operator_name,
            bento,
            bento_path,
            instances,
            spec,
            document: normalized,
        })
    }

    /// Load and validate a deployment config file.
    ///
    /// A missing file is [`DeploymentConfigError::NotFound`]; every other
    /// failure is [`DeploymentConfigError::Invalid`].
    pub fn from_file<P: AsRef<Path>>(
        path: P,
        registry: &OperatorRegistry,
        store: &dyn BentoStore,
    ) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DeploymentConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            DeploymentConfigError::invalid(format!("Cannot read {}: {}", path.display(), e))
        })?;

        debug!(path = %path.display(), "Loading deployment config");
        Self::from_yaml_str(&content, registry, store)
    }

    /// Parse and validate a deployment config from YAML text
    pub fn from_yaml_str(
        yaml: &str,
        registry: &OperatorRegistry,
        store: &dyn BentoStore,
    ) -> Result<Self> {
        let document: Value = serde_yaml::from_str(yaml)
            .map_err(|e| DeploymentConfigError::invalid(format!("Malformed YAML: {}", e)))?;

        match &document {
            Value::Mapping(_) | Value::Null => Self::new(&document, registry, store),
            other => Err(DeploymentConfigError::invalid(format!(
                "Deployment config must be a mapping, got {}",
                value_type_name(other)
            ))),
        }
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Deployment name (`metadata.name`)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Operator name (`metadata.operator`)
    pub fn operator_name(&self) -> &str {
        &self.operator_name
    }

    /// `spec.bento` as written in the document
    pub fn bento(&self) -> &str {
        &self.bento
    }

    /// Directory of the bento to deploy
    pub fn bento_path(&self) -> &Path {
        &self.bento_path
    }

    pub fn instances(&self) -> Instances {
        self.instances
    }

    /// Validated spec with defaults applied
    pub fn spec(&self) -> &Mapping {
        &self.spec
    }

    /// Operator specific part of the spec
    pub fn operator_spec(&self) -> Mapping {
        self.spec
            .iter()
            .filter(|(key, _)| {
                key.as_str()
                    .map_or(true, |key| !COMMON_SPEC_FIELDS.contains(&key))
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Normalized document as YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(&self.document).map_err(|e| {
            DeploymentConfigError::invalid(format!("Cannot serialize deployment config: {}", e))
        })
    }

    /// Normalized document
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Generate a new deployment with the config's operator
    pub fn deploy(
        &self,
        registry: &OperatorRegistry,
        workdir: &Path,
    ) -> std::result::Result<PathBuf, OperatorError> {
        let operator = registry.get(&self.operator_name)?;
        operator.deploy(&self.bento_path, &self.name, &self.operator_spec(), workdir)
    }

    /// Update an existing deployment with the config's operator
    pub fn update(
        &self,
        registry: &OperatorRegistry,
        workdir: &Path,
    ) -> std::result::Result<PathBuf, OperatorError> {
        let operator = registry.get(&self.operator_name)?;
        operator.update(&self.bento_path, &self.name, &self.operator_spec(), workdir)
    }
}

fn check_api_version(mapping: &Mapping) -> Result<()> {
    match mapping.get("api_version") {
        None | Some(Value::Null) => Err(DeploymentConfigError::invalid(format!(
            "api_version not found, expected '{}'",
            API_VERSION
        ))),
        Some(Value::String(version)) if version == API_VERSION => Ok(()),
        Some(other) => Err(DeploymentConfigError::invalid(format!(
            "api_version '{}' is not supported, expected '{}'",
            display_value(other),
            API_VERSION
        ))),
    }
}

fn required_metadata(document: &Value, field: &str) -> Result<String> {
    match &document["metadata"][field] {
        Value::Null => Err(DeploymentConfigError::invalid(format!(
            "metadata.{} is required",
            field
        ))),
        Value::String(value) if !value.is_empty() => Ok(value.clone()),
        Value::String(_) => Err(DeploymentConfigError::invalid(format!(
            "metadata.{} cannot be empty",
            field
        ))),
        other => Err(DeploymentConfigError::invalid(format!(
            "metadata.{} must be a string, got {}",
            field,
            value_type_name(other)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bento::LocalBentoStore;
    use tempfile::TempDir;
    use types::{BENTO_DESCRIPTOR_FILE, OPERATOR_MANIFEST_FILE};

    const TESTOP_MANIFEST: &str = r#"
description: Operator used in tests
operator_schema:
  project_id:
    type: string
    required: true
    help_message: Project to deploy into
  memory:
    type: integer
    coerce: int
    default: 512
    help_message: Memory in MiB
"#;

    struct Fixture {
        tmp: TempDir,
        registry: OperatorRegistry,
        store: LocalBentoStore,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            let store = LocalBentoStore::new(tmp.path().join("bentoml"));
            Self {
                tmp,
                registry: OperatorRegistry::new(),
                store,
            }
        }

        fn with_testop() -> Self {
            let mut fixture = Self::new();
            let op_dir = fixture.tmp.path().join("test-operator").join("testop");
            std::fs::create_dir_all(&op_dir).unwrap();
            std::fs::write(op_dir.join(OPERATOR_MANIFEST_FILE), TESTOP_MANIFEST).unwrap();
            fixture.registry.add(&op_dir).unwrap();
            fixture
        }

        fn bento_dir(&self) -> PathBuf {
            let dir = self.tmp.path().join("bento");
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join(BENTO_DESCRIPTOR_FILE), "").unwrap();
            dir
        }

        fn valid_yaml(&self) -> String {
            format!(
                r#"
api_version: v1
metadata:
    name: test
    operator: testop
spec:
    bento: {}
    project_id: testproject
    instances:
        min: 1
        max: 2
"#,
                self.bento_dir().display()
            )
        }

        fn build(&self, yaml: &str) -> Result<DeploymentConfig> {
            let document: Value = serde_yaml::from_str(yaml).unwrap();
            DeploymentConfig::new(&document, &self.registry, &self.store)
        }
    }

    const INVALID_YAML: &str = "api_version: tst: something: something\n";

    #[test]
    fn test_empty_config() {
        let fixture = Fixture::with_testop();
        assert!(fixture.build("{}").unwrap_err().is_invalid());
        assert!(fixture.build("~").unwrap_err().is_invalid());
    }

    #[test]
    fn test_api_version() {
        let fixture = Fixture::with_testop();
        let err = fixture.build("api_version: v2").unwrap_err();
        assert!(err.to_string().contains("'v2' is not supported"));

        let err = fixture.build("metadata: {name: test}").unwrap_err();
        assert!(err.to_string().contains("api_version not found"));
    }

    #[test]
    fn test_missing_name() {
        let fixture = Fixture::with_testop();
        let err = fixture.build("api_version: v1").unwrap_err();
        assert!(err.to_string().contains("metadata.name is required"));

        let err = fixture
            .build("api_version: v1\nmetadata: {}\nspec: {}\n")
            .unwrap_err();
        assert!(err.is_invalid());
    }

    #[test]
    fn test_operator_not_installed() {
        let fixture = Fixture::new();
        let err = fixture
            .build("api_version: v1\nmetadata: {name: test, operator: testop}\nspec: {}\n")
            .unwrap_err();

        assert!(err.is_invalid());
        assert!(err.to_string().contains("Operator 'testop' is not installed"));
    }

    #[test]
    fn test_valid_bento_directory() {
        let fixture = Fixture::with_testop();
        let bento_dir = fixture.bento_dir();
        let config = fixture.build(&fixture.valid_yaml()).unwrap();

        assert_eq!(config.bento(), bento_dir.to_str().unwrap());
        assert_eq!(config.bento_path(), bento_dir.as_path());
        assert_eq!(config.name(), "test");
        assert_eq!(config.operator_name(), "testop");
        assert_eq!(config.api_version(), "v1");
        assert_eq!(config.instances(), Instances { min: 1, max: 2 });
    }

    #[test]
    fn test_defaults_applied_and_operator_spec() {
        let fixture = Fixture::with_testop();
        let config = fixture.build(&fixture.valid_yaml()).unwrap();

        assert_eq!(config.spec().get("memory"), Some(&Value::from(512)));
        let operator_spec = config.operator_spec();
        assert!(operator_spec.contains_key("project_id"));
        assert!(operator_spec.contains_key("memory"));
        assert!(!operator_spec.contains_key("bento"));
        assert!(!operator_spec.contains_key("instances"));

        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("memory: 512"));
    }

    #[test]
    fn test_missing_instances_is_schema_violation() {
        let fixture = Fixture::with_testop();
        let yaml = format!(
            "api_version: v1\n\
             metadata:\n  name: test\n  operator: testop\n\
             spec:\n  bento: {}\n  project_id: testproject\n",
            fixture.bento_dir().display()
        );
        let err = fixture.build(&yaml).unwrap_err();

        let errors = err.field_errors().unwrap();
        assert_eq!(errors["spec.instances"], vec!["required field".to_string()]);
    }

    #[test]
    fn test_unknown_spec_field_rejected() {
        let fixture = Fixture::with_testop();
        let yaml = format!("{}    region: us-west-1\n", fixture.valid_yaml());
        let err = fixture.build(&yaml).unwrap_err();
        assert!(err.field_errors().unwrap().contains_key("spec.region"));
    }

    #[test]
    fn test_unresolvable_bento() {
        let fixture = Fixture::with_testop();
        let yaml = fixture
            .valid_yaml()
            .replace(fixture.bento_dir().to_str().unwrap(), "iris_classifier:v1");
        let err = fixture.build(&yaml).unwrap_err();
        assert!(err.to_string().contains("Unable to find bento 'iris_classifier:v1'"));
    }

    #[test]
    fn test_bento_from_store() {
        let fixture = Fixture::with_testop();
        let stored = fixture.store.root().join("iris_classifier").join("v1");
        std::fs::create_dir_all(&stored).unwrap();
        std::fs::write(stored.join(BENTO_DESCRIPTOR_FILE), "").unwrap();

        let yaml = fixture
            .valid_yaml()
            .replace(fixture.bento_dir().to_str().unwrap(), "iris_classifier:v1");
        let config = fixture.build(&yaml).unwrap();
        assert_eq!(config.bento(), "iris_classifier:v1");
        assert_eq!(config.bento_path(), stored.as_path());
    }

    #[test]
    fn test_from_file() {
        let fixture = Fixture::with_testop();
        let path = fixture.tmp.path().join("deployment_config.yaml");

        let err = DeploymentConfig::from_file(
            fixture.tmp.path().join("nofile.yaml"),
            &fixture.registry,
            &fixture.store,
        )
        .unwrap_err();
        assert!(err.is_not_found());

        std::fs::write(&path, INVALID_YAML).unwrap();
        let err =
            DeploymentConfig::from_file(&path, &fixture.registry, &fixture.store).unwrap_err();
        assert!(err.is_invalid());

        std::fs::write(&path, "- api_version\n- v1\n").unwrap();
        let err =
            DeploymentConfig::from_file(&path, &fixture.registry, &fixture.store).unwrap_err();
        assert!(err.to_string().contains("must be a mapping, got list"));

        std::fs::write(&path, fixture.valid_yaml()).unwrap();
        let config =
            DeploymentConfig::from_file(&path, &fixture.registry, &fixture.store).unwrap();
        assert_eq!(config.name(), "test");
    }

    #[test]
    fn test_deploy_and_update() {
        let fixture = Fixture::with_testop();
        let config = fixture.build(&fixture.valid_yaml()).unwrap();
        let workdir = fixture.tmp.path().join("deployable");

        let deployed = config.deploy(&fixture.registry, &workdir).unwrap();
        assert_eq!(deployed, workdir.join("test"));

        let updated = config.update(&fixture.registry, &workdir).unwrap();
        assert_eq!(updated, deployed);

        let empty = OperatorRegistry::new();
        assert!(matches!(
            config.deploy(&empty, &workdir),
            Err(OperatorError::NotInstalled { .. })
        ));
    }
}
