//! Subcommand implementations

use anyhow::{Context, Result};
use clap::ValueEnum;
use config::{DeploymentConfig, Settings};
use operator::{local_registry, ManifestOperator, Operator, OperatorList, OperatorRegistry};
use schema::help_messages;
use serde_yaml::Value;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use types::DeploymentConfigError;

/// Output format of `validate`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

fn registry(settings: &Settings) -> &'static OperatorRegistry {
    local_registry(&settings.operators_file())
}

fn load_config(
    settings: &Settings,
    file: &Path,
) -> Result<DeploymentConfig, DeploymentConfigError> {
    DeploymentConfig::from_file(file, registry(settings), &settings.bento_store())
}

pub fn validate(settings: &Settings, file: &Path, output: OutputFormat) -> Result<ExitCode> {
    match load_config(settings, file) {
        Ok(config) => {
            println!("{}", render_document(config.document(), output)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}", render_error(&e, output)?);
            Ok(ExitCode::FAILURE)
        }
    }
}

pub fn deploy(settings: &Settings, file: &Path) -> Result<ExitCode> {
    let config = load_config(settings, file)?;
    let path = config
        .deploy(registry(settings), &settings.workdir)
        .with_context(|| format!("Failed to deploy '{}'", config.name()))?;

    println!("{}", path.display());
    Ok(ExitCode::SUCCESS)
}

pub fn update(settings: &Settings, file: &Path) -> Result<ExitCode> {
    let config = load_config(settings, file)?;
    let path = config
        .update(registry(settings), &settings.workdir)
        .with_context(|| format!("Failed to update '{}'", config.name()))?;

    println!("{}", path.display());
    Ok(ExitCode::SUCCESS)
}

pub fn list_operators(settings: &Settings) -> Result<ExitCode> {
    let registry = registry(settings);
    if registry.is_empty() {
        println!("No operators installed");
        return Ok(ExitCode::SUCCESS);
    }

    for entry in registry.list() {
        let source = entry
            .path
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "<built-in>".to_string());
        match entry.operator.description() {
            Some(description) => println!("{}\t{}\t{}", entry.name, source, description),
            None => println!("{}\t{}", entry.name, source),
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub fn add_operator(settings: &Settings, dir: &Path) -> Result<ExitCode> {
    let (name, added) = install_operator(&settings.operators_file(), dir)?;
    if added {
        println!("Added operator '{}'", name);
    } else {
        println!("Operator '{}' is already installed", name);
    }
    Ok(ExitCode::SUCCESS)
}

pub fn operator_schema(settings: &Settings, name: &str) -> Result<ExitCode> {
    let operator = registry(settings).get(name)?;
    for (path, help) in help_messages(operator.leaf_schema()) {
        println!("spec.{}: {}", path, help);
    }
    Ok(ExitCode::SUCCESS)
}

/// Record `dir` in the operator list file once its manifest loads
fn install_operator(list_file: &Path, dir: &Path) -> Result<(String, bool)> {
    let dir: PathBuf = std::fs::canonicalize(dir)
        .with_context(|| format!("Operator directory {} not found", dir.display()))?;
    let operator = ManifestOperator::load(&dir)?;

    let mut list = OperatorList::load(list_file)?;
    let added = list.add(dir.clone());
    if added {
        list.save(list_file)?;
        info!(operator = %operator.name(), path = %dir.display(), "Installed operator");
    }
    Ok((operator.name().to_string(), added))
}

fn render_document(document: &Value, output: OutputFormat) -> Result<String> {
    match output {
        OutputFormat::Yaml => serde_yaml::to_string(document).context("Failed to render YAML"),
        OutputFormat::Json => {
            serde_json::to_string_pretty(document).context("Failed to render JSON")
        }
    }
}

fn render_error(error: &DeploymentConfigError, output: OutputFormat) -> Result<String> {
    match output {
        OutputFormat::Yaml => Ok(error.to_string()),
        OutputFormat::Json => {
            let message = match error {
                DeploymentConfigError::Invalid { message, .. } => message.clone(),
                other => other.to_string(),
            };
            let report = serde_json::json!({
                "error": message,
                "errors": error.field_errors().cloned().unwrap_or_default(),
            });
            serde_json::to_string_pretty(&report).context("Failed to render JSON")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;
    use types::OPERATOR_MANIFEST_FILE;

    #[test]
    fn test_install_operator() {
        let tmp = TempDir::new().unwrap();
        let op_dir = tmp.path().join("aws-lambda");
        std::fs::create_dir(&op_dir).unwrap();
        std::fs::write(
            op_dir.join(OPERATOR_MANIFEST_FILE),
            "operator_schema:\n  region:\n    type: string\n",
        )
        .unwrap();
        let list_file = tmp.path().join("home").join("operators.yaml");

        let (name, added) = install_operator(&list_file, &op_dir).unwrap();
        assert_eq!(name, "aws-lambda");
        assert!(added);

        let (_, added) = install_operator(&list_file, &op_dir).unwrap();
        assert!(!added);

        let list = OperatorList::load(&list_file).unwrap();
        assert_eq!(list.operators.len(), 1);
    }

    #[test]
    fn test_install_operator_without_manifest() {
        let tmp = TempDir::new().unwrap();
        let list_file = tmp.path().join("operators.yaml");

        assert!(install_operator(&list_file, tmp.path()).is_err());
        assert!(install_operator(&list_file, &tmp.path().join("missing")).is_err());
        assert!(!list_file.exists());
    }

    #[test]
    fn test_render_document() {
        let document: Value =
            serde_yaml::from_str("api_version: v1\nmetadata:\n  name: test\n").unwrap();

        let yaml = render_document(&document, OutputFormat::Yaml).unwrap();
        assert!(yaml.contains("api_version: v1"));

        let json = render_document(&document, OutputFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["metadata"]["name"], "test");
    }

    #[test]
    fn test_render_error_json() {
        let mut errors = BTreeMap::new();
        errors.insert("spec.instances".to_string(), vec!["required field".to_string()]);
        let error = DeploymentConfigError::with_errors("schema mismatch", errors);

        let json = render_error(&error, OutputFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["error"], "schema mismatch");
        assert_eq!(parsed["errors"]["spec.instances"][0], "required field");

        let text = render_error(&error, OutputFormat::Yaml).unwrap();
        assert!(text.contains("spec.instances: required field"));
    }
}
