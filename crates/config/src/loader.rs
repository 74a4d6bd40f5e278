//! Settings loader implementation

use crate::settings::Settings;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use std::path::Path;
use tracing::debug;
use types::SettingsError;

/// Settings loader that handles YAML files and environment variables
pub struct SettingsLoader;

impl SettingsLoader {
    /// Load settings from defaults, an optional file and the environment.
    ///
    /// `BENTOML_HOME` sets the bento store location; `BENTOCTL_*` variables
    /// override any setting (`BENTOCTL_LOGGING__LEVEL=debug`).
    pub fn load(settings_path: Option<&Path>) -> Result<Settings> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));

        if let Some(path) = settings_path {
            if !path.exists() {
                return Err(SettingsError::FileNotFound {
                    path: path.to_path_buf(),
                }
                .into());
            }
            figment = figment.merge(Yaml::file(path));
        }

        let settings: Settings = figment
            .merge(
                Env::raw()
                    .only(&["BENTOML_HOME"])
                    .map(|_| "bentoml_home".into()),
            )
            .merge(Env::prefixed("BENTOCTL_").split("__"))
            .extract()
            .map_err(|e| SettingsError::ParseError(e.to_string()))?;

        let settings = settings.expand_paths();
        Self::validate(&settings)?;

        debug!(home = %settings.home.display(), "Settings loaded");
        Ok(settings)
    }

    /// Load settings from string (for testing)
    pub fn load_from_str(yaml_content: &str) -> Result<Settings> {
        let settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Yaml::string(yaml_content))
            .extract()
            .context("Failed to parse settings from string")?;

        let settings = settings.expand_paths();
        Self::validate(&settings)?;
        Ok(settings)
    }

    /// Validate settings
    fn validate(settings: &Settings) -> Result<()> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&settings.logging.level.as_str()) {
            return Err(SettingsError::ValidationError {
                field: "logging.level".to_string(),
                message: format!(
                    "Invalid log level: {}. Valid levels: {:?}",
                    settings.logging.level, valid_log_levels
                ),
            }
            .into());
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&settings.logging.format.as_str()) {
            return Err(SettingsError::ValidationError {
                field: "logging.format".to_string(),
                message: format!(
                    "Invalid log format: {}. Valid formats: {:?}",
                    settings.logging.format, valid_log_formats
                ),
            }
            .into());
        }

        if settings.workdir.as_os_str().is_empty() {
            return Err(SettingsError::ValidationError {
                field: "workdir".to_string(),
                message: "Working directory cannot be empty".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Create example settings file
    pub fn create_example<P: AsRef<Path>>(path: P) -> Result<()> {
        let yaml_content = serde_yaml::to_string(&Settings::default())
            .context("Failed to serialize default settings")?;

        std::fs::write(path.as_ref(), yaml_content)
            .context("Failed to write example settings file")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.logging.level, "info");
        assert_eq!(settings.workdir, PathBuf::from("deployable"));
        assert_eq!(settings.operators_file(), settings.home.join("operators.yaml"));
    }

    #[test]
    fn test_load_from_string() {
        let yaml_content = r#"
home: /opt/bentoctl
bentoml_home: /opt/bentoml
operators_file: /etc/bentoctl/operators.yaml
logging:
  level: debug
  format: json
"#;

        let settings = SettingsLoader::load_from_str(yaml_content).unwrap();
        assert_eq!(settings.home, PathBuf::from("/opt/bentoctl"));
        assert_eq!(
            settings.operators_file(),
            PathBuf::from("/etc/bentoctl/operators.yaml")
        );
        assert_eq!(settings.bento_store().root(), Path::new("/opt/bentoml/bentos"));
        assert_eq!(settings.logging.format, "json");
    }

    #[test]
    fn test_validation_errors() {
        let result = SettingsLoader::load_from_str("logging:\n  level: loud\n");
        assert!(result.is_err());

        let result = SettingsLoader::load_from_str("logging:\n  format: xml\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_settings_file() {
        let result = SettingsLoader::load(Some(Path::new("/nonexistent/bentoctl.yaml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_create_example() {
        let temp_file = NamedTempFile::new().unwrap();
        SettingsLoader::create_example(temp_file.path()).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.contains("home:"));
        assert!(content.contains("logging:"));

        let settings = SettingsLoader::load_from_str(&content).unwrap();
        assert_eq!(settings.logging.level, "info");
    }
}
