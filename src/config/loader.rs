//! Configuration Loader
//!
//! Environment-aware configuration loading: built-in defaults, an optional
//! TOML file, then prefixed environment variables, merged by the `config`
//! crate and validated before use.

use super::OrchestratorConfig;
use crate::error::Result;
use ::config::{Config, Environment, File, FileFormat};
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_ENV_PREFIX: &str = "CRAWLER";

/// Builder for an [`OrchestratorConfig`]
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    file_required: bool,
    env_prefix: String,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            file: None,
            file_required: false,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }

    /// Layer a TOML file over the defaults; a missing optional file is skipped
    pub fn with_file(mut self, path: impl AsRef<Path>, required: bool) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self.file_required = required;
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn load(&self) -> Result<OrchestratorConfig> {
        let environment = detect_environment();
        let mut builder = Config::builder().set_default("environment", environment.clone())?;

        if let Some(path) = &self.file {
            debug!(
                path = %path.display(),
                required = self.file_required,
                "Layering configuration file"
            );
            builder = builder.add_source(
                File::from(path.as_path())
                    .format(FileFormat::Toml)
                    .required(self.file_required),
            );
        }

        builder = builder.add_source(
            Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: OrchestratorConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        debug!(
            environment = %config.environment,
            max_tracked_tasks = config.max_tracked_tasks,
            simulation_steps = config.simulation.steps,
            "Configuration loaded successfully"
        );
        Ok(config)
    }
}

/// Get current environment from environment variables
pub fn detect_environment() -> String {
    env::var("CRAWLER_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogFormat;
    use std::io::Write;

    #[test]
    fn test_load_without_sources_yields_defaults() {
        let config = ConfigLoader::new()
            .with_env_prefix("CRAWLER_TEST_EMPTY")
            .load()
            .unwrap();
        assert_eq!(config.max_tracked_tasks, OrchestratorConfig::default().max_tracked_tasks);
        assert_eq!(config.simulation, OrchestratorConfig::default().simulation);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "max_per_page = 100\nlog_format = \"json\"\n\n[simulation]\nsteps = 4\n"
        )
        .unwrap();

        let config = ConfigLoader::new()
            .with_file(file.path(), true)
            .with_env_prefix("CRAWLER_TEST_FILE")
            .load()
            .unwrap();

        assert_eq!(config.max_per_page, 100);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.simulation.steps, 4);
        assert_eq!(config.simulation.step_interval_ms, 500);
    }

    #[test]
    fn test_missing_required_file_is_an_error() {
        let result = ConfigLoader::new()
            .with_file("/nonexistent/crawler.toml", true)
            .with_env_prefix("CRAWLER_TEST_MISSING")
            .load();
        assert!(result.is_err());
    }

    #[test]
    fn test_environment_overrides_file() {
        env::set_var("CRAWLER_TEST_ENV_SIMULATION__STEPS", "7");
        env::set_var("CRAWLER_TEST_ENV_CONTROL_TIMEOUT_MS", "1500");

        let config = ConfigLoader::new()
            .with_env_prefix("CRAWLER_TEST_ENV")
            .load()
            .unwrap();

        env::remove_var("CRAWLER_TEST_ENV_SIMULATION__STEPS");
        env::remove_var("CRAWLER_TEST_ENV_CONTROL_TIMEOUT_MS");

        assert_eq!(config.simulation.steps, 7);
        assert_eq!(config.control_timeout_ms, 1500);
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "default_per_page = 900").unwrap();

        let result = ConfigLoader::new()
            .with_file(file.path(), true)
            .with_env_prefix("CRAWLER_TEST_INVALID")
            .load();
        assert!(result.is_err());
    }
}
