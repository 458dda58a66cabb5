//! Logger configuration and bootstrap

use crate::handlers::validate_prefix;
use crate::level::Level;
use crate::logger::Logger;
use crate::{Error, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main logger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Minimum severity that will be emitted
    pub level: Level,

    /// Output destination settings
    pub output: OutputConfig,

    /// Size-based rotation settings
    pub rotation: RotationConfig,
}

/// Output destination configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Mirror records to the console (stderr)
    pub console_enabled: bool,

    /// Write records to a rotating log file
    pub file_enabled: bool,

    /// Directory for log files; must be absolute when file logging is on
    pub log_dir: PathBuf,

    /// Alphanumeric prefix for log file names
    pub file_prefix: String,
}

/// Rotation policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationConfig {
    /// Start the background rotation policy
    pub enabled: bool,

    /// File size at which rotation triggers (in bytes)
    pub threshold_bytes: u64,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        let default_log_dir =
            Self::default_log_dir().unwrap_or_else(|_| PathBuf::from("/var/log/marten"));

        Self {
            level: Level::Error,
            output: OutputConfig {
                console_enabled: true,
                file_enabled: false,
                log_dir: default_log_dir,
                file_prefix: "marten".to_string(),
            },
            rotation: RotationConfig {
                enabled: false,
                threshold_bytes: 10 * 1024 * 1024,
            },
        }
    }
}

impl LoggerConfig {
    /// Load configuration from file or create default
    pub async fn load(config_path: Option<&Path>) -> Result<Self> {
        let config_file = match config_path {
            Some(path) => path.to_path_buf(),
            None => Self::default_config_path()?,
        };

        if config_file.exists() {
            let content =
                tokio::fs::read_to_string(&config_file)
                    .await
                    .map_err(|source| Error::Io {
                        op: "read config file",
                        path: config_file.clone(),
                        source,
                    })?;
            let config: LoggerConfig = toml::from_str(&content).map_err(|e| Error::Config {
                message: format!("Failed to parse logger config: {}", e),
            })?;
            Ok(config)
        } else {
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Save configuration to file
    pub async fn save(&self, config_path: Option<&Path>) -> Result<()> {
        let config_file = match config_path {
            Some(path) => path.to_path_buf(),
            None => Self::default_config_path()?,
        };

        if let Some(parent) = config_file.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| Error::Io {
                    op: "create config directory",
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| Error::Config {
            message: format!("Failed to serialize logger config: {}", e),
        })?;

        tokio::fs::write(&config_file, content)
            .await
            .map_err(|source| Error::Io {
                op: "write config file",
                path: config_file,
                source,
            })?;
        Ok(())
    }

    /// Load environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("MARTEN_LOG_LEVEL") {
            if let Ok(parsed) = Level::from_name(level.to_uppercase().as_str()) {
                self.level = parsed;
            }
        }

        if let Ok(enabled) = std::env::var("MARTEN_CONSOLE_LOGGING") {
            self.output.console_enabled = enabled.parse().unwrap_or(self.output.console_enabled);
        }

        if let Ok(enabled) = std::env::var("MARTEN_FILE_LOGGING") {
            self.output.file_enabled = enabled.parse().unwrap_or(self.output.file_enabled);
        }

        if let Ok(dir) = std::env::var("MARTEN_LOG_DIR") {
            self.output.log_dir = PathBuf::from(dir);
        }

        if let Ok(enabled) = std::env::var("MARTEN_ROTATION") {
            self.rotation.enabled = enabled.parse().unwrap_or(self.rotation.enabled);
        }

        if let Ok(threshold) = std::env::var("MARTEN_ROTATION_THRESHOLD") {
            if let Ok(parsed) = threshold.parse() {
                self.rotation.threshold_bytes = parsed;
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.output.file_enabled {
            if !self.output.log_dir.is_absolute() {
                return Err(Error::RelativePath {
                    path: self.output.log_dir.clone(),
                });
            }
            validate_prefix(&self.output.file_prefix)?;
        }

        if self.rotation.enabled {
            if !self.output.file_enabled {
                return Err(Error::Config {
                    message: "rotation requires file logging to be enabled".to_string(),
                });
            }
            if self.rotation.threshold_bytes == 0 {
                return Err(Error::Config {
                    message: "rotation threshold_bytes must be greater than 0".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Construct a [`Logger`] from this configuration: apply the level and
    /// handler set, then start the rotation policy when enabled (which
    /// seals the configuration).
    ///
    /// Must run inside a tokio runtime when rotation is enabled.
    pub fn build(&self) -> Result<Logger> {
        self.validate()?;

        let logger = Logger::new();
        logger.set_level(self.level)?;

        match (self.output.file_enabled, self.output.console_enabled) {
            (true, true) => {
                logger.set_handlers(&self.output.log_dir, &self.output.file_prefix)?;
            }
            (true, false) => {
                logger.set_file_handler(&self.output.log_dir, &self.output.file_prefix)?;
            }
            (false, _) => {
                logger.set_console_handler()?;
            }
        }

        if self.rotation.enabled {
            logger.start_rotation_policy(self.rotation.threshold_bytes)?;
        }

        Ok(logger)
    }

    /// Get default configuration file path
    fn default_config_path() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("rs", "marten", "marten").ok_or_else(|| {
            Error::Config {
                message: "Could not determine config directory".to_string(),
            }
        })?;

        Ok(project_dirs.config_dir().join("logger.toml"))
    }

    /// Get default log directory
    fn default_log_dir() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("rs", "marten", "marten").ok_or_else(|| {
            Error::Config {
                message: "Could not determine log directory".to_string(),
            }
        })?;

        Ok(project_dirs.data_dir().join("logs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_serialization() {
        let config = LoggerConfig::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: LoggerConfig = toml::from_str(&serialized).unwrap();

        assert_eq!(config.level, deserialized.level);
        assert_eq!(
            config.output.console_enabled,
            deserialized.output.console_enabled
        );
        assert_eq!(
            config.rotation.threshold_bytes,
            deserialized.rotation.threshold_bytes
        );
    }

    #[tokio::test]
    async fn test_config_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("logger.toml");

        let mut original = LoggerConfig::default();
        original.level = Level::Info;
        original.save(Some(&config_path)).await.unwrap();

        let loaded = LoggerConfig::load(Some(&config_path)).await.unwrap();
        assert_eq!(loaded.level, Level::Info);
        assert_eq!(loaded.output.file_prefix, original.output.file_prefix);
    }

    #[test]
    fn test_env_overrides() {
        std::env::set_var("MARTEN_LOG_LEVEL", "debug");
        std::env::set_var("MARTEN_FILE_LOGGING", "true");
        std::env::set_var("MARTEN_LOG_DIR", "/var/log/marten-test");

        let mut config = LoggerConfig::default();
        config.apply_env_overrides();

        assert_eq!(config.level, Level::Debug);
        assert!(config.output.file_enabled);
        assert_eq!(config.output.log_dir, PathBuf::from("/var/log/marten-test"));

        std::env::remove_var("MARTEN_LOG_LEVEL");
        std::env::remove_var("MARTEN_FILE_LOGGING");
        std::env::remove_var("MARTEN_LOG_DIR");
    }

    #[test]
    fn test_config_validation() {
        let mut config = LoggerConfig::default();
        assert!(config.validate().is_ok());

        config.output.file_enabled = true;
        config.output.log_dir = PathBuf::from("relative/logs");
        assert!(matches!(
            config.validate(),
            Err(Error::RelativePath { .. })
        ));

        config.output.log_dir = PathBuf::from("/var/log/app");
        config.output.file_prefix = "bad prefix".to_string();
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidPrefix { .. })
        ));

        config.output.file_prefix = "app".to_string();
        config.rotation.enabled = true;
        config.rotation.threshold_bytes = 0;
        assert!(matches!(config.validate(), Err(Error::Config { .. })));

        config.rotation.threshold_bytes = 1024;
        config.output.file_enabled = false;
        assert!(matches!(config.validate(), Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_build_with_file_and_rotation() {
        let temp_dir = TempDir::new().unwrap();

        let mut config = LoggerConfig::default();
        config.level = Level::Debug;
        config.output.console_enabled = false;
        config.output.file_enabled = true;
        config.output.log_dir = temp_dir.path().to_path_buf();
        config.output.file_prefix = "built".to_string();
        config.rotation.enabled = true;
        config.rotation.threshold_bytes = 1 << 20;

        let logger = config.build().unwrap();
        let attrs = logger.attributes();
        assert_eq!(attrs.level, Level::Debug);
        assert!(attrs.handlers.has_file());
        assert!(!attrs.handlers.has_console());
        // Rotation start seals the configuration.
        assert!(attrs.frozen);

        logger.stop_rotation_policy().await.unwrap();
    }
}
