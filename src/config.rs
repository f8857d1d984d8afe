use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::SchemePrepError;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

impl LoggingConfig {
    const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
    const DEFAULT_LEVEL: &str = "info";

    fn default() -> Self {
        LoggingConfig {
            level: Self::DEFAULT_LEVEL.to_string(),
        }
    }

    fn ensure_valid(&mut self) {
        let str_original = self.level.clone();
        self.level = self.level.trim().to_ascii_lowercase();
        if !Self::LOG_LEVELS.contains(&self.level.as_str()) {
            eprintln!(
                "Config error: log level of '{}' is invalid - using default of '{}'",
                str_original,
                Self::DEFAULT_LEVEL
            );
            self.level = Self::DEFAULT_LEVEL.to_owned();
        }
    }
}

/// Where the pipeline reads raw tables and publishes artifacts.
///
/// The original deployment kept both in one directory, so that is the
/// default; either side can point elsewhere.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DataConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl DataConfig {
    const DEFAULT_DIR: &str = "data";

    fn default() -> Self {
        DataConfig {
            input_dir: PathBuf::from(Self::DEFAULT_DIR),
            output_dir: PathBuf::from(Self::DEFAULT_DIR),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    pub data: DataConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Loads the configuration from a TOML file merged over built-in
    /// defaults, with `SCHEMEPREP_*` environment variables on top.
    ///
    /// With an explicit path the file must exist. Without one, the
    /// per-user config location is used (and seeded with the defaults on
    /// first run), falling back to `schemeprep.toml` in the working
    /// directory when no per-user location is available.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, SchemePrepError> {
        let default_config = Config {
            data: DataConfig::default(),
            logging: LoggingConfig::default(),
        };

        let config_path = match explicit_path {
            Some(path) => {
                if !path.is_file() {
                    return Err(SchemePrepError::ConfigError(format!(
                        "config file '{}' not found",
                        path.display()
                    )));
                }
                path.to_path_buf()
            }
            None => Self::default_config_path(&default_config),
        };

        let figment = Figment::from(Serialized::defaults(default_config.clone()))
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed("SCHEMEPREP_").split("__"));

        let mut config: Config = match figment.extract() {
            Ok(config) => config,
            Err(err) if explicit_path.is_some() => {
                return Err(SchemePrepError::ConfigError(format!(
                    "could not load config file '{}': {}",
                    config_path.display(),
                    err
                )));
            }
            Err(err) => {
                eprintln!(
                    "Could not load config file {}: {}. Using default configuration.",
                    config_path.display(),
                    err
                );
                default_config
            }
        };

        config.ensure_valid();

        Ok(config)
    }

    /// Applies command-line directory overrides on top of the loaded config.
    pub fn with_overrides(mut self, input_dir: Option<PathBuf>, output_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = input_dir {
            self.data.input_dir = dir;
        }
        if let Some(dir) = output_dir {
            self.data.output_dir = dir;
        }
        self
    }

    fn default_config_path(default_config: &Config) -> PathBuf {
        let Some(project_dirs) = ProjectDirs::from("", "", "schemeprep") else {
            return PathBuf::from("schemeprep.toml");
        };
        let config_path = project_dirs.data_local_dir().join("config.toml");

        // Seed the default configuration to disk so users have a file to edit
        if !config_path.exists() {
            if let Some(parent) = config_path.parent() {
                if let Err(e) = fs::create_dir_all(parent) {
                    eprintln!(
                        "Failed to create configuration directory {}: {}",
                        parent.display(),
                        e
                    );
                }
            }
            if let Ok(toml_string) = toml::to_string_pretty(default_config) {
                if let Err(e) = fs::write(&config_path, toml_string) {
                    eprintln!(
                        "Failed to write default config to {}: {}",
                        config_path.display(),
                        e
                    );
                }
            } else {
                eprintln!("Failed to serialize default config.");
            }
        }

        config_path
    }

    fn ensure_valid(&mut self) {
        self.logging.ensure_valid();
    }
}
