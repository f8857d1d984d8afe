use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemePrepError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error), // Converts io::Error into SchemePrepError automatically

    #[error("Load error: {0}")]
    LoadError(String), // A required input source is missing or not tabular; aborts the run

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Error: {0}")]
    Error(String), // Allows custom application errors
}
