use thiserror::Error;
use std::io;

#[derive(Error, Debug)]
pub enum BoardcheckError {
    #[error("Sysfs error: {0}")]
    Sysfs(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Test execution error: {0}")]
    TestExecutionError(String),

    #[error("Unexpected error: {0}")]
    UnexpectedError(String),
}

pub type Result<T> = std::result::Result<T, BoardcheckError>;
