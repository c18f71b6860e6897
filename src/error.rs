//! Unified application error type.
//!
//! Every failure that ends the process surfaces as an [`AppError`], which
//! decides the exit status.

use crate::config::ConfigError;
use crate::port::{ConfigureError, OpenError};
use crate::runner::SinkError;
use std::process::ExitCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot open serial port: {0}")]
    Open(#[from] OpenError),

    #[error("cannot configure serial port: {0}")]
    Configure(#[from] ConfigureError),

    #[error(transparent)]
    Output(#[from] SinkError),

    #[error("failed to open output file: {0}")]
    OutputFile(#[source] std::io::Error),

    #[error("failed to list serial ports: {0}")]
    ListPorts(#[from] serialport::Error),

    #[error("{0}")]
    Unsupported(&'static str),

    #[error("worker task failed: {0}")]
    Join(String),
}

impl AppError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Config(_) => 2,
            AppError::Open(_) => 3,
            AppError::Configure(_) => 4,
            AppError::Output(_) | AppError::OutputFile(_) => 5,
            AppError::ListPorts(_) | AppError::Unsupported(_) | AppError::Join(_) => 1,
        }
    }
}

impl From<&AppError> for ExitCode {
    fn from(err: &AppError) -> Self {
        ExitCode::from(err.exit_code())
    }
}

pub type AppResult<T> = Result<T, AppError>;
