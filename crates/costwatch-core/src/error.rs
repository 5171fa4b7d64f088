//! Error types for costwatch

use aws_sdk_cloudwatch::error::{DisplayErrorContext, SdkError};
use thiserror::Error;

use crate::models::CostScope;

/// Result type alias using costwatch's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for costwatch operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// CloudWatch API error
    #[error("CloudWatch error: {0}")]
    CloudWatch(String),

    /// The provider returned no usable datapoint for the window
    #[error("No billing datapoint available for {scope}")]
    DataUnavailable {
        /// Scope that was queried
        scope: CostScope,
    },
}

impl Error {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a data-unavailable error for the given scope
    pub fn data_unavailable(scope: CostScope) -> Self {
        Self::DataUnavailable { scope }
    }
}

impl<E, R> From<SdkError<E, R>> for Error
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    fn from(err: SdkError<E, R>) -> Self {
        Self::CloudWatch(DisplayErrorContext(&err).to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
