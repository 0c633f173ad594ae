use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error document reported by a handler that raised during local invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorShape {
    pub error_message: String,
    pub error_type: String,
    #[serde(default)]
    pub stack_trace: Vec<String>,
}

#[derive(Error, Debug)]
pub enum LambdaError {
    #[error("Configuration error: {reason}")]
    ConfigError { reason: String },

    #[error("Failed to install dependency {package}: {reason}")]
    DependencyInstallError { package: String, reason: String },

    #[error("Provider call {operation} failed: {reason}")]
    ProviderError {
        operation: &'static str,
        reason: String,
    },

    #[error(
        "Function {function_name} partially updated: {completed} succeeded but {operation} failed: {reason}"
    )]
    PartialUpdate {
        function_name: String,
        completed: String,
        operation: &'static str,
        reason: String,
    },

    #[error("Failed to stage artifact to s3://{bucket}/{key}: {reason}")]
    TransportError {
        bucket: String,
        key: String,
        reason: String,
    },

    #[error("Could not delete version {version}: {reason}")]
    VersionDeletionError { version: String, reason: String },

    #[error("{}: {}", .0.error_type, .0.error_message)]
    HandlerExecutionError(ErrorShape),

    #[error("Invalid handler: {handler}")]
    InvalidHandler { handler: String },

    #[error("Invalid event payload in {path}: {reason}")]
    InvalidEvent { path: String, reason: String },

    #[error("Invalid ZIP file: {reason}")]
    InvalidZipFile { reason: String },

    #[error("Internal error: {reason}")]
    InternalError { reason: String },
}

impl LambdaError {
    pub fn config(reason: impl Into<String>) -> Self {
        LambdaError::ConfigError {
            reason: reason.into(),
        }
    }

    pub fn internal(reason: impl ToString) -> Self {
        LambdaError::InternalError {
            reason: reason.to_string(),
        }
    }

    pub fn provider(operation: &'static str, reason: impl ToString) -> Self {
        LambdaError::ProviderError {
            operation,
            reason: reason.to_string(),
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            LambdaError::ConfigError { .. } => "ConfigurationError",
            LambdaError::DependencyInstallError { .. } => "DependencyInstallError",
            LambdaError::ProviderError { .. } => "ProviderAPIError",
            LambdaError::PartialUpdate { .. } => "ProviderAPIError",
            LambdaError::TransportError { .. } => "TransportError",
            LambdaError::VersionDeletionError { .. } => "VersionDeletionError",
            LambdaError::HandlerExecutionError(_) => "HandlerExecutionError",
            LambdaError::InvalidHandler { .. } => "ConfigurationError",
            LambdaError::InvalidEvent { .. } => "InvalidEvent",
            LambdaError::InvalidZipFile { .. } => "InternalError",
            LambdaError::InternalError { .. } => "InternalError",
        }
    }
}

impl From<std::io::Error> for LambdaError {
    fn from(e: std::io::Error) -> Self {
        LambdaError::internal(e)
    }
}
