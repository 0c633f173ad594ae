use lambda_models::{BuildArtifact, FunctionSummary, LambdaError};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

pub struct TracingService;

impl TracingService {
    /// Install the global subscriber. Logs go to stderr; `RUST_LOG`
    /// overrides the level chosen by `verbose`.
    pub fn init(format: LogFormat, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
        let default_level = if verbose { "debug" } else { "info" };
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level));

        match format {
            LogFormat::Json => tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| e as Box<dyn std::error::Error>)?,
            LogFormat::Text => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| e as Box<dyn std::error::Error>)?,
        }

        Ok(())
    }

    pub fn log_build_completed(function_name: &str, artifact: &BuildArtifact, entries: usize) {
        info!(
            function_name = %function_name,
            path = %artifact.path.display(),
            sha256 = %artifact.sha256,
            size = artifact.size,
            entries = entries,
            "Build completed"
        );
    }

    pub fn log_function_created(summary: &FunctionSummary) {
        info!(
            function_name = %summary.function_name,
            function_arn = %summary.function_arn,
            version = %summary.version.as_deref().unwrap_or("none"),
            "Function created"
        );
    }

    pub fn log_function_updated(summary: &FunctionSummary) {
        info!(
            function_name = %summary.function_name,
            function_arn = %summary.function_arn,
            version = %summary.version.as_deref().unwrap_or("none"),
            "Function updated"
        );
    }

    pub fn log_artifact_staged(bucket: &str, key: &str, size: usize) {
        info!(bucket = %bucket, key = %key, size = size, "Artifact staged");
    }

    pub fn log_version_deleted(function_name: &str, version: &str) {
        info!(function_name = %function_name, version = %version, "Version deleted");
    }

    pub fn log_version_skipped(function_name: &str, version: &str, reason: &str) {
        warn!(
            function_name = %function_name,
            version = %version,
            reason = %reason,
            "Skipping version"
        );
    }

    pub fn log_invocation_completed(function_name: &str, elapsed_ms: u128, succeeded: bool) {
        if succeeded {
            info!(
                function_name = %function_name,
                elapsed_ms = elapsed_ms as u64,
                "Invocation completed"
            );
        } else {
            warn!(
                function_name = %function_name,
                elapsed_ms = elapsed_ms as u64,
                "Invocation raised"
            );
        }
    }

    pub fn log_error(operation: &str, err: &LambdaError) {
        error!(
            operation = %operation,
            error_type = %err.error_type(),
            error_message = %err,
            "Error occurred"
        );
    }
}
