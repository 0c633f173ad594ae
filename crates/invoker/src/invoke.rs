use crate::context::LambdaContext;
use crate::handler::{HandlerLoader, HandlerRef};
use lambda_models::LambdaError;
use lambda_telemetry::TracingService;
use serde_json::Value;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::instrument;

#[derive(Debug, Clone)]
pub struct InvokeOptions {
    pub function_name: String,
    pub timeout: Duration,
    pub memory_mb: u32,
}

#[derive(Debug, Clone)]
pub struct InvocationResult {
    pub result: Value,
    pub elapsed: Duration,
}

/// Parse an event file. Missing or malformed files are `InvalidEvent`.
pub fn read_event(path: &Path) -> Result<Value, LambdaError> {
    let raw = std::fs::read_to_string(path).map_err(|e| LambdaError::InvalidEvent {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&raw).map_err(|e| LambdaError::InvalidEvent {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Load the handler, call it once with the event and time the call. A
/// duration reported by the handler wins over the time around the call.
#[instrument(skip(loader, options), fields(function_name = %options.function_name))]
pub async fn invoke(
    project_dir: &Path,
    handler_ref: &str,
    event_path: &Path,
    options: &InvokeOptions,
    loader: &dyn HandlerLoader,
) -> Result<InvocationResult, LambdaError> {
    let event = read_event(event_path)?;
    let handler = loader.load(project_dir, &HandlerRef::parse(handler_ref)?)?;
    let context = LambdaContext::new(&options.function_name, options.timeout, options.memory_mb);

    let start = Instant::now();
    let outcome = handler.call(event, &context).await;
    let wall = start.elapsed();

    let elapsed = match &outcome {
        Ok(output) => output.duration.unwrap_or(wall),
        Err(_) => wall,
    };
    TracingService::log_invocation_completed(
        &options.function_name,
        elapsed.as_millis(),
        outcome.is_ok(),
    );

    Ok(InvocationResult {
        result: outcome?.result,
        elapsed,
    })
}
