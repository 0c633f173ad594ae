use crate::context::LambdaContext;
use crate::handler::{Handler, HandlerLoader, HandlerOutput, HandlerRef};
use async_trait::async_trait;
use lambda_models::{ErrorShape, LambdaError};
use rust_embed::RustEmbed;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, error, instrument};

#[derive(RustEmbed)]
#[folder = "runtime"]
struct RuntimeAssets;

const SHIM_PATH: &str = "python/shim.py";

fn embedded_shim() -> Result<String, LambdaError> {
    RuntimeAssets::get(SHIM_PATH)
        .ok_or_else(|| LambdaError::InternalError {
            reason: format!("Runtime shim not found: {}", SHIM_PATH),
        })
        .map(|file| String::from_utf8_lossy(&file.data).into_owned())
}

/// Document the shim writes back after calling the handler.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<ErrorShape>,
    /// Milliseconds spent in the handler call, excluding module import.
    #[serde(default)]
    elapsed_ms: Option<f64>,
}

impl Envelope {
    fn into_output(self) -> Result<HandlerOutput, LambdaError> {
        if let Some(shape) = self.error {
            return Err(LambdaError::HandlerExecutionError(shape));
        }
        let duration = self
            .elapsed_ms
            .filter(|ms| ms.is_finite() && *ms >= 0.0)
            .map(|ms| Duration::from_secs_f64(ms / 1000.0));
        Ok(HandlerOutput {
            result: self.result,
            duration,
        })
    }
}

/// Loads Python handlers by running them under an interpreter with the
/// given environment. The calling process environment is not modified.
#[derive(Debug, Clone)]
pub struct PythonHandlerLoader {
    python: String,
    environment: BTreeMap<String, String>,
}

impl PythonHandlerLoader {
    pub fn new(python: impl Into<String>) -> Self {
        Self {
            python: python.into(),
            environment: BTreeMap::new(),
        }
    }

    pub fn with_environment(mut self, environment: BTreeMap<String, String>) -> Self {
        self.environment = environment;
        self
    }
}

impl HandlerLoader for PythonHandlerLoader {
    fn load(
        &self,
        project_dir: &Path,
        handler: &HandlerRef,
    ) -> Result<Box<dyn Handler>, LambdaError> {
        let module_file = project_dir.join(handler.module_file());
        if !module_file.is_file() {
            return Err(LambdaError::InvalidHandler {
                handler: format!(
                    "{}.{} (no module at {})",
                    handler.module,
                    handler.function,
                    module_file.display()
                ),
            });
        }
        Ok(Box::new(PythonHandler {
            python: self.python.clone(),
            project_dir: project_dir.to_path_buf(),
            module_file,
            handler: handler.clone(),
            environment: self.environment.clone(),
        }))
    }
}

pub struct PythonHandler {
    python: String,
    project_dir: PathBuf,
    module_file: PathBuf,
    handler: HandlerRef,
    environment: BTreeMap<String, String>,
}

#[async_trait]
impl Handler for PythonHandler {
    #[instrument(skip(self, event, context), fields(handler = %self.handler.module))]
    async fn call(
        &self,
        event: Value,
        context: &LambdaContext,
    ) -> Result<HandlerOutput, LambdaError> {
        let workdir = tempfile::tempdir()?;
        let event_path = workdir.path().join("event.json");
        let context_path = workdir.path().join("context.json");
        let output_path = workdir.path().join("result.json");

        let event_json = serde_json::to_vec(&event).map_err(LambdaError::internal)?;
        std::fs::write(&event_path, event_json)?;
        let context_json =
            serde_json::to_vec(&context.to_fields()).map_err(LambdaError::internal)?;
        std::fs::write(&context_path, context_json)?;

        let status = Command::new(&self.python)
            .arg("-c")
            .arg(embedded_shim()?)
            .arg(&self.project_dir)
            .arg(&self.module_file)
            .arg(self.handler.module_name())
            .arg(&self.handler.function)
            .arg(&event_path)
            .arg(&context_path)
            .arg(&output_path)
            .envs(&self.environment)
            .status()
            .await
            .map_err(|e| LambdaError::InternalError {
                reason: format!("failed to start {}: {e}", self.python),
            })?;

        let output = match std::fs::read(&output_path) {
            Ok(bytes) => bytes,
            Err(_) => {
                error!("Handler process exited with {} before reporting", status);
                return Err(LambdaError::InternalError {
                    reason: format!("handler process exited with {status} without a result"),
                });
            }
        };
        debug!("Handler process exited with {}", status);

        serde_json::from_slice::<Envelope>(&output)
            .map_err(LambdaError::internal)?
            .into_output()
    }
}
