use crate::context::LambdaContext;
use async_trait::async_trait;
use lambda_models::LambdaError;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Value returned by one handler call.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerOutput {
    pub result: Value,
    /// Time spent inside the handler function itself, when the handler can
    /// measure it apart from its own loading.
    pub duration: Option<Duration>,
}

impl HandlerOutput {
    pub fn new(result: Value) -> Self {
        Self {
            result,
            duration: None,
        }
    }
}

#[async_trait]
pub trait Handler: Send + Sync {
    /// Run the handler once. A handler that raised comes back as
    /// `LambdaError::HandlerExecutionError` with its own error document.
    async fn call(&self, event: Value, context: &LambdaContext)
        -> Result<HandlerOutput, LambdaError>;
}

/// Resolves a `module.function` reference inside a project to a handler.
pub trait HandlerLoader: Send + Sync {
    fn load(&self, project_dir: &Path, handler: &HandlerRef) -> Result<Box<dyn Handler>, LambdaError>;
}

/// A parsed `module.function` handler reference. The module part may be
/// dotted (`pkg.mod.fn` names `pkg/mod.py`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerRef {
    pub module: String,
    pub function: String,
}

impl HandlerRef {
    pub fn parse(raw: &str) -> Result<Self, LambdaError> {
        let invalid = || LambdaError::InvalidHandler {
            handler: raw.to_string(),
        };
        let (module, function) = raw.trim().rsplit_once('.').ok_or_else(invalid)?;
        if function.is_empty() || module.split('.').any(str::is_empty) {
            return Err(invalid());
        }
        Ok(Self {
            module: module.to_string(),
            function: function.to_string(),
        })
    }

    /// Source file of the module relative to the project root.
    pub fn module_file(&self) -> PathBuf {
        let mut path: PathBuf = self.module.split('.').collect();
        path.set_extension("py");
        path
    }

    /// Name the module is registered under once loaded.
    pub fn module_name(&self) -> &str {
        &self.module
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_and_dotted_refs() {
        let simple = HandlerRef::parse("service.handler").unwrap();
        assert_eq!(simple.module, "service");
        assert_eq!(simple.function, "handler");
        assert_eq!(simple.module_file(), PathBuf::from("service.py"));

        let dotted = HandlerRef::parse("pkg.api.routes.dispatch").unwrap();
        assert_eq!(dotted.module, "pkg.api.routes");
        assert_eq!(dotted.function, "dispatch");
        assert_eq!(dotted.module_file(), PathBuf::from("pkg/api/routes.py"));
    }

    #[test]
    fn rejects_refs_without_module_or_function() {
        for raw in ["handler", "service.", ".handler", "pkg..handler", ""] {
            assert!(
                matches!(HandlerRef::parse(raw), Err(LambdaError::InvalidHandler { .. })),
                "{raw:?} should be rejected"
            );
        }
    }
}
