use async_trait::async_trait;
use lambda_invoker::{
    invoke, Handler, HandlerLoader, HandlerOutput, HandlerRef, InvokeOptions, LambdaContext,
    PythonHandlerLoader,
};
use lambda_models::{ErrorShape, LambdaError};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default, Clone)]
struct RecordingLoader {
    loaded: Arc<Mutex<Vec<HandlerRef>>>,
    contexts: Arc<Mutex<Vec<LambdaContext>>>,
    fail: bool,
    reported: Option<Duration>,
}

struct EchoHandler {
    contexts: Arc<Mutex<Vec<LambdaContext>>>,
    fail: bool,
    reported: Option<Duration>,
}

#[async_trait]
impl Handler for EchoHandler {
    async fn call(
        &self,
        event: Value,
        context: &LambdaContext,
    ) -> Result<HandlerOutput, LambdaError> {
        self.contexts.lock().unwrap().push(context.clone());
        if self.fail {
            return Err(LambdaError::HandlerExecutionError(ErrorShape {
                error_message: "boom".into(),
                error_type: "ValueError".into(),
                stack_trace: vec![],
            }));
        }
        Ok(HandlerOutput {
            result: json!({ "echo": event, "remaining": context.remaining_time_in_millis() }),
            duration: self.reported,
        })
    }
}

impl HandlerLoader for RecordingLoader {
    fn load(&self, _project_dir: &Path, handler: &HandlerRef) -> Result<Box<dyn Handler>, LambdaError> {
        self.loaded.lock().unwrap().push(handler.clone());
        Ok(Box::new(EchoHandler {
            contexts: self.contexts.clone(),
            fail: self.fail,
            reported: self.reported,
        }))
    }
}

fn options() -> InvokeOptions {
    InvokeOptions {
        function_name: "orders".into(),
        timeout: Duration::from_secs(15),
        memory_mb: 256,
    }
}

fn event_file(dir: &Path, contents: &str) -> std::path::PathBuf {
    let path = dir.join("event.json");
    std::fs::write(&path, contents).unwrap();
    path
}

#[tokio::test]
async fn handler_receives_event_and_context() {
    let dir = tempfile::tempdir().unwrap();
    let loader = RecordingLoader::default();
    let event = event_file(dir.path(), r#"{"id": 7}"#);

    let outcome = invoke(dir.path(), "service.handler", &event, &options(), &loader)
        .await
        .unwrap();

    assert_eq!(outcome.result["echo"], json!({ "id": 7 }));
    assert!(outcome.result["remaining"].as_u64().unwrap() <= 15_000);

    let loaded = loader.loaded.lock().unwrap().clone();
    assert_eq!(loaded, vec![HandlerRef::parse("service.handler").unwrap()]);
    let contexts = loader.contexts.lock().unwrap().clone();
    assert_eq!(contexts[0].function_name, "orders");
    assert_eq!(contexts[0].memory_limit_in_mb, 256);
}

#[tokio::test]
async fn handler_error_propagates_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let loader = RecordingLoader {
        fail: true,
        ..Default::default()
    };
    let event = event_file(dir.path(), "{}");

    let err = invoke(dir.path(), "service.handler", &event, &options(), &loader)
        .await
        .unwrap_err();

    match err {
        LambdaError::HandlerExecutionError(shape) => {
            assert_eq!(shape.error_type, "ValueError");
            assert_eq!(shape.error_message, "boom");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn reported_handler_duration_is_the_elapsed_time() {
    let dir = tempfile::tempdir().unwrap();
    let loader = RecordingLoader {
        reported: Some(Duration::from_millis(3)),
        ..Default::default()
    };
    let event = event_file(dir.path(), "{}");

    let outcome = invoke(dir.path(), "service.handler", &event, &options(), &loader)
        .await
        .unwrap();

    assert_eq!(outcome.elapsed, Duration::from_millis(3));
}

#[tokio::test]
async fn malformed_event_fails_before_loading() {
    let dir = tempfile::tempdir().unwrap();
    let loader = RecordingLoader::default();
    let event = event_file(dir.path(), "{not json");

    let err = invoke(dir.path(), "service.handler", &event, &options(), &loader)
        .await
        .unwrap_err();

    assert!(matches!(err, LambdaError::InvalidEvent { .. }));
    assert!(loader.loaded.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_event_file_is_invalid_event() {
    let dir = tempfile::tempdir().unwrap();
    let err = invoke(
        dir.path(),
        "service.handler",
        &dir.path().join("nope.json"),
        &options(),
        &RecordingLoader::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, LambdaError::InvalidEvent { .. }));
}

#[tokio::test]
#[ignore = "requires a python3 interpreter"]
async fn python_handler_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("pkg")).unwrap();
    std::fs::write(dir.path().join("pkg/__init__.py"), "").unwrap();
    std::fs::write(
        dir.path().join("pkg/service.py"),
        "import os\n\
         def handler(event, context):\n\
         \x20   return {'name': context.function_name, 'stage': os.environ.get('STAGE'),\n\
         \x20           'left': context.get_remaining_time_in_millis() > 0, 'event': event}\n\
         def broken(event, context):\n\
         \x20   raise KeyError('id')\n",
    )
    .unwrap();
    let event = event_file(dir.path(), r#"{"a": 1}"#);
    let loader = PythonHandlerLoader::new("python3")
        .with_environment([("STAGE".to_string(), "dev".to_string())].into_iter().collect());

    let outcome = invoke(dir.path(), "pkg.service.handler", &event, &options(), &loader)
        .await
        .unwrap();
    assert_eq!(
        outcome.result,
        json!({ "name": "orders", "stage": "dev", "left": true, "event": { "a": 1 } })
    );

    let err = invoke(dir.path(), "pkg.service.broken", &event, &options(), &loader)
        .await
        .unwrap_err();
    match err {
        LambdaError::HandlerExecutionError(shape) => {
            assert_eq!(shape.error_type, "KeyError");
            assert!(!shape.stack_trace.is_empty());
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
#[ignore = "requires a python3 interpreter"]
async fn slow_module_import_is_not_charged_to_the_handler() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("slow.py"),
        "import time\n\
         time.sleep(1.0)\n\
         def handler(event, context):\n\
         \x20   return context.get_remaining_time_in_millis()\n",
    )
    .unwrap();
    let event = event_file(dir.path(), "{}");
    let options = InvokeOptions {
        timeout: Duration::from_secs(3),
        ..options()
    };

    let outcome = invoke(
        dir.path(),
        "slow.handler",
        &event,
        &options,
        &PythonHandlerLoader::new("python3"),
    )
    .await
    .unwrap();

    assert!(outcome.elapsed < Duration::from_millis(500), "{:?}", outcome.elapsed);
    assert!(outcome.result.as_u64().unwrap() > 2_500, "{}", outcome.result);
}
