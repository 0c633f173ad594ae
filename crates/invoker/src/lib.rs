pub mod context;
pub mod handler;
pub mod invoke;
pub mod python;

pub use context::{ContextFields, LambdaContext, LATEST_VERSION};
pub use handler::{Handler, HandlerLoader, HandlerOutput, HandlerRef};
pub use invoke::{invoke, read_event, InvocationResult, InvokeOptions};
pub use python::{PythonHandler, PythonHandlerLoader};
