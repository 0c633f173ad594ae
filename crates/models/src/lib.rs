pub mod artifact;
pub mod config;
pub mod environment;
pub mod error;
pub mod function;

pub use artifact::*;
pub use config::*;
pub use environment::{resolve_environment, EnvironmentVariableValue, ResolvedEnvironment};
pub use error::*;
pub use function::*;
