pub mod tracing;

pub use crate::tracing::*;
