pub mod helpers;
pub mod packages;
pub mod provider;

pub use helpers::*;
pub use packages::*;
pub use provider::*;
