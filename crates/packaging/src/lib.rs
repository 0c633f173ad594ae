pub mod archive;
pub mod builder;
pub mod installer;
pub mod zip_handler;

pub use archive::*;
pub use builder::*;
pub use installer::*;
pub use zip_handler::*;
