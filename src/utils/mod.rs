pub mod error;

pub use error::ModuleError;
