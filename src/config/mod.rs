pub mod settings;

pub use settings::{Config, ModuleConfig, DEFAULT_HOST, DEFAULT_PORT};
