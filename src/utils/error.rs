use thiserror::Error;

use crate::devices::register_map::SignalKind;

#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Invalid response from module: {0}")]
    InvalidResponse(String),

    #[error("{kind} index {index} out of range (valid: 0..{len})")]
    OutOfRange {
        kind: SignalKind,
        index: usize,
        len: usize,
    },

    #[error("Verification failed at coil {address}: wrote {expected}, read back {actual}")]
    VerificationMismatch {
        address: u16,
        expected: bool,
        actual: bool,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl ModuleError {
    pub fn is_connection(&self) -> bool {
        matches!(self, ModuleError::ConnectionError(_))
    }
}

impl From<serde_json::Error> for ModuleError {
    fn from(err: serde_json::Error) -> Self {
        ModuleError::SerializationError(format!("JSON error: {}", err))
    }
}

impl From<toml::de::Error> for ModuleError {
    fn from(err: toml::de::Error) -> Self {
        ModuleError::ConfigError(format!("TOML parse error: {}", err))
    }
}

impl From<toml::ser::Error> for ModuleError {
    fn from(err: toml::ser::Error) -> Self {
        ModuleError::ConfigError(format!("TOML write error: {}", err))
    }
}
