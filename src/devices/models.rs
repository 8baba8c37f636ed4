use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::register_map::{RegisterMap, ADAM6052_MAP, ADAM6060_MAP};
use crate::utils::error::ModuleError;

/// Supported module models. Adding hardware means adding a variant and a
/// register table; driver logic never branches on the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelVariant {
    Adam6052,
    Adam6060,
}

impl ModelVariant {
    pub const ALL: [ModelVariant; 2] = [ModelVariant::Adam6052, ModelVariant::Adam6060];

    pub fn register_map(self) -> &'static RegisterMap {
        match self {
            ModelVariant::Adam6052 => &ADAM6052_MAP,
            ModelVariant::Adam6060 => &ADAM6060_MAP,
        }
    }

    /// Identification code the module reports from its name register.
    pub fn model_code(self) -> &'static str {
        match self {
            ModelVariant::Adam6052 => "6052",
            ModelVariant::Adam6060 => "6060",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ModelVariant::Adam6052 => "ADAM-6052 8-input/8-output digital module",
            ModelVariant::Adam6060 => "ADAM-6060 6-input/6-relay-output digital module",
        }
    }

    pub fn matches_identification(self, identified: &str) -> bool {
        identified.eq_ignore_ascii_case(self.model_code())
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ADAM-{}", self.model_code())
    }
}

impl FromStr for ModelVariant {
    type Err = ModuleError;

    /// Accepts `adam6052`, `ADAM-6052` or a bare `6052`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "");
        let code = normalized.strip_prefix("adam").unwrap_or(&normalized);
        ModelVariant::ALL
            .into_iter()
            .find(|model| model.model_code() == code)
            .ok_or_else(|| ModuleError::InvalidArgument(format!("unknown module model '{}'", s)))
    }
}
