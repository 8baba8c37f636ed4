use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use super::models::ModelVariant;
use crate::utils::error::ModuleError;

/// Point-in-time reading of every digital input, digital output and counter.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleSnapshot {
    pub model: ModelVariant,
    pub identified_name: String,
    pub timestamp: DateTime<Utc>,
    pub digital_inputs: Vec<bool>,
    pub digital_outputs: Vec<bool>,
    pub counters: Vec<u32>,
}

impl ModuleSnapshot {
    pub fn to_json(&self) -> Result<String, ModuleError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn unix_timestamp(&self) -> i64 {
        self.timestamp.timestamp()
    }
}

fn bit_row(bits: &[bool]) -> String {
    bits.iter()
        .enumerate()
        .map(|(i, &on)| format!("{}:{}", i, if on { "ON" } else { "off" }))
        .collect::<Vec<_>>()
        .join(" ")
}

impl fmt::Display for ModuleSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "📊 {} '{}' @ {}",
            self.model,
            self.identified_name,
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        writeln!(f, "   DI  {}", bit_row(&self.digital_inputs))?;
        writeln!(f, "   DO  {}", bit_row(&self.digital_outputs))?;
        write!(
            f,
            "   CNT {}",
            self.counters
                .iter()
                .enumerate()
                .map(|(i, count)| format!("{}:{}", i, count))
                .collect::<Vec<_>>()
                .join(" ")
        )
    }
}
