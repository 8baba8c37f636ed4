use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use crate::devices::models::ModelVariant;
use crate::utils::error::ModuleError;

pub const DEFAULT_HOST: &str = "10.0.0.1";
pub const DEFAULT_PORT: u16 = 502;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    // Pulse settings
    #[serde(default = "default_pulse_ms")]
    pub default_pulse_ms: u64,
    #[serde(default = "default_true")]
    pub verify_writes: bool,

    // Module configuration
    #[serde(default)]
    pub modules: Vec<ModuleConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    pub name: String,                   // Module name
    #[serde(default = "default_host")]
    pub host: String,                   // IP address or hostname
    #[serde(default = "default_port")]
    pub port: u16,                      // Modbus TCP port
    #[serde(default = "default_unit_id")]
    pub unit_id: u8,                    // Modbus unit identifier
    pub model: ModelVariant,            // Register layout
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,                // Per-request timeout
}

fn default_pulse_ms() -> u64 {
    100
}

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_unit_id() -> u8 {
    1
}

fn default_timeout_ms() -> u64 {
    1000
}

impl ModuleConfig {
    pub fn new(name: &str, host: &str, model: ModelVariant) -> Self {
        Self {
            name: name.to_string(),
            host: host.to_string(),
            port: DEFAULT_PORT,
            unit_id: default_unit_id(),
            model,
            timeout_ms: default_timeout_ms(),
        }
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ModuleError> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| {
                ModuleError::ConfigError(format!(
                    "module '{}': cannot resolve {}:{}: {}",
                    self.name, self.host, self.port, e
                ))
            })?
            .next()
            .ok_or_else(|| {
                ModuleError::ConfigError(format!(
                    "module '{}': {}:{} resolved to no addresses",
                    self.name, self.host, self.port
                ))
            })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_pulse_ms: default_pulse_ms(),
            verify_writes: true,
            modules: vec![ModuleConfig::new("adam-1", DEFAULT_HOST, ModelVariant::Adam6052)],
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ModuleError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ModuleError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml(&content)?;
        info!("Loaded {} module(s) from {}", config.modules.len(), path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ModuleError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ModuleError> {
        let path = path.as_ref();
        // Create directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ModuleError::ConfigError(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| {
            ModuleError::ConfigError(format!("cannot write {}: {}", path.display(), e))
        })?;
        debug!("Saved configuration to {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ModuleError> {
        if self.default_pulse_ms == 0 {
            return Err(ModuleError::ConfigError(
                "default_pulse_ms must be greater than zero".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for module in &self.modules {
            if module.name.trim().is_empty() {
                return Err(ModuleError::ConfigError("module name must not be empty".to_string()));
            }
            if !names.insert(module.name.as_str()) {
                return Err(ModuleError::ConfigError(format!(
                    "duplicate module name '{}'",
                    module.name
                )));
            }
            if module.port == 0 {
                return Err(ModuleError::ConfigError(format!(
                    "module '{}': port must not be 0",
                    module.name
                )));
            }
            if module.timeout_ms == 0 {
                return Err(ModuleError::ConfigError(format!(
                    "module '{}': timeout_ms must be greater than zero",
                    module.name
                )));
            }
        }
        Ok(())
    }

    pub fn default_pulse_duration(&self) -> Duration {
        Duration::from_millis(self.default_pulse_ms)
    }

    // Get module by name
    pub fn get_module_by_name(&self, name: &str) -> Option<&ModuleConfig> {
        self.modules.iter().find(|m| m.name == name)
    }
}
