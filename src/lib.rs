//! ADAM-6000 Digital I/O Module Library
//!
//! This library maps logical signals (digital inputs and outputs, counters,
//! pulse and frequency registers) onto the Modbus-TCP coils and registers of
//! ADAM-6000 series modules, with verified writes and software-timed pulses
//! on top of a raw Modbus transport.

pub mod cli;
pub mod config;
pub mod devices;
pub mod modbus;
pub mod utils;

// Re-export commonly used types
pub use config::{Config, ModuleConfig};
pub use devices::{Edge, ModelVariant, ModuleDriver, ModuleSnapshot, RegisterMap, SignalKind};
pub use modbus::{ModbusTransport, SimulatedTransport, TcpTransport};
pub use utils::error::ModuleError;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
