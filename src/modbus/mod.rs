pub mod client;
pub mod simulated;

pub use client::{ModbusTransport, TcpTransport};
pub use simulated::SimulatedTransport;
