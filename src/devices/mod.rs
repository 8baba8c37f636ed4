pub mod driver;
pub mod models;
pub mod pulse;
pub mod register_map;
pub mod snapshot;

pub use driver::ModuleDriver;
pub use models::ModelVariant;
pub use pulse::{Edge, DEFAULT_PULSE_DURATION};
pub use register_map::{RegisterMap, SignalAddress, SignalKind};
pub use snapshot::ModuleSnapshot;
