//! Signal-level access to one ADAM-6000 module.
//!
//! [`ModuleDriver`] owns its transport exclusively and resolves every logical
//! index through the model's [`RegisterMap`]; nothing in here branches on the
//! model itself. All operations take `&mut self`, so a driver has at most one
//! request in flight. Share a driver between tasks by wrapping it in a
//! `tokio::sync::Mutex`.

use chrono::Utc;
use log::{debug, error, info, warn};
use std::time::Duration;

use super::models::ModelVariant;
use super::pulse::{self, Edge};
use super::register_map::{RegisterMap, SignalKind};
use super::snapshot::ModuleSnapshot;
use crate::config::settings::ModuleConfig;
use crate::modbus::client::{ModbusTransport, TcpTransport};
use crate::utils::error::ModuleError;

/// Combines a low/high register pair into one 32-bit value.
pub fn compose_u32(low: u16, high: u16) -> u32 {
    (u32::from(high) << 16) | u32::from(low)
}

// Zero registers contribute nothing to the code.
pub fn render_identification(low: u16, high: u16) -> String {
    [low, high]
        .iter()
        .filter(|&&word| word != 0)
        .map(|word| format!("{:x}", word))
        .collect()
}

pub struct ModuleDriver<T: ModbusTransport> {
    model: ModelVariant,
    register_map: &'static RegisterMap,
    transport: T,
    connected: bool,
    identified_name: String,
}

impl ModuleDriver<TcpTransport> {
    pub fn from_config(config: &ModuleConfig) -> Result<Self, ModuleError> {
        let addr = config.socket_addr()?;
        let transport = TcpTransport::new(addr, config.unit_id, config.timeout());
        Ok(Self::new(config.model, transport))
    }
}

impl<T: ModbusTransport> ModuleDriver<T> {
    pub fn new(model: ModelVariant, transport: T) -> Self {
        Self {
            model,
            register_map: model.register_map(),
            transport,
            connected: false,
            identified_name: String::new(),
        }
    }

    pub fn model(&self) -> ModelVariant {
        self.model
    }

    pub fn register_map(&self) -> &'static RegisterMap {
        self.register_map
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn name(&self) -> &str {
        &self.identified_name
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Opens the transport and reads the module identification once.
    pub async fn connect(&mut self) -> Result<bool, ModuleError> {
        if let Err(e) = self.transport.connect().await {
            self.connected = false;
            error!("❌ Failed to connect to {} module: {}", self.model, e);
            return Err(e);
        }
        self.connected = true;

        let name = self.identify().await?;
        if self.model.matches_identification(&name) {
            info!("✅ Connected to {} (identified as '{}')", self.model, name);
        } else {
            warn!(
                "⚠️  Module identified as '{}' but configured as {} (expected '{}')",
                name,
                self.model,
                self.model.model_code()
            );
        }
        Ok(self.connected)
    }

    pub async fn disconnect(&mut self) -> Result<(), ModuleError> {
        self.connected = false;
        self.transport.disconnect().await
    }

    pub async fn identify(&mut self) -> Result<String, ModuleError> {
        let registers = self
            .read_registers(self.register_map.module_name_register, 2)
            .await?;
        self.identified_name = render_identification(registers[0], registers[1]);
        debug!("Module name registers {:?} -> '{}'", registers, self.identified_name);
        Ok(self.identified_name.clone())
    }

    /// Writes one coil and, when `verify` is set, reads it back once.
    /// A mismatch is reported, not corrected.
    pub async fn set_digital_output(
        &mut self,
        index: usize,
        state: bool,
        verify: bool,
    ) -> Result<(), ModuleError> {
        let signal = self.register_map.translate(SignalKind::DigitalOutput, index)?;
        debug!("DO{} (coil {}) <- {}", index, signal.address, state);

        let result = self.transport.write_single_coil(signal.address, state).await;
        self.track(result)?;

        if verify {
            let actual = self.read_coil(signal.address).await?;
            if actual != state {
                error!(
                    "❌ DO{} read back {} after writing {} (coil {})",
                    index, actual, state, signal.address
                );
                return Err(ModuleError::VerificationMismatch {
                    address: signal.address,
                    expected: state,
                    actual,
                });
            }
        }
        Ok(())
    }

    pub async fn get_digital_output(&mut self, index: usize) -> Result<bool, ModuleError> {
        let signal = self.register_map.translate(SignalKind::DigitalOutput, index)?;
        self.read_coil(signal.address).await
    }

    pub async fn get_digital_input(&mut self, index: usize) -> Result<bool, ModuleError> {
        let signal = self.register_map.translate(SignalKind::DigitalInput, index)?;
        let result = self.transport.read_discrete_inputs(signal.address, 1).await;
        let bits = self.track(result)?;
        bits.first().copied().ok_or_else(|| {
            ModuleError::InvalidResponse(format!(
                "no bits returned for discrete input {}",
                signal.address
            ))
        })
    }

    /// Drives a single software-timed pulse on a digital output.
    ///
    /// A failed step aborts the sequence without rollback. Dropping the
    /// future during the hold leaves the output at its pulse level.
    pub async fn pulse_digital_output(
        &mut self,
        index: usize,
        polarity: Edge,
        verify: bool,
        duration: Duration,
    ) -> Result<(), ModuleError> {
        let duration = pulse::validate_duration(duration)?;
        self.register_map.translate(SignalKind::DigitalOutput, index)?;

        let [arm, fire, release] = polarity.sequence();
        info!("⚡ Pulsing DO{} ({} edge, {:?})", index, polarity, duration);

        self.set_digital_output(index, arm, verify).await?;
        self.set_digital_output(index, fire, verify).await?;
        tokio::time::sleep(duration).await;
        self.set_digital_output(index, release, verify).await
    }

    pub async fn get_counter(&mut self, index: usize) -> Result<u32, ModuleError> {
        self.read_u32(SignalKind::Counter, index).await
    }

    /// Reads the single register at the counter's base address as tenths of a hertz.
    pub async fn get_frequency(&mut self, index: usize) -> Result<f64, ModuleError> {
        let signal = self.register_map.translate(SignalKind::Counter, index)?;
        let registers = self.read_registers(signal.address, 1).await?;
        Ok(f64::from(registers[0]) / 10.0)
    }

    pub async fn get_pulse_low_width(&mut self, index: usize) -> Result<u32, ModuleError> {
        self.read_u32(SignalKind::PulseLowWidth, index).await
    }

    pub async fn get_pulse_high_width(&mut self, index: usize) -> Result<u32, ModuleError> {
        self.read_u32(SignalKind::PulseHighWidth, index).await
    }

    pub async fn get_absolute_pulse_count(&mut self, index: usize) -> Result<u32, ModuleError> {
        self.read_u32(SignalKind::AbsolutePulseCount, index).await
    }

    pub async fn get_incremental_pulse_count(&mut self, index: usize) -> Result<u32, ModuleError> {
        self.read_u32(SignalKind::IncrementalPulseCount, index).await
    }

    pub async fn get_gcl_counter(&mut self, index: usize) -> Result<u32, ModuleError> {
        self.read_u32(SignalKind::GclCounter, index).await
    }

    // The module resets the clear bit itself, so there is no read-back.
    pub async fn clear_gcl_counter(&mut self, index: usize) -> Result<(), ModuleError> {
        let signal = self.register_map.translate(SignalKind::ClearGclCounter, index)?;
        info!("Clearing GCL counter {} (coil {})", index, signal.address);
        let result = self.transport.write_single_coil(signal.address, true).await;
        self.track(result)
    }

    pub async fn get_gcl_flags(&mut self) -> Result<u16, ModuleError> {
        let registers = self
            .read_registers(self.register_map.gcl_flags_register, 1)
            .await?;
        Ok(registers[0])
    }

    pub async fn get_output_diagnostics(&mut self) -> Result<u16, ModuleError> {
        let signal = self.register_map.translate(SignalKind::OutputDiagnostics, 0)?;
        let registers = self.read_registers(signal.address, signal.count).await?;
        Ok(registers[0])
    }

    pub async fn snapshot(&mut self) -> Result<ModuleSnapshot, ModuleError> {
        let mut digital_inputs = Vec::with_capacity(self.register_map.digital_inputs.len());
        for index in 0..self.register_map.digital_inputs.len() {
            digital_inputs.push(self.get_digital_input(index).await?);
        }

        let mut digital_outputs = Vec::with_capacity(self.register_map.digital_outputs.len());
        for index in 0..self.register_map.digital_outputs.len() {
            digital_outputs.push(self.get_digital_output(index).await?);
        }

        let mut counters = Vec::with_capacity(self.register_map.counter_registers.len());
        for index in 0..self.register_map.counter_registers.len() {
            counters.push(self.get_counter(index).await?);
        }

        Ok(ModuleSnapshot {
            model: self.model,
            identified_name: self.identified_name.clone(),
            timestamp: Utc::now(),
            digital_inputs,
            digital_outputs,
            counters,
        })
    }

    fn track<R>(&mut self, result: Result<R, ModuleError>) -> Result<R, ModuleError> {
        if let Err(e) = &result {
            if e.is_connection() && self.connected {
                warn!("Lost connection to {} module: {}", self.model, e);
                self.connected = false;
            }
        }
        result
    }

    async fn read_coil(&mut self, address: u16) -> Result<bool, ModuleError> {
        let result = self.transport.read_coils(address, 1).await;
        let bits = self.track(result)?;
        bits.first().copied().ok_or_else(|| {
            ModuleError::InvalidResponse(format!("no bits returned for coil {}", address))
        })
    }

    async fn read_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>, ModuleError> {
        let result = self.transport.read_input_registers(address, count).await;
        let registers = self.track(result)?;
        if registers.len() < usize::from(count) {
            return Err(ModuleError::InvalidResponse(format!(
                "expected {} register(s) at {}, got {}",
                count,
                address,
                registers.len()
            )));
        }
        Ok(registers)
    }

    async fn read_u32(&mut self, kind: SignalKind, index: usize) -> Result<u32, ModuleError> {
        let signal = self.register_map.translate(kind, index)?;
        let registers = self.read_registers(signal.address, signal.count).await?;
        Ok(compose_u32(registers[0], registers[1]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modbus::simulated::SimulatedTransport;
    use std::time::Instant;

    async fn connected(model: ModelVariant) -> ModuleDriver<SimulatedTransport> {
        let mut driver = ModuleDriver::new(model, SimulatedTransport::for_model(model));
        assert!(driver.connect().await.unwrap());
        driver
    }

    #[test]
    fn test_compose_u32() {
        assert_eq!(compose_u32(5, 2), 131077);
        assert_eq!(compose_u32(0xFFFF, 0xFFFF), u32::MAX);
    }

    #[test]
    fn test_render_identification() {
        assert_eq!(render_identification(0x41, 0x42), "4142");
        assert_eq!(render_identification(0, 0x5A), "5a");
        assert_eq!(render_identification(0, 0), "");
    }

    #[tokio::test]
    async fn test_connect_identifies_module() {
        let driver = connected(ModelVariant::Adam6052).await;
        assert!(driver.is_connected());
        assert_eq!(driver.name(), "6052");
    }

    #[tokio::test]
    async fn test_connect_failure_reports_connection_error() {
        let mut sim = SimulatedTransport::new();
        sim.set_unreachable(true);
        let mut driver = ModuleDriver::new(ModelVariant::Adam6060, sim);
        assert!(matches!(driver.connect().await, Err(ModuleError::ConnectionError(_))));
        assert!(!driver.is_connected());
        assert_eq!(driver.name(), "");
    }

    #[tokio::test]
    async fn test_identify_concatenates_low_then_high() {
        let mut driver = connected(ModelVariant::Adam6052).await;
        driver.transport_mut().set_input_register(210, 0x41);
        driver.transport_mut().set_input_register(211, 0x42);
        assert_eq!(driver.identify().await.unwrap(), "4142");

        driver.transport_mut().set_input_register(210, 0);
        driver.transport_mut().set_input_register(211, 0x5A);
        assert_eq!(driver.identify().await.unwrap(), "5a");
        assert_eq!(driver.name(), "5a");
    }

    #[tokio::test]
    async fn test_connect_tolerates_model_code_mismatch() {
        let sim = SimulatedTransport::for_model(ModelVariant::Adam6060);
        let mut driver = ModuleDriver::new(ModelVariant::Adam6052, sim);
        assert!(driver.connect().await.unwrap());
        assert!(driver.is_connected());
        assert_eq!(driver.name(), "6060");
    }

    #[tokio::test]
    async fn test_short_response_is_invalid_not_indexed() {
        let mut driver = connected(ModelVariant::Adam6052).await;
        driver.transport_mut().set_short_responses(true);

        assert!(matches!(driver.identify().await, Err(ModuleError::InvalidResponse(_))));
        assert!(matches!(driver.get_counter(0).await, Err(ModuleError::InvalidResponse(_))));
        assert!(matches!(driver.get_frequency(0).await, Err(ModuleError::InvalidResponse(_))));
        assert!(matches!(
            driver.get_digital_output(0).await,
            Err(ModuleError::InvalidResponse(_))
        ));
        assert!(matches!(
            driver.get_digital_input(0).await,
            Err(ModuleError::InvalidResponse(_))
        ));
        // A malformed reply says nothing about the link.
        assert!(driver.is_connected());
        assert_eq!(driver.name(), "6052");
    }

    #[tokio::test]
    async fn test_set_then_get_every_output() {
        for model in ModelVariant::ALL {
            let mut driver = connected(model).await;
            for index in 0..model.register_map().digital_outputs.len() {
                driver.set_digital_output(index, true, true).await.unwrap();
                assert!(driver.get_digital_output(index).await.unwrap());
                driver.set_digital_output(index, false, true).await.unwrap();
                assert!(!driver.get_digital_output(index).await.unwrap());
            }
        }
    }

    #[tokio::test]
    async fn test_out_of_range_index_never_reaches_transport() {
        let mut driver = connected(ModelVariant::Adam6060).await;
        let before = driver.transport().request_count();

        assert!(matches!(
            driver.set_digital_output(6, true, true).await,
            Err(ModuleError::OutOfRange { kind: SignalKind::DigitalOutput, index: 6, len: 6 })
        ));
        assert!(matches!(
            driver.get_digital_input(6).await,
            Err(ModuleError::OutOfRange { kind: SignalKind::DigitalInput, .. })
        ));
        assert!(matches!(
            driver.get_counter(6).await,
            Err(ModuleError::OutOfRange { kind: SignalKind::Counter, .. })
        ));
        assert!(matches!(
            driver.get_frequency(99).await,
            Err(ModuleError::OutOfRange { .. })
        ));
        assert_eq!(driver.transport().request_count(), before);
    }

    #[tokio::test]
    async fn test_verification_mismatch_on_stuck_coil() {
        let mut driver = connected(ModelVariant::Adam6052).await;
        driver.transport_mut().stick_coil(16);
        match driver.set_digital_output(0, true, true).await {
            Err(ModuleError::VerificationMismatch { address, expected, actual }) => {
                assert_eq!(address, 16);
                assert!(expected);
                assert!(!actual);
            }
            other => panic!("expected VerificationMismatch, got {:?}", other),
        }
        // Unverified writes are not read back.
        assert!(driver.set_digital_output(0, true, false).await.is_ok());
    }

    #[tokio::test]
    async fn test_get_digital_input() {
        let mut driver = connected(ModelVariant::Adam6052).await;
        driver.transport_mut().set_discrete_input(3, true);
        assert!(driver.get_digital_input(3).await.unwrap());
        assert!(!driver.get_digital_input(2).await.unwrap());
    }

    #[tokio::test]
    async fn test_rising_pulse_from_high() {
        let mut driver = connected(ModelVariant::Adam6052).await;
        driver.transport_mut().set_coil(16, true);

        let start = Instant::now();
        driver
            .pulse_digital_output(0, Edge::Rising, true, Duration::from_millis(50))
            .await
            .unwrap();

        assert!(start.elapsed() >= Duration::from_millis(50));
        assert_eq!(
            driver.transport().coil_writes(),
            &[(16, false), (16, true), (16, false)]
        );
        assert!(!driver.get_digital_output(0).await.unwrap());
    }

    #[tokio::test]
    async fn test_falling_pulse_ends_high() {
        let mut driver = connected(ModelVariant::Adam6060).await;
        driver
            .pulse_digital_output(5, Edge::Falling, true, Duration::from_millis(5))
            .await
            .unwrap();
        assert_eq!(
            driver.transport().coil_writes(),
            &[(21, true), (21, false), (21, true)]
        );
        assert!(driver.transport().coil(21));
    }

    #[tokio::test]
    async fn test_zero_duration_pulse_touches_nothing() {
        let mut driver = connected(ModelVariant::Adam6052).await;
        let before = driver.transport().request_count();
        assert!(matches!(
            driver
                .pulse_digital_output(0, Edge::Rising, true, Duration::ZERO)
                .await,
            Err(ModuleError::InvalidArgument(_))
        ));
        assert!(matches!(
            driver
                .pulse_digital_output(8, Edge::Rising, true, Duration::from_millis(5))
                .await,
            Err(ModuleError::OutOfRange { .. })
        ));
        assert!(driver.transport().coil_writes().is_empty());
        assert_eq!(driver.transport().request_count(), before);
    }

    #[tokio::test]
    async fn test_pulse_aborts_at_failed_step() {
        let mut driver = connected(ModelVariant::Adam6052).await;
        driver.transport_mut().stick_coil(17);
        let result = driver
            .pulse_digital_output(1, Edge::Rising, true, Duration::from_millis(5))
            .await;
        assert!(matches!(
            result,
            Err(ModuleError::VerificationMismatch { address: 17, expected: true, .. })
        ));
        // Arm step passed, fire step failed, release never issued.
        assert_eq!(driver.transport().coil_writes(), &[(17, false), (17, true)]);
    }

    #[tokio::test]
    async fn test_counter_and_frequency_decoding() {
        let mut driver = connected(ModelVariant::Adam6052).await;
        driver.transport_mut().set_input_register(4, 5);
        driver.transport_mut().set_input_register(5, 2);
        assert_eq!(driver.get_counter(2).await.unwrap(), 131077);

        driver.transport_mut().set_input_register(6, 123);
        assert_eq!(driver.get_frequency(3).await.unwrap(), 12.3);
    }

    #[tokio::test]
    async fn test_pulse_measurement_registers() {
        let mut driver = connected(ModelVariant::Adam6060).await;
        driver.transport_mut().set_input_register(12, 250);
        driver.transport_mut().set_input_register(24, 750);
        driver.transport_mut().set_input_register(36, 1);
        driver.transport_mut().set_input_register(37, 1);
        driver.transport_mut().set_input_register(58, 9);
        assert_eq!(driver.get_pulse_low_width(0).await.unwrap(), 250);
        assert_eq!(driver.get_pulse_high_width(0).await.unwrap(), 750);
        assert_eq!(driver.get_absolute_pulse_count(0).await.unwrap(), 65537);
        assert_eq!(driver.get_incremental_pulse_count(5).await.unwrap(), 9);
    }

    #[tokio::test]
    async fn test_gcl_counters_and_flags() {
        let mut driver = connected(ModelVariant::Adam6060).await;
        driver.transport_mut().set_input_register(324, 7);
        driver.transport_mut().set_input_register(304, 0b1010);
        assert_eq!(driver.get_gcl_counter(7).await.unwrap(), 7);
        assert_eq!(driver.get_gcl_flags().await.unwrap(), 0b1010);

        driver.clear_gcl_counter(7).await.unwrap();
        assert_eq!(driver.transport().coil_writes(), &[(307, true)]);
    }

    #[tokio::test]
    async fn test_output_diagnostics_depends_on_model() {
        let mut driver = connected(ModelVariant::Adam6052).await;
        driver.transport_mut().set_input_register(306, 0x00FF);
        assert_eq!(driver.get_output_diagnostics().await.unwrap(), 0x00FF);

        let mut driver = connected(ModelVariant::Adam6060).await;
        assert!(matches!(
            driver.get_output_diagnostics().await,
            Err(ModuleError::OutOfRange { kind: SignalKind::OutputDiagnostics, len: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_transport_failure_clears_connected() {
        let mut driver = connected(ModelVariant::Adam6052).await;
        driver.transport_mut().set_unreachable(true);
        assert!(matches!(
            driver.get_digital_output(0).await,
            Err(ModuleError::ConnectionError(_))
        ));
        assert!(!driver.is_connected());

        driver.transport_mut().set_unreachable(false);
        assert!(driver.connect().await.unwrap());
        assert!(driver.is_connected());
    }

    #[tokio::test]
    async fn test_disconnect_closes_transport() {
        let mut driver = connected(ModelVariant::Adam6052).await;
        driver.disconnect().await.unwrap();
        assert!(!driver.is_connected());
        assert!(!driver.transport().is_open());
    }

    #[tokio::test]
    async fn test_snapshot_covers_every_signal() {
        let mut driver = connected(ModelVariant::Adam6060).await;
        driver.transport_mut().set_discrete_input(0, true);
        driver.transport_mut().set_coil(21, true);
        driver.transport_mut().set_input_register(10, 42);

        let snapshot = driver.snapshot().await.unwrap();
        assert_eq!(snapshot.digital_inputs, vec![true, false, false, false, false, false]);
        assert_eq!(snapshot.digital_outputs, vec![false, false, false, false, false, true]);
        assert_eq!(snapshot.counters, vec![0, 0, 0, 0, 0, 42]);
        assert_eq!(snapshot.identified_name, "6060");
    }
}
