//! In-memory stand-in for a module, used for dry runs and tests.

use async_trait::async_trait;
use log::debug;
use std::collections::{HashMap, HashSet};

use super::client::ModbusTransport;
use crate::devices::models::ModelVariant;
use crate::utils::error::ModuleError;

#[derive(Debug, Default)]
pub struct SimulatedTransport {
    coils: HashMap<u16, bool>,
    discrete_inputs: HashMap<u16, bool>,
    input_registers: HashMap<u16, u16>,
    stuck_coils: HashSet<u16>,
    coil_writes: Vec<(u16, bool)>,
    request_count: usize,
    open: bool,
    unreachable: bool,
    short_responses: bool,
}

impl SimulatedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A simulated module that identifies itself as `model`.
    pub fn for_model(model: ModelVariant) -> Self {
        let mut sim = Self::new();
        let code = u16::from_str_radix(model.model_code(), 16).unwrap_or_default();
        sim.set_input_register(model.register_map().module_name_register, code);
        sim
    }

    pub fn set_coil(&mut self, address: u16, value: bool) {
        self.coils.insert(address, value);
    }

    pub fn coil(&self, address: u16) -> bool {
        self.coils.get(&address).copied().unwrap_or(false)
    }

    pub fn set_discrete_input(&mut self, address: u16, value: bool) {
        self.discrete_inputs.insert(address, value);
    }

    pub fn set_input_register(&mut self, address: u16, value: u16) {
        self.input_registers.insert(address, value);
    }

    /// Acknowledge writes to `address` without changing its state.
    pub fn stick_coil(&mut self, address: u16) {
        self.stuck_coils.insert(address);
    }

    /// Make every subsequent request fail as if the module dropped off the network.
    pub fn set_unreachable(&mut self, unreachable: bool) {
        self.unreachable = unreachable;
        if unreachable {
            self.open = false;
        }
    }

    /// Answer every read with one item fewer than requested.
    pub fn set_short_responses(&mut self, short: bool) {
        self.short_responses = short;
    }

    pub fn coil_writes(&self) -> &[(u16, bool)] {
        &self.coil_writes
    }

    /// Total round trips attempted, including failed ones.
    pub fn request_count(&self) -> usize {
        self.request_count
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    fn begin_request(&mut self) -> Result<(), ModuleError> {
        self.request_count += 1;
        if self.unreachable {
            return Err(ModuleError::ConnectionError("simulated module unreachable".to_string()));
        }
        if !self.open {
            return Err(ModuleError::ConnectionError("simulated module not connected".to_string()));
        }
        Ok(())
    }

    fn reply_len(&self, count: u16) -> u16 {
        if self.short_responses {
            count.saturating_sub(1)
        } else {
            count
        }
    }
}

fn read_bits(map: &HashMap<u16, bool>, address: u16, count: u16) -> Vec<bool> {
    (0..count)
        .map(|offset| map.get(&address.wrapping_add(offset)).copied().unwrap_or(false))
        .collect()
}

#[async_trait]
impl ModbusTransport for SimulatedTransport {
    async fn connect(&mut self) -> Result<(), ModuleError> {
        if self.unreachable {
            return Err(ModuleError::ConnectionError("simulated module unreachable".to_string()));
        }
        self.open = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), ModuleError> {
        self.open = false;
        Ok(())
    }

    async fn read_coils(&mut self, address: u16, count: u16) -> Result<Vec<bool>, ModuleError> {
        self.begin_request()?;
        Ok(read_bits(&self.coils, address, self.reply_len(count)))
    }

    async fn write_single_coil(&mut self, address: u16, value: bool) -> Result<(), ModuleError> {
        self.begin_request()?;
        debug!("sim: coil {} <- {}", address, value);
        self.coil_writes.push((address, value));
        if !self.stuck_coils.contains(&address) {
            self.coils.insert(address, value);
        }
        Ok(())
    }

    async fn read_discrete_inputs(
        &mut self,
        address: u16,
        count: u16,
    ) -> Result<Vec<bool>, ModuleError> {
        self.begin_request()?;
        Ok(read_bits(&self.discrete_inputs, address, self.reply_len(count)))
    }

    async fn read_input_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, ModuleError> {
        self.begin_request()?;
        Ok((0..self.reply_len(count))
            .map(|offset| {
                self.input_registers
                    .get(&address.wrapping_add(offset))
                    .copied()
                    .unwrap_or(0)
            })
            .collect())
    }
}
