//! Per-model address tables.
//!
//! A [`RegisterMap`] translates a `(SignalKind, logical index)` pair into the
//! physical Modbus address the module exposes for it. Tables are `'static`
//! literals, so any number of drivers for the same model share one instance.

use serde::Serialize;
use std::fmt;

use crate::utils::error::ModuleError;

/// Input register holding the two-word model identification code.
pub const MODULE_NAME_REGISTER: u16 = 210;

// Shared by every model in the series.
pub const GCL_FLAGS_REGISTER: u16 = 304;

const GCL_COUNTER_REGISTERS: [u16; 8] = [310, 312, 314, 316, 318, 320, 322, 324];
const CLEAR_GCL_COUNTER_COILS: [u16; 8] = [300, 301, 302, 303, 304, 305, 306, 307];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    DigitalOutput,
    DigitalInput,
    Counter,
    PulseLowWidth,
    PulseHighWidth,
    AbsolutePulseCount,
    IncrementalPulseCount,
    GclCounter,
    ClearGclCounter,
    OutputDiagnostics,
}

impl SignalKind {
    // Consecutive coils/registers per value.
    pub fn width(self) -> u16 {
        match self {
            SignalKind::DigitalOutput
            | SignalKind::DigitalInput
            | SignalKind::ClearGclCounter
            | SignalKind::OutputDiagnostics => 1,
            SignalKind::Counter
            | SignalKind::PulseLowWidth
            | SignalKind::PulseHighWidth
            | SignalKind::AbsolutePulseCount
            | SignalKind::IncrementalPulseCount
            | SignalKind::GclCounter => 2,
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignalKind::DigitalOutput => "digital output",
            SignalKind::DigitalInput => "digital input",
            SignalKind::Counter => "counter",
            SignalKind::PulseLowWidth => "pulse low width",
            SignalKind::PulseHighWidth => "pulse high width",
            SignalKind::AbsolutePulseCount => "absolute pulse count",
            SignalKind::IncrementalPulseCount => "incremental pulse count",
            SignalKind::GclCounter => "GCL counter",
            SignalKind::ClearGclCounter => "GCL counter clear",
            SignalKind::OutputDiagnostics => "output diagnostics",
        };
        f.write_str(name)
    }
}

/// Resolved location of one logical signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalAddress {
    pub address: u16,
    pub count: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterMap {
    pub digital_outputs: &'static [u16],
    pub digital_inputs: &'static [u16],
    pub counter_registers: &'static [u16],
    pub pulse_low_widths: &'static [u16],
    pub pulse_high_widths: &'static [u16],
    pub absolute_pulse_count: &'static [u16],
    pub incremental_pulse_count: &'static [u16],
    pub gcl_counter_registers: &'static [u16],
    pub clear_gcl_counters: &'static [u16],
    pub output_diagnostics: Option<u16>,
    pub module_name_register: u16,
    pub gcl_flags_register: u16,
}

// ADAM-6052: 8 DI, 8 DO
pub const ADAM6052_MAP: RegisterMap = RegisterMap {
    digital_outputs: &[16, 17, 18, 19, 20, 21, 22, 23],
    digital_inputs: &[0, 1, 2, 3, 4, 5, 6, 7],
    counter_registers: &[0, 2, 4, 6, 8, 10, 12, 14],
    pulse_low_widths: &[16, 18, 20, 22, 24, 26, 28, 30],
    pulse_high_widths: &[32, 34, 36, 38, 40, 42, 44, 46],
    absolute_pulse_count: &[48, 50, 52, 54, 56, 58, 60, 62],
    incremental_pulse_count: &[64, 66, 68, 70, 72, 74, 76, 78],
    gcl_counter_registers: &GCL_COUNTER_REGISTERS,
    clear_gcl_counters: &CLEAR_GCL_COUNTER_COILS,
    output_diagnostics: Some(306),
    module_name_register: MODULE_NAME_REGISTER,
    gcl_flags_register: GCL_FLAGS_REGISTER,
};

// ADAM-6060: 6 DI, 6 relay outputs
pub const ADAM6060_MAP: RegisterMap = RegisterMap {
    digital_outputs: &[16, 17, 18, 19, 20, 21],
    digital_inputs: &[0, 1, 2, 3, 4, 5],
    counter_registers: &[0, 2, 4, 6, 8, 10],
    pulse_low_widths: &[12, 14, 16, 18, 20, 22],
    pulse_high_widths: &[24, 26, 28, 30, 32, 34],
    absolute_pulse_count: &[36, 38, 40, 42, 44, 46],
    incremental_pulse_count: &[48, 50, 52, 54, 56, 58],
    gcl_counter_registers: &GCL_COUNTER_REGISTERS,
    clear_gcl_counters: &CLEAR_GCL_COUNTER_COILS,
    output_diagnostics: None,
    module_name_register: MODULE_NAME_REGISTER,
    gcl_flags_register: GCL_FLAGS_REGISTER,
};

impl RegisterMap {
    pub fn table(&self, kind: SignalKind) -> &[u16] {
        match kind {
            SignalKind::DigitalOutput => self.digital_outputs,
            SignalKind::DigitalInput => self.digital_inputs,
            SignalKind::Counter => self.counter_registers,
            SignalKind::PulseLowWidth => self.pulse_low_widths,
            SignalKind::PulseHighWidth => self.pulse_high_widths,
            SignalKind::AbsolutePulseCount => self.absolute_pulse_count,
            SignalKind::IncrementalPulseCount => self.incremental_pulse_count,
            SignalKind::GclCounter => self.gcl_counter_registers,
            SignalKind::ClearGclCounter => self.clear_gcl_counters,
            SignalKind::OutputDiagnostics => self
                .output_diagnostics
                .as_ref()
                .map(std::slice::from_ref)
                .unwrap_or(&[]),
        }
    }

    pub fn len(&self, kind: SignalKind) -> usize {
        self.table(kind).len()
    }

    // Never clamps or wraps.
    pub fn translate(&self, kind: SignalKind, index: usize) -> Result<SignalAddress, ModuleError> {
        let table = self.table(kind);
        table
            .get(index)
            .map(|&address| SignalAddress {
                address,
                count: kind.width(),
            })
            .ok_or(ModuleError::OutOfRange {
                kind,
                index,
                len: table.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_KINDS: [SignalKind; 10] = [
        SignalKind::DigitalOutput,
        SignalKind::DigitalInput,
        SignalKind::Counter,
        SignalKind::PulseLowWidth,
        SignalKind::PulseHighWidth,
        SignalKind::AbsolutePulseCount,
        SignalKind::IncrementalPulseCount,
        SignalKind::GclCounter,
        SignalKind::ClearGclCounter,
        SignalKind::OutputDiagnostics,
    ];

    #[test]
    fn test_translate_digital_output() {
        let addr = ADAM6052_MAP.translate(SignalKind::DigitalOutput, 3).unwrap();
        assert_eq!(addr, SignalAddress { address: 19, count: 1 });
    }

    #[test]
    fn test_counter_occupies_two_registers() {
        let addr = ADAM6060_MAP.translate(SignalKind::Counter, 5).unwrap();
        assert_eq!(addr, SignalAddress { address: 10, count: 2 });
    }

    #[test]
    fn test_every_table_rejects_index_at_length() {
        for map in [&ADAM6052_MAP, &ADAM6060_MAP] {
            for kind in ALL_KINDS {
                let len = map.len(kind);
                match map.translate(kind, len) {
                    Err(ModuleError::OutOfRange { kind: k, index, len: l }) => {
                        assert_eq!(k, kind);
                        assert_eq!(index, len);
                        assert_eq!(l, len);
                    }
                    other => panic!("expected OutOfRange for {kind}, got {other:?}"),
                }
                assert!(map.translate(kind, usize::MAX).is_err());
            }
        }
    }

    #[test]
    fn test_output_diagnostics_only_on_6052() {
        assert_eq!(
            ADAM6052_MAP.translate(SignalKind::OutputDiagnostics, 0).unwrap().address,
            306
        );
        assert!(matches!(
            ADAM6060_MAP.translate(SignalKind::OutputDiagnostics, 0),
            Err(ModuleError::OutOfRange { len: 0, .. })
        ));
    }

    #[test]
    fn test_table_sizes_are_independent_per_model() {
        assert_eq!(ADAM6052_MAP.len(SignalKind::DigitalOutput), 8);
        assert_eq!(ADAM6060_MAP.len(SignalKind::DigitalOutput), 6);
        assert_eq!(ADAM6060_MAP.len(SignalKind::GclCounter), 8);
    }

    #[test]
    fn test_register_tables_are_disjoint_per_space() {
        for map in [&ADAM6052_MAP, &ADAM6060_MAP] {
            let mut coils: Vec<u16> = map.digital_outputs.to_vec();
            coils.extend_from_slice(map.clear_gcl_counters);
            let before = coils.len();
            coils.sort_unstable();
            coils.dedup();
            assert_eq!(coils.len(), before);

            let mut registers: Vec<u16> = Vec::new();
            for kind in [
                SignalKind::Counter,
                SignalKind::PulseLowWidth,
                SignalKind::PulseHighWidth,
                SignalKind::AbsolutePulseCount,
                SignalKind::IncrementalPulseCount,
                SignalKind::GclCounter,
            ] {
                for &base in map.table(kind) {
                    registers.push(base);
                    registers.push(base + 1);
                }
            }
            let before = registers.len();
            registers.sort_unstable();
            registers.dedup();
            assert_eq!(registers.len(), before);
        }
    }
}
