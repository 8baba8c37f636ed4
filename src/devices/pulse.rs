//! Software-timed edge pulses.
//!
//! A pulse is three forced coil states with a hold between the second and
//! third: the first arms the output at its idle level, the second produces
//! the edge, the third returns to idle.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::utils::error::ModuleError;

pub const DEFAULT_PULSE_DURATION: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    #[default]
    Rising,
    Falling,
}

impl Edge {
    // Level the output rests at before and after the pulse.
    pub fn idle_state(self) -> bool {
        matches!(self, Edge::Falling)
    }

    /// Forced states in write order. The hold follows the second entry.
    pub fn sequence(self) -> [bool; 3] {
        let idle = self.idle_state();
        [idle, !idle, idle]
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::Rising => f.write_str("rising"),
            Edge::Falling => f.write_str("falling"),
        }
    }
}

impl FromStr for Edge {
    type Err = ModuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rising" | "rise" | "up" => Ok(Edge::Rising),
            "falling" | "fall" | "down" => Ok(Edge::Falling),
            other => Err(ModuleError::InvalidArgument(format!(
                "unknown pulse polarity '{}'",
                other
            ))),
        }
    }
}

pub fn validate_duration(duration: Duration) -> Result<Duration, ModuleError> {
    if duration.is_zero() {
        return Err(ModuleError::InvalidArgument(
            "pulse duration must be greater than zero".to_string(),
        ));
    }
    Ok(duration)
}

// Rejects zero, negative and non-finite seconds.
pub fn duration_from_secs(secs: f64) -> Result<Duration, ModuleError> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(ModuleError::InvalidArgument(format!(
            "pulse duration must be a positive number of seconds, got {}",
            secs
        )));
    }
    let duration = Duration::try_from_secs_f64(secs)
        .map_err(|e| ModuleError::InvalidArgument(format!("pulse duration {}: {}", secs, e)))?;
    validate_duration(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rising_sequence_ends_low() {
        assert_eq!(Edge::Rising.sequence(), [false, true, false]);
    }

    #[test]
    fn test_falling_sequence_ends_high() {
        assert_eq!(Edge::Falling.sequence(), [true, false, true]);
    }

    #[test]
    fn test_zero_duration_rejected() {
        assert!(matches!(
            validate_duration(Duration::ZERO),
            Err(ModuleError::InvalidArgument(_))
        ));
        assert!(duration_from_secs(0.0).is_err());
        assert!(duration_from_secs(-0.5).is_err());
        assert!(duration_from_secs(f64::NAN).is_err());
    }

    #[test]
    fn test_duration_from_secs() {
        assert_eq!(duration_from_secs(0.05).unwrap(), Duration::from_millis(50));
    }

    #[test]
    fn test_parse_polarity() {
        assert_eq!("RISING".parse::<Edge>().unwrap(), Edge::Rising);
        assert_eq!("falling".parse::<Edge>().unwrap(), Edge::Falling);
        assert!("sideways".parse::<Edge>().is_err());
    }
}
