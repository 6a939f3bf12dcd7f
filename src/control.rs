use std::fmt::Display;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PROPAGATION_DELAY_MS: u32 = 250;
pub const DEFAULT_BASE_DELAY_MS: u32 = 80;
pub const DEFAULT_PER_BYTE_DELAY_MS: u32 = 2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControlError {
    #[error("missing simulator command, expected one of: propdelay, basedelay, perbyte")]
    MissingCommand,

    #[error("unknown simulator command: {0}")]
    UnknownCommand(String),

    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Delay knobs of the simulated link.
///
/// Shared between the transmit schedulers and whoever reconfigures the
/// link. Each knob is stored on its own; readers take a [`SimParams`]
/// snapshot per packet.
pub struct SimControl {
    propagation_ms: AtomicU32,
    base_ms: AtomicU32,
    per_byte_ms: AtomicU32,
}

impl SimControl {
    pub fn new(propagation_ms: u32, base_ms: u32, per_byte_ms: u32) -> Self {
        SimControl {
            propagation_ms: AtomicU32::new(propagation_ms),
            base_ms: AtomicU32::new(base_ms),
            per_byte_ms: AtomicU32::new(per_byte_ms),
        }
    }

    pub fn propagation_delay(&self) -> u32 {
        self.propagation_ms.load(Ordering::Relaxed)
    }

    pub fn base_delay(&self) -> u32 {
        self.base_ms.load(Ordering::Relaxed)
    }

    pub fn per_byte_delay(&self) -> u32 {
        self.per_byte_ms.load(Ordering::Relaxed)
    }

    pub fn set_propagation_delay(&self, ms: u32) -> u32 {
        self.propagation_ms.store(ms, Ordering::Relaxed);
        log::info!("propagation delay set to {} ms", ms);
        ms
    }

    pub fn set_base_delay(&self, ms: u32) -> u32 {
        self.base_ms.store(ms, Ordering::Relaxed);
        log::info!("base delay set to {} ms", ms);
        ms
    }

    pub fn set_per_byte_delay(&self, ms: u32) -> u32 {
        self.per_byte_ms.store(ms, Ordering::Relaxed);
        log::info!("per byte delay set to {} ms", ms);
        ms
    }

    pub fn snapshot(&self) -> SimParams {
        SimParams {
            propagation: Duration::from_millis(self.propagation_delay() as u64),
            base: Duration::from_millis(self.base_delay() as u64),
            per_byte: Duration::from_millis(self.per_byte_delay() as u64),
        }
    }

    /// Runs one `sim` sub-command, e.g. `["propdelay", "100"]`.
    ///
    /// Without a value the current setting is reported, with a value it is
    /// replaced first. Returns the confirmation line.
    pub fn command<S: AsRef<str>>(&self, args: &[S]) -> Result<String, ControlError> {
        let (name, value) = match args {
            [] => return Err(ControlError::MissingCommand),
            [name] => (name.as_ref(), None),
            [name, value, ..] => (name.as_ref(), Some(value.as_ref())),
        };

        let (label, current, setter): (&'static str, u32, fn(&Self, u32) -> u32) = match name {
            "propdelay" => (
                "Simulator propagation delay, ms",
                self.propagation_delay(),
                Self::set_propagation_delay,
            ),
            "basedelay" => (
                "Simulator base delay, ms",
                self.base_delay(),
                Self::set_base_delay,
            ),
            "perbyte" => (
                "Simulator per byte delay, ms",
                self.per_byte_delay(),
                Self::set_per_byte_delay,
            ),
            other => return Err(ControlError::UnknownCommand(other.to_string())),
        };

        let accepted = match value {
            None => current,
            Some(value) => {
                let ms = value
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| ControlError::InvalidValue {
                        name: label,
                        value: value.to_string(),
                    })?;
                setter(self, ms)
            }
        };

        Ok(format!("{}: {}", label, accepted))
    }
}

impl Default for SimControl {
    fn default() -> Self {
        Self::new(
            DEFAULT_PROPAGATION_DELAY_MS,
            DEFAULT_BASE_DELAY_MS,
            DEFAULT_PER_BYTE_DELAY_MS,
        )
    }
}

impl Display for SimControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "simulated link: propagation {} ms, base {} ms, per byte {} ms",
            self.propagation_delay(),
            self.base_delay(),
            self.per_byte_delay()
        )
    }
}

/// Delay settings in effect for one packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimParams {
    pub propagation: Duration,
    pub base: Duration,
    pub per_byte: Duration,
}

impl SimParams {
    /// Time needed to put `len` bytes on the wire.
    pub fn serialization_delay(&self, len: usize) -> Duration {
        let len = u32::try_from(len).unwrap_or(u32::MAX);
        self.base.saturating_add(self.per_byte.saturating_mul(len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialization_delay_is_base_plus_per_byte() {
        let params = SimControl::new(0, 80, 2).snapshot();
        assert_eq!(params.serialization_delay(100), Duration::from_millis(280));
        assert_eq!(params.serialization_delay(0), Duration::from_millis(80));
        assert_eq!(params.serialization_delay(1), Duration::from_millis(82));
    }

    #[test]
    fn zero_settings_disable_everything() {
        let params = SimControl::new(0, 0, 0).snapshot();
        assert_eq!(params.serialization_delay(1500), Duration::ZERO);
        assert_eq!(params.propagation, Duration::ZERO);
    }

    #[test]
    fn setters_report_accepted_value() {
        let control = SimControl::default();
        assert_eq!(control.propagation_delay(), DEFAULT_PROPAGATION_DELAY_MS);
        assert_eq!(control.set_propagation_delay(0), 0);
        assert_eq!(control.set_base_delay(12), 12);
        assert_eq!(control.set_per_byte_delay(3), 3);
        assert_eq!(
            control.snapshot(),
            SimParams {
                propagation: Duration::ZERO,
                base: Duration::from_millis(12),
                per_byte: Duration::from_millis(3),
            }
        );
    }

    #[test]
    fn command_shows_and_sets() {
        let control = SimControl::default();
        assert_eq!(
            control.command(&["propdelay"]).unwrap(),
            "Simulator propagation delay, ms: 250"
        );
        assert_eq!(
            control.command(&["basedelay", "10"]).unwrap(),
            "Simulator base delay, ms: 10"
        );
        assert_eq!(
            control.command(&["perbyte", "0"]).unwrap(),
            "Simulator per byte delay, ms: 0"
        );
        assert_eq!(control.base_delay(), 10);
        assert_eq!(control.per_byte_delay(), 0);
    }

    #[test]
    fn command_rejects_bad_input() {
        let control = SimControl::default();
        let none: [&str; 0] = [];
        assert_eq!(control.command(&none), Err(ControlError::MissingCommand));
        assert_eq!(
            control.command(&["jitter", "5"]),
            Err(ControlError::UnknownCommand("jitter".to_string()))
        );
        assert!(matches!(
            control.command(&["propdelay", "-5"]),
            Err(ControlError::InvalidValue { .. })
        ));
        assert_eq!(control.propagation_delay(), DEFAULT_PROPAGATION_DELAY_MS);
    }
}
