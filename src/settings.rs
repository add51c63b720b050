//! Settings related to the serial link, the timing base and the lock policy of
//! both nodes.
//!
//! Use the [builder](https://doc.rust-lang.org/1.0.0/style/ownership/builders.html)
//! pattern to set the configurable values.

use std::time::Duration;

pub use serialport::{DataBits, FlowControl, Parity, StopBits};

use crate::policy::Policy;

// =============================================================================
// Public Interface
// =============================================================================

/// Groups all settings used by the `doorcom` nodes and acts as a
/// [builder](https://doc.rust-lang.org/1.0.0/style/ownership/builders.html)
/// for the settings.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Settings {
    /// The port name, usually the device path.
    pub path: Option<String>,
    /// The baud rate in symbols-per-second.
    pub baud_rate: u32,
    /// Number of bits used to represent a character sent on the line.
    pub data_bits: DataBits,
    /// The type of signalling to use for controlling data transfer.
    pub flow_control: FlowControl,
    /// The type of parity to use for error checking.
    pub parity: Parity,
    /// Number of bits to use to signal the end of a character.
    pub stop_bits: StopBits,

    /// How long a receive may wait for the peer before giving up. `None`
    /// (the default) blocks forever, exactly like the ECU firmware: a
    /// peer that never answers stalls the node.
    pub receive_timeout: Option<Duration>,

    /// Period of one timing tick. Every duration in the [`Policy`] is counted
    /// in ticks, so shortening the period speeds up the whole system.
    pub tick_period: Duration,

    /// Path to the file emulating the control node's EEPROM. Only used by the
    /// control node; when not set the credential lives in memory.
    pub store_path: Option<String>,

    /// Attempt limit and dwell times.
    pub policy: Policy,

    /// Restrict creation of `Settings` instances unless through the
    /// `SettingsBuilder`.
    #[doc(hidden)]
    _private_use_builder: (),
}

/// The builder for the `Settings` values.
///
/// All values are optional and have default values that will be used if not
/// explicitly set.
///
/// **Example**
///
/// ```
/// use doorcom::SettingsBuilder;
///
/// let settings = SettingsBuilder::new().path("/dev/ttyUSB0").finalize();
/// assert_eq!(settings.baud_rate, 4800);
/// ```
pub struct SettingsBuilder {
    settings: Settings,
}
impl SettingsBuilder {
    /// Start building the settings using default values and no path for the
    /// port.
    pub fn new() -> Self {
        SettingsBuilder {
            settings: Settings {
                path: None,
                baud_rate: 4_800,
                data_bits: DataBits::Eight,
                flow_control: FlowControl::None,
                parity: Parity::None,
                stop_bits: StopBits::One,
                receive_timeout: None,
                tick_period: Duration::from_secs(1),
                store_path: None,
                policy: Policy::default(),
                _private_use_builder: (),
            },
        }
    }

    /// Set the path to the serial port
    pub fn path<'a>(mut self, path: impl Into<std::borrow::Cow<'a, str>>) -> Self {
        self.settings.path = Some(path.into().as_ref().to_owned());
        self
    }

    /// Set the baud rate in symbols-per-second
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.settings.baud_rate = baud_rate;
        self
    }

    /// Set the number of bits used to represent a character sent on the line
    pub fn data_bits(mut self, data_bits: DataBits) -> Self {
        self.settings.data_bits = data_bits;
        self
    }

    /// Set the type of signalling to use for controlling data transfer
    pub fn flow_control(mut self, flow_control: FlowControl) -> Self {
        self.settings.flow_control = flow_control;
        self
    }

    /// Set the type of parity to use for error checking
    pub fn parity(mut self, parity: Parity) -> Self {
        self.settings.parity = parity;
        self
    }

    /// Set the number of bits to use to signal the end of a character
    pub fn stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.settings.stop_bits = stop_bits;
        self
    }

    /// Bound every receive to `timeout`
    pub fn receive_timeout(mut self, timeout: Duration) -> Self {
        self.settings.receive_timeout = Some(timeout);
        self
    }

    /// Set the period of one timing tick
    pub fn tick_period(mut self, tick_period: Duration) -> Self {
        self.settings.tick_period = tick_period;
        self
    }

    /// Set the path to the credential store file
    pub fn store_path<'a>(mut self, store_path: impl Into<std::borrow::Cow<'a, str>>) -> Self {
        self.settings.store_path = Some(store_path.into().as_ref().to_owned());
        self
    }

    /// Replace the lockout and timing policy
    pub fn policy(mut self, policy: Policy) -> Self {
        self.settings.policy = policy;
        self
    }

    pub fn finalize(self) -> Settings {
        self.settings
    }
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn all_default() {
    let settings = SettingsBuilder::new().finalize();
    assert_eq!(
        settings,
        Settings {
            path: None,
            baud_rate: 4_800,
            data_bits: DataBits::Eight,
            flow_control: FlowControl::None,
            parity: Parity::None,
            stop_bits: StopBits::One,
            receive_timeout: None,
            tick_period: Duration::from_secs(1),
            store_path: None,
            policy: Policy::default(),
            _private_use_builder: (),
        }
    )
}

#[test]
fn path() {
    let settings = SettingsBuilder::new().path("/dev/ttyUSB0").finalize();
    assert_eq!(settings.path.unwrap(), "/dev/ttyUSB0");
}

#[test]
fn baud_rate() {
    let baud_rate = 9_600;
    let settings = SettingsBuilder::new().baud_rate(baud_rate).finalize();
    assert_eq!(settings.baud_rate, baud_rate);
}

#[test]
fn parity() {
    let parity = Parity::Even;
    let settings = SettingsBuilder::new().parity(parity).finalize();
    assert_eq!(settings.parity, parity);
}

#[test]
fn receive_timeout() {
    let settings = SettingsBuilder::new()
        .receive_timeout(Duration::from_millis(250))
        .finalize();
    assert_eq!(settings.receive_timeout, Some(Duration::from_millis(250)));
}

#[test]
fn tick_period() {
    let settings = SettingsBuilder::new()
        .tick_period(Duration::from_millis(1))
        .finalize();
    assert_eq!(settings.tick_period, Duration::from_millis(1));
}

#[test]
fn store_path() {
    let settings = SettingsBuilder::new().store_path("eeprom.bin").finalize();
    assert_eq!(settings.store_path.unwrap(), "eeprom.bin");
}

#[test]
fn policy() {
    let policy = Policy {
        max_attempts: 5,
        ..Policy::default()
    };
    let settings = SettingsBuilder::new().policy(policy).finalize();
    assert_eq!(settings.policy.max_attempts, 5);
    assert_eq!(settings.policy.lockout_seconds, 60);
}
