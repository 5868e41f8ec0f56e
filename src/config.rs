//!# Bit timing and device configuration
//!
//! Bit timing is derived for a fixed 8 MHz oscillator and a bit time of 8 time quanta:
//!
//! | Segment | Length |
//! |---------|--------|
//! | SYNC    | 1 TQ   |
//! | PRSEG   | 1 TQ   |
//! | PHSEG1  | 3 TQ   |
//! | PHSEG2  | 3 TQ   |
//!
//! Only the prescaler varies with the bit rate, see [timing_for].
//!
//! ```
//!# use mcp2515::config::{timing_for, BitTiming, ConfigError};
//! assert_eq!(BitTiming { cnf1: 0x00, cnf2: 0x90, cnf3: 0x02 }, timing_for(500_000).unwrap());
//! assert_eq!(ConfigError::UnsupportedBitRate(1_000_000), timing_for(1_000_000).unwrap_err());
//! ```
use crate::registers::{CanCtrl, Cnf1, Cnf2, Cnf3, Rxb0Ctrl, Rxb1Ctrl};
use serde::{Deserialize, Serialize};

/// Oscillator frequency the prescaler table is computed for
pub const OSCILLATOR_HZ: u32 = 8_000_000;

/// Number of time quanta per bit
pub const TIME_QUANTA_PER_BIT: u32 = 8;

/// Supported bit rates (bits/s) and their baud rate prescaler (BRP) values
const PRESCALERS: [(u32, u8); 7] = [
    (10_000, 49),
    (20_000, 24),
    (50_000, 9),
    (100_000, 4),
    (125_000, 3),
    (250_000, 1),
    (500_000, 0),
];

/// Possible configuration errors
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Register name or address is not part of the register table
    UnknownRegister,
    /// Bit rate is not part of the prescaler table
    UnsupportedBitRate(u32),
}

/// Register values of CNF1, CNF2 and CNF3 for one bit rate
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BitTiming {
    pub cnf1: u8,
    pub cnf2: u8,
    pub cnf3: u8,
}

impl BitTiming {
    /// Register values in address order starting at CNF3 (CNF3, CNF2, CNF1)
    pub(crate) fn as_registers(&self) -> [u8; 3] {
        [self.cnf3, self.cnf2, self.cnf1]
    }
}

/// Returns the timing register values for the given bit rate
pub fn timing_for(bit_rate: u32) -> Result<BitTiming, ConfigError> {
    let prescaler = PRESCALERS
        .iter()
        .find(|(rate, _)| *rate == bit_rate)
        .map(|(_, prescaler)| *prescaler)
        .ok_or(ConfigError::UnsupportedBitRate(bit_rate))?;

    Ok(BitTiming {
        cnf1: initial_cnf1(prescaler),
        cnf2: initial_cnf2(),
        cnf3: initial_cnf3(),
    })
}

/// Returns all supported bit rates in ascending order
pub fn supported_bit_rates() -> impl Iterator<Item = u32> {
    PRESCALERS.iter().map(|(rate, _)| *rate)
}

/// SJW = 1 TQ, prescaler from table
fn initial_cnf1(prescaler: u8) -> u8 {
    Cnf1::new().with_sjw(0).with_brp(prescaler).into()
}

/// PRSEG = 1 TQ, PHSEG1 = 3 TQ, PHSEG2 taken from CNF3
fn initial_cnf2() -> u8 {
    Cnf2::new().with_btlmode(true).with_phseg1(2).with_prseg(0).into()
}

/// PHSEG2 = 3 TQ
fn initial_cnf3() -> u8 {
    Cnf3::new().with_phseg2(2).into()
}

/// Entire configuration applied during setup
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    /// CAN bus bit rate in bits/s
    pub bit_rate: u32,

    /// Messages roll over from RXB0 to RXB1 if RXB0 is full
    pub rollover: bool,

    /// Operation mode requested at the end of setup
    pub mode: RequestMode,
}

impl Configuration {
    /// Normal mode with rollover enabled
    pub fn new(bit_rate: u32) -> Self {
        Self {
            bit_rate,
            rollover: true,
            mode: RequestMode::Normal,
        }
    }

    /// Receive buffer 0 accepts any message
    pub(crate) fn as_rxb0ctrl_register(&self) -> u8 {
        Rxb0Ctrl::new().with_rxm(0b11).with_bukt(self.rollover).into()
    }

    /// Receive buffer 1 accepts any message
    pub(crate) fn as_rxb1ctrl_register(&self) -> u8 {
        Rxb1Ctrl::new().with_rxm(0b11).into()
    }

    /// CLKOUT disabled, requested operation mode
    pub(crate) fn as_canctrl_register(&self) -> u8 {
        self.mode.as_canctrl_register()
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new(500_000)
    }
}

/// Operation mode requested via CANCTRL.REQOP
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestMode {
    /// Normal operation, sends and receives on the bus
    Normal = 0b000,
    /// Sleep mode
    Sleep = 0b001,
    /// Internal loopback, transmitted messages are received without driving the bus
    Loopback = 0b010,
    /// Listen-only, receives all messages but never transmits (not even acknowledges)
    ListenOnly = 0b011,
    /// Configuration mode, required for changing bit timing
    Configuration = 0b100,
}

impl Default for RequestMode {
    fn default() -> Self {
        Self::Normal
    }
}

impl RequestMode {
    pub(crate) fn as_canctrl_register(&self) -> u8 {
        CanCtrl::new().with_reqop(*self as u8).into()
    }
}
