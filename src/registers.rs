#![allow(unused_braces)]
use crate::config::ConfigError;
use core::str::FromStr;
use modular_bitfield_msb::prelude::*;

/// Register addresses of the MCP2515
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
pub enum Register {
    RXF0SIDH = 0x00,
    BFPCTRL = 0x0C,
    TXRTSCTRL = 0x0D,
    CANSTAT = 0x0E,
    CANCTRL = 0x0F,
    TEC = 0x1C,
    REC = 0x1D,
    RXM0SIDH = 0x20,
    RXM1SIDH = 0x24,
    CNF3 = 0x28,
    CNF2 = 0x29,
    CNF1 = 0x2A,
    CANINTE = 0x2B,
    CANINTF = 0x2C,
    EFLG = 0x2D,
    TXB0CTRL = 0x30,
    TXB1CTRL = 0x40,
    TXB2CTRL = 0x50,
    RXB0CTRL = 0x60,
    RXB1CTRL = 0x70,
}

/// Datasheet names of all known registers
const REGISTER_NAMES: [(&str, Register); 20] = [
    ("RXF0SIDH", Register::RXF0SIDH),
    ("BFPCTRL", Register::BFPCTRL),
    ("TXRTSCTRL", Register::TXRTSCTRL),
    ("CANSTAT", Register::CANSTAT),
    ("CANCTRL", Register::CANCTRL),
    ("TEC", Register::TEC),
    ("REC", Register::REC),
    ("RXM0SIDH", Register::RXM0SIDH),
    ("RXM1SIDH", Register::RXM1SIDH),
    ("CNF3", Register::CNF3),
    ("CNF2", Register::CNF2),
    ("CNF1", Register::CNF1),
    ("CANINTE", Register::CANINTE),
    ("CANINTF", Register::CANINTF),
    ("EFLG", Register::EFLG),
    ("TXB0CTRL", Register::TXB0CTRL),
    ("TXB1CTRL", Register::TXB1CTRL),
    ("TXB2CTRL", Register::TXB2CTRL),
    ("RXB0CTRL", Register::RXB0CTRL),
    ("RXB1CTRL", Register::RXB1CTRL),
];

impl Register {
    /// Address byte used in READ/WRITE/BIT MODIFY instructions
    pub fn address(self) -> u8 {
        self as u8
    }

    /// Datasheet name of the register
    pub fn name(self) -> &'static str {
        REGISTER_NAMES
            .iter()
            .find(|(_, register)| *register == self)
            .map(|(name, _)| *name)
            .unwrap_or("")
    }
}

impl FromStr for Register {
    type Err = ConfigError;

    /// Resolves a datasheet register name, e.g. `"CNF1"`
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        REGISTER_NAMES
            .iter()
            .find(|(known, _)| *known == name)
            .map(|(_, register)| *register)
            .ok_or(ConfigError::UnknownRegister)
    }
}

impl TryFrom<u8> for Register {
    type Error = ConfigError;

    fn try_from(address: u8) -> Result<Self, Self::Error> {
        REGISTER_NAMES
            .iter()
            .find(|(_, register)| register.address() == address)
            .map(|(_, register)| *register)
            .ok_or(ConfigError::UnknownRegister)
    }
}

#[bitfield]
#[derive(Default)]
#[repr(u8)]
/// Byte returned by the READ STATUS instruction
pub struct StatusReg {
    /// TXB2 message transmitted interrupt flag (CANINTF.TX2IF)
    pub tx2if: bool,
    /// TXB2 message transmit request (TXB2CTRL.TXREQ)
    pub tx2req: bool,
    /// TXB1 message transmitted interrupt flag (CANINTF.TX1IF)
    pub tx1if: bool,
    /// TXB1 message transmit request (TXB1CTRL.TXREQ)
    pub tx1req: bool,
    /// TXB0 message transmitted interrupt flag (CANINTF.TX0IF)
    pub tx0if: bool,
    /// TXB0 message transmit request (TXB0CTRL.TXREQ)
    pub tx0req: bool,
    /// RXB1 full interrupt flag (CANINTF.RX1IF)
    pub rx1if: bool,
    /// RXB0 full interrupt flag (CANINTF.RX0IF)
    pub rx0if: bool,
}

#[bitfield]
#[derive(Default)]
#[repr(u8)]
/// Configuration register 1: synchronization jump width and baud rate prescaler
pub struct Cnf1 {
    /// Synchronization jump width length bits, SJW = (sjw + 1) * TQ
    pub sjw: B2,
    /// Baud rate prescaler bits, TQ = 2 * (brp + 1) / Fosc
    pub brp: B6,
}

#[bitfield]
#[derive(Default)]
#[repr(u8)]
/// Configuration register 2: propagation and phase segment 1
pub struct Cnf2 {
    /// PS2 bit time length bit. If set, PHSEG2 is taken from CNF3
    pub btlmode: bool,
    /// Sample point configuration bit. If set, bus is sampled three times
    pub sam: bool,
    /// PS1 length bits, PS1 = (phseg1 + 1) * TQ
    pub phseg1: B3,
    /// Propagation segment length bits, PRSEG = (prseg + 1) * TQ
    pub prseg: B3,
}

#[bitfield]
#[derive(Default)]
#[repr(u8)]
/// Configuration register 3: phase segment 2
pub struct Cnf3 {
    /// Start-of-frame signal bit
    pub sof: bool,
    /// Wake-up filter bit
    pub wakfil: bool,
    #[skip]
    __: B3,
    /// PS2 length bits, PS2 = (phseg2 + 1) * TQ
    pub phseg2: B3,
}

#[bitfield]
#[derive(Default)]
#[repr(u8)]
/// Receive buffer 0 control register
pub struct Rxb0Ctrl {
    #[skip]
    __: B1,
    /// Receive buffer operating mode bits, `0b11` turns filters off (receive any message)
    pub rxm: B2,
    #[skip]
    __: B1,
    /// Received remote transfer request bit
    pub rxrtr: bool,
    /// Rollover enable bit, RXB0 message rolls over into RXB1 if RXB0 is full
    pub bukt: bool,
    /// Read-only copy of BUKT bit
    pub bukt1: bool,
    /// Filter hit bit
    pub filhit0: bool,
}

#[bitfield]
#[derive(Default)]
#[repr(u8)]
/// Receive buffer 1 control register
pub struct Rxb1Ctrl {
    #[skip]
    __: B1,
    /// Receive buffer operating mode bits, `0b11` turns filters off (receive any message)
    pub rxm: B2,
    #[skip]
    __: B1,
    /// Received remote transfer request bit
    pub rxrtr: bool,
    /// Filter hit bits
    pub filhit: B3,
}

#[bitfield]
#[derive(Default)]
#[repr(u8)]
/// CAN control register
pub struct CanCtrl {
    /// Request operation mode bits
    pub reqop: B3,
    /// Abort all pending transmissions bit
    pub abat: bool,
    /// One-shot mode bit
    pub osm: bool,
    /// CLKOUT pin enable bit
    pub clken: bool,
    /// CLKOUT pin prescaler bits
    pub clkpre: B2,
}

#[bitfield]
#[derive(Default)]
#[repr(u8)]
/// Second identifier byte of a transmit/receive buffer (TXBnSIDL/RXBnSIDL)
pub struct SidLow {
    /// Standard identifier bits 2..0, or extended identifier bits 20..18
    pub sid: B3,
    /// Standard frame remote transmit request bit (receive buffers only)
    pub srr: bool,
    /// Extended identifier flag bit
    pub ide: bool,
    #[skip]
    __: B1,
    /// Extended identifier bits 17..16
    pub eid: B2,
}

#[bitfield]
#[derive(Default)]
#[repr(u8)]
/// Data length code byte of a transmit/receive buffer (TXBnDLC/RXBnDLC)
pub struct DlcReg {
    #[skip]
    __: B1,
    /// Remote transmission request bit
    pub rtr: bool,
    #[skip]
    __: B2,
    /// Data length code bits
    pub dlc: B4,
}
