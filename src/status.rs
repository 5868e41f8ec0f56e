use crate::registers::StatusReg;

/// Flags returned by the READ STATUS instruction
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Status {
    /// RXB0 contains a received message
    pub rx0_full: bool,

    /// RXB1 contains a received message
    pub rx1_full: bool,

    /// TXB0 is waiting for or in transmission
    pub tx0_pending: bool,

    /// TXB0 message transmitted
    pub tx0_sent: bool,

    /// TXB1 is waiting for or in transmission
    pub tx1_pending: bool,

    /// TXB1 message transmitted
    pub tx1_sent: bool,

    /// TXB2 is waiting for or in transmission
    pub tx2_pending: bool,

    /// TXB2 message transmitted
    pub tx2_sent: bool,
}

impl Status {
    pub(crate) fn from_register(register: u8) -> Self {
        let reg = StatusReg::from(register);

        Self {
            rx0_full: reg.rx0if(),
            rx1_full: reg.rx1if(),
            tx0_pending: reg.tx0req(),
            tx0_sent: reg.tx0if(),
            tx1_pending: reg.tx1req(),
            tx1_sent: reg.tx1if(),
            tx2_pending: reg.tx2req(),
            tx2_sent: reg.tx2if(),
        }
    }

    /// Receive buffer to drain next. RXB0 always takes precedence over RXB1.
    pub fn pending_rx_buffer(&self) -> Option<RxBuffer> {
        if self.rx0_full {
            Some(RxBuffer::Rxb0)
        } else if self.rx1_full {
            Some(RxBuffer::Rxb1)
        } else {
            None
        }
    }

    /// First idle transmit buffer in order TXB0, TXB1, TXB2
    pub fn idle_tx_buffer(&self) -> Option<TxBuffer> {
        if !self.tx0_pending {
            Some(TxBuffer::Txb0)
        } else if !self.tx1_pending {
            Some(TxBuffer::Txb1)
        } else if !self.tx2_pending {
            Some(TxBuffer::Txb2)
        } else {
            None
        }
    }
}

/// Receive buffers of the MCP2515
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RxBuffer {
    Rxb0 = 0,
    Rxb1 = 1,
}

impl RxBuffer {
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::Rxb0),
            1 => Some(Self::Rxb1),
            _ => None,
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }
}

/// Transmit buffers of the MCP2515
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TxBuffer {
    Txb0 = 0,
    Txb1 = 1,
    Txb2 = 2,
}

impl TxBuffer {
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::Txb0),
            1 => Some(Self::Txb1),
            2 => Some(Self::Txb2),
            _ => None,
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }
}

/// Operation mode read from CANSTAT register
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OperationMode {
    /// Module is in normal mode
    Normal = 0b000,
    /// Module is in sleep mode
    Sleep = 0b001,
    /// Module is in loopback mode
    Loopback = 0b010,
    /// Module is in listen-only mode
    ListenOnly = 0b011,
    /// Module is in configuration mode
    Configuration = 0b100,
}

impl OperationMode {
    /// Decodes OPMOD bits of CANSTAT. Reserved values are reported as configuration mode.
    pub(crate) fn from_register(register: u8) -> Self {
        match register >> 5 {
            0b000 => Self::Normal,
            0b001 => Self::Sleep,
            0b010 => Self::Loopback,
            0b011 => Self::ListenOnly,
            _ => Self::Configuration,
        }
    }
}
