//!# SPI instruction set
//! Every instruction is issued as a single full-duplex transfer. The chip answers
//! read requests in the bytes following the instruction and address bytes.
use crate::can::SpiError;
use crate::message::BUFFER_SIZE;
use crate::registers::Register;
use crate::status::{RxBuffer, TxBuffer};
use embedded_hal::delay::DelayNs;
use embedded_hal::spi::SpiDevice;
use log::trace;

/// Maximum number of register bytes transferred in one READ/WRITE instruction
pub const MAX_BURST: usize = BUFFER_SIZE;

/// SPI instruction bytes
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Reset = 0xC0,
    Read = 0x03,
    Write = 0x02,
    BitModify = 0x05,
    ReadStatus = 0xA0,
    ReadRx0 = 0x90,
    ReadRx1 = 0x94,
    WriteTx0 = 0x40,
    WriteTx1 = 0x42,
    WriteTx2 = 0x44,
    /// Request to send, lower three bits select the transmit buffers
    RequestToSend = 0x80,
}

impl RxBuffer {
    /// READ RX BUFFER instruction starting at RXBnSIDH
    pub fn read_command(self) -> Command {
        match self {
            Self::Rxb0 => Command::ReadRx0,
            Self::Rxb1 => Command::ReadRx1,
        }
    }
}

impl TxBuffer {
    /// LOAD TX BUFFER instruction starting at TXBnSIDH
    pub fn write_command(self) -> Command {
        match self {
            Self::Txb0 => Command::WriteTx0,
            Self::Txb1 => Command::WriteTx1,
            Self::Txb2 => Command::WriteTx2,
        }
    }

    /// RTS instruction byte requesting transmission of this buffer
    pub fn rts_command(self) -> u8 {
        Command::RequestToSend as u8 | (1 << self.index())
    }
}

/// Register level access to the chip on top of a SPI device
pub struct RegisterProtocol<D: SpiDevice<u8>, DL: DelayNs> {
    /// Device on SPI bus
    device: D,

    /// Delay used for settle times
    delay: DL,
}

impl<D: SpiDevice<u8>, DL: DelayNs> RegisterProtocol<D, DL> {
    pub fn new(device: D, delay: DL) -> Self {
        Self { device, delay }
    }

    /// Resets all registers. Chip requires a settle time before it may be accessed again.
    pub fn reset(&mut self) -> Result<(), SpiError<D>> {
        trace!("reset");
        self.transfer(&mut [Command::Reset as u8])
    }

    /// Writes consecutive registers starting at the given register (max. [MAX_BURST] bytes)
    pub fn write_registers(&mut self, register: Register, values: &[u8]) -> Result<(), SpiError<D>> {
        check_burst(values.len())?;

        let length = 2 + values.len();
        let mut buffer = [0u8; 2 + MAX_BURST];

        buffer[0] = Command::Write as u8;
        buffer[1] = register.address();
        buffer[2..length].copy_from_slice(values);

        trace!("write {}={:02x?}", register.name(), values);
        self.transfer(&mut buffer[..length])
    }

    /// Writes a single register byte
    pub fn write_register(&mut self, register: Register, value: u8) -> Result<(), SpiError<D>> {
        self.write_registers(register, &[value])
    }

    /// Reads `data.len()` consecutive registers starting at the given register (max. [MAX_BURST] bytes)
    pub fn read_registers(&mut self, register: Register, data: &mut [u8]) -> Result<(), SpiError<D>> {
        check_burst(data.len())?;

        let length = 2 + data.len();
        let mut buffer = [0u8; 2 + MAX_BURST];

        buffer[0] = Command::Read as u8;
        buffer[1] = register.address();

        self.transfer(&mut buffer[..length])?;
        data.copy_from_slice(&buffer[2..length]);

        trace!("read {}={:02x?}", register.name(), data);
        Ok(())
    }

    /// Reads a single register byte
    pub fn read_register(&mut self, register: Register) -> Result<u8, SpiError<D>> {
        let mut data = [0u8; 1];
        self.read_registers(register, &mut data)?;

        Ok(data[0])
    }

    /// Sets the masked bits of a register to the given value, all other bits are kept
    pub fn modify_register(&mut self, register: Register, mask: u8, value: u8) -> Result<(), SpiError<D>> {
        trace!("modify {} mask={mask:02x} value={value:02x}", register.name());
        self.transfer(&mut [Command::BitModify as u8, register.address(), mask, value])
    }

    /// Reads the status byte
    pub fn read_status(&mut self) -> Result<u8, SpiError<D>> {
        let mut buffer = [Command::ReadStatus as u8, 0x0];
        self.transfer(&mut buffer)?;

        Ok(buffer[1])
    }

    /// Reads the whole receive buffer (identifier, DLC and payload). Chip clears RXnIF afterwards.
    pub fn read_rx_buffer(&mut self, rx_buffer: RxBuffer) -> Result<[u8; BUFFER_SIZE], SpiError<D>> {
        let mut buffer = [0u8; 1 + BUFFER_SIZE];
        buffer[0] = rx_buffer.read_command() as u8;

        self.transfer(&mut buffer)?;

        let mut data = [0u8; BUFFER_SIZE];
        data.copy_from_slice(&buffer[1..]);

        trace!("read {rx_buffer:?}={data:02x?}");
        Ok(data)
    }

    /// Loads the whole transmit buffer (identifier, DLC and payload)
    pub fn load_tx_buffer(&mut self, tx_buffer: TxBuffer, data: &[u8; BUFFER_SIZE]) -> Result<(), SpiError<D>> {
        let mut buffer = [0u8; 1 + BUFFER_SIZE];
        buffer[0] = tx_buffer.write_command() as u8;
        buffer[1..].copy_from_slice(data);

        trace!("load {tx_buffer:?}={data:02x?}");
        self.transfer(&mut buffer)
    }

    /// Requests transmission of a loaded transmit buffer
    pub fn request_to_send(&mut self, tx_buffer: TxBuffer) -> Result<(), SpiError<D>> {
        trace!("request to send {tx_buffer:?}");
        self.transfer(&mut [tx_buffer.rts_command()])
    }

    pub fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }

    /// Executes a full-duplex SPI transfer, response replaces the buffer content
    fn transfer(&mut self, buffer: &mut [u8]) -> Result<(), SpiError<D>> {
        self.device.transfer_in_place(buffer).map_err(SpiError::BusError)
    }
}

fn check_burst<D: SpiDevice<u8>>(length: usize) -> Result<(), SpiError<D>> {
    if length > MAX_BURST {
        return Err(SpiError::BurstTooLong(length));
    }

    Ok(())
}
