//!# CAN Controller device
//!
//!```
//!# use mcp2515::can::{DeviceState, MCP2515};
//!# use mcp2515::example::*;
//!# use mcp2515::frame::Frame;
//!# use mcp2515::status::TxBuffer;
//!#
//! let spi_dev = ExampleSPIDevice::default();
//!
//! // Initialize controller object
//! let can_controller: MCP2515<_, _, _> = MCP2515::new(spi_dev, ExampleDelay, ExampleClock::default());
//!
//! // Reset chip and enter normal mode at 500 kbit/s
//! can_controller.setup(500_000).unwrap();
//! assert_eq!(DeviceState::Ready, can_controller.state());
//!
//! // Load TX buffer 0 and request transmission
//! let frame = Frame::from_raw(0x2AA, false, &[0xAA; 8]).unwrap();
//! can_controller.transmit(TxBuffer::Txb0, &frame).unwrap();
//! ```

use crate::config::{timing_for, BitTiming, ConfigError, Configuration, RequestMode};
use crate::frame::{Frame, FrameError};
use crate::message::{decode, encode};
use crate::protocol::RegisterProtocol;
use crate::registers::{CanCtrl, Register};
use crate::status::{OperationMode, RxBuffer, Status, TxBuffer};
use core::cell::RefCell;
use core::fmt::Debug;
use core::sync::atomic::{AtomicU8, Ordering};
use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex};
use embassy_sync::blocking_mutex::Mutex;
use embedded_hal::delay::DelayNs;
use embedded_hal::spi::{Error as _, SpiDevice};
use embedded_time::duration::Microseconds;
use embedded_time::Clock;
use log::{debug, warn};

/// Time the chip needs after a reset before it accepts further instructions
pub const RESET_SETTLE_TIME_US: u32 = 20;

#[derive(Debug)]
pub enum SpiError<D: SpiDevice<u8>> {
    BusError(D::Error),
    /// Burst exceeds [crate::protocol::MAX_BURST] bytes, nothing was transferred
    BurstTooLong(usize),
}

impl<D: SpiDevice<u8>> PartialEq for SpiError<D> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::BusError(a), Self::BusError(b)) => a.kind() == b.kind(),
            (Self::BurstTooLong(a), Self::BurstTooLong(b)) => a == b,
            _ => false,
        }
    }
}

/// Possible CAN errors during Setup/Transmission/Reception
#[derive(Debug)]
pub enum CanError<D: SpiDevice<u8>> {
    /// SPI bus transfer error
    BusErr(SpiError<D>),
    /// Invalid configuration, e.g. unsupported bit rate
    ConfigErr(ConfigError),
    /// Timing register read back during setup differs from the written value
    ChipNotResponding { expected: u8, actual: u8 },
    /// Invalid frame content
    FrameErr(FrameError),
    /// Operation requires a successfully completed setup
    DeviceNotReady,
}

impl<D: SpiDevice<u8>> PartialEq for CanError<D> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::BusErr(a), Self::BusErr(b)) => a == b,
            (Self::ConfigErr(a), Self::ConfigErr(b)) => a == b,
            (
                Self::ChipNotResponding { expected, actual },
                Self::ChipNotResponding {
                    expected: other_expected,
                    actual: other_actual,
                },
            ) => expected == other_expected && actual == other_actual,
            (Self::FrameErr(a), Self::FrameErr(b)) => a == b,
            (Self::DeviceNotReady, Self::DeviceNotReady) => true,
            _ => false,
        }
    }
}

impl<D: SpiDevice<u8>> From<SpiError<D>> for CanError<D> {
    fn from(value: SpiError<D>) -> Self {
        CanError::BusErr(value)
    }
}

impl<D: SpiDevice<u8>> From<ConfigError> for CanError<D> {
    fn from(value: ConfigError) -> Self {
        CanError::ConfigErr(value)
    }
}

impl<D: SpiDevice<u8>> From<FrameError> for CanError<D> {
    fn from(value: FrameError) -> Self {
        CanError::FrameErr(value)
    }
}

/// Lifecycle of the controller
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeviceState {
    /// Not configured yet, or reset afterwards
    Uninitialized = 0,
    /// Setup sequence in progress
    Initializing = 1,
    /// Normal operation, frames may be sent and received
    Ready = 2,
    /// Last setup attempt failed, setup needs to be repeated
    Failed = 3,
}

impl DeviceState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Uninitialized,
            1 => Self::Initializing,
            2 => Self::Ready,
            _ => Self::Failed,
        }
    }
}

/// Main MCP2515 CAN controller device
///
/// All methods take `&self`, so the controller can be shared between the polling loop
/// and other contexts. SPI transfers are serialized by the mutex `M`. Concurrent
/// [MCP2515::setup] calls run the hardware sequence only once.
pub struct MCP2515<D, CLK, DL, M = CriticalSectionRawMutex>
where
    D: SpiDevice<u8>,
    CLK: Clock<T = u64>,
    DL: DelayNs,
    M: RawMutex,
{
    /// Register access, also acts as setup lock
    protocol: Mutex<M, RefCell<RegisterProtocol<D, DL>>>,

    /// Current [DeviceState]
    state: AtomicU8,

    /// Clock used for timestamping received frames
    clock: CLK,
}

impl<D, CLK, DL, M> MCP2515<D, CLK, DL, M>
where
    D: SpiDevice<u8>,
    CLK: Clock<T = u64>,
    DL: DelayNs,
    M: RawMutex,
{
    pub fn new(spi_dev: D, delay: DL, clock: CLK) -> Self {
        Self {
            protocol: Mutex::new(RefCell::new(RegisterProtocol::new(spi_dev, delay))),
            state: AtomicU8::new(DeviceState::Uninitialized as u8),
            clock,
        }
    }

    /// Returns the current lifecycle state
    pub fn state(&self) -> DeviceState {
        DeviceState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Resets the chip and enters normal mode at the given bit rate (bits/s).
    /// Receive buffers accept all messages, RXB0 rolls over into RXB1.
    pub fn setup(&self, bit_rate: u32) -> Result<(), CanError<D>> {
        self.configure(&Configuration::new(bit_rate))
    }

    /// Resets the chip and applies the given configuration.
    /// Returns immediately if the device is already [DeviceState::Ready].
    pub fn configure(&self, config: &Configuration) -> Result<(), CanError<D>> {
        if self.state() == DeviceState::Ready {
            return Ok(());
        }

        let timing = timing_for(config.bit_rate)?;

        self.with_protocol(|protocol| {
            // Setup may have been completed while waiting for the lock
            if self.state() == DeviceState::Ready {
                return Ok(());
            }

            debug!("Setup with {} bit/s", config.bit_rate);
            self.set_state(DeviceState::Initializing);

            let result = Self::initialize(protocol, config, &timing);
            match result {
                Ok(()) => {
                    self.set_state(DeviceState::Ready);
                    debug!("Setup done, requested mode {:?}", config.mode);
                }
                Err(_) => self.set_state(DeviceState::Failed),
            }

            result
        })
    }

    /// Setup sequence, runs with the protocol lock held
    fn initialize(
        protocol: &mut RegisterProtocol<D, DL>,
        config: &Configuration,
        timing: &BitTiming,
    ) -> Result<(), CanError<D>> {
        protocol.reset()?;
        protocol.delay_us(RESET_SETTLE_TIME_US);

        // CNF3, CNF2 and CNF1 are consecutive, address is incremented automatically
        protocol.write_registers(Register::CNF3, &timing.as_registers())?;

        let readback = protocol.read_register(Register::CNF2)?;
        if readback != timing.cnf2 {
            warn!("CAN chip not responding. CNF2 expected {:02x}, got {readback:02x}", timing.cnf2);
            return Err(CanError::ChipNotResponding {
                expected: timing.cnf2,
                actual: readback,
            });
        }

        protocol.write_register(Register::RXB0CTRL, config.as_rxb0ctrl_register())?;
        protocol.write_register(Register::RXB1CTRL, config.as_rxb1ctrl_register())?;
        protocol.write_register(Register::CANCTRL, config.as_canctrl_register())?;

        Ok(())
    }

    /// Reads and returns the status flags
    pub fn status(&self) -> Result<Status, CanError<D>> {
        self.ensure_ready()?;

        let register = self.with_protocol(|protocol| protocol.read_status())?;
        Ok(Status::from_register(register))
    }

    /// Reads the given receive buffer and returns the timestamped frame
    pub fn receive(&self, rx_buffer: RxBuffer) -> Result<Frame, CanError<D>> {
        self.ensure_ready()?;

        let data = self.with_protocol(|protocol| protocol.read_rx_buffer(rx_buffer))?;
        let frame = decode(&data)?;

        Ok(frame.with_timestamp(self.capture_time()))
    }

    /// Loads the frame into the given transmit buffer and requests transmission
    pub fn transmit(&self, tx_buffer: TxBuffer, frame: &Frame) -> Result<(), CanError<D>> {
        self.ensure_ready()?;

        let data = encode(frame);
        self.with_protocol(|protocol| {
            protocol.load_tx_buffer(tx_buffer, &data)?;
            protocol.request_to_send(tx_buffer)
        })?;

        Ok(())
    }

    /// Changes the operation mode of a configured device, e.g. to listen-only
    pub fn set_mode(&self, mode: RequestMode) -> Result<(), CanError<D>> {
        self.ensure_ready()?;

        let mask = CanCtrl::new().with_reqop(0b111).into();
        self.with_protocol(|protocol| {
            protocol.modify_register(Register::CANCTRL, mask, mode.as_canctrl_register())
        })?;

        debug!("Requested mode {mode:?}");
        Ok(())
    }

    /// Reads and returns the current operation mode
    pub fn operation_mode(&self) -> Result<OperationMode, CanError<D>> {
        let register = self.with_protocol(|protocol| protocol.read_register(Register::CANSTAT))?;

        Ok(OperationMode::from_register(register))
    }

    /// Resets internal registers to default (configuration mode).
    /// Device needs to be set up again afterwards.
    pub fn reset(&self) -> Result<(), CanError<D>> {
        debug!("Resetting device");

        self.with_protocol(|protocol| {
            let result = protocol.reset();
            protocol.delay_us(RESET_SETTLE_TIME_US);

            match result {
                Ok(()) => self.set_state(DeviceState::Uninitialized),
                Err(_) => self.set_state(DeviceState::Failed),
            }

            result
        })?;

        Ok(())
    }

    fn ensure_ready(&self) -> Result<(), CanError<D>> {
        if self.state() != DeviceState::Ready {
            return Err(CanError::DeviceNotReady);
        }

        Ok(())
    }

    fn set_state(&self, state: DeviceState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Time since clock epoch, none if the clock is not available
    fn capture_time(&self) -> Option<Microseconds<u64>> {
        match self.clock.try_now() {
            Ok(instant) => Microseconds::<u64>::try_from(instant.duration_since_epoch()).ok(),
            Err(error) => {
                debug!("Received frame not timestamped: {error:?}");
                None
            }
        }
    }

    fn with_protocol<R>(&self, f: impl FnOnce(&mut RegisterProtocol<D, DL>) -> R) -> R {
        self.protocol.lock(|protocol| f(&mut protocol.borrow_mut()))
    }
}

impl<D, CLK, DL, M> Debug for MCP2515<D, CLK, DL, M>
where
    D: SpiDevice<u8>,
    CLK: Clock<T = u64>,
    DL: DelayNs,
    M: RawMutex,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MCP2515").field("state", &self.state()).finish()
    }
}
