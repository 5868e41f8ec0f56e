//!# Polling loop
//! The [PollLoop] is the only actor issuing SPI transactions after setup. Each cycle it
//!
//! 1. reads the status byte,
//! 2. drains at most one receive buffer (RXB0 before RXB1) into the received mailbox,
//! 3. fills at most one idle transmit buffer (TXB0, TXB1, TXB2) from the outgoing mailbox.
//!
//! Mailbox operations never block. Errors are pushed into the error mailbox and followed
//! by a pause of [ERROR_THROTTLE_MS], so a missing chip does not saturate the SPI bus.
//! The pause uses the loop's own delay and holds no lock, so producers and consumers
//! keep accessing the mailboxes meanwhile.
//!
//! The stop signal is checked at the top of each cycle. A cycle in progress always completes.
//!
//! ```
//!# use mcp2515::can::MCP2515;
//!# use mcp2515::example::*;
//!# use mcp2515::frame::Frame;
//!# use mcp2515::mailbox::Mailboxes;
//!# use mcp2515::poll::PollLoop;
//!# use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
//!# use embassy_sync::signal::Signal;
//!#
//! let controller: MCP2515<_, _, _> = MCP2515::new(ExampleSPIDevice::default(), ExampleDelay, ExampleClock::default());
//! controller.setup(500_000).unwrap();
//!
//! let mailboxes: Mailboxes<CriticalSectionRawMutex, ExampleSPIDevice> = Mailboxes::new();
//! let stop: Signal<CriticalSectionRawMutex, ()> = Signal::new();
//!
//! mailboxes.send(Frame::from_raw(0x2AA, false, &[0xAA; 8]).unwrap());
//!
//! let mut poll_loop = PollLoop::new(
//!     &controller,
//!     mailboxes.received(),
//!     mailboxes.outgoing(),
//!     mailboxes.errors(),
//!     ExampleDelay,
//! );
//!
//! // Transmits the queued frame, usually called in an endless loop via run()
//! let report = poll_loop.poll_once();
//! assert!(report.transmitted.is_some());
//!
//! // Returns without polling again, chip is reset
//! stop.signal(());
//! poll_loop.run(&stop);
//! ```
use crate::can::{CanError, MCP2515};
use crate::frame::Frame;
use crate::mailbox::{Inbox, Outbox};
use crate::status::{RxBuffer, Status, TxBuffer};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::signal::Signal;
use embedded_hal::delay::DelayNs;
use embedded_hal::spi::SpiDevice;
use embedded_time::Clock;
use log::debug;

/// Pause after each reported error
pub const ERROR_THROTTLE_MS: u32 = 100;

/// External request to terminate the polling loop
pub trait StopSignal {
    /// Non-blocking check, called once per cycle
    fn stop_requested(&self) -> bool;
}

impl<M: RawMutex, T: Send> StopSignal for Signal<M, T> {
    fn stop_requested(&self) -> bool {
        self.signaled()
    }
}

impl<S: StopSignal + ?Sized> StopSignal for &S {
    fn stop_requested(&self) -> bool {
        (**self).stop_requested()
    }
}

/// Actions performed during a single cycle
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Receive buffer which was drained
    pub received: Option<RxBuffer>,

    /// Transmit buffer which was loaded
    pub transmitted: Option<TxBuffer>,

    /// Number of errors reported
    pub errors: u8,
}

/// Scheduler moving frames between the controller buffers and the mailboxes
pub struct PollLoop<'a, D, CLK, DL, M, RX, TX, ER, TD>
where
    D: SpiDevice<u8>,
    CLK: Clock<T = u64>,
    DL: DelayNs,
    M: RawMutex,
{
    controller: &'a MCP2515<D, CLK, DL, M>,

    /// Receives decoded frames
    received: RX,

    /// Provides frames to transmit
    outgoing: TX,

    /// Receives errors
    errors: ER,

    /// Error throttle, used outside of the controller lock
    throttle: TD,
}

impl<'a, D, CLK, DL, M, RX, TX, ER, TD> PollLoop<'a, D, CLK, DL, M, RX, TX, ER, TD>
where
    D: SpiDevice<u8>,
    CLK: Clock<T = u64>,
    DL: DelayNs,
    M: RawMutex,
    RX: Outbox<Frame>,
    TX: Inbox<Frame>,
    ER: Outbox<CanError<D>>,
    TD: DelayNs,
{
    pub fn new(
        controller: &'a MCP2515<D, CLK, DL, M>,
        received: RX,
        outgoing: TX,
        errors: ER,
        throttle: TD,
    ) -> Self {
        Self {
            controller,
            received,
            outgoing,
            errors,
            throttle,
        }
    }

    /// Polls until the stop signal is set. The chip is reset on every exit,
    /// including unwinding panics.
    pub fn run<S: StopSignal>(&mut self, stop: &S) {
        let _guard = ResetGuard {
            controller: self.controller,
        };

        while !stop.stop_requested() {
            self.poll_once();
        }

        debug!("Stop requested, leaving polling loop");
    }

    /// Runs a single scheduling cycle
    pub fn poll_once(&mut self) -> CycleReport {
        let mut report = CycleReport::default();

        let status = match self.controller.status() {
            Ok(status) => status,
            Err(error) => {
                self.report(error, &mut report);
                return report;
            }
        };

        self.try_receive(&status, &mut report);
        self.try_transmit(&status, &mut report);

        report
    }

    fn try_receive(&mut self, status: &Status, report: &mut CycleReport) {
        let Some(rx_buffer) = status.pending_rx_buffer() else {
            return;
        };

        match self.controller.receive(rx_buffer) {
            Ok(frame) => {
                report.received = Some(rx_buffer);

                if self.received.try_post(frame).is_err() {
                    debug!("Received mailbox full, dropping frame {:x}", frame.raw_id());
                }
            }
            Err(error) => self.report(error, report),
        }
    }

    fn try_transmit(&mut self, status: &Status, report: &mut CycleReport) {
        // All buffers busy, retry in a later cycle
        let Some(tx_buffer) = status.idle_tx_buffer() else {
            return;
        };

        let Some(frame) = self.outgoing.try_fetch() else {
            return;
        };

        match self.controller.transmit(tx_buffer, &frame) {
            Ok(()) => report.transmitted = Some(tx_buffer),
            Err(error) => self.report(error, report),
        }
    }

    fn report(&mut self, error: CanError<D>, report: &mut CycleReport) {
        report.errors = report.errors.saturating_add(1);

        if self.errors.try_post(error).is_err() {
            debug!("Error mailbox full, dropping error");
        }

        self.throttle.delay_ms(ERROR_THROTTLE_MS);
    }
}

/// Resets the chip when dropped
struct ResetGuard<'a, D, CLK, DL, M>
where
    D: SpiDevice<u8>,
    CLK: Clock<T = u64>,
    DL: DelayNs,
    M: RawMutex,
{
    controller: &'a MCP2515<D, CLK, DL, M>,
}

impl<D, CLK, DL, M> Drop for ResetGuard<'_, D, CLK, DL, M>
where
    D: SpiDevice<u8>,
    CLK: Clock<T = u64>,
    DL: DelayNs,
    M: RawMutex,
{
    fn drop(&mut self) {
        if self.controller.reset().is_err() {
            debug!("Reset after polling loop failed");
        }
    }
}
