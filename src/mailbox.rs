//!# Mailboxes
//! Bounded queues connecting the [PollLoop](crate::poll::PollLoop) with the rest of the application.
//! The loop only uses non-blocking operations: pushing into a full mailbox drops the new item,
//! fetching from an empty mailbox returns nothing.
//!
//! ```
//!# use mcp2515::example::ExampleSPIDevice;
//!# use mcp2515::frame::Frame;
//!# use mcp2515::mailbox::Mailboxes;
//!# use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
//!#
//! let mailboxes: Mailboxes<CriticalSectionRawMutex, ExampleSPIDevice, 2> = Mailboxes::new();
//! let frame = Frame::from_raw(0x123, false, &[1, 2, 3]).unwrap();
//!
//! assert!(mailboxes.send(frame));
//! assert!(mailboxes.send(frame));
//! // Mailbox full, frame is dropped
//! assert!(!mailboxes.send(frame));
//! ```
use crate::can::CanError;
use crate::frame::Frame;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender, TrySendError};
use embedded_hal::spi::SpiDevice;

/// Default number of items per mailbox
pub const DEFAULT_CAPACITY: usize = 10;

/// Non-blocking producer side of a mailbox
pub trait Outbox<T> {
    /// Pushes the item, returns it back if the mailbox is full
    fn try_post(&self, item: T) -> Result<(), T>;
}

/// Non-blocking consumer side of a mailbox
pub trait Inbox<T> {
    /// Pops the oldest item, none if the mailbox is empty
    fn try_fetch(&self) -> Option<T>;
}

impl<T, X: Outbox<T> + ?Sized> Outbox<T> for &X {
    fn try_post(&self, item: T) -> Result<(), T> {
        (**self).try_post(item)
    }
}

impl<T, X: Inbox<T> + ?Sized> Inbox<T> for &X {
    fn try_fetch(&self) -> Option<T> {
        (**self).try_fetch()
    }
}

impl<M: RawMutex, T, const N: usize> Outbox<T> for Channel<M, T, N> {
    fn try_post(&self, item: T) -> Result<(), T> {
        self.try_send(item).map_err(|TrySendError::Full(item)| item)
    }
}

impl<M: RawMutex, T, const N: usize> Inbox<T> for Channel<M, T, N> {
    fn try_fetch(&self) -> Option<T> {
        self.try_receive().ok()
    }
}

impl<M: RawMutex, T, const N: usize> Outbox<T> for Sender<'_, M, T, N> {
    fn try_post(&self, item: T) -> Result<(), T> {
        self.try_send(item).map_err(|TrySendError::Full(item)| item)
    }
}

impl<M: RawMutex, T, const N: usize> Inbox<T> for Receiver<'_, M, T, N> {
    fn try_fetch(&self) -> Option<T> {
        self.try_receive().ok()
    }
}

/// The three mailboxes of a polling loop: received frames, frames to transmit and errors
pub struct Mailboxes<M: RawMutex, D: SpiDevice<u8>, const N: usize = DEFAULT_CAPACITY> {
    received: Channel<M, Frame, N>,
    outgoing: Channel<M, Frame, N>,
    errors: Channel<M, CanError<D>, N>,
}

impl<M: RawMutex, D: SpiDevice<u8>, const N: usize> Mailboxes<M, D, N> {
    pub const fn new() -> Self {
        Self {
            received: Channel::new(),
            outgoing: Channel::new(),
            errors: Channel::new(),
        }
    }

    /// Queues a frame for transmission. Returns false if the frame was dropped.
    pub fn send(&self, frame: Frame) -> bool {
        self.outgoing.try_post(frame).is_ok()
    }

    /// Returns the oldest received frame
    pub fn try_receive(&self) -> Option<Frame> {
        self.received.try_fetch()
    }

    /// Returns the oldest reported error
    pub fn try_error(&self) -> Option<CanError<D>> {
        self.errors.try_fetch()
    }

    /// Mailbox of received frames, filled by the polling loop
    pub fn received(&self) -> &Channel<M, Frame, N> {
        &self.received
    }

    /// Mailbox of frames to transmit, drained by the polling loop
    pub fn outgoing(&self) -> &Channel<M, Frame, N> {
        &self.outgoing
    }

    /// Mailbox of errors, filled by the polling loop
    pub fn errors(&self) -> &Channel<M, CanError<D>, N> {
        &self.errors
    }

    /// Async blocking receiver of frames
    pub fn frame_receiver(&self) -> Receiver<'_, M, Frame, N> {
        self.received.receiver()
    }

    /// Async blocking sender of frames
    pub fn frame_sender(&self) -> Sender<'_, M, Frame, N> {
        self.outgoing.sender()
    }

    /// Async blocking receiver of errors
    pub fn error_receiver(&self) -> Receiver<'_, M, CanError<D>, N> {
        self.errors.receiver()
    }
}

impl<M: RawMutex, D: SpiDevice<u8>, const N: usize> Default for Mailboxes<M, D, N> {
    fn default() -> Self {
        Self::new()
    }
}
