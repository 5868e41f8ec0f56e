//!# CAN frame
//!
//!```
//!# use mcp2515::frame::Frame;
//!# use embedded_can::Frame as _;
//! let frame = Frame::from_raw(0x2AA, false, &[0xAA; 8]).unwrap();
//!
//! assert_eq!(0x2AA, frame.raw_id());
//! assert!(!frame.is_extended());
//! assert_eq!(8, frame.dlc());
//!```
use embedded_can::{ExtendedId, Id, StandardId};
use embedded_time::duration::Microseconds;

/// Maximum payload of a CAN 2.0 frame
pub const MAX_PAYLOAD: usize = 8;

/// Possible errors when constructing or decoding a [Frame]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FrameError {
    /// Identifier does not fit into 11 (standard) or 29 (extended) bits
    InvalidIdentifier(u32),
    /// Payload longer than 8 bytes
    InvalidLength(usize),
    /// Receive buffer contained a data length code above 8
    MalformedFrame(u8),
}

/// CAN 2.0 frame with standard or extended identifier
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Frame {
    identifier: Id,
    remote: bool,
    length: u8,
    data: [u8; MAX_PAYLOAD],
    /// Capture time in microseconds since clock epoch
    timestamp_us: Option<u64>,
}

impl Frame {
    /// Creates a data frame from a raw identifier
    pub fn from_raw(identifier: u32, extended: bool, data: &[u8]) -> Result<Self, FrameError> {
        if data.len() > MAX_PAYLOAD {
            return Err(FrameError::InvalidLength(data.len()));
        }

        let mut frame = Self::empty(raw_identifier(identifier, extended)?);
        frame.length = data.len() as u8;
        frame.data[..data.len()].copy_from_slice(data);

        Ok(frame)
    }

    /// Creates a remote frame from a raw identifier
    pub fn remote_from_raw(identifier: u32, extended: bool, length: usize) -> Result<Self, FrameError> {
        if length > MAX_PAYLOAD {
            return Err(FrameError::InvalidLength(length));
        }

        let mut frame = Self::empty(raw_identifier(identifier, extended)?);
        frame.remote = true;
        frame.length = length as u8;

        Ok(frame)
    }

    /// Frame as decoded from a receive buffer. Caller guarantees `length <= 8`.
    pub(crate) fn from_parts(identifier: Id, remote: bool, length: u8, data: [u8; MAX_PAYLOAD]) -> Self {
        Self {
            identifier,
            remote,
            length,
            data,
            timestamp_us: None,
        }
    }

    fn empty(identifier: Id) -> Self {
        Self::from_parts(identifier, false, 0, [0; MAX_PAYLOAD])
    }

    /// Identifier as plain integer (11 or 29 significant bits)
    pub fn raw_id(&self) -> u32 {
        match self.identifier {
            Id::Standard(sid) => sid.as_raw() as u32,
            Id::Extended(eid) => eid.as_raw(),
        }
    }

    /// Data length code (0-8)
    pub fn length(&self) -> u8 {
        self.length
    }

    /// All eight payload bytes, only the first [Frame::length] are meaningful
    pub fn raw_data(&self) -> &[u8; MAX_PAYLOAD] {
        &self.data
    }

    /// Capture time since clock epoch, set when the frame was received
    pub fn timestamp(&self) -> Option<Microseconds<u64>> {
        self.timestamp_us.map(Microseconds)
    }

    /// Returns a copy of the frame with the given capture time
    pub(crate) fn with_timestamp(mut self, timestamp: Option<Microseconds<u64>>) -> Self {
        self.timestamp_us = timestamp.map(|micros| micros.0);
        self
    }
}

fn raw_identifier(identifier: u32, extended: bool) -> Result<Id, FrameError> {
    if extended {
        ExtendedId::new(identifier)
            .map(Id::Extended)
            .ok_or(FrameError::InvalidIdentifier(identifier))
    } else {
        u16::try_from(identifier)
            .ok()
            .and_then(StandardId::new)
            .map(Id::Standard)
            .ok_or(FrameError::InvalidIdentifier(identifier))
    }
}

impl embedded_can::Frame for Frame {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        if data.len() > MAX_PAYLOAD {
            return None;
        }

        let mut frame = Self::empty(id.into());
        frame.length = data.len() as u8;
        frame.data[..data.len()].copy_from_slice(data);
        Some(frame)
    }

    fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        if dlc > MAX_PAYLOAD {
            return None;
        }

        let mut frame = Self::empty(id.into());
        frame.remote = true;
        frame.length = dlc as u8;
        Some(frame)
    }

    fn is_extended(&self) -> bool {
        matches!(self.identifier, Id::Extended(_))
    }

    fn is_remote_frame(&self) -> bool {
        self.remote
    }

    fn id(&self) -> Id {
        self.identifier
    }

    fn dlc(&self) -> usize {
        self.length as usize
    }

    fn data(&self) -> &[u8] {
        if self.remote {
            return &[];
        }

        &self.data[..self.length as usize]
    }
}
