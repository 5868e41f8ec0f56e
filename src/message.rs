//!# Transmit/receive buffer layout
//! The MCP2515 transmit and receive buffers share a 13 byte layout, which is transferred
//! in one go by the LOAD TX BUFFER and READ RX BUFFER instructions:
//!
//! | Byte  | Register | Content                                              |
//! |-------|----------|------------------------------------------------------|
//! | 0     | SIDH     | Standard ID bits 10..3 (extended ID bits 28..21)     |
//! | 1     | SIDL     | SID bits 2..0 (EID 20..18), SRR, IDE, EID bits 17..16 |
//! | 2     | EID8     | Extended ID bits 15..8                               |
//! | 3     | EID0     | Extended ID bits 7..0                                |
//! | 4     | DLC      | RTR bit, data length code                            |
//! | 5..13 | D0..D7   | Payload                                              |
//!
//! ```
//!# use mcp2515::frame::Frame;
//!# use mcp2515::message::{decode, encode};
//! let frame = Frame::from_raw(0x2AA, false, &[0xAA; 8]).unwrap();
//! let buffer = encode(&frame);
//!
//! assert_eq!([0x55, 0x40, 0x00, 0x00, 0x08], buffer[..5]);
//! assert_eq!(frame, decode(&buffer).unwrap());
//! ```
use crate::frame::{Frame, FrameError, MAX_PAYLOAD};
use crate::registers::{DlcReg, SidLow};
use byteorder::{BigEndian, ByteOrder};
use embedded_can::{ExtendedId, Frame as _, Id, StandardId};
use log::debug;

/// Size of the buffer layout in bytes
pub const BUFFER_SIZE: usize = 13;

const SIDH: usize = 0;
const SIDL: usize = 1;
const EID8: usize = 2;
const DLC: usize = 4;
const DATA: usize = 5;

/// Packs the frame into the transmit buffer layout. Unused payload bytes are zeroed.
pub fn encode(frame: &Frame) -> [u8; BUFFER_SIZE] {
    let mut buffer = [0u8; BUFFER_SIZE];

    match frame.id() {
        Id::Standard(sid) => {
            let id = sid.as_raw();
            buffer[SIDH] = (id >> 3) as u8;
            // Standard remote frames are flagged by SRR on receive
            buffer[SIDL] = SidLow::new()
                .with_sid((id & 0x7) as u8)
                .with_srr(frame.is_remote_frame())
                .into();
        }
        Id::Extended(eid) => {
            let id = eid.as_raw();
            buffer[SIDH] = (id >> 21) as u8;
            buffer[SIDL] = SidLow::new()
                .with_sid(((id >> 18) & 0x7) as u8)
                .with_ide(true)
                .with_eid(((id >> 16) & 0x3) as u8)
                .into();
            BigEndian::write_u16(&mut buffer[EID8..DLC], id as u16);
        }
    }

    buffer[DLC] = DlcReg::new()
        .with_rtr(frame.is_remote_frame())
        .with_dlc(frame.length())
        .into();

    let length = frame.length() as usize;
    if !frame.is_remote_frame() {
        buffer[DATA..DATA + length].copy_from_slice(&frame.raw_data()[..length]);
    }

    buffer
}

/// Unpacks a receive buffer. Fails if the data length code exceeds 8.
pub fn decode(buffer: &[u8; BUFFER_SIZE]) -> Result<Frame, FrameError> {
    let sidl = SidLow::from(buffer[SIDL]);
    let dlc_reg = DlcReg::from(buffer[DLC]);

    let length = dlc_reg.dlc();
    if length as usize > MAX_PAYLOAD {
        debug!("Received invalid data length code {length}");
        return Err(FrameError::MalformedFrame(length));
    }

    let (identifier, remote) = if sidl.ide() {
        let id = ((buffer[SIDH] as u32) << 21)
            | ((sidl.sid() as u32) << 18)
            | ((sidl.eid() as u32) << 16)
            | BigEndian::read_u16(&buffer[EID8..DLC]) as u32;

        let eid = ExtendedId::new(id).ok_or(FrameError::InvalidIdentifier(id))?;
        (Id::Extended(eid), dlc_reg.rtr())
    } else {
        let id = ((buffer[SIDH] as u16) << 3) | sidl.sid() as u16;

        let sid = StandardId::new(id).ok_or(FrameError::InvalidIdentifier(id as u32))?;
        (Id::Standard(sid), sidl.srr())
    };

    let mut data = [0u8; MAX_PAYLOAD];
    if !remote {
        data[..length as usize].copy_from_slice(&buffer[DATA..DATA + length as usize]);
    }

    Ok(Frame::from_parts(identifier, remote, length, data))
}
