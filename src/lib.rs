#![cfg_attr(not(test), no_std)]
#![cfg_attr(feature = "strict", deny(warnings))]
#![allow(clippy::identity_op)]

//! # Library for MCP2515 CAN controller
//!
//! Crate currently offer the following features:
//! * CAN 2.0B with standard and extended ID formats, data and remote frames
//! * Bit rates from 10 kbit/s up to 500 kbit/s (8 MHz oscillator)
//! * Polling loop moving frames between the chip and bounded mailboxes
//! * Receive timestamps based on [embedded_time::Clock]
//! * no_std support
//!
//!## CAN Tx/Rx example
//!
//!```
//!use mcp2515::example::{ExampleClock, ExampleDelay, ExampleSPIDevice};
//!use mcp2515::can::{DeviceState, MCP2515};
//!use mcp2515::frame::Frame;
//!use mcp2515::mailbox::Mailboxes;
//!use mcp2515::poll::PollLoop;
//!use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
//!use embassy_sync::signal::Signal;
//!
//!let controller: MCP2515<_, _, _> = MCP2515::new(ExampleSPIDevice::default(), ExampleDelay, ExampleClock::default());
//!
//!// Reset chip, configure bit timing and enter normal mode
//!controller.setup(500_000).unwrap();
//!assert_eq!(DeviceState::Ready, controller.state());
//!
//!let mailboxes: Mailboxes<CriticalSectionRawMutex, ExampleSPIDevice> = Mailboxes::new();
//!let stop: Signal<CriticalSectionRawMutex, ()> = Signal::new();
//!
//!// Queue CAN message for transmission
//!let frame = Frame::from_raw(0x55, false, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
//!assert!(mailboxes.send(frame));
//!
//!let mut poll_loop = PollLoop::new(
//!    &controller,
//!    mailboxes.received(),
//!    mailboxes.outgoing(),
//!    mailboxes.errors(),
//!    ExampleDelay,
//!);
//!
//!// Usually run() is executed in a dedicated thread or task
//!assert!(poll_loop.poll_once().transmitted.is_some());
//!stop.signal(());
//!poll_loop.run(&stop);
//!
//!// Chip is reset when the loop terminates
//!assert_eq!(DeviceState::Uninitialized, controller.state());
//!assert!(mailboxes.try_error().is_none());
//!```

pub mod can;
pub mod config;
pub mod frame;
pub mod mailbox;
pub mod message;
pub mod poll;
pub mod protocol;
pub mod registers;
pub mod status;

pub mod example;
#[cfg(test)]
pub(crate) mod mocks;
#[cfg(test)]
mod tests;
