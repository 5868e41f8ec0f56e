//! # Mock dummy structures for doc examples
//!
//! [ExampleSPIDevice] emulates just enough of the chip for the setup sequence to succeed.
use crate::protocol::Command;
use crate::registers::Register;
use core::cell::Cell;
use core::convert::Infallible;
use embedded_hal::delay::DelayNs;
use embedded_hal::spi::{ErrorType, Operation, SpiDevice};
use embedded_time::clock::Error;
use embedded_time::duration::{Duration, Fraction};
use embedded_time::fixed_point::FixedPoint;
use embedded_time::timer::param::{Armed, OneShot};
use embedded_time::{Clock, Instant, Timer};

/// CANCTRL value after reset: configuration mode, CLKOUT enabled
const CANCTRL_RESET: u8 = 0x87;

#[derive(Debug)]
pub struct ExampleSPIDevice {
    cnf2: u8,
    canctrl: u8,
}

impl Default for ExampleSPIDevice {
    fn default() -> Self {
        Self {
            cnf2: 0,
            canctrl: CANCTRL_RESET,
        }
    }
}

impl ExampleSPIDevice {
    fn register(&self, address: u8) -> u8 {
        match address {
            a if a == Register::CNF2.address() => self.cnf2,
            a if a == Register::CANCTRL.address() => self.canctrl,
            // OPMOD follows REQOP immediately
            a if a == Register::CANSTAT.address() => self.canctrl & 0xE0,
            _ => 0,
        }
    }

    fn set_register(&mut self, address: u8, value: u8) {
        match address {
            a if a == Register::CNF2.address() => self.cnf2 = value,
            a if a == Register::CANCTRL.address() => self.canctrl = value,
            _ => {}
        }
    }
}

impl ErrorType for ExampleSPIDevice {
    type Error = Infallible;
}

impl SpiDevice<u8> for ExampleSPIDevice {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        for operation in operations {
            if let Operation::TransferInPlace(buf) = operation {
                self.transfer_in_place(buf)?;
            }
        }

        Ok(())
    }

    fn transfer_in_place(&mut self, buf: &mut [u8]) -> Result<(), Self::Error> {
        match buf[0] {
            b if b == Command::Reset as u8 => *self = Self::default(),
            b if b == Command::Write as u8 => {
                let address = buf[1];
                for (offset, value) in buf[2..].iter().enumerate() {
                    self.set_register(address.wrapping_add(offset as u8), *value);
                }
            }
            b if b == Command::Read as u8 => {
                let address = buf[1];
                for (offset, value) in buf[2..].iter_mut().enumerate() {
                    *value = self.register(address.wrapping_add(offset as u8));
                }
            }
            b if b == Command::BitModify as u8 && buf.len() == 4 => {
                let (address, mask, value) = (buf[1], buf[2], buf[3]);
                let current = self.register(address);
                self.set_register(address, (current & !mask) | (value & mask));
            }
            // Nothing received, all transmit buffers idle
            b if b == Command::ReadStatus as u8 => buf[1..].fill(0),
            _ => {}
        }

        Ok(())
    }
}

/// Delay returning immediately
#[derive(Debug, Default, Copy, Clone)]
pub struct ExampleDelay;

impl DelayNs for ExampleDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

/// Clock advancing by 100 microseconds on every call
#[derive(Debug, Default)]
pub struct ExampleClock {
    pub ticks: Cell<u64>,
}

impl Clock for ExampleClock {
    type T = u64;
    const SCALING_FACTOR: Fraction = Fraction::new(1, 1_000_000);

    fn try_now(&self) -> Result<Instant<Self>, Error> {
        self.ticks.set(self.ticks.get() + 100);

        Ok(Instant::new(self.ticks.get()))
    }

    fn new_timer<Dur: Duration + FixedPoint>(&self, duration: Dur) -> Timer<OneShot, Armed, Self, Dur> {
        Timer::new(self, duration)
    }
}
