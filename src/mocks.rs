use crate::can::MCP2515;
use core::cell::RefCell;
use core::fmt;
use embedded_hal::delay::DelayNs;
use embedded_hal::spi::{ErrorKind, ErrorType, Operation, SpiDevice};
use embedded_time::clock::Error;
use embedded_time::duration::Duration;
use embedded_time::fixed_point::FixedPoint;
use embedded_time::fraction::Fraction;
use embedded_time::timer::param::{Armed, OneShot};
use embedded_time::{Clock, Instant, Timer};
use mockall::{mock, Sequence};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

#[derive(Debug, PartialEq, Eq)]
pub struct TestClock {
    pub next_instants: RefCell<Vec<u64>>,
}

impl TestClock {
    pub fn new(next_instants: Vec<u64>) -> Self {
        Self {
            next_instants: RefCell::new(next_instants),
        }
    }
}

impl Clock for TestClock {
    type T = u64;
    const SCALING_FACTOR: Fraction = Fraction::new(1, 1_000_000);

    fn try_now(&self) -> Result<Instant<Self>, Error> {
        if self.next_instants.borrow().len() == 0 {
            return Err(Error::Unspecified);
        }

        Ok(Instant::new(self.next_instants.borrow_mut().remove(0)))
    }

    fn new_timer<Dur>(&self, duration: Dur) -> Timer<OneShot, Armed, Self, Dur>
    where
        Dur: Duration + FixedPoint,
    {
        Timer::new(self, duration)
    }
}

/// Records the total delay, clones share the counter
#[derive(Debug, Default, Clone)]
pub struct TestDelay {
    elapsed_ns: Arc<AtomicU64>,
}

impl TestDelay {
    pub fn elapsed_us(&self) -> u64 {
        self.elapsed_ns.load(Ordering::SeqCst) / 1_000
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ns.load(Ordering::SeqCst) / 1_000_000
    }
}

impl DelayNs for TestDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns.fetch_add(ns as u64, Ordering::SeqCst);
    }
}

/// Delay actually sleeping the current thread
#[derive(Debug, Default, Copy, Clone)]
pub struct SleepDelay;

impl DelayNs for SleepDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(std::time::Duration::from_nanos(ns as u64));
    }
}

/// Full-duplex transfer of a single SPI transaction
pub trait Transfer {
    fn transfer<'w>(&mut self, words: &'w mut [u8]) -> Result<(), ErrorKind>;
}

mock! {
    pub SPIBus {}

    impl Transfer for SPIBus {
        fn transfer<'w>(&mut self, words: &'w mut [u8]) -> Result<(), ErrorKind>;
    }
}

pub struct MockSPIDevice {
    pub bus: MockSPIBus,
}

impl fmt::Debug for MockSPIDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockSPIDevice").finish_non_exhaustive()
    }
}

impl ErrorType for MockSPIDevice {
    type Error = ErrorKind;
}

impl SpiDevice<u8> for MockSPIDevice {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        for operation in operations {
            match operation {
                Operation::TransferInPlace(words) => self.bus.transfer(words)?,
                _ => return Err(ErrorKind::Other),
            }
        }

        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        self.bus.transfer(words)
    }
}

pub type TestController = MCP2515<MockSPIDevice, TestClock, TestDelay>;

/// Ordered SPI expectations of one test
pub struct Mocks {
    pub bus: MockSPIBus,
    pub delay: TestDelay,
    sequence: Sequence,
}

impl Default for Mocks {
    fn default() -> Self {
        Self {
            bus: MockSPIBus::new(),
            delay: TestDelay::default(),
            sequence: Sequence::new(),
        }
    }
}

impl Mocks {
    /// Expects the given transfer and answers with the response bytes
    pub fn expect_transfer(&mut self, request: &[u8], response: &[u8]) -> &mut Self {
        assert_eq!(request.len(), response.len());

        let request = request.to_vec();
        let response = response.to_vec();

        self.bus
            .expect_transfer()
            .times(1)
            .in_sequence(&mut self.sequence)
            .returning(move |data| {
                assert_eq!(request.as_slice(), data);
                data.copy_from_slice(&response);
                Ok(())
            });

        self
    }

    /// Expects a write-only transfer, chip answers with zeros
    pub fn expect_write(&mut self, request: &[u8]) -> &mut Self {
        let response = vec![0u8; request.len()];
        self.expect_transfer(request, &response)
    }

    /// Expects the given transfer and fails it with a bus error
    pub fn expect_bus_error(&mut self, request: &[u8]) -> &mut Self {
        let request = request.to_vec();

        self.bus
            .expect_transfer()
            .times(1)
            .in_sequence(&mut self.sequence)
            .returning(move |data| {
                assert_eq!(request.as_slice(), data);
                Err(ErrorKind::Other)
            });

        self
    }

    /// Expects a successful setup at 500 kbit/s
    pub fn expect_setup(&mut self) -> &mut Self {
        self.expect_write(&[0xC0])
            .expect_write(&[0x02, 0x28, 0x02, 0x90, 0x00])
            .expect_transfer(&[0x03, 0x29, 0x00], &[0x00, 0x00, 0x90])
            .expect_write(&[0x02, 0x60, 0x64])
            .expect_write(&[0x02, 0x70, 0x60])
            .expect_write(&[0x02, 0x0F, 0x00])
    }

    /// Expects a READ STATUS instruction returning the given status byte
    pub fn expect_status(&mut self, status: u8) -> &mut Self {
        self.expect_transfer(&[0xA0, 0x00], &[0x00, status])
    }

    pub fn into_controller(self, clock: TestClock) -> TestController {
        MCP2515::new(MockSPIDevice { bus: self.bus }, self.delay, clock)
    }
}

/// Clock always returning the same instant, may be shared between threads
#[derive(Debug, Default)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    type T = u64;
    const SCALING_FACTOR: Fraction = Fraction::new(1, 1_000_000);

    fn try_now(&self) -> Result<Instant<Self>, Error> {
        Ok(Instant::new(self.0))
    }

    fn new_timer<Dur>(&self, duration: Dur) -> Timer<OneShot, Armed, Self, Dur>
    where
        Dur: Duration + FixedPoint,
    {
        Timer::new(self, duration)
    }
}
