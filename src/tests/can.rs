use crate::can::{CanError, DeviceState, SpiError, MCP2515};
use crate::config::{ConfigError, Configuration, RequestMode};
use crate::frame::{Frame, FrameError};
use crate::mocks::{FixedClock, MockSPIDevice, Mocks, TestClock};
use crate::status::{OperationMode, RxBuffer, TxBuffer};
use embedded_can::Frame as _;
use embedded_hal::spi::ErrorKind;

const EXTENDED_ID: u32 = 0x14C92A2B;

#[test]
fn test_setup_correct() {
    let mut mocks = Mocks::default();
    mocks.expect_setup();
    let delay = mocks.delay.clone();

    let controller = mocks.into_controller(TestClock::new(vec![]));
    assert_eq!(DeviceState::Uninitialized, controller.state());

    controller.setup(500_000).unwrap();
    assert_eq!(DeviceState::Ready, controller.state());

    // Reset settle time
    assert_eq!(20, delay.elapsed_us());
}

#[test]
fn test_setup_twice_no_bus_traffic() {
    let mut mocks = Mocks::default();
    mocks.expect_setup();

    let controller = mocks.into_controller(TestClock::new(vec![]));

    controller.setup(500_000).unwrap();
    controller.setup(500_000).unwrap();
    assert_eq!(DeviceState::Ready, controller.state());
}

#[test]
fn test_setup_125kbps() {
    let mut mocks = Mocks::default();
    mocks
        .expect_write(&[0xC0])
        .expect_write(&[0x02, 0x28, 0x02, 0x90, 0x03])
        .expect_transfer(&[0x03, 0x29, 0x00], &[0x00, 0x00, 0x90])
        .expect_write(&[0x02, 0x60, 0x64])
        .expect_write(&[0x02, 0x70, 0x60])
        .expect_write(&[0x02, 0x0F, 0x00]);

    let controller = mocks.into_controller(TestClock::new(vec![]));
    controller.setup(125_000).unwrap();
    assert_eq!(DeviceState::Ready, controller.state());
}

#[test]
fn test_configure_loopback_without_rollover() {
    let mut mocks = Mocks::default();
    mocks
        .expect_write(&[0xC0])
        .expect_write(&[0x02, 0x28, 0x02, 0x90, 0x01])
        .expect_transfer(&[0x03, 0x29, 0x00], &[0x00, 0x00, 0x90])
        .expect_write(&[0x02, 0x60, 0x60])
        .expect_write(&[0x02, 0x70, 0x60])
        .expect_write(&[0x02, 0x0F, 0x40]);

    let controller = mocks.into_controller(TestClock::new(vec![]));
    let config = Configuration {
        bit_rate: 250_000,
        rollover: false,
        mode: RequestMode::Loopback,
    };

    controller.configure(&config).unwrap();
    assert_eq!(DeviceState::Ready, controller.state());
}

#[test]
fn test_setup_unsupported_bit_rate() {
    let controller = Mocks::default().into_controller(TestClock::new(vec![]));

    assert_eq!(
        CanError::ConfigErr(ConfigError::UnsupportedBitRate(1_000_000)),
        controller.setup(1_000_000).unwrap_err()
    );
    assert_eq!(DeviceState::Uninitialized, controller.state());
}

#[test]
fn test_setup_chip_not_responding() {
    let mut mocks = Mocks::default();
    mocks
        .expect_write(&[0xC0])
        .expect_write(&[0x02, 0x28, 0x02, 0x90, 0x00])
        .expect_transfer(&[0x03, 0x29, 0x00], &[0x00, 0x00, 0x00]);

    let controller = mocks.into_controller(TestClock::new(vec![]));

    assert_eq!(
        CanError::ChipNotResponding {
            expected: 0x90,
            actual: 0x00
        },
        controller.setup(500_000).unwrap_err()
    );
    assert_eq!(DeviceState::Failed, controller.state());
}

#[test]
fn test_setup_retry_after_failure() {
    let mut mocks = Mocks::default();
    mocks
        .expect_write(&[0xC0])
        .expect_write(&[0x02, 0x28, 0x02, 0x90, 0x00])
        .expect_transfer(&[0x03, 0x29, 0x00], &[0x00, 0x00, 0xFF]);
    mocks.expect_setup();

    let controller = mocks.into_controller(TestClock::new(vec![]));

    assert!(controller.setup(500_000).is_err());
    assert_eq!(DeviceState::Failed, controller.state());

    controller.setup(500_000).unwrap();
    assert_eq!(DeviceState::Ready, controller.state());
}

#[test]
fn test_setup_transfer_error() {
    let mut mocks = Mocks::default();
    mocks.expect_bus_error(&[0xC0]);

    let controller = mocks.into_controller(TestClock::new(vec![]));

    assert_eq!(
        CanError::BusErr(SpiError::BusError(ErrorKind::Other)),
        controller.setup(500_000).unwrap_err()
    );
    assert_eq!(DeviceState::Failed, controller.state());
}

#[test]
fn test_setup_concurrent_runs_once() {
    let mut mocks = Mocks::default();
    mocks.expect_setup();

    let controller: MCP2515<_, _, _> =
        MCP2515::new(MockSPIDevice { bus: mocks.bus }, mocks.delay, FixedClock::default());

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4).map(|_| scope.spawn(|| controller.setup(500_000))).collect();

        for handle in handles {
            assert!(handle.join().unwrap().is_ok());
        }
    });

    assert_eq!(DeviceState::Ready, controller.state());
}

#[test]
fn test_operations_require_setup() {
    let controller = Mocks::default().into_controller(TestClock::new(vec![]));
    let frame = Frame::from_raw(0x123, false, &[1]).unwrap();

    assert_eq!(CanError::DeviceNotReady, controller.status().unwrap_err());
    assert_eq!(CanError::DeviceNotReady, controller.receive(RxBuffer::Rxb0).unwrap_err());
    assert_eq!(
        CanError::DeviceNotReady,
        controller.transmit(TxBuffer::Txb0, &frame).unwrap_err()
    );
    assert_eq!(
        CanError::DeviceNotReady,
        controller.set_mode(RequestMode::ListenOnly).unwrap_err()
    );
}

#[test]
fn test_read_status() {
    let mut mocks = Mocks::default();
    mocks.expect_setup().expect_status(0b0101_0110);

    let controller = mocks.into_controller(TestClock::new(vec![]));
    controller.setup(500_000).unwrap();

    let status = controller.status().unwrap();
    assert!(!status.rx0_full);
    assert!(status.rx1_full);
    assert!(status.tx0_pending);
    assert!(status.tx1_pending);
    assert!(status.tx2_pending);
    assert!(!status.tx0_sent);
}

#[test]
fn test_receive_standard_frame() {
    let mut mocks = Mocks::default();
    mocks.expect_setup();

    let mut response = [0u8; 14];
    response[1..6].copy_from_slice(&[0x55, 0x40, 0x00, 0x00, 0x08]);
    response[6..].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);

    let mut request = [0u8; 14];
    request[0] = 0x90;
    mocks.expect_transfer(&request, &response);

    let controller = mocks.into_controller(TestClock::new(vec![1500]));
    controller.setup(500_000).unwrap();

    let frame = controller.receive(RxBuffer::Rxb0).unwrap();
    assert_eq!(0x2AA, frame.raw_id());
    assert!(!frame.is_extended());
    assert!(!frame.is_remote_frame());
    assert_eq!(&[1, 2, 3, 4, 5, 6, 7, 8], frame.data());
    assert_eq!(Some(1500), frame.timestamp().map(|timestamp| timestamp.0));
}

#[test]
fn test_receive_extended_frame_without_clock() {
    let mut mocks = Mocks::default();
    mocks.expect_setup();

    let mut response = [0u8; 14];
    response[1..10].copy_from_slice(&[0xA6, 0x49, 0x2A, 0x2B, 0x04, 0xDE, 0xAD, 0xBE, 0xEF]);

    let mut request = [0u8; 14];
    request[0] = 0x94;
    mocks.expect_transfer(&request, &response);

    let controller = mocks.into_controller(TestClock::new(vec![]));
    controller.setup(500_000).unwrap();

    let frame = controller.receive(RxBuffer::Rxb1).unwrap();
    assert_eq!(EXTENDED_ID, frame.raw_id());
    assert!(frame.is_extended());
    assert_eq!(&[0xDE, 0xAD, 0xBE, 0xEF], frame.data());
    assert!(frame.timestamp().is_none());
}

#[test]
fn test_receive_malformed_frame() {
    let mut mocks = Mocks::default();
    mocks.expect_setup();

    let mut response = [0u8; 14];
    response[1..6].copy_from_slice(&[0x55, 0x40, 0x00, 0x00, 0x0F]);

    let mut request = [0u8; 14];
    request[0] = 0x90;
    mocks.expect_transfer(&request, &response);

    let controller = mocks.into_controller(TestClock::new(vec![]));
    controller.setup(500_000).unwrap();

    assert_eq!(
        CanError::FrameErr(FrameError::MalformedFrame(15)),
        controller.receive(RxBuffer::Rxb0).unwrap_err()
    );
}

#[test]
fn test_transmit() {
    let mut mocks = Mocks::default();
    mocks.expect_setup();

    let mut load = [0xAAu8; 14];
    load[..6].copy_from_slice(&[0x42, 0x55, 0x40, 0x00, 0x00, 0x08]);
    mocks.expect_write(&load).expect_write(&[0x82]);

    let controller = mocks.into_controller(TestClock::new(vec![]));
    controller.setup(500_000).unwrap();

    let frame = Frame::from_raw(0x2AA, false, &[0xAA; 8]).unwrap();
    controller.transmit(TxBuffer::Txb1, &frame).unwrap();
}

#[test]
fn test_transmit_transfer_error() {
    let mut mocks = Mocks::default();
    mocks.expect_setup();

    let mut load = [0u8; 14];
    load[..6].copy_from_slice(&[0x44, 0x55, 0x40, 0x00, 0x00, 0x00]);
    mocks.expect_bus_error(&load);

    let controller = mocks.into_controller(TestClock::new(vec![]));
    controller.setup(500_000).unwrap();

    // Request to send is not issued
    let frame = Frame::from_raw(0x2AA, false, &[]).unwrap();
    assert_eq!(
        CanError::BusErr(SpiError::BusError(ErrorKind::Other)),
        controller.transmit(TxBuffer::Txb2, &frame).unwrap_err()
    );
    assert_eq!(DeviceState::Ready, controller.state());
}

#[test]
fn test_set_mode() {
    let mut mocks = Mocks::default();
    mocks.expect_setup().expect_write(&[0x05, 0x0F, 0xE0, 0x60]);

    let controller = mocks.into_controller(TestClock::new(vec![]));
    controller.setup(500_000).unwrap();

    controller.set_mode(RequestMode::ListenOnly).unwrap();
}

#[test]
fn test_read_operation_mode() {
    let mut mocks = Mocks::default();
    mocks.expect_transfer(&[0x03, 0x0E, 0x00], &[0x00, 0x00, 0x80]);

    let controller = mocks.into_controller(TestClock::new(vec![]));
    assert_eq!(OperationMode::Configuration, controller.operation_mode().unwrap());
}

#[test]
fn test_reset() {
    let mut mocks = Mocks::default();
    mocks.expect_setup().expect_write(&[0xC0]);
    let delay = mocks.delay.clone();

    let controller = mocks.into_controller(TestClock::new(vec![]));
    controller.setup(500_000).unwrap();

    controller.reset().unwrap();
    assert_eq!(DeviceState::Uninitialized, controller.state());
    assert_eq!(40, delay.elapsed_us());

    assert_eq!(CanError::DeviceNotReady, controller.status().unwrap_err());
}

#[test]
fn test_reset_transfer_error() {
    let mut mocks = Mocks::default();
    mocks.expect_bus_error(&[0xC0]);

    let controller = mocks.into_controller(TestClock::new(vec![]));

    assert!(controller.reset().is_err());
    assert_eq!(DeviceState::Failed, controller.state());
}
