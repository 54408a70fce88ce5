//! Unit tests for error handling and recovery

use crate::common::{MockDelay, MockTicks, SimBus, create_hal_driver, create_mock_driver};
use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
use qmc5883l::registers::map;
use qmc5883l::{
    BusError, Error, I2cMaster, MasterInterface, NackStage, QmcConfig, Qmc5883lDriver,
    RetryPolicy, SamplingPolicy,
};

#[test]
fn test_new_rejects_wrong_chip_id() {
    let bus = SimBus::new();
    bus.set_register(map::CHIP_ID, 0x42);
    let master = I2cMaster::new(bus.clone(), MockTicks::new());

    let result = Qmc5883lDriver::new(MasterInterface::new(master));
    assert!(matches!(result, Err(Error::InvalidDevice(0x42))));
}

#[test]
fn test_new_reports_missing_device() {
    let bus = SimBus::new();
    bus.nack_next_addresses(1);
    let master = I2cMaster::new(bus.clone(), MockTicks::new());

    let result = Qmc5883lDriver::new(MasterInterface::new(master));
    assert!(matches!(
        result,
        Err(Error::Bus(BusError::Nack(NackStage::Address)))
    ));
}

#[test]
fn test_new_at_wrong_address() {
    let bus = SimBus::new();
    let master = I2cMaster::new(bus.clone(), MockTicks::new());

    let result = Qmc5883lDriver::new(MasterInterface::with_address(master, 0x1E));
    assert!(matches!(
        result,
        Err(Error::Bus(BusError::Nack(NackStage::Address)))
    ));
}

#[test]
fn test_transient_nacks_recovered_by_retry() {
    let (mut driver, bus) = create_mock_driver();
    let before = bus.address_attempts();
    bus.nack_next_addresses(3);

    let mut delay = MockDelay::new();
    driver.configure(QmcConfig::default(), &mut delay).unwrap();

    assert_eq!(bus.register(map::CONTROL_1), 0x1D);
    assert_eq!(bus.register(map::CONTROL_2), 0x01);
    // CR2 took 4 attempts, CR1 went through first time
    assert_eq!(bus.address_attempts() - before, 5);
    // backoff 1 + 2 + 4 ms
    assert_eq!(delay.total_ms, 7);
}

#[test]
fn test_permanent_nack_exhausts_retries() {
    let (mut driver, bus) = create_mock_driver();
    let before = bus.address_attempts();
    bus.nack_next_addresses(u32::MAX);

    let result = driver.configure(QmcConfig::default(), &mut MockDelay::new());

    assert_eq!(
        result,
        Err(Error::RetriesExhausted {
            attempts: 5,
            last: BusError::Nack(NackStage::Address),
        })
    );
    assert_eq!(bus.address_attempts() - before, 5);
    assert!(!bus.bus_held());
}

#[test]
fn test_failed_configure_keeps_previous_config() {
    let (mut driver, bus) = create_mock_driver();
    driver.set_retry_policy(RetryPolicy::once());
    bus.nack_next_addresses(1);

    let config = QmcConfig {
        mode: qmc5883l::Mode::Standby,
        ..QmcConfig::default()
    };
    assert!(driver.configure(config, &mut MockDelay::new()).is_err());
    assert_eq!(*driver.config(), QmcConfig::default());
}

#[test]
fn test_custom_retry_budget() {
    let (mut driver, bus) = create_mock_driver();
    driver.set_retry_policy(RetryPolicy::attempts(2));
    assert_eq!(driver.retry_policy().max_attempts, 2);
    bus.nack_next_addresses(2);

    let result = driver.init(&mut MockDelay::new());
    assert!(matches!(
        result,
        Err(Error::RetriesExhausted { attempts: 2, .. })
    ));
    assert_eq!(bus.soft_resets(), 0);
}

#[test]
fn test_wedged_bus_times_out_and_gives_up() {
    let (mut driver, bus) = create_mock_driver();
    bus.wedge();

    let result = driver.configure(QmcConfig::default(), &mut MockDelay::new());
    assert_eq!(
        result,
        Err(Error::RetriesExhausted {
            attempts: 5,
            last: BusError::Timeout,
        })
    );
}

#[test]
fn test_stall_recovered_by_retry() {
    let (mut driver, bus) = create_mock_driver();
    bus.stall_next_transfers(1);

    driver
        .configure(QmcConfig::default(), &mut MockDelay::new())
        .unwrap();
    assert_eq!(bus.register(map::CONTROL_1), 0x1D);
}

#[test]
fn test_status_read_error_propagates() {
    let (mut driver, bus) = create_mock_driver();
    bus.nack_next_addresses(1);
    assert_eq!(
        driver.read_status(),
        Err(Error::Bus(BusError::Nack(NackStage::Address)))
    );
}

#[test]
fn test_read_temperature() {
    let (mut driver, bus) = create_mock_driver();
    bus.set_register(map::TOUT_LSB, 0x34);
    bus.set_register(map::TOUT_MSB, 0x12);
    assert_eq!(driver.read_temperature().unwrap(), 0x1234);

    bus.set_register(map::TOUT_LSB, 0x9C);
    bus.set_register(map::TOUT_MSB, 0xFF);
    assert_eq!(driver.read_temperature().unwrap(), -100);
}

#[test]
fn test_hal_interface_errors_exhaust_retries() {
    let (mut driver, bus) = create_hal_driver();
    bus.nack_next_addresses(u32::MAX);

    let result = driver.configure(QmcConfig::default(), &mut MockDelay::new());
    assert_eq!(
        result,
        Err(Error::RetriesExhausted {
            attempts: 5,
            last: ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address),
        })
    );
}

#[test]
fn test_with_policies() {
    let bus = SimBus::new();
    let master = I2cMaster::new(bus.clone(), MockTicks::new());
    let sampling = SamplingPolicy::for_rate(qmc5883l::OutputDataRate::Hz10);

    let driver =
        Qmc5883lDriver::with_policies(MasterInterface::new(master), sampling, RetryPolicy::once())
            .unwrap();

    assert_eq!(*driver.sampling_policy(), sampling);
    assert_eq!(*driver.retry_policy(), RetryPolicy::once());
}

#[test]
fn test_release_returns_interface() {
    let (driver, bus) = create_mock_driver();
    let interface = driver.release();
    assert_eq!(interface.address().value(), 0x0D);
    let (controller, _ticks) = interface.release().release();
    controller.set_register(map::CONTROL_1, 0x11);
    assert_eq!(bus.register(map::CONTROL_1), 0x11);
}
