//! Unit tests for data-ready polling through the driver

use crate::common::{MockDelay, create_hal_driver, create_mock_driver};
use qmc5883l::{Error, RawSample, SampleWarning, SamplingPolicy};

#[test]
fn test_read_sample_decodes_axes() {
    let (mut driver, bus) = create_mock_driver();
    bus.push_sample(1234, -5678, i16::MIN);

    let reading = driver.read_sample(&mut MockDelay::new()).unwrap();

    assert_eq!(
        reading.sample,
        RawSample {
            x: 1234,
            y: -5678,
            z: i16::MIN
        }
    );
    assert_eq!(reading.warning(), None);
    assert!(reading.status.data_ready);
    assert_eq!(bus.protocol_violations(), 0);
}

#[test]
fn test_read_sample_waits_for_data_ready() {
    let (mut driver, bus) = create_mock_driver();
    bus.delay_data_ready(3);
    bus.push_sample(7, 8, 9);

    let mut delay = MockDelay::new();
    let reading = driver.read_sample(&mut delay).unwrap();

    assert_eq!(reading.sample.axes(), [7, 8, 9]);
    // three not-ready polls, each followed by the default 2 ms wait
    assert_eq!(delay.total_ms, 6);
}

#[test]
fn test_data_ready_cleared_by_data_read() {
    let (mut driver, bus) = create_mock_driver();
    bus.push_sample(1, 2, 3);

    driver.read_sample(&mut MockDelay::new()).unwrap();

    assert!(!driver.read_status().unwrap().data_ready);
}

#[test]
fn test_consecutive_samples_in_order() {
    let (mut driver, bus) = create_mock_driver();
    bus.push_sample(1, 1, 1);
    bus.push_sample(2, 2, 2);

    let mut delay = MockDelay::new();
    assert_eq!(driver.read_sample(&mut delay).unwrap().sample.x, 1);
    assert_eq!(driver.read_sample(&mut delay).unwrap().sample.x, 2);
}

#[test]
fn test_overflow_reported_over_overrun() {
    let (mut driver, bus) = create_mock_driver();
    bus.push_sample_with_flags(10, 20, 30, 0x06);

    let reading = driver.read_sample(&mut MockDelay::new()).unwrap();

    assert_eq!(reading.sample.axes(), [10, 20, 30]);
    assert_eq!(reading.warning(), Some(SampleWarning::DataOverflow));
    assert!(reading.status.data_overrun);
    assert!(reading.status.overflow);
}

#[test]
fn test_overrun_reported_alone() {
    let (mut driver, bus) = create_mock_driver();
    bus.push_sample_with_flags(10, 20, 30, 0x04);

    let reading = driver.read_sample(&mut MockDelay::new()).unwrap();
    assert_eq!(reading.warning(), Some(SampleWarning::DataOverrun));
}

#[test]
fn test_status_read_failures_keep_polling() {
    let (mut driver, bus) = create_mock_driver();
    bus.push_sample(4, 5, 6);
    bus.nack_next_addresses(3);

    let reading = driver.read_sample(&mut MockDelay::new()).unwrap();
    assert_eq!(reading.sample.axes(), [4, 5, 6]);
}

#[test]
fn test_failed_burst_picks_sample_up_again() {
    let (mut driver, bus) = create_mock_driver();
    bus.push_sample(-1, -2, -3);
    // status read is 4 transfers; the burst's register byte stalls
    bus.stall_transfer_after(5);

    let reading = driver.read_sample(&mut MockDelay::new()).unwrap();
    assert_eq!(reading.sample.axes(), [-1, -2, -3]);
}

#[test]
fn test_poll_budget_is_bounded() {
    let (mut driver, _bus) = create_mock_driver();
    driver.set_sampling_policy(SamplingPolicy {
        poll_interval_ms: 1,
        max_polls: 5,
    });

    let mut delay = MockDelay::new();
    let result = driver.read_sample(&mut delay);

    assert_eq!(result, Err(Error::DataNotReady { polls: 5 }));
    assert_eq!(delay.total_ms, 4);
}

#[test]
fn test_dead_bus_is_bounded() {
    let (mut driver, bus) = create_mock_driver();
    driver.set_sampling_policy(SamplingPolicy {
        poll_interval_ms: 1,
        max_polls: 3,
    });
    bus.wedge();

    let result = driver.read_sample(&mut MockDelay::new());
    assert_eq!(result, Err(Error::DataNotReady { polls: 3 }));
}

#[test]
fn test_read_sample_over_hal_interface() {
    let (mut driver, bus) = create_hal_driver();
    bus.delay_data_ready(1);
    bus.push_sample(300, -300, 42);

    let reading = driver.read_sample(&mut MockDelay::new()).unwrap();
    assert_eq!(reading.sample.axes(), [300, -300, 42]);
}
