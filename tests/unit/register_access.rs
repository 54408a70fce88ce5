//! Unit tests for register write, read and burst read transactions

use crate::common::{BusEvent, SimBus, create_master};
use device_driver::RegisterInterface;
use qmc5883l::registers::map;
use qmc5883l::{BusAddress, BusError, HalInterface, NackStage};

const SENSOR: BusAddress = BusAddress::new(0x0D);

fn sent(byte: u8) -> BusEvent {
    BusEvent::Sent { byte, acked: true }
}

#[test]
fn test_write_register_frame() {
    let (mut master, bus) = create_master();

    master
        .write_register(SENSOR, map::CONTROL_1, 0x1D)
        .unwrap();

    assert_eq!(bus.register(map::CONTROL_1), 0x1D);
    assert_eq!(
        bus.events(),
        vec![
            BusEvent::Start,
            sent(0x1A),
            sent(map::CONTROL_1),
            sent(0x1D),
            BusEvent::Stop,
        ]
    );
    assert_eq!(bus.protocol_violations(), 0);
}

#[test]
fn test_write_registers_auto_increments() {
    let (mut master, bus) = create_master();

    master
        .write_registers(SENSOR, map::CONTROL_1, &[0x1D, 0x41])
        .unwrap();

    assert_eq!(bus.register(map::CONTROL_1), 0x1D);
    assert_eq!(bus.register(map::CONTROL_2), 0x41);
}

#[test]
fn test_read_register_frame() {
    let (mut master, bus) = create_master();

    let chip_id = master.read_register(SENSOR, map::CHIP_ID).unwrap();

    assert_eq!(chip_id, 0xFF);
    assert_eq!(
        bus.events(),
        vec![
            BusEvent::Start,
            sent(0x1A),
            sent(map::CHIP_ID),
            BusEvent::Restart,
            sent(0x1B),
            BusEvent::Received { byte: 0xFF },
            BusEvent::Stop,
        ]
    );
    assert_eq!(bus.protocol_violations(), 0);
}

#[test]
fn test_burst_read_returns_consecutive_registers() {
    let (mut master, bus) = create_master();
    for (offset, value) in [0x10, 0x11, 0x12, 0x13, 0x14, 0x15].into_iter().enumerate() {
        bus.set_register(offset as u8, value);
    }

    let mut buffer = [0u8; map::DATA_LEN];
    master
        .read_registers(SENSOR, map::DATA_X_LSB, &mut buffer)
        .unwrap();

    assert_eq!(buffer, [0x10, 0x11, 0x12, 0x13, 0x14, 0x15]);

    let received = bus
        .events()
        .iter()
        .filter(|event| matches!(event, BusEvent::Received { .. }))
        .count();
    assert_eq!(received, map::DATA_LEN, "exactly one clock per requested byte");
    assert_eq!(bus.events().last(), Some(&BusEvent::Stop));
    assert_eq!(bus.protocol_violations(), 0);
}

#[test]
fn test_burst_read_single_byte() {
    let (mut master, bus) = create_master();
    bus.set_register(map::SET_RESET_PERIOD, 0x01);

    let mut buffer = [0u8; 1];
    master
        .read_registers(SENSOR, map::SET_RESET_PERIOD, &mut buffer)
        .unwrap();

    assert_eq!(buffer, [0x01]);
    assert_eq!(bus.protocol_violations(), 0);
}

#[test]
fn test_burst_read_empty_touches_nothing() {
    let (mut master, bus) = create_master();
    let mut buffer = [0u8; 0];
    master
        .read_registers(SENSOR, map::DATA_X_LSB, &mut buffer)
        .unwrap();
    assert!(bus.events().is_empty());
}

#[test]
fn test_burst_read_follows_pointer_rollover() {
    let (mut master, bus) = create_master();
    bus.set_register(map::DATA_X_LSB, 0x42);
    bus.set_register(map::CONTROL_2, 0x40);

    let mut buffer = [0u8; 8];
    master
        .read_registers(SENSOR, map::DATA_X_LSB, &mut buffer)
        .unwrap();

    // 0x00..=0x06 then wraps back to 0x00
    assert_eq!(buffer[0], 0x42);
    assert_eq!(buffer[7], 0x42);
}

#[test]
fn test_burst_read_failure_yields_no_partial_data() {
    let (mut master, bus) = create_master();
    for offset in 0..6 {
        bus.set_register(offset, 0x55);
    }
    // addr+W, register, addr+R, byte 0, byte 1 go through; byte 2 stalls
    bus.stall_transfer_after(5);

    let mut buffer = [0xAAu8; map::DATA_LEN];
    let result = master.read_registers(SENSOR, map::DATA_X_LSB, &mut buffer);

    assert_eq!(result, Err(BusError::Timeout));
    assert_eq!(buffer, [0u8; map::DATA_LEN]);
    assert!(!bus.bus_held(), "bus must be released after a failure");
}

#[test]
fn test_address_nack_aborts_transaction() {
    let (mut master, bus) = create_master();
    bus.nack_next_addresses(1);

    let result = master.write_register(SENSOR, map::CONTROL_1, 0x1D);

    assert_eq!(result, Err(BusError::Nack(NackStage::Address)));
    assert_eq!(
        bus.events(),
        vec![
            BusEvent::Start,
            BusEvent::Sent {
                byte: 0x1A,
                acked: false
            },
            BusEvent::Stop,
        ]
    );
    assert_eq!(bus.register(map::CONTROL_1), 0x00);
}

#[test]
fn test_read_address_nack_reported() {
    let (mut master, bus) = create_master();
    bus.nack_next_addresses(1);

    assert_eq!(
        master.read_register(SENSOR, map::STATUS),
        Err(BusError::Nack(NackStage::Address))
    );
    assert!(!bus.bus_held());

    // Next transaction starts clean
    assert_eq!(master.read_register(SENSOR, map::CHIP_ID), Ok(0xFF));
}

#[test]
fn test_wrong_device_not_acknowledged() {
    let (mut master, _bus) = create_master();
    assert_eq!(
        master.read_register(BusAddress::new(0x1E), map::CHIP_ID),
        Err(BusError::Nack(NackStage::Address))
    );
}

#[test]
fn test_timeout_on_register_byte() {
    let (mut master, bus) = create_master();
    // address goes through, register byte stalls
    bus.stall_transfer_after(1);

    assert_eq!(
        master.write_register(SENSOR, map::CONTROL_1, 0x1D),
        Err(BusError::Timeout)
    );
    assert!(!bus.bus_held());
    assert_eq!(bus.register(map::CONTROL_1), 0x00);
}

#[test]
fn test_hal_write_sends_whole_payload() {
    let bus = SimBus::new();
    let mut interface = HalInterface::new(bus.clone());
    let payload: Vec<u8> = (0..20).collect();

    interface
        .write_register(map::DATA_X_LSB, 8 * 20, &payload)
        .unwrap();

    let written: Vec<u8> = bus
        .events()
        .into_iter()
        .filter_map(|event| match event {
            BusEvent::Sent { byte, .. } => Some(byte),
            _ => None,
        })
        .collect();
    assert_eq!(written.len(), payload.len() + 1);
    assert_eq!(written[0], map::DATA_X_LSB);
    assert_eq!(&written[1..], payload.as_slice());
    // Pointer auto-increment reached the control registers
    assert_eq!(bus.register(map::CONTROL_1), 9);
    assert_eq!(bus.register(map::SET_RESET_PERIOD), 11);
}

#[test]
fn test_hal_write_single_register_frame() {
    let bus = SimBus::new();
    let mut interface = HalInterface::new(bus.clone());

    interface.write_register(map::CONTROL_1, 8, &[0x1D]).unwrap();

    assert_eq!(
        bus.events(),
        vec![BusEvent::Start, sent(map::CONTROL_1), sent(0x1D), BusEvent::Stop]
    );
    assert_eq!(bus.register(map::CONTROL_1), 0x1D);
}
