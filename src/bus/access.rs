//! Register access transactions
//!
//! Composes the framing steps of [`I2cMaster`] into the three transaction shapes the
//! sensor understands:
//!
//! - register write: `S | addr+W | reg | value... | P`
//! - single register read: `S | addr+W | reg | Sr | addr+R | byte(NACK) | P`
//! - burst read: `S | addr+W | reg | Sr | addr+R | byte(ACK)... | byte(NACK) | P`
//!
//! Burst reads rely on the peripheral's auto-incrementing register pointer. The STOP
//! of a burst is generated after the last byte has been clocked and before the data
//! register is read. Reading the data register first would clock one extra byte and
//! leave the peripheral's pointer one register ahead of the caller.
//!
//! Every failure releases the bus before returning, so the next transaction always
//! starts from a clean START.

use super::{
    Ack, BusAddress, BusError, BusMode, Direction, I2cController, I2cMaster, NackStage, TickSource,
};

impl<C, T> I2cMaster<C, T>
where
    C: I2cController,
    T: TickSource,
{
    /// Write a single register
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Nack`] naming the unacknowledged step, or
    /// [`BusError::Timeout`] if a byte transfer never completed.
    pub fn write_register(
        &mut self,
        device: BusAddress,
        register: u8,
        value: u8,
    ) -> Result<(), BusError> {
        self.write_registers(device, register, &[value])
    }

    /// Write consecutive registers starting at `register` in one transaction
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Nack`] naming the unacknowledged step, or
    /// [`BusError::Timeout`] if a byte transfer never completed.
    pub fn write_registers(
        &mut self,
        device: BusAddress,
        register: u8,
        values: &[u8],
    ) -> Result<(), BusError> {
        let result = self.write_frame(device, register, values);
        self.abort();
        log_failure(&result);
        result
    }

    /// Read a single register
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Nack`] naming the unacknowledged step, or
    /// [`BusError::Timeout`] if a byte transfer never completed.
    pub fn read_register(&mut self, device: BusAddress, register: u8) -> Result<u8, BusError> {
        let result = self.read_frame(device, register);
        if result.is_err() {
            self.abort();
        }
        log_failure(&result);
        result
    }

    /// Read `buffer.len()` consecutive registers starting at `register`
    ///
    /// On success every byte of `buffer` holds the register at `register + index`.
    /// On failure `buffer` is zeroed: a partially clocked burst is never handed out.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Nack`] naming the unacknowledged step, or
    /// [`BusError::Timeout`] if a byte transfer never completed.
    pub fn read_registers(
        &mut self,
        device: BusAddress,
        register: u8,
        buffer: &mut [u8],
    ) -> Result<(), BusError> {
        if buffer.is_empty() {
            return Ok(());
        }

        let result = self.burst_frame(device, register, buffer);
        if result.is_err() {
            self.abort();
            buffer.fill(0);
        }
        log_failure(&result);
        result
    }

    fn write_frame(
        &mut self,
        device: BusAddress,
        register: u8,
        values: &[u8],
    ) -> Result<(), BusError> {
        self.set_mode(BusMode::Transmit);
        self.start();
        self.send(device.byte(Direction::Write), NackStage::Address)?;
        self.send(register, NackStage::Register)?;
        for &value in values {
            self.send(value, NackStage::Data)?;
        }
        self.stop();
        Ok(())
    }

    fn read_frame(&mut self, device: BusAddress, register: u8) -> Result<u8, BusError> {
        self.open_read(device, register)?;

        // Single byte: NACK it up front, the dummy read starts the transfer
        self.drive_ack(Ack::Nack);
        let _ = self.read_data();
        self.wait_for_completion()?;
        self.stop();

        Ok(self.read_data())
    }

    fn burst_frame(
        &mut self,
        device: BusAddress,
        register: u8,
        buffer: &mut [u8],
    ) -> Result<(), BusError> {
        self.open_read(device, register)?;

        let last = buffer.len() - 1;
        self.drive_ack(if last == 0 { Ack::Nack } else { Ack::Ack });
        let _ = self.read_data();

        for (index, slot) in buffer.iter_mut().enumerate() {
            // drive ack bit -> completion wait -> stop on last -> read data register
            self.drive_ack(if index == last { Ack::Nack } else { Ack::Ack });
            self.wait_for_completion()?;
            if index == last {
                self.stop();
            }
            *slot = self.read_data();
        }

        Ok(())
    }

    /// Address the device for writing, set its register pointer, then turn the bus
    /// around with a repeated START and switch to receive.
    fn open_read(&mut self, device: BusAddress, register: u8) -> Result<(), BusError> {
        self.set_mode(BusMode::Transmit);
        self.start();
        self.send(device.byte(Direction::Write), NackStage::Address)?;
        self.send(register, NackStage::Register)?;

        self.restart();
        self.send(device.byte(Direction::Read), NackStage::Address)?;

        self.set_mode(BusMode::Receive);
        Ok(())
    }

    fn send(&mut self, byte: u8, stage: NackStage) -> Result<(), BusError> {
        self.transmit_byte(byte);
        self.wait_for_completion()?;
        match self.read_ack() {
            Ack::Ack => Ok(()),
            Ack::Nack => Err(BusError::Nack(stage)),
        }
    }
}

#[cfg_attr(not(feature = "defmt"), allow(unused_variables))]
fn log_failure<V>(result: &Result<V, BusError>) {
    #[cfg(feature = "defmt")]
    if let Err(error) = result {
        defmt::debug!("i2c: transaction aborted: {}", error);
    }
}
