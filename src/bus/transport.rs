//! Transaction framing on a bare I2C controller

use super::{Ack, BusError, BusMode, I2cController, TickSource};

/// Default completion deadline in ticks (milliseconds)
///
/// Kinetis-class controllers can leave IICIF low forever after a glitched transfer
/// (documented silicon erratum), so every completion wait is bounded by this deadline.
pub const DEFAULT_TIMEOUT_TICKS: u32 = 10;

/// Framing state of the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportState {
    /// Bus released, no transaction in progress
    Idle,
    /// Bus held, master driving SDA
    Transmitting,
    /// Bus held, peripheral driving SDA
    Receiving,
    /// The last completion wait hit its deadline; the byte may be partially clocked
    TimedOut,
}

/// I2C master built on a bare controller and a tick source
///
/// Exposes the individual framing steps of a transaction. The steps must be issued
/// in bus order; [`access`](super::access) composes them into register transactions.
pub struct I2cMaster<C, T> {
    controller: C,
    ticks: T,
    timeout_ticks: u32,
    mode: BusMode,
    state: TransportState,
}

impl<C, T> I2cMaster<C, T>
where
    C: I2cController,
    T: TickSource,
{
    /// Create a master with the default completion deadline
    pub const fn new(controller: C, ticks: T) -> Self {
        Self::with_timeout(controller, ticks, DEFAULT_TIMEOUT_TICKS)
    }

    /// Create a master with a custom completion deadline in ticks
    pub const fn with_timeout(controller: C, ticks: T, timeout_ticks: u32) -> Self {
        Self {
            controller,
            ticks,
            timeout_ticks,
            mode: BusMode::Transmit,
            state: TransportState::Idle,
        }
    }

    /// Current framing state
    pub const fn state(&self) -> TransportState {
        self.state
    }

    /// Current data direction
    pub const fn mode(&self) -> BusMode {
        self.mode
    }

    /// Completion deadline in ticks
    pub const fn timeout_ticks(&self) -> u32 {
        self.timeout_ticks
    }

    /// Generate START and take the bus
    ///
    /// A master left in [`TransportState::TimedOut`] releases the bus first so the
    /// controller sees a fresh rising edge on its master bit.
    pub fn start(&mut self) {
        if self.state != TransportState::Idle {
            self.controller.set_master(false);
        }
        self.controller.set_master(true);
        self.state = self.active_state();
    }

    /// Generate a repeated START without releasing the bus
    pub fn restart(&mut self) {
        self.controller.repeated_start();
    }

    /// Generate STOP and release the bus
    pub fn stop(&mut self) {
        self.controller.set_master(false);
        self.state = TransportState::Idle;
    }

    /// Release the bus if a transaction is still open
    pub fn abort(&mut self) {
        if self.state != TransportState::Idle {
            self.stop();
        }
    }

    /// Place a byte on the bus
    ///
    /// Must be followed by [`wait_for_completion`](Self::wait_for_completion) before the
    /// acknowledge bit is sampled.
    pub fn transmit_byte(&mut self, byte: u8) {
        self.controller.write_data(byte);
    }

    /// Wait until the controller flags the byte transfer as complete
    ///
    /// Gives up once [`timeout_ticks`](Self::timeout_ticks) have elapsed and moves to
    /// [`TransportState::TimedOut`]. A timeout says nothing about the acknowledge bit.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Timeout`] if the deadline passes first.
    pub fn wait_for_completion(&mut self) -> Result<(), BusError> {
        self.ticks.reset_tick();
        while !self.controller.transfer_complete() {
            if self.ticks.now() >= self.timeout_ticks {
                // a flag rising late must not complete the next byte
                self.controller.clear_transfer_complete();
                self.state = TransportState::TimedOut;

                #[cfg(feature = "defmt")]
                defmt::warn!("i2c: transfer not complete after {} ticks", self.timeout_ticks);

                return Err(BusError::Timeout);
            }
        }
        self.controller.clear_transfer_complete();
        Ok(())
    }

    /// Acknowledge bit returned for the last transmitted byte
    pub fn read_ack(&self) -> Ack {
        if self.controller.received_nack() {
            Ack::Nack
        } else {
            Ack::Ack
        }
    }

    /// Switch the controller between transmit and receive
    pub fn set_mode(&mut self, mode: BusMode) {
        self.controller.set_transmit(mode == BusMode::Transmit);
        self.mode = mode;
        if matches!(
            self.state,
            TransportState::Transmitting | TransportState::Receiving
        ) {
            self.state = self.active_state();
        }
    }

    /// Select the acknowledge bit the master sends after the byte being received
    ///
    /// [`Ack::Nack`] marks the final byte of a burst and makes the peripheral release SDA.
    pub fn drive_ack(&mut self, ack: Ack) {
        self.controller.set_tx_nack(ack == Ack::Nack);
    }

    /// Read the data register
    ///
    /// In receive mode with the bus held, the read also starts clocking the next byte.
    pub fn read_data(&mut self) -> u8 {
        self.controller.read_data()
    }

    /// Consume the master and return the controller and tick source
    pub fn release(self) -> (C, T) {
        (self.controller, self.ticks)
    }

    const fn active_state(&self) -> TransportState {
        match self.mode {
            BusMode::Transmit => TransportState::Transmitting,
            BusMode::Receive => TransportState::Receiving,
        }
    }
}
