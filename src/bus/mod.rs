//! Register-level I2C bus transport
//!
//! This module drives a bare I2C controller peripheral one framing step at a time:
//! start, repeated start, stop, byte transmit, acknowledge sampling and TXAK control.
//! It targets controllers in the style of the Kinetis `I2Cx` block, where software
//! sequences every byte and polls an interrupt flag for transfer completion.
//!
//! ## Layers
//! - [`I2cController`]: the hardware seam (one method per register bit the engine touches)
//! - [`TickSource`]: millisecond tick counter used to bound every completion wait
//! - [`I2cMaster`]: the framing state machine built on both
//! - [`access`]: register-level transactions composed from the framing steps
//!
//! The transport never retries. A NACK or a timeout aborts the transaction and is
//! reported to the caller, who decides whether to try again (see [`crate::retry`]).

pub mod access;
mod transport;

pub use transport::{DEFAULT_TIMEOUT_TICKS, I2cMaster, TransportState};

/// Bare I2C controller peripheral
///
/// Each method maps onto a single register access of the controller. Implementations
/// must not add buffering or sequencing of their own: [`I2cMaster`] relies on the
/// exact ordering of these calls.
pub trait I2cController {
    /// Set or clear master mode. A rising edge generates START, a falling edge STOP.
    fn set_master(&mut self, enabled: bool);

    /// Generate a repeated START while the bus is held.
    fn repeated_start(&mut self);

    /// Select transmit (`true`) or receive (`false`) direction.
    fn set_transmit(&mut self, transmit: bool);

    /// Select the acknowledge bit sent after the next received byte (`true` = NACK).
    fn set_tx_nack(&mut self, nack: bool);

    /// Write the data register. In transmit mode this clocks the byte out.
    fn write_data(&mut self, byte: u8);

    /// Read the data register. In receive mode this also starts clocking the next byte.
    fn read_data(&mut self) -> u8;

    /// Transfer-complete interrupt flag.
    fn transfer_complete(&self) -> bool;

    /// Clear the transfer-complete interrupt flag.
    fn clear_transfer_complete(&mut self);

    /// Whether the last transmitted byte was answered with NACK.
    fn received_nack(&self) -> bool;
}

/// Monotonic millisecond tick counter driven by a periodic interrupt
pub trait TickSource {
    /// Ticks elapsed since the last [`reset_tick`](Self::reset_tick).
    fn now(&self) -> u32;

    /// Restart counting from zero.
    fn reset_tick(&mut self);
}

/// Transfer direction encoded in the low bit of the address byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Master writes to the peripheral
    Write = 0,
    /// Master reads from the peripheral
    Read = 1,
}

/// Acknowledge bit on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Ack {
    /// Byte acknowledged (SDA pulled low on the ninth clock)
    Ack,
    /// Byte not acknowledged
    Nack,
}

/// Controller data direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusMode {
    /// Master drives SDA
    Transmit,
    /// Peripheral drives SDA
    Receive,
}

/// 7-bit peripheral address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusAddress(u8);

impl BusAddress {
    /// Create an address from its 7-bit value (the top bit is discarded)
    pub const fn new(address: u8) -> Self {
        Self(address & 0x7F)
    }

    /// The 7-bit address
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Address byte sent after START: `(address << 1) | direction`
    pub const fn byte(self, direction: Direction) -> u8 {
        (self.0 << 1) | direction as u8
    }
}

/// Step of a transaction that was not acknowledged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NackStage {
    /// Address byte after START or repeated START
    Address,
    /// Register pointer byte
    Register,
    /// Register value byte
    Data,
}

/// Transport-level failure
///
/// Both variants leave the bus released (STOP issued) and are safe to retry from
/// a fresh START.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// The peripheral did not acknowledge a byte
    Nack(NackStage),
    /// The transfer-complete flag did not rise before the tick deadline
    Timeout,
}

impl core::fmt::Display for BusError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Nack(NackStage::Address) => f.write_str("address byte not acknowledged"),
            Self::Nack(NackStage::Register) => f.write_str("register byte not acknowledged"),
            Self::Nack(NackStage::Data) => f.write_str("data byte not acknowledged"),
            Self::Timeout => f.write_str("timed out waiting for transfer completion"),
        }
    }
}

impl embedded_hal::i2c::Error for BusError {
    fn kind(&self) -> embedded_hal::i2c::ErrorKind {
        use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};

        match self {
            Self::Nack(NackStage::Address) => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address),
            Self::Nack(_) => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data),
            Self::Timeout => ErrorKind::Other,
        }
    }
}
