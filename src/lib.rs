#![no_std]
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod bus;
pub mod calibration;
pub mod config;
pub mod device;
pub mod interface;
pub mod registers;
pub mod retry;
pub mod sampling;

// Re-export main types
pub use bus::{BusAddress, BusError, I2cController, I2cMaster, NackStage, TickSource};
pub use calibration::{CalibratedSample, CalibrationModel, HardIronEstimator};
pub use config::{
    InterruptPin, Mode, OutputDataRate, OversamplingRatio, PointerRollover, QmcConfig, Range,
    SoftReset, StatusFlags,
};
pub use device::{Qmc5883lDriver, temperature_delta_celsius};
pub use interface::{HalInterface, MasterInterface};
pub use retry::RetryPolicy;
pub use sampling::{RawSample, Reading, SampleWarning, SamplingPolicy};

/// QMC5883L 7-bit I2C address (fixed, no address pins)
pub const I2C_ADDRESS: u8 = 0x0D;

/// Expected value of the chip identification register
pub const CHIP_ID_VALUE: u8 = 0xFF;

/// Recommended SET/RESET period register value from the datasheet
pub const SET_RESET_PERIOD_DEFAULT: u8 = 0x01;

/// Driver errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Communication error with the device
    Bus(E),
    /// Invalid chip identification value (contains the actual value read)
    InvalidDevice(u8),
    /// Control registers hold an encoding the driver does not know
    InvalidConfig,
    /// A bus operation kept failing until the retry policy gave up
    RetriesExhausted {
        /// Number of attempts made
        attempts: u32,
        /// Error reported by the final attempt
        last: E,
    },
    /// The data-ready flag never appeared within the polling budget
    DataNotReady {
        /// Number of status polls made
        polls: u32,
    },
    /// Writing formatted output to the caller's sink failed
    Output,
}

impl<E> From<E> for Error<E> {
    fn from(error: E) -> Self {
        Self::Bus(error)
    }
}
