//! High-level driver API for the QMC5883L
//!
//! This module provides a user-friendly interface to the QMC5883L compass,
//! handling device identification, configuration, data-ready polling and
//! hard-iron calibration.
//!
//! Writes go through the driver's [`RetryPolicy`]; sample acquisition goes
//! through its [`SamplingPolicy`]. Both are bounded, so no call can hang on a
//! dead bus.

use core::fmt::Write;

use device_driver::RegisterInterface;

use crate::calibration::{CalibratedSample, CalibrationModel, HardIronEstimator};
use crate::config::{QmcConfig, SoftReset, StatusFlags};
use crate::registers::Qmc5883l as RegisterDevice;
use crate::registers::map;
use crate::retry::RetryPolicy;
use crate::sampling::{RawSample, Reading, SampleSource, SamplingPolicy};
use crate::{CHIP_ID_VALUE, Error, SET_RESET_PERIOD_DEFAULT};

/// Time the device needs after a soft reset before it accepts writes
const SOFT_RESET_DELAY_MS: u32 = 10;

/// Spacing between calibration samples
const CALIBRATION_SAMPLE_INTERVAL_MS: u32 = 10;

/// Temperature sensor sensitivity (the offset is not factory-trimmed)
pub const TEMPERATURE_LSB_PER_CELSIUS: f32 = 100.0;

/// Main driver for the QMC5883L
pub struct Qmc5883lDriver<I> {
    device: RegisterDevice<I>,
    config: QmcConfig,
    sampling: SamplingPolicy,
    retry: RetryPolicy,
}

impl<I> Qmc5883lDriver<I>
where
    I: RegisterInterface<AddressType = u8>,
{
    /// Create a new QMC5883L driver instance
    ///
    /// This verifies the chip identification register but does not touch the
    /// device configuration. Call [`init`](Self::init) and
    /// [`configure`](Self::configure) after construction.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Communication with the device fails
    /// - The chip id register contains something other than 0xFF
    pub fn new(interface: I) -> Result<Self, Error<I::Error>> {
        Self::with_policies(interface, SamplingPolicy::default(), RetryPolicy::default())
    }

    /// Create a driver with explicit sampling and retry policies
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn with_policies(
        interface: I,
        sampling: SamplingPolicy,
        retry: RetryPolicy,
    ) -> Result<Self, Error<I::Error>> {
        let mut driver = Self {
            device: RegisterDevice::new(interface),
            config: QmcConfig::default(),
            sampling,
            retry,
        };

        let chip_id = driver.read_chip_id()?;
        if chip_id != CHIP_ID_VALUE {
            #[cfg(feature = "defmt")]
            defmt::warn!("qmc5883l: unexpected chip id {=u8:#x}", chip_id);

            return Err(Error::InvalidDevice(chip_id));
        }

        Ok(driver)
    }

    /// Read the chip identification register
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn read_chip_id(&mut self) -> Result<u8, Error<I::Error>> {
        Ok(self.device.chip_id().read()?.chip_id())
    }

    /// Initialize the device
    ///
    /// Performs a soft reset, waits for the device to come back and programs the
    /// SET/RESET period register with the datasheet's recommended value. The
    /// device is left in standby with default control registers; follow up with
    /// [`configure`](Self::configure).
    ///
    /// # Errors
    ///
    /// Returns [`Error::RetriesExhausted`] if a write kept failing.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let mut compass = Qmc5883lDriver::new(interface)?;
    /// compass.init(&mut delay)?;
    /// compass.configure(QmcConfig::default(), &mut delay)?;
    /// ```
    pub fn init<D>(&mut self, delay: &mut D) -> Result<(), Error<I::Error>>
    where
        D: embedded_hal::delay::DelayNs,
    {
        self.soft_reset(delay)?;
        self.config = QmcConfig::power_on();

        #[cfg(feature = "defmt")]
        defmt::debug!("qmc5883l: initialized");

        Ok(())
    }

    /// Apply a configuration
    ///
    /// A requested soft reset runs first, exactly as in [`init`](Self::init), and
    /// the remaining fields are written afterwards, CR2 before CR1. The stored
    /// configuration therefore never has `soft_reset` set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RetriesExhausted`] if a write kept failing. The stored
    /// configuration is only updated once all writes went through.
    pub fn configure<D>(
        &mut self,
        mut config: QmcConfig,
        delay: &mut D,
    ) -> Result<(), Error<I::Error>>
    where
        D: embedded_hal::delay::DelayNs,
    {
        if config.soft_reset == SoftReset::Enabled {
            self.soft_reset(delay)?;
            config.soft_reset = SoftReset::Disabled;
        }

        let (cr1, cr2) = config.encode();
        self.write_with_retry(map::CONTROL_2, cr2, delay)?;
        self.write_with_retry(map::CONTROL_1, cr1, delay)?;
        self.config = config;

        #[cfg(feature = "defmt")]
        defmt::debug!("qmc5883l: configured cr1={=u8:#x} cr2={=u8:#x}", cr1, cr2);

        Ok(())
    }

    /// Last configuration applied through this driver
    #[must_use]
    pub const fn config(&self) -> &QmcConfig {
        &self.config
    }

    /// Read CR1/CR2 back from the device and decode them
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the registers hold a reserved mode or
    /// range encoding, or a bus error if the read failed.
    pub fn read_config(&mut self) -> Result<QmcConfig, Error<I::Error>> {
        let mut buffer = [0u8; 2];
        self.device
            .interface
            .read_register(map::CONTROL_1, 16, &mut buffer)?;

        QmcConfig::decode(buffer[0], buffer[1]).ok_or(Error::InvalidConfig)
    }

    /// Sampling policy used by [`read_sample`](Self::read_sample)
    #[must_use]
    pub const fn sampling_policy(&self) -> &SamplingPolicy {
        &self.sampling
    }

    /// Replace the sampling policy
    pub const fn set_sampling_policy(&mut self, policy: SamplingPolicy) {
        self.sampling = policy;
    }

    /// Retry policy used for register writes
    #[must_use]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Replace the retry policy
    pub const fn set_retry_policy(&mut self, policy: RetryPolicy) {
        self.retry = policy;
    }

    /// Read and decode the status register once
    ///
    /// Note that reading the data registers is what clears DRDY, not this.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn read_status(&mut self) -> Result<StatusFlags, Error<I::Error>> {
        let mut status = [0u8];
        self.device
            .interface
            .read_register(map::STATUS, 8, &mut status)?;
        Ok(StatusFlags::from_bits(status[0]))
    }

    /// Wait for the next sample and read it
    ///
    /// # Errors
    ///
    /// Returns [`Error::DataNotReady`] if no sample showed up within the sampling
    /// policy's poll budget.
    pub fn read_sample<D>(&mut self, delay: &mut D) -> Result<Reading, Error<I::Error>>
    where
        D: embedded_hal::delay::DelayNs,
    {
        let policy = self.sampling;
        policy.acquire(&mut DataRegisters(&mut self.device), delay)
    }

    /// Wait for the next sample and apply `model` to it
    ///
    /// # Errors
    ///
    /// Same as [`read_sample`](Self::read_sample).
    pub fn read_calibrated<D>(
        &mut self,
        model: &CalibrationModel,
        delay: &mut D,
    ) -> Result<CalibratedSample, Error<I::Error>>
    where
        D: embedded_hal::delay::DelayNs,
    {
        let reading = self.read_sample(delay)?;
        Ok(model.apply(&reading.sample))
    }

    /// Read the compass heading in degrees
    ///
    /// Returns angle in degrees in `[0, 360)`, assuming the sensor is level:
    /// - 0° = North
    /// - 90° = East
    /// - 180° = South
    /// - 270° = West
    ///
    /// # Errors
    ///
    /// Same as [`read_sample`](Self::read_sample).
    pub fn read_heading<D>(
        &mut self,
        model: &CalibrationModel,
        delay: &mut D,
    ) -> Result<f32, Error<I::Error>>
    where
        D: embedded_hal::delay::DelayNs,
    {
        Ok(self.read_calibrated(model, delay)?.heading_degrees())
    }

    /// Perform hard-iron calibration
    ///
    /// Collects `num_samples` samples while the device is rotated in all
    /// directions, then stores the midpoint of each axis' range into `model`'s
    /// offsets. Scale factors are left untouched.
    ///
    /// Returns the offsets before truncation to whole counts.
    ///
    /// # Errors
    ///
    /// Returns an error if any sample could not be read. `model` is unchanged
    /// in that case.
    pub fn calibrate_hard_iron<D>(
        &mut self,
        model: &mut CalibrationModel,
        num_samples: u32,
        delay: &mut D,
    ) -> Result<[f32; 3], Error<I::Error>>
    where
        D: embedded_hal::delay::DelayNs,
    {
        let mut estimator = HardIronEstimator::new();

        for _ in 0..num_samples {
            let reading = self.read_sample(delay)?;
            estimator.update(&reading.sample);
            delay.delay_ms(CALIBRATION_SAMPLE_INTERVAL_MS);
        }

        let offsets = estimator.offsets();
        model.set_offsets(offsets);

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "qmc5883l: hard-iron offsets x={} y={} z={}",
            offsets[0],
            offsets[1],
            offsets[2]
        );

        Ok(offsets)
    }

    /// Stream raw samples for offline calibration fitting
    ///
    /// Writes one line per sample, `"<x> <y> <z>\n"`, as signed decimal counts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Output`] if `out` rejected a write, or the sampling error
    /// if a sample could not be read.
    pub fn dump_calibration_data<W, D>(
        &mut self,
        num_samples: u32,
        out: &mut W,
        delay: &mut D,
    ) -> Result<(), Error<I::Error>>
    where
        W: Write,
        D: embedded_hal::delay::DelayNs,
    {
        for _ in 0..num_samples {
            let RawSample { x, y, z } = self.read_sample(delay)?.sample;
            writeln!(out, "{x} {y} {z}").map_err(|_| Error::Output)?;
        }
        Ok(())
    }

    /// Read the raw temperature sensor output
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn read_temperature(&mut self) -> Result<i16, Error<I::Error>> {
        let mut buffer = [0u8; 2];
        self.device
            .interface
            .read_register(map::TOUT_LSB, 16, &mut buffer)?;

        Ok(i16::from_le_bytes(buffer))
    }

    /// Consume the driver and return the interface
    pub fn release(self) -> I {
        self.device.interface
    }

    /// Soft reset through CR2, wait for the device, then restore the SET/RESET period
    ///
    /// The reset clears every control register, the period register included.
    fn soft_reset<D>(&mut self, delay: &mut D) -> Result<(), Error<I::Error>>
    where
        D: embedded_hal::delay::DelayNs,
    {
        let retry = self.retry;
        let device = &mut self.device;

        retry.run(delay, || {
            device.control_2().write(|w| {
                w.set_soft_rst(true);
            })
        })?;

        delay.delay_ms(SOFT_RESET_DELAY_MS);

        retry.run(delay, || {
            device.set_reset_period().write(|w| {
                w.set_period(SET_RESET_PERIOD_DEFAULT);
            })
        })?;

        Ok(())
    }

    fn write_with_retry<D>(
        &mut self,
        register: u8,
        value: u8,
        delay: &mut D,
    ) -> Result<(), Error<I::Error>>
    where
        D: embedded_hal::delay::DelayNs,
    {
        let retry = self.retry;
        let interface = &mut self.device.interface;
        retry.run(delay, || interface.write_register(register, 8, &[value]))
    }
}

/// Temperature difference in °C between two raw readings
///
/// The sensor's absolute offset is not calibrated, only its slope, so this is
/// meaningful for relative changes only.
#[must_use]
pub fn temperature_delta_celsius(from: i16, to: i16) -> f32 {
    (i32::from(to) - i32::from(from)) as f32 / TEMPERATURE_LSB_PER_CELSIUS
}

/// Status and data registers of a device, as seen by the sampling loop
struct DataRegisters<'a, I>(&'a mut RegisterDevice<I>);

impl<I> SampleSource for DataRegisters<'_, I>
where
    I: RegisterInterface<AddressType = u8>,
{
    type Error = I::Error;

    fn read_status(&mut self) -> Result<u8, Self::Error> {
        let mut status = [0u8];
        self.0.interface.read_register(map::STATUS, 8, &mut status)?;
        Ok(status[0])
    }

    fn read_data(&mut self) -> Result<[u8; map::DATA_LEN], Self::Error> {
        let mut data = [0u8; map::DATA_LEN];
        self.0
            .interface
            .read_register(map::DATA_X_LSB, 48, &mut data)?;
        Ok(data)
    }
}
