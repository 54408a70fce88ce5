//! Status-driven sample acquisition
//!
//! The QMC5883L raises DRDY in its status register once a new measurement sits in
//! the six data registers. Acquisition polls the status register until DRDY shows up,
//! then drains the data registers with one burst read:
//!
//! ```text
//!   Polling --(status read fails / DRDY clear)--> wait poll interval --> Polling
//!   Polling --(DRDY set)--> Draining --(burst ok)--> done
//!                           Draining --(burst fails)--> wait poll interval --> Polling
//! ```
//!
//! DOR and OVL do not stop acquisition. They travel with the decoded sample in
//! [`Reading`] so the caller can decide whether to trust it.

use crate::Error;
use crate::config::{OutputDataRate, StatusFlags};
use crate::registers::map;

/// Raw magnetometer sample (signed 16-bit counts per axis)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawSample {
    /// X-axis magnetic field (raw)
    pub x: i16,
    /// Y-axis magnetic field (raw)
    pub y: i16,
    /// Z-axis magnetic field (raw)
    pub z: i16,
}

impl RawSample {
    /// Decode the six data registers, X/Y/Z each as a little-endian pair
    #[must_use]
    pub const fn from_le_bytes(data: [u8; map::DATA_LEN]) -> Self {
        Self {
            x: i16::from_le_bytes([data[0], data[1]]),
            y: i16::from_le_bytes([data[2], data[3]]),
            z: i16::from_le_bytes([data[4], data[5]]),
        }
    }

    /// Axis values in X, Y, Z order
    #[must_use]
    pub const fn axes(&self) -> [i16; 3] {
        [self.x, self.y, self.z]
    }
}

/// Advisory condition reported alongside a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleWarning {
    /// DOR: the device dropped an earlier sample that was never read
    DataOverrun,
    /// OVL: at least one axis saturated
    DataOverflow,
}

/// A decoded sample and the status flags seen on the poll that delivered it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reading {
    /// Decoded sample
    pub sample: RawSample,
    /// Full flag set of the data-ready status read
    pub status: StatusFlags,
}

impl Reading {
    /// Single warning code for this reading
    ///
    /// Overrun is checked first and overflow second, so when both flags are set the
    /// overflow warning is the one reported. Use [`status`](Self::status) to see both.
    #[must_use]
    pub const fn warning(&self) -> Option<SampleWarning> {
        let mut warning = None;
        if self.status.data_overrun {
            warning = Some(SampleWarning::DataOverrun);
        }
        if self.status.overflow {
            warning = Some(SampleWarning::DataOverflow);
        }
        warning
    }
}

/// Where acquisition reads the status and data registers from
pub trait SampleSource {
    /// Error reported by the underlying bus
    type Error;

    /// Read the raw status register
    ///
    /// # Errors
    ///
    /// Returns the bus error if the read failed.
    fn read_status(&mut self) -> Result<u8, Self::Error>;

    /// Burst-read the six data registers starting at X LSB
    ///
    /// # Errors
    ///
    /// Returns the bus error if the read failed.
    fn read_data(&mut self) -> Result<[u8; map::DATA_LEN], Self::Error>;
}

/// Timing and budget of the polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SamplingPolicy {
    /// Wait between two status polls in milliseconds
    pub poll_interval_ms: u32,
    /// Status polls allowed before giving up
    pub max_polls: u32,
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2,
            max_polls: 500,
        }
    }
}

impl SamplingPolicy {
    /// Polls per output data period
    const POLLS_PER_PERIOD: u32 = 4;

    /// Periods to wait for DRDY before giving up
    const PERIODS_BUDGET: u32 = 10;

    /// Derive the poll interval and budget from the configured output data rate
    #[must_use]
    pub const fn for_rate(rate: OutputDataRate) -> Self {
        let interval = rate.period_ms() / Self::POLLS_PER_PERIOD;
        Self {
            poll_interval_ms: if interval == 0 { 1 } else { interval },
            max_polls: Self::POLLS_PER_PERIOD * Self::PERIODS_BUDGET,
        }
    }

    /// Poll `source` until a sample is ready, then read and decode it
    ///
    /// Failed status reads and failed burst reads count against the poll budget and
    /// are otherwise ignored: DRDY stays set until the data registers are read, so the
    /// next poll picks the same sample up again.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DataNotReady`] if no sample was delivered within
    /// [`max_polls`](Self::max_polls) polls.
    pub fn acquire<S, D>(&self, source: &mut S, delay: &mut D) -> Result<Reading, Error<S::Error>>
    where
        S: SampleSource,
        D: embedded_hal::delay::DelayNs,
    {
        let budget = self.max_polls.max(1);

        for poll in 1..=budget {
            if let Ok(status) = source.read_status() {
                let status = StatusFlags::from_bits(status);

                if status.data_ready {
                    if let Ok(data) = source.read_data() {
                        return Ok(Reading {
                            sample: RawSample::from_le_bytes(data),
                            status,
                        });
                    }
                }
            }

            if poll < budget {
                delay.delay_ms(self.poll_interval_ms);
            }
        }

        #[cfg(feature = "defmt")]
        defmt::warn!("sampling: no data ready after {} polls", budget);

        Err(Error::DataNotReady { polls: budget })
    }
}
