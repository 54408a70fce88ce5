//! Hard-iron calibration and heading
//!
//! Magnetised parts near the sensor add a constant bias to every axis. Rotating the
//! device through all orientations sweeps each axis between a minimum and a maximum
//! that are symmetric around that bias, so the midpoint of the observed range is the
//! offset to subtract.
//!
//! [`CalibrationModel`] holds per-axis offsets and scale factors and is owned by the
//! caller. Offset-only deployments simply keep every scale at 1.0.
//!
//! This corrects additive (hard-iron) bias only. Cross-axis soft-iron distortion is
//! not modelled.

use crate::sampling::RawSample;

/// Compiled-in hard-iron offsets (X, Y, Z) in raw counts
pub const DEFAULT_OFFSETS: [i16; 3] = [54, -193, -31];

/// Compiled-in per-axis scale factors (X, Y, Z), fitted offline
pub const DEFAULT_SCALES: [f32; 3] = [1.03, 1.01, 0.95];

/// Per-axis offset and scale calibration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationModel {
    /// Offset for X-axis (hard-iron bias)
    pub offset_x: i16,
    /// Offset for Y-axis (hard-iron bias)
    pub offset_y: i16,
    /// Offset for Z-axis (hard-iron bias)
    pub offset_z: i16,
    /// Scale factor for X-axis
    pub scale_x: f32,
    /// Scale factor for Y-axis
    pub scale_y: f32,
    /// Scale factor for Z-axis
    pub scale_z: f32,
}

impl Default for CalibrationModel {
    fn default() -> Self {
        Self {
            offset_x: DEFAULT_OFFSETS[0],
            offset_y: DEFAULT_OFFSETS[1],
            offset_z: DEFAULT_OFFSETS[2],
            scale_x: DEFAULT_SCALES[0],
            scale_y: DEFAULT_SCALES[1],
            scale_z: DEFAULT_SCALES[2],
        }
    }
}

impl CalibrationModel {
    /// No correction: zero offsets, unit scale
    #[must_use]
    pub const fn identity() -> Self {
        Self {
            offset_x: 0,
            offset_y: 0,
            offset_z: 0,
            scale_x: 1.0,
            scale_y: 1.0,
            scale_z: 1.0,
        }
    }

    /// Same offsets with every scale reset to 1.0 (offset-only calibration)
    #[must_use]
    pub const fn with_unit_scale(self) -> Self {
        Self {
            scale_x: 1.0,
            scale_y: 1.0,
            scale_z: 1.0,
            ..self
        }
    }

    /// Offsets in X, Y, Z order
    #[must_use]
    pub const fn offsets(&self) -> [i16; 3] {
        [self.offset_x, self.offset_y, self.offset_z]
    }

    /// Replace the offsets, leaving the scale factors untouched
    ///
    /// Fractional offsets are truncated toward zero.
    pub fn set_offsets(&mut self, offsets: [f32; 3]) {
        // `as` truncates toward zero and saturates at the i16 bounds
        self.offset_x = offsets[0] as i16;
        self.offset_y = offsets[1] as i16;
        self.offset_z = offsets[2] as i16;
    }

    /// Apply calibration to a raw sample: `scale * (raw - offset)` per axis
    #[must_use]
    pub fn apply(&self, raw: &RawSample) -> CalibratedSample {
        CalibratedSample {
            x: self.scale_x * (i32::from(raw.x) - i32::from(self.offset_x)) as f32,
            y: self.scale_y * (i32::from(raw.y) - i32::from(self.offset_y)) as f32,
            z: self.scale_z * (i32::from(raw.z) - i32::from(self.offset_z)) as f32,
        }
    }
}

/// Calibrated magnetometer sample in raw-count units
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibratedSample {
    /// X-axis
    pub x: f32,
    /// Y-axis
    pub y: f32,
    /// Z-axis
    pub z: f32,
}

impl CalibratedSample {
    /// Heading in degrees within `[0, 360)`, from `atan2(y, x)`
    ///
    /// Assumes the sensor is level.
    #[must_use]
    pub fn heading_degrees(&self) -> f32 {
        let mut heading_deg = libm::atan2f(self.y, self.x).to_degrees();
        if heading_deg < 0.0 {
            heading_deg += 360.0;
        }
        // -tiny + 360 rounds up to 360 in f32
        if heading_deg >= 360.0 {
            heading_deg -= 360.0;
        }
        heading_deg
    }

    /// Magnitude of the field vector
    #[must_use]
    pub fn magnitude(&self) -> f32 {
        libm::sqrtf(self.x * self.x + self.y * self.y + self.z * self.z)
    }
}

/// Running per-axis min/max over a window of raw samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HardIronEstimator {
    min: [i16; 3],
    max: [i16; 3],
    samples: u32,
}

impl Default for HardIronEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl HardIronEstimator {
    /// Start an empty window
    ///
    /// Both bounds start at ±32767. Any first sample replaces them, except that an
    /// axis stuck at -32768 never lifts its maximum above -32767.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            min: [i16::MAX; 3],
            max: [-i16::MAX; 3],
            samples: 0,
        }
    }

    /// Fold one sample into the window
    pub fn update(&mut self, sample: &RawSample) {
        for (axis, value) in sample.axes().into_iter().enumerate() {
            self.min[axis] = self.min[axis].min(value);
            self.max[axis] = self.max[axis].max(value);
        }
        self.samples = self.samples.saturating_add(1);
    }

    /// Number of samples folded in
    #[must_use]
    pub const fn samples(&self) -> u32 {
        self.samples
    }

    /// Smallest value seen per axis
    #[must_use]
    pub const fn min(&self) -> [i16; 3] {
        self.min
    }

    /// Largest value seen per axis
    #[must_use]
    pub const fn max(&self) -> [i16; 3] {
        self.max
    }

    /// Midpoint of the observed range per axis, `(max + min) / 2`, fraction kept
    #[must_use]
    pub fn offsets(&self) -> [f32; 3] {
        let mut offsets = [0.0; 3];
        for (axis, offset) in offsets.iter_mut().enumerate() {
            let sum = i32::from(self.max[axis]) + i32::from(self.min[axis]);
            *offset = sum as f32 / 2.0;
        }
        offsets
    }
}
