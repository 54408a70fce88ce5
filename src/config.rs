//! Control and status register codec
//!
//! The QMC5883L is configured through two control registers and reports through one
//! status register:
//!
//! | Register | Bits 7-6 | Bits 5-4 | Bits 3-2 | Bits 1-0 |
//! |----------|----------|----------|----------|----------|
//! | CR1 (0x09) | OSR | RNG | ODR | MODE |
//!
//! | Register | Bit 7 | Bit 6 | Bit 0 |
//! |----------|-------|-------|-------|
//! | CR2 (0x0A) | SOFT_RST | ROL_PNT | INT_ENB |
//!
//! | Register | Bit 2 | Bit 1 | Bit 0 |
//! |----------|-------|-------|-------|
//! | STATUS (0x06) | DOR | OVL | DRDY |
//!
//! Everything here is pure bit manipulation on register bytes; no bus access happens
//! in this module.

/// A bitfield inside an 8-bit register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Field {
    /// Bits occupied by the field, in register position
    pub mask: u8,
    /// Position of the field's least significant bit
    pub shift: u8,
}

impl Field {
    /// Describe a field by mask and shift
    pub const fn new(mask: u8, shift: u8) -> Self {
        Self { mask, shift }
    }

    /// Clear the field in `register`, then OR in `value` shifted into place
    ///
    /// Bits of `value` that do not fit the field are dropped, so neighbouring fields
    /// are never disturbed.
    pub fn set(self, value: u8, register: &mut u8) {
        *register = (*register & !self.mask) | ((value << self.shift) & self.mask);
    }

    /// Extract the field from `register`, shifted down to bit 0
    #[must_use]
    pub const fn get(self, register: u8) -> u8 {
        (register & self.mask) >> self.shift
    }
}

/// Field layout of every control and status bit
pub mod fields {
    use super::Field;

    /// CR1 oversampling ratio
    pub const CR1_OSR: Field = Field::new(0xC0, 6);
    /// CR1 full-scale range
    pub const CR1_RNG: Field = Field::new(0x30, 4);
    /// CR1 output data rate
    pub const CR1_ODR: Field = Field::new(0x0C, 2);
    /// CR1 operating mode
    pub const CR1_MODE: Field = Field::new(0x03, 0);

    /// CR2 soft reset
    pub const CR2_SOFT_RST: Field = Field::new(0x80, 7);
    /// CR2 register pointer roll-over
    pub const CR2_ROL_PNT: Field = Field::new(0x40, 6);
    /// CR2 interrupt pin control
    pub const CR2_INT_ENB: Field = Field::new(0x01, 0);

    /// STATUS data overrun (read-only)
    pub const SR_DOR: Field = Field::new(0x04, 2);
    /// STATUS measurement overflow (read-only)
    pub const SR_OVL: Field = Field::new(0x02, 1);
    /// STATUS data ready (read-only)
    pub const SR_DRDY: Field = Field::new(0x01, 0);
}

/// A typed option stored in a control register field
pub trait RegisterField: Sized + Copy {
    /// Where the option lives
    const FIELD: Field;

    /// Raw field value
    fn bits(self) -> u8;

    /// Parse a raw field value, `None` for reserved encodings
    fn from_bits(bits: u8) -> Option<Self>;
}

/// Store `option` into its field of `register`
pub fn set_field<F: RegisterField>(option: F, register: &mut u8) {
    F::FIELD.set(option.bits(), register);
}

/// Read the option stored in `register`
///
/// Returns `None` if the field holds a reserved encoding.
#[must_use]
pub fn get_field<F: RegisterField>(register: u8) -> Option<F> {
    F::from_bits(F::FIELD.get(register))
}

macro_rules! register_field {
    ($ty:ident, $field:expr, { $($variant:ident = $bits:literal),+ $(,)? }) => {
        impl RegisterField for $ty {
            const FIELD: Field = $field;

            fn bits(self) -> u8 {
                self as u8
            }

            fn from_bits(bits: u8) -> Option<Self> {
                match bits {
                    $($bits => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

/// Operating mode (CR1 bits 1-0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Standby, no measurements
    Standby = 0b00,
    /// Continuous measurement at the output data rate
    #[default]
    Continuous = 0b01,
}

register_field!(Mode, fields::CR1_MODE, { Standby = 0b00, Continuous = 0b01 });

/// Output data rate (CR1 bits 3-2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputDataRate {
    /// 10 Hz
    Hz10 = 0b00,
    /// 50 Hz
    Hz50 = 0b01,
    /// 100 Hz
    Hz100 = 0b10,
    /// 200 Hz
    #[default]
    Hz200 = 0b11,
}

register_field!(OutputDataRate, fields::CR1_ODR, {
    Hz10 = 0b00,
    Hz50 = 0b01,
    Hz100 = 0b10,
    Hz200 = 0b11,
});

impl OutputDataRate {
    /// Sample rate in Hz
    #[must_use]
    pub const fn hz(self) -> u32 {
        match self {
            Self::Hz10 => 10,
            Self::Hz50 => 50,
            Self::Hz100 => 100,
            Self::Hz200 => 200,
        }
    }

    /// Time between two samples in milliseconds
    #[must_use]
    pub const fn period_ms(self) -> u32 {
        1000 / self.hz()
    }
}

/// Full-scale range (CR1 bits 5-4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Range {
    /// ±2 gauss
    Gauss2 = 0b00,
    /// ±8 gauss
    #[default]
    Gauss8 = 0b01,
}

register_field!(Range, fields::CR1_RNG, { Gauss2 = 0b00, Gauss8 = 0b01 });

impl Range {
    /// Sensitivity in LSB per gauss
    #[must_use]
    pub const fn lsb_per_gauss(self) -> f32 {
        match self {
            Self::Gauss2 => 12_000.0,
            Self::Gauss8 => 3_000.0,
        }
    }
}

/// Over-sampling ratio (CR1 bits 7-6)
///
/// Higher ratios lower the noise floor at the cost of power.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OversamplingRatio {
    /// 512 samples
    #[default]
    Osr512 = 0b00,
    /// 256 samples
    Osr256 = 0b01,
    /// 128 samples
    Osr128 = 0b10,
    /// 64 samples
    Osr64 = 0b11,
}

register_field!(OversamplingRatio, fields::CR1_OSR, {
    Osr512 = 0b00,
    Osr256 = 0b01,
    Osr128 = 0b10,
    Osr64 = 0b11,
});

/// Soft reset request (CR2 bit 7)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SoftReset {
    /// No reset
    #[default]
    Disabled = 0,
    /// Restore all registers to their defaults
    Enabled = 1,
}

register_field!(SoftReset, fields::CR2_SOFT_RST, { Disabled = 0, Enabled = 1 });

/// Register pointer roll-over (CR2 bit 6)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PointerRollover {
    /// Pointer keeps incrementing across the whole register file
    #[default]
    Disabled = 0,
    /// Pointer wraps from the status register (0x06) back to X LSB (0x00)
    Enabled = 1,
}

register_field!(PointerRollover, fields::CR2_ROL_PNT, { Disabled = 0, Enabled = 1 });

/// DRDY interrupt pin (CR2 bit 0, active low: 0 enables the pin)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterruptPin {
    /// Pin signals data ready
    Enabled = 0,
    /// Pin stays idle
    #[default]
    Disabled = 1,
}

register_field!(InterruptPin, fields::CR2_INT_ENB, { Enabled = 0, Disabled = 1 });

/// Sensor configuration held in CR1 and CR2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QmcConfig {
    /// Operating mode
    pub mode: Mode,
    /// Output data rate
    pub output_data_rate: OutputDataRate,
    /// Full-scale range
    pub range: Range,
    /// Over-sampling ratio
    pub oversampling: OversamplingRatio,
    /// Soft reset request
    pub soft_reset: SoftReset,
    /// Register pointer roll-over
    pub pointer_rollover: PointerRollover,
    /// Interrupt pin
    pub interrupt_pin: InterruptPin,
}

impl QmcConfig {
    /// Register contents after power-on or soft reset (CR1 = CR2 = 0)
    #[must_use]
    pub const fn power_on() -> Self {
        Self {
            mode: Mode::Standby,
            output_data_rate: OutputDataRate::Hz10,
            range: Range::Gauss2,
            oversampling: OversamplingRatio::Osr512,
            soft_reset: SoftReset::Disabled,
            pointer_rollover: PointerRollover::Disabled,
            interrupt_pin: InterruptPin::Enabled,
        }
    }

    /// Pack the configuration into `(CR1, CR2)` register values
    #[must_use]
    pub fn encode(&self) -> (u8, u8) {
        let mut cr1 = 0;
        set_field(self.mode, &mut cr1);
        set_field(self.output_data_rate, &mut cr1);
        set_field(self.range, &mut cr1);
        set_field(self.oversampling, &mut cr1);

        let mut cr2 = 0;
        set_field(self.soft_reset, &mut cr2);
        set_field(self.pointer_rollover, &mut cr2);
        set_field(self.interrupt_pin, &mut cr2);

        (cr1, cr2)
    }

    /// Unpack `(CR1, CR2)` register values
    ///
    /// Returns `None` if CR1 holds a reserved mode or range encoding.
    #[must_use]
    pub fn decode(cr1: u8, cr2: u8) -> Option<Self> {
        Some(Self {
            mode: get_field(cr1)?,
            output_data_rate: get_field(cr1)?,
            range: get_field(cr1)?,
            oversampling: get_field(cr1)?,
            soft_reset: get_field(cr2)?,
            pointer_rollover: get_field(cr2)?,
            interrupt_pin: get_field(cr2)?,
        })
    }
}

/// Flags decoded from the status register
///
/// The flags are independent; any combination may be set on a single read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusFlags {
    /// DOR: a sample was skipped because the previous one was not read in time
    pub data_overrun: bool,
    /// OVL: at least one axis saturated
    pub overflow: bool,
    /// DRDY: a new sample is waiting in the data registers
    pub data_ready: bool,
}

impl StatusFlags {
    /// Decode a raw status register value
    #[must_use]
    pub const fn from_bits(status: u8) -> Self {
        Self {
            data_overrun: fields::SR_DOR.get(status) != 0,
            overflow: fields::SR_OVL.get(status) != 0,
            data_ready: fields::SR_DRDY.get(status) != 0,
        }
    }

    /// Re-encode the flags into status register layout
    #[must_use]
    pub fn bits(&self) -> u8 {
        let mut status = 0;
        fields::SR_DOR.set(u8::from(self.data_overrun), &mut status);
        fields::SR_OVL.set(u8::from(self.overflow), &mut status);
        fields::SR_DRDY.set(u8::from(self.data_ready), &mut status);
        status
    }
}
