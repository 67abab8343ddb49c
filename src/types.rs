use crate::hw_def::SHT21_ADDR;

use core::fmt;

#[cfg(feature="defmt")]
use defmt::Format;

/// Supported sensor chips
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SensorType {
    /// Bosch BME280 pressure, humidity and temperature sensor
    Bme280,
    /// Sensirion SHT21 humidity and temperature sensor
    Sht21,
}
impl SensorType {
    /// Human-readable label of the sensor
    pub fn description(&self) -> &'static str {
        match self {
            Self::Bme280 => "BME280 Sensor",
            Self::Sht21 => "SHT21 Sensor",
        }
    }
    /// Bus address the sensor is driven at
    pub fn address(&self) -> u8 {
        match self {
            Self::Bme280 => crate::hw_def::Bme280Addr::Primary.as_u8(),
            Self::Sht21 => SHT21_ADDR,
        }
    }
}
impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// BME280 power mode
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mode {
    /// no conversions, lowest power
    Sleep,
    /// one conversion per trigger, then back to sleep
    Forced,
    /// self-timed conversions separated by the standby time
    Normal,
}
impl Mode {
    pub(crate) fn bits(&self) -> u8 {
        match self {
            Self::Sleep => 0b00,
            Self::Forced => 0b01,
            Self::Normal => 0b11,
        }
    }
}

/// BME280 per-channel oversampling
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Oversampling {
    /// channel disabled, reads back as NaN
    Skipped,
    /// one conversion
    X1,
    /// two conversions averaged
    X2,
    /// four conversions averaged
    X4,
    /// eight conversions averaged
    X8,
    /// sixteen conversions averaged
    X16,
}
impl Oversampling {
    pub(crate) fn bits(&self) -> u8 {
        match self {
            Self::Skipped => 0b000,
            Self::X1 => 0b001,
            Self::X2 => 0b010,
            Self::X4 => 0b011,
            Self::X8 => 0b100,
            Self::X16 => 0b101,
        }
    }
}

/// BME280 IIR filter coefficient
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Filter {
    /// filter off
    Off,
    /// coefficient 2
    X2,
    /// coefficient 4
    X4,
    /// coefficient 8
    X8,
    /// coefficient 16
    X16,
}
impl Filter {
    pub(crate) fn bits(&self) -> u8 {
        match self {
            Self::Off => 0b000,
            Self::X2 => 0b001,
            Self::X4 => 0b010,
            Self::X8 => 0b011,
            Self::X16 => 0b100,
        }
    }
}

/// BME280 standby time between conversions in normal mode
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Standby {
    /// 0.5 ms
    Ms0_5,
    /// 62.5 ms
    Ms62_5,
    /// 125 ms
    Ms125,
    /// 250 ms
    Ms250,
    /// 500 ms
    Ms500,
    /// 1000 ms
    Ms1000,
    /// 10 ms
    Ms10,
    /// 20 ms
    Ms20,
}
impl Standby {
    pub(crate) fn bits(&self) -> u8 {
        match self {
            Self::Ms0_5 => 0b000,
            Self::Ms62_5 => 0b001,
            Self::Ms125 => 0b010,
            Self::Ms250 => 0b011,
            Self::Ms500 => 0b100,
            Self::Ms1000 => 0b101,
            Self::Ms10 => 0b110,
            Self::Ms20 => 0b111,
        }
    }
}

/// Complete BME280 sampling setup, as written by `Bme280::set_sampling()`
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SamplingConfig {
    /// power mode
    pub mode: Mode,
    /// temperature oversampling
    pub temperature: Oversampling,
    /// pressure oversampling
    pub pressure: Oversampling,
    /// humidity oversampling
    pub humidity: Oversampling,
    /// IIR filter
    pub filter: Filter,
    /// standby time, only used in normal mode
    pub standby: Standby,
}
impl Default for SamplingConfig {
    /// Continuous, highest-resolution sampling applied by `Bme280::begin()`
    fn default() -> Self {
        Self {
            mode: Mode::Normal,
            temperature: Oversampling::X16,
            pressure: Oversampling::X16,
            humidity: Oversampling::X16,
            filter: Filter::Off,
            standby: Standby::Ms0_5,
        }
    }
}
impl SamplingConfig {
    /// "Weather monitoring" profile from the datasheet: forced mode, single
    /// samples, no filter. Keeps self-heating and supply current at a minimum for
    /// slowly changing ambient readings.
    pub fn weather_station() -> Self {
        Self {
            mode: Mode::Forced,
            temperature: Oversampling::X1,
            pressure: Oversampling::X1,
            humidity: Oversampling::X1,
            filter: Filter::Off,
            standby: Standby::Ms0_5,
        }
    }
    pub(crate) fn ctrl_hum(&self) -> u8 {
        self.humidity.bits()
    }
    pub(crate) fn ctrl_meas(&self) -> u8 {
        self.temperature.bits() << 5 | self.pressure.bits() << 2 | self.mode.bits()
    }
    pub(crate) fn config(&self) -> u8 {
        self.standby.bits() << 5 | self.filter.bits() << 2
    }
}
