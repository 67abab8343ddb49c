//! This is a platform-agnostic Rust HAL for reading temperature and relative humidity from one
//! of two interchangeable I²C sensors, the Bosch BME280 and the Sensirion SHT21, using the
//! blocking [`embedded-hal`] traits.
//!
//! [`embedded-hal`]: https://github.com/rust-embedded/embedded-hal/tree/master/embedded-hal
//!
//! Firmware picks one sensor at build or init time and drives it through the [`TempHumSensor`]
//! trait, so the rest of the code does not care which chip is fitted:
//! - Start communications and check the chip is present.
//! - Optionally configure sampling (forced, low-power mode on the BME280; nothing on the SHT21).
//! - Trigger a measurement.
//! - Read back the latest temperature and humidity.
//!
//! The register-level drivers for both chips are available on their own as [`Bme280`] and
//! [`Sht2x`].
//!
//! This crate does not handle:
//! - Sharing one bus between several sensors. Pass `&mut bus` or a bus-sharing device instead.
//! - Retries. Every failure is returned to the caller as-is.
//! - User calibration or unit conversion.
//!
//! ## Features
//!
//! - `crc`: Checks received SHT21 CRC against computed CRC.
//! - `defmt`: Enables logging using the `defmt` framework.
//! - `log`: Enables logging using the `log` framework.
//!
//! ## Supported devices: BME280, SHT21
//!
//! Datasheets:
//!   [BME280](https://www.bosch-sensortec.com/media/boschsensortec/downloads/datasheets/bst-bme280-ds002.pdf)
//!   [SHT21](https://sensirion.com/media/documents/120BBE4C/63500094/Sensirion_Datasheet_Humidity_Sensor_SHT21.pdf)
//!
//! ## Example:
//!
//! ```ignore
//! use temphum::{Bme280Sensor, TempHumSensor};
//!
//! // Platform-specific
//! let mut i2c = /* embedded_hal::i2c::I2c instance */;
//! let delay = /* embedded_hal::delay::DelayNs instance */;
//!
//! // The sensor borrows the bus, so the bus outlives it
//! let mut sensor = Bme280Sensor::start_comms(&mut i2c, delay).unwrap();
//! sensor.configure().unwrap();
//!
//! loop {
//!     sensor.take_measurement().unwrap();
//!     println!("{}: {:0.1} °C, {:3} %RH",
//!         sensor.sensor_type_str(),
//!         sensor.temperature(),
//!         sensor.humidity());
//!
//!     // Platform-specific: sleep a while
//!     sleep_secs(60);
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![no_std]

#[cfg(all(feature = "defmt", feature = "log"))]
compile_error!("Features \"defmt\" and \"log\" are mutually exclusive and cannot be enabled together");

#[cfg(test)]
#[macro_use]
extern crate std;

#[macro_use]
mod logging;

mod bme280;
mod hw_def;
mod sensor;
mod sht2x;
mod types;

pub use crate::{
    bme280::{Bme280, CalibrationData},
    hw_def::{Bme280Addr, SHT21_ADDR},
    sensor::{AnySensor, Bme280Sensor, Sht21Sensor},
    sht2x::Sht2x,
    types::*,
};

use core::fmt;

#[cfg(feature="defmt")]
use defmt::Format;

/// All possible errors in this crate
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug)]
pub enum Error<E> {
    /// I²C communication error
    I2c(E),
    /// Another chip answered at the sensor's address
    WrongChipId(u8),
    /// The sensor did not acknowledge its address
    NotConnected,
    /// The sensor did not finish a conversion or reset in time
    Timeout,
    /// The sensor returned a word that does not match the requested measurement
    InvalidData,
    /// Failure of a checksum from the device was detected
    #[cfg(feature = "crc")]
    CrcMismatch,
}
impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I2c(e) => write!(f, "I2C bus error: {e:?}"),
            Self::WrongChipId(id) => write!(f, "unexpected chip ID 0x{id:02X}"),
            Self::NotConnected => f.write_str("sensor is not connected"),
            Self::Timeout => f.write_str("sensor timed out"),
            Self::InvalidData => f.write_str("sensor returned invalid data"),
            #[cfg(feature = "crc")]
            Self::CrcMismatch => f.write_str("checksum mismatch"),
        }
    }
}
impl<E: fmt::Debug> core::error::Error for Error<E> {}

/// Uniform interface over the supported temperature and humidity sensors
///
/// A handle only exists once communication with the chip has been established, see
/// [`Bme280Sensor::start_comms()`], [`Sht21Sensor::start_comms()`] and
/// [`AnySensor::start_comms()`].
pub trait TempHumSensor {
    /// Error returned by the fallible operations
    type Error;

    /// Apply the sensor's preferred sampling setup. Sensors without one do nothing.
    fn configure(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Take a new reading and latch it for [`temperature()`](Self::temperature) and
    /// [`humidity()`](Self::humidity). Blocks until the conversion is done.
    fn take_measurement(&mut self) -> Result<(), Self::Error>;

    /// Temperature in degrees centigrade from the last successful measurement
    fn temperature(&self) -> f32;

    /// Relative humidity in percent from the last successful measurement
    fn humidity(&self) -> f32;

    /// Which chip backs this handle
    fn sensor_type(&self) -> SensorType;

    /// Human-readable label of the chip backing this handle
    fn sensor_type_str(&self) -> &'static str {
        self.sensor_type().description()
    }
}
