use crate::bme280::Bme280;
use crate::hw_def::Bme280Addr;
use crate::sht2x::Sht2x;
use crate::types::*;
use crate::{Error, TempHumSensor};

use embedded_hal::{delay::DelayNs, i2c::I2c};

#[cfg(feature = "defmt")]
use defmt::{debug, warn};
#[cfg(feature = "log")]
use log::{debug, warn};

/// BME280-backed sensor handle at address 0x76
#[derive(Debug)]
pub struct Bme280Sensor<I2C, Delay> {
    bme: Bme280<I2C, Delay>,
}

impl<I2C, Delay, E> Bme280Sensor<I2C, Delay>
where
    I2C: I2c<Error = E>,
    Delay: DelayNs,
{
    /// Establish communication with the BME280 and return a ready handle
    ///
    /// Pass `&mut i2c` (or a bus-sharing device) to keep ownership of the bus; the handle then
    /// borrows it for its whole lifetime.
    pub fn start_comms(i2c: I2C, delay: Delay) -> Result<Self, Error<E>> {
        let mut bme = Bme280::new(i2c, delay, Bme280Addr::Primary);
        bme.begin()?;
        debug!("{} started", SensorType::Bme280.description());
        Ok(Self { bme })
    }

    /// Pressure in pascal from the last measurement
    pub fn pressure(&self) -> f32 {
        self.bme.read_pressure()
    }

    /// Underlying driver, for settings this handle does not expose
    pub fn driver(&mut self) -> &mut Bme280<I2C, Delay> {
        &mut self.bme
    }

    /// Release the bus and delay, consuming the handle
    pub fn release(self) -> (I2C, Delay) {
        self.bme.release()
    }
}

impl<I2C, Delay, E> TempHumSensor for Bme280Sensor<I2C, Delay>
where
    I2C: I2c<Error = E>,
    Delay: DelayNs,
{
    type Error = Error<E>;

    fn configure(&mut self) -> Result<(), Self::Error> {
        self.bme.set_sampling(SamplingConfig::weather_station())
    }

    fn take_measurement(&mut self) -> Result<(), Self::Error> {
        self.bme.take_forced_measurement()
    }

    fn temperature(&self) -> f32 {
        self.bme.read_temperature()
    }

    fn humidity(&self) -> f32 {
        self.bme.read_humidity()
    }

    fn sensor_type(&self) -> SensorType {
        SensorType::Bme280
    }
}

/// SHT21-backed sensor handle at address 0x40
#[derive(Debug)]
pub struct Sht21Sensor<I2C, Delay> {
    sht: Sht2x<I2C, Delay>,
}

impl<I2C, Delay, E> Sht21Sensor<I2C, Delay>
where
    I2C: I2c<Error = E>,
    Delay: DelayNs,
{
    /// Establish communication with the SHT21 and return a ready handle
    ///
    /// Pass `&mut i2c` (or a bus-sharing device) to keep ownership of the bus; the handle then
    /// borrows it for its whole lifetime.
    pub fn start_comms(i2c: I2C, delay: Delay) -> Result<Self, Error<E>> {
        let mut sht = Sht2x::new(i2c, delay);
        sht.begin()?;
        debug!("{} started", SensorType::Sht21.description());
        Ok(Self { sht })
    }

    /// Underlying driver, for settings this handle does not expose
    pub fn driver(&mut self) -> &mut Sht2x<I2C, Delay> {
        &mut self.sht
    }

    /// Release the bus and delay, consuming the handle
    pub fn release(self) -> (I2C, Delay) {
        self.sht.release()
    }
}

impl<I2C, Delay, E> TempHumSensor for Sht21Sensor<I2C, Delay>
where
    I2C: I2c<Error = E>,
    Delay: DelayNs,
{
    type Error = Error<E>;

    /// Checks the sensor answers, then reads it. When the check fails the read is skipped and
    /// [`Error::NotConnected`] is returned. Failures are logged and leave the previous readings
    /// in place.
    fn take_measurement(&mut self) -> Result<(), Self::Error> {
        if !self.sht.is_connected() {
            warn!("SHT sensor is not connected!");
            return Err(Error::NotConnected);
        }
        if let Err(e) = self.sht.read() {
            warn!("SHT read failure");
            return Err(e);
        }
        Ok(())
    }

    fn temperature(&self) -> f32 {
        self.sht.get_temperature()
    }

    fn humidity(&self) -> f32 {
        self.sht.get_humidity()
    }

    fn sensor_type(&self) -> SensorType {
        SensorType::Sht21
    }
}

/// Sensor handle for firmware that picks the chip at init time
#[derive(Debug)]
pub enum AnySensor<I2C, Delay> {
    /// BME280 fitted
    Bme280(Bme280Sensor<I2C, Delay>),
    /// SHT21 fitted
    Sht21(Sht21Sensor<I2C, Delay>),
}

impl<I2C, Delay, E> AnySensor<I2C, Delay>
where
    I2C: I2c<Error = E>,
    Delay: DelayNs,
{
    /// Establish communication with the given kind of sensor
    pub fn start_comms(sensor_type: SensorType, i2c: I2C, delay: Delay) -> Result<Self, Error<E>> {
        Ok(match sensor_type {
            SensorType::Bme280 => Self::Bme280(Bme280Sensor::start_comms(i2c, delay)?),
            SensorType::Sht21 => Self::Sht21(Sht21Sensor::start_comms(i2c, delay)?),
        })
    }

    /// Release the bus and delay, consuming the handle
    pub fn release(self) -> (I2C, Delay) {
        match self {
            Self::Bme280(dev) => dev.release(),
            Self::Sht21(dev) => dev.release(),
        }
    }
}

impl<I2C, Delay, E> TempHumSensor for AnySensor<I2C, Delay>
where
    I2C: I2c<Error = E>,
    Delay: DelayNs,
{
    type Error = Error<E>;

    fn configure(&mut self) -> Result<(), Self::Error> {
        match self {
            Self::Bme280(dev) => dev.configure(),
            Self::Sht21(dev) => dev.configure(),
        }
    }

    fn take_measurement(&mut self) -> Result<(), Self::Error> {
        match self {
            Self::Bme280(dev) => dev.take_measurement(),
            Self::Sht21(dev) => dev.take_measurement(),
        }
    }

    fn temperature(&self) -> f32 {
        match self {
            Self::Bme280(dev) => dev.temperature(),
            Self::Sht21(dev) => dev.temperature(),
        }
    }

    fn humidity(&self) -> f32 {
        match self {
            Self::Bme280(dev) => dev.humidity(),
            Self::Sht21(dev) => dev.humidity(),
        }
    }

    fn sensor_type(&self) -> SensorType {
        match self {
            Self::Bme280(dev) => dev.sensor_type(),
            Self::Sht21(dev) => dev.sensor_type(),
        }
    }
}
