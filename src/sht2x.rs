use crate::hw_def::*;
use crate::Error;

#[cfg(feature = "crc")]
use crc::Crc;
use embedded_hal::{delay::DelayNs, i2c::I2c};

#[cfg(feature = "defmt")]
use defmt::{debug, trace};
#[cfg(feature = "log")]
use log::{debug, trace};

#[cfg(feature = "crc")]
const CRC: Crc<u8> = Crc::<u8>::new(&CRC_8_SHT2X);

/// Which of the two conversions a word belongs to
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Quantity {
    Temperature,
    Humidity,
}
impl Quantity {
    fn command(&self) -> Sht2xCommand {
        match self {
            Self::Temperature => Sht2xCommand::MeasureTempNoHold,
            Self::Humidity => Sht2xCommand::MeasureHumidNoHold,
        }
    }
    fn conversion_ms(&self) -> u32 {
        match self {
            Self::Temperature => SHT2X_TEMP_CONVERSION_MS,
            Self::Humidity => SHT2X_HUMID_CONVERSION_MS,
        }
    }
    fn status_bits(&self) -> u16 {
        match self {
            Self::Temperature => 0,
            Self::Humidity => SHT2X_STATUS_HUMIDITY,
        }
    }
}

fn raw_temp_to_centigrade(raw: u16) -> f32 {
    -46.85 + 175.72 * (raw & !SHT2X_STATUS_MASK) as f32 / 65536.0
}

fn raw_rel_humid_to_percent(raw: u16) -> f32 {
    -6.0 + 125.0 * (raw & !SHT2X_STATUS_MASK) as f32 / 65536.0
}

/// SHT2x (SHT20, SHT21, SHT25) device driver
#[derive(Debug)]
pub struct Sht2x<I2C, Delay> {
    pub(crate) i2c: I2C,
    pub(crate) delay: Delay,
    centigrade: f32,
    humidity_percent: f32,
}

impl<I2C, Delay, E> Sht2x<I2C, Delay>
where
    I2C: I2c<Error = E>,
    Delay: DelayNs,
{
    /// Create a new SHT2x driver instance. Nothing is sent until [`begin()`](Self::begin).
    pub fn new(i2c: I2C, delay: Delay) -> Self {
        Self {
            i2c,
            delay,
            centigrade: 0.0,
            humidity_percent: 0.0,
        }
    }

    /// Release the bus and delay, consuming the driver
    pub fn release(self) -> (I2C, Delay) {
        (self.i2c, self.delay)
    }

    fn command(&mut self, cmd: Sht2xCommand) -> Result<(), Error<E>> {
        trace!("sht2x::command(): cmd={:#x}", cmd.as_u8());
        self.i2c.write(SHT21_ADDR, &[cmd.as_u8()]).map_err(Error::I2c)
    }

    /// Reset the sensor; fails when nothing acknowledges at 0x40
    pub fn begin(&mut self) -> Result<(), Error<E>> {
        self.reset()?;
        debug!("sht2x::begin(): ready at {:#x}", SHT21_ADDR);
        Ok(())
    }

    /// Software reset, back to the power-on user register
    pub fn reset(&mut self) -> Result<(), Error<E>> {
        self.command(Sht2xCommand::SoftReset)?;
        self.delay.delay_ms(SHT2X_RESET_DELAY_MS);
        Ok(())
    }

    /// Whether the sensor answers a user register read. Some HALs reject zero-length writes, so
    /// an address-only probe is not used.
    pub fn is_connected(&mut self) -> bool {
        self.user_register().is_ok()
    }

    fn measure(&mut self, quantity: Quantity) -> Result<u16, Error<E>> {
        self.command(quantity.command())?;
        self.delay.delay_ms(quantity.conversion_ms());

        let mut read_buf = [0u8; 3];
        self.i2c.read(SHT21_ADDR, &mut read_buf).map_err(Error::I2c)?;
        trace!("sht2x::measure(): read {:#x} {:#x} {:#x}", read_buf[0], read_buf[1], read_buf[2]);

        #[cfg(feature = "crc")]
        {
            let crc_expect = CRC.checksum(&read_buf[0..2]);
            if read_buf[2] != crc_expect {
                debug!("sht2x::measure(): crc mismatch, read {:#x} expected {:#x}", read_buf[2], crc_expect);
                return Err(Error::CrcMismatch);
            }
        }

        let raw = u16::from_be_bytes([read_buf[0], read_buf[1]]);
        if raw & SHT2X_STATUS_HUMIDITY != quantity.status_bits() {
            return Err(Error::InvalidData);
        }
        Ok(raw)
    }

    /// Measure temperature then humidity. The cached values only change when both succeed.
    pub fn read(&mut self) -> Result<(), Error<E>> {
        let raw_temp = self.measure(Quantity::Temperature)?;
        let raw_humid = self.measure(Quantity::Humidity)?;
        self.centigrade = raw_temp_to_centigrade(raw_temp);
        self.humidity_percent = raw_rel_humid_to_percent(raw_humid);
        Ok(())
    }

    /// Temperature in degrees centigrade from the last successful read
    pub fn get_temperature(&self) -> f32 {
        self.centigrade
    }

    /// Relative humidity in percent from the last successful read
    pub fn get_humidity(&self) -> f32 {
        self.humidity_percent
    }

    /// Read the user register (resolution, battery status, heater, OTP reload)
    pub fn user_register(&mut self) -> Result<u8, Error<E>> {
        let mut read_buf = [0u8; 1];
        self.i2c
            .write_read(SHT21_ADDR, &[Sht2xCommand::ReadUserRegister.as_u8()], &mut read_buf)
            .map_err(Error::I2c)?;
        Ok(read_buf[0])
    }

    /// On-chip heater, for condensation checks. Reserved user register bits are preserved.
    pub fn set_heater(&mut self, enable: bool) -> Result<(), Error<E>> {
        let mut user_reg = self.user_register()?;
        if enable {
            user_reg |= SHT2X_USER_REG_HEATER;
        } else {
            user_reg &= !SHT2X_USER_REG_HEATER;
        }
        self.i2c
            .write(SHT21_ADDR, &[Sht2xCommand::WriteUserRegister.as_u8(), user_reg])
            .map_err(Error::I2c)
    }
}
