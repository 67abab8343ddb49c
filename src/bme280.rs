use crate::hw_def::*;
use crate::types::*;
use crate::Error;

use embedded_hal::{delay::DelayNs, i2c::I2c};

#[cfg(feature = "defmt")]
use defmt::{debug, trace};
#[cfg(feature = "log")]
use log::{debug, trace};

#[cfg(feature="defmt")]
use defmt::Format;

/// Factory trimming parameters read from the BME280's non-volatile memory
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CalibrationData {
    /// temperature trimming
    pub dig_t1: u16,
    /// temperature trimming
    pub dig_t2: i16,
    /// temperature trimming
    pub dig_t3: i16,
    /// pressure trimming
    pub dig_p1: u16,
    /// pressure trimming
    pub dig_p2: i16,
    /// pressure trimming
    pub dig_p3: i16,
    /// pressure trimming
    pub dig_p4: i16,
    /// pressure trimming
    pub dig_p5: i16,
    /// pressure trimming
    pub dig_p6: i16,
    /// pressure trimming
    pub dig_p7: i16,
    /// pressure trimming
    pub dig_p8: i16,
    /// pressure trimming
    pub dig_p9: i16,
    /// humidity trimming
    pub dig_h1: u8,
    /// humidity trimming
    pub dig_h2: i16,
    /// humidity trimming
    pub dig_h3: u8,
    /// humidity trimming
    pub dig_h4: i16,
    /// humidity trimming
    pub dig_h5: i16,
    /// humidity trimming
    pub dig_h6: i8,
}
impl CalibrationData {
    /// Unpack the two calibration blocks (0x88..=0xA1 and 0xE1..=0xE7)
    pub fn from_registers(calib_00: &[u8; BME280_CALIB_00_LEN], calib_26: &[u8; BME280_CALIB_26_LEN]) -> Self {
        let u16_at = |i: usize| u16::from_le_bytes([calib_00[i], calib_00[i + 1]]);
        let i16_at = |i: usize| i16::from_le_bytes([calib_00[i], calib_00[i + 1]]);
        // dig_H4 and dig_H5 are 12-bit values sharing the nibbles of 0xE5
        let e4 = calib_26[3] as i8 as i16;
        let e5 = calib_26[4] as i16;
        let e6 = calib_26[5] as i8 as i16;
        Self {
            dig_t1: u16_at(0),
            dig_t2: i16_at(2),
            dig_t3: i16_at(4),
            dig_p1: u16_at(6),
            dig_p2: i16_at(8),
            dig_p3: i16_at(10),
            dig_p4: i16_at(12),
            dig_p5: i16_at(14),
            dig_p6: i16_at(16),
            dig_p7: i16_at(18),
            dig_p8: i16_at(20),
            dig_p9: i16_at(22),
            dig_h1: calib_00[25],
            dig_h2: i16::from_le_bytes([calib_26[0], calib_26[1]]),
            dig_h3: calib_26[2],
            dig_h4: (e4 << 4) | (e5 & 0x0F),
            dig_h5: (e6 << 4) | (e5 >> 4),
            dig_h6: calib_26[6] as i8,
        }
    }

    /// Fine temperature shared by all three compensation formulas
    fn t_fine(&self, adc_t: i32) -> i32 {
        let adc_t = adc_t as i64;
        let t1 = self.dig_t1 as i64;
        let var1 = (((adc_t >> 3) - (t1 << 1)) * self.dig_t2 as i64) >> 11;
        let var2 = (((((adc_t >> 4) - t1) * ((adc_t >> 4) - t1)) >> 12) * self.dig_t3 as i64) >> 14;
        (var1 + var2) as i32
    }

    /// Temperature in 0.01 °C
    fn compensate_temperature(&self, t_fine: i32) -> i32 {
        (t_fine * 5 + 128) >> 8
    }

    /// Pressure in Pa as Q24.8
    fn compensate_pressure(&self, adc_p: i32, t_fine: i32) -> u32 {
        let mut var1 = t_fine as i64 - 128000;
        let mut var2 = var1 * var1 * self.dig_p6 as i64;
        var2 += (var1 * self.dig_p5 as i64) << 17;
        var2 += (self.dig_p4 as i64) << 35;
        var1 = ((var1 * var1 * self.dig_p3 as i64) >> 8) + ((var1 * self.dig_p2 as i64) << 12);
        var1 = (((1i64 << 47) + var1) * self.dig_p1 as i64) >> 33;
        if var1 == 0 {
            // avoid division by zero on blank trimming data
            return 0;
        }
        let mut p = 1048576 - adc_p as i64;
        p = (((p << 31) - var2) * 3125) / var1;
        var1 = (self.dig_p9 as i64 * (p >> 13) * (p >> 13)) >> 25;
        var2 = (self.dig_p8 as i64 * p) >> 19;
        p = ((p + var1 + var2) >> 8) + ((self.dig_p7 as i64) << 4);
        p as u32
    }

    /// Relative humidity in percent as Q22.10
    fn compensate_humidity(&self, adc_h: i32, t_fine: i32) -> u32 {
        let adc_h = adc_h as i64;
        let v = t_fine as i64 - 76800;
        let mut v = (((adc_h << 14) - ((self.dig_h4 as i64) << 20) - (self.dig_h5 as i64 * v) + 16384) >> 15)
            * (((((((v * self.dig_h6 as i64) >> 10) * (((v * self.dig_h3 as i64) >> 11) + 32768)) >> 10)
                + 2097152)
                * self.dig_h2 as i64
                + 8192)
                >> 14);
        v -= ((((v >> 15) * (v >> 15)) >> 7) * self.dig_h1 as i64) >> 4;
        v = v.clamp(0, 419430400);
        (v >> 12) as u32
    }
}

/// Compensated values of the last conversion
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Latest {
    centigrade: f32,
    humidity_percent: f32,
    pascal: f32,
}

/// BME280 device driver
#[derive(Debug)]
pub struct Bme280<I2C, Delay> {
    pub(crate) i2c: I2C,
    pub(crate) delay: Delay,
    pub(crate) i2c_addr: Bme280Addr,
    calibration: CalibrationData,
    sampling: SamplingConfig,
    latest: Latest,
}

impl<I2C, Delay, E> Bme280<I2C, Delay>
where
    I2C: I2c<Error = E>,
    Delay: DelayNs,
{
    /// Create a new BME280 driver instance. Nothing is sent until [`begin()`](Self::begin).
    pub fn new(i2c: I2C, delay: Delay, i2c_addr: Bme280Addr) -> Self {
        Self {
            i2c,
            delay,
            i2c_addr,
            calibration: CalibrationData::default(),
            sampling: SamplingConfig::default(),
            latest: Latest::default(),
        }
    }

    /// Release the bus and delay, consuming the driver
    pub fn release(self) -> (I2C, Delay) {
        (self.i2c, self.delay)
    }

    fn read_regs(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), Error<E>> {
        trace!("bme280::read_regs(): reg={:#x} len={}", reg, buf.len());
        self.i2c.write_read(self.i2c_addr.as_u8(), &[reg], buf).map_err(Error::I2c)
    }

    fn read_reg(&mut self, reg: u8) -> Result<u8, Error<E>> {
        let mut buf = [0u8; 1];
        self.read_regs(reg, &mut buf)?;
        Ok(buf[0])
    }

    fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), Error<E>> {
        trace!("bme280::write_reg(): reg={:#x} value={:#x}", reg, value);
        self.i2c.write(self.i2c_addr.as_u8(), &[reg, value]).map_err(Error::I2c)
    }

    /// Check the chip ID, reset the chip, load its calibration and apply the default sampling
    pub fn begin(&mut self) -> Result<(), Error<E>> {
        let chip_id = self.read_reg(BME280_REG_CHIP_ID)?;
        if chip_id != BME280_CHIP_ID {
            debug!("bme280::begin(): unexpected chip id {:#x}", chip_id);
            return Err(Error::WrongChipId(chip_id));
        }

        self.reset()?;
        self.calibration = self.read_calibration()?;
        self.set_sampling(SamplingConfig::default())?;
        self.delay.delay_ms(BME280_SETTLE_DELAY_MS);
        debug!("bme280::begin(): ready at {:#x}", self.i2c_addr.as_u8());
        Ok(())
    }

    /// Software reset, returning once the chip has copied its trimming data out of NVM
    pub fn reset(&mut self) -> Result<(), Error<E>> {
        self.write_reg(BME280_REG_RESET, BME280_RESET_WORD)?;
        self.delay.delay_ms(BME280_RESET_DELAY_MS);
        for _ in 0..BME280_NVM_POLL_LIMIT {
            if self.read_reg(BME280_REG_STATUS)? & BME280_STATUS_IM_UPDATE == 0 {
                return Ok(());
            }
            self.delay.delay_ms(BME280_NVM_POLL_MS);
        }
        Err(Error::Timeout)
    }

    fn read_calibration(&mut self) -> Result<CalibrationData, Error<E>> {
        let mut calib_00 = [0u8; BME280_CALIB_00_LEN];
        let mut calib_26 = [0u8; BME280_CALIB_26_LEN];
        self.read_regs(BME280_REG_CALIB_00, &mut calib_00)?;
        self.read_regs(BME280_REG_CALIB_26, &mut calib_26)?;
        Ok(CalibrationData::from_registers(&calib_00, &calib_26))
    }

    /// Factory trimming parameters loaded by [`begin()`](Self::begin)
    pub fn calibration(&self) -> &CalibrationData {
        &self.calibration
    }

    /// Sampling setup last written to the chip
    pub fn sampling(&self) -> SamplingConfig {
        self.sampling
    }

    /// Write a new sampling setup
    pub fn set_sampling(&mut self, sampling: SamplingConfig) -> Result<(), Error<E>> {
        // config is only writable in sleep mode, and ctrl_hum only latches on a ctrl_meas write
        self.write_reg(BME280_REG_CTRL_MEAS, Mode::Sleep.bits())?;
        self.write_reg(BME280_REG_CTRL_HUM, sampling.ctrl_hum())?;
        self.write_reg(BME280_REG_CONFIG, sampling.config())?;
        self.write_reg(BME280_REG_CTRL_MEAS, sampling.ctrl_meas())?;
        self.sampling = sampling;
        Ok(())
    }

    /// In forced mode, run one conversion and wait for it. In any mode, fetch and compensate the
    /// latest data registers.
    pub fn take_forced_measurement(&mut self) -> Result<(), Error<E>> {
        if self.sampling.mode == Mode::Forced {
            self.write_reg(BME280_REG_CTRL_MEAS, self.sampling.ctrl_meas())?;
            let mut polls = 0;
            while self.read_reg(BME280_REG_STATUS)? & BME280_STATUS_MEASURING != 0 {
                polls += 1;
                if polls >= BME280_FORCED_POLL_LIMIT {
                    return Err(Error::Timeout);
                }
                self.delay.delay_ms(1);
            }
        }

        let mut data = [0u8; BME280_DATA_LEN];
        self.read_regs(BME280_REG_PRESS_MSB, &mut data)?;
        let adc_p = (data[0] as i32) << 12 | (data[1] as i32) << 4 | (data[2] as i32) >> 4;
        let adc_t = (data[3] as i32) << 12 | (data[4] as i32) << 4 | (data[5] as i32) >> 4;
        let adc_h = (data[6] as i32) << 8 | data[7] as i32;
        trace!("bme280::take_forced_measurement(): adc_t={} adc_p={} adc_h={}", adc_t, adc_p, adc_h);

        self.latest = self.compensate(adc_t, adc_p, adc_h);
        Ok(())
    }

    fn compensate(&self, adc_t: i32, adc_p: i32, adc_h: i32) -> Latest {
        if adc_t == BME280_SKIPPED_20BIT {
            // pressure and humidity both need t_fine
            return Latest {
                centigrade: f32::NAN,
                humidity_percent: f32::NAN,
                pascal: f32::NAN,
            };
        }
        let cal = &self.calibration;
        let t_fine = cal.t_fine(adc_t);
        Latest {
            centigrade: cal.compensate_temperature(t_fine) as f32 / 100.0,
            pascal: if adc_p == BME280_SKIPPED_20BIT {
                f32::NAN
            } else {
                cal.compensate_pressure(adc_p, t_fine) as f32 / 256.0
            },
            humidity_percent: if adc_h == BME280_SKIPPED_16BIT {
                f32::NAN
            } else {
                cal.compensate_humidity(adc_h, t_fine) as f32 / 1024.0
            },
        }
    }

    /// Temperature in degrees centigrade from the last measurement
    pub fn read_temperature(&self) -> f32 {
        self.latest.centigrade
    }

    /// Relative humidity in percent from the last measurement
    pub fn read_humidity(&self) -> f32 {
        self.latest.humidity_percent
    }

    /// Pressure in pascal from the last measurement
    pub fn read_pressure(&self) -> f32 {
        self.latest.pascal
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use embedded_hal::i2c::ErrorKind;
    use std::vec::Vec;
    use embedded_hal_mock::eh1::{
        delay::NoopDelay,
        i2c::{Mock as I2cMock, Transaction as I2cTransaction},
    };

    pub(crate) const ADDR: u8 = 0x76;

    // Datasheet example trimming (dig_T1 = 27504 .. dig_P9 = 6000), dig_H1 = 75
    pub(crate) const CALIB_00: [u8; BME280_CALIB_00_LEN] = [
        0x70, 0x6B, 0x43, 0x67, 0x18, 0xFC, 0x7D, 0x8E, 0x43, 0xD6, 0xD0, 0x0B, 0x27, 0x0B, 0x8C, 0x00,
        0xF9, 0xFF, 0x8C, 0x3C, 0xF8, 0xC6, 0x70, 0x17, 0x00, 0x4B,
    ];
    // dig_H2 = 362, dig_H3 = 0, dig_H4 = 313, dig_H5 = 50, dig_H6 = 30
    pub(crate) const CALIB_26: [u8; BME280_CALIB_26_LEN] = [0x6A, 0x01, 0x00, 0x13, 0x29, 0x03, 0x1E];
    // adc_P = 415148, adc_T = 519888, adc_H = 30000
    pub(crate) const DATA: [u8; BME280_DATA_LEN] = [0x65, 0x5A, 0xC0, 0x7E, 0xED, 0x00, 0x75, 0x30];

    fn close(a: f32, b: f32) -> bool {
        let d = a - b;
        d < 0.01 && d > -0.01
    }

    /// Bus traffic of a successful `begin()`
    pub(crate) fn begin_transactions() -> Vec<I2cTransaction> {
        vec![
            I2cTransaction::write_read(ADDR, vec![BME280_REG_CHIP_ID], vec![BME280_CHIP_ID]),
            I2cTransaction::write(ADDR, vec![BME280_REG_RESET, BME280_RESET_WORD]),
            I2cTransaction::write_read(ADDR, vec![BME280_REG_STATUS], vec![0x00]),
            I2cTransaction::write_read(ADDR, vec![BME280_REG_CALIB_00], CALIB_00.to_vec()),
            I2cTransaction::write_read(ADDR, vec![BME280_REG_CALIB_26], CALIB_26.to_vec()),
            I2cTransaction::write(ADDR, vec![BME280_REG_CTRL_MEAS, 0x00]),
            I2cTransaction::write(ADDR, vec![BME280_REG_CTRL_HUM, 0x05]),
            I2cTransaction::write(ADDR, vec![BME280_REG_CONFIG, 0x00]),
            I2cTransaction::write(ADDR, vec![BME280_REG_CTRL_MEAS, 0xB7]),
        ]
    }

    #[test]
    fn calibration_from_registers() {
        let cal = CalibrationData::from_registers(&CALIB_00, &CALIB_26);
        assert_eq!(cal.dig_t1, 27504);
        assert_eq!(cal.dig_t2, 26435);
        assert_eq!(cal.dig_t3, -1000);
        assert_eq!(cal.dig_p1, 36477);
        assert_eq!(cal.dig_p2, -10685);
        assert_eq!(cal.dig_p6, -7);
        assert_eq!(cal.dig_p9, 6000);
        assert_eq!(cal.dig_h1, 75);
        assert_eq!(cal.dig_h2, 362);
        assert_eq!(cal.dig_h3, 0);
        assert_eq!(cal.dig_h4, 313);
        assert_eq!(cal.dig_h5, 50);
        assert_eq!(cal.dig_h6, 30);
    }

    #[test]
    fn calibration_negative_h4_h5() {
        // E4 = 0xF0, E5 = 0xA5, E6 = 0xFF: dig_H4 = -251, dig_H5 = -6
        let calib_26 = [0x00, 0x00, 0x00, 0xF0, 0xA5, 0xFF, 0x00];
        let cal = CalibrationData::from_registers(&CALIB_00, &calib_26);
        assert_eq!(cal.dig_h4, -251);
        assert_eq!(cal.dig_h5, -6);
    }

    #[test]
    fn compensation_matches_datasheet() {
        let cal = CalibrationData::from_registers(&CALIB_00, &CALIB_26);
        let t_fine = cal.t_fine(519888);
        assert_eq!(t_fine, 128422);
        assert_eq!(cal.compensate_temperature(t_fine), 2508);
        assert_eq!(cal.compensate_pressure(415148, t_fine), 25767233);
        assert_eq!(cal.compensate_humidity(30000, t_fine), 56317);
    }

    #[test]
    fn blank_calibration_pressure_is_zero() {
        let cal = CalibrationData::default();
        assert_eq!(cal.compensate_pressure(415148, 0), 0);
    }

    #[test]
    fn begin() {
        let mut i2c = I2cMock::new(&begin_transactions());
        let mut bme = Bme280::new(&mut i2c, NoopDelay::new(), Bme280Addr::Primary);
        bme.begin().unwrap();
        assert_eq!(bme.calibration().dig_t1, 27504);
        assert_eq!(bme.sampling(), SamplingConfig::default());
        drop(bme);
        i2c.done();
    }

    #[test]
    fn begin_wrong_chip_id() {
        let mut i2c = I2cMock::new(&[I2cTransaction::write_read(ADDR, vec![BME280_REG_CHIP_ID], vec![0x58])]);
        let mut bme = Bme280::new(&mut i2c, NoopDelay::new(), Bme280Addr::Primary);
        assert!(matches!(bme.begin(), Err(Error::WrongChipId(0x58))));
        drop(bme);
        i2c.done();
    }

    #[test]
    fn begin_no_chip() {
        let mut i2c = I2cMock::new(&[
            I2cTransaction::write_read(ADDR, vec![BME280_REG_CHIP_ID], vec![0x00]).with_error(ErrorKind::Other),
        ]);
        let mut bme = Bme280::new(&mut i2c, NoopDelay::new(), Bme280Addr::Primary);
        assert!(matches!(bme.begin(), Err(Error::I2c(ErrorKind::Other))));
        drop(bme);
        i2c.done();
    }

    #[test]
    fn reset_waits_for_nvm_copy() {
        let mut i2c = I2cMock::new(&[
            I2cTransaction::write(0x77, vec![BME280_REG_RESET, BME280_RESET_WORD]),
            I2cTransaction::write_read(0x77, vec![BME280_REG_STATUS], vec![BME280_STATUS_IM_UPDATE]),
            I2cTransaction::write_read(0x77, vec![BME280_REG_STATUS], vec![BME280_STATUS_IM_UPDATE]),
            I2cTransaction::write_read(0x77, vec![BME280_REG_STATUS], vec![0x00]),
        ]);
        let mut bme = Bme280::new(&mut i2c, NoopDelay::new(), Bme280Addr::Secondary);
        bme.reset().unwrap();
        drop(bme);
        i2c.done();
    }

    #[test]
    fn weather_station_sampling() {
        let mut i2c = I2cMock::new(&[
            I2cTransaction::write(ADDR, vec![BME280_REG_CTRL_MEAS, 0x00]),
            I2cTransaction::write(ADDR, vec![BME280_REG_CTRL_HUM, 0x01]),
            I2cTransaction::write(ADDR, vec![BME280_REG_CONFIG, 0x00]),
            I2cTransaction::write(ADDR, vec![BME280_REG_CTRL_MEAS, 0x25]),
        ]);
        let mut bme = Bme280::new(&mut i2c, NoopDelay::new(), Bme280Addr::Primary);
        bme.set_sampling(SamplingConfig::weather_station()).unwrap();
        assert_eq!(bme.sampling().mode, Mode::Forced);
        drop(bme);
        i2c.done();
    }

    #[test]
    fn config_register_packing() {
        let sampling = SamplingConfig {
            mode: Mode::Normal,
            temperature: Oversampling::X2,
            pressure: Oversampling::X4,
            humidity: Oversampling::X8,
            filter: Filter::X16,
            standby: Standby::Ms1000,
        };
        assert_eq!(sampling.ctrl_hum(), 0b100);
        assert_eq!(sampling.ctrl_meas(), 0b010_011_11);
        assert_eq!(sampling.config(), 0b101_100_00);
    }

    #[test]
    fn forced_measurement() {
        let mut i2c = I2cMock::new(&[
            I2cTransaction::write(ADDR, vec![BME280_REG_CTRL_MEAS, 0x25]),
            I2cTransaction::write_read(ADDR, vec![BME280_REG_STATUS], vec![BME280_STATUS_MEASURING]),
            I2cTransaction::write_read(ADDR, vec![BME280_REG_STATUS], vec![0x00]),
            I2cTransaction::write_read(ADDR, vec![BME280_REG_PRESS_MSB], DATA.to_vec()),
        ]);
        let mut bme = Bme280::new(&mut i2c, NoopDelay::new(), Bme280Addr::Primary);
        bme.calibration = CalibrationData::from_registers(&CALIB_00, &CALIB_26);
        bme.sampling = SamplingConfig::weather_station();
        bme.take_forced_measurement().unwrap();
        assert!(close(bme.read_temperature(), 25.08));
        assert!(close(bme.read_pressure(), 100653.25));
        assert!(close(bme.read_humidity(), 54.997));
        drop(bme);
        i2c.done();
    }

    #[test]
    fn normal_mode_reads_without_trigger() {
        let mut i2c = I2cMock::new(&[I2cTransaction::write_read(ADDR, vec![BME280_REG_PRESS_MSB], DATA.to_vec())]);
        let mut bme = Bme280::new(&mut i2c, NoopDelay::new(), Bme280Addr::Primary);
        bme.calibration = CalibrationData::from_registers(&CALIB_00, &CALIB_26);
        bme.take_forced_measurement().unwrap();
        assert!(close(bme.read_temperature(), 25.08));
        drop(bme);
        i2c.done();
    }

    #[test]
    fn skipped_channels_read_nan() {
        let mut i2c = I2cMock::new(&[I2cTransaction::write_read(
            ADDR,
            vec![BME280_REG_PRESS_MSB],
            vec![0x80, 0x00, 0x00, 0x7E, 0xED, 0x00, 0x80, 0x00],
        )]);
        let mut bme = Bme280::new(&mut i2c, NoopDelay::new(), Bme280Addr::Primary);
        bme.calibration = CalibrationData::from_registers(&CALIB_00, &CALIB_26);
        bme.take_forced_measurement().unwrap();
        assert!(close(bme.read_temperature(), 25.08));
        assert!(bme.read_pressure().is_nan());
        assert!(bme.read_humidity().is_nan());
        drop(bme);
        i2c.done();
    }

    #[test]
    fn forced_measurement_timeout() {
        let mut expectations = vec![I2cTransaction::write(ADDR, vec![BME280_REG_CTRL_MEAS, 0x25])];
        for _ in 0..BME280_FORCED_POLL_LIMIT {
            expectations.push(I2cTransaction::write_read(
                ADDR,
                vec![BME280_REG_STATUS],
                vec![BME280_STATUS_MEASURING],
            ));
        }
        let mut i2c = I2cMock::new(&expectations);
        let mut bme = Bme280::new(&mut i2c, NoopDelay::new(), Bme280Addr::Primary);
        bme.sampling = SamplingConfig::weather_station();
        assert!(matches!(bme.take_forced_measurement(), Err(Error::Timeout)));
        assert_eq!(bme.read_temperature(), 0.0);
        drop(bme);
        i2c.done();
    }
}
