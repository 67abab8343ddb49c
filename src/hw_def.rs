//! Register maps, command codes and bus addresses of the supported chips

/// I²C address of the BME280, selected by the level of its SDO pin
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Bme280Addr {
    /// SDO tied to GND (0x76)
    #[default]
    Primary,
    /// SDO tied to VDDIO (0x77)
    Secondary,
}
impl Bme280Addr {
    /// Get the 7-bit bus address
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::Primary => 0x76,
            Self::Secondary => 0x77,
        }
    }
}

/// I²C address of the SHT21; fixed in silicon
pub const SHT21_ADDR: u8 = 0x40;

pub(crate) const BME280_CHIP_ID: u8 = 0x60;
pub(crate) const BME280_RESET_WORD: u8 = 0xB6;

pub(crate) const BME280_REG_CALIB_00: u8 = 0x88;
pub(crate) const BME280_REG_CHIP_ID: u8 = 0xD0;
pub(crate) const BME280_REG_RESET: u8 = 0xE0;
pub(crate) const BME280_REG_CALIB_26: u8 = 0xE1;
pub(crate) const BME280_REG_CTRL_HUM: u8 = 0xF2;
pub(crate) const BME280_REG_STATUS: u8 = 0xF3;
pub(crate) const BME280_REG_CTRL_MEAS: u8 = 0xF4;
pub(crate) const BME280_REG_CONFIG: u8 = 0xF5;
pub(crate) const BME280_REG_PRESS_MSB: u8 = 0xF7;

/// 0x88..=0xA1: temperature and pressure trimming, dig_H1 in the last byte
pub(crate) const BME280_CALIB_00_LEN: usize = 26;
/// 0xE1..=0xE7: remaining humidity trimming
pub(crate) const BME280_CALIB_26_LEN: usize = 7;
/// 0xF7..=0xFE: pressure, temperature, humidity ADC values
pub(crate) const BME280_DATA_LEN: usize = 8;

pub(crate) const BME280_STATUS_MEASURING: u8 = 1 << 3;
pub(crate) const BME280_STATUS_IM_UPDATE: u8 = 1 << 0;

/// ADC value reported for a channel whose oversampling is `Skipped`
pub(crate) const BME280_SKIPPED_20BIT: i32 = 0x80000;
pub(crate) const BME280_SKIPPED_16BIT: i32 = 0x8000;

pub(crate) const BME280_RESET_DELAY_MS: u32 = 10;
pub(crate) const BME280_NVM_POLL_MS: u32 = 10;
pub(crate) const BME280_NVM_POLL_LIMIT: u32 = 20;
pub(crate) const BME280_SETTLE_DELAY_MS: u32 = 100;
pub(crate) const BME280_FORCED_POLL_LIMIT: u32 = 2000;

/// SHT2x command bytes
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub(crate) enum Sht2xCommand {
    MeasureTempNoHold = 0xF3,
    MeasureHumidNoHold = 0xF5,
    WriteUserRegister = 0xE6,
    ReadUserRegister = 0xE7,
    SoftReset = 0xFE,
}
impl Sht2xCommand {
    pub(crate) fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Bit 1 of the LSB tells a humidity word (1) from a temperature word (0)
pub(crate) const SHT2X_STATUS_HUMIDITY: u16 = 0x0002;
pub(crate) const SHT2X_STATUS_MASK: u16 = 0x0003;
pub(crate) const SHT2X_USER_REG_HEATER: u8 = 1 << 2;

/// Worst-case conversion times at the power-on resolution (14 bit T, 12 bit RH)
pub(crate) const SHT2X_TEMP_CONVERSION_MS: u32 = 85;
pub(crate) const SHT2X_HUMID_CONVERSION_MS: u32 = 29;
pub(crate) const SHT2X_RESET_DELAY_MS: u32 = 15;

/// CRC-8 used by the SHT2x family: x^8 + x^5 + x^4 + 1, initial value 0
#[cfg(feature = "crc")]
pub(crate) const CRC_8_SHT2X: crc::Algorithm<u8> = crc::Algorithm {
    width: 8,
    poly: 0x31,
    init: 0x00,
    refin: false,
    refout: false,
    xorout: 0x00,
    check: 0xa2,
    residue: 0x00,
};
