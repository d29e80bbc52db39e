/// Factory trimming constants for temperature (dig_T1..dig_T3)
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TemperatureParams {
    pub t1: u16,
    pub t2: i16,
    pub t3: i16,
}

/// Factory trimming constants for pressure (dig_P1..dig_P9)
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PressureParams {
    pub p1: u16,
    pub p2: i16,
    pub p3: i16,
    pub p4: i16,
    pub p5: i16,
    pub p6: i16,
    pub p7: i16,
    pub p8: i16,
    pub p9: i16,
}

/// Factory trimming constants for humidity (dig_H1..dig_H6)
///
/// `h4` and `h5` are 12-bit values sharing the nibbles of register 0xE5.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct HumidityParams {
    pub h1: u8,
    pub h2: i16,
    pub h3: u8,
    pub h4: i16,
    pub h5: i16,
    pub h6: i8,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CalibParams {
    pub temperature: TemperatureParams,
    pub pressure: PressureParams,
    pub humidity: HumidityParams,
}

/// Data registers of one conversion, as read from the sensor.
///
/// `*_xsb` holds the low four bits of the 20-bit count in its upper nibble.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RawSample {
    pub temp_msb: u8,
    pub temp_lsb: u8,
    pub temp_xsb: u8,
    pub hum_msb: u8,
    pub hum_lsb: u8,
    pub press_msb: u8,
    pub press_lsb: u8,
    pub press_xsb: u8,
}

impl RawSample {
    pub fn temperature(&self) -> u32 {
        raw_20bit(self.temp_msb, self.temp_lsb, self.temp_xsb)
    }

    pub fn pressure(&self) -> u32 {
        raw_20bit(self.press_msb, self.press_lsb, self.press_xsb)
    }

    pub fn humidity(&self) -> u32 {
        raw_16bit(self.hum_msb, self.hum_lsb)
    }
}

/// Assemble a 20-bit temperature or pressure count.
pub fn raw_20bit(msb: u8, lsb: u8, xsb: u8) -> u32 {
    (u32::from(msb) << 12) | (u32::from(lsb) << 4) | (u32::from(xsb) >> 4)
}

/// Assemble a 16-bit humidity count.
pub fn raw_16bit(msb: u8, lsb: u8) -> u32 {
    (u32::from(msb) << 8) | u32::from(lsb)
}

/// One compensated reading
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnvData {
    /// degrees centigrade
    pub temperature: f64,
    /// relative humidity in percent
    pub humidity: f64,
    /// hectopascal
    pub pressure: f64,
}
