use embedded_hal::i2c::I2c;
use log::debug;

use crate::error::Error;
use crate::i2c::Bus;
use crate::structs::{CalibParams, HumidityParams, PressureParams, TemperatureParams};

// cf. BME280 datasheet, 5.4.2 "Trimming parameter readout"
pub const REG_CALIB_00: u8 = 0x88;
pub const REG_CALIB_24: u8 = 0xA1;
pub const REG_CALIB_26: u8 = 0xE1;
pub const REG_CALIB_00_LEN: usize = 24;
pub const REG_CALIB_26_LEN: usize = 7;

/// Calibration constants plus the fine temperature shared between
/// compensation steps.
///
/// The constants never change after loading. The fine temperature starts
/// unset and is written by every temperature compensation; humidity and
/// pressure compensation refuse to run until it has been set.
#[derive(Clone, Debug, PartialEq)]
pub struct Calibration {
    params: CalibParams,
    pub(crate) t_fine: Option<i32>,
}

impl Calibration {
    pub fn new(params: CalibParams) -> Self {
        Self {
            params,
            t_fine: None,
        }
    }

    pub fn params(&self) -> &CalibParams {
        &self.params
    }

    /// Fine temperature from the last temperature compensation, if any.
    pub fn fine_temperature(&self) -> Option<i32> {
        self.t_fine
    }

    /// Forget the fine temperature, e.g. at the start of a new cycle.
    pub fn clear_fine_temperature(&mut self) {
        self.t_fine = None;
    }
}

impl CalibParams {
    /// Decode the three trimming register blocks (0x88..0x9F, 0xA1, 0xE1..0xE7).
    pub fn from_registers(
        calib00: &[u8; REG_CALIB_00_LEN],
        calib24: u8,
        calib26: &[u8; REG_CALIB_26_LEN],
    ) -> Self {
        let u16_at = |n: usize| u16::from_le_bytes([calib00[n], calib00[n + 1]]);
        let i16_at = |n: usize| i16::from_le_bytes([calib00[n], calib00[n + 1]]);

        let temperature = TemperatureParams {
            t1: u16_at(0),
            t2: i16_at(2),
            t3: i16_at(4),
        };

        let pressure = PressureParams {
            p1: u16_at(6),
            p2: i16_at(8),
            p3: i16_at(10),
            p4: i16_at(12),
            p5: i16_at(14),
            p6: i16_at(16),
            p7: i16_at(18),
            p8: i16_at(20),
            p9: i16_at(22),
        };

        // 0xE4 holds h4[11:4], 0xE6 holds h5[11:4], 0xE5 splits its nibbles
        // between h4[3:0] (low) and h5[3:0] (high)
        let (e4, e5, e6) = (calib26[3], calib26[4], calib26[5]);
        let humidity = HumidityParams {
            h1: calib24,
            h2: i16::from_le_bytes([calib26[0], calib26[1]]),
            h3: calib26[2],
            h4: (i16::from(e4 as i8) << 4) | i16::from(e5 & 0x0F),
            h5: (i16::from(e6 as i8) << 4) | i16::from(e5 >> 4),
            h6: calib26[6] as i8,
        };

        CalibParams {
            temperature,
            pressure,
            humidity,
        }
    }
}

/// Read all trimming registers one byte at a time.
///
/// The first failing register aborts the load with
/// [`Error::CalibrationReadFailed`].
pub fn read_calib<I2C, E>(bus: &mut Bus<I2C>) -> Result<Calibration, Error<E>>
where
    I2C: I2c<Error = E>,
{
    let mut read = |register: u8| {
        bus.read_byte(register).map_err(|err| match err {
            Error::Transport(source) => Error::CalibrationReadFailed { register, source },
            other => other,
        })
    };

    let mut calib00 = [0u8; REG_CALIB_00_LEN];
    for (n, byte) in calib00.iter_mut().enumerate() {
        *byte = read(REG_CALIB_00 + n as u8)?;
    }
    let calib24 = read(REG_CALIB_24)?;
    let mut calib26 = [0u8; REG_CALIB_26_LEN];
    for (n, byte) in calib26.iter_mut().enumerate() {
        *byte = read(REG_CALIB_26 + n as u8)?;
    }

    let params = CalibParams::from_registers(&calib00, calib24, &calib26);
    debug!("calibration: {:?}", params);
    Ok(Calibration::new(params))
}
