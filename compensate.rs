//! Conversion of raw counts into physical units.
//!
//! The default path is the datasheet's 32-bit fixed-point arithmetic, carried
//! out in 64-bit registers so that out-of-range trimming values cannot
//! overflow. For every input the sensor can produce the results are identical
//! to the 32-bit reference. [`float`] holds the double-precision variants.
//!
//! Temperature must be compensated first in each cycle: it stores the fine
//! temperature that humidity and pressure compensation consume.

use crate::calib::Calibration;
use crate::config::Precision;
use crate::error::PreconditionViolation;
use crate::structs::{raw_16bit, raw_20bit, EnvData, RawSample};

/// Upper clamp of the humidity accumulator, 100 %RH in Q22.10.
pub const HUMIDITY_MAX: i64 = 419_430_400;

/// Temperature in °C. Updates the fine temperature held by `calib`.
pub fn compensate_temperature(msb: u8, lsb: u8, xsb: u8, calib: &mut Calibration) -> f64 {
    let raw = i64::from(raw_20bit(msb, lsb, xsb));
    let t = calib.params().temperature;
    let t1 = i64::from(t.t1);
    let t2 = i64::from(t.t2);
    let t3 = i64::from(t.t3);

    let v1 = (((raw >> 3) - (t1 << 1)) * t2) >> 11;
    let v2 = (raw >> 4) - t1;
    let v2 = (((v2 * v2) >> 12) * t3) >> 14;

    let t_fine = (v1 + v2) as i32;
    calib.t_fine = Some(t_fine);

    (((i64::from(t_fine) * 5) + 128) >> 8) as f64 / 100.0
}

/// Relative humidity in percent, clamped to [0, 100].
pub fn compensate_humidity(
    msb: u8,
    lsb: u8,
    calib: &Calibration,
) -> Result<f64, PreconditionViolation> {
    let t_fine = calib.fine_temperature().ok_or(PreconditionViolation)?;
    let raw = i64::from(raw_16bit(msb, lsb));
    let h = calib.params().humidity;
    let h1 = i64::from(h.h1);
    let h2 = i64::from(h.h2);
    let h3 = i64::from(h.h3);
    let h4 = i64::from(h.h4);
    let h5 = i64::from(h.h5);
    let h6 = i64::from(h.h6);

    let v = i64::from(t_fine) - 76800;

    let offset = (((raw << 14) - (h4 << 20) - (h5 * v)) + 16384) >> 15;
    let scale = (((((((v * h6) >> 10) * (((v * h3) >> 11) + 32768)) >> 10) + 2_097_152) * h2)
        + 8192)
        >> 14;
    let mut v = offset * scale;

    v -= ((((v >> 15) * (v >> 15)) >> 7) * h1) >> 4;
    let v = v.clamp(0, HUMIDITY_MAX);

    Ok((v >> 12) as f64 / 1024.0)
}

/// Air pressure in hPa. Returns 0.0 when the divisor term is zero.
pub fn compensate_air_pressure(
    msb: u8,
    lsb: u8,
    xsb: u8,
    calib: &Calibration,
) -> Result<f64, PreconditionViolation> {
    let t_fine = calib.fine_temperature().ok_or(PreconditionViolation)?;
    let raw = i64::from(raw_20bit(msb, lsb, xsb));
    let p = calib.params().pressure;
    let p1 = i64::from(p.p1);
    let p2 = i64::from(p.p2);
    let p3 = i64::from(p.p3);
    let p4 = i64::from(p.p4);
    let p5 = i64::from(p.p5);
    let p6 = i64::from(p.p6);
    let p7 = i64::from(p.p7);
    let p8 = i64::from(p.p8);
    let p9 = i64::from(p.p9);

    let v1 = (i64::from(t_fine) >> 1) - 64000;
    let mut v2 = (((v1 >> 2) * (v1 >> 2)) >> 11) * p6;
    v2 += (v1 * p5) << 1;
    let v2 = (v2 >> 2) + (p4 << 16);

    let v1 = (((p3 * (((v1 >> 2) * (v1 >> 2)) >> 13)) >> 3) + ((p2 * v1) >> 1)) >> 18;
    let v1 = ((32768 + v1) * p1) >> 15;

    let divisor = v1 as u32;
    if divisor == 0 {
        return Ok(0.0);
    }

    // unsigned 32-bit from here on; the branch keeps the doubling inside 32 bits
    let pa = (((1_048_576 - raw) - (v2 >> 12)) as u32).wrapping_mul(3125);
    let pa = if pa < 0x8000_0000 {
        (pa << 1) / divisor
    } else {
        (pa / divisor) * 2
    };

    let v1 = (p9 * i64::from((pa >> 3).wrapping_mul(pa >> 3) >> 13)) >> 12;
    let v2 = (i64::from((pa as i32) >> 2) * p8) >> 13;
    let pa = (i64::from(pa as i32) + ((v1 + v2 + p7) >> 4)) as u32;

    Ok(f64::from(pa) / 100.0)
}

/// Compensate a whole sample in the required order: temperature first,
/// then humidity and pressure.
pub fn compensate_sample(
    sample: &RawSample,
    calib: &mut Calibration,
    precision: Precision,
) -> Result<EnvData, PreconditionViolation> {
    match precision {
        Precision::Integer => {
            let temperature =
                compensate_temperature(sample.temp_msb, sample.temp_lsb, sample.temp_xsb, calib);
            let humidity = compensate_humidity(sample.hum_msb, sample.hum_lsb, calib)?;
            let pressure = compensate_air_pressure(
                sample.press_msb,
                sample.press_lsb,
                sample.press_xsb,
                calib,
            )?;
            Ok(EnvData {
                temperature,
                humidity,
                pressure,
            })
        }
        Precision::Float => {
            let temperature = float::compensate_temperature(
                sample.temp_msb,
                sample.temp_lsb,
                sample.temp_xsb,
                calib,
            );
            let humidity = float::compensate_humidity(sample.hum_msb, sample.hum_lsb, calib)?;
            let pressure = float::compensate_air_pressure(
                sample.press_msb,
                sample.press_lsb,
                sample.press_xsb,
                calib,
            )?;
            Ok(EnvData {
                temperature,
                humidity,
                pressure,
            })
        }
    }
}

/// Double-precision compensation formulas.
pub mod float {
    use crate::calib::Calibration;
    use crate::error::PreconditionViolation;
    use crate::structs::{raw_16bit, raw_20bit};

    /// Temperature in °C. Stores the truncated fine temperature in `calib`.
    pub fn compensate_temperature(msb: u8, lsb: u8, xsb: u8, calib: &mut Calibration) -> f64 {
        let raw = f64::from(raw_20bit(msb, lsb, xsb));
        let t = calib.params().temperature;
        let t1 = f64::from(t.t1);

        let v1 = (raw / 16384.0 - t1 / 1024.0) * f64::from(t.t2);
        let v2 = raw / 131072.0 - t1 / 8192.0;
        let v2 = v2 * v2 * f64::from(t.t3);

        calib.t_fine = Some((v1 + v2) as i32);
        (v1 + v2) / 5120.0
    }

    /// Relative humidity in percent, clamped to [0, 100].
    pub fn compensate_humidity(
        msb: u8,
        lsb: u8,
        calib: &Calibration,
    ) -> Result<f64, PreconditionViolation> {
        let t_fine = calib.fine_temperature().ok_or(PreconditionViolation)?;
        let raw = f64::from(raw_16bit(msb, lsb));
        let h = calib.params().humidity;

        let v = f64::from(t_fine) - 76800.0;
        let v = (raw - (f64::from(h.h4) * 64.0 + f64::from(h.h5) / 16384.0 * v))
            * (f64::from(h.h2) / 65536.0
                * (1.0
                    + f64::from(h.h6) / 67_108_864.0
                        * v
                        * (1.0 + f64::from(h.h3) / 67_108_864.0 * v)));
        let v = v * (1.0 - f64::from(h.h1) * v / 524_288.0);

        Ok(v.clamp(0.0, 100.0))
    }

    /// Air pressure in hPa. Returns 0.0 when the divisor term is zero.
    pub fn compensate_air_pressure(
        msb: u8,
        lsb: u8,
        xsb: u8,
        calib: &Calibration,
    ) -> Result<f64, PreconditionViolation> {
        let t_fine = calib.fine_temperature().ok_or(PreconditionViolation)?;
        let raw = f64::from(raw_20bit(msb, lsb, xsb));
        let p = calib.params().pressure;

        let v1 = f64::from(t_fine) / 2.0 - 64000.0;
        let mut v2 = v1 * v1 * f64::from(p.p6) / 32768.0;
        v2 += v1 * f64::from(p.p5) * 2.0;
        let v2 = v2 / 4.0 + f64::from(p.p4) * 65536.0;
        let v1 = (f64::from(p.p3) * v1 * v1 / 524_288.0 + f64::from(p.p2) * v1) / 524_288.0;
        let v1 = (1.0 + v1 / 32768.0) * f64::from(p.p1);

        if v1 == 0.0 {
            return Ok(0.0);
        }

        let pa = 1_048_576.0 - raw;
        let pa = (pa - v2 / 4096.0) * 6250.0 / v1;
        let v1 = f64::from(p.p9) * pa * pa / 2_147_483_648.0;
        let v2 = pa * f64::from(p.p8) / 32768.0;
        let pa = pa + (v1 + v2 + f64::from(p.p7)) / 16.0;

        Ok(pa / 100.0)
    }
}
