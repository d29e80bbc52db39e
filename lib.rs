//! BME280 temperature, humidity and pressure readout over Linux I2C.
//!
//! The sensor is reached through `/dev/i2c-<bus>` (via [`rppal`]), but every
//! transaction goes through the [`embedded_hal::i2c::I2c`] trait so the same
//! code runs against any other implementation.
//!
//! ```no_run
//! use bme280i2c::{Bme280, Bus, Config, ADDR_BME280};
//!
//! let bus = Bus::open(1, ADDR_BME280)?;
//! let mut bme280 = Bme280::new(bus, rppal::hal::Delay::new(), Config::default());
//! bme280.init()?;
//! let env = bme280.sample()?;
//! println!("{} {} {}", env.temperature, env.humidity, env.pressure);
//! # Ok::<(), bme280i2c::Error<rppal::i2c::Error>>(())
//! ```
//!
//! Compensation follows the BME280 datasheet, section 4.2.3 and 8.

#![deny(unsafe_code)]

pub mod calib;
pub mod compensate;
pub mod config;
mod error;
mod i2c;
pub mod sensor;
mod structs;

pub use crate::calib::Calibration;
pub use crate::config::{Config, Filter, Mode, Oversampling, Precision, StandbyTime};
pub use crate::error::{Error, PreconditionViolation};
pub use crate::i2c::{Bus, MAX_BLOCK_LEN};
pub use crate::sensor::{Bme280, State, ADDR_BME280, ADDR_BME280_SECONDARY};
pub use crate::structs::{
    raw_16bit, raw_20bit, CalibParams, EnvData, HumidityParams, PressureParams, RawSample,
    TemperatureParams,
};
