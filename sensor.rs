use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{debug, info, trace, warn};

use crate::calib::{read_calib, Calibration};
use crate::compensate::compensate_sample;
use crate::config::{Config, Mode};
use crate::error::{Error, PreconditionViolation};
use crate::i2c::Bus;
use crate::structs::{EnvData, RawSample};

// BME280 I2C slave addresses (SDO low / high).
pub const ADDR_BME280: u8 = 0x76;
pub const ADDR_BME280_SECONDARY: u8 = 0x77;

pub const CHIP_ID: u8 = 0x60;
pub const RESET_VAL: u8 = 0xB6;

// BME280 register addresses.
pub const REG_ID: u8 = 0xD0;
pub const REG_RESET: u8 = 0xE0;
pub const REG_CTRL_HUM: u8 = 0xF2;
pub const REG_STATUS: u8 = 0xF3;
pub const REG_CTRL_MEAS: u8 = 0xF4;
pub const REG_CONFIG: u8 = 0xF5;
pub const REG_PRESS_MSB: u8 = 0xF7;
pub const REG_PRESS_LSB: u8 = 0xF8;
pub const REG_PRESS_XSB: u8 = 0xF9;
pub const REG_TEMP_MSB: u8 = 0xFA;
pub const REG_TEMP_LSB: u8 = 0xFB;
pub const REG_TEMP_XSB: u8 = 0xFC;
pub const REG_HUM_MSB: u8 = 0xFD;
pub const REG_HUM_LSB: u8 = 0xFE;

/// status: conversion running
pub const STATUS_MEASURING: u8 = 0x08;
/// status: NVM data being copied to image registers
pub const STATUS_IM_UPDATE: u8 = 0x01;

/// Where the sensor is in its bring-up
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum State {
    /// bus open, chip not yet identified
    Uninitialized,
    /// chip identified, soft reset not yet completed
    ResetPending,
    /// control registers written and calibration loaded
    Configured,
    /// at least one sample taken
    Sampling,
}

/// BME280 on an I2C bus
#[derive(Debug)]
pub struct Bme280<I2C, D> {
    bus: Bus<I2C>,
    delay: D,
    config: Config,
    calib: Option<Calibration>,
    state: State,
}

impl<I2C, D, E> Bme280<I2C, D>
where
    I2C: I2c<Error = E>,
    D: DelayNs,
{
    pub fn new(bus: Bus<I2C>, delay: D, config: Config) -> Self {
        Self {
            bus,
            delay,
            config,
            calib: None,
            state: State::Uninitialized,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn calibration(&self) -> Option<&Calibration> {
        self.calib.as_ref()
    }

    /// Give back the bus and delay provider.
    pub fn release(self) -> (Bus<I2C>, D) {
        (self.bus, self.delay)
    }

    /// Identify, reset and configure the sensor, then load its calibration.
    pub fn init(&mut self) -> Result<(), Error<E>> {
        self.verify_id()?;
        self.reset()?;
        self.configure()?;
        info!("bme280 on i2c-{} 0x{:02X} ready", self.bus.bus(), self.bus.address());
        Ok(())
    }

    /// Check the chip id register.
    pub fn verify_id(&mut self) -> Result<(), Error<E>> {
        let id = self.bus.read_byte(REG_ID)?;
        if id != CHIP_ID {
            return Err(Error::UnexpectedDeviceId(id));
        }
        debug!("chip id 0x{:02X}", id);
        self.state = State::ResetPending;
        Ok(())
    }

    /// Issue a soft reset and wait for the NVM copy to finish.
    pub fn reset(&mut self) -> Result<(), Error<E>> {
        self.bus.write_byte(REG_RESET, RESET_VAL)?;
        self.calib = None;
        self.state = State::ResetPending;
        let interval = self.config.reset_poll_interval;
        sleep(&mut self.delay, interval);
        self.wait_status(
            STATUS_IM_UPDATE | STATUS_MEASURING,
            interval,
            self.config.reset_poll_attempts,
        )?;
        debug!("soft reset complete");
        Ok(())
    }

    /// Write the control registers and load calibration.
    ///
    /// ctrl_hum only takes effect once ctrl_meas is written, and config is
    /// written before ctrl_meas so it lands while the sensor still sleeps.
    pub fn configure(&mut self) -> Result<(), Error<E>> {
        self.bus.write_byte(REG_CTRL_HUM, self.config.ctrl_hum())?;
        self.bus.write_byte(REG_CONFIG, self.config.config())?;
        self.bus.write_byte(REG_CTRL_MEAS, self.config.ctrl_meas())?;
        self.calib = Some(read_calib(&mut self.bus)?);
        self.state = State::Configured;
        debug!("configured: {:?}", self.config);
        Ok(())
    }

    /// Wait for the running conversion and read its data registers.
    pub fn read_raw(&mut self) -> Result<RawSample, Error<E>> {
        if self.config.mode == Mode::Forced {
            self.bus.write_byte(REG_CTRL_MEAS, self.config.ctrl_meas())?;
            // measuring is not raised the instant ctrl_meas is written
            sleep(&mut self.delay, self.config.measure_poll_interval);
        }
        self.wait_status(
            STATUS_MEASURING,
            self.config.measure_poll_interval,
            self.config.measure_poll_attempts,
        )?;

        let sample = RawSample {
            temp_msb: self.bus.read_byte(REG_TEMP_MSB)?,
            temp_lsb: self.bus.read_byte(REG_TEMP_LSB)?,
            temp_xsb: self.bus.read_byte(REG_TEMP_XSB)?,
            hum_msb: self.bus.read_byte(REG_HUM_MSB)?,
            hum_lsb: self.bus.read_byte(REG_HUM_LSB)?,
            press_msb: self.bus.read_byte(REG_PRESS_MSB)?,
            press_lsb: self.bus.read_byte(REG_PRESS_LSB)?,
            press_xsb: self.bus.read_byte(REG_PRESS_XSB)?,
        };
        trace!("raw sample {:?}", sample);
        Ok(sample)
    }

    /// Take one compensated reading.
    ///
    /// The fine temperature of the previous cycle is dropped first, so a
    /// failed read never leaves a stale value behind.
    pub fn sample(&mut self) -> Result<EnvData, Error<E>> {
        let mut calib = self.calib.take().ok_or(PreconditionViolation)?;
        calib.clear_fine_temperature();
        let precision = self.config.precision;
        let env = self
            .read_raw()
            .and_then(|raw| compensate_sample(&raw, &mut calib, precision).map_err(Error::from));
        self.calib = Some(calib);
        let env = env?;
        self.state = State::Sampling;
        Ok(env)
    }

    fn wait_status(&mut self, mask: u8, interval: Duration, attempts: u32) -> Result<(), Error<E>> {
        for attempt in 1..=attempts {
            let status = self.bus.read_byte(REG_STATUS)?;
            if status & mask == 0 {
                trace!("status 0x{:02X} clear after {} polls", status, attempt);
                return Ok(());
            }
            sleep(&mut self.delay, interval);
        }
        warn!("status bits 0x{:02X} still set after {} polls", mask, attempts);
        Err(Error::Timeout {
            register: REG_STATUS,
            attempts,
        })
    }
}

fn sleep<D: DelayNs>(delay: &mut D, interval: Duration) {
    delay.delay_us(u32::try_from(interval.as_micros()).unwrap_or(u32::MAX));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calib::tests::{datasheet_params, CALIB_00, CALIB_24, CALIB_26};
    use crate::calib::{REG_CALIB_00, REG_CALIB_24, REG_CALIB_26};
    use crate::config::Precision;
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction};

    const ADDR: u8 = ADDR_BME280;

    /// Delay that records every requested wait in nanoseconds.
    #[derive(Debug, Default)]
    struct RecordingDelay(Vec<u32>);

    impl DelayNs for RecordingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.0.push(ns);
        }
    }

    fn read(register: u8, value: u8) -> Vec<Transaction> {
        vec![
            Transaction::write(ADDR, vec![register]),
            Transaction::read(ADDR, vec![value]),
        ]
    }

    fn reads(register: u8, bytes: &[u8]) -> Vec<Transaction> {
        bytes
            .iter()
            .enumerate()
            .flat_map(|(n, &b)| read(register + n as u8, b))
            .collect()
    }

    fn write(register: u8, value: u8) -> Transaction {
        Transaction::write(ADDR, vec![register, value])
    }

    fn init_expectations() -> Vec<Transaction> {
        let config = Config::default();
        let mut e = read(REG_ID, CHIP_ID);
        e.push(write(REG_RESET, RESET_VAL));
        e.extend(read(REG_STATUS, STATUS_IM_UPDATE));
        e.extend(read(REG_STATUS, 0x00));
        e.push(write(REG_CTRL_HUM, config.ctrl_hum()));
        e.push(write(REG_CONFIG, config.config()));
        e.push(write(REG_CTRL_MEAS, config.ctrl_meas()));
        e.extend(reads(REG_CALIB_00, &CALIB_00));
        e.extend(reads(REG_CALIB_24, &[CALIB_24]));
        e.extend(reads(REG_CALIB_26, &CALIB_26));
        e
    }

    fn sample_expectations() -> Vec<Transaction> {
        let mut e = read(REG_STATUS, STATUS_MEASURING);
        e.extend(read(REG_STATUS, 0x00));
        e.extend(reads(REG_TEMP_MSB, &[0x7E, 0xED, 0x00]));
        e.extend(reads(REG_HUM_MSB, &[0x6A, 0x3C]));
        e.extend(reads(REG_PRESS_MSB, &[0x65, 0x5A, 0xC0]));
        e
    }

    #[test]
    fn init_then_sample() {
        let mut expectations = init_expectations();
        expectations.extend(sample_expectations());
        let mut i2c = I2cMock::new(&expectations);
        let bus = Bus::new(i2c.clone(), 1, ADDR);
        let mut bme = Bme280::new(bus, NoopDelay::new(), Config::default());

        assert_eq!(bme.state(), State::Uninitialized);
        bme.init().unwrap();
        assert_eq!(bme.state(), State::Configured);
        assert_eq!(bme.calibration().unwrap().params(), &datasheet_params());

        let env = bme.sample().unwrap();
        assert_eq!(bme.state(), State::Sampling);
        assert_eq!(env.temperature, 25.08);
        assert_eq!(env.humidity, 35.419921875);
        assert_eq!(env.pressure, 1006.56);
        assert_eq!(bme.calibration().unwrap().fine_temperature(), Some(128422));
        i2c.done();
    }

    #[test]
    fn wrong_chip_id_is_fatal() {
        let expectations = read(REG_ID, 0x58);
        let mut i2c = I2cMock::new(&expectations);
        let bus = Bus::new(i2c.clone(), 1, ADDR);
        let mut bme = Bme280::new(bus, NoopDelay::new(), Config::default());

        match bme.init() {
            Err(Error::UnexpectedDeviceId(0x58)) => {}
            other => panic!("expected id mismatch, got {:?}", other),
        }
        assert_eq!(bme.state(), State::Uninitialized);
        i2c.done();
    }

    #[test]
    fn reset_wait_times_out() {
        let config = Config {
            reset_poll_attempts: 3,
            ..Config::default()
        };
        let mut expectations = vec![write(REG_RESET, RESET_VAL)];
        for _ in 0..3 {
            expectations.extend(read(REG_STATUS, STATUS_IM_UPDATE));
        }
        let mut i2c = I2cMock::new(&expectations);
        let bus = Bus::new(i2c.clone(), 1, ADDR);
        let mut bme = Bme280::new(bus, NoopDelay::new(), config);

        match bme.reset() {
            Err(Error::Timeout { register: REG_STATUS, attempts: 3 }) => {}
            other => panic!("expected timeout, got {:?}", other),
        }
        i2c.done();
    }

    #[test]
    fn sample_before_configure_is_rejected() {
        let mut i2c = I2cMock::new(&[]);
        let bus = Bus::new(i2c.clone(), 1, ADDR);
        let mut bme = Bme280::new(bus, NoopDelay::new(), Config::default());

        assert!(matches!(bme.sample(), Err(Error::PreconditionViolation(_))));
        i2c.done();
    }

    #[test]
    fn transport_error_during_sampling_is_transient() {
        let mut expectations = init_expectations();
        expectations.extend(read(REG_STATUS, 0x00));
        expectations.push(Transaction::write(ADDR, vec![REG_TEMP_MSB]));
        expectations.push(Transaction::read(ADDR, vec![0]).with_error(ErrorKind::Other));
        expectations.extend(sample_expectations());
        let mut i2c = I2cMock::new(&expectations);
        let bus = Bus::new(i2c.clone(), 1, ADDR);
        let mut bme = Bme280::new(bus, NoopDelay::new(), Config::default());
        bme.init().unwrap();

        let err = bme.sample().unwrap_err();
        assert!(err.is_transient());
        // next cycle recovers
        assert_eq!(bme.sample().unwrap().temperature, 25.08);
        i2c.done();
    }

    #[test]
    fn failed_cycle_drops_previous_fine_temperature() {
        let mut expectations = init_expectations();
        expectations.extend(sample_expectations());
        expectations.extend(read(REG_STATUS, 0x00));
        expectations.push(Transaction::write(ADDR, vec![REG_TEMP_MSB]));
        expectations.push(Transaction::read(ADDR, vec![0]).with_error(ErrorKind::Other));
        let mut i2c = I2cMock::new(&expectations);
        let bus = Bus::new(i2c.clone(), 1, ADDR);
        let mut bme = Bme280::new(bus, NoopDelay::new(), Config::default());
        bme.init().unwrap();

        bme.sample().unwrap();
        assert_eq!(bme.calibration().unwrap().fine_temperature(), Some(128422));
        assert!(bme.sample().is_err());
        assert_eq!(bme.calibration().unwrap().fine_temperature(), None);
        i2c.done();
    }

    #[test]
    fn forced_mode_triggers_each_conversion() {
        let config = Config {
            mode: Mode::Forced,
            precision: Precision::Float,
            ..Config::default()
        };
        let mut expectations = read(REG_ID, CHIP_ID);
        expectations.push(write(REG_RESET, RESET_VAL));
        expectations.extend(read(REG_STATUS, 0x00));
        expectations.push(write(REG_CTRL_HUM, config.ctrl_hum()));
        expectations.push(write(REG_CONFIG, config.config()));
        expectations.push(write(REG_CTRL_MEAS, config.ctrl_meas()));
        expectations.extend(reads(REG_CALIB_00, &CALIB_00));
        expectations.extend(reads(REG_CALIB_24, &[CALIB_24]));
        expectations.extend(reads(REG_CALIB_26, &CALIB_26));
        expectations.push(write(REG_CTRL_MEAS, config.ctrl_meas()));
        expectations.extend(sample_expectations());
        let mut i2c = I2cMock::new(&expectations);
        let bus = Bus::new(i2c.clone(), 1, ADDR);
        let mut bme = Bme280::new(bus, RecordingDelay::default(), config);

        bme.init().unwrap();
        let env = bme.sample().unwrap();
        assert!((env.temperature - 25.0824).abs() < 1e-3);

        let (_, delay) = bme.release();
        // reset settle, settle after triggering, one busy poll
        assert_eq!(delay.0, vec![10_000_000, 1_000_000, 1_000_000]);
        i2c.done();
    }
}
