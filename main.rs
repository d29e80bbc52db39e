use std::env;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::{info, warn};
use rppal::hal::Delay;

use bme280i2c::{Bme280, Bus, Config, Precision, ADDR_BME280};

const DEFAULT_BUS: u8 = 1;
const SAMPLE_PERIOD: Duration = Duration::from_secs(1);

fn parse_u8(text: &str) -> Result<u8> {
    let value = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16)?,
        None => text.parse()?,
    };
    Ok(value)
}

fn env_u8(name: &str, default: u8) -> Result<u8> {
    match env::var(name) {
        Ok(text) => parse_u8(&text).with_context(|| format!("invalid {}={:?}", name, text)),
        Err(_) => Ok(default),
    }
}

fn env_precision() -> Result<Precision> {
    match env::var("BME280_PRECISION").as_deref() {
        Err(_) | Ok("integer") => Ok(Precision::Integer),
        Ok("float") => Ok(Precision::Float),
        Ok(other) => bail!("invalid BME280_PRECISION={:?}, expected integer or float", other),
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let bus_number = env_u8("BME280_I2C_BUS", DEFAULT_BUS)?;
    let address = env_u8("BME280_I2C_ADDR", ADDR_BME280)?;
    let config = Config {
        precision: env_precision()?,
        ..Config::default()
    };

    let bus = Bus::open(bus_number, address)
        .with_context(|| format!("opening /dev/i2c-{} at 0x{:02X}", bus_number, address))?;
    let mut bme280 = Bme280::new(bus, Delay::new(), config);
    bme280.init().context("bme280 setup failed")?;
    info!("sampling every {:?}", SAMPLE_PERIOD);

    loop {
        match bme280.sample() {
            Ok(env) => println!("{:.2} {:.2} {:.2}", env.temperature, env.humidity, env.pressure),
            Err(err) if err.is_transient() => warn!("sample skipped: {}", err),
            Err(err) => return Err(err).context("sampling failed"),
        }
        thread::sleep(SAMPLE_PERIOD);
    }
}
