use std::time::Duration;

/// Oversampling setting for one measurement channel
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Oversampling {
    /// channel disabled, output stays at 0x8000 / 0x80000
    Skip = 0,
    X1 = 1,
    X2 = 2,
    X4 = 3,
    X8 = 4,
    X16 = 5,
}

/// Power mode written to ctrl_meas
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mode {
    Sleep = 0b00,
    Forced = 0b01,
    Normal = 0b11,
}

/// Inactive time between conversions in normal mode
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StandbyTime {
    Ms0_5 = 0,
    Ms62_5 = 1,
    Ms125 = 2,
    Ms250 = 3,
    Ms500 = 4,
    Ms1000 = 5,
    Ms10 = 6,
    Ms20 = 7,
}

/// IIR filter coefficient
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Filter {
    Off = 0,
    X2 = 1,
    X4 = 2,
    X8 = 3,
    X16 = 4,
}

/// Which compensation formulas to run
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Precision {
    /// 32-bit fixed-point formulas
    Integer,
    /// double-precision formulas
    Float,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub osrs_h: Oversampling,
    pub osrs_t: Oversampling,
    pub osrs_p: Oversampling,
    pub mode: Mode,
    pub t_sb: StandbyTime,
    pub filter: Filter,
    pub precision: Precision,
    /// sleep between status polls after a soft reset
    pub reset_poll_interval: Duration,
    pub reset_poll_attempts: u32,
    /// sleep between status polls while a conversion runs
    pub measure_poll_interval: Duration,
    pub measure_poll_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            osrs_h: Oversampling::X1,
            osrs_t: Oversampling::X1,
            osrs_p: Oversampling::X1,
            mode: Mode::Normal,
            t_sb: StandbyTime::Ms1000,
            filter: Filter::Off,
            precision: Precision::Integer,
            reset_poll_interval: Duration::from_millis(10),
            reset_poll_attempts: 100,
            measure_poll_interval: Duration::from_millis(1),
            measure_poll_attempts: 1000,
        }
    }
}

impl Config {
    /// ctrl_hum register value
    pub fn ctrl_hum(&self) -> u8 {
        (self.osrs_h as u8) & 0x07
    }

    /// ctrl_meas register value
    pub fn ctrl_meas(&self) -> u8 {
        (((self.osrs_t as u8) << 5) & 0xE0)
            | (((self.osrs_p as u8) << 2) & 0x1C)
            | ((self.mode as u8) & 0x03)
    }

    /// config register value, 3-wire SPI left disabled
    pub fn config(&self) -> u8 {
        (((self.t_sb as u8) << 5) & 0xE0) | (((self.filter as u8) << 2) & 0x1C)
    }
}
