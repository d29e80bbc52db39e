use std::fmt;

/// All possible errors in this crate
///
/// `E` is the error type of the underlying I2C transport.
#[derive(Debug)]
pub enum Error<E> {
    /// Operation on a closed bus, or an argument the transport cannot carry
    InvalidArgument(&'static str),
    /// The bus device node could not be opened
    BusUnavailable(E),
    /// The slave address was rejected by the bus driver
    AddressSelectFailed(E),
    /// I2C read or write failed on an open bus
    Transport(E),
    /// A calibration register could not be read
    CalibrationReadFailed {
        /// register being read when the transport failed
        register: u8,
        /// underlying transport error
        source: E,
    },
    /// The chip id register did not return the BME280 id
    UnexpectedDeviceId(u8),
    /// A compensation step ran out of order
    PreconditionViolation(PreconditionViolation),
    /// A status bit did not clear within the configured number of polls
    Timeout {
        /// status register that was polled
        register: u8,
        /// number of polls issued before giving up
        attempts: u32,
    },
}

impl<E> Error<E> {
    /// Errors worth retrying on the next sampling cycle.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Timeout { .. })
    }
}

impl<E> From<PreconditionViolation> for Error<E> {
    fn from(err: PreconditionViolation) -> Self {
        Error::PreconditionViolation(err)
    }
}

impl<E: fmt::Display> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument(what) => write!(f, "invalid argument: {}", what),
            Error::BusUnavailable(e) => write!(f, "i2c bus unavailable: {}", e),
            Error::AddressSelectFailed(e) => write!(f, "slave address select failed: {}", e),
            Error::Transport(e) => write!(f, "i2c transport error: {}", e),
            Error::CalibrationReadFailed { register, source } => {
                write!(f, "calibration read at 0x{:02X} failed: {}", register, source)
            }
            Error::UnexpectedDeviceId(id) => {
                write!(f, "unexpected chip id 0x{:02X}, not a BME280", id)
            }
            Error::PreconditionViolation(e) => write!(f, "{}", e),
            Error::Timeout { register, attempts } => write!(
                f,
                "status register 0x{:02X} still busy after {} polls",
                register, attempts
            ),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for Error<E> {}

/// Humidity or pressure compensation was attempted before temperature
/// compensation produced a fine temperature.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PreconditionViolation;

impl fmt::Display for PreconditionViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fine temperature unset, compensate temperature first")
    }
}

impl std::error::Error for PreconditionViolation {}
