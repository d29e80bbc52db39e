use embedded_hal::i2c::I2c;
use log::trace;

use crate::error::Error;

/// Largest single write accepted by the Linux i2c-dev character device.
pub const MAX_BLOCK_LEN: usize = 8192;

/// One open connection to an I2C bus, bound to a single slave address.
///
/// Every transaction is a plain byte stream to or from the bound address.
/// Register reads point the register address first, then read the reply.
/// Multi-byte register values on the wire are big-endian.
#[derive(Debug)]
pub struct Bus<I2C> {
    i2c: Option<I2C>,
    bus: u8,
    address: u8,
}

impl Bus<rppal::i2c::I2c> {
    /// Open `/dev/i2c-<bus>` and select `address` for all transactions on it.
    pub fn open(bus: u8, address: u8) -> Result<Self, Error<rppal::i2c::Error>> {
        let mut i2c = rppal::i2c::I2c::with_bus(bus).map_err(Error::BusUnavailable)?;
        i2c.set_slave_address(u16::from(address))
            .map_err(Error::AddressSelectFailed)?;
        trace!("i2c-{}: opened, slave 0x{:02X}", bus, address);
        Ok(Self::new(i2c, bus, address))
    }
}

impl<I2C, E> Bus<I2C>
where
    I2C: I2c<Error = E>,
{
    /// Wrap an already open transport.
    pub fn new(i2c: I2C, bus: u8, address: u8) -> Self {
        Self {
            i2c: Some(i2c),
            bus,
            address,
        }
    }

    /// Bus number this handle was opened on
    pub fn bus(&self) -> u8 {
        self.bus
    }

    /// Slave address bound to this handle
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Whether the transport is still held
    pub fn is_open(&self) -> bool {
        self.i2c.is_some()
    }

    /// Release the transport. Returns `false` if it was already released.
    pub fn close(&mut self) -> bool {
        match self.i2c.take() {
            Some(i2c) => {
                drop(i2c);
                trace!("i2c-{}: closed", self.bus);
                true
            }
            None => false,
        }
    }

    /// Hand the transport back to the caller, closing this handle.
    pub fn release(mut self) -> Option<I2C> {
        self.i2c.take()
    }

    fn transport(&mut self) -> Result<&mut I2C, Error<E>> {
        self.i2c
            .as_mut()
            .ok_or(Error::InvalidArgument("bus handle is closed"))
    }

    fn write_raw(&mut self, bytes: &[u8]) -> Result<(), Error<E>> {
        let address = self.address;
        self.transport()?
            .write(address, bytes)
            .map_err(Error::Transport)
    }

    fn read_reg(&mut self, register: u8, reply: &mut [u8]) -> Result<(), Error<E>> {
        let address = self.address;
        let i2c = self.transport()?;
        i2c.write(address, &[register]).map_err(Error::Transport)?;
        i2c.read(address, reply).map_err(Error::Transport)?;
        trace!("i2c-{}: read 0x{:02X} -> {:02X?}", self.bus, register, reply);
        Ok(())
    }

    /// Read one 8-bit register.
    pub fn read_byte(&mut self, register: u8) -> Result<u8, Error<E>> {
        let mut reply = [0u8; 1];
        self.read_reg(register, &mut reply)?;
        Ok(reply[0])
    }

    /// Write one 8-bit register.
    pub fn write_byte(&mut self, register: u8, value: u8) -> Result<(), Error<E>> {
        trace!("i2c-{}: write 0x{:02X} <- {:02X}", self.bus, register, value);
        self.write_raw(&[register, value])
    }

    /// Read two bytes starting at `register`, first byte most significant.
    pub fn read_u16(&mut self, register: u8) -> Result<u16, Error<E>> {
        let mut reply = [0u8; 2];
        self.read_reg(register, &mut reply)?;
        Ok(u16::from_be_bytes(reply))
    }

    /// Signed variant of [`Bus::read_u16`].
    pub fn read_i16(&mut self, register: u8) -> Result<i16, Error<E>> {
        let mut reply = [0u8; 2];
        self.read_reg(register, &mut reply)?;
        Ok(i16::from_be_bytes(reply))
    }

    /// Write a 16-bit value as (register, high byte, low byte).
    pub fn write_u16(&mut self, register: u8, value: u16) -> Result<(), Error<E>> {
        let [hi, lo] = value.to_be_bytes();
        trace!("i2c-{}: write 0x{:02X} <- {:04X}", self.bus, register, value);
        self.write_raw(&[register, hi, lo])
    }

    /// Write a bare command byte with no register prefix.
    pub fn write_command(&mut self, command: u8) -> Result<(), Error<E>> {
        trace!("i2c-{}: command {:02X}", self.bus, command);
        self.write_raw(&[command])
    }

    /// Write `bytes` as-is in a single transfer.
    pub fn write_block(&mut self, bytes: &[u8]) -> Result<(), Error<E>> {
        if bytes.len() > MAX_BLOCK_LEN {
            return Err(Error::InvalidArgument("block longer than i2c-dev write limit"));
        }
        // check the handle even when there is nothing to send
        self.transport()?;
        if bytes.is_empty() {
            return Ok(());
        }
        trace!("i2c-{}: block write {} bytes", self.bus, bytes.len());
        self.write_raw(bytes)
    }
}
