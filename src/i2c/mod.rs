//! SMBus access to I2C slave devices

use std::io;

use failure::Fail;

mod linux;

pub use self::linux::{
	I2cDev,
	open_bus,
};

/// lowest and highest 7-bit addresses usable for normal slaves
pub const MIN_ADDRESS: u16 = 0x03;
pub const MAX_ADDRESS: u16 = 0x77;

/// maximum payload of an I2C block transfer
pub const BLOCK_MAX: usize = 32;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Fail)]
#[fail(display = "I2C address 0x{:02x} is invalid", address)]
pub struct InvalidAddress {
	pub address: u16,
}

pub fn validate_address(address: u16) -> Result<u16, InvalidAddress> {
	if address < MIN_ADDRESS || address > MAX_ADDRESS {
		return Err(InvalidAddress { address });
	}
	Ok(address)
}

/// SMBus transfers to the currently selected slave
pub trait SmBus {
	fn set_slave_address(&mut self, address: u16) -> io::Result<()>;

	fn write_byte_data(&mut self, command: u8, value: u8) -> io::Result<()>;

	fn read_byte_data(&mut self, command: u8) -> io::Result<u8>;

	fn write_word_data(&mut self, command: u8, value: u16) -> io::Result<()>;

	fn read_word_data(&mut self, command: u8) -> io::Result<u16>;

	/// read `len` bytes (at most `BLOCK_MAX`); may return less if the
	/// adapter ends the transfer early
	fn read_i2c_block_data(&mut self, command: u8, len: usize) -> io::Result<Vec<u8>>;
}

impl<'a, B: SmBus + ?Sized> SmBus for &'a mut B {
	fn set_slave_address(&mut self, address: u16) -> io::Result<()> {
		(**self).set_slave_address(address)
	}

	fn write_byte_data(&mut self, command: u8, value: u8) -> io::Result<()> {
		(**self).write_byte_data(command, value)
	}

	fn read_byte_data(&mut self, command: u8) -> io::Result<u8> {
		(**self).read_byte_data(command)
	}

	fn write_word_data(&mut self, command: u8, value: u16) -> io::Result<()> {
		(**self).write_word_data(command, value)
	}

	fn read_word_data(&mut self, command: u8) -> io::Result<u16> {
		(**self).read_word_data(command)
	}

	fn read_i2c_block_data(&mut self, command: u8, len: usize) -> io::Result<Vec<u8>> {
		(**self).read_i2c_block_data(command, len)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn address_range() {
		assert_eq!(validate_address(0x03), Ok(0x03));
		assert_eq!(validate_address(0x20), Ok(0x20));
		assert_eq!(validate_address(0x77), Ok(0x77));
		assert_eq!(validate_address(0x02), Err(InvalidAddress { address: 0x02 }));
		assert_eq!(validate_address(0x78), Err(InvalidAddress { address: 0x78 }));
		assert_eq!(InvalidAddress { address: 0x78 }.to_string(), "I2C address 0x78 is invalid");
	}
}
