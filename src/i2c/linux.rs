use std::fs;
use std::io;
use std::os::unix::io::AsRawFd;

use super::{
	BLOCK_MAX,
	SmBus,
};

// linux/i2c-dev.h
const I2C_SLAVE: u32 = 0x0703;
const I2C_SMBUS: u32 = 0x0720;

// linux/i2c.h
const I2C_SMBUS_READ: u8 = 1;
const I2C_SMBUS_WRITE: u8 = 0;
const I2C_SMBUS_BYTE_DATA: u32 = 2;
const I2C_SMBUS_WORD_DATA: u32 = 3;
const I2C_SMBUS_I2C_BLOCK_DATA: u32 = 8;

// union i2c_smbus_data: byte, word or length-prefixed block (+ PEC)
const I2C_SMBUS_DATA_LEN: usize = BLOCK_MAX + 2;

#[repr(C)]
struct SmBusIoctlData {
	read_write: u8,
	command: u8,
	size: u32,
	data: *mut [u8; I2C_SMBUS_DATA_LEN],
}

/// `/dev/i2c-N` character device
pub struct I2cDev {
	file: fs::File,
}

impl I2cDev {
	fn transfer(&mut self, read_write: u8, command: u8, size: u32, data: &mut [u8; I2C_SMBUS_DATA_LEN]) -> io::Result<()> {
		let mut args = SmBusIoctlData {
			read_write,
			command,
			size,
			data: data as *mut _,
		};
		let r = unsafe { libc::ioctl(self.file.as_raw_fd(), I2C_SMBUS as _, &mut args as *mut SmBusIoctlData) };
		if r < 0 {
			return Err(io::Error::last_os_error());
		}
		Ok(())
	}
}

impl SmBus for I2cDev {
	fn set_slave_address(&mut self, address: u16) -> io::Result<()> {
		let r = unsafe { libc::ioctl(self.file.as_raw_fd(), I2C_SLAVE as _, libc::c_ulong::from(address)) };
		if r < 0 {
			return Err(io::Error::last_os_error());
		}
		Ok(())
	}

	fn write_byte_data(&mut self, command: u8, value: u8) -> io::Result<()> {
		let mut data = [0u8; I2C_SMBUS_DATA_LEN];
		data[0] = value;
		self.transfer(I2C_SMBUS_WRITE, command, I2C_SMBUS_BYTE_DATA, &mut data)
	}

	fn read_byte_data(&mut self, command: u8) -> io::Result<u8> {
		let mut data = [0u8; I2C_SMBUS_DATA_LEN];
		self.transfer(I2C_SMBUS_READ, command, I2C_SMBUS_BYTE_DATA, &mut data)?;
		Ok(data[0])
	}

	fn write_word_data(&mut self, command: u8, value: u16) -> io::Result<()> {
		let mut data = [0u8; I2C_SMBUS_DATA_LEN];
		data[0] = value as u8;
		data[1] = (value >> 8) as u8;
		self.transfer(I2C_SMBUS_WRITE, command, I2C_SMBUS_WORD_DATA, &mut data)
	}

	fn read_word_data(&mut self, command: u8) -> io::Result<u16> {
		let mut data = [0u8; I2C_SMBUS_DATA_LEN];
		self.transfer(I2C_SMBUS_READ, command, I2C_SMBUS_WORD_DATA, &mut data)?;
		Ok(u16::from(data[0]) | u16::from(data[1]) << 8)
	}

	fn read_i2c_block_data(&mut self, command: u8, len: usize) -> io::Result<Vec<u8>> {
		if len > BLOCK_MAX {
			return Err(io::Error::new(io::ErrorKind::InvalidInput, "I2C block read longer than 32 bytes"));
		}
		let mut data = [0u8; I2C_SMBUS_DATA_LEN];
		data[0] = len as u8;
		self.transfer(I2C_SMBUS_READ, command, I2C_SMBUS_I2C_BLOCK_DATA, &mut data)?;
		let got = usize::min(usize::from(data[0]), len);
		Ok(data[1..1 + got].to_vec())
	}
}

/// Open `/dev/i2c-<bus>` and select the slave at `address`
pub fn open_bus(bus: u32, address: u16) -> io::Result<I2cDev> {
	let path = format!("/dev/i2c-{}", bus);
	let file = fs::OpenOptions::new().read(true).write(true).open(&path)?;
	let mut dev = I2cDev { file };
	dev.set_slave_address(address)?;
	Ok(dev)
}
