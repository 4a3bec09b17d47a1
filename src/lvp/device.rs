use std::fmt;

use failure::Fail;

use crate::image::HexLayout;

use super::{
	Command,
	LowLevel,
	frame_payload,
};

// offset of the device ID word in configuration memory (0x8006)
pub const DEVICE_ID_OFFSET: usize = 6;

pub const REVISION_MASK: u16 = 0x001f;
pub const ID_MASK: u16 = 0x3fe0;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct DeviceId {
	pub id: u16,
	pub revision: u8,
}

impl DeviceId {
	pub fn from_word(word: u16) -> Self {
		DeviceId {
			id: word & ID_MASK,
			revision: (word & REVISION_MASK) as u8,
		}
	}
}

impl fmt::Display for DeviceId {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "0x{:04x} revision 0x{:02x}", self.id, self.revision)
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct DeviceInfo {
	pub id: u16,
	pub name: &'static str,
	// 14-bit words
	pub program_size: usize,
	// bytes
	pub data_size: usize,
}

const fn device(id: u16, name: &'static str, program_size: usize, data_size: usize) -> DeviceInfo {
	DeviceInfo { id, name, program_size, data_size }
}

/// Supported devices, sorted by ID.
///
/// Only the 1840/1847 entries get EEPROM data handled.
pub static DEVICES: [DeviceInfo; 20] = [
	device(0x1480, "PIC16F1847", 8192, 256),
	device(0x14a0, "PIC16LF1847", 8192, 256),
	device(0x1b80, "PIC12F1840", 4096, 256),
	device(0x1bc0, "PIC12LF1840", 4096, 256),
	device(0x2700, "PIC12F1822", 2048, 0),
	device(0x2720, "PIC16F1823", 2048, 0),
	device(0x2740, "PIC16F1824", 4096, 0),
	device(0x2760, "PIC16F1825", 8192, 0),
	device(0x2780, "PIC16F1826", 2048, 0),
	device(0x27a0, "PIC16F1827", 4096, 0),
	device(0x27c0, "PIC16F1828", 4095, 0),
	device(0x27e0, "PIC16F1829", 8192, 0),
	device(0x2800, "PIC12LF1822", 2048, 0),
	device(0x2820, "PIC16LF1823", 2048, 0),
	device(0x2840, "PIC16LF1824", 4096, 0),
	device(0x2860, "PIC16LF1825", 8192, 0),
	device(0x2880, "PIC16LF1826", 2048, 0),
	device(0x28a0, "PIC16LF1827", 4096, 0),
	device(0x28c0, "PIC16LF1828", 4095, 0),
	device(0x28e0, "PIC16LF1829", 8192, 0),
];

pub fn lookup(id: u16) -> Option<&'static DeviceInfo> {
	DEVICES.binary_search_by_key(&id, |d| d.id).ok().map(|i| &DEVICES[i])
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Fail)]
#[fail(display = "Unsupported device {}", device_id)]
pub struct UnsupportedDevice {
	pub device_id: DeviceId,
}

/// Detected target, fixed for the whole session
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct DeviceProfile {
	pub id: u16,
	pub name: &'static str,
	pub revision: u8,
	pub program_size: usize,
	pub data_size: usize,
	pub layout: HexLayout,
}

impl DeviceProfile {
	pub fn new(info: &DeviceInfo, revision: u8, layout: HexLayout) -> Self {
		DeviceProfile {
			id: info.id,
			name: info.name,
			revision,
			program_size: info.program_size,
			data_size: info.data_size,
			layout,
		}
	}
}

impl fmt::Display for DeviceProfile {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f,
			"{} (0x{:04x} revision 0x{:02x}, program 0x{:x} words, data 0x{:x} bytes)",
			self.name,
			self.id,
			self.revision,
			self.program_size,
			self.data_size,
		)
	}
}

/// Read the device ID word; needs a fresh session (address pointer at 0)
pub fn read_device_id<H: LowLevel + ?Sized>(hw: &mut H) -> DeviceId {
	hw.send_command(Command::LoadConfig);
	hw.load_word(0x3fff);
	for _ in 0..DEVICE_ID_OFFSET {
		hw.send_command(Command::IncrementAddress);
	}
	hw.send_command(Command::ReadProgram);
	let word = frame_payload(hw.read_word());
	trace!("device id word 0x{:04x}", word);
	DeviceId::from_word(word)
}

pub fn identify_device<H: LowLevel + ?Sized>(hw: &mut H, layout: HexLayout) -> Result<DeviceProfile, UnsupportedDevice> {
	let device_id = read_device_id(hw);
	match lookup(device_id.id) {
		Some(info) => Ok(DeviceProfile::new(info, device_id.revision, layout)),
		None => Err(UnsupportedDevice { device_id }),
	}
}
