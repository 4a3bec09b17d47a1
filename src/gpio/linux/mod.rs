/* BCM283x GPIO block as exposed by /dev/gpiomem on the Raspberry Pi */

use std::io;

mod mapped;

use self::mapped::Mapped;

use super::{
	Direction,
	Line,
	Lines,
	PinConfig,
};

pub const DEFAULT_GPIOMEM: &str = "/dev/gpiomem";

const PIN_COUNT: u8 = 54;

#[allow(dead_code)]
mod consts {
	// function select: 3 bits per pin, 10 pins per register
	pub const GPFSEL0: usize = 0x00;
	// only registers for pins 0..31 are used; the target lines live there
	pub const GPSET0: usize = 0x1c;
	pub const GPSET1: usize = 0x20;
	pub const GPCLR0: usize = 0x28;
	pub const GPCLR1: usize = 0x2c;
	pub const GPLEV0: usize = 0x34;
	pub const GPLEV1: usize = 0x38;

	pub const FSEL_INPUT: u32 = 0b000;
	pub const FSEL_OUTPUT: u32 = 0b001;
	pub const FSEL_MASK: u32 = 0b111;
}

use self::consts::*;

// offset and bit of a pin in a bank of 32-bit registers starting at `base`
fn bank_bit(base: usize, pin: u8) -> (usize, u32) {
	(base + 4 * (pin as usize / 32), 1u32 << (pin % 32))
}

struct BcmGpio {
	mem: Mapped,
	pins: PinConfig,
}

impl BcmGpio {
	fn set_function(&mut self, pin: u8, function: u32) {
		let offset = GPFSEL0 + 4 * (pin as usize / 10);
		let shift = 3 * (pin as u32 % 10);
		let value = self.mem.read_dword(offset);
		let value = (value & !(FSEL_MASK << shift)) | (function << shift);
		self.mem.write_dword(offset, value);
	}
}

impl Lines for BcmGpio {
	fn set_direction(&mut self, line: Line, direction: Direction) {
		let pin = self.pins.pin(line);
		trace!("GPIO {} ({:?}) -> {:?}", pin, line, direction);
		match direction {
			Direction::Input => self.set_function(pin, FSEL_INPUT),
			Direction::Output => self.set_function(pin, FSEL_OUTPUT),
		}
	}

	fn write(&mut self, line: Line, value: bool) {
		let pin = self.pins.pin(line);
		let (offset, bit) = if value { bank_bit(GPSET0, pin) } else { bank_bit(GPCLR0, pin) };
		self.mem.write_dword(offset, bit);
	}

	fn read(&mut self, line: Line) -> bool {
		let (offset, bit) = bank_bit(GPLEV0, self.pins.pin(line));
		0 != self.mem.read_dword(offset) & bit
	}
}

pub fn open_gpiomem(path: &str, pins: PinConfig) -> io::Result<impl Lines> {
	for &pin in &[pins.clock, pins.data, pins.reset] {
		if pin >= PIN_COUNT {
			return Err(io::Error::new(io::ErrorKind::InvalidInput, format!("invalid GPIO pin {}", pin)));
		}
	}
	let mem = mapped::inner_open(path)?;
	debug!("mapped {} ({} bytes), pins {:?}", path, mem.len(), pins);
	Ok(BcmGpio { mem, pins })
}
