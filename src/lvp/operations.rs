use std::fmt;
use std::ops::Range;
use std::time::Duration;

use failure::Fail;

use crate::image::SourceImage;

use super::{
	Command,
	LowLevel,
	frame_payload,
};

// programming pulse widths (self timed internal programming)
pub const PROGRAM_PULSE: Duration = Duration::from_millis(5);
pub const DATA_PULSE: Duration = Duration::from_millis(3);
pub const ERASE_SETTLE: Duration = Duration::from_millis(100);

pub const CONFIG_ADDRESS: u32 = 0x8000;
// words relative to CONFIG_ADDRESS; user IDs are 0..4
pub const RESERVED_WORDS: Range<usize> = 4..7;
pub const CONFIG_WORDS: Range<usize> = 7..9;

/// configuration word 2 carries the LVP enable bit
pub const LVP_CONFIG_WORD: usize = 8;
pub const LVP_ENABLE: u16 = 0x2000;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Region {
	Program,
	Data,
	Config,
}

impl Region {
	fn load_command(self) -> Command {
		match self {
			Region::Program | Region::Config => Command::LoadProgram,
			Region::Data => Command::LoadData,
		}
	}

	fn read_command(self) -> Command {
		match self {
			Region::Program | Region::Config => Command::ReadProgram,
			Region::Data => Command::ReadData,
		}
	}

	fn pulse(self) -> Duration {
		match self {
			Region::Program | Region::Config => PROGRAM_PULSE,
			Region::Data => DATA_PULSE,
		}
	}

	// log a progress line every that many words
	fn progress_step(self) -> usize {
		match self {
			Region::Program => 128,
			Region::Data => 32,
			Region::Config => 1,
		}
	}

	/// significant bits of a word read back from the region
	pub fn value_mask(self) -> u16 {
		match self {
			Region::Program | Region::Config => 0x3fff,
			Region::Data => 0x00ff,
		}
	}

	/// erased value
	pub fn blank_value(self) -> u16 {
		self.value_mask()
	}

	/// device word address for `offset` words into the region
	pub fn address(self, offset: usize) -> u32 {
		match self {
			Region::Program | Region::Data => offset as u32,
			Region::Config => CONFIG_ADDRESS + offset as u32,
		}
	}

	/// value the image asks for at `offset`, masked to the region width.
	///
	/// Program and config words are two bytes in the image (little endian),
	/// both must be present; data bytes are stored one per address.
	pub fn image_value(self, image: &SourceImage, base: u32, offset: usize) -> Option<u16> {
		match self {
			Region::Program | Region::Config => {
				image.word(base + 2 * offset as u32).map(|w| w & self.value_mask())
			},
			Region::Data => image.get(base + offset as u32).map(u16::from),
		}
	}

	/// word a pass leaves untouched
	pub fn is_reserved(self, offset: usize) -> bool {
		self == Region::Config && RESERVED_WORDS.contains(&offset)
	}

	// value a pass writes or expects: reserved words are skipped and the
	// config word keeps LVP enabled
	fn target_value(self, image: &SourceImage, base: u32, offset: usize) -> Option<u16> {
		match self {
			Region::Config if self.is_reserved(offset) => None,
			Region::Config => config_value(image, base, offset),
			_ => self.image_value(image, base, offset),
		}
	}
}

impl fmt::Display for Region {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(match self {
			Region::Program => "program",
			Region::Data => "data",
			Region::Config => "config",
		})
	}
}

/// value found on the device differs from the expected one
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Fail)]
#[fail(display = "{} address 0x{:04x}: expected 0x{:04x}, read 0x{:04x}", region, address, expected, actual)]
pub struct Mismatch {
	pub region: Region,
	pub address: u32,
	pub expected: u16,
	pub actual: u16,
}

/// config word value to write / expect; the LVP bit is always forced on so
/// an image can't lock out low voltage programming
pub fn config_value(image: &SourceImage, config_base: u32, offset: usize) -> Option<u16> {
	let value = Region::Config.image_value(image, config_base, offset)?;
	if offset == LVP_CONFIG_WORD {
		Some(value | LVP_ENABLE)
	} else {
		Some(value)
	}
}

/// whether the image itself enables LVP (missing config word counts as yes)
pub fn image_requests_lvp(image: &SourceImage, config_base: u32) -> bool {
	match Region::Config.image_value(image, config_base, LVP_CONFIG_WORD) {
		Some(value) => 0 != value & LVP_ENABLE,
		None => true,
	}
}

trait InternalOperations: LowLevel {
	fn read_value(&mut self, region: Region) -> u16 {
		self.send_command(region.read_command());
		frame_payload(self.read_word()) & region.value_mask()
	}

	fn verify_value(&mut self, region: Region, offset: usize, expected: u16) -> Result<(), Mismatch> {
		let actual = self.read_value(region);
		if actual != expected {
			return Err(Mismatch {
				region,
				address: region.address(offset),
				expected,
				actual,
			});
		}
		Ok(())
	}

	// load, program and read back the word at the current address
	fn write_value(&mut self, region: Region, offset: usize, value: u16) -> Result<(), Mismatch> {
		self.send_command(region.load_command());
		self.load_word(value);
		self.send_command(Command::BeginInternalProg);
		self.wait(region.pulse());
		self.verify_value(region, offset, value)
	}

	fn progress(&mut self, region: Region, offset: usize) {
		if 0 == offset % region.progress_step() {
			trace!("{} 0x{:04x}", region, region.address(offset));
		}
	}

	// point the address at the first word of the region
	fn seek(&mut self, region: Region) {
		self.send_command(Command::ResetAddress);
		if region == Region::Config {
			self.send_command(Command::LoadConfig);
			self.load_word(0x3fff);
		}
	}
}

impl<H: LowLevel + ?Sized> InternalOperations for H {
}

/// Region passes of the memory programmer.
///
/// The target has no random access: every pass starts with a pointer reset
/// (followed by a jump to 0x8000 for the config region) and then walks the
/// region with one increment per word. A pass stops at the first mismatch.
pub trait MemoryOperations: LowLevel {
	/// erase program memory, user IDs, configuration words and EEPROM
	fn bulk_erase(&mut self) {
		self.send_command(Command::ResetAddress);
		self.send_command(Command::LoadConfig);
		self.load_word(0x3fff);
		self.send_command(Command::BulkEraseProgram);
		self.wait(ERASE_SETTLE);
		self.send_command(Command::BulkEraseData);
		self.wait(ERASE_SETTLE);
	}

	/// the reserved config words (device ID and revision among them) are
	/// never checked
	fn blank_check(&mut self, region: Region, size: usize) -> Result<(), Mismatch> {
		self.seek(region);
		for offset in 0..size {
			if !region.is_reserved(offset) {
				self.verify_value(region, offset, region.blank_value())?;
				self.progress(region, offset);
			}
			self.send_command(Command::IncrementAddress);
		}
		Ok(())
	}

	/// program every word the image defines, verifying each right away;
	/// words missing in the image are skipped
	fn burn(&mut self, region: Region, image: &SourceImage, base: u32, size: usize) -> Result<(), Mismatch> {
		self.seek(region);
		for offset in 0..size {
			if let Some(value) = region.target_value(image, base, offset) {
				self.write_value(region, offset, value)?;
			}
			self.progress(region, offset);
			self.send_command(Command::IncrementAddress);
		}
		Ok(())
	}

	/// compare every word the image defines with the device
	fn check(&mut self, region: Region, image: &SourceImage, base: u32, size: usize) -> Result<(), Mismatch> {
		self.seek(region);
		for offset in 0..size {
			if let Some(value) = region.target_value(image, base, offset) {
				self.verify_value(region, offset, value)?;
			}
			self.progress(region, offset);
			self.send_command(Command::IncrementAddress);
		}
		Ok(())
	}

	/// burn user IDs and configuration words
	fn config_burn(&mut self, image: &SourceImage, config_base: u32) -> Result<(), Mismatch> {
		self.burn(Region::Config, image, config_base, CONFIG_WORDS.end)
	}

	fn config_check(&mut self, image: &SourceImage, config_base: u32) -> Result<(), Mismatch> {
		self.check(Region::Config, image, config_base, CONFIG_WORDS.end)
	}
}

impl<H: LowLevel + ?Sized> MemoryOperations for H {
}
