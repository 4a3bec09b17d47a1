/// Sparse byte image of the target memory, as loaded from an Intel HEX file.
///
/// Addresses not present mean "don't touch".

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

mod ihex;

pub use self::ihex::{
	HexError,
	parse_hex,
};

/// Where the regions of the target live in the linear hex address space
/// (byte addresses; every 14-bit word takes two bytes).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct HexLayout {
	pub program_base: u32,
	pub data_base: u32,
	pub config_base: u32,
}

impl Default for HexLayout {
	fn default() -> Self {
		HexLayout {
			program_base: 0,
			data_base: 0x1_e000,  // word 0xf000
			config_base: 0x1_0000, // word 0x8000
		}
	}
}

#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct SourceImage {
	bytes: BTreeMap<u32, u8>,
}

impl SourceImage {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, address: u32) -> Option<u8> {
		self.bytes.get(&address).cloned()
	}

	pub fn insert(&mut self, address: u32, value: u8) {
		self.bytes.insert(address, value);
	}

	pub fn len(&self) -> usize {
		self.bytes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.bytes.is_empty()
	}

	/// little endian 16-bit word at `address`; both bytes must be present
	pub fn word(&self, address: u32) -> Option<u16> {
		let lo = self.get(address)?;
		let hi = self.get(address + 1)?;
		Some(u16::from(lo) | (u16::from(hi) << 8))
	}

	pub fn set_word(&mut self, address: u32, value: u16) {
		self.insert(address, value as u8);
		self.insert(address + 1, (value >> 8) as u8);
	}

	pub fn load_hex_file<P: AsRef<Path>>(path: P) -> crate::AResult<Self> {
		let path = path.as_ref();
		with_context!(("Error in file {:?}", path), {
			let content = fs::read_to_string(path)?;
			Ok(parse_hex(&content)?)
		})
	}
}
