use std::fmt;

/// size of one sample in a READ_DATA block
pub const UNPACKED_SIZE: usize = 4;
/// size of one sample in a READ_PACK_DATA block
pub const PACKED_SIZE: usize = 3;

/// Both channels of one conversion
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Sample {
	pub a0: u16,
	pub a1: u16,
	/// samples lost before this one (saturates at 7)
	pub overrun: u8,
	pub valid: bool,
}

fn le_value(bytes: &[u8]) -> u32 {
	bytes.iter().rev().fold(0, |v, &b| v << 8 | u32::from(b))
}

impl Sample {
	/// 32-bit layout: A0 in bits 0..9, A1 in bits 16..25, overrun in bits
	/// 28..30, valid flag in bit 31
	pub fn from_unpacked(raw: u32) -> Self {
		Sample {
			a0: (raw & 0x3ff) as u16,
			a1: ((raw >> 16) & 0x3ff) as u16,
			overrun: ((raw >> 28) & 0x7) as u8,
			valid: 0 != (raw >> 31) & 1,
		}
	}

	/// 24-bit layout: A0 in bits 0..9, A1 in bits 10..19, overrun in bits
	/// 20..22, valid flag in bit 23
	pub fn from_packed(raw: u32) -> Self {
		Sample {
			a0: (raw & 0x3ff) as u16,
			a1: ((raw >> 10) & 0x3ff) as u16,
			overrun: ((raw >> 20) & 0x7) as u8,
			valid: 0 != (raw >> 23) & 1,
		}
	}

	/// decode a READ_DATA block; a trailing partial sample is dropped
	pub fn decode_unpacked(block: &[u8]) -> Vec<Sample> {
		block.chunks_exact(UNPACKED_SIZE).map(|c| Sample::from_unpacked(le_value(c))).collect()
	}

	/// decode a READ_PACK_DATA block; a trailing partial sample is dropped
	pub fn decode_packed(block: &[u8]) -> Vec<Sample> {
		block.chunks_exact(PACKED_SIZE).map(|c| Sample::from_packed(le_value(c))).collect()
	}
}

impl fmt::Display for Sample {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "A0 : {:4}      A1 : {:4}   Ovr : {}  Valid : {}", self.a0, self.a1, self.overrun, self.valid as u8)
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Version {
	pub id: u8,
	pub tag: u8,
	pub major: u8,
	pub minor: u8,
}

impl Version {
	pub fn from_bytes(bytes: [u8; 4]) -> Self {
		Version {
			id: bytes[0],
			tag: bytes[1],
			major: bytes[2],
			minor: bytes[3],
		}
	}
}

impl fmt::Display for Version {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "Id = 0x{:02x}, Tag = 0x{:02X}, Version = {}.{}", self.id, self.tag, self.major, self.minor)
	}
}
