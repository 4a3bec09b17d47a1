use failure::Fail;

use super::SourceImage;

#[derive(Debug, Fail, PartialEq, Eq)]
pub enum HexError {
	#[fail(display = "line {}: record doesn't start with ':'", line)]
	MissingStartCode { line: usize },
	#[fail(display = "line {}: invalid hex digits", line)]
	InvalidDigits { line: usize },
	#[fail(display = "line {}: record length doesn't match byte count", line)]
	InvalidLength { line: usize },
	#[fail(display = "line {}: checksum mismatch (computed 0x{:02x})", line, computed)]
	Checksum { line: usize, computed: u8 },
	#[fail(display = "line {}: unsupported record type 0x{:02x}", line, kind)]
	UnsupportedRecord { line: usize, kind: u8 },
}

const DATA: u8 = 0x00;
const END_OF_FILE: u8 = 0x01;
const EXTENDED_SEGMENT_ADDRESS: u8 = 0x02;
const START_SEGMENT_ADDRESS: u8 = 0x03;
const EXTENDED_LINEAR_ADDRESS: u8 = 0x04;
const START_LINEAR_ADDRESS: u8 = 0x05;

fn decode_bytes(line: usize, text: &str) -> Result<Vec<u8>, HexError> {
	let text = text.as_bytes();
	if text.len() % 2 != 0 {
		return Err(HexError::InvalidDigits { line });
	}
	text.chunks(2).map(|pair| {
		let hi = (pair[0] as char).to_digit(16);
		let lo = (pair[1] as char).to_digit(16);
		match (hi, lo) {
			(Some(hi), Some(lo)) => Ok((hi << 4 | lo) as u8),
			_ => Err(HexError::InvalidDigits { line }),
		}
	}).collect()
}

/// Parse Intel HEX text into a sparse image.
///
/// Later records overwrite earlier ones; parsing stops at the end-of-file
/// record.
pub fn parse_hex(content: &str) -> Result<SourceImage, HexError> {
	let mut image = SourceImage::new();
	// upper bits from extended address records
	let mut base: u32 = 0;

	for (index, text) in content.lines().enumerate() {
		let line = index + 1;
		let text = text.trim();
		if text.is_empty() { continue; }

		if !text.starts_with(':') {
			return Err(HexError::MissingStartCode { line });
		}
		let record = decode_bytes(line, &text[1..])?;
		// length, address (2), type, checksum
		if record.len() < 5 || record.len() != 5 + record[0] as usize {
			return Err(HexError::InvalidLength { line });
		}
		let sum = record.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
		if sum != 0 {
			let computed = record[..record.len() - 1].iter()
				.fold(0u8, |acc, b| acc.wrapping_add(*b))
				.wrapping_neg();
			return Err(HexError::Checksum { line, computed });
		}

		let offset = u32::from(record[1]) << 8 | u32::from(record[2]);
		let kind = record[3];
		let payload = &record[4..record.len() - 1];

		match kind {
			DATA => {
				for (i, b) in payload.iter().enumerate() {
					image.insert(base.wrapping_add(offset + i as u32), *b);
				}
			},
			END_OF_FILE => break,
			EXTENDED_SEGMENT_ADDRESS | EXTENDED_LINEAR_ADDRESS => {
				if payload.len() != 2 {
					return Err(HexError::InvalidLength { line });
				}
				let value = u32::from(payload[0]) << 8 | u32::from(payload[1]);
				base = if kind == EXTENDED_LINEAR_ADDRESS { value << 16 } else { value << 4 };
			},
			START_SEGMENT_ADDRESS | START_LINEAR_ADDRESS => (),
			kind => return Err(HexError::UnsupportedRecord { line, kind }),
		}
	}

	trace!("parsed {} bytes from hex", image.len());
	Ok(image)
}

#[cfg(test)]
mod tests {
	use super::*;

	// program word 0 = 0x3234 and config word 8
	const SAMPLE: &str = "\
:020000040000FA
:02000000343298
:020000040001F9
:0200100000FFEF
:02000004000AF0
:00000001FF
";

	#[test]
	fn parses_records_with_extended_addresses() {
		let image = parse_hex(":02000000343298\n:00000001FF\n").unwrap();
		assert_eq!(image.word(0), Some(0x3234));

		let image = parse_hex(SAMPLE).unwrap();
		assert_eq!(image.word(0), Some(0x3234));
		assert_eq!(image.word(0x1_0010), Some(0xff00));
		assert_eq!(image.len(), 4);
	}

	#[test]
	fn stops_at_end_of_file() {
		let image = parse_hex(":00000001FF\n:02000000343298\n").unwrap();
		assert!(image.is_empty());
	}

	#[test]
	fn rejects_bad_checksum() {
		match parse_hex(":02000000343299\n") {
			Err(HexError::Checksum { line: 1, computed: 0x98 }) => (),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn rejects_garbage() {
		assert_eq!(parse_hex("020000003432\n").unwrap_err(), HexError::MissingStartCode { line: 1 });
		assert_eq!(parse_hex(":0200zz\n").unwrap_err(), HexError::InvalidDigits { line: 1 });
		assert_eq!(parse_hex(":04000000343298\n").unwrap_err(), HexError::InvalidLength { line: 1 });
		assert_eq!(parse_hex("\n\n:00000006FA\n").unwrap_err(), HexError::UnsupportedRecord { line: 3, kind: 6 });
	}
}
