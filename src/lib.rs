#[macro_use]
extern crate log;

macro_rules! with_context {
	(( $fmt:tt $($t:tt)* ), $e:expr) => {{
		use failure::Error;

		match (|| { $e })() {
			Ok(v) => Ok(v),
			Err(e) => {
				let e: Error = e;
				let msg = format!(concat!($fmt, ": {}") $($t)*, e);
				Err(Error::from(e.context(msg)))
			}
		}
	}};

	($msg:expr, $e:expr) => {
		with_context!(("{}", $msg), $e)
	};
}

pub type AResult<T> = Result<T, failure::Error>;

pub mod a2d;
pub mod gpio;
pub mod i2c;
pub mod image;
pub mod lvp;

/// Parse a number either as decimal or, with `0x` prefix, as hex
pub fn parse_number(s: &str) -> AResult<u32> {
	let s = s.trim();
	if s.starts_with("0x") || s.starts_with("0X") {
		with_context!(("invalid hex number {:?}", s), Ok(u32::from_str_radix(&s[2..], 16)?))
	} else {
		with_context!(("invalid number {:?}", s), Ok(s.parse::<u32>()?))
	}
}
