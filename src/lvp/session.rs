use std::ops::{
	Deref,
	DerefMut,
};

use crate::gpio::Lines;

use super::LowLevel;

/// How the target is put into programming mode
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum ProgrammingMode {
	/// MCLR low plus the key sequence; needs the LVP config bit set
	LowVoltage,
	/// MCLR drives an external VPP switch, no key
	HighVoltage,
}

impl Default for ProgrammingMode {
	fn default() -> Self {
		ProgrammingMode::LowVoltage
	}
}

/// The target in programming mode; dropping the session releases the lines
/// again (DATA and CLOCK as inputs, MCLR back to run).
pub struct Session<'a, H: ?Sized + Lines + 'a> {
	lines: &'a mut H,
	mode: ProgrammingMode,
}

impl<'a, H: ?Sized + Lines> Session<'a, H> {
	pub fn enter(lines: &'a mut H, mode: ProgrammingMode) -> Self {
		match mode {
			ProgrammingMode::LowVoltage => lines.enter_low_voltage(),
			ProgrammingMode::HighVoltage => lines.enter_high_voltage(),
		}
		Session { lines, mode }
	}

	pub fn mode(&self) -> ProgrammingMode {
		self.mode
	}
}

impl<'a, H: ?Sized + Lines> Drop for Session<'a, H> {
	fn drop(&mut self) {
		match self.mode {
			ProgrammingMode::LowVoltage => self.lines.release_low_voltage(),
			ProgrammingMode::HighVoltage => self.lines.release_high_voltage(),
		}
	}
}

impl<'a, H: ?Sized + Lines> Deref for Session<'a, H> {
	type Target = H;

	fn deref(&self) -> &Self::Target {
		&self.lines
	}
}

impl<'a, H: ?Sized + Lines> DerefMut for Session<'a, H> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut self.lines
	}
}
