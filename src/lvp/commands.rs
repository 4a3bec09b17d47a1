/// 6-bit commands of the enhanced midrange serial programming interface
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Command {
	LoadConfig,        // 0x00, + data: PC = 0x8000
	LoadProgram,       // 0x02, + data
	LoadData,          // 0x03, + data
	ReadProgram,       // 0x04, + data out
	ReadData,          // 0x05, + data out
	IncrementAddress,  // 0x06
	ResetAddress,      // 0x16: PC = 0
	BeginInternalProg, // 0x08, self timed
	BeginExternalProg, // 0x18, ends with EndExternalProg
	EndExternalProg,   // 0x0a
	BulkEraseProgram,  // 0x09, also config when PC >= 0x8000
	BulkEraseData,     // 0x0b
}

impl Command {
	pub const WIDTH: usize = 6;

	pub fn code(self) -> u8 {
		match self {
			Command::LoadConfig => 0x00,
			Command::LoadProgram => 0x02,
			Command::LoadData => 0x03,
			Command::ReadProgram => 0x04,
			Command::ReadData => 0x05,
			Command::IncrementAddress => 0x06,
			Command::ResetAddress => 0x16,
			Command::BeginInternalProg => 0x08,
			Command::BeginExternalProg => 0x18,
			Command::EndExternalProg => 0x0a,
			Command::BulkEraseProgram => 0x09,
			Command::BulkEraseData => 0x0b,
		}
	}

	pub fn from_code(code: u8) -> Option<Self> {
		Some(match code & 0x3f {
			0x00 => Command::LoadConfig,
			0x02 => Command::LoadProgram,
			0x03 => Command::LoadData,
			0x04 => Command::ReadProgram,
			0x05 => Command::ReadData,
			0x06 => Command::IncrementAddress,
			0x16 => Command::ResetAddress,
			0x08 => Command::BeginInternalProg,
			0x18 => Command::BeginExternalProg,
			0x0a => Command::EndExternalProg,
			0x09 => Command::BulkEraseProgram,
			0x0b => Command::BulkEraseData,
			_ => return None,
		})
	}

	/// whether a 16-bit word is sent after the command
	pub fn has_load(self) -> bool {
		match self {
			Command::LoadConfig | Command::LoadProgram | Command::LoadData => true,
			_ => false,
		}
	}

	/// whether the target sends a 16-bit word after the command
	pub fn has_read(self) -> bool {
		match self {
			Command::ReadProgram | Command::ReadData => true,
			_ => false,
		}
	}
}
