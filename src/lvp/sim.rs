//! Pin level model of a 14-bit core target in programming mode, driven
//! through the `Lines` trait like the real GPIO block.

use std::time::Duration;

use crate::gpio::{
	Direction,
	Line,
	Lines,
};

use super::low_level::{
	MAGIC_CLOCKS,
	MAGIC_KEY,
};
use super::{
	Command,
	ProgrammingMode,
	frame_payload,
	frame_word,
};

const CONFIG_ADDRESS: usize = 0x8000;
const CONFIG_SIZE: usize = 16;
const DEVICE_ID_WORD: usize = 6;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Phase {
	// normal operation (or locked out after a bad key)
	Running,
	Key { shift: u64, count: usize },
	Command { shift: u8, count: usize },
	Load { command: Command, shift: u16, count: usize },
	Read { frame: u16, count: usize },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Latch {
	Program(u16),
	Data(u8),
}

pub struct Target {
	entry: ProgrammingMode,
	phase: Phase,

	clock_level: bool,
	clock_dir: Direction,
	data_level: bool,
	data_dir: Direction,
	reset_level: bool,
	out: bool,

	pc: usize,
	latch: Option<Latch>,

	pub program: Vec<u16>,
	pub data: Vec<u8>,
	pub config: [u16; CONFIG_SIZE],
	/// program words that always read back as zero
	pub stuck: Vec<usize>,

	pub commands: Vec<Command>,
	pub waits: Vec<Duration>,
	pub entries: usize,
}

impl Target {
	/// erased device; `device_word` is the raw ID word (ID | revision)
	pub fn new(entry: ProgrammingMode, device_word: u16, program_size: usize, data_size: usize) -> Self {
		let mut config = [0x3fff; CONFIG_SIZE];
		config[DEVICE_ID_WORD] = device_word;
		Target {
			entry,
			phase: Phase::Running,
			clock_level: false,
			clock_dir: Direction::Input,
			data_level: false,
			data_dir: Direction::Input,
			reset_level: true,
			out: false,
			pc: 0,
			latch: None,
			program: vec![0x3fff; program_size],
			data: vec![0xff; data_size],
			config,
			stuck: Vec::new(),
			commands: Vec::new(),
			waits: Vec::new(),
			entries: 0,
		}
	}

	pub fn in_programming(&self) -> bool {
		match self.phase {
			Phase::Running | Phase::Key { .. } => false,
			_ => true,
		}
	}

	/// DATA and CLOCK floating, MCLR at run level
	pub fn is_released(&self) -> bool {
		let run_level = self.entry == ProgrammingMode::LowVoltage;
		self.data_dir == Direction::Input
			&& self.clock_dir == Direction::Input
			&& self.reset_level == run_level
			&& !self.in_programming()
	}

	pub fn count(&self, command: Command) -> usize {
		self.commands.iter().filter(|&&c| c == command).count()
	}

	pub fn waited_pulses(&self, duration: Duration) -> usize {
		self.waits.iter().filter(|&&d| d == duration).count()
	}

	fn start_programming(&mut self) {
		self.entries += 1;
		self.pc = 0;
		self.latch = None;
		self.phase = Phase::Command { shift: 0, count: 0 };
	}

	fn program_word(&self) -> u16 {
		if self.pc >= CONFIG_ADDRESS {
			return self.config.get(self.pc - CONFIG_ADDRESS).cloned().unwrap_or(0x3fff);
		}
		if self.program.is_empty() {
			return 0x3fff;
		}
		let index = self.pc % self.program.len();
		if self.stuck.contains(&index) {
			return 0;
		}
		self.program[index]
	}

	fn data_index(&self) -> Option<usize> {
		if self.data.is_empty() {
			None
		} else {
			Some((self.pc & 0xff) % self.data.len())
		}
	}

	fn config_writable(index: usize) -> bool {
		index < 4 || index == 7 || index == 8
	}

	// flash cells only go from 1 to 0 without an erase
	fn commit(&mut self) {
		match self.latch {
			Some(Latch::Program(value)) => {
				if self.pc >= CONFIG_ADDRESS {
					let index = self.pc - CONFIG_ADDRESS;
					if Self::config_writable(index) {
						self.config[index] &= value;
					}
				} else if !self.program.is_empty() {
					let index = self.pc % self.program.len();
					self.program[index] &= value;
				}
			},
			Some(Latch::Data(value)) => {
				if let Some(index) = self.data_index() {
					self.data[index] = value;
				}
			},
			None => (),
		}
	}

	fn execute(&mut self, code: u8) {
		self.phase = Phase::Command { shift: 0, count: 0 };
		let command = match Command::from_code(code) {
			Some(c) => c,
			None => return,
		};
		self.commands.push(command);

		if command.has_load() {
			self.phase = Phase::Load { command, shift: 0, count: 0 };
			return;
		}
		if command.has_read() {
			let value = match command {
				Command::ReadData => self.data_index().map_or(0, |i| u16::from(self.data[i])),
				_ => self.program_word(),
			};
			self.phase = Phase::Read { frame: frame_word(value), count: 0 };
			return;
		}

		match command {
			Command::IncrementAddress => self.pc = (self.pc + 1) & 0xffff,
			Command::ResetAddress => self.pc = 0,
			Command::BeginInternalProg | Command::BeginExternalProg => self.commit(),
			Command::EndExternalProg => (),
			Command::BulkEraseProgram => {
				for w in self.program.iter_mut() {
					*w = 0x3fff;
				}
				if self.pc >= CONFIG_ADDRESS {
					for index in 0..CONFIG_SIZE {
						if Self::config_writable(index) {
							self.config[index] = 0x3fff;
						}
					}
				}
			},
			Command::BulkEraseData => {
				for b in self.data.iter_mut() {
					*b = 0xff;
				}
			},
			_ => (),
		}
	}

	fn load(&mut self, command: Command, frame: u16) {
		let payload = frame_payload(frame);
		match command {
			Command::LoadConfig => {
				self.pc = CONFIG_ADDRESS;
				self.latch = Some(Latch::Program(payload));
			},
			Command::LoadProgram => self.latch = Some(Latch::Program(payload)),
			Command::LoadData => self.latch = Some(Latch::Data(payload as u8)),
			_ => unreachable!(),
		}
	}

	fn rising_edge(&mut self) {
		if let Phase::Read { frame, count } = self.phase {
			self.out = 0 != (frame >> count) & 1;
		}
	}

	fn falling_edge(&mut self) {
		let bit = self.data_dir == Direction::Output && self.data_level;
		match self.phase {
			Phase::Running => (),
			Phase::Key { shift, count } => {
				let shift = shift | (u64::from(bit) << count);
				let count = count + 1;
				if count < MAGIC_CLOCKS {
					self.phase = Phase::Key { shift, count };
				} else if shift & 0xffff_ffff == MAGIC_KEY {
					self.start_programming();
				} else {
					self.phase = Phase::Running;
				}
			},
			Phase::Command { shift, count } => {
				let shift = shift | (u8::from(bit) << count);
				let count = count + 1;
				if count < Command::WIDTH {
					self.phase = Phase::Command { shift, count };
				} else {
					self.execute(shift);
				}
			},
			Phase::Load { command, shift, count } => {
				let shift = shift | (u16::from(bit) << count);
				let count = count + 1;
				if count < 16 {
					self.phase = Phase::Load { command, shift, count };
				} else {
					self.phase = Phase::Command { shift: 0, count: 0 };
					self.load(command, shift);
				}
			},
			Phase::Read { frame, count } => {
				if count + 1 < 16 {
					self.phase = Phase::Read { frame, count: count + 1 };
				} else {
					self.phase = Phase::Command { shift: 0, count: 0 };
				}
			},
		}
	}

	fn reset_edge(&mut self, level: bool) {
		match (self.entry, level) {
			(ProgrammingMode::LowVoltage, false) => {
				self.phase = Phase::Key { shift: 0, count: 0 };
			},
			(ProgrammingMode::HighVoltage, true) => self.start_programming(),
			_ => self.phase = Phase::Running,
		}
	}
}

impl Lines for Target {
	fn set_direction(&mut self, line: Line, direction: Direction) {
		match line {
			Line::Clock => self.clock_dir = direction,
			Line::Data => self.data_dir = direction,
			Line::Reset => (),
		}
	}

	fn write(&mut self, line: Line, value: bool) {
		match line {
			Line::Clock => {
				let previous = self.clock_level;
				self.clock_level = value;
				if !previous && value {
					self.rising_edge();
				} else if previous && !value {
					self.falling_edge();
				}
			},
			Line::Data => self.data_level = value,
			Line::Reset => {
				let previous = self.reset_level;
				self.reset_level = value;
				if previous != value {
					self.reset_edge(value);
				}
			},
		}
	}

	fn read(&mut self, line: Line) -> bool {
		match line {
			Line::Clock => self.clock_level,
			Line::Data if self.data_dir == Direction::Input => self.out,
			Line::Data => self.data_level,
			Line::Reset => self.reset_level,
		}
	}

	fn delay(&mut self) {
	}

	fn wait(&mut self, duration: Duration) {
		self.waits.push(duration);
	}
}
