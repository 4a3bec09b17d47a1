use std::time::Duration;

use crate::gpio::{
	Direction,
	Line,
	Lines,
};

use super::Command;

/// "MCHP", sent LSB first followed by one extra clock
pub const MAGIC_KEY: u64 = 0x4d43_4850;
pub const MAGIC_CLOCKS: usize = 33;

pub const WORD_WIDTH: usize = 16;
pub const PAYLOAD_MASK: u16 = 0x3fff;

// MCLR high before starting the entry sequence
const ENTRY_SETTLE: Duration = Duration::from_millis(100);
// MCLR low before the key
const LVP_HOLD: Duration = Duration::from_millis(300);
// VPP applied before the first command
const VPP_SETTLE: Duration = Duration::from_millis(100);

/// start bit (0), 14-bit payload, stop bit (0)
pub fn frame_word(payload: u16) -> u16 {
	(payload << 1) & 0x7ffe
}

pub fn frame_payload(frame: u16) -> u16 {
	(frame >> 1) & PAYLOAD_MASK
}

trait InternalLowLevel: Lines {
	// DATA is set up before the rising edge and held until the target
	// latches it on the falling edge
	fn clock_out(&mut self, bit: bool) {
		self.write(Line::Data, bit);
		self.write(Line::Clock, true);
		self.delay();
		self.write(Line::Clock, false);
		self.delay();
	}

	// the target drives DATA after the rising edge; sample before dropping
	// CLOCK again
	fn clock_in(&mut self) -> bool {
		self.write(Line::Clock, true);
		self.delay();
		let bit = self.read(Line::Data);
		self.write(Line::Clock, false);
		self.delay();
		bit
	}
}

impl<H: Lines + ?Sized> InternalLowLevel for H {
}

pub trait LowLevel: Lines {
	// send `num` lowest bits from value, starting with lowest bit
	fn send_bits(&mut self, value: u64, num: usize) {
		assert!(num <= 64);
		self.set_direction(Line::Data, Direction::Output);
		for bit in 0..num {
			self.clock_out(0 != (value >> bit) & 1);
		}
	}

	fn send_magic(&mut self) {
		self.send_bits(MAGIC_KEY, MAGIC_CLOCKS);
	}

	fn send_command(&mut self, command: Command) {
		self.send_bits(u64::from(command.code()), Command::WIDTH);
	}

	fn load_word(&mut self, payload: u16) {
		self.send_bits(u64::from(frame_word(payload)), WORD_WIDTH);
	}

	/// raw 16-bit frame; use `frame_payload` to get the word
	fn read_word(&mut self) -> u16 {
		self.set_direction(Line::Data, Direction::Input);
		let mut frame = 0u16;
		for bit in 0..WORD_WIDTH {
			if self.clock_in() {
				frame |= 1u16 << bit;
			}
		}
		frame
	}

	fn enter_low_voltage(&mut self) {
		self.set_direction(Line::Reset, Direction::Output);
		self.write(Line::Reset, true);
		self.wait(ENTRY_SETTLE);

		self.set_direction(Line::Clock, Direction::Output);
		self.write(Line::Clock, false);
		self.set_direction(Line::Data, Direction::Output);
		self.write(Line::Data, false);

		debug!("LVP on");
		self.write(Line::Reset, false);
		self.wait(LVP_HOLD);

		self.send_magic();
	}

	fn release_low_voltage(&mut self) {
		self.set_direction(Line::Data, Direction::Input);
		self.set_direction(Line::Clock, Direction::Input);
		self.write(Line::Reset, true);
		debug!("LVP off");
	}

	// MCLR switches an external VPP supply
	fn enter_high_voltage(&mut self) {
		self.set_direction(Line::Reset, Direction::Output);
		self.write(Line::Reset, false);
		self.wait(ENTRY_SETTLE);

		self.set_direction(Line::Clock, Direction::Output);
		self.write(Line::Clock, false);
		self.set_direction(Line::Data, Direction::Output);
		self.write(Line::Data, false);

		debug!("VPP on");
		self.write(Line::Reset, true);
		self.wait(VPP_SETTLE);
	}

	fn release_high_voltage(&mut self) {
		self.set_direction(Line::Data, Direction::Input);
		self.set_direction(Line::Clock, Direction::Input);
		self.write(Line::Reset, false);
		debug!("VPP off");
	}
}

impl<H: Lines + ?Sized> LowLevel for H {
}

#[cfg(test)]
mod tests {
	use std::collections::VecDeque;

	use super::*;

	// feeds every bit clocked out back on the following reads
	#[derive(Default)]
	struct Loopback {
		clock: bool,
		data_output: bool,
		data: bool,
		out: bool,
		sent: Vec<bool>,
		// DATA as seen on rising CLOCK edges while driving
		rising: Vec<bool>,
		queue: VecDeque<bool>,
	}

	impl Lines for Loopback {
		fn set_direction(&mut self, line: Line, direction: Direction) {
			if line == Line::Data {
				self.data_output = direction == Direction::Output;
			}
		}

		fn write(&mut self, line: Line, value: bool) {
			match line {
				Line::Clock => {
					if !self.clock && value && !self.data_output {
						self.out = self.queue.pop_front().unwrap_or(false);
					}
					if !self.clock && value && self.data_output {
						self.rising.push(self.data);
					}
					if self.clock && !value && self.data_output {
						self.sent.push(self.data);
						self.queue.push_back(self.data);
					}
					self.clock = value;
				},
				Line::Data => self.data = value,
				Line::Reset => (),
			}
		}

		fn read(&mut self, line: Line) -> bool {
			match line {
				Line::Data if !self.data_output => self.out,
				Line::Data => self.data,
				Line::Clock => self.clock,
				Line::Reset => false,
			}
		}

		fn delay(&mut self) {
		}

		fn wait(&mut self, _duration: Duration) {
		}
	}

	#[test]
	fn words_survive_loopback() {
		let mut lb = Loopback::default();
		for value in 0..=PAYLOAD_MASK {
			lb.load_word(value);
			let frame = lb.read_word();
			assert_eq!(frame, value << 1);
			assert_eq!(frame_payload(frame), value);
			assert!(lb.queue.is_empty());
		}
	}

	#[test]
	fn framing_drops_bits_above_payload() {
		assert_eq!(frame_word(0xffff), 0x7ffe);
		assert_eq!(frame_word(0x1234), 0x2468);
		assert_eq!(frame_payload(0xffff), 0x3fff);
		assert_eq!(frame_payload(0x2468), 0x1234);
	}

	#[test]
	fn commands_go_out_lsb_first() {
		let mut lb = Loopback::default();
		lb.send_command(Command::ResetAddress);
		assert_eq!(lb.sent, vec![false, true, true, false, true, false]);
	}

	#[test]
	fn data_is_stable_across_the_clock_pulse() {
		let mut lb = Loopback::default();
		lb.send_command(Command::LoadProgram);
		lb.load_word(0x2aaa);
		assert_eq!(lb.sent.len(), Command::WIDTH + WORD_WIDTH);
		assert_eq!(lb.rising, lb.sent);
	}

	#[test]
	fn magic_is_33_clocks() {
		let mut lb = Loopback::default();
		lb.send_magic();
		assert_eq!(lb.sent.len(), MAGIC_CLOCKS);
		let key = lb.sent.iter().enumerate()
			.fold(0u64, |acc, (i, &b)| acc | (u64::from(b) << i));
		assert_eq!(key, MAGIC_KEY);
		// "P", "H", "C", "M"
		assert_eq!(&lb.sent[0..8], &[false, false, false, false, true, false, true, false]);
	}

	#[test]
	fn release_leaves_lines_safe() {
		struct Recorder(Vec<(Line, Option<Direction>, Option<bool>)>);
		impl Lines for Recorder {
			fn set_direction(&mut self, line: Line, direction: Direction) {
				self.0.push((line, Some(direction), None));
			}
			fn write(&mut self, line: Line, value: bool) {
				self.0.push((line, None, Some(value)));
			}
			fn read(&mut self, _line: Line) -> bool {
				false
			}
		}

		let mut rec = Recorder(Vec::new());
		rec.release_low_voltage();
		assert_eq!(rec.0, vec![
			(Line::Data, Some(Direction::Input), None),
			(Line::Clock, Some(Direction::Input), None),
			(Line::Reset, None, Some(true)),
		]);

		let mut rec = Recorder(Vec::new());
		rec.release_high_voltage();
		assert_eq!(rec.0.last(), Some(&(Line::Reset, None, Some(false))));
	}
}
