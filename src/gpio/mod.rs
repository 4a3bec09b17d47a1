/// Three digital lines used to talk to the target: CLOCK (ICSPCLK), DATA
/// (ICSPDAT) and RESET (MCLR / VPP).
///
/// Each line can be switched between input and output at any time; the
/// serial protocol turns DATA around for every read.

use std::thread;
use std::time::{
	Duration,
	Instant,
};

mod linux;

pub use self::linux::{
	open_gpiomem,
	DEFAULT_GPIOMEM,
};

const CLOCK_EDGE: Duration = Duration::from_micros(1);

pub fn reliable_sleep(mut duration: Duration) {
	loop {
		let now = Instant::now();
		thread::sleep(duration);
		let elapsed = now.elapsed();
		if elapsed >= duration {
			return;
		}
		duration -= elapsed;
	}
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Line {
	Clock,
	Data,
	Reset,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Direction {
	Input,
	Output,
}

/// BCM GPIO numbers of the lines
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct PinConfig {
	pub clock: u8,
	pub data: u8,
	pub reset: u8,
}

impl PinConfig {
	pub fn pin(&self, line: Line) -> u8 {
		match line {
			Line::Clock => self.clock,
			Line::Data => self.data,
			Line::Reset => self.reset,
		}
	}
}

impl Default for PinConfig {
	// header pins 7, 24 and 21
	fn default() -> Self {
		PinConfig {
			clock: 4,
			data: 8,
			reset: 9,
		}
	}
}

pub trait Lines {
	fn set_direction(&mut self, line: Line, direction: Direction);
	fn write(&mut self, line: Line, value: bool);
	fn read(&mut self, line: Line) -> bool;

	// delay for (at least) one clock edge
	fn delay(&mut self) {
		reliable_sleep(CLOCK_EDGE);
	}

	// settle times and programming pulses
	fn wait(&mut self, duration: Duration) {
		reliable_sleep(duration);
	}
}

impl<'a, L: ?Sized + Lines> Lines for &'a mut L {
	fn set_direction(&mut self, line: Line, direction: Direction) {
		(**self).set_direction(line, direction)
	}

	fn write(&mut self, line: Line, value: bool) {
		(**self).write(line, value)
	}

	fn read(&mut self, line: Line) -> bool {
		(**self).read(line)
	}

	fn delay(&mut self) {
		(**self).delay()
	}

	fn wait(&mut self, duration: Duration) {
		(**self).wait(duration)
	}
}
