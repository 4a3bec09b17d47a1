//! Driver for the PIC based two channel A/D converter on the I2C bus.
//!
//! The firmware exposes SMBus "commands" (registers); conversions end up in
//! a FIFO which is drained with block reads.

use std::io;
use std::thread::sleep;
use std::time::{
	Duration,
	Instant,
};

use failure::Fail;

use crate::AResult;
use crate::i2c::{
	SmBus,
	validate_address,
};

mod sample;

pub use self::sample::{
	PACKED_SIZE,
	Sample,
	UNPACKED_SIZE,
	Version,
};

pub const CMD_MODE: u8 = 0;
pub const CMD_TIMER: u8 = 1;
pub const CMD_DATA_NUMBER: u8 = 2;
pub const CMD_READ_DATA: u8 = 3;
pub const CMD_READ_PACK_DATA: u8 = 4;
pub const CMD_SLAVE_ADDRESS: u8 = 5;
pub const CMD_TIMER_COUNTER: u8 = 6;
pub const CMD_VERSION: u8 = 7;
pub const CMD_OSC_TUNE: u8 = 8;
pub const CMD_FLASH_SETTINGS: u8 = 9;

/// written to FLASH_SETTINGS to store address and oscillator tuning
pub const FLASH_MAGIC: u16 = 0xaa55;

/// first byte of the VERSION register on a genuine device
pub const DEVICE_ID: u8 = 0xe7;

// block reads must stay below 32 bytes
pub const MAX_UNPACKED_SAMPLES: usize = 7;
pub const MAX_PACKED_SAMPLES: usize = 10;

pub const OSC_TUNE_MIN: i8 = -32;
pub const OSC_TUNE_MAX: i8 = 31;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Mode {
	Off,
	/// one conversion, then back to off
	Single,
	/// convert on the external trigger input
	Trigger,
	/// convert periodically, see `A2d::set_timer`
	Timer,
}

impl Mode {
	pub fn code(self) -> u8 {
		match self {
			Mode::Off => 0,
			Mode::Single => 3,
			Mode::Trigger => 5,
			Mode::Timer => 7,
		}
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Fail)]
#[fail(display = "oscillator tune {} out of range -32..=31", tune)]
pub struct OscTuneOutOfRange {
	pub tune: i8,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Fail)]
#[fail(display = "no A2D device found at I2C address 0x{:02x}", address)]
pub struct DeviceNotFound {
	pub address: u16,
}

/// 6-bit two's complement register value to signed
pub fn osc_tune_from_register(value: u8) -> i8 {
	let value = value & 0x3f;
	if value > 31 {
		value as i8 - 64
	} else {
		value as i8
	}
}

/// Result of an oscillator calibration
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Calibration {
	pub tune: i8,
	/// measured rate minus target rate, samples per second
	pub delta: f64,
}

/// Walk the tune value away from `start` in the direction that brings the
/// measured rate closer to `target`; stop as soon as it gets worse or the
/// end of the tune range is reached.
pub fn calibrate<F>(start: i8, target: f64, mut measure: F) -> AResult<Calibration>
where
	F: FnMut(i8) -> AResult<f64>,
{
	let mut best = Calibration {
		tune: start,
		delta: measure(start)? - target,
	};
	let step = if best.delta > 0.0 { -1 } else { 1 };
	let mut tune = start;
	loop {
		tune = match tune.checked_add(step) {
			Some(t) => t,
			None => break,
		};
		if tune < OSC_TUNE_MIN || tune > OSC_TUNE_MAX {
			break;
		}
		let delta = measure(tune)? - target;
		if best.delta.abs() < delta.abs() {
			break;
		}
		best = Calibration { tune, delta };
	}
	Ok(best)
}

pub struct A2d<B> {
	bus: B,
}

impl<B: SmBus> A2d<B> {
	pub fn new(bus: B) -> Self {
		A2d { bus }
	}

	pub fn bus(&mut self) -> &mut B {
		&mut self.bus
	}

	pub fn set_mode(&mut self, mode: Mode) -> io::Result<()> {
		trace!("mode {:?}", mode);
		self.bus.write_byte_data(CMD_MODE, mode.code())
	}

	/// sample period in units of 100µs (10 = 1000 samples/s)
	pub fn set_timer(&mut self, value: u16) -> io::Result<()> {
		self.bus.write_word_data(CMD_TIMER, value)
	}

	/// number of samples waiting in the FIFO
	pub fn data_count(&mut self) -> io::Result<u8> {
		self.bus.read_byte_data(CMD_DATA_NUMBER)
	}

	fn read_block(&mut self, command: u8, len: usize) -> io::Result<Vec<u8>> {
		let block = self.bus.read_i2c_block_data(command, len)?;
		if block.len() != len {
			return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "short I2C block read"));
		}
		Ok(block)
	}

	/// read `count` samples (clamped to 1..=7) in the 4-byte layout
	pub fn read_samples(&mut self, count: usize) -> io::Result<Vec<Sample>> {
		let count = count.max(1).min(MAX_UNPACKED_SAMPLES);
		let block = self.read_block(CMD_READ_DATA, count * UNPACKED_SIZE)?;
		Ok(Sample::decode_unpacked(&block))
	}

	/// read `count` samples (clamped to 1..=10) in the 3-byte layout
	pub fn read_packed_samples(&mut self, count: usize) -> io::Result<Vec<Sample>> {
		let count = count.max(1).min(MAX_PACKED_SAMPLES);
		let block = self.read_block(CMD_READ_PACK_DATA, count * PACKED_SIZE)?;
		Ok(Sample::decode_packed(&block))
	}

	/// drain up to `max` packed samples if more than one is waiting
	pub fn fetch_packed(&mut self, max: usize) -> io::Result<Vec<Sample>> {
		let waiting = usize::from(self.data_count()?);
		if waiting > 1 {
			self.read_packed_samples(waiting.min(max))
		} else {
			Ok(Vec::new())
		}
	}

	pub fn version(&mut self) -> io::Result<Version> {
		let block = self.read_block(CMD_VERSION, 4)?;
		Ok(Version::from_bytes([block[0], block[1], block[2], block[3]]))
	}

	/// whether an A2D firmware answers at the selected address
	pub fn is_present(&mut self) -> io::Result<bool> {
		Ok(self.bus.read_byte_data(CMD_VERSION)? == DEVICE_ID)
	}

	pub fn osc_tune(&mut self) -> io::Result<i8> {
		Ok(osc_tune_from_register(self.bus.read_byte_data(CMD_OSC_TUNE)?))
	}

	pub fn set_osc_tune(&mut self, tune: i8) -> AResult<()> {
		if tune < OSC_TUNE_MIN || tune > OSC_TUNE_MAX {
			return Err(OscTuneOutOfRange { tune }.into());
		}
		self.bus.write_byte_data(CMD_OSC_TUNE, tune as u8)?;
		Ok(())
	}

	/// conversions counted by the timer since it was started
	pub fn timer_counter(&mut self) -> io::Result<u16> {
		self.bus.read_word_data(CMD_TIMER_COUNTER)
	}

	/// store slave address and oscillator tuning in the device EEPROM
	pub fn flash_settings(&mut self) -> io::Result<()> {
		self.bus.write_word_data(CMD_FLASH_SETTINGS, FLASH_MAGIC)
	}

	/// Start a single conversion and read it back after `settle`
	pub fn single_conversion(&mut self, packed: bool, settle: Duration) -> io::Result<Sample> {
		self.set_mode(Mode::Single)?;
		sleep(settle);
		debug!("{} data waiting", self.data_count()?);
		let samples = if packed {
			self.read_packed_samples(1)?
		} else {
			self.read_samples(1)?
		};
		Ok(samples[0])
	}

	/// Samples per second the timer produces at timer value `timer` with
	/// tune value `tune`, measured over `window`
	pub fn measure_rate(&mut self, tune: i8, timer: u16, window: Duration) -> AResult<f64> {
		self.set_mode(Mode::Off)?;
		self.set_osc_tune(tune)?;
		self.set_timer(timer)?;
		self.set_mode(Mode::Timer)?;

		let start = Instant::now();
		let first = self.timer_counter()?;
		sleep(window);
		let elapsed = start.elapsed();
		let second = self.timer_counter()?;
		self.set_mode(Mode::Off)?;

		let count = second.wrapping_sub(first);
		let secs = elapsed.as_secs() as f64 + f64::from(elapsed.subsec_nanos()) * 1e-9;
		let rate = f64::from(count) / secs;
		info!("OscTune={}  Rate={:.1} Sample/sec count={} elapse={:.3}", tune, rate, count, secs);
		Ok(rate)
	}

	/// Tune the oscillator so the timer hits `target` samples per second,
	/// then store the best value in the device.
	pub fn calibrate_oscillator(&mut self, target: f64, timer: u16, window: Duration) -> AResult<Calibration> {
		let start = self.osc_tune()?;
		let best = calibrate(start, target, |tune| self.measure_rate(tune, timer, window))?;
		self.set_osc_tune(best.tune)?;
		self.flash_settings()?;
		Ok(best)
	}

	/// Move the device to a new slave address.
	///
	/// The device must answer at its current address; the new address is
	/// stored in its EEPROM and the bus switched over afterwards.
	pub fn change_address(&mut self, current: u16, new: u16, settle: Duration) -> AResult<()> {
		validate_address(current)?;
		let new = validate_address(new)?;
		if !self.is_present()? {
			return Err(DeviceNotFound { address: current }.into());
		}
		self.bus.write_byte_data(CMD_SLAVE_ADDRESS, new as u8)?;
		self.flash_settings()?;
		sleep(settle);
		self.bus.set_slave_address(new)?;
		if !self.is_present()? {
			return Err(DeviceNotFound { address: new }.into());
		}
		Ok(())
	}
}
