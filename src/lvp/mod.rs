/// Low voltage (and high voltage) serial programming of enhanced midrange
/// PIC12/16 devices (14-bit core) through three GPIO lines.
///
/// Framing:
/// - entry (LVP): MCLR low, then the 32-bit key "MCHP" plus one clock
/// - commands: 6 bits, LSB first
/// - data: 16 bits, LSB first: start bit (0), 14-bit payload, stop bit (0)
///
/// DATA is sampled by the target on the falling CLOCK edge; when reading the
/// target drives DATA after the rising edge.
///
/// Memory is addressed through an internal pointer that can only be reset
/// to 0, set to 0x8000 (LOAD CONFIGURATION) or incremented by one.

mod commands;
mod device;
mod low_level;
mod operations;
mod pipeline;
mod session;

#[cfg(test)]
pub(crate) mod sim;

pub use self::commands::Command;

pub use self::device::{
	DEVICES,
	DeviceId,
	DeviceInfo,
	DeviceProfile,
	UnsupportedDevice,
	identify_device,
	lookup,
	read_device_id,
};

pub use self::low_level::{
	LowLevel,
	frame_payload,
	frame_word,
};

pub use self::operations::{
	LVP_CONFIG_WORD,
	LVP_ENABLE,
	MemoryOperations,
	Mismatch,
	Region,
	config_value,
	image_requests_lvp,
};

pub use self::pipeline::{
	Stage,
	StageFailed,
	program_memory,
};

pub use self::session::{
	ProgrammingMode,
	Session,
};

use crate::gpio::Lines;
use crate::image::{
	HexLayout,
	SourceImage,
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct BurnReport {
	pub device: DeviceProfile,
	/// whether the image enabled LVP itself
	pub lvp_requested: bool,
}

/// Detect the connected device without touching its memory
pub fn identify<H>(lines: &mut H, mode: ProgrammingMode, layout: HexLayout) -> crate::AResult<DeviceProfile>
where
	H: Lines + ?Sized,
{
	let mut session = Session::enter(lines, mode);
	let device = identify_device(&mut *session, layout)?;
	info!("Cpu: {}", device);
	Ok(device)
}

/// Full programming run: enter programming mode, detect the device, erase,
/// burn and verify; the lines are released on every path.
pub fn burn<H>(lines: &mut H, mode: ProgrammingMode, image: &SourceImage, layout: HexLayout) -> crate::AResult<BurnReport>
where
	H: Lines + ?Sized,
{
	let mut session = Session::enter(lines, mode);
	let device = identify_device(&mut *session, layout)?;
	info!("Cpu: {}", device);

	let lvp_requested = program_memory(&mut *session, &device, image)?;

	Ok(BurnReport {
		device,
		lvp_requested,
	})
}
