use std::fmt;

use failure::Fail;

use crate::gpio::Lines;
use crate::image::SourceImage;

use super::{
	DeviceProfile,
	MemoryOperations,
	Mismatch,
	Region,
	image_requests_lvp,
};

/// Steps of a full device programming run, in order
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Stage {
	BulkErase,
	ProgramBlankCheck,
	DataBlankCheck,
	ProgramBurn,
	ProgramCheck,
	DataBurn,
	DataCheck,
	ConfigBurn,
	ConfigCheck,
}

impl fmt::Display for Stage {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(match self {
			Stage::BulkErase => "Bulk erase",
			Stage::ProgramBlankCheck => "Program blank check",
			Stage::DataBlankCheck => "Data blank check",
			Stage::ProgramBurn => "Writing program",
			Stage::ProgramCheck => "Program check",
			Stage::DataBurn => "Writing data",
			Stage::DataCheck => "Data check",
			Stage::ConfigBurn => "Writing config",
			Stage::ConfigCheck => "Config check",
		})
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Fail)]
#[fail(display = "{} failed: {}", stage, mismatch)]
pub struct StageFailed {
	pub stage: Stage,
	pub mismatch: Mismatch,
}

fn run_stage<H, F>(hw: &mut H, stage: Stage, f: F) -> Result<(), StageFailed>
where
	H: Lines + ?Sized,
	F: FnOnce(&mut H) -> Result<(), Mismatch>,
{
	info!("{}", stage);
	match f(hw) {
		Ok(()) => {
			debug!("{}: passed", stage);
			Ok(())
		},
		Err(mismatch) => {
			error!("{}: {}", stage, mismatch);
			Err(StageFailed { stage, mismatch })
		},
	}
}

/// Erase, blank check, burn and verify all regions of a detected device.
///
/// Stops at the first failing stage. Returns whether the image requested LVP
/// itself (it gets forced on either way).
pub fn program_memory<H>(hw: &mut H, device: &DeviceProfile, image: &SourceImage) -> Result<bool, StageFailed>
where
	H: Lines + ?Sized,
{
	let layout = device.layout;

	run_stage(hw, Stage::BulkErase, |hw| {
		hw.bulk_erase();
		Ok(())
	})?;
	run_stage(hw, Stage::ProgramBlankCheck, |hw| hw.blank_check(Region::Program, device.program_size))?;
	run_stage(hw, Stage::DataBlankCheck, |hw| hw.blank_check(Region::Data, device.data_size))?;
	run_stage(hw, Stage::ProgramBurn, |hw| {
		hw.burn(Region::Program, image, layout.program_base, device.program_size)
	})?;
	run_stage(hw, Stage::ProgramCheck, |hw| {
		hw.check(Region::Program, image, layout.program_base, device.program_size)
	})?;
	run_stage(hw, Stage::DataBurn, |hw| {
		hw.burn(Region::Data, image, layout.data_base, device.data_size)
	})?;
	run_stage(hw, Stage::DataCheck, |hw| {
		hw.check(Region::Data, image, layout.data_base, device.data_size)
	})?;
	run_stage(hw, Stage::ConfigBurn, |hw| hw.config_burn(image, layout.config_base))?;
	run_stage(hw, Stage::ConfigCheck, |hw| hw.config_check(image, layout.config_base))?;

	let lvp_requested = image_requests_lvp(image, layout.config_base);
	if !lvp_requested {
		warn!("LVP not set in hex file, LVP was forced on");
	}
	Ok(lvp_requested)
}
