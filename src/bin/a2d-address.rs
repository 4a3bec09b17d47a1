#[macro_use]
extern crate clap;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate pic_lvp_burn;
use pic_lvp_burn::*;

use std::process::exit;
use std::time::Duration;

use pic_lvp_burn::a2d::A2d;

// the device needs some time to write its EEPROM
const FLASH_SETTLE: Duration = Duration::from_secs(1);

fn parse_address(name: &str, s: &str) -> AResult<u16> {
	let value = parse_number(s)?;
	ensure!(value <= 0xffff, "{} I2C address {} is invalid", name, s);
	match i2c::validate_address(value as u16) {
		Ok(a) => Ok(a),
		Err(e) => bail!("{} {}", name, e),
	}
}

fn main_app() -> AResult<()> {
	let matches = clap_app!(@app (app_from_crate!())
		(@arg bus: --bus +takes_value "I2C bus number (default 1)")
		(@arg CURRENT: +required "Current slave address (decimal or 0x hex)")
		(@arg NEW: +required "New slave address (decimal or 0x hex)")
	).get_matches();

	let bus = match matches.value_of("bus") {
		Some(b) => parse_number(b)?,
		None => 1,
	};
	let current = parse_address("Current", matches.value_of("CURRENT").unwrap_or_default())?;
	let new = parse_address("New", matches.value_of("NEW").unwrap_or_default())?;

	let dev = match i2c::open_bus(bus, current) {
		Ok(dev) => dev,
		Err(e) => bail!("Unable to open I2C bus {}: {}", bus, e),
	};
	let mut a2d = A2d::new(dev);
	a2d.change_address(current, new, FLASH_SETTLE)?;

	info!("Device at 0x{:02X} is now at 0x{:02X}", current, new);
	Ok(())
}

fn main() {
	env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

	if let Err(e) = main_app() {
		error!("Error: {}", e);
		exit(1);
	}
}
