#[macro_use]
extern crate clap;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate pic_lvp_burn;
use pic_lvp_burn::*;

use std::process::exit;

use pic_lvp_burn::gpio::PinConfig;
use pic_lvp_burn::image::{
	HexLayout,
	SourceImage,
};
use pic_lvp_burn::lvp::ProgrammingMode;

fn get_param_or<T>(matches: &clap::ArgMatches, name: &str, default: T) -> AResult<T>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => return Ok(default),
	};
	param.parse::<T>().map_err(|e| {
		let e = failure::Error::from(e);
		let msg = format!("invalid parameter {}: {}", name, e);
		e.context(msg).into()
	})
}

fn app() -> clap::App<'static, 'static> {
	clap_app!(@app (app_from_crate!())
		(@arg clock: --clock +takes_value "BCM GPIO of ICSPCLK (default 4, header pin 7)")
		(@arg data: --data +takes_value "BCM GPIO of ICSPDAT (default 8, header pin 24)")
		(@arg mclr: --mclr +takes_value "BCM GPIO of MCLR (default 9, header pin 21)")
		(@arg gpiomem: --gpiomem +takes_value "GPIO register device (default /dev/gpiomem)")
		(@arg hvp: --hvp "MCLR switches VPP; enter programming mode without the LVP key")
		(@arg identify: --identify "Detect the connected device without programming it")
		(@arg HEX: "Intel HEX file to burn (erase only without)")
	)
}

fn main_app() -> AResult<()> {
	let matches = app().get_matches();

	let defaults = PinConfig::default();
	let pins = PinConfig {
		clock: get_param_or(&matches, "clock", defaults.clock)?,
		data: get_param_or(&matches, "data", defaults.data)?,
		reset: get_param_or(&matches, "mclr", defaults.reset)?,
	};
	let gpiomem = matches.value_of("gpiomem").unwrap_or(gpio::DEFAULT_GPIOMEM);
	let mode = if matches.is_present("hvp") {
		ProgrammingMode::HighVoltage
	} else {
		ProgrammingMode::LowVoltage
	};
	let layout = HexLayout::default();
	let identify_only = matches.is_present("identify");

	// a broken file must not leave a half erased chip
	let image = match matches.value_of("HEX") {
		Some(path) => SourceImage::load_hex_file(path)?,
		None => {
			if !identify_only {
				info!("No HEX file given, erasing only");
			}
			SourceImage::new()
		},
	};

	let mut lines = match gpio::open_gpiomem(gpiomem, pins) {
		Ok(lines) => lines,
		Err(e) => bail!("Failed to open {}: {}", gpiomem, e),
	};

	if identify_only {
		let device = lvp::identify(&mut lines, mode, layout)?;
		println!("{}", device);
		return Ok(());
	}

	info!("Loaded {} bytes", image.len());
	let report = lvp::burn(&mut lines, mode, &image, layout)?;
	debug!("{}: LVP requested by image: {}", report.device.name, report.lvp_requested);
	println!("No Error. All Done!");

	Ok(())
}

fn main() {
	env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

	if let Err(e) = main_app() {
		error!("Error: {}", e);
		exit(1);
	}
}
