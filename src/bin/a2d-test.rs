#[macro_use]
extern crate clap;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate pic_lvp_burn;
use pic_lvp_burn::*;

use std::process::exit;
use std::thread::sleep;
use std::time::{
	Duration,
	Instant,
};

use pic_lvp_burn::a2d::{
	A2d,
	Mode,
};
use pic_lvp_burn::i2c::SmBus;

const SINGLE_SETTLE: Duration = Duration::from_secs(1);
const SINGLE_LOOPS: usize = 3;

const TUNE_TARGET: f64 = 5000.0;
// 2 * 100µs => 5000 samples/s
const TUNE_TIMER: u16 = 2;
const TUNE_WINDOW: Duration = Duration::from_secs(2);

// 100 * 100µs => 100 samples/s
const TIMER_VALUE: u16 = 100;
const TIMER_RUN: Duration = Duration::from_millis(10_500);
const TIMER_BATCH: usize = 7;
const TIMER_POLL: Duration = Duration::from_millis(10);
const REPORT_INTERVAL: Duration = Duration::from_secs(1);

fn display_version<B: SmBus>(a2d: &mut A2d<B>) -> AResult<()> {
	let version = a2d.version()?;
	println!("{}", version);
	Ok(())
}

fn test_single<B: SmBus>(a2d: &mut A2d<B>) -> AResult<()> {
	a2d.set_mode(Mode::Off)?;
	for &packed in &[false, true] {
		info!("Single conversion, {} data", if packed { "packed" } else { "unpacked" });
		for _ in 0..SINGLE_LOOPS {
			let sample = a2d.single_conversion(packed, SINGLE_SETTLE)?;
			println!("{}", sample);
			debug!("{} data waiting", a2d.data_count()?);
		}
	}
	Ok(())
}

fn adjust_oscillator<B: SmBus>(a2d: &mut A2d<B>) -> AResult<()> {
	info!("Adjust oscillator to {} samples/s", TUNE_TARGET);
	let best = a2d.calibrate_oscillator(TUNE_TARGET, TUNE_TIMER, TUNE_WINDOW)?;
	println!("Best osctune = {}    frequency {:.0} {:+.3}%", best.tune, TUNE_TARGET, best.delta * 100.0 / TUNE_TARGET);
	Ok(())
}

fn test_timer_mode<B: SmBus>(a2d: &mut A2d<B>) -> AResult<()> {
	info!("Timer mode, 100 samples/s");
	a2d.set_mode(Mode::Off)?;
	a2d.set_timer(TIMER_VALUE)?;
	a2d.set_mode(Mode::Timer)?;

	let start = Instant::now();
	let mut last_report = Duration::from_secs(0);
	let mut total = 0usize;
	let mut latest = None;
	loop {
		let elapsed = start.elapsed();
		if elapsed >= TIMER_RUN {
			break;
		}
		let samples = a2d.fetch_packed(TIMER_BATCH)?;
		total += samples.len();
		if let Some(&sample) = samples.last() {
			latest = Some(sample);
		}
		if elapsed - last_report > REPORT_INTERVAL {
			last_report = elapsed;
			let secs = elapsed.as_secs() as f64 + f64::from(elapsed.subsec_millis()) / 1000.0;
			match latest {
				Some(sample) => println!("{:.1} sec  count={}  latest: {}", secs, total, sample),
				None => println!("{:.1} sec  count={}", secs, total),
			}
		}
		sleep(TIMER_POLL);
	}

	a2d.set_mode(Mode::Off)?;
	Ok(())
}

fn main_app() -> AResult<()> {
	let matches = clap_app!(@app (app_from_crate!())
		(global_setting: clap::AppSettings::VersionlessSubcommands)
		(@arg bus: --bus +takes_value "I2C bus number (default 1)")
		(@arg address: --address +takes_value "A2D slave address (default 0x20)")
		(@subcommand version =>
			(about: "Show firmware version")
		)
		(@subcommand single =>
			(about: "Single conversions, unpacked and packed")
		)
		(@subcommand tune =>
			(about: "Calibrate the oscillator to 5000 samples/s and store the result")
		)
		(@subcommand timer =>
			(about: "Run timer mode at 100 samples/s for 10 seconds")
		)
		(@subcommand all =>
			(about: "Run everything above (default)")
		)
	).get_matches();

	let bus = match matches.value_of("bus") {
		Some(b) => parse_number(b)?,
		None => 1,
	};
	let address = match matches.value_of("address") {
		Some(a) => parse_number(a)?,
		None => 0x20,
	};
	ensure!(address <= 0xffff, "I2C address {} is invalid", address);
	let address = i2c::validate_address(address as u16)?;

	let dev = match i2c::open_bus(bus, address) {
		Ok(dev) => dev,
		Err(e) => bail!("Failed to open I2C bus {}: {}", bus, e),
	};
	let mut a2d = A2d::new(dev);
	println!("I2C Address = 0x{:02X}", address);

	match matches.subcommand_name() {
		Some("version") => display_version(&mut a2d)?,
		Some("single") => test_single(&mut a2d)?,
		Some("tune") => adjust_oscillator(&mut a2d)?,
		Some("timer") => test_timer_mode(&mut a2d)?,
		_ => {
			display_version(&mut a2d)?;
			test_single(&mut a2d)?;
			adjust_oscillator(&mut a2d)?;
			test_timer_mode(&mut a2d)?;
		},
	}

	Ok(())
}

fn main() {
	env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

	if let Err(e) = main_app() {
		error!("Error: {}", e);
		exit(1);
	}
}
