use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use gbcore::config::Config;
use gbcore::{Cartridge, Emulator};

#[derive(Parser)]
#[command(name = "gbcore")]
#[command(about = "Runs a Game Boy ROM on the DMG CPU core")]
struct Args {
    /// Path to the Game Boy ROM file
    rom_path: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Log every executed instruction
    #[arg(long)]
    trace: bool,

    /// Stop after this many clock cycles
    #[arg(long, value_name = "N")]
    cycles: Option<u64>,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    if args.trace {
        config.trace = true;
    }
    if args.debug && !config.trace {
        config.log_level = "debug".to_string();
    }
    if let Some(cycles) = args.cycles {
        config.max_cycles = cycles;
    }

    let mut builder = env_logger::Builder::from_default_env();
    if std::env::var("RUST_LOG").is_err() {
        builder.filter_level(config.level_filter());
    }
    builder.init();

    log::info!("Loading ROM: {}", args.rom_path);
    let cartridge = match Cartridge::load(&args.rom_path) {
        Ok(cart) => cart,
        Err(e) => {
            log::error!("Error loading ROM: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut emulator = Emulator::new(Box::new(cartridge));
    let result = run(&mut emulator, &config);

    log::info!(
        "Stopped after {} cycles ({} frames, {:.2}s of machine time)",
        emulator.cycles(),
        emulator.frame_count(),
        emulator.emulated_seconds()
    );

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

/// Run frame by frame until the cycle limit or a fatal error, draining the
/// serial port after each frame.
fn run(emulator: &mut Emulator, config: &Config) -> Result<(), gbcore::CpuError> {
    let mut stdout = io::stdout();

    loop {
        let result = emulator.step_frame();
        drain_serial(emulator, config, &mut stdout);
        result?;

        if config.max_cycles != 0 && emulator.cycles() >= config.max_cycles {
            return Ok(());
        }
    }
}

fn drain_serial(emulator: &mut Emulator, config: &Config, stdout: &mut io::Stdout) {
    let bytes = emulator.take_serial_output();
    if bytes.is_empty() {
        return;
    }
    if config.serial_to_stdout {
        if let Err(e) = stdout.write_all(&bytes).and_then(|_| stdout.flush()) {
            log::warn!("Failed to write serial output: {}", e);
        }
    } else {
        log::info!("Serial: {}", String::from_utf8_lossy(&bytes));
    }
}
