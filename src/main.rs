use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

use emu::gba::Gba;

#[derive(Parser, Debug)]
#[command(version, about = "Headless Game Boy Advance core runner.", long_about = None)]
struct Args {
    /// BIOS image mapped at address 0.
    #[arg(long)]
    bios: PathBuf,

    /// Game pak ROM image.
    #[arg(long)]
    rom: Option<PathBuf>,

    /// Cycles to run before printing the CPU state.
    #[arg(long, default_value_t = 16_777_216)]
    cycles: u64,

    /// Also write logs to `kumquat.log` in this directory.
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

/// Installs the subscriber. Keep the guard alive until the end of `main` or
/// buffered file logs are lost.
fn init_tracing(log_dir: Option<&PathBuf>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::never(dir, "kumquat.log");
            let (file, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr.and(file))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            None
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let _guard = init_tracing(args.log_dir.as_ref());

    tracing::info!("kumquat v{}", env!("CARGO_PKG_VERSION"));

    let bios = fs::read(&args.bios)?;
    let rom = args.rom.as_ref().map(fs::read).transpose()?;

    let mut gba = Gba::new(&bios, rom)?;
    match &gba.rom {
        Some(rom) if !rom.is_empty() => tracing::info!("loaded {} bytes of ROM", rom.len()),
        _ => tracing::warn!("no game pak inserted"),
    }
    let elapsed = gba.run_for(args.cycles);

    let cpu = &gba.cpu;
    tracing::info!(
        "ran {elapsed} cycles, PC 0x{:08X}, CPSR 0x{:08X} ({:?}, {:?})",
        cpu.current_instruction(),
        u32::from(cpu.cpsr),
        cpu.cpsr.mode(),
        cpu.cpsr.cpu_state(),
    );
    for reg in 0..16 {
        tracing::info!("R{reg:<2} = 0x{:08X}", cpu.registers.register_at(reg));
    }

    Ok(())
}
