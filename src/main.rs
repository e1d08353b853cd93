use clap::Parser;
use dmgcore::cartridge::load_cartridge;
use dmgcore::debugger::{Breakpoint, DebugConfig};
use dmgcore::error::{DmgError, IoSnafu, LoggerSnafu};
use dmgcore::gameboy::{Device, Exit};
use dmgcore::joypad::NoInput;
use dmgcore::lr35902::sm83::Register;
use dmgcore::renderer::HeadlessRenderer;
use dmgcore::storage::FileStorage;
use log::{error, info, LevelFilter};
use snafu::ResultExt;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about = "Headless DMG runner")]
struct Args {
    /// Cartridge image (.gb, .gbc or a .zip containing one)
    rom: PathBuf,

    /// 256-byte boot image; without one the cartridge starts at $0100 in post-boot state
    #[arg(long)]
    boot: Option<PathBuf>,

    /// Directory for battery saves, defaults to the cartridge's directory
    #[arg(long)]
    save_dir: Option<PathBuf>,

    /// Break before executing the instruction at ADDR
    #[arg(long = "breakpoint", value_name = "ADDR", value_parser = parse_address)]
    breakpoints: Vec<u16>,

    /// Break after an instruction reads ADDR
    #[arg(long = "watch-read", value_name = "ADDR", value_parser = parse_address)]
    watch_reads: Vec<u16>,

    /// Break after an instruction writes ADDR
    #[arg(long = "watch-write", value_name = "ADDR", value_parser = parse_address)]
    watch_writes: Vec<u16>,

    /// Break before executing any instruction with opcode OP
    #[arg(long = "break-opcode", value_name = "OP", value_parser = parse_opcode)]
    break_opcodes: Vec<u8>,

    /// Stop after this many T-cycles
    #[arg(long)]
    cycles: Option<u64>,

    /// off, error, warn, info, debug or trace
    #[arg(long, default_value = "info", value_parser = parse_level)]
    log_level: LevelFilter,
}

fn parse_hex(value: &str) -> Result<u32, String> {
    let digits = value
        .trim_start_matches("0x")
        .trim_start_matches("0X")
        .trim_start_matches('$');
    u32::from_str_radix(digits, 16).map_err(|e| format!("invalid hex value \"{}\": {}", value, e))
}

fn parse_address(value: &str) -> Result<u16, String> {
    let address = parse_hex(value)?;
    u16::try_from(address).map_err(|_| format!("address ${:x} is out of range", address))
}

fn parse_opcode(value: &str) -> Result<u8, String> {
    let opcode = parse_hex(value)?;
    u8::try_from(opcode).map_err(|_| format!("opcode ${:x} is out of range", opcode))
}

fn parse_level(value: &str) -> Result<LevelFilter, String> {
    value.parse().map_err(|_| format!("unknown log level \"{}\"", value))
}

fn setup_logger(level: LevelFilter) -> Result<(), DmgError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("[{}] [{}] {}", record.level(), record.target(), message))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
        .context(LoggerSnafu)
}

fn debug_config(args: &Args) -> DebugConfig {
    let mut config = DebugConfig::new();
    config.breakpoints.extend(args.breakpoints.iter().map(|&a| Breakpoint::Address(a)));
    config.breakpoints.extend(args.watch_reads.iter().map(|&a| Breakpoint::Read(a)));
    config.breakpoints.extend(args.watch_writes.iter().map(|&a| Breakpoint::Write(a)));
    config.breakpoints.extend(args.break_opcodes.iter().map(|&op| Breakpoint::Opcode(op)));
    config
}

fn run(args: Args) -> Result<(), DmgError> {
    setup_logger(args.log_level)?;

    let cartridge = load_cartridge(&args.rom)?;
    let boot = match &args.boot {
        Some(path) => Some(std::fs::read(path).context(IoSnafu {
            path: path.display().to_string(),
        })?),
        None => None,
    };

    let mut device = Device::new(
        boot,
        cartridge,
        Box::new(HeadlessRenderer::new()),
        Box::new(NoInput),
        debug_config(&args),
    )?;

    let save_name = args
        .rom
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| device.header().title.clone());
    let save_dir = args
        .save_dir
        .clone()
        .or_else(|| args.rom.parent().map(PathBuf::from))
        .unwrap_or_default();
    let mut storage = FileStorage::new(save_dir);
    device.load_ram(&storage, &save_name)?;

    loop {
        let exit = match args.cycles {
            Some(limit) => device.run_for(limit.saturating_sub(device.cycles()))?,
            None => device.start()?,
        };

        match exit {
            Exit::Breakpoint(event) => {
                let pc = device.cpu().read_register16(&Register::PC);
                info!("{}", event);
                info!("{}", device.cpu());
                match device.disassemble(pc) {
                    Ok(instruction) => info!("${:04x}: {}", pc, instruction),
                    Err(e) => error!("{}", e),
                }
            }
            Exit::CyclesElapsed | Exit::Requested => break,
        }
    }

    info!("Stopped after {} cycles", device.cycles());
    device.save_ram(&mut storage, &save_name)?;
    Ok(())
}

fn main() {
    if let Err(e) = run(Args::parse()) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
