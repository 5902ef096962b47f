use clap::{ArgAction, Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use canfram_dump::{DEFAULT_INJECT_ID, DEFAULT_RECEIVE_ID};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod clear;
pub mod dump;
pub mod flush;
pub mod menu;
pub mod rtc;
pub mod speeds;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Interactive menu (default).
    Menu,
    /// Dump FRAM contents to a file.
    Dump(DumpArgs),
    /// Set the device clock.
    Rtc(RtcArgs),
    /// Erase the FRAM.
    Clear,
    /// Discard whatever the adapter has buffered.
    Flush,
    /// List supported CAN bus speeds.
    Speeds,
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, device: &DeviceArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Menu => menu::run(device, format),
        Command::Dump(args) => dump::run(args, device, format),
        Command::Rtc(args) => rtc::run(args, device, format),
        Command::Clear => clear::run(device, format),
        Command::Flush => flush::run(device, format),
        Command::Speeds => speeds::run(format),
        Command::Version(args) => version::run(args),
    }
}

/// Adapter and bus settings shared by every device command.
#[derive(Args, Debug, Clone)]
pub struct DeviceArgs {
    /// Serial device of the USB-CAN adapter.
    #[arg(
        short = 'd',
        long,
        value_name = "PATH",
        env = "CANFRAM_DEVICE",
        global = true
    )]
    pub device: Option<PathBuf>,
    /// CAN bus speed in bit/s. Unsupported rates fall back to 500000.
    #[arg(
        short = 's',
        long,
        value_name = "BPS",
        default_value_t = 500_000,
        global = true
    )]
    pub speed: u32,
    /// Serial line rate in bit/s.
    #[arg(
        short = 'b',
        long,
        value_name = "BPS",
        default_value_t = 2_000_000,
        global = true
    )]
    pub baudrate: u32,
    /// CAN id (1-3 hex digits) commands are sent on.
    #[arg(short = 'i', long, value_name = "HEX", default_value = DEFAULT_INJECT_ID, global = true)]
    pub inject_id: String,
    /// CAN id (1-3 hex digits) the device answers on. Checked and logged at
    /// start-up; received frames are not filtered by it.
    #[arg(short = 'r', long, value_name = "HEX", default_value = DEFAULT_RECEIVE_ID, global = true)]
    pub receive_id: String,
    /// Trace serial traffic; repeat for payload text.
    #[arg(short = 't', long, action = ArgAction::Count, global = true)]
    pub trace: u8,
    /// Directory for dump files.
    #[arg(long, value_name = "DIR", default_value = "dumps", global = true)]
    pub dump_dir: PathBuf,
    /// Do not echo records to stdout.
    #[arg(long, global = true)]
    pub quiet: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum DumpRegion {
    /// The whole 32 KiB FRAM.
    Full,
    /// The 512-byte debug sector.
    Sector,
}

#[derive(Args, Debug)]
pub struct DumpArgs {
    /// What to dump.
    #[arg(value_enum)]
    pub region: DumpRegion,
    /// Override the number of frames to collect.
    #[arg(long, value_name = "N")]
    pub frames: Option<usize>,
}

#[derive(Args, Debug)]
pub struct RtcArgs {
    /// Seconds since the Unix epoch. Default: now.
    #[arg(long, value_name = "SECS")]
    pub epoch: Option<u32>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show build details.
    #[arg(long)]
    pub extended: bool,
}
