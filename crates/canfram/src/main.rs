mod cmd;
mod exit;
mod logging;
mod output;
mod session;

use clap::Parser;

use crate::cmd::{Command, DeviceArgs};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "canfram",
    version,
    about = "FRAM dump tool for serial USB-CAN adapters"
)]
struct Cli {
    #[command(flatten)]
    device: DeviceArgs,

    /// Record and report format.
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    format: OutputFormat,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    /// Defaults to the interactive menu.
    #[command(subcommand)]
    command: Option<Command>,
}

fn main() {
    let cli = Cli::parse();

    // Traffic tracing logs at info; keep it visible when requested.
    let level = if cli.device.trace > 0 {
        cli.log_level.at_least(LogLevel::Info)
    } else {
        cli.log_level
    };
    init_logging(cli.log_format, level);

    let command = cli.command.unwrap_or(Command::Menu);
    let result = cmd::run(command, &cli.device, cli.format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::DumpRegion;

    #[test]
    fn no_subcommand_means_menu() {
        let cli = Cli::try_parse_from(["canfram", "-d", "/dev/ttyUSB0"])
            .expect("bare invocation should parse");
        assert!(cli.command.is_none());
        assert_eq!(cli.device.speed, 500_000);
        assert_eq!(cli.device.baudrate, 2_000_000);
        assert_eq!(cli.device.inject_id, "010");
        assert_eq!(cli.device.receive_id, "011");
    }

    #[test]
    fn parses_dump_with_frame_override() {
        let cli = Cli::try_parse_from([
            "canfram",
            "dump",
            "sector",
            "--frames",
            "4",
            "--device",
            "/dev/ttyUSB1",
            "-tt",
        ])
        .expect("dump args should parse");

        match cli.command {
            Some(Command::Dump(args)) => {
                assert_eq!(args.region, DumpRegion::Sector);
                assert_eq!(args.frames, Some(4));
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.device.trace, 2);
        assert_eq!(
            cli.device.device.as_deref(),
            Some(std::path::Path::new("/dev/ttyUSB1"))
        );
    }

    #[test]
    fn parses_rtc_epoch() {
        let cli = Cli::try_parse_from(["canfram", "rtc", "--epoch", "1700000000"])
            .expect("rtc args should parse");
        assert!(matches!(
            cli.command,
            Some(Command::Rtc(ref args)) if args.epoch == Some(1_700_000_000)
        ));
    }

    #[test]
    fn rejects_unknown_dump_region() {
        let err = Cli::try_parse_from(["canfram", "dump", "half"])
            .expect_err("unknown region should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }
}
