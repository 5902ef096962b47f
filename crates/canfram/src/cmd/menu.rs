use std::io::{self, BufRead, Write};

use canfram_dump::DumpJob;
use tracing::{error, info, warn};

use crate::cmd::{rtc, DeviceArgs};
use crate::exit::{io_error, CliResult, SUCCESS};
use crate::output::OutputFormat;
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    FullDump,
    SectorDump,
    UpdateRtc,
    ClearFram,
    FlushBus,
    Exit,
}

impl MenuChoice {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(Self::FullDump),
            "2" => Some(Self::SectorDump),
            "4" => Some(Self::UpdateRtc),
            "6" => Some(Self::ClearFram),
            "8" => Some(Self::FlushBus),
            "9" => Some(Self::Exit),
            _ => None,
        }
    }
}

const MENU: &str = "\
  1) Dump FRAM (32 KiB) to file
  2) Dump debug sector (512 B) to file
  4) Update RTC
  6) Clear FRAM
  8) Clear CAN bus buffer
  9) Exit
";

pub fn run(device: &DeviceArgs, format: OutputFormat) -> CliResult<i32> {
    let mut session = Session::open(device, format)?;
    let stdin = io::stdin();
    let failures = serve(&mut session, stdin.lock())?;
    if failures > 0 {
        warn!(failures, "menu session ended with failed commands");
    }
    Ok(SUCCESS)
}

/// Read menu choices from `input` until exit, end of input or cancellation.
///
/// A failed command is logged and the menu keeps going; only unreadable input
/// ends the loop with an error. Returns how many commands failed.
pub fn serve(session: &mut Session, mut input: impl BufRead) -> CliResult<usize> {
    let mut line = String::new();
    let mut failures = 0;

    while !session.is_cancelled() {
        eprint!("\n[answers on {}]\n{MENU}> ", session.receive_id());
        let _ = io::stderr().flush();

        line.clear();
        let read = input
            .read_line(&mut line)
            .map_err(|err| io_error("failed to read menu input", err))?;
        if read == 0 || session.is_cancelled() {
            break;
        }

        let Some(choice) = MenuChoice::parse(&line) else {
            warn!(input = line.trim(), "unknown menu option");
            continue;
        };
        info!(?choice, "menu selection");

        let outcome = match choice {
            MenuChoice::FullDump => session.run_to_file(&DumpJob::full_dump()).map(drop),
            MenuChoice::SectorDump => session.run_to_file(&DumpJob::sector_dump()).map(drop),
            MenuChoice::UpdateRtc => session.run(&rtc::job_for(None)).map(drop),
            MenuChoice::ClearFram => session.run(&DumpJob::clear()).map(drop),
            MenuChoice::FlushBus => session.flush().map(drop),
            MenuChoice::Exit => break,
        };

        if let Err(err) = outcome {
            failures += 1;
            error!(?choice, code = err.code, "{}", err.message);
        }
    }

    Ok(failures)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use canfram_dump::{CommandEncoder, Dumper, DumperConfig};
    use canfram_frame::{CanId, CancelToken, FrameReceiver};
    use canfram_transport::ScriptedChannel;

    use super::*;

    fn device_args(dump_dir: PathBuf) -> DeviceArgs {
        DeviceArgs {
            device: Some(PathBuf::from("/dev/ttyUSB0")),
            speed: 500_000,
            baudrate: 2_000_000,
            inject_id: "010".to_string(),
            receive_id: "011".to_string(),
            trace: 0,
            dump_dir,
            quiet: true,
        }
    }

    fn session_over(channel: ScriptedChannel, dump_dir: PathBuf) -> Session {
        let dumper = Dumper::with_config(
            FrameReceiver::new(Box::new(channel) as Box<dyn canfram_transport::ByteChannel>),
            CommandEncoder::default(),
            DumperConfig {
                settle_delay: Duration::ZERO,
            },
        );
        Session::new(
            dumper,
            CancelToken::new(),
            CanId::from_hex("011").unwrap(),
            &device_args(dump_dir),
            OutputFormat::Text,
        )
    }

    fn temp_dump_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("canfram-menu-{name}-{}", std::process::id()))
    }

    #[test]
    fn failed_commands_do_not_end_the_menu() {
        let dir = temp_dump_dir("failures");
        let channel = ScriptedChannel::new([]).fail_reads_when_drained();
        let mut session = session_over(channel, dir.clone());

        let failures = serve(&mut session, "2\n6\n8\n9\n".as_bytes()).unwrap();
        assert_eq!(failures, 3);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn end_of_input_leaves_the_menu() {
        let dir = temp_dump_dir("eof");
        let mut session = session_over(ScriptedChannel::new([]), dir.clone());

        let failures = serve(&mut session, "x\n8\n".as_bytes()).unwrap();
        assert_eq!(failures, 0);
        assert_eq!(session.receive_id().to_string(), "0011");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn parses_menu_options() {
        assert_eq!(MenuChoice::parse("1\n"), Some(MenuChoice::FullDump));
        assert_eq!(MenuChoice::parse(" 2 "), Some(MenuChoice::SectorDump));
        assert_eq!(MenuChoice::parse("4"), Some(MenuChoice::UpdateRtc));
        assert_eq!(MenuChoice::parse("6"), Some(MenuChoice::ClearFram));
        assert_eq!(MenuChoice::parse("8"), Some(MenuChoice::FlushBus));
        assert_eq!(MenuChoice::parse("9"), Some(MenuChoice::Exit));
    }

    #[test]
    fn rejects_other_input() {
        for input in ["", "3", "5", "7", "10", "q"] {
            assert_eq!(MenuChoice::parse(input), None, "{input:?}");
        }
    }
}
