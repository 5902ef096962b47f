use canfram_dump::{Command, DumpJob};

use crate::cmd::{DeviceArgs, RtcArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::OutputFormat;
use crate::session::Session;

pub fn run(args: RtcArgs, device: &DeviceArgs, format: OutputFormat) -> CliResult<i32> {
    let mut session = Session::open(device, format)?;
    session.run(&job_for(args.epoch))?;
    Ok(SUCCESS)
}

/// RTC update for `epoch`, or for the current time.
pub fn job_for(epoch: Option<u32>) -> DumpJob {
    let command = epoch
        .map(|epoch| Command::RtcUpdate { epoch })
        .unwrap_or_else(Command::rtc_now);
    DumpJob {
        command,
        ..DumpJob::rtc_update(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_epoch_is_used() {
        let job = job_for(Some(0x6000_0000));
        assert_eq!(job.command, Command::RtcUpdate { epoch: 0x6000_0000 });
        assert_eq!(job.expected_frames, 0);
    }

    #[test]
    fn default_epoch_is_current_time() {
        match job_for(None).command {
            Command::RtcUpdate { epoch } => assert!(epoch > 1_600_000_000),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
