use canfram_dump::DumpJob;

use crate::cmd::{DeviceArgs, DumpArgs, DumpRegion};
use crate::exit::{CliResult, SUCCESS};
use crate::output::OutputFormat;
use crate::session::Session;

pub fn run(args: DumpArgs, device: &DeviceArgs, format: OutputFormat) -> CliResult<i32> {
    let mut session = Session::open(device, format)?;
    let job = job_for(&args);
    session.run_to_file(&job)?;
    Ok(SUCCESS)
}

pub fn job_for(args: &DumpArgs) -> DumpJob {
    let job = match args.region {
        DumpRegion::Full => DumpJob::full_dump(),
        DumpRegion::Sector => DumpJob::sector_dump(),
    };
    match args.frames {
        Some(frames) => job.with_frames(frames),
        None => job,
    }
}
