use crate::cmd::DeviceArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::OutputFormat;
use crate::session::Session;

pub fn run(device: &DeviceArgs, format: OutputFormat) -> CliResult<i32> {
    let mut session = Session::open(device, format)?;
    session.flush()?;
    Ok(SUCCESS)
}
