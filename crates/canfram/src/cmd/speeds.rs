use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_speeds, OutputFormat};

pub fn run(format: OutputFormat) -> CliResult<i32> {
    print_speeds(format);
    Ok(SUCCESS)
}
