use std::path::PathBuf;

use arg::{parse_args, Args};
use log::SetLoggerError;

// -------------------------------------------------------------------------------------------------

/// Command line arguments of the multigrain demos.
#[derive(Args, Debug, Default)]
pub struct Arguments {
    #[arg(short = "i", long = "input")]
    /// Granulate the given 16 bit, 24 bit or float wav file instead of a generated tone.
    pub input_path: Option<PathBuf>,
    #[arg(short = "o", long = "output")]
    /// Path of the rendered wav file. By default \"grains.wav\".
    pub output_path: Option<PathBuf>,
    #[arg(short = "l", long = "log-level")]
    /// Log level: \"debug\", \"info\", \"warn\" or \"error\". By default \"info\".
    pub log_level: Option<log::Level>,
}

/// Parse the process arguments and set up a logger with the requested level.
pub fn parse() -> Result<Arguments, SetLoggerError> {
    let args = parse_args::<Arguments>();
    let level = args.log_level.unwrap_or(log::Level::Info);
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Warn)
        .with_module_level("multigrain", level.to_level_filter())
        .with_module_level("render_grains", level.to_level_filter())
        .init()?;
    Ok(args)
}
