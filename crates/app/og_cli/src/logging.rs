pub mod formats;

use flexi_logger::Logger;

use crate::Error;

/// Start logging to stderr; stdout carries command output.
///
/// `RUST_LOG` wins over the verbosity flag when set.
pub fn init(verbose: bool) -> Result<(), Error> {
    let default_spec = if verbose { "debug" } else { "warn" };
    Logger::try_with_env_or_str(default_spec)?
        .format(formats::cli_format)
        .log_to_stderr()
        .start()?;

    Ok(())
}
