use crate::errors::CliError;

use log::LevelFilter;

/// Maps a command-line level name to a filter. Unknown names fall back to
/// `info`.
pub fn parse_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        "off" => LevelFilter::Off,
        _ => LevelFilter::Info,
    }
}

/// Initializes the process-wide `env_logger` for the `abx_client` and
/// `abx_server` binaries.
///
/// # Errors
/// Returns [`CliError::GeneralError`] if a logger is already installed.
pub fn init_logger(level: &str) -> Result<(), CliError> {
    env_logger::Builder::new()
        .filter_level(parse_level(level))
        .format_timestamp_micros()
        .format_module_path(false)
        .format_target(false)
        .try_init()
        .map_err(|e| CliError::GeneralError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), LevelFilter::Debug);
        assert_eq!(parse_level("warn"), LevelFilter::Warn);
        assert_eq!(parse_level("off"), LevelFilter::Off);
        assert_eq!(parse_level("verbose"), LevelFilter::Info);
    }

    #[test]
    fn test_second_init_is_an_error() {
        let _ = init_logger("error");
        assert!(matches!(
            init_logger("error"),
            Err(CliError::GeneralError(_))
        ));
    }
}
