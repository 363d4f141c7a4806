//! Log output for the command-line binary.
//!
//! Library code only emits through the `log` facade. Binaries call [`init`]
//! once at startup; everything goes to stderr so stdout stays free for
//! command output.

use env_logger::{Builder, Env};
use log::LevelFilter;

/// Maps a `-v` count to a level filter.
pub fn level_for_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Installs the global logger.
///
/// `RUST_LOG` takes precedence over the verbosity level. Calling this more
/// than once is harmless.
pub fn init(verbosity: u8) {
    let default_filter = level_for_verbosity(verbosity).to_string().to_lowercase();
    let _ = Builder::from_env(Env::default().default_filter_or(default_filter))
        .format_target(false)
        .try_init();
}
