//! Logger bootstrap for hosts and test suites.

use env_logger::{Builder, Env};
use log::LevelFilter;

/// Filter applied when verbose scheduler logging is requested.
const VERBOSE_FILTER: &str = "info,do_after=debug";

/// Installs `env_logger` as the global logger.
///
/// `verbose` enables the scheduler's debug output (starts, rejections,
/// cancellations and completions) while keeping other crates at info level.
/// `RUST_LOG` overrides both defaults.
pub fn init(verbose: bool) {
    let filter = if verbose {
        VERBOSE_FILTER.to_owned()
    } else {
        LevelFilter::Info.to_string()
    };
    let mut builder = Builder::from_env(Env::default().default_filter_or(filter));
    builder.format_timestamp_millis().format_module_path(false);

    // A second install fails; hosts and tests may both call this.
    if builder.try_init().is_err() {
        log::trace!(target: "do_after", "logger already installed");
    }
}
