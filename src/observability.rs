// In: src/observability.rs

//! This module provides the diagnostics hooks used across the codec and the
//! enrichment engine.
//!
//! The `log_metric!` macro emits one structured key/value line per interesting
//! event (a finished encode, a built area tree, a matching pass). It is compiled
//! out of release builds by `#[cfg(debug_assertions)]`, and in debug builds it
//! goes through the `log` facade at debug level so it only shows up when a
//! logger is installed and verbose.

use std::fs::OpenOptions;
use std::sync::Once;

use log::LevelFilter;

use crate::error::Result;

/// Logs a structured key-value metric line at debug level, only in debug builds.
///
/// # Example
/// ```
/// use afval::log_metric;
/// let matched = 12;
/// log_metric!("event" = "match_weighings", "matched" = &matched);
/// ```
#[macro_export]
macro_rules! log_metric {
    ($($key:literal = $value:expr),+ $(,)?) => {
        #[cfg(debug_assertions)]
        {
            let mut parts = Vec::new();
            $(
                parts.push(format!("\"{}\": \"{}\"", $key, $value));
            )+

            log::debug!("AFVAL_METRIC: {{ {} }}", parts.join(", "));
        }
    };
}

static INIT_LOGGER: Once = Once::new();

/// Installs the global `env_logger` once. Later calls are no-ops.
///
/// With a `log_file`, output is appended to that file instead of stderr. The
/// `RUST_LOG` environment variable still refines the filter.
pub fn init_logging(level: LevelFilter, log_file: Option<&str>) -> Result<()> {
    let file = match log_file {
        Some(path) => Some(OpenOptions::new().append(true).create(true).open(path)?),
        None => None,
    };

    INIT_LOGGER.call_once(move || {
        let mut builder = env_logger::Builder::new();

        builder.is_test(false);
        builder.filter_level(level);
        builder.parse_default_env();

        // Just the level and the message.
        builder.format(|buf, record| {
            use std::io::Write;
            writeln!(buf, "[{}] {}", record.level(), record.args())
        });

        if let Some(file) = file {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }

        let _ = builder.try_init();
    });
    Ok(())
}
