//! Log output of the `dpm` binary.
//!
//! Logs go to stderr so a backup path printed on stdout stays scriptable.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// HTTP stack crates kept at `warn` unless `RUST_LOG` says otherwise.
const QUIET_CRATES: &[&str] = &["hyper", "hyper_util", "reqwest", "rustls"];

/// Filter used when `RUST_LOG` is unset.
fn default_filter(level: Level) -> String {
    let mut directives = vec![level.as_str().to_ascii_lowercase()];
    directives.extend(QUIET_CRATES.iter().map(|name| format!("{name}=warn")));
    directives.join(",")
}

/// Install the global subscriber: JSON lines when `json` is set, text
/// otherwise. Only the first call in a process has any effect.
pub fn init_tracing(json: bool, level: Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(level)));

    let output = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let output = if json { output.json().boxed() } else { output.boxed() };

    tracing_subscriber::registry()
        .with(output.with_filter(filter))
        .try_init()
        .ok();
}
