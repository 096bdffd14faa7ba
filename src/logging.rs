//! Tracing setup for embedders that want this crate's internal spans
//! and events surfaced without writing their own subscriber wiring.

use tracing_subscriber::EnvFilter;

/// Installs a `tracing-subscriber` `fmt` layer driven by `DIRECTORYD_LOG`
/// (falling back to `info`), with active/closed span timing recorded —
/// useful for seeing how long a transaction retry loop actually spun.
/// Safe to call more than once; only the first call takes effect.
pub fn init() {
    let filter = EnvFilter::try_from_env("DIRECTORYD_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::ACTIVE | tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .try_init();
}
