use std::io::IsTerminal as _;

use tracing_subscriber::{
    filter::{
        EnvFilter,
        LevelFilter,
    },
    fmt,
    layer::SubscriberExt as _,
    registry,
    util::SubscriberInitExt as _,
};

/// Registers a global tracing subscriber: JSON to a pipe, human-readable to
/// a tty, both gated by `filter_directives`.
///
/// # Errors
/// Returns an error if a global subscriber is already registered, or if
/// `filter_directives` fails to parse.
pub fn init(filter_directives: &str) -> eyre::Result<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse(filter_directives)
        .map_err(|error| eyre::eyre!("failed parsing log filter directives: {error}"))?;

    let (json_log, stdout_log) = if std::io::stdout().is_terminal() {
        (None, Some(fmt::layer()))
    } else {
        (Some(fmt::layer().json().flatten_event(true)), None)
    };

    registry()
        .with(stdout_log)
        .with(json_log)
        .with(env_filter)
        .try_init()
        .map_err(|error| eyre::eyre!("failed initializing tracing subscriber: {error}"))
}
