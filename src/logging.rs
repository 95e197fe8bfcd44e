use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the stdout subscriber. Progress and diagnostics are the only
/// output of a run, so the format stays compact and target-free.
pub fn init_tracing(level: &str) -> Result<(), tracing_subscriber::filter::ParseError> {
    let filter_layer = EnvFilter::try_new(level)?;
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    Ok(())
}
