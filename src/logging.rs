use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

/// JSON subscriber filtered by `RUST_LOG`, falling back to `info`.
fn json_subscriber<W>(make_writer: W) -> impl tracing::Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .json()
        .with_writer(make_writer)
        .finish()
}

/// Initialize stderr logging with JSON format.
///
/// Intended for binaries; the library itself only emits `tracing` events and
/// never installs a subscriber.
pub fn init_logging() {
    // A second call keeps the first subscriber.
    let _ = tracing::subscriber::set_global_default(json_subscriber(std::io::stderr));
}
