use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Sends `tracing` events to standard error, filtered by `RUST_LOG`.
/// The library never calls this; binaries that want the output do.
pub fn init() {
	let fmt_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
	let _ = tracing_subscriber::registry().with(filter).with(fmt_layer).try_init();
}
