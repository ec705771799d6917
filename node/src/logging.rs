use std::panic;
use tracing::Level;
use tracing_journald::layer as journald_layer;
use tracing_panic::panic_hook;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, registry::Registry};

pub const SYSLOG_IDENTIFIER: &str = "8inary-node";

pub fn default_level(debug: bool) -> Level {
	if debug { Level::DEBUG } else { Level::INFO }
}

// journalctl -t 8inary-node
pub fn init(debug: bool) {
	panic::set_hook(Box::new(panic_hook));
	let log_sub = Registry::default()
		.with(
			EnvFilter::builder()
				.with_default_directive(default_level(debug).into())
				.from_env_lossy(),
		)
		.with(
			fmt::layer()
				.with_ansi(true)
				.with_file(debug)
				.with_line_number(debug)
				.with_target(true)
				.with_timer(fmt::time::SystemTime)
				.compact(),
		)
		.with(
			journald_layer()
				.map_err(|err| eprintln!("journald not available: {err}"))
				.ok()
				.map(|layr| layr.with_syslog_identifier(SYSLOG_IDENTIFIER.into())),
		);
	tracing::subscriber::set_global_default(log_sub).expect("Failed to set log subscriber.");
}
