use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global tracing subscriber. `RUST_LOG` overrides the default
/// filter. Call once at process startup; a second call is a no-op rather
/// than a panic so embedding applications and tests can both use it.
pub fn init() {
  let _ = tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "billflow=debug".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .try_init();
}
