use crate::error::Result;
use tracing_subscriber::EnvFilter;

/// Initialise the process's `tracing` subscriber from `RUST_LOG`, defaulting
/// to `info` when unset. Idempotent: a second call is a no-op rather than a
/// panic, since tests and embedding binaries may both attempt init.
pub fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("tracing subscriber already set, skipping");
    }
    Ok(())
}
