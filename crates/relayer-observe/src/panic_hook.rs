//! Ensures a panic in any spawned task is logged through `tracing` before
//! the default hook prints it to stderr, so panics show up in structured
//! log output rather than only in the raw process stderr stream.

/// Installs the panic hook. Safe to call multiple times; only the first
/// call takes effect.
pub fn install() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!(%info, "panic");
        default_hook(info);
    }));
}
