//! Logging seam decoupling the engine from the host's log sink.

/// Five severity-leveled write operations over preformatted messages.
///
/// The engine never formats through a concrete backend; hosts plug in
/// whatever sink they run (the default forwards to `tracing`).
pub trait Logger: Send + Sync {
    fn v(&self, msg: &str);
    fn d(&self, msg: &str);
    fn i(&self, msg: &str);
    fn w(&self, msg: &str);
    fn e(&self, msg: &str);
}

/// Default sink: each level forwards to the matching `tracing` macro.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn v(&self, msg: &str) {
        tracing::trace!("{msg}");
    }

    fn d(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    fn i(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    fn w(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    fn e(&self, msg: &str) {
        tracing::error!("{msg}");
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn v(&self, _msg: &str) {}
    fn d(&self, _msg: &str) {}
    fn i(&self, _msg: &str) {}
    fn w(&self, _msg: &str) {}
    fn e(&self, _msg: &str) {}
}
