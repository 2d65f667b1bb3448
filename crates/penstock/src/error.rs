//! Framework-level errors.
//!
//! Only the dispatch path can fail at runtime; wiring mistakes (duplicate
//! reducers) fail eagerly at registration time, and domain failures travel
//! through [`AsyncResult`](crate::AsyncResult) as values.

use thiserror::Error;

/// Errors surfaced by the dispatch path.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A reducer caused its own store to be dispatched to again before the
    /// first dispatch finished. Carries the store and the debug-rendered
    /// offending action.
    #[error("cyclic dispatch of {action} on store {store}")]
    Cyclic {
        store: &'static str,
        action: String,
    },
}
