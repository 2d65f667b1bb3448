//! Value-level modelling of asynchronous operations.
//!
//! Domain failures are not framework errors: they travel through
//! [`AsyncResult`] as ordinary data, and callers branch on the concluded
//! form explicitly.

use std::fmt;
use std::sync::Arc;

/// Life cycle of one asynchronous operation, as carried inside store state.
///
/// `Loading` and `Failure` may retain a stale value from a previous run so
/// views can keep showing something while a refresh is in flight.
#[derive(Debug, Clone)]
pub enum AsyncResult<T> {
    /// Nothing started yet.
    Empty,
    /// In flight.
    Loading { stale: Option<T> },
    /// Finished with a value.
    Success { value: T },
    /// Finished without one.
    Failure(Failure<T>),
}

/// The failure payload: an optional error plus an optional stale value.
///
/// Errors compare by `Arc` identity, not by content; two failures are equal
/// only when they carry the very same error instance.
#[derive(Debug, Clone)]
pub struct Failure<T> {
    pub error: Option<Arc<anyhow::Error>>,
    pub stale: Option<T>,
}

impl<T> Failure<T> {
    pub fn new(error: impl Into<anyhow::Error>) -> Self {
        Self {
            error: Some(Arc::new(error.into())),
            stale: None,
        }
    }

    /// Failure without any error detail.
    pub fn bare() -> Self {
        Self {
            error: None,
            stale: None,
        }
    }
}

impl<T: PartialEq> PartialEq for Failure<T> {
    fn eq(&self, other: &Self) -> bool {
        let same_error = match (&self.error, &other.error) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        };
        same_error && self.stale == other.stale
    }
}

impl<T> AsyncResult<T> {
    pub fn loading() -> Self {
        Self::Loading { stale: None }
    }

    pub fn loading_with(stale: T) -> Self {
        Self::Loading { stale: Some(stale) }
    }

    pub fn success(value: T) -> Self {
        Self::Success { value }
    }

    pub fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(Failure::new(error))
    }

    pub fn failure_with(error: impl Into<anyhow::Error>, stale: T) -> Self {
        Self::Failure(Failure {
            error: Some(Arc::new(error.into())),
            stale: Some(stale),
        })
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// True iff the operation has finished, one way or the other.
    pub fn has_concluded(&self) -> bool {
        matches!(self, Self::Success { .. } | Self::Failure(_))
    }

    /// The success value, if there is one.
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Success { value } => Some(value),
            _ => None,
        }
    }

    /// The failure error, if there is one.
    pub fn error(&self) -> Option<&Arc<anyhow::Error>> {
        match self {
            Self::Failure(failure) => failure.error.as_ref(),
            _ => None,
        }
    }
}

impl<T: Clone> AsyncResult<T> {
    /// Narrow to the concluded form; `None` while still `Empty`/`Loading`.
    pub fn conclude(&self) -> Option<Concluded<T>> {
        match self {
            Self::Success { value } => Some(Concluded::Success(value.clone())),
            Self::Failure(failure) => Some(Concluded::Failure(failure.clone())),
            _ => None,
        }
    }
}

impl<T> Default for AsyncResult<T> {
    fn default() -> Self {
        Self::Empty
    }
}

impl<T: PartialEq> PartialEq for AsyncResult<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Empty, Self::Empty) => true,
            (Self::Loading { stale: a }, Self::Loading { stale: b }) => a == b,
            (Self::Success { value: a }, Self::Success { value: b }) => a == b,
            (Self::Failure(a), Self::Failure(b)) => a == b,
            _ => false,
        }
    }
}

/// An [`AsyncResult`] once it stopped being pending: success or failure,
/// nothing in between.
#[derive(Debug, Clone)]
pub enum Concluded<T> {
    Success(T),
    Failure(Failure<T>),
}

impl<T> Concluded<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// The success value, consuming the conclusion.
    pub fn into_success(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failure(_) => None,
        }
    }
}

impl<T: fmt::Debug> fmt::Display for Concluded<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success(value) => write!(f, "Success({value:?})"),
            Self::Failure(failure) => write!(f, "Failure({:?})", failure.error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_empty() {
        let result: AsyncResult<String> = AsyncResult::default();
        assert!(result.is_empty());
        assert!(!result.has_concluded());
    }

    #[test]
    fn only_terminal_variants_conclude() {
        assert!(AsyncResult::<u32>::Empty.conclude().is_none());
        assert!(AsyncResult::<u32>::loading().conclude().is_none());
        assert!(AsyncResult::success(7).conclude().is_some());
        assert!(AsyncResult::<u32>::failure(anyhow::anyhow!("nope"))
            .conclude()
            .is_some());
    }

    #[test]
    fn conclusion_keeps_the_success_value() {
        let concluded = AsyncResult::success("token".to_string()).conclude();
        match concluded {
            Some(Concluded::Success(value)) => assert_eq!(value, "token"),
            other => panic!("unexpected conclusion: {other:?}"),
        }
    }

    #[test]
    fn failures_compare_by_error_identity() {
        let shared = Arc::new(anyhow::anyhow!("boom"));
        let a: AsyncResult<u32> = AsyncResult::Failure(Failure {
            error: Some(shared.clone()),
            stale: None,
        });
        let b: AsyncResult<u32> = AsyncResult::Failure(Failure {
            error: Some(shared),
            stale: None,
        });
        assert_eq!(a, b);

        let c: AsyncResult<u32> = AsyncResult::failure(anyhow::anyhow!("boom"));
        let d: AsyncResult<u32> = AsyncResult::failure(anyhow::anyhow!("boom"));
        assert_ne!(c, d);
    }

    #[test]
    fn loading_keeps_the_stale_value() {
        let result = AsyncResult::loading_with("old".to_string());
        assert!(result.is_loading());
        assert!(!result.has_concluded());
        match result {
            AsyncResult::Loading { stale } => assert_eq!(stale.as_deref(), Some("old")),
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
