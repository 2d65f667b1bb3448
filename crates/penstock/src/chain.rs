//! The dispatch chain: a cursor over the interceptor pipeline.

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::action::Action;
use crate::error::DispatchError;
use crate::interceptor::Interceptor;

/// New state produced by one store during a dispatch.
pub struct StoreChange {
    pub store: &'static str,
    /// The new state value, erased to its debug form.
    pub state: Box<dyn fmt::Debug + Send + Sync>,
}

impl fmt::Debug for StoreChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreChange")
            .field("store", &self.store)
            .field("state", &self.state)
            .finish()
    }
}

/// Per-dispatch change list. Nearly always one or two entries.
pub type StoreChanges = SmallVec<[StoreChange; 2]>;

/// How a dispatch entered the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Plain `dispatch`, on the caller's thread.
    Direct,
    /// `dispatch_strict`, serialized dispatcher-wide.
    Strict,
    /// `dispatch_async`, scheduled on the blocking pool.
    Background,
}

/// One action's trip through the interceptors.
///
/// Each interceptor receives the chain, may act before and after calling
/// [`proceed`](Chain::proceed), and returns the change list bubbled up from
/// downstream.
pub struct Chain<'a> {
    interceptors: &'a [Arc<dyn Interceptor>],
    action: &'a dyn Action,
    mode: DispatchMode,
    cursor: usize,
}

impl<'a> Chain<'a> {
    pub(crate) fn new(
        interceptors: &'a [Arc<dyn Interceptor>],
        action: &'a dyn Action,
        mode: DispatchMode,
    ) -> Self {
        Self {
            interceptors,
            action,
            mode,
            cursor: 0,
        }
    }

    pub fn action(&self) -> &dyn Action {
        self.action
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// Hand the action to the next interceptor and return the changes it
    /// bubbles up. An exhausted chain yields no changes.
    pub fn proceed(&mut self) -> Result<StoreChanges, DispatchError> {
        let Some(next) = self.interceptors.get(self.cursor).cloned() else {
            return Ok(StoreChanges::new());
        };
        self.cursor += 1;
        next.intercept(self)
    }
}
