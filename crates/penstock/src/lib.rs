//! # Penstock
//!
//! A unidirectional state engine where actions dispatch, stores reduce,
//! and streams observe.
//!
//! ## Core Concepts
//!
//! Penstock separates **intent** from **ownership**:
//! - [`Action`] = Intent (an immutable message describing a state transition)
//! - [`Store`] = Ownership (exactly one state slice, mutated only by its reducers)
//!
//! The key principle: **One action type = one reducer per store**.
//! An action may fan out to many stores, but within a store there is never
//! an ambiguity about who handles it.
//!
//! ## Architecture
//!
//! ```text
//! Caller
//!     │
//!     ▼ dispatch()
//! Dispatcher
//!     │
//!     ▼ proceed()
//! LogInterceptor ──(wall time, change summary)
//!     │
//!     ▼ proceed()
//! StoreInterceptor (terminal)
//!     │
//!     ├─► Store A ── can_handle? ─► reduce ─► changed? ─► broadcast
//!     ├─► Store B ── can_handle? ─► reduce ─► unchanged ─► (silent)
//!     └─► Store C ── no reducer  ─► skipped
//!     │
//!     └─► Vec<StoreChange> bubbles back up the chain
//! ```
//!
//! Asynchronous work never happens inside a reducer. A reducer that starts
//! an async operation records `AsyncResult::Loading` and hands the work to a
//! producer; the producer dispatches a follow-up action with the concluded
//! result. [`Store::on_concluded`] and [`SequenceBuilder`] are the awaiting
//! side of that handshake, and [`StateMerger`] derives combined snapshots
//! over several stores.
//!
//! ## Key Invariants
//!
//! 1. **Actions are the only transport** - state never mutates from outside
//! 2. **One reducer per action type per store** - duplicates fail at wiring time
//! 3. **Transitions compare once** - a reducer producing an equal state emits nothing
//! 4. **Stores are not reentrant** - a reducer re-entering its own store is
//!    rejected as cyclic instead of deadlocking
//! 5. **Per-store critical section** - two stores reduce concurrently, one
//!    store never does
//!
//! ## Guarantees
//!
//! - **At-most-once delivery**: change streams ride a bounded ring; slow
//!   subscribers skip ahead and never stall dispatch
//! - **In-memory only**: state dies with the process
//! - **No retry**: failed async results are plain data for the caller to
//!   branch on
//!
//! ## Example
//!
//! ```ignore
//! use penstock_core::{Action, AsyncResult, Dispatcher, Reducers, Store, StoreDefinition};
//! use std::sync::Arc;
//!
//! #[derive(Debug, Clone)]
//! struct LoginAction { username: String, password: String }
//! impl Action for LoginAction {}
//!
//! #[derive(Debug, Clone)]
//! struct LoginResultAction(AsyncResult<String>);
//! impl Action for LoginResultAction {}
//!
//! #[derive(Debug, Clone, PartialEq, Default)]
//! struct LoginState { login: AsyncResult<String> }
//!
//! struct LoginStore { api: LoginApi }
//!
//! impl StoreDefinition for LoginStore {
//!     type State = LoginState;
//!
//!     fn initial_state(&self) -> LoginState {
//!         LoginState::default()
//!     }
//!
//!     fn init(&self, reducers: &mut Reducers<LoginState>) {
//!         let api = self.api.clone();
//!         reducers
//!             .reduce(move |_state: &LoginState, action: &LoginAction| {
//!                 api.login(&action.username, &action.password);
//!                 LoginState { login: AsyncResult::loading() }
//!             })
//!             .reduce(|_state: &LoginState, action: &LoginResultAction| {
//!                 LoginState { login: action.0.clone() }
//!             });
//!     }
//! }
//!
//! let dispatcher = Dispatcher::new();
//! let login = Store::new(LoginStore { api });
//! dispatcher.set_stores(vec![login.clone()]);
//!
//! dispatcher.dispatch(LoginAction {
//!     username: "bob".into(),
//!     password: "pw".into(),
//! })?;
//!
//! let token = login.on_concluded(true, |s| s.login.clone()).await;
//! ```
//!
//! ## What This Is Not
//!
//! Penstock is **not**:
//! - A persistence layer
//! - A networking layer
//! - A generalized pub/sub bus
//! - An actor framework
//!
//! Penstock **is**:
//! > A unidirectional state engine where actions dispatch, stores reduce,
//! > and streams observe.

// Core modules
mod action;
mod chain;
mod dispatcher;
mod error;
mod interceptor;
mod logger;
mod merge;
mod result;
mod sequence;
mod store;

// Re-export action types
pub use action::Action;
#[cfg(feature = "unstable")]
pub use action::AsyncAction;

// Re-export chain types
pub use chain::{Chain, DispatchMode, StoreChange, StoreChanges};

// Re-export dispatcher types (primary entry point)
pub use dispatcher::Dispatcher;

// Re-export error types
pub use error::DispatchError;

// Re-export interceptor types
pub use interceptor::{Interceptor, LogInterceptor, StoreInterceptor};

// Re-export logger types
pub use logger::{Logger, NoopLogger, TracingLogger};

// Re-export async result types
pub use result::{AsyncResult, Concluded, Failure};

// Re-export sequence types
pub use sequence::SequenceBuilder;

// Re-export merge types
pub use merge::StateMerger;

// Re-export store types
pub use store::{AnyStore, Reducers, Store, StoreDefinition, CHANGES_CAPACITY};
