//! The action vocabulary: the only transport for driving state changes.

use std::any::{Any, TypeId};
use std::fmt;

/// An immutable message describing an intended state transition.
///
/// The concrete type is the dispatch key: each store registers at most one
/// reducer per action type, and [`Dispatcher::dispatch`] routes by the
/// action's [`TypeId`]. Implement it as a plain marker:
///
/// ```ignore
/// #[derive(Debug, Clone)]
/// struct LoginAction { username: String, password: String }
/// impl Action for LoginAction {}
/// ```
///
/// [`Dispatcher::dispatch`]: crate::Dispatcher::dispatch
pub trait Action: Any + fmt::Debug + Send + Sync {}

/// Marker for actions that may be routed through
/// [`Dispatcher::dispatch_async`](crate::Dispatcher::dispatch_async).
///
/// Unstable: background dispatch semantics may still change.
#[cfg(feature = "unstable")]
pub trait AsyncAction: Action {}

/// Dispatch key of a type-erased action: the `TypeId` of its concrete type.
pub(crate) fn action_key(action: &dyn Action) -> TypeId {
    let any: &dyn Any = action;
    any.type_id()
}

/// Last path segment of a type name, for logs and error messages.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}
