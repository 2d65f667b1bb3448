//! Stores: owners of one state slice each, driven only by reducers.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, OnceLock, PoisonError, RwLock};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use futures::future;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::broadcast;

use crate::action::{action_key, short_type_name, Action};
use crate::error::DispatchError;
use crate::result::{AsyncResult, Concluded};

/// Ring size of a store's change channel. A subscriber that falls further
/// behind than this skips ahead; it never stalls dispatch.
pub const CHANGES_CAPACITY: usize = 64;

/// Recover the guard from a poisoned lock. The state under every lock in
/// this module is valid at all times (panics can only happen outside the
/// guarded sections), so the poison flag carries no information here.
pub(crate) fn recover<G>(result: Result<G, PoisonError<G>>) -> G {
    result.unwrap_or_else(PoisonError::into_inner)
}

/// Describes one store: its state slice and the reducers that drive it.
///
/// Implementations are plain structs; anything a reducer needs beyond the
/// action (an API client, a dispatcher handle for follow-up actions) lives
/// as a field and is cloned into the reducer closure during [`init`].
///
/// [`init`]: StoreDefinition::init
pub trait StoreDefinition: Send + Sync + 'static {
    type State: Clone + PartialEq + fmt::Debug + Send + Sync + 'static;

    /// Seed value for the state slice, produced with no external inputs.
    /// States that are `Default` can simply return `Self::State::default()`.
    fn initial_state(&self) -> Self::State;

    /// Register this store's reducers. Called exactly once, when the store
    /// list is assigned to a dispatcher.
    fn init(&self, reducers: &mut Reducers<Self::State>);

    /// Display name used in logs and diagnostics.
    fn name(&self) -> &'static str {
        short_type_name::<Self>()
    }
}

type BoxedReducer<S> = Box<dyn Fn(&S, &dyn Action) -> S + Send + Sync>;

struct Registered<S> {
    run: BoxedReducer<S>,
}

/// Registry mapping each action type to the single reducer handling it.
pub struct Reducers<S> {
    store: &'static str,
    handlers: HashMap<TypeId, Registered<S>>,
}

impl<S: 'static> Reducers<S> {
    fn new(store: &'static str) -> Self {
        Self {
            store,
            handlers: HashMap::new(),
        }
    }

    /// Register the reducer for action type `A`.
    ///
    /// # Panics
    ///
    /// If a reducer for `A` is already registered on this store. One
    /// reducer per action type per store is a hard wiring rule, enforced
    /// eagerly.
    pub fn reduce<A, F>(&mut self, reducer: F) -> &mut Self
    where
        A: Action,
        F: Fn(&S, &A) -> S + Send + Sync + 'static,
    {
        let action = short_type_name::<A>();
        let run: BoxedReducer<S> = Box::new(move |state, erased| {
            let any: &dyn Any = erased;
            match any.downcast_ref::<A>() {
                Some(action) => reducer(state, action),
                None => unreachable!("reducer keyed by TypeId received a foreign action"),
            }
        });
        let previous = self.handlers.insert(TypeId::of::<A>(), Registered { run });
        if previous.is_some() {
            panic!("duplicate reducer for {action} on store {}", self.store);
        }
        self
    }

    fn get(&self, key: TypeId) -> Option<&Registered<S>> {
        self.handlers.get(&key)
    }

    fn contains(&self, key: TypeId) -> bool {
        self.handlers.contains_key(&key)
    }
}

/// Per-store dispatch monitor.
///
/// Other threads queue behind the holder; the *holding thread* re-entering
/// is a cyclic dispatch and fails fast instead of deadlocking. Because
/// reducers never yield, the owning thread can only re-enter from inside
/// its own reducer call stack.
struct DispatchGate {
    owner: Mutex<Option<ThreadId>>,
    released: Condvar,
}

impl DispatchGate {
    fn new() -> Self {
        Self {
            owner: Mutex::new(None),
            released: Condvar::new(),
        }
    }

    fn enter(
        &self,
        store: &'static str,
        action: &dyn Action,
    ) -> Result<GateGuard<'_>, DispatchError> {
        let me = thread::current().id();
        let mut owner = recover(self.owner.lock());
        loop {
            match *owner {
                None => {
                    *owner = Some(me);
                    return Ok(GateGuard { gate: self });
                }
                Some(holder) if holder == me => {
                    return Err(DispatchError::Cyclic {
                        store,
                        action: format!("{action:?}"),
                    });
                }
                Some(_) => owner = recover(self.released.wait(owner)),
            }
        }
    }
}

struct GateGuard<'a> {
    gate: &'a DispatchGate,
}

impl std::fmt::Debug for GateGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateGuard").finish_non_exhaustive()
    }
}

impl Drop for GateGuard<'_> {
    // Runs on unwind too: a panicking reducer leaves the store usable.
    fn drop(&mut self) {
        *recover(self.gate.owner.lock()) = None;
        self.gate.released.notify_one();
    }
}

struct InitRecord<S> {
    reducers: Reducers<S>,
    elapsed: Duration,
}

/// Owner of one state slice.
///
/// The state is seeded lazily from [`StoreDefinition::initial_state`] on
/// first access and transitions only through [`dispatch`]. Every transition
/// runs inside the store's critical section, compares old and new state
/// exactly once, and broadcasts the new value iff it differs.
///
/// [`dispatch`]: Store::dispatch
pub struct Store<D: StoreDefinition> {
    def: D,
    name: &'static str,
    value: RwLock<Option<D::State>>,
    changes_tx: broadcast::Sender<D::State>,
    gate: DispatchGate,
    init: OnceLock<InitRecord<D::State>>,
}

impl<D: StoreDefinition> Store<D> {
    pub fn new(def: D) -> Arc<Self> {
        let (changes_tx, _) = broadcast::channel(CHANGES_CAPACITY);
        let name = def.name();
        Arc::new(Self {
            def,
            name,
            value: RwLock::new(None),
            changes_tx,
            gate: DispatchGate::new(),
            init: OnceLock::new(),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Current state, seeding it on first access. Concurrent first reads
    /// race on the seed lock; exactly one invokes the provider and all of
    /// them observe its value.
    pub fn state(&self) -> D::State {
        if let Some(state) = recover(self.value.read()).as_ref() {
            return state.clone();
        }
        let mut slot = recover(self.value.write());
        slot.get_or_insert_with(|| self.def.initial_state()).clone()
    }

    /// True iff a reducer is registered for `action`'s concrete type.
    pub fn can_handle(&self, action: &dyn Action) -> bool {
        self.init
            .get()
            .is_some_and(|init| init.reducers.contains(action_key(action)))
    }

    /// Run the reducer registered for `action`'s type, if any.
    ///
    /// Returns the new state iff it differs from the previous one; `None`
    /// means "no reducer" or "handled but unchanged". The whole transition
    /// (reduce, compare, swap, broadcast) is a critical section per store
    /// instance: contending threads queue, while a re-entry from the
    /// store's own reducer fails with [`DispatchError::Cyclic`].
    pub fn dispatch(&self, action: &dyn Action) -> Result<Option<D::State>, DispatchError> {
        let _gate = self.gate.enter(self.name, action)?;
        let Some(init) = self.init.get() else {
            return Ok(None);
        };
        let Some(handler) = init.reducers.get(action_key(action)) else {
            return Ok(None);
        };
        let current = self.state();
        let next = (handler.run)(&current, action);
        if next == current {
            return Ok(None);
        }
        *recover(self.value.write()) = Some(next.clone());
        let _ = self.changes_tx.send(next.clone());
        Ok(Some(next))
    }

    /// Multicast stream of state values.
    ///
    /// With `hot_start` the current state arrives as the first element;
    /// without it only future changes are delivered. The transition itself
    /// decides what counts as a change; the guard here only absorbs the
    /// duplicate a subscriber can observe when a dispatch lands between
    /// subscription and the hot-start snapshot.
    pub fn changes(&self, hot_start: bool) -> BoxStream<'static, D::State> {
        // Subscribe before snapshotting so no transition falls in the gap.
        let rx = self.changes_tx.subscribe();
        let head = hot_start.then(|| self.state());
        let tail = stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(state) => break Some((state, rx)),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break None,
                }
            }
        });
        stream::iter(head)
            .chain(tail)
            .scan(None::<D::State>, |last, state| {
                let fresh = last.as_ref() != Some(&state);
                if fresh {
                    *last = Some(state.clone());
                }
                future::ready(Some(fresh.then_some(state)))
            })
            .filter_map(future::ready)
            .boxed()
    }

    /// Wait until the projected [`AsyncResult`] concludes and return the
    /// conclusion. Intermediate `Empty`/`Loading` values are skipped; the
    /// underlying subscription lives only for the duration of the call, so
    /// cancelling the future releases it.
    pub async fn on_concluded<R, F>(&self, hot_start: bool, select: F) -> Concluded<R>
    where
        R: Clone + Send,
        F: Fn(&D::State) -> AsyncResult<R> + Send,
    {
        let mut rx = self.changes_tx.subscribe();
        if hot_start {
            if let Some(concluded) = select(&self.state()).conclude() {
                return concluded;
            }
        }
        loop {
            match rx.recv().await {
                Ok(state) => {
                    if let Some(concluded) = select(&state).conclude() {
                        return concluded;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    // Skipped ahead; the live state may already be terminal.
                    if let Some(concluded) = select(&self.state()).conclude() {
                        return concluded;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => {
                    unreachable!("the store holds the sender for as long as it is borrowed")
                }
            }
        }
    }
}

/// Type-erased store surface, as the dispatcher and its interceptors see it.
pub trait AnyStore: Send + Sync {
    fn name(&self) -> &'static str;

    /// One-time reducer registration, wall-time measured for diagnostics.
    /// Idempotent: later calls return the recorded duration.
    fn initialize(&self) -> Duration;

    /// Registration time, if [`initialize`](AnyStore::initialize) ran.
    fn init_elapsed(&self) -> Option<Duration>;

    fn can_handle(&self, action: &dyn Action) -> bool;

    /// [`Store::dispatch`] with the state type erased to its debug form.
    fn dispatch_erased(
        &self,
        action: &dyn Action,
    ) -> Result<Option<Box<dyn fmt::Debug + Send + Sync>>, DispatchError>;

    /// Debug rendering of the current state (seeds it if untouched).
    fn state_summary(&self) -> String;
}

impl<D: StoreDefinition> AnyStore for Store<D> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn initialize(&self) -> Duration {
        self.init
            .get_or_init(|| {
                let started = Instant::now();
                let mut reducers = Reducers::new(self.name);
                self.def.init(&mut reducers);
                InitRecord {
                    reducers,
                    elapsed: started.elapsed(),
                }
            })
            .elapsed
    }

    fn init_elapsed(&self) -> Option<Duration> {
        self.init.get().map(|record| record.elapsed)
    }

    fn can_handle(&self, action: &dyn Action) -> bool {
        Store::can_handle(self, action)
    }

    fn dispatch_erased(
        &self,
        action: &dyn Action,
    ) -> Result<Option<Box<dyn fmt::Debug + Send + Sync>>, DispatchError> {
        Ok(self
            .dispatch(action)?
            .map(|state| Box::new(state) as Box<dyn fmt::Debug + Send + Sync>))
    }

    fn state_summary(&self) -> String {
        format!("{:?}", self.state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;

    #[derive(Debug, Clone)]
    struct Bump(u32);
    impl Action for Bump {}

    #[derive(Debug, Clone, PartialEq, Default)]
    struct Counter {
        value: u32,
    }

    struct CounterStore {
        seeds: Arc<AtomicUsize>,
    }

    impl StoreDefinition for CounterStore {
        type State = Counter;

        fn initial_state(&self) -> Counter {
            self.seeds.fetch_add(1, Ordering::SeqCst);
            Counter::default()
        }

        fn init(&self, reducers: &mut Reducers<Counter>) {
            reducers.reduce(|_state: &Counter, action: &Bump| Counter { value: action.0 });
        }
    }

    fn counter_store() -> (Arc<Store<CounterStore>>, Arc<AtomicUsize>) {
        let seeds = Arc::new(AtomicUsize::new(0));
        let store = Store::new(CounterStore {
            seeds: seeds.clone(),
        });
        (store, seeds)
    }

    #[test]
    fn state_seeds_exactly_once() {
        let (store, seeds) = counter_store();
        assert_eq!(store.state(), Counter::default());
        assert_eq!(store.state(), Counter::default());
        assert_eq!(seeds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dispatch_before_initialize_handles_nothing() {
        let (store, _) = counter_store();
        assert!(!store.can_handle(&Bump(1)));
        assert_eq!(store.dispatch(&Bump(1)).unwrap(), None);
        assert_eq!(store.state(), Counter::default());
    }

    #[test]
    fn unchanged_transition_reports_none() {
        let (store, _) = counter_store();
        store.initialize();
        assert_eq!(store.dispatch(&Bump(3)).unwrap(), Some(Counter { value: 3 }));
        assert_eq!(store.dispatch(&Bump(3)).unwrap(), None);
    }

    #[test]
    #[should_panic(expected = "duplicate reducer")]
    fn duplicate_registration_is_fatal() {
        struct Doubled;

        impl StoreDefinition for Doubled {
            type State = Counter;

            fn initial_state(&self) -> Counter {
                Counter::default()
            }

            fn init(&self, reducers: &mut Reducers<Counter>) {
                reducers
                    .reduce(|_state: &Counter, action: &Bump| Counter { value: action.0 })
                    .reduce(|state: &Counter, _action: &Bump| state.clone());
            }
        }

        Store::new(Doubled).initialize();
    }

    #[test]
    fn gate_rejects_same_thread_reentry() {
        let gate = DispatchGate::new();
        let _guard = gate.enter("CounterStore", &Bump(1)).unwrap();
        let err = gate.enter("CounterStore", &Bump(2)).unwrap_err();
        match err {
            DispatchError::Cyclic { store, action } => {
                assert_eq!(store, "CounterStore");
                assert!(action.contains("Bump"));
            }
        }
    }

    #[test]
    fn gate_queues_other_threads_until_release() {
        let gate = Arc::new(DispatchGate::new());
        let guard = gate.enter("CounterStore", &Bump(1)).unwrap();

        let (tx, rx) = mpsc::channel();
        let handle = {
            let gate = gate.clone();
            thread::spawn(move || {
                let _guard = gate.enter("CounterStore", &Bump(2)).unwrap();
                tx.send(()).unwrap();
            })
        };

        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        drop(guard);
        assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());
        handle.join().unwrap();
    }

    #[test]
    fn gate_releases_on_unwind() {
        struct Exploding;
        impl StoreDefinition for Exploding {
            type State = Counter;

            fn initial_state(&self) -> Counter {
                Counter::default()
            }

            fn init(&self, reducers: &mut Reducers<Counter>) {
                reducers.reduce(|_state: &Counter, _action: &Bump| panic!("reducer blew up"));
            }
        }

        let exploding = Store::new(Exploding);
        exploding.initialize();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            exploding.dispatch(&Bump(1))
        }));
        assert!(result.is_err());

        // The gate was released during the unwind; the store still works,
        // it just panics again when the same reducer runs.
        assert!(exploding.can_handle(&Bump(2)));
    }
}
