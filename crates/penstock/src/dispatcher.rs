//! The dispatcher: single entry point for submitting actions.

use std::sync::{Arc, Mutex, RwLock};

#[cfg(feature = "unstable")]
use crate::action::AsyncAction;
use crate::action::Action;
use crate::chain::{Chain, DispatchMode, StoreChanges};
use crate::error::DispatchError;
use crate::interceptor::{Interceptor, LogInterceptor, StoreInterceptor};
use crate::logger::{Logger, TracingLogger};
use crate::store::{recover, AnyStore};

/// Routes every action through the interceptor chain to the stores.
///
/// A cheaply cloneable handle: clones share the store list, the pipeline
/// and the strict-dispatch section. Construct one per process at startup
/// and pass it to whoever needs to dispatch; there is no global instance.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

struct Inner {
    logger: Arc<dyn Logger>,
    stores: RwLock<Arc<Vec<Arc<dyn AnyStore>>>>,
    interceptors: RwLock<Arc<Vec<Arc<dyn Interceptor>>>>,
    strict: Mutex<()>,
}

impl Dispatcher {
    /// Dispatcher logging through [`TracingLogger`].
    pub fn new() -> Self {
        Self::with_logger(Arc::new(TracingLogger))
    }

    pub fn with_logger(logger: Arc<dyn Logger>) -> Self {
        Self {
            inner: Arc::new(Inner {
                logger,
                stores: RwLock::new(Arc::new(Vec::new())),
                interceptors: RwLock::new(Arc::new(Vec::new())),
                strict: Mutex::new(()),
            }),
        }
    }

    /// Assign the store list.
    ///
    /// Initializes every store exactly once (registering its reducers,
    /// wall-time measured), rebuilds the interceptor pipeline and logs a
    /// startup summary. Meant to run once, at process start; dispatching
    /// before it yields no changes.
    pub fn set_stores(&self, stores: Vec<Arc<dyn AnyStore>>) {
        for store in &stores {
            store.initialize();
        }

        let stores = Arc::new(stores);
        let pipeline: Vec<Arc<dyn Interceptor>> = vec![
            Arc::new(LogInterceptor::new(self.inner.logger.clone())),
            Arc::new(StoreInterceptor::new(
                self.inner.logger.clone(),
                stores.clone(),
            )),
        ];
        *recover(self.inner.interceptors.write()) = Arc::new(pipeline);
        *recover(self.inner.stores.write()) = stores.clone();

        self.log_init(&stores);
    }

    /// Push `action` through the chain and return the changes it produced.
    ///
    /// Runs on the calling thread; per-store mutual exclusion is the only
    /// serialization applied.
    pub fn dispatch(&self, action: impl Action) -> Result<StoreChanges, DispatchError> {
        self.run_chain(&action, DispatchMode::Direct)
    }

    /// Like [`dispatch`](Dispatcher::dispatch), but no two strict
    /// dispatches overlap on this dispatcher: one action in flight at a
    /// time across all stores, at the price of all concurrency.
    ///
    /// Must not be called from inside a reducer: the serializing section
    /// is not reentrant.
    pub fn dispatch_strict(&self, action: impl Action) -> Result<StoreChanges, DispatchError> {
        let _serial = recover(self.inner.strict.lock());
        self.run_chain(&action, DispatchMode::Strict)
    }

    /// Run the chain off the caller's context, on the blocking pool.
    ///
    /// Unstable: background dispatch semantics may still change.
    #[cfg(feature = "unstable")]
    pub async fn dispatch_async(
        &self,
        action: impl AsyncAction,
    ) -> Result<StoreChanges, DispatchError> {
        let this = self.clone();
        let outcome =
            tokio::task::spawn_blocking(move || this.run_chain(&action, DispatchMode::Background))
                .await;
        match outcome {
            Ok(result) => result,
            Err(join) if join.is_panic() => std::panic::resume_unwind(join.into_panic()),
            Err(join) => panic!("background dispatch aborted: {join}"),
        }
    }

    fn run_chain(
        &self,
        action: &dyn Action,
        mode: DispatchMode,
    ) -> Result<StoreChanges, DispatchError> {
        let interceptors = recover(self.inner.interceptors.read()).clone();
        Chain::new(&interceptors, action, mode).proceed()
    }

    fn log_init(&self, stores: &[Arc<dyn AnyStore>]) {
        let mut msg = format!(
            " \n══════════════════════════════════════════════\n\
             dispatcher initialized with {} store(s)\n\
             ┌────────────────────────────────────────────\n",
            stores.len(),
        );
        for store in stores {
            let millis = store
                .init_elapsed()
                .map(|elapsed| elapsed.as_millis())
                .unwrap_or_default();
            msg.push_str(&format!(
                "├─> {} with state = {} in {}ms\n",
                store.name(),
                store.state_summary(),
                millis,
            ));
        }
        msg.push_str("└────────────────────────────────────────────");
        self.inner.logger.d(&msg);
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
