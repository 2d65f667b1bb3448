//! The two standard pipeline stages: logging and store fan-out.

use std::sync::Arc;
use std::time::Instant;

use crate::chain::{Chain, DispatchMode, StoreChange, StoreChanges};
use crate::error::DispatchError;
use crate::logger::Logger;
use crate::store::AnyStore;

/// A pipeline stage wrapping the call to the next stage.
pub trait Interceptor: Send + Sync {
    fn intercept(&self, chain: &mut Chain<'_>) -> Result<StoreChanges, DispatchError>;
}

/// Logs every action together with the changes it produced and the wall
/// time the downstream stages took. Never alters control flow or the
/// change list.
pub struct LogInterceptor {
    logger: Arc<dyn Logger>,
}

impl LogInterceptor {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self { logger }
    }
}

impl Interceptor for LogInterceptor {
    fn intercept(&self, chain: &mut Chain<'_>) -> Result<StoreChanges, DispatchError> {
        if chain.mode() == DispatchMode::Background {
            self.logger.i(&format!(
                " \n┌────────────────────────────────────────────\n\
                 │─> {:?} (background)\n\
                 └────────────────────────────────────────────",
                chain.action(),
            ));
        }

        let started = Instant::now();
        let changes = chain.proceed()?;
        let elapsed = started.elapsed();

        let mut msg = format!(
            " \n┌────────────────────────────────────────────\n│─> {:?} [{}ms]\n",
            chain.action(),
            elapsed.as_millis(),
        );
        for change in &changes {
            msg.push_str(&format!("│   {} = {:?}\n", change.store, change.state));
        }
        msg.push_str("└────────────────────────────────────────────");
        self.logger.i(&msg);

        Ok(changes)
    }
}

/// Terminal stage: offers the action to every store in registration order
/// and accumulates a [`StoreChange`] for each store whose state actually
/// changed.
pub struct StoreInterceptor {
    logger: Arc<dyn Logger>,
    stores: Arc<Vec<Arc<dyn AnyStore>>>,
}

impl StoreInterceptor {
    pub fn new(logger: Arc<dyn Logger>, stores: Arc<Vec<Arc<dyn AnyStore>>>) -> Self {
        Self { logger, stores }
    }
}

impl Interceptor for StoreInterceptor {
    fn intercept(&self, chain: &mut Chain<'_>) -> Result<StoreChanges, DispatchError> {
        let mut changed = StoreChanges::new();
        for store in self.stores.iter() {
            if !store.can_handle(chain.action()) {
                continue;
            }
            self.logger.d(&format!(
                "dispatching {:?} on {}",
                chain.action(),
                store.name()
            ));
            if let Some(state) = store.dispatch_erased(chain.action())? {
                changed.push(StoreChange {
                    store: store.name(),
                    state,
                });
            }
        }
        Ok(changed)
    }
}
