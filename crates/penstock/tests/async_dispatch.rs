//! Background dispatch (feature `unstable`).

#![cfg(feature = "unstable")]

use std::sync::Arc;

use penstock_core::{Action, AnyStore, AsyncAction, Dispatcher, Store};
use penstock_testing::{ContentState, StoreOne, StoreTwo, TestLogger};

#[derive(Debug, Clone)]
struct RefreshBoth {
    content: String,
}

impl Action for RefreshBoth {}
impl AsyncAction for RefreshBoth {}

struct RefreshStore;

impl penstock_core::StoreDefinition for RefreshStore {
    type State = ContentState;

    fn initial_state(&self) -> ContentState {
        ContentState::default()
    }

    fn init(&self, reducers: &mut penstock_core::Reducers<ContentState>) {
        reducers.reduce(|_state: &ContentState, action: &RefreshBoth| ContentState {
            content: action.content.clone(),
        });
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn background_dispatch_runs_the_same_chain() {
    let logger = TestLogger::new();
    let dispatcher = Dispatcher::with_logger(Arc::new(logger.clone()));
    let store = Store::new(RefreshStore);
    let stores: Vec<Arc<dyn AnyStore>> = vec![store.clone()];
    dispatcher.set_stores(stores);

    let changes = dispatcher
        .dispatch_async(RefreshBoth {
            content: "refreshed".into(),
        })
        .await
        .unwrap();

    assert_eq!(changes.len(), 1);
    assert_eq!(store.state().content, "refreshed");

    // Background actions get their own pre-dispatch log block.
    assert!(logger.contains("(background)"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn background_dispatch_still_fans_out() {
    let dispatcher = Dispatcher::with_logger(Arc::new(penstock_core::NoopLogger));
    let one = Store::new(StoreOne);
    let two = Store::new(StoreTwo);
    let stores: Vec<Arc<dyn AnyStore>> = vec![one.clone(), two.clone()];
    dispatcher.set_stores(stores);

    // Content actions stay synchronous; the async surface composes with
    // the same stores through its own marked action type.
    let changes = dispatcher
        .dispatch_async(RefreshBoth {
            content: "x".into(),
        })
        .await
        .unwrap();
    assert!(changes.is_empty());
    assert_eq!(one.state().content, "initial");
    assert_eq!(two.state().content, "initial");
}
