//! Sequences driving real stores: dispatch, await the conclusion, branch.

use std::sync::{Arc, Mutex};

use penstock_core::{AnyStore, AsyncResult, Dispatcher, NoopLogger, SequenceBuilder, Store};
use penstock_testing::{
    test_error, ConcludeOne, ConcludeTwo, OutcomeStoreOne, OutcomeStoreTwo,
};

type Trace = Arc<Mutex<Vec<String>>>;

fn engine() -> (
    Dispatcher,
    Arc<Store<OutcomeStoreOne>>,
    Arc<Store<OutcomeStoreTwo>>,
) {
    let dispatcher = Dispatcher::with_logger(Arc::new(NoopLogger));
    let one = Store::new(OutcomeStoreOne);
    let two = Store::new(OutcomeStoreTwo);
    let stores: Vec<Arc<dyn AnyStore>> = vec![one.clone(), two.clone()];
    dispatcher.set_stores(stores);
    (dispatcher, one, two)
}

fn push(trace: &Trace, entry: impl Into<String>) {
    trace.lock().unwrap().push(entry.into());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn single_step_success() {
    let (dispatcher, one, _two) = engine();
    let trace: Trace = Arc::default();

    SequenceBuilder::new()
        .next(
            {
                let dispatcher = dispatcher.clone();
                let one = one.clone();
                move || async move {
                    dispatcher
                        .dispatch(ConcludeOne(AsyncResult::success("test".into())))
                        .unwrap();
                    one.on_concluded(true, |state| state.content.clone()).await
                }
            },
            {
                let trace = trace.clone();
                move |value: String| push(&trace, format!("success:{value}"))
            },
            |_| panic!("step cannot fail"),
        )
        .on_finally({
            let trace = trace.clone();
            move || push(&trace, "finally")
        })
        .run()
        .await;

    assert_eq!(*trace.lock().unwrap(), vec!["success:test", "finally"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn single_step_failure() {
    let (dispatcher, one, _two) = engine();
    let trace: Trace = Arc::default();

    SequenceBuilder::new()
        .next(
            {
                let dispatcher = dispatcher.clone();
                let one = one.clone();
                move || async move {
                    dispatcher
                        .dispatch(ConcludeOne(AsyncResult::failure(test_error("denied"))))
                        .unwrap();
                    one.on_concluded(true, |state| state.content.clone()).await
                }
            },
            |_: String| panic!("step cannot succeed"),
            {
                let trace = trace.clone();
                move |failure| {
                    let error = failure.error.expect("failure carries its error");
                    push(&trace, format!("failure:{error}"));
                }
            },
        )
        .on_finally({
            let trace = trace.clone();
            move || push(&trace, "finally")
        })
        .run()
        .await;

    assert_eq!(*trace.lock().unwrap(), vec!["failure:denied", "finally"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn success_flows_into_the_next_step() {
    let (dispatcher, one, two) = engine();
    let trace: Trace = Arc::default();

    SequenceBuilder::new()
        .next(
            {
                let dispatcher = dispatcher.clone();
                let one = one.clone();
                move || async move {
                    dispatcher
                        .dispatch(ConcludeOne(AsyncResult::success("first".into())))
                        .unwrap();
                    one.on_concluded(true, |state| state.content.clone()).await
                }
            },
            {
                let trace = trace.clone();
                move |value: String| push(&trace, value)
            },
            |_| panic!("first step cannot fail"),
        )
        .next(
            {
                let dispatcher = dispatcher.clone();
                let two = two.clone();
                move || async move {
                    dispatcher
                        .dispatch(ConcludeTwo(AsyncResult::success("second".into())))
                        .unwrap();
                    two.on_concluded(true, |state| state.content.clone()).await
                }
            },
            {
                let trace = trace.clone();
                move |value: String| push(&trace, value)
            },
            |_| panic!("second step cannot fail"),
        )
        .on_finally({
            let trace = trace.clone();
            move || push(&trace, "finally")
        })
        .run()
        .await;

    assert_eq!(*trace.lock().unwrap(), vec!["first", "second", "finally"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failure_halts_later_steps_but_not_the_finally_hook() {
    let (dispatcher, one, two) = engine();
    let trace: Trace = Arc::default();

    SequenceBuilder::new()
        .next(
            {
                let dispatcher = dispatcher.clone();
                let one = one.clone();
                move || async move {
                    dispatcher
                        .dispatch(ConcludeOne(AsyncResult::failure(test_error("denied"))))
                        .unwrap();
                    one.on_concluded(true, |state| state.content.clone()).await
                }
            },
            |_: String| panic!("step cannot succeed"),
            {
                let trace = trace.clone();
                move |_| push(&trace, "failed")
            },
        )
        .next(
            {
                let trace = trace.clone();
                let dispatcher = dispatcher.clone();
                let two = two.clone();
                move || {
                    push(&trace, "second origin ran");
                    async move {
                        dispatcher
                            .dispatch(ConcludeTwo(AsyncResult::success("second".into())))
                            .unwrap();
                        two.on_concluded(true, |state| state.content.clone()).await
                    }
                }
            },
            |_: String| {},
            |_| {},
        )
        .on_finally({
            let trace = trace.clone();
            move || push(&trace, "finally")
        })
        .run()
        .await;

    // The halted step's origin never ran; the finally hook still did,
    // exactly once, exactly last.
    assert_eq!(*trace.lock().unwrap(), vec!["failed", "finally"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn non_halting_failure_lets_the_rest_run() {
    let (dispatcher, one, two) = engine();
    let trace: Trace = Arc::default();

    SequenceBuilder::new()
        .next(
            {
                let dispatcher = dispatcher.clone();
                let one = one.clone();
                move || async move {
                    dispatcher
                        .dispatch(ConcludeOne(AsyncResult::success("first".into())))
                        .unwrap();
                    one.on_concluded(true, |state| state.content.clone()).await
                }
            },
            {
                let trace = trace.clone();
                move |_: String| push(&trace, "first")
            },
            |_| panic!("first step cannot fail"),
        )
        .next_non_halting(
            {
                let dispatcher = dispatcher.clone();
                let two = two.clone();
                move || async move {
                    dispatcher
                        .dispatch(ConcludeTwo(AsyncResult::failure(test_error("soft"))))
                        .unwrap();
                    two.on_concluded(true, |state| state.content.clone()).await
                }
            },
            |_: String| panic!("step cannot succeed"),
            {
                let trace = trace.clone();
                move |_| push(&trace, "soft failure")
            },
        )
        .next(
            {
                let dispatcher = dispatcher.clone();
                let two = two.clone();
                move || async move {
                    dispatcher
                        .dispatch(ConcludeTwo(AsyncResult::success("third".into())))
                        .unwrap();
                    two.on_concluded(true, |state| state.content.clone()).await
                }
            },
            {
                let trace = trace.clone();
                move |_: String| push(&trace, "third")
            },
            |_| panic!("third step cannot fail"),
        )
        .on_finally({
            let trace = trace.clone();
            move || push(&trace, "finally")
        })
        .run()
        .await;

    assert_eq!(
        *trace.lock().unwrap(),
        vec!["first", "soft failure", "third", "finally"]
    );
}
