//! # Penstock ViewModel
//!
//! A view-state holder pairing one observable state value with a buffered
//! channel of one-shot side effects.
//!
//! The split matters for anything screen-shaped: view *state* is the thing
//! you can re-render at any time (current value always available, repeats
//! collapsed), while side *effects* are consumed exactly once each
//! (navigation, toasts) and must not be lost when published before the
//! consumer attaches.
//!
//! ```ignore
//! let vm: ViewModel<LoginViewState, LoginSideEffect> =
//!     ViewModel::new(LoginViewState::default());
//!
//! vm.post_state(LoginViewState { loading: true });
//! vm.publish_side_effect(LoginSideEffect::GoHome);
//!
//! let mut states = vm.states();       // hot, deduplicated
//! let mut effects = vm.side_effects(); // buffered, single consumer
//! ```

use std::sync::{Mutex, PoisonError};

use futures::future;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::{mpsc, watch};

/// Holds one view state plus a queue of one-shot side effects.
pub struct ViewModel<VS, E> {
    state_tx: watch::Sender<VS>,
    effects_tx: mpsc::UnboundedSender<E>,
    effects_rx: Mutex<Option<mpsc::UnboundedReceiver<E>>>,
}

impl<VS, E> ViewModel<VS, E>
where
    VS: Clone + PartialEq + Send + Sync + 'static,
    E: Send + 'static,
{
    /// A view model seeded with `initial`.
    pub fn new(initial: VS) -> Self {
        let (state_tx, _) = watch::channel(initial);
        let (effects_tx, effects_rx) = mpsc::unbounded_channel();
        Self {
            state_tx,
            effects_tx,
            effects_rx: Mutex::new(Some(effects_rx)),
        }
    }

    /// Current view state.
    pub fn state(&self) -> VS {
        self.state_tx.borrow().clone()
    }

    /// Replace the view state; observers wake on the next change.
    pub fn post_state(&self, state: VS) {
        self.state_tx.send_replace(state);
    }

    /// Hot stream of view states: the current value first, then every
    /// change, with consecutive equal values collapsed.
    pub fn states(&self) -> BoxStream<'static, VS> {
        let rx = self.state_tx.subscribe();
        stream::unfold((rx, true), |(mut rx, first)| async move {
            if first {
                let current = rx.borrow_and_update().clone();
                return Some((current, (rx, false)));
            }
            match rx.changed().await {
                Ok(()) => {
                    let next = rx.borrow_and_update().clone();
                    Some((next, (rx, false)))
                }
                Err(_) => None,
            }
        })
        .scan(None::<VS>, |last, state| {
            let fresh = last.as_ref() != Some(&state);
            if fresh {
                *last = Some(state.clone());
            }
            future::ready(Some(fresh.then_some(state)))
        })
        .filter_map(future::ready)
        .boxed()
    }

    /// Queue a side effect. Effects published before anyone subscribes are
    /// buffered and replayed in publication order.
    pub fn publish_side_effect(&self, effect: E) {
        let _ = self.effects_tx.send(effect);
    }

    /// The side-effect stream.
    ///
    /// # Panics
    ///
    /// If called twice: the queue has exactly one consumer, and splitting
    /// it would drop effects nondeterministically.
    pub fn side_effects(&self) -> BoxStream<'static, E> {
        let rx = self
            .effects_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(rx) = rx else {
            panic!("side effects already consumed; the stream has exactly one consumer");
        };
        stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|e| (e, rx)) }).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Default)]
    struct ViewState {
        data: String,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum ViewEffect {
        First,
        Second,
        Third,
    }

    fn view_model() -> ViewModel<ViewState, ViewEffect> {
        ViewModel::new(ViewState::default())
    }

    async fn next_of<T>(stream: &mut BoxStream<'static, T>) -> T {
        tokio::time::timeout(Duration::from_secs(2), stream.next())
            .await
            .expect("stream stayed silent")
            .expect("stream ended")
    }

    #[tokio::test]
    async fn side_effect_emits_after_subscription() {
        let vm = view_model();
        let mut effects = vm.side_effects();
        vm.publish_side_effect(ViewEffect::First);
        assert_eq!(next_of(&mut effects).await, ViewEffect::First);
    }

    #[tokio::test]
    async fn side_effects_buffer_before_subscription() {
        let vm = view_model();
        vm.publish_side_effect(ViewEffect::First);
        vm.publish_side_effect(ViewEffect::Second);

        let mut effects = vm.side_effects();
        assert_eq!(next_of(&mut effects).await, ViewEffect::First);
        assert_eq!(next_of(&mut effects).await, ViewEffect::Second);

        vm.publish_side_effect(ViewEffect::Third);
        assert_eq!(next_of(&mut effects).await, ViewEffect::Third);
    }

    #[tokio::test]
    #[should_panic(expected = "already consumed")]
    async fn side_effects_have_one_consumer() {
        let vm = view_model();
        let _first = vm.side_effects();
        let _second = vm.side_effects();
    }

    #[tokio::test]
    async fn states_start_hot_and_deduplicate() {
        let vm = view_model();
        vm.post_state(ViewState {
            data: "one".into(),
        });

        let mut states = vm.states();
        assert_eq!(next_of(&mut states).await.data, "one");

        // A repeat post is collapsed; the next distinct value comes through.
        vm.post_state(ViewState {
            data: "one".into(),
        });
        vm.post_state(ViewState {
            data: "two".into(),
        });
        assert_eq!(next_of(&mut states).await.data, "two");
    }
}
