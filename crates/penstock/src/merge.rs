//! Derived snapshot streams over several stores.

use std::sync::Arc;

use futures::future;
use futures::stream::{self, BoxStream, StreamExt};

use crate::store::{Store, StoreDefinition};

type ProjectFn<R> = Box<dyn Fn() -> R + Send + Sync>;
type TicksFn = Box<dyn Fn(bool) -> BoxStream<'static, ()> + Send + Sync>;

struct Contributor<R> {
    current: ProjectFn<R>,
    ticks: TicksFn,
}

/// Combines the projected state of N stores into one snapshot stream.
///
/// Every emission of *any* contributing store re-projects **all**
/// contributors' current values into an ordered snapshot (registration
/// order), even though only one of them changed. Consecutive identical
/// snapshots are suppressed.
#[must_use = "a merger does nothing until `stream`"]
pub struct StateMerger<R> {
    contributors: Vec<Contributor<R>>,
}

impl<R> StateMerger<R>
where
    R: Clone + PartialEq + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            contributors: Vec::new(),
        }
    }

    /// Register `store` with the projection applied to its state on every
    /// snapshot. Registration order is snapshot order.
    pub fn merge<D, F>(mut self, store: &Arc<Store<D>>, project: F) -> Self
    where
        D: StoreDefinition,
        F: Fn(&D::State) -> R + Send + Sync + 'static,
    {
        let current: ProjectFn<R> = {
            let store = store.clone();
            Box::new(move || project(&store.state()))
        };
        let ticks: TicksFn = {
            let store = store.clone();
            Box::new(move |hot_start| store.changes(hot_start).map(|_| ()).boxed())
        };
        self.contributors.push(Contributor { current, ticks });
        self
    }

    /// The combined stream. One `hot_start` flag applies uniformly to every
    /// contributor: hot, the first snapshot arrives immediately; cold, only
    /// after the first change anywhere.
    pub fn stream(self, hot_start: bool) -> BoxStream<'static, Vec<R>> {
        let (ticks, currents): (Vec<_>, Vec<_>) = self
            .contributors
            .into_iter()
            .map(|contributor| ((contributor.ticks)(hot_start), contributor.current))
            .unzip();

        stream::select_all(ticks)
            .map(move |_| currents.iter().map(|project| project()).collect::<Vec<R>>())
            .scan(None::<Vec<R>>, |last, snapshot| {
                let fresh = last.as_ref() != Some(&snapshot);
                if fresh {
                    *last = Some(snapshot.clone());
                }
                future::ready(Some(fresh.then_some(snapshot)))
            })
            .filter_map(future::ready)
            .boxed()
    }
}

impl<R> Default for StateMerger<R>
where
    R: Clone + PartialEq + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
