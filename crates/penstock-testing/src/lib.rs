//! Test fixtures for exercising the Penstock engine: canned actions and
//! stores (with adjustable reducer latency to provoke contention), a
//! capturing logger, and stream assertion helpers.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::Stream;
use futures::StreamExt;
use penstock_core::{Action, AsyncResult, Logger, Reducers, StoreDefinition};

// ============================================================================
// Content fixtures — plain string states
// ============================================================================

/// Handled by both [`StoreOne`] and [`StoreTwo`].
#[derive(Debug, Clone)]
pub struct SetBoth {
    pub content: String,
    pub delay: Duration,
}

impl SetBoth {
    pub fn new(content: &str) -> Self {
        Self {
            content: content.into(),
            delay: Duration::ZERO,
        }
    }

    /// Variant whose reducer sleeps, to provoke contention in tests.
    pub fn slow(content: &str, delay: Duration) -> Self {
        Self {
            content: content.into(),
            delay,
        }
    }
}

impl Action for SetBoth {}

/// Handled only by [`StoreOne`].
#[derive(Debug, Clone)]
pub struct SetOne {
    pub content: String,
    pub delay: Duration,
}

impl SetOne {
    pub fn new(content: &str) -> Self {
        Self {
            content: content.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn slow(content: &str, delay: Duration) -> Self {
        Self {
            content: content.into(),
            delay,
        }
    }
}

impl Action for SetOne {}

/// Handled only by [`StoreTwo`].
#[derive(Debug, Clone)]
pub struct SetTwo {
    pub content: String,
    pub delay: Duration,
}

impl SetTwo {
    pub fn new(content: &str) -> Self {
        Self {
            content: content.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn slow(content: &str, delay: Duration) -> Self {
        Self {
            content: content.into(),
            delay,
        }
    }
}

impl Action for SetTwo {}

/// Handled by no store at all.
#[derive(Debug, Clone)]
pub struct Unhandled(pub String);

impl Action for Unhandled {}

#[derive(Debug, Clone, PartialEq)]
pub struct ContentState {
    pub content: String,
}

impl Default for ContentState {
    fn default() -> Self {
        Self {
            content: "initial".into(),
        }
    }
}

/// Reduces [`SetBoth`] and [`SetOne`].
#[derive(Debug, Default)]
pub struct StoreOne;

impl StoreDefinition for StoreOne {
    type State = ContentState;

    fn initial_state(&self) -> ContentState {
        ContentState::default()
    }

    fn init(&self, reducers: &mut Reducers<ContentState>) {
        reducers
            .reduce(|_state: &ContentState, action: &SetBoth| {
                std::thread::sleep(action.delay);
                ContentState {
                    content: action.content.clone(),
                }
            })
            .reduce(|_state: &ContentState, action: &SetOne| {
                std::thread::sleep(action.delay);
                ContentState {
                    content: action.content.clone(),
                }
            });
    }
}

/// Reduces [`SetBoth`] and [`SetTwo`].
#[derive(Debug, Default)]
pub struct StoreTwo;

impl StoreDefinition for StoreTwo {
    type State = ContentState;

    fn initial_state(&self) -> ContentState {
        ContentState::default()
    }

    fn init(&self, reducers: &mut Reducers<ContentState>) {
        reducers
            .reduce(|_state: &ContentState, action: &SetBoth| {
                std::thread::sleep(action.delay);
                ContentState {
                    content: action.content.clone(),
                }
            })
            .reduce(|_state: &ContentState, action: &SetTwo| {
                std::thread::sleep(action.delay);
                ContentState {
                    content: action.content.clone(),
                }
            });
    }
}

// ============================================================================
// Outcome fixtures — states carrying an async result life cycle
// ============================================================================

/// Concludes both [`OutcomeStoreOne`] and [`OutcomeStoreTwo`].
#[derive(Debug, Clone)]
pub struct ConcludeBoth(pub AsyncResult<String>);

impl Action for ConcludeBoth {}

/// Concludes only [`OutcomeStoreOne`].
#[derive(Debug, Clone)]
pub struct ConcludeOne(pub AsyncResult<String>);

impl Action for ConcludeOne {}

/// Concludes only [`OutcomeStoreTwo`].
#[derive(Debug, Clone)]
pub struct ConcludeTwo(pub AsyncResult<String>);

impl Action for ConcludeTwo {}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OutcomeState {
    pub content: AsyncResult<String>,
}

#[derive(Debug, Default)]
pub struct OutcomeStoreOne;

impl StoreDefinition for OutcomeStoreOne {
    type State = OutcomeState;

    fn initial_state(&self) -> OutcomeState {
        OutcomeState::default()
    }

    fn init(&self, reducers: &mut Reducers<OutcomeState>) {
        reducers
            .reduce(|_state: &OutcomeState, action: &ConcludeBoth| OutcomeState {
                content: action.0.clone(),
            })
            .reduce(|_state: &OutcomeState, action: &ConcludeOne| OutcomeState {
                content: action.0.clone(),
            });
    }
}

#[derive(Debug, Default)]
pub struct OutcomeStoreTwo;

impl StoreDefinition for OutcomeStoreTwo {
    type State = OutcomeState;

    fn initial_state(&self) -> OutcomeState {
        OutcomeState::default()
    }

    fn init(&self, reducers: &mut Reducers<OutcomeState>) {
        reducers
            .reduce(|_state: &OutcomeState, action: &ConcludeBoth| OutcomeState {
                content: action.0.clone(),
            })
            .reduce(|_state: &OutcomeState, action: &ConcludeTwo| OutcomeState {
                content: action.0.clone(),
            });
    }
}

/// An error for feeding [`AsyncResult::failure`] in tests.
pub fn test_error(msg: &str) -> anyhow::Error {
    anyhow::anyhow!("{msg}")
}

// ============================================================================
// Capturing logger
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Verbose,
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

/// Captures everything the engine logs, for assertions.
#[derive(Clone, Default)]
pub struct TestLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl TestLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries()
            .iter()
            .any(|entry| entry.message.contains(needle))
    }

    fn push(&self, level: LogLevel, message: &str) {
        self.entries.lock().unwrap().push(LogEntry {
            at: Utc::now(),
            level,
            message: message.to_string(),
        });
    }
}

impl Logger for TestLogger {
    fn v(&self, msg: &str) {
        self.push(LogLevel::Verbose, msg);
    }

    fn d(&self, msg: &str) {
        self.push(LogLevel::Debug, msg);
    }

    fn i(&self, msg: &str) {
        self.push(LogLevel::Info, msg);
    }

    fn w(&self, msg: &str) {
        self.push(LogLevel::Warn, msg);
    }

    fn e(&self, msg: &str) {
        self.push(LogLevel::Error, msg);
    }
}

// ============================================================================
// Stream assertion helpers
// ============================================================================

/// Collect the next `n` items, panicking if they don't all arrive in time.
pub async fn take_next<S>(stream: &mut S, n: usize) -> Vec<S::Item>
where
    S: Stream + Unpin,
{
    let mut items = Vec::with_capacity(n);
    for i in 0..n {
        let item = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .unwrap_or_else(|_| panic!("item {i} did not arrive within 5s"))
            .unwrap_or_else(|| panic!("stream ended before item {i}"));
        items.push(item);
    }
    items
}

/// Assert the stream emits nothing for `window`.
pub async fn expect_silence<S>(stream: &mut S, window: Duration)
where
    S: Stream + Unpin,
{
    match tokio::time::timeout(window, stream.next()).await {
        Err(_) => {}
        Ok(Some(_)) => panic!("stream emitted within {window:?} when silence was expected"),
        Ok(None) => panic!("stream ended within {window:?} when silence was expected"),
    }
}
