//! # Login Flow Demo
//!
//! Walks the engine through a small login + account flow: an action flips
//! the store to `Loading` and hands the work to a simulated API; the API
//! dispatches the settled result as a follow-up action; a sequence chains
//! the dependent steps and a merged stream narrates both stores.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::StreamExt;
use penstock_core::{
    Action, AnyStore, AsyncResult, Dispatcher, Reducers, SequenceBuilder, StateMerger, Store,
    StoreDefinition,
};
use penstock_viewmodel::ViewModel;

// ============================================================================
// Actions
// ============================================================================

#[derive(Debug, Clone)]
struct LoginAction {
    username: String,
    password: String,
}

impl Action for LoginAction {}

#[derive(Debug, Clone)]
struct LoginResultAction(AsyncResult<String>);

impl Action for LoginResultAction {}

#[derive(Debug, Clone)]
struct LoadAccountAction {
    username: String,
}

impl Action for LoadAccountAction {}

#[derive(Debug, Clone)]
struct LoadAccountResultAction(AsyncResult<Account>);

impl Action for LoadAccountResultAction {}

// ============================================================================
// States
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
struct Account {
    name: String,
    active: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
struct LoginState {
    login: AsyncResult<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
struct AccountState {
    account: AsyncResult<Account>,
}

// ============================================================================
// Stores
// ============================================================================

struct LoginStore {
    api: AuthApi,
}

impl StoreDefinition for LoginStore {
    type State = LoginState;

    fn initial_state(&self) -> LoginState {
        LoginState::default()
    }

    fn init(&self, reducers: &mut Reducers<LoginState>) {
        let api = self.api.clone();
        reducers
            .reduce(move |_state: &LoginState, action: &LoginAction| {
                api.login(&action.username, &action.password);
                LoginState {
                    login: AsyncResult::loading(),
                }
            })
            .reduce(|_state: &LoginState, action: &LoginResultAction| LoginState {
                login: action.0.clone(),
            });
    }
}

struct AccountStore {
    api: AuthApi,
}

impl StoreDefinition for AccountStore {
    type State = AccountState;

    fn initial_state(&self) -> AccountState {
        AccountState::default()
    }

    fn init(&self, reducers: &mut Reducers<AccountState>) {
        let api = self.api.clone();
        reducers
            .reduce(move |_state: &AccountState, action: &LoadAccountAction| {
                api.fetch_account(&action.username);
                AccountState {
                    account: AsyncResult::loading(),
                }
            })
            .reduce(
                |_state: &AccountState, action: &LoadAccountResultAction| AccountState {
                    account: action.0.clone(),
                },
            );
    }
}

// ============================================================================
// Simulated API — resolves after a delay and dispatches the result action
// ============================================================================

#[derive(Clone)]
struct AuthApi {
    dispatcher: Dispatcher,
}

impl AuthApi {
    fn login(&self, username: &str, _password: &str) {
        let dispatcher = self.dispatcher.clone();
        let username = username.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(400)).await;
            let result = if fastrand::u8(0..4) > 0 {
                AsyncResult::success(format!("session-{}", fastrand::u32(..)))
            } else {
                AsyncResult::failure(anyhow::anyhow!("invalid credentials for {username}"))
            };
            dispatcher
                .dispatch(LoginResultAction(result))
                .expect("login result dispatch");
        });
    }

    fn fetch_account(&self, username: &str) {
        let dispatcher = self.dispatcher.clone();
        let username = username.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            let result = if fastrand::u8(0..4) > 0 {
                AsyncResult::success(Account {
                    name: username.clone(),
                    active: true,
                })
            } else {
                AsyncResult::failure(anyhow::anyhow!("no account for {username}"))
            };
            dispatcher
                .dispatch(LoadAccountResultAction(result))
                .expect("account result dispatch");
        });
    }
}

// ============================================================================
// View model
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default)]
struct LoginViewState {
    loading: bool,
}

#[derive(Debug, Clone)]
enum LoginSideEffect {
    GoHome,
    LoginError(Option<Arc<anyhow::Error>>),
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let dispatcher = Dispatcher::new();
    let api = AuthApi {
        dispatcher: dispatcher.clone(),
    };

    let login_store = Store::new(LoginStore { api: api.clone() });
    let account_store = Store::new(AccountStore { api });
    let stores: Vec<Arc<dyn AnyStore>> = vec![login_store.clone(), account_store.clone()];
    dispatcher.set_stores(stores);

    // Narrate both stores as one derived snapshot stream.
    let mut status = StateMerger::new()
        .merge(&login_store, |state| describe(&state.login))
        .merge(&account_store, |state| describe(&state.account))
        .stream(true);
    tokio::spawn(async move {
        while let Some(snapshot) = status.next().await {
            tracing::info!("login={} account={}", snapshot[0], snapshot[1]);
        }
    });

    let view_model = Arc::new(ViewModel::<LoginViewState, LoginSideEffect>::new(
        LoginViewState::default(),
    ));
    let mut side_effects = view_model.side_effects();

    // The login flow: authenticate, then load the account, then land
    // somewhere — each step waiting for its store to conclude.
    SequenceBuilder::new()
        .next(
            {
                let dispatcher = dispatcher.clone();
                let login_store = login_store.clone();
                let view_model = view_model.clone();
                move || async move {
                    view_model.post_state(LoginViewState { loading: true });
                    dispatcher
                        .dispatch(LoginAction {
                            username: "bob".into(),
                            password: "hunter2".into(),
                        })
                        .expect("login dispatch");
                    login_store
                        .on_concluded(true, |state| state.login.clone())
                        .await
                }
            },
            {
                let dispatcher = dispatcher.clone();
                move |_token: String| {
                    dispatcher
                        .dispatch(LoadAccountAction {
                            username: "bob".into(),
                        })
                        .expect("account dispatch");
                }
            },
            {
                let view_model = view_model.clone();
                move |failure| {
                    view_model.publish_side_effect(LoginSideEffect::LoginError(failure.error));
                }
            },
        )
        .next(
            {
                let account_store = account_store.clone();
                move || async move {
                    account_store
                        .on_concluded(true, |state| state.account.clone())
                        .await
                }
            },
            {
                let view_model = view_model.clone();
                move |_account: Account| {
                    view_model.publish_side_effect(LoginSideEffect::GoHome);
                }
            },
            {
                let view_model = view_model.clone();
                move |failure| {
                    view_model.publish_side_effect(LoginSideEffect::LoginError(failure.error));
                }
            },
        )
        .on_finally({
            let view_model = view_model.clone();
            move || view_model.post_state(LoginViewState { loading: false })
        })
        .run()
        .await;

    match side_effects.next().await {
        Some(LoginSideEffect::GoHome) => {
            let account = account_store.state();
            tracing::info!("logged in, landing home as {:?}", account.account.value());
        }
        Some(LoginSideEffect::LoginError(error)) => {
            tracing::warn!("login flow failed: {error:?}");
        }
        None => {}
    }

    tracing::info!(
        "final states: login={:?} account={:?} view={:?}",
        login_store.state(),
        account_store.state(),
        view_model.state(),
    );

    Ok(())
}

fn describe<T>(result: &AsyncResult<T>) -> String {
    match result {
        AsyncResult::Empty => "empty".into(),
        AsyncResult::Loading { .. } => "loading".into(),
        AsyncResult::Success { .. } => "ok".into(),
        AsyncResult::Failure(_) => "failed".into(),
    }
}
