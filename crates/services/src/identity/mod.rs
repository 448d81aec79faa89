//! Identity collaborator: sessions, auth-state events and the explicit
//! session context handed to every component.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quest_core::model::UserId;

use crate::error::IdentityError;

pub mod forms;
pub mod gotrue;
pub mod memory;

pub use forms::{SignInForm, SignUpForm};
pub use gotrue::{GoTrueConfig, GoTrueIdentity};
pub use memory::InMemoryIdentity;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    pub email: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub user: AuthUser,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(AuthSession),
    SignedOut,
}

/// Result of a sign-up; hosted providers may hold the session until the
/// email address is confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    SignedIn(AuthSession),
    ConfirmationRequired(AuthUser),
}

pub type AuthCallback = Arc<dyn Fn(&AuthEvent) + Send + Sync>;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Current session, if any.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError` if the provider cannot be reached.
    async fn get_session(&self) -> Result<Option<AuthSession>, IdentityError>;

    /// Register a callback for auth-state changes. Dropping the returned
    /// subscription unsubscribes.
    fn on_auth_state_change(&self, callback: AuthCallback) -> AuthSubscription;

    /// # Errors
    ///
    /// Returns `IdentityError::Validation` for incomplete forms and
    /// `IdentityError::InvalidCredentials` for a rejected login.
    async fn sign_in_with_password(&self, form: &SignInForm)
    -> Result<AuthSession, IdentityError>;

    /// # Errors
    ///
    /// Returns `IdentityError::Validation` for incomplete or mismatched forms
    /// and `IdentityError::AlreadyRegistered` for a taken email.
    async fn sign_up(&self, form: &SignUpForm) -> Result<SignUpOutcome, IdentityError>;

    /// # Errors
    ///
    /// Returns `IdentityError` if the provider rejects the request. The local
    /// session is cleared either way.
    async fn sign_out(&self) -> Result<(), IdentityError>;
}

//
// ─── LISTENERS ────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct ListenerTable {
    next_id: u64,
    callbacks: BTreeMap<u64, AuthCallback>,
}

/// Callback registry shared by identity adapters.
#[derive(Clone, Default)]
pub struct AuthListeners {
    table: Arc<Mutex<ListenerTable>>,
}

fn lock_table(table: &Mutex<ListenerTable>) -> MutexGuard<'_, ListenerTable> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

impl AuthListeners {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn subscribe(&self, callback: AuthCallback) -> AuthSubscription {
        let mut table = lock_table(&self.table);
        let id = table.next_id;
        table.next_id += 1;
        table.callbacks.insert(id, callback);
        AuthSubscription {
            id,
            table: Arc::downgrade(&self.table),
        }
    }

    /// Deliver an event to every registered callback, in subscription order.
    pub fn emit(&self, event: &AuthEvent) {
        let callbacks: Vec<AuthCallback> = lock_table(&self.table)
            .callbacks
            .values()
            .cloned()
            .collect();
        for callback in callbacks {
            callback(event);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        lock_table(&self.table).callbacks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle for a registered auth-state callback.
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct AuthSubscription {
    id: u64,
    table: Weak<Mutex<ListenerTable>>,
}

impl AuthSubscription {
    pub fn unsubscribe(self) {}
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        if let Some(table) = self.table.upgrade() {
            lock_table(&table).callbacks.remove(&self.id);
        }
    }
}

//
// ─── SESSION CONTEXT ──────────────────────────────────────────────────────────
//

/// Explicit session handle passed to components in place of global auth state.
///
/// Kept current by an auth-state subscription held for the lifetime of the
/// context and its clones.
#[derive(Clone)]
pub struct SessionContext {
    state: Arc<RwLock<Option<AuthSession>>>,
    _subscription: Option<Arc<AuthSubscription>>,
}

impl SessionContext {
    /// Subscribe to auth-state changes, then load the current session.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError` if the initial session lookup fails.
    pub async fn attach(identity: &dyn IdentityProvider) -> Result<Self, IdentityError> {
        let state = Arc::new(RwLock::new(None));
        let event_seen = Arc::new(AtomicBool::new(false));
        let weak = Arc::downgrade(&state);
        let seen = Arc::clone(&event_seen);
        let subscription = identity.on_auth_state_change(Arc::new(move |event: &AuthEvent| {
            if let Some(state) = weak.upgrade() {
                let mut guard = state.write().unwrap_or_else(PoisonError::into_inner);
                *guard = match event {
                    AuthEvent::SignedIn(session) => Some(session.clone()),
                    AuthEvent::SignedOut => None,
                };
                seen.store(true, Ordering::Release);
            }
        }));

        let initial = identity.get_session().await?;
        {
            let mut guard = state.write().unwrap_or_else(PoisonError::into_inner);
            // An event delivered during the lookup is newer than the lookup.
            if !event_seen.load(Ordering::Acquire) {
                *guard = initial;
            }
        }

        Ok(Self {
            state,
            _subscription: Some(Arc::new(subscription)),
        })
    }

    /// Context that never changes; used by tests and one-shot tools.
    #[must_use]
    pub fn fixed(session: Option<AuthSession>) -> Self {
        Self {
            state: Arc::new(RwLock::new(session)),
            _subscription: None,
        }
    }

    #[must_use]
    pub fn session(&self) -> Option<AuthSession> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<AuthUser> {
        self.session().map(|session| session.user)
    }

    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|session| session.user.id)
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user_id().is_some()
    }
}
