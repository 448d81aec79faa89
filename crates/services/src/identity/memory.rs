use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use quest_core::model::UserId;

use super::{
    AuthCallback, AuthEvent, AuthListeners, AuthSession, AuthSubscription, AuthUser,
    IdentityProvider, SignInForm, SignUpForm, SignUpOutcome,
};
use crate::error::IdentityError;

struct Account {
    user: AuthUser,
    password: String,
}

#[derive(Default)]
struct State {
    accounts: HashMap<String, Account>,
    current: Option<AuthSession>,
}

fn insert_account(
    state: &mut State,
    email: String,
    password: &str,
    username: Option<&str>,
) -> AuthUser {
    let user = AuthUser {
        id: UserId::random(),
        email: email.clone(),
        username: username.map(str::to_owned),
    };
    state.accounts.insert(
        email,
        Account {
            user: user.clone(),
            password: password.to_owned(),
        },
    );
    user
}

/// Local identity provider keeping accounts in memory.
#[derive(Clone, Default)]
pub struct InMemoryIdentity {
    state: Arc<Mutex<State>>,
    listeners: AuthListeners,
    require_confirmation: bool,
}

impl InMemoryIdentity {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sign-ups create the account but do not open a session.
    #[must_use]
    pub fn with_email_confirmation(mut self) -> Self {
        self.require_confirmation = true;
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an account directly, bypassing form validation.
    pub fn register(
        &self,
        email: &str,
        password: &str,
        username: Option<&str>,
    ) -> AuthUser {
        let key = email.trim().to_lowercase();
        insert_account(&mut self.lock(), key, password, username)
    }

    fn open_session(&self, user: AuthUser) -> AuthSession {
        let session = AuthSession {
            access_token: format!("local-{}", UserId::random()),
            refresh_token: None,
            expires_at: None,
            user,
        };
        self.lock().current = Some(session.clone());
        self.listeners.emit(&AuthEvent::SignedIn(session.clone()));
        session
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentity {
    async fn get_session(&self) -> Result<Option<AuthSession>, IdentityError> {
        Ok(self.lock().current.clone())
    }

    fn on_auth_state_change(&self, callback: AuthCallback) -> AuthSubscription {
        self.listeners.subscribe(callback)
    }

    async fn sign_in_with_password(
        &self,
        form: &SignInForm,
    ) -> Result<AuthSession, IdentityError> {
        let email = form.validate()?.to_lowercase();
        let user = {
            let state = self.lock();
            match state.accounts.get(&email) {
                Some(account) if account.password == form.password => account.user.clone(),
                _ => return Err(IdentityError::InvalidCredentials),
            }
        };
        Ok(self.open_session(user))
    }

    async fn sign_up(&self, form: &SignUpForm) -> Result<SignUpOutcome, IdentityError> {
        let email = form.validate()?.to_lowercase();
        let user = {
            let mut state = self.lock();
            if state.accounts.contains_key(&email) {
                return Err(IdentityError::AlreadyRegistered(email));
            }
            insert_account(&mut state, email, &form.password, Some(form.username.trim()))
        };
        if self.require_confirmation {
            return Ok(SignUpOutcome::ConfirmationRequired(user));
        }
        Ok(SignUpOutcome::SignedIn(self.open_session(user)))
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        let had_session = self.lock().current.take().is_some();
        if had_session {
            self.listeners.emit(&AuthEvent::SignedOut);
        }
        Ok(())
    }
}
