use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use quest_core::model::UserId;

use super::{
    AuthCallback, AuthEvent, AuthListeners, AuthSession, AuthSubscription, AuthUser,
    IdentityProvider, SignInForm, SignUpForm, SignUpOutcome,
};
use crate::error::IdentityError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GoTrueConfig {
    pub base_url: String,
    pub anon_key: String,
}

impl GoTrueConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            anon_key: anon_key.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url.trim_end_matches('/'))
    }
}

/// Client for a hosted GoTrue-compatible auth REST API.
#[derive(Clone)]
pub struct GoTrueIdentity {
    client: Client,
    config: GoTrueConfig,
    session: Arc<Mutex<Option<AuthSession>>>,
    listeners: AuthListeners,
}

impl GoTrueIdentity {
    #[must_use]
    pub fn new(config: GoTrueConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            session: Arc::new(Mutex::new(None)),
            listeners: AuthListeners::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<AuthSession>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn store(&self, session: AuthSession) -> AuthSession {
        *self.lock() = Some(session.clone());
        self.listeners.emit(&AuthEvent::SignedIn(session.clone()));
        session
    }
}

#[async_trait]
impl IdentityProvider for GoTrueIdentity {
    async fn get_session(&self) -> Result<Option<AuthSession>, IdentityError> {
        Ok(self.lock().clone())
    }

    fn on_auth_state_change(&self, callback: AuthCallback) -> AuthSubscription {
        self.listeners.subscribe(callback)
    }

    #[instrument(skip_all)]
    async fn sign_in_with_password(
        &self,
        form: &SignInForm,
    ) -> Result<AuthSession, IdentityError> {
        let email = form.validate()?;
        let response = self
            .client
            .post(self.config.endpoint("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.config.anon_key)
            .json(&PasswordGrant {
                email,
                password: &form.password,
            })
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST {
            tracing::warn!("sign in rejected");
            return Err(IdentityError::InvalidCredentials);
        }
        let body: TokenResponse = checked(response).await?.json().await?;
        let session = body.into_session()?;
        tracing::info!(user = %session.user.id, "signed in");
        Ok(self.store(session))
    }

    #[instrument(skip_all)]
    async fn sign_up(&self, form: &SignUpForm) -> Result<SignUpOutcome, IdentityError> {
        let email = form.validate()?;
        let username = form.username.trim();
        let response = self
            .client
            .post(self.config.endpoint("signup"))
            .header("apikey", &self.config.anon_key)
            .json(&SignUpRequest {
                email,
                password: &form.password,
                data: SignUpMetadata {
                    username,
                    full_name: username,
                },
            })
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNPROCESSABLE_ENTITY || status == StatusCode::BAD_REQUEST {
            let message = error_message(response).await;
            if message.to_lowercase().contains("already registered") {
                return Err(IdentityError::AlreadyRegistered(email.to_owned()));
            }
            return Err(IdentityError::HttpStatus { status, message });
        }

        match checked(response).await?.json::<SignUpResponse>().await? {
            SignUpResponse::Session(body) => {
                let session = body.into_session()?;
                tracing::info!(user = %session.user.id, "signed up");
                Ok(SignUpOutcome::SignedIn(self.store(session)))
            }
            SignUpResponse::User(user) => {
                let user = user.into_auth_user()?;
                tracing::info!(user = %user.id, "signed up, awaiting confirmation");
                Ok(SignUpOutcome::ConfirmationRequired(user))
            }
        }
    }

    #[instrument(skip_all)]
    async fn sign_out(&self) -> Result<(), IdentityError> {
        let Some(session) = self.lock().take() else {
            return Ok(());
        };
        self.listeners.emit(&AuthEvent::SignedOut);

        let response = self
            .client
            .post(self.config.endpoint("logout"))
            .query(&[("scope", "global")])
            .header("apikey", &self.config.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await?;
        checked(response).await?;
        tracing::info!(user = %session.user.id, "signed out");
        Ok(())
    }
}

async fn checked(response: Response) -> Result<Response, IdentityError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = error_message(response).await;
    tracing::error!(%status, %message, "identity request failed");
    Err(IdentityError::HttpStatus { status, message })
}

async fn error_message(response: Response) -> String {
    match response.json::<ErrorBody>().await {
        Ok(body) => body
            .error_description
            .or(body.msg)
            .or(body.message)
            .or(body.error)
            .unwrap_or_default(),
        Err(_) => String::new(),
    }
}

#[derive(Debug, Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    data: SignUpMetadata<'a>,
}

#[derive(Debug, Serialize)]
struct SignUpMetadata<'a> {
    username: &'a str,
    full_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    user: UserBody,
}

impl TokenResponse {
    fn into_session(self) -> Result<AuthSession, IdentityError> {
        Ok(AuthSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: self
                .expires_at
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
            user: self.user.into_auth_user()?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(UserBody),
}

#[derive(Debug, Deserialize)]
struct UserBody {
    id: String,
    email: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

impl UserBody {
    fn into_auth_user(self) -> Result<AuthUser, IdentityError> {
        let id: UserId = self
            .id
            .parse()
            .map_err(|_| IdentityError::UnexpectedResponse(format!("user id {}", self.id)))?;
        Ok(AuthUser {
            id,
            email: self.email.unwrap_or_default(),
            username: self.user_metadata.username,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct UserMetadata {
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
}
