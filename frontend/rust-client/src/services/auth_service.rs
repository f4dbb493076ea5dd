use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use validator::Validate;

use crate::error::ClientResult;
use crate::models::{Credentials, Session, User};
use crate::services::http_client::TokenSource;

/// What a sign-up or sign-in produced. Sign-up without auto-confirm yields
/// a user but no session.
#[derive(Debug, Clone, Default)]
pub struct AuthData {
    pub user: Option<User>,
    pub session: Option<Session>,
}

/// Backend that owns accounts and sessions.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, credentials: &Credentials) -> ClientResult<AuthData>;
    async fn sign_in(&self, credentials: &Credentials) -> ClientResult<AuthData>;
    async fn sign_out(&self) -> ClientResult<()>;
    async fn get_user(&self) -> ClientResult<Option<User>>;
    async fn get_session(&self) -> ClientResult<Option<Session>>;
}

/// Stateless delegate over an identity provider; every call re-queries it.
#[derive(Clone)]
pub struct AuthService {
    provider: Arc<dyn IdentityProvider>,
    events: broadcast::Sender<Option<User>>,
}

impl AuthService {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self { provider, events }
    }

    pub async fn sign_up(&self, credentials: &Credentials) -> ClientResult<AuthData> {
        credentials.validate()?;
        let data = self.provider.sign_up(credentials).await?;
        tracing::info!(
            confirmed = data.session.is_some(),
            "User signed up"
        );
        if let Some(session) = &data.session {
            self.notify(Some(session.user.clone()));
        }
        Ok(data)
    }

    pub async fn sign_in(&self, credentials: &Credentials) -> ClientResult<AuthData> {
        credentials.validate()?;
        let data = self.provider.sign_in(credentials).await?;
        if let Some(user) = data.user.as_ref().or(data.session.as_ref().map(|s| &s.user)) {
            tracing::info!(user_id = %user.id, "User signed in");
            self.notify(Some(user.clone()));
        }
        Ok(data)
    }

    pub async fn sign_out(&self) -> ClientResult<()> {
        self.provider.sign_out().await?;
        tracing::info!("User signed out");
        self.notify(None);
        Ok(())
    }

    pub async fn current_user(&self) -> ClientResult<Option<User>> {
        self.provider.get_user().await
    }

    pub async fn session(&self) -> ClientResult<Option<Session>> {
        self.provider.get_session().await
    }

    pub async fn access_token(&self) -> ClientResult<Option<String>> {
        Ok(self.session().await?.map(|s| s.access_token))
    }

    /// Receiver of auth state changes: `Some(user)` on sign-in, `None` on sign-out.
    pub fn subscribe(&self) -> broadcast::Receiver<Option<User>> {
        self.events.subscribe()
    }

    /// Calls `callback` for every auth state change until the returned
    /// handle is dropped or unsubscribed. Must be called inside a runtime.
    pub fn on_auth_state_change<F>(&self, callback: F) -> AuthSubscription
    where
        F: Fn(Option<User>) + Send + Sync + 'static,
    {
        let mut rx = self.subscribe();
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(user) => callback(user),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Auth listener lagged behind");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        AuthSubscription { task: Some(task) }
    }

    fn notify(&self, user: Option<User>) {
        // No receivers is fine
        let _ = self.events.send(user);
    }
}

#[async_trait]
impl TokenSource for AuthService {
    async fn access_token(&self) -> Option<String> {
        match AuthService::access_token(self).await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "Could not resolve access token");
                None
            }
        }
    }
}

/// Listener registration returned by [`AuthService::on_auth_state_change`].
pub struct AuthSubscription {
    task: Option<JoinHandle<()>>,
}

impl AuthSubscription {
    pub fn unsubscribe(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        self.stop();
    }
}
