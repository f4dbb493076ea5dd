use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use tokio::sync::{Mutex, RwLock};
use url::Url;

use crate::error::{ClientError, ClientResult};
use crate::models::{Credentials, Session, User};
use crate::services::auth_service::{AuthData, IdentityProvider};

/// GoTrue REST client holding the current session.
pub struct SupabaseProvider {
    http: Client,
    base_url: Url,
    anon_key: String,
    session: RwLock<Option<Session>>,
    /// Serialises refreshes so a rotated refresh token is spent once.
    refresh_guard: Mutex<()>,
}

impl SupabaseProvider {
    pub fn new(base_url: Url, anon_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url,
            anon_key: anon_key.into(),
            session: RwLock::new(None),
            refresh_guard: Mutex::new(()),
        }
    }

    /// Starts from an existing session, e.g. one persisted by the caller.
    pub async fn restore_session(&self, session: Session) {
        *self.session.write().await = Some(session.with_absolute_expiry());
    }

    fn endpoint(&self, path: &str) -> ClientResult<Url> {
        self.base_url
            .join(&format!("auth/v1/{}", path))
            .map_err(|e| ClientError::Auth(format!("invalid auth url: {}", e)))
    }

    fn post(&self, url: Url, bearer: &str) -> RequestBuilder {
        self.http
            .post(url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    async fn token(&self, grant_type: &str, body: Value) -> ClientResult<Session> {
        let mut url = self.endpoint("token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);

        let response = self.post(url, &self.anon_key).json(&body).send().await?;
        let session: Session = parse(response).await?;
        Ok(session.with_absolute_expiry())
    }

    async fn refresh(&self, refresh_token: &str) -> ClientResult<Session> {
        self.token("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    /// Drops the stored session unless it was replaced in the meantime.
    async fn clear_if_current(&self, expected: &Session) {
        let mut slot = self.session.write().await;
        if slot.as_ref() == Some(expected) {
            slot.take();
        }
    }
}

async fn parse<T: serde::de::DeserializeOwned>(response: Response) -> ClientResult<T> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ClientError::Auth(provider_message(status, &body)));
    }
    serde_json::from_str(&body).map_err(|e| ClientError::Decode(format!("auth response: {}", e)))
}

/// GoTrue reports errors under several keys depending on version.
fn provider_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["error_description", "msg", "message", "error"]
                .iter()
                .find_map(|key| v.get(*key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| format!("authentication failed with status {}", status.as_u16()))
}

#[async_trait]
impl IdentityProvider for SupabaseProvider {
    async fn sign_up(&self, credentials: &Credentials) -> ClientResult<AuthData> {
        let url = self.endpoint("signup")?;
        let response = self
            .post(url, &self.anon_key)
            .json(&json!({ "email": credentials.email, "password": credentials.password }))
            .send()
            .await?;
        let value: Value = parse(response).await?;

        // Auto-confirm projects answer with a session, others with the bare user
        if value.get("access_token").is_some() {
            let session: Session = serde_json::from_value(value)?;
            let session = session.with_absolute_expiry();
            *self.session.write().await = Some(session.clone());
            Ok(AuthData {
                user: Some(session.user.clone()),
                session: Some(session),
            })
        } else {
            let user: User = serde_json::from_value(value)?;
            Ok(AuthData {
                user: Some(user),
                session: None,
            })
        }
    }

    async fn sign_in(&self, credentials: &Credentials) -> ClientResult<AuthData> {
        let session = self
            .token(
                "password",
                json!({ "email": credentials.email, "password": credentials.password }),
            )
            .await?;
        *self.session.write().await = Some(session.clone());
        Ok(AuthData {
            user: Some(session.user.clone()),
            session: Some(session),
        })
    }

    async fn sign_out(&self) -> ClientResult<()> {
        let Some(session) = self.session.write().await.take() else {
            return Ok(());
        };

        let url = self.endpoint("logout")?;
        let response = self.post(url, &session.access_token).send().await?;
        let status = response.status();
        // The local session is gone either way; an already-revoked token is not an error
        if !status.is_success() && status != StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Auth(provider_message(status, &body)));
        }
        Ok(())
    }

    async fn get_user(&self) -> ClientResult<Option<User>> {
        let Some(session) = self.get_session().await? else {
            return Ok(None);
        };

        let url = self.endpoint("user")?;
        let response = self
            .http
            .get(url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                tracing::info!("Stored session was rejected by the identity provider");
                self.session.write().await.take();
                Ok(None)
            }
            _ => parse(response).await.map(Some),
        }
    }

    async fn get_session(&self) -> ClientResult<Option<Session>> {
        let current = self.session.read().await.clone();
        match current {
            None => return Ok(None),
            Some(session) if !session.is_expired() => return Ok(Some(session)),
            Some(_) => {}
        }

        let _guard = self.refresh_guard.lock().await;
        // Another caller may have refreshed or signed out while we waited
        let Some(session) = self.session.read().await.clone() else {
            return Ok(None);
        };
        if !session.is_expired() {
            return Ok(Some(session));
        }
        if session.refresh_token.is_empty() {
            self.clear_if_current(&session).await;
            return Ok(None);
        }

        match self.refresh(&session.refresh_token).await {
            Ok(refreshed) => {
                let mut slot = self.session.write().await;
                if slot.as_ref() != Some(&session) {
                    tracing::debug!("Session changed during refresh, discarding result");
                    return Ok(slot.clone());
                }
                tracing::debug!("Refreshed expired session");
                *slot = Some(refreshed.clone());
                Ok(Some(refreshed))
            }
            Err(ClientError::Auth(message)) => {
                tracing::warn!(%message, "Session refresh rejected, signing out locally");
                self.clear_if_current(&session).await;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
