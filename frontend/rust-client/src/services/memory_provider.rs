use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{ClientError, ClientResult};
use crate::models::{Credentials, Session, User};
use crate::services::auth_service::{AuthData, IdentityProvider};

const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessClaims {
    pub sub: String, // user id
    pub email: String,
    pub role: String, // always "authenticated"
    pub exp: usize,
    pub iat: usize,
}

struct Account {
    user: User,
    password: String,
}

/// In-process identity provider issuing HS256 access tokens.
///
/// Accounts are auto-confirmed. Used for stub mode and tests.
pub struct MemoryIdentityProvider {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl_secs: i64,
    accounts: RwLock<HashMap<String, Account>>,
    session: RwLock<Option<Session>>,
}

impl MemoryIdentityProvider {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            accounts: RwLock::new(HashMap::new()),
            session: RwLock::new(None),
        }
    }

    pub fn with_token_ttl(mut self, secs: i64) -> Self {
        self.token_ttl_secs = secs;
        self
    }

    /// Seeds an account.
    pub fn with_account(mut self, email: &str, password: &str) -> Self {
        let key = email.trim().to_lowercase();
        let account = Account {
            user: new_user(&key),
            password: password.to_string(),
        };
        self.accounts.get_mut().insert(key, account);
        self
    }

    pub fn verify_token(&self, token: &str) -> ClientResult<AccessClaims> {
        decode::<AccessClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => ClientError::Auth("Token expired".to_string()),
                ErrorKind::InvalidSignature => {
                    ClientError::Auth("Invalid token signature".to_string())
                }
                _ => ClientError::Auth("Invalid token".to_string()),
            })
    }

    fn issue_session(&self, user: &User) -> ClientResult<Session> {
        let now = Utc::now().timestamp();
        let expires_at = now + self.token_ttl_secs;
        let claims = AccessClaims {
            sub: user.id.clone(),
            email: user.email.clone().unwrap_or_default(),
            role: "authenticated".to_string(),
            exp: expires_at.max(0) as usize,
            iat: now.max(0) as usize,
        };
        let access_token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ClientError::Auth(format!("Failed to issue token: {}", e)))?;

        Ok(Session {
            access_token,
            refresh_token: Uuid::new_v4().to_string(),
            token_type: "bearer".to_string(),
            expires_in: Some(self.token_ttl_secs),
            expires_at: Some(expires_at),
            user: user.clone(),
        })
    }
}

fn new_user(email: &str) -> User {
    User {
        id: Uuid::new_v4().to_string(),
        email: Some(email.to_string()),
        user_metadata: serde_json::Map::new(),
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn sign_up(&self, credentials: &Credentials) -> ClientResult<AuthData> {
        let key = credentials.email.trim().to_lowercase();
        let user = {
            let mut accounts = self.accounts.write().await;
            if accounts.contains_key(&key) {
                return Err(ClientError::Auth("User already registered".to_string()));
            }
            let user = new_user(&key);
            accounts.insert(
                key,
                Account {
                    user: user.clone(),
                    password: credentials.password.clone(),
                },
            );
            user
        };

        let session = self.issue_session(&user)?;
        *self.session.write().await = Some(session.clone());
        Ok(AuthData {
            user: Some(user),
            session: Some(session),
        })
    }

    async fn sign_in(&self, credentials: &Credentials) -> ClientResult<AuthData> {
        let key = credentials.email.trim().to_lowercase();
        let user = {
            let accounts = self.accounts.read().await;
            match accounts.get(&key) {
                Some(account) if account.password == credentials.password => account.user.clone(),
                _ => return Err(ClientError::Auth("Invalid login credentials".to_string())),
            }
        };

        let session = self.issue_session(&user)?;
        *self.session.write().await = Some(session.clone());
        Ok(AuthData {
            user: Some(user),
            session: Some(session),
        })
    }

    async fn sign_out(&self) -> ClientResult<()> {
        self.session.write().await.take();
        Ok(())
    }

    async fn get_user(&self) -> ClientResult<Option<User>> {
        Ok(self.get_session().await?.map(|s| s.user))
    }

    async fn get_session(&self) -> ClientResult<Option<Session>> {
        let mut session = self.session.write().await;
        let current = match session.as_ref() {
            Some(s) => s.clone(),
            None => return Ok(None),
        };
        if !current.is_expired() {
            return Ok(Some(current));
        }

        // Expired: reissue as a refresh would
        let refreshed = self.issue_session(&current.user)?;
        *session = Some(refreshed.clone());
        Ok(Some(refreshed))
    }
}
