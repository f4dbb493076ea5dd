use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Identity-provider user. This crate only ever reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Map<String, serde_json::Value>,
}

impl User {
    /// Name from `full_name`/`name` metadata, else the email local part.
    pub fn display_name(&self) -> String {
        let from_metadata = ["full_name", "name"]
            .iter()
            .filter_map(|key| self.user_metadata.get(*key))
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .find(|v| !v.is_empty());

        if let Some(name) = from_metadata {
            return name.to_string();
        }

        self.email
            .as_deref()
            .and_then(|email| email.split('@').next())
            .filter(|local| !local.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| "User".to_string())
    }

    pub fn initials(&self) -> String {
        self.display_name()
            .split(|c: char| c.is_whitespace() || c == '.' || c == '_' || c == '-')
            .filter_map(|word| word.chars().next())
            .take(2)
            .flat_map(char::to_uppercase)
            .collect()
    }
}

/// GoTrue session as returned by the token endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Unix seconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl Session {
    const EXPIRY_MARGIN_SECS: i64 = 30;

    /// Expired, or close enough that a request sent now could be rejected.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(at) => Utc::now().timestamp() + Self::EXPIRY_MARGIN_SECS >= at,
            None => false,
        }
    }

    /// Fills `expires_at` from `expires_in` when the server sent only the latter.
    pub fn with_absolute_expiry(mut self) -> Self {
        if self.expires_at.is_none() {
            if let Some(secs) = self.expires_in {
                self.expires_at = Some(Utc::now().timestamp() + secs);
            }
        }
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Credentials {
    #[validate(email(message = "a valid email address is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}
