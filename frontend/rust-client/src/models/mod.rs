use serde::{Deserialize, Serialize};

use crate::error::ClientError;

pub mod attempt;
pub mod document;
pub mod pdf;
pub mod quiz;
pub mod user;

pub use attempt::{
    AttemptDetail, AttemptList, AttemptListItem, AttemptQuiz, AttemptRecord, QuestionResult,
    SubmitQuizRequest, SubmitResult,
};
pub use document::{DocumentFile, DocumentKind};
pub use pdf::{HealthResponse, PdfData, PdfInfoData, PdfInfoResponse, PdfUploadResponse};
pub use quiz::{Difficulty, GenerateQuizRequest, Question, Quiz, QuizDetails, QuizPage};
pub use user::{Credentials, Session, User};

/// The backend's `{success, message, data}` wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

fn default_true() -> bool {
    true
}

impl<T> ApiEnvelope<T> {
    pub fn into_data(self) -> Result<T, ClientError> {
        if !self.success {
            return Err(ClientError::Decode(if self.message.is_empty() {
                "request was not successful".to_string()
            } else {
                self.message
            }));
        }
        self.data
            .ok_or_else(|| ClientError::Decode("response envelope has no data".to_string()))
    }
}

/// Acknowledgement-only envelope (delete, update).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiMessage {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

// Ids arrive as strings from the Go handlers but as numbers from some
// repository paths.
pub(crate) mod string_or_number {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
        Uint(u64),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Str(s) => s,
            Raw::Int(n) => n.to_string(),
            Raw::Uint(n) => n.to_string(),
        })
    }
}

// Some repository paths store maps and lists as JSON text columns and
// return them still encoded.
pub(crate) mod embedded_json {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw<T> {
        Text(String),
        Value(T),
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned + Default,
    {
        match Option::<Raw<T>>::deserialize(deserializer)? {
            None => Ok(T::default()),
            Some(Raw::Value(value)) => Ok(value),
            Some(Raw::Text(text)) if text.trim().is_empty() => Ok(T::default()),
            Some(Raw::Text(text)) => serde_json::from_str(&text).map_err(serde::de::Error::custom),
        }
    }
}

// Serde converters for optional timestamps in any shape parse_timestamp accepts
pub(crate) mod flexible_datetime {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::utils::parse_timestamp;

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => serializer.serialize_str(&d.to_rfc3339_opts(SecondsFormat::Secs, true)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) if s.trim().is_empty() => Ok(None),
            Some(s) => parse_timestamp(&s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", s))),
        }
    }
}
