use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::{header, multipart::Form, Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use url::Url;
use validator::Validate;

use crate::error::{ClientError, ClientResult};
use crate::metrics;

/// Supplies the bearer token for outgoing requests, if there is one.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Option<String>;
}

/// Token source for public endpoints.
pub struct Anonymous;

#[async_trait]
impl TokenSource for Anonymous {
    async fn access_token(&self) -> Option<String> {
        None
    }
}

/// Thin JSON-over-HTTP wrapper: one attempt per call, no retries, no timeout.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    tokens: Arc<dyn TokenSource>,
}

impl ApiClient {
    pub fn new(base_url: Url, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            http: Client::new(),
            base_url: with_trailing_slash(base_url),
            tokens,
        }
    }

    pub fn anonymous(base_url: Url) -> Self {
        Self::new(base_url, Arc::new(Anonymous))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> ClientResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::Validation(format!("invalid request path '{}': {}", path, e)))
    }

    /// Request builder with the bearer token attached when one is available.
    pub async fn request(&self, method: Method, path: &str) -> ClientResult<RequestBuilder> {
        let url = self.url(path)?;
        let mut builder = self.http.request(method, url);
        if let Some(token) = self.tokens.access_token().await {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ClientResult<T> {
        let builder = self
            .request(Method::GET, path)
            .await?
            .header(header::CONTENT_TYPE, "application/json")
            .query(query);
        self.send_json(builder, "GET", path).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::POST, path).await?.json(body);
        self.send_json(builder, "POST", path).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::PUT, path).await?.json(body);
        self.send_json(builder, "PUT", path).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let builder = self
            .request(Method::DELETE, path)
            .await?
            .header(header::CONTENT_TYPE, "application/json");
        self.send_json(builder, "DELETE", path).await
    }

    /// Multipart POST; reqwest sets the multipart content type with its boundary.
    pub async fn post_form<T: DeserializeOwned>(&self, path: &str, form: Form) -> ClientResult<T> {
        let builder = self.request(Method::POST, path).await?.multipart(form);
        self.send_json(builder, "POST", path).await
    }

    /// Sends the request and records metrics, without judging the status.
    pub async fn execute(
        &self,
        builder: RequestBuilder,
        method: &str,
        path: &str,
    ) -> ClientResult<Response> {
        let start = Instant::now();
        match builder.send().await {
            Ok(response) => {
                let status = response.status();
                metrics::record_request(
                    method,
                    path,
                    status.as_str(),
                    start.elapsed().as_secs_f64(),
                );
                tracing::debug!(%method, %path, status = status.as_u16(), "backend responded");
                Ok(response)
            }
            Err(e) => {
                metrics::record_request(method, path, "error", start.elapsed().as_secs_f64());
                tracing::warn!(%method, %path, error = %e, "request failed before a response");
                Err(ClientError::Transport(e))
            }
        }
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        method: &str,
        path: &str,
    ) -> ClientResult<T> {
        let response = self.execute(builder, method, path).await?;
        let status = response.status();

        // Non-2xx never reaches the success decoder
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(status, &body);
            tracing::warn!(%method, %path, status = status.as_u16(), %message, "backend returned an error");
            return Err(ClientError::Http { status, message });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            tracing::warn!(%method, %path, error = %e, "response did not match the expected shape");
            ClientError::Decode(format!("{} {}: {}", method, path, e))
        })
    }
}

/// Server-provided error text: the `error` or `message` field of a JSON
/// body, else the raw body, else a generic status line.
pub fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let field = ["error", "message", "msg", "error_description"]
            .iter()
            .filter_map(|key| value.get(*key))
            .filter_map(|v| v.as_str())
            .find(|s| !s.trim().is_empty());
        if let Some(text) = field {
            return text.to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed.starts_with('{') {
        format!("HTTP error! status: {}", status.as_u16())
    } else {
        trimmed.to_string()
    }
}

/// Server payloads that violate their schema are decode errors, not
/// client validation errors.
pub fn ensure_valid<T: Validate>(value: T) -> ClientResult<T> {
    value
        .validate()
        .map_err(|e| ClientError::Decode(e.to_string()))?;
    Ok(value)
}

/// Rejects ids that would change the request path.
pub fn id_segment(id: &str) -> ClientResult<&str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ClientError::Validation("id is required".to_string()));
    }
    if id
        .chars()
        .any(|c| matches!(c, '/' | '?' | '#' | '%' | '\\') || c.is_whitespace())
    {
        return Err(ClientError::Validation(format!("invalid id '{}'", id)));
    }
    // "." and ".." would be normalised away by the url join
    if id.chars().all(|c| c == '.') {
        return Err(ClientError::Validation(format!("invalid id '{}'", id)));
    }
    Ok(id)
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
