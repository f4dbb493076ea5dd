use std::env;
use std::fmt;
use std::str::FromStr;

use url::Url;

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// Where quiz data comes from. Chosen once at startup, never switched on error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataSourceKind {
    #[default]
    Remote,
    Stub,
}

impl FromStr for DataSourceKind {
    type Err = config::ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "remote" => Ok(DataSourceKind::Remote),
            "stub" | "demo" => Ok(DataSourceKind::Stub),
            other => Err(config::ConfigError::Message(format!(
                "unknown data source '{}', expected 'remote' or 'stub'",
                other
            ))),
        }
    }
}

impl fmt::Display for DataSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceKind::Remote => write!(f, "remote"),
            DataSourceKind::Stub => write!(f, "stub"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: Url,
    pub auth_url: Option<Url>,
    pub auth_anon_key: Option<String>,
    pub data_source: DataSourceKind,
    pub max_upload_bytes: u64,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // .env is optional; real environment variables win
        dotenvy::dotenv().ok();

        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // config/{env}.toml + APP__SECTION__KEY overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let api_url = settings
            .get_string("api.url")
            .or_else(|_| env::var("NEXT_PUBLIC_API_URL"))
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let api_url = parse_url("api.url", &api_url)?;

        let auth_url = settings
            .get_string("auth.url")
            .or_else(|_| env::var("SUPABASE_URL"))
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(|v| parse_url("auth.url", &v))
            .transpose()?;

        let auth_anon_key = settings
            .get_string("auth.anon_key")
            .or_else(|_| env::var("SUPABASE_ANON_KEY"))
            .ok()
            .filter(|v| !v.is_empty());

        let data_source = settings
            .get_string("data_source")
            .or_else(|_| env::var("QUIZLIT_DATA_SOURCE"))
            .map(|v| v.parse::<DataSourceKind>())
            .unwrap_or(Ok(DataSourceKind::Remote))?;

        let max_upload_bytes = settings
            .get_int("upload.max_bytes")
            .ok()
            .and_then(|v| u64::try_from(v).ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        let email = settings
            .get_string("auth.email")
            .or_else(|_| env::var("QUIZLIT_EMAIL"))
            .ok();
        let password = settings
            .get_string("auth.password")
            .or_else(|_| env::var("QUIZLIT_PASSWORD"))
            .ok();

        if auth_url.is_none() && data_source == DataSourceKind::Remote {
            tracing::warn!("No SUPABASE_URL configured, authenticated endpoints will fail");
        }

        Ok(Config {
            api_url,
            auth_url,
            auth_anon_key,
            data_source,
            max_upload_bytes,
            email,
            password,
        })
    }

    /// Config pointing at a single backend origin, everything else defaulted.
    pub fn for_base_url(api_url: &str) -> Result<Self, config::ConfigError> {
        Ok(Config {
            api_url: parse_url("api.url", api_url)?,
            auth_url: None,
            auth_anon_key: None,
            data_source: DataSourceKind::Remote,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            email: None,
            password: None,
        })
    }

    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.email, &self.password) {
            (Some(email), Some(password)) => Some((email.as_str(), password.as_str())),
            _ => None,
        }
    }
}

fn parse_url(key: &str, raw: &str) -> Result<Url, config::ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| config::ConfigError::Message(format!("invalid {} '{}': {}", key, raw, e)))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(config::ConfigError::Message(format!(
            "invalid {} scheme: {}. Must be http or https.",
            key,
            url.scheme()
        )));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "APP_ENV",
        "APP__API__URL",
        "NEXT_PUBLIC_API_URL",
        "SUPABASE_URL",
        "SUPABASE_ANON_KEY",
        "QUIZLIT_DATA_SOURCE",
        "QUIZLIT_EMAIL",
        "QUIZLIT_PASSWORD",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
        env::set_var("APP_ENV", "test-no-such-file");
    }

    #[test]
    #[serial]
    fn test_defaults_when_nothing_is_set() {
        clear_env();
        let config = Config::load().unwrap();
        assert_eq!(config.api_url.as_str(), "http://localhost:8080/");
        assert_eq!(config.data_source, DataSourceKind::Remote);
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert!(config.auth_url.is_none());
        assert!(config.credentials().is_none());
    }

    #[test]
    #[serial]
    fn test_next_public_api_url_selects_backend() {
        clear_env();
        env::set_var("NEXT_PUBLIC_API_URL", "https://quiz.example.com");
        let config = Config::load().unwrap();
        assert_eq!(config.api_url.host_str(), Some("quiz.example.com"));
        env::remove_var("NEXT_PUBLIC_API_URL");
    }

    #[test]
    #[serial]
    fn test_app_prefixed_override_wins() {
        clear_env();
        env::set_var("NEXT_PUBLIC_API_URL", "https://legacy.example.com");
        env::set_var("APP__API__URL", "https://primary.example.com");
        let config = Config::load().unwrap();
        assert_eq!(config.api_url.host_str(), Some("primary.example.com"));
        env::remove_var("NEXT_PUBLIC_API_URL");
        env::remove_var("APP__API__URL");
    }

    #[test]
    #[serial]
    fn test_unknown_data_source_is_rejected() {
        clear_env();
        env::set_var("QUIZLIT_DATA_SOURCE", "carrier-pigeon");
        assert!(Config::load().is_err());
        env::set_var("QUIZLIT_DATA_SOURCE", "Stub");
        assert_eq!(Config::load().unwrap().data_source, DataSourceKind::Stub);
        env::remove_var("QUIZLIT_DATA_SOURCE");
    }

    #[test]
    fn test_for_base_url_rejects_non_http() {
        assert!(Config::for_base_url("ftp://example.com").is_err());
        assert!(Config::for_base_url("not a url").is_err());
        assert!(Config::for_base_url("http://127.0.0.1:9000").is_ok());
    }
}
