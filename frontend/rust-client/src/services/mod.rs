use std::sync::Arc;

use uuid::Uuid;

use crate::config::{Config, DataSourceKind};
use crate::error::{ClientError, ClientResult};

use auth_service::{AuthService, IdentityProvider};
use http_client::ApiClient;
use memory_provider::MemoryIdentityProvider;
use pdf_api::PdfApiClient;
use quiz_api::QuizApiClient;
use quiz_service::{QuizService, RemoteQuizSource};
use stub_source::StubQuizSource;
use supabase_provider::SupabaseProvider;

const DEMO_OWNER: &str = "demo-user";

/// Local account available when no identity provider or credentials are configured.
pub const DEMO_EMAIL: &str = "demo@quizlit.local";
pub const DEMO_PASSWORD: &str = "demo";

/// Everything a page or command needs, built once from [`Config`].
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub auth: AuthService,
    pub quizzes: QuizService,
    pub pdf: PdfApiClient,
}

impl AppState {
    pub fn new(config: Config) -> ClientResult<Self> {
        let provider: Arc<dyn IdentityProvider> =
            match (&config.auth_url, &config.auth_anon_key) {
                (Some(url), Some(key)) => Arc::new(SupabaseProvider::new(url.clone(), key.clone())),
                (Some(_), None) => {
                    return Err(ClientError::Config(config::ConfigError::Message(
                        "SUPABASE_ANON_KEY is required when SUPABASE_URL is set".to_string(),
                    )))
                }
                (None, _) => {
                    tracing::info!("No identity provider configured, using local accounts");
                    let (email, password) =
                        config.credentials().unwrap_or((DEMO_EMAIL, DEMO_PASSWORD));
                    Arc::new(
                        MemoryIdentityProvider::new(&Uuid::new_v4().to_string())
                            .with_account(email, password),
                    )
                }
            };

        Ok(Self::with_provider(config, provider))
    }

    pub fn with_provider(config: Config, provider: Arc<dyn IdentityProvider>) -> Self {
        let auth = AuthService::new(provider);
        let api = ApiClient::new(config.api_url.clone(), Arc::new(auth.clone()));

        let quizzes = match config.data_source {
            DataSourceKind::Remote => QuizService::new(Arc::new(RemoteQuizSource::new(
                QuizApiClient::new(api.clone()),
            ))),
            DataSourceKind::Stub => {
                QuizService::new(Arc::new(StubQuizSource::with_demo_data(DEMO_OWNER)))
            }
        };

        let pdf = PdfApiClient::new(api).with_max_upload_bytes(config.max_upload_bytes);

        tracing::info!(
            api_url = %config.api_url,
            data_source = %config.data_source,
            "Client initialised"
        );

        Self {
            config,
            auth,
            quizzes,
            pdf,
        }
    }
}

pub mod auth_service;
pub mod http_client;
pub mod memory_provider;
pub mod pdf_api;
pub mod quiz_api;
pub mod quiz_service;
pub mod stub_source;
pub mod supabase_provider;
