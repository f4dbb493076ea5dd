pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod pages;
pub mod services;
pub mod utils;

pub use config::{Config, DataSourceKind};
pub use error::{ClientError, ClientResult};
pub use services::AppState;
