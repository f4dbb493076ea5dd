//! UI-agnostic page controllers. Each page owns its state and exposes the
//! transitions a view would trigger.

use std::fmt;

use crate::models::User;
use crate::services::auth_service::AuthService;

pub mod create;
pub mod dashboard;
pub mod history;
pub mod profile;
pub mod results;
pub mod take_quiz;

pub use create::{CreateQuizPage, CreateStage};
pub use dashboard::DashboardPage;
pub use history::HistoryPage;
pub use profile::{ProfilePage, ProfileView};
pub use results::{GradeBand, ResultsPage, ResultsView};
pub use take_quiz::{QuizMode, TakeQuizPage, TakeQuizStage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Dashboard,
    Create,
    History,
    Profile,
    TakeQuiz(String),
    QuizResults(String),
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".to_string(),
            Route::Dashboard => "/dashboard".to_string(),
            Route::Create => "/create".to_string(),
            Route::History => "/history".to_string(),
            Route::Profile => "/profile".to_string(),
            Route::TakeQuiz(id) => format!("/quiz/{}", id),
            Route::QuizResults(id) => format!("/quiz/results/{}", id),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState<T> {
    Loading,
    Ready(T),
    Failed(String),
    Redirect(Route),
}

impl<T> LoadState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            LoadState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            LoadState::Failed(message) => Some(message),
            _ => None,
        }
    }

    pub fn redirect(&self) -> Option<&Route> {
        match self {
            LoadState::Redirect(route) => Some(route),
            _ => None,
        }
    }
}

/// The signed-in user, or the route to send the visitor to instead.
pub async fn require_user(auth: &AuthService) -> Result<User, Route> {
    match auth.current_user().await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(Route::Login),
        Err(e) => {
            tracing::warn!(error = %e, "Could not resolve the current user");
            Err(Route::Login)
        }
    }
}
