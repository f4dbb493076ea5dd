use crate::models::AttemptListItem;
use crate::pages::{require_user, LoadState, Route};
use crate::services::AppState;
use crate::utils::time::format_datetime;

/// Past attempts of the signed-in user, newest first as the server sends them.
pub struct HistoryPage {
    pub state: LoadState<Vec<AttemptListItem>>,
}

impl Default for HistoryPage {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryPage {
    pub fn new() -> Self {
        Self {
            state: LoadState::Loading,
        }
    }

    pub async fn load(&mut self, app: &AppState) {
        if let Err(route) = require_user(&app.auth).await {
            self.state = LoadState::Redirect(route);
            return;
        }

        self.state = match app.quizzes.list_attempts().await {
            Ok(attempts) => LoadState::Ready(attempts),
            Err(e) => {
                tracing::error!(error = %e, "Failed to load quiz history");
                LoadState::Failed(e.to_string())
            }
        };
    }

    /// Rounded mean percentage over all attempts, `None` when there are none.
    pub fn average_percentage(&self) -> Option<u32> {
        let attempts = self.state.ready()?;
        if attempts.is_empty() {
            return None;
        }
        let sum: f64 = attempts.iter().map(|a| a.percentage).sum();
        Some((sum / attempts.len() as f64).round() as u32)
    }

    pub fn title(item: &AttemptListItem) -> &str {
        item.quiz_title
            .as_deref()
            .or(item.pdf_filename.as_deref())
            .unwrap_or("Untitled quiz")
    }

    pub fn date_label(item: &AttemptListItem) -> String {
        item.created_at
            .as_ref()
            .map(format_datetime)
            .unwrap_or_default()
    }

    pub fn open(item: &AttemptListItem) -> Route {
        Route::QuizResults(item.id.clone())
    }
}
