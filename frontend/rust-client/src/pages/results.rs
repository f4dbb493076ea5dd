use crate::models::{AttemptDetail, QuestionResult};
use crate::pages::{LoadState, Route};
use crate::services::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeBand {
    Good,
    Fair,
    Poor,
}

impl GradeBand {
    pub fn for_percentage(percentage: f64) -> Self {
        if percentage >= 70.0 {
            GradeBand::Good
        } else if percentage >= 50.0 {
            GradeBand::Fair
        } else {
            GradeBand::Poor
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultsView {
    pub detail: AttemptDetail,
    pub questions: Vec<QuestionResult>,
    pub percentage: f64,
    pub band: GradeBand,
}

impl ResultsView {
    pub fn new(detail: AttemptDetail) -> Self {
        let percentage = detail.attempt.percentage();
        Self {
            questions: detail.graded(),
            band: GradeBand::for_percentage(percentage),
            percentage,
            detail,
        }
    }

    pub fn title(&self) -> &str {
        if self.detail.quiz.title.is_empty() {
            "Quiz Results"
        } else {
            &self.detail.quiz.title
        }
    }

    pub fn percentage_label(&self) -> String {
        format!("{:.1}%", self.percentage)
    }
}

/// Graded review of one attempt.
pub struct ResultsPage {
    pub attempt_id: String,
    pub state: LoadState<ResultsView>,
}

impl ResultsPage {
    pub fn new(attempt_id: impl Into<String>) -> Self {
        Self {
            attempt_id: attempt_id.into(),
            state: LoadState::Loading,
        }
    }

    pub async fn load(&mut self, app: &AppState) {
        match app.auth.access_token().await {
            Ok(Some(_)) => {}
            Ok(None) => {
                self.state = LoadState::Redirect(Route::Login);
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not resolve access token");
                self.state = LoadState::Redirect(Route::Login);
                return;
            }
        }

        self.state = match app.quizzes.get_attempt(&self.attempt_id).await {
            Ok(detail) => LoadState::Ready(ResultsView::new(detail)),
            Err(e) => {
                tracing::error!(attempt_id = %self.attempt_id, error = %e, "Failed to load results");
                LoadState::Failed(e.to_string())
            }
        };
    }
}
