use crate::error::ClientResult;
use crate::models::{Quiz, User};
use crate::pages::{require_user, LoadState, Route};
use crate::services::AppState;

pub const PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_quizzes: usize,
    pub total_questions: usize,
}

/// The signed-in user's quiz list.
pub struct DashboardPage {
    pub user: Option<User>,
    pub state: LoadState<Vec<Quiz>>,
    pub query: String,
    pub demo: bool,
    limit: u32,
    offset: u32,
}

impl Default for DashboardPage {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardPage {
    pub fn new() -> Self {
        Self::with_paging(PAGE_SIZE, 0)
    }

    /// A dashboard showing `limit` quizzes starting at `offset`.
    pub fn with_paging(limit: u32, offset: u32) -> Self {
        Self {
            user: None,
            state: LoadState::Loading,
            query: String::new(),
            demo: false,
            limit,
            offset,
        }
    }

    pub async fn load(&mut self, app: &AppState) {
        let user = match require_user(&app.auth).await {
            Ok(user) => user,
            Err(route) => {
                self.state = LoadState::Redirect(route);
                return;
            }
        };
        self.user = Some(user);
        self.demo = app.quizzes.is_demo();
        self.refresh(app).await;
    }

    pub async fn refresh(&mut self, app: &AppState) {
        self.state = match app.quizzes.list_quizzes(self.limit, self.offset).await {
            Ok(page) => LoadState::Ready(page.quizzes),
            Err(e) => {
                tracing::error!(error = %e, "Failed to load quizzes");
                LoadState::Failed(e.to_string())
            }
        };
    }

    /// Deletes, then reloads the list with a separate request.
    pub async fn delete(&mut self, app: &AppState, quiz_id: &str) -> ClientResult<()> {
        app.quizzes.delete_quiz(quiz_id).await?;
        self.refresh(app).await;
        Ok(())
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Loaded quizzes matching the search box.
    pub fn visible(&self) -> Vec<&Quiz> {
        let query = self.query.trim();
        self.state
            .ready()
            .map(|quizzes| {
                quizzes
                    .iter()
                    .filter(|q| query.is_empty() || q.matches(query))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn stats(&self) -> DashboardStats {
        let quizzes = self.state.ready().map(Vec::as_slice).unwrap_or_default();
        DashboardStats {
            total_quizzes: quizzes.len(),
            total_questions: quizzes.iter().map(|q| q.total_questions).sum(),
        }
    }

    pub fn open(&self, quiz_id: &str) -> Route {
        Route::TakeQuiz(quiz_id.to_string())
    }
}
