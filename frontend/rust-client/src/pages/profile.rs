use crate::error::ClientResult;
use crate::models::User;
use crate::pages::{require_user, LoadState, Route};
use crate::services::AppState;

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileView {
    pub display_name: String,
    pub initials: String,
    pub email: Option<String>,
    pub user: User,
}

impl From<User> for ProfileView {
    fn from(user: User) -> Self {
        Self {
            display_name: user.display_name(),
            initials: user.initials(),
            email: user.email.clone(),
            user,
        }
    }
}

pub struct ProfilePage {
    pub state: LoadState<ProfileView>,
}

impl Default for ProfilePage {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfilePage {
    pub fn new() -> Self {
        Self {
            state: LoadState::Loading,
        }
    }

    pub async fn load(&mut self, app: &AppState) {
        self.state = match require_user(&app.auth).await {
            Ok(user) => LoadState::Ready(user.into()),
            Err(route) => LoadState::Redirect(route),
        };
    }

    /// Signs out and sends the visitor to the login page. On failure the
    /// profile stays on screen.
    pub async fn logout(&mut self, app: &AppState) -> ClientResult<()> {
        if let Err(e) = app.auth.sign_out().await {
            tracing::error!(error = %e, "Error signing out");
            return Err(e);
        }
        self.state = LoadState::Redirect(Route::Login);
        Ok(())
    }
}
