use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    response::Redirect,
};
use tracing::debug;
use uuid::Uuid;

use super::{services::current_user, session::SESSION_COOKIE};
use crate::{state::AppState, web::cookie_value};

/// The authenticated caller. Handlers taking this redirect anonymous
/// requests to the login page.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: i64,
    pub session_id: Uuid,
}

async fn authenticate(parts: &Parts, state: &AppState) -> Option<AuthUser> {
    let token = cookie_value(&parts.headers, SESSION_COOKIE)?;
    let (user_id, session_id) = current_user(&state.sessions, &state.keys, token).await?;
    Some(AuthUser {
        user_id,
        session_id,
    })
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Redirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match authenticate(parts, state).await {
            Some(user) => Ok(user),
            None => {
                debug!(uri = %parts.uri, "no live session; redirecting to login");
                Err(Redirect::to("/login"))
            }
        }
    }
}
