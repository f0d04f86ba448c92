use tracing::{info, warn};
use uuid::Uuid;

use super::{
    password::{hash_password, off_runtime, verify_password},
    session::{SessionKeys, SessionStore},
};
use crate::{
    db::User,
    error::{AppError, AppResult},
    repo::Repository,
};

/// A started session: the signed cookie token and the server-side id it names.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub session_id: Uuid,
    pub token: String,
}

pub async fn register(repo: &dyn Repository, username: &str, password: &str) -> AppResult<User> {
    if username.trim().is_empty() {
        warn!("registration with empty username");
        return Err(AppError::MissingCredentials);
    }

    if repo.find_user_by_username(username).await?.is_some() {
        warn!(%username, "username already registered");
        return Err(AppError::DuplicateUsername);
    }

    let plain = password.to_owned();
    let hash = off_runtime(move || hash_password(&plain)).await??;
    // a concurrent registration can still win the race; the unique index reports it
    let user = repo.create_user(username, &hash).await?;
    info!(user_id = user.id, username = %user.username, "user registered");
    Ok(user)
}

pub async fn login(
    repo: &dyn Repository,
    sessions: &SessionStore,
    keys: &SessionKeys,
    username: &str,
    password: &str,
) -> AppResult<LoginOutcome> {
    let Some(user) = repo.find_user_by_username(username).await? else {
        warn!(%username, "login unknown username");
        return Err(AppError::InvalidCredentials);
    };

    let (plain, stored) = (password.to_owned(), user.password_hash.clone());
    if !off_runtime(move || verify_password(&plain, &stored)).await? {
        warn!(%username, user_id = user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let session_id = sessions.create(user.id, keys.ttl).await;
    let token = keys.sign(session_id).map_err(AppError::Internal)?;
    info!(user_id = user.id, "user logged in");
    Ok(LoginOutcome {
        user,
        session_id,
        token,
    })
}

/// Ends the session. Calling it for an already ended session is a no-op.
pub async fn logout(sessions: &SessionStore, session_id: Uuid) {
    sessions.revoke(session_id).await;
    info!(%session_id, "session ended");
}

/// The user bound to a cookie token, if the token verifies and its session is live.
pub async fn current_user(sessions: &SessionStore, keys: &SessionKeys, token: &str) -> Option<(i64, Uuid)> {
    let claims = keys.verify(token).ok()?;
    let user_id = sessions.resolve(claims.sub).await?;
    Some((user_id, claims.sub))
}
