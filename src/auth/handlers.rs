use axum::{
    extract::State,
    http::header,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    Form,
};
use tracing::instrument;

use super::{
    dto::CredentialsForm,
    extractors::AuthUser,
    services,
    session::SESSION_COOKIE,
};
use crate::{
    error::{AppError, AppResult},
    state::AppState,
    web::{
        clear_cookie,
        flash::{redirect_with_flash, Flash},
        set_cookie, views,
    },
};

#[instrument(skip_all)]
pub async fn register_form(flash: Flash) -> Response {
    flash.respond(views::register_page(flash.message()))
}

#[instrument(skip(state, form), fields(username = %form.username))]
pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<CredentialsForm>,
) -> AppResult<Response> {
    match services::register(state.repo.as_ref(), &form.username, &form.password).await {
        Ok(_) => Ok(redirect_with_flash(
            "/login",
            "Registration successful! Please log in.",
        )),
        Err(e @ (AppError::DuplicateUsername | AppError::MissingCredentials)) => {
            Ok(redirect_with_flash("/register", &e.to_string()))
        }
        Err(e) => Err(e),
    }
}

#[instrument(skip_all)]
pub async fn login_form(flash: Flash) -> Response {
    flash.respond(views::login_page(flash.message()))
}

#[instrument(skip(state, form), fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<CredentialsForm>,
) -> AppResult<Response> {
    let outcome = match services::login(
        state.repo.as_ref(),
        &state.sessions,
        &state.keys,
        &form.username,
        &form.password,
    )
    .await
    {
        Ok(o) => o,
        Err(e @ AppError::InvalidCredentials) => {
            return Ok(redirect_with_flash("/login", &e.to_string()))
        }
        Err(e) => return Err(e),
    };

    let cookie = set_cookie(SESSION_COOKIE, &outcome.token, Some(state.keys.ttl.as_secs()));
    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Redirect::to("/"),
    )
        .into_response())
}

#[instrument(skip(state))]
pub async fn logout(State(state): State<AppState>, user: AuthUser) -> Response {
    services::logout(&state.sessions, user.session_id).await;
    (
        AppendHeaders([(header::SET_COOKIE, clear_cookie(SESSION_COOKIE))]),
        Redirect::to("/"),
    )
        .into_response()
}

#[instrument(skip(state, flash), fields(user_id = user.user_id))]
pub async fn index(
    State(state): State<AppState>,
    user: AuthUser,
    flash: Flash,
) -> AppResult<Response> {
    // sessions can outlive their user only if the database was swapped underneath
    let user = state
        .repo
        .find_user(user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(flash.respond(views::index_page(flash.message(), &user.username)))
}
