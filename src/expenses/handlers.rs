use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use tracing::instrument;

use super::{
    dto::{ExpenseForm, FilterForm},
    extractors::ExpenseId,
    services,
};
use crate::{
    auth::extractors::AuthUser,
    error::{AppError, AppResult},
    state::AppState,
    web::{
        flash::{redirect_with_flash, Flash},
        views,
    },
};

#[instrument(skip_all)]
pub async fn add_expense_form(_user: AuthUser, flash: Flash) -> Response {
    flash.respond(views::expense_form_page(flash.message(), None))
}

#[instrument(skip(state, form), fields(user_id = user.user_id))]
pub async fn add_expense(
    State(state): State<AppState>,
    user: AuthUser,
    Form(form): Form<ExpenseForm>,
) -> AppResult<Response> {
    match services::add_expense(state.repo.as_ref(), user.user_id, &form).await {
        Ok(_) => Ok(Redirect::to("/view_expenses").into_response()),
        Err(e @ AppError::InvalidAmount(_)) => Ok(redirect_with_flash("/add_expense", &e.to_string())),
        Err(e) => Err(e),
    }
}

#[instrument(skip(state, flash), fields(user_id = user.user_id))]
pub async fn edit_expense_form(
    State(state): State<AppState>,
    user: AuthUser,
    flash: Flash,
    ExpenseId(id): ExpenseId,
) -> AppResult<Response> {
    let expense = services::get_expense(state.repo.as_ref(), user.user_id, id).await?;
    Ok(flash.respond(views::expense_form_page(flash.message(), Some(&expense))))
}

#[instrument(skip(state, form), fields(user_id = user.user_id))]
pub async fn edit_expense(
    State(state): State<AppState>,
    user: AuthUser,
    ExpenseId(id): ExpenseId,
    Form(form): Form<ExpenseForm>,
) -> AppResult<Response> {
    match services::edit_expense(state.repo.as_ref(), user.user_id, id, &form).await {
        Ok(_) => Ok(redirect_with_flash(
            "/view_expenses",
            "Expense updated successfully!",
        )),
        Err(e @ AppError::InvalidAmount(_)) => Ok(redirect_with_flash(
            &format!("/edit_expense/{}", id),
            &e.to_string(),
        )),
        Err(e) => Err(e),
    }
}

#[instrument(skip(state), fields(user_id = user.user_id))]
pub async fn delete_expense(
    State(state): State<AppState>,
    user: AuthUser,
    ExpenseId(id): ExpenseId,
) -> AppResult<Response> {
    services::delete_expense(state.repo.as_ref(), user.user_id, id).await?;
    Ok(redirect_with_flash(
        "/view_expenses",
        "Expense deleted successfully!",
    ))
}

#[instrument(skip(state, flash), fields(user_id = user.user_id))]
pub async fn view_expenses(
    State(state): State<AppState>,
    user: AuthUser,
    flash: Flash,
    Query(filter): Query<FilterForm>,
) -> AppResult<Response> {
    render_listing(&state, &user, flash, filter).await
}

#[instrument(skip(state, flash), fields(user_id = user.user_id))]
pub async fn filter_expenses(
    State(state): State<AppState>,
    user: AuthUser,
    flash: Flash,
    Form(filter): Form<FilterForm>,
) -> AppResult<Response> {
    render_listing(&state, &user, flash, filter).await
}

async fn render_listing(
    state: &AppState,
    user: &AuthUser,
    flash: Flash,
    filter: FilterForm,
) -> AppResult<Response> {
    let listing = services::list_expenses(
        state.repo.as_ref(),
        user.user_id,
        filter.category_filter.as_deref(),
    )
    .await?;
    Ok(flash.respond(views::expenses_page(flash.message(), &listing)))
}
