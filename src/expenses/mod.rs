pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod services;

use crate::state::AppState;
use axum::{routing::get, Router};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/add_expense",
            get(handlers::add_expense_form).post(handlers::add_expense),
        )
        .route(
            "/edit_expense/:id",
            get(handlers::edit_expense_form).post(handlers::edit_expense),
        )
        .route(
            "/view_expenses",
            get(handlers::view_expenses).post(handlers::filter_expenses),
        )
        .route("/delete_expense/:id", get(handlers::delete_expense))
}
