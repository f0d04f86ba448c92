pub mod aggregate;
pub mod charts;
pub mod handlers;

use crate::state::AppState;
use axum::{routing::get, Router};

pub fn router() -> Router<AppState> {
    Router::new().route("/summary", get(handlers::show_summary))
}
