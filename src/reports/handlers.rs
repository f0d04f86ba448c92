use axum::{extract::State, response::Response};
use tracing::{debug, instrument};

use super::{aggregate::Summary, charts::render_charts};
use crate::{
    auth::extractors::AuthUser,
    error::{AppError, AppResult},
    state::AppState,
    web::{flash::Flash, views},
};

#[instrument(skip(state, flash), fields(user_id = user.user_id))]
pub async fn show_summary(
    State(state): State<AppState>,
    user: AuthUser,
    flash: Flash,
) -> AppResult<Response> {
    let expenses = state.repo.list_expenses(user.user_id, None).await?;
    let summary = Summary::from_expenses(&expenses);
    debug!(
        categories = summary.category_totals.len(),
        months = summary.monthly_totals.len(),
        "summary aggregated"
    );

    let renderer = state.charts.clone();
    let (summary, charts) = tokio::task::spawn_blocking(move || {
        let charts = render_charts(renderer.as_ref(), &summary);
        (summary, charts)
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("chart task failed: {}", e)))?;
    let charts = charts.map_err(AppError::Internal)?;

    Ok(flash.respond(views::summary_page(flash.message(), &summary, &charts)))
}
