use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{
    adapters::http::app_state::AppState,
    app_error::AppResult,
    domain::entities::{price::Price, tax_rate::TaxRate},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tax-rates/{jurisdiction}", get(tax_rate))
        .route("/prices", get(prices))
}

/// GET /api/reference/tax-rates/{jurisdiction}
async fn tax_rate(
    State(app_state): State<AppState>,
    Path(jurisdiction): Path<String>,
) -> AppResult<Json<TaxRate>> {
    Ok(Json(app_state.reference.tax_rate(&jurisdiction)?))
}

/// GET /api/reference/prices
async fn prices(State(app_state): State<AppState>) -> Json<Vec<Price>> {
    Json(app_state.reference.prices().all())
}
