pub mod billing;
pub mod reference;
pub mod webhook;

use axum::Router;

use crate::adapters::http::app_state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/billing", billing::router())
        .nest("/reference", reference::router())
        .nest("/webhooks", webhook::router())
}
