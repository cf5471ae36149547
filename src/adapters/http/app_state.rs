use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    infra::config::AppConfig,
    use_cases::{billing::BillingUseCases, reference_data::ReferenceData, webhook::WebhookDispatcher},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub billing: Arc<BillingUseCases>,
    pub reference: Arc<ReferenceData>,
    pub webhooks: Arc<WebhookDispatcher>,
}

impl FromRef<AppState> for Arc<BillingUseCases> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.billing.clone()
    }
}

impl FromRef<AppState> for Arc<ReferenceData> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.reference.clone()
    }
}
