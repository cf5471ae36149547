use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post, put},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    domain::entities::{
        customer::Customer,
        subscription::{LifecycleState, Subscription, SubscriptionStatus},
    },
    validators::is_valid_email,
};

// ============================================================================
// Payloads
// ============================================================================

#[derive(Deserialize)]
struct EmailPayload {
    email: String,
}

#[derive(Deserialize)]
struct JurisdictionPayload {
    email: String,
    jurisdiction: Option<String>,
}

#[derive(Deserialize)]
struct SubscribePayload {
    email: String,
    payment_method_id: String,
    price_id: String,
}

#[derive(Serialize)]
struct CustomerView {
    id: String,
    email: String,
    jurisdiction: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<&Customer> for CustomerView {
    fn from(customer: &Customer) -> Self {
        Self {
            id: customer.id().to_string(),
            email: customer.email().to_string(),
            jurisdiction: customer.jurisdiction().map(str::to_string),
            created_at: customer.created_at(),
        }
    }
}

#[derive(Serialize)]
struct SubscriptionView {
    id: String,
    customer_id: String,
    status: SubscriptionStatus,
    state: LifecycleState,
    started_at: DateTime<Utc>,
    current_period_end: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
}

impl From<&Subscription> for SubscriptionView {
    fn from(subscription: &Subscription) -> Self {
        Self {
            id: subscription.id().to_string(),
            customer_id: subscription.customer_id().to_string(),
            status: subscription.status(),
            state: subscription.lifecycle_state(),
            started_at: subscription.started_at(),
            current_period_end: subscription.current_period_end(),
            ends_at: subscription.ends_at(),
        }
    }
}

fn subscription_view(subscription: Option<Subscription>) -> Json<Option<SubscriptionView>> {
    Json(subscription.as_ref().map(SubscriptionView::from))
}

fn validate_email(email: &str) -> AppResult<&str> {
    if !is_valid_email(email) {
        return Err(AppError::InvalidInput("Invalid email address".into()));
    }
    Ok(email.trim())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/customers", post(create_customer))
        .route("/customers/jurisdiction", put(set_jurisdiction))
        .route("/subscribe", post(subscribe))
        .route("/unsubscribe", post(unsubscribe))
        .route("/resubscribe", post(resubscribe))
        .route("/subscription", get(subscription))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/billing/customers
async fn create_customer(
    State(app_state): State<AppState>,
    Json(payload): Json<EmailPayload>,
) -> AppResult<Json<CustomerView>> {
    let email = validate_email(&payload.email)?;
    let customer = app_state.billing.customer(email).await?;
    Ok(Json(CustomerView::from(&customer)))
}

/// PUT /api/billing/customers/jurisdiction
async fn set_jurisdiction(
    State(app_state): State<AppState>,
    Json(payload): Json<JurisdictionPayload>,
) -> AppResult<Json<CustomerView>> {
    let email = validate_email(&payload.email)?;
    let mut customer = app_state.billing.existing_customer(email).await?;
    let jurisdiction = payload
        .jurisdiction
        .map(|j| j.trim().to_string())
        .filter(|j| !j.is_empty());
    app_state
        .billing
        .set_jurisdiction(&mut customer, jurisdiction)
        .await?;
    Ok(Json(CustomerView::from(&customer)))
}

/// POST /api/billing/subscribe
async fn subscribe(
    State(app_state): State<AppState>,
    Json(payload): Json<SubscribePayload>,
) -> AppResult<Json<SubscriptionView>> {
    let email = validate_email(&payload.email)?;
    if payload.payment_method_id.is_empty() || payload.price_id.is_empty() {
        return Err(AppError::InvalidInput(
            "payment_method_id and price_id are required".into(),
        ));
    }
    let customer = app_state.billing.customer(email).await?;
    let subscription = app_state
        .billing
        .subscribe_to_price(&customer, &payload.payment_method_id, &payload.price_id)
        .await?;
    Ok(Json(SubscriptionView::from(&subscription)))
}

/// POST /api/billing/unsubscribe
async fn unsubscribe(
    State(app_state): State<AppState>,
    Json(payload): Json<EmailPayload>,
) -> AppResult<Json<Option<SubscriptionView>>> {
    let customer = app_state
        .billing
        .existing_customer(validate_email(&payload.email)?)
        .await?;
    let subscription = app_state.billing.unsubscribe(&customer).await?;
    Ok(subscription_view(subscription))
}

/// POST /api/billing/resubscribe
async fn resubscribe(
    State(app_state): State<AppState>,
    Json(payload): Json<EmailPayload>,
) -> AppResult<Json<Option<SubscriptionView>>> {
    let customer = app_state
        .billing
        .existing_customer(validate_email(&payload.email)?)
        .await?;
    let subscription = app_state.billing.resubscribe(&customer).await?;
    Ok(subscription_view(subscription))
}

/// GET /api/billing/subscription?email=
async fn subscription(
    State(app_state): State<AppState>,
    Query(query): Query<EmailPayload>,
) -> AppResult<Json<Option<SubscriptionView>>> {
    let customer = app_state
        .billing
        .existing_customer(validate_email(&query.email)?)
        .await?;
    let subscription = app_state.billing.subscription(&customer).await?;
    Ok(subscription_view(subscription))
}
