//! Provider webhook endpoint.

use axum::{
    Router,
    body::Bytes,
    extract::{State, rejection::BytesRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};

use crate::{adapters::http::app_state::AppState, use_cases::webhook::DispatchOutcome};

pub const SIGNATURE_HEADER: &str = "stripe-signature";

pub fn router() -> Router<AppState> {
    Router::new().route("/stripe", post(stripe_webhook))
}

/// POST /api/webhooks/stripe
///
/// 200 when dispatched or nothing is registered, 202 for a redelivery, 400 on
/// a bad signature, 500 when the dedup log or the handler fails, 503 when the
/// body cannot be read.
async fn stripe_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let payload = match body {
        Ok(payload) => payload,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Failed to read webhook body");
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    match app_state.webhooks.receive(&payload, signature).await {
        Ok(DispatchOutcome::Dispatched | DispatchOutcome::NoHandler) => StatusCode::OK.into_response(),
        Ok(DispatchOutcome::Duplicate) => StatusCode::ACCEPTED.into_response(),
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use axum_test::TestServer;
    use chrono::Utc;
    use serde_json::json;

    use crate::{
        application::ports::store::Store,
        domain::entities::resource::Resource,
        infra::webhook_signature::sign_payload,
        test_utils::{TEST_WEBHOOK_SECRET, TestAppStateBuilder, create_test_customer},
    };

    fn build_test_router(app_state: AppState) -> Router<()> {
        router().with_state(app_state)
    }

    fn signed(payload: &[u8]) -> String {
        sign_payload(TEST_WEBHOOK_SECRET, Utc::now().timestamp(), payload).unwrap()
    }

    fn customer_updated(event_id: &str, email: &str) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "id": event_id,
            "type": "customer.updated",
            "data": {"object": {
                "object": "customer",
                "id": "cus_test",
                "email": email,
                "created": 1704110400
            }}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn first_delivery_is_dispatched_and_redelivery_is_accepted() {
        let (app_state, _provider, store) = TestAppStateBuilder::new().build();
        let customer = create_test_customer(|_| {}).with_jurisdiction(Some("GB".into()));
        store.put(Resource::from(&customer)).await.unwrap();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let payload = customer_updated("evt_1", "new@example.com");
        let first = server
            .post("/stripe")
            .add_header(SIGNATURE_HEADER, signed(&payload))
            .bytes(payload.clone().into())
            .await;
        first.assert_status(StatusCode::OK);

        let puts_after_first = store.put_calls.load(Ordering::SeqCst);
        let second = server
            .post("/stripe")
            .add_header(SIGNATURE_HEADER, signed(&payload))
            .bytes(payload.into())
            .await;
        second.assert_status(StatusCode::ACCEPTED);
        assert_eq!(store.put_calls.load(Ordering::SeqCst), puts_after_first);

        let stored = store
            .lookup_customer("new@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.jurisdiction(), Some("GB"));
    }

    #[tokio::test]
    async fn unregistered_event_type_returns_200() {
        let (app_state, _provider, _store) = TestAppStateBuilder::new().build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();
        let payload = serde_json::to_vec(&json!({
            "id": "evt_1",
            "type": "charge.refunded",
            "data": {"object": {"object": "charge", "id": "ch_1"}}
        }))
        .unwrap();

        let response = server
            .post("/stripe")
            .add_header(SIGNATURE_HEADER, signed(&payload))
            .bytes(payload.into())
            .await;

        response.assert_status(StatusCode::OK);
    }

    #[tokio::test]
    async fn bad_signature_returns_400() {
        let (app_state, _provider, _store) = TestAppStateBuilder::new().build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();
        let payload = customer_updated("evt_1", "new@example.com");
        let forged = sign_payload("whsec_forged", Utc::now().timestamp(), &payload).unwrap();

        let response = server
            .post("/stripe")
            .add_header(SIGNATURE_HEADER, forged)
            .bytes(payload.into())
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_signature_returns_400() {
        let (app_state, _provider, _store) = TestAppStateBuilder::new().build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server
            .post("/stripe")
            .bytes(customer_updated("evt_1", "new@example.com").into())
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn store_failure_during_dedup_returns_500() {
        let (app_state, _provider, store) = TestAppStateBuilder::new().build();
        store.fail_writes.store(true, Ordering::SeqCst);
        let server = TestServer::new(build_test_router(app_state)).unwrap();
        let payload = customer_updated("evt_1", "new@example.com");

        let response = server
            .post("/stripe")
            .add_header(SIGNATURE_HEADER, signed(&payload))
            .bytes(payload.into())
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn unreadable_body_returns_503() {
        let (app_state, _provider, _store) = TestAppStateBuilder::new().build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();
        // Over the default 2 MB body limit, so buffering the body fails.
        let oversized = vec![b' '; 3 * 1024 * 1024];

        let response = server
            .post("/stripe")
            .add_header(SIGNATURE_HEADER, "t=0,v1=00")
            .bytes(oversized.into())
            .await;

        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn handler_failure_returns_500_then_202() {
        let (app_state, _provider, _store) = TestAppStateBuilder::new().build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();
        let payload = serde_json::to_vec(&json!({
            "id": "evt_1",
            "type": "invoice.paid",
            "data": {"object": {"object": "charge", "id": "ch_1"}}
        }))
        .unwrap();

        let first = server
            .post("/stripe")
            .add_header(SIGNATURE_HEADER, signed(&payload))
            .bytes(payload.clone().into())
            .await;
        first.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

        let second = server
            .post("/stripe")
            .add_header(SIGNATURE_HEADER, signed(&payload))
            .bytes(payload.into())
            .await;
        second.assert_status(StatusCode::ACCEPTED);
    }
}
