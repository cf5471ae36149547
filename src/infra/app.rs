use axum::{Router, http};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::adapters::{self, http::app_state::AppState};

pub fn create_app(app_state: AppState) -> Router {
    Router::new()
        .nest("/api", adapters::http::routes::router())
        .with_state(app_state)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &http::Request<_>| {
                let request_id = Uuid::new_v4();
                tracing::info_span!(
                    "http-request",
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                    request_id = %request_id
                )
            }),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_test::TestServer;
    use serde_json::json;

    use crate::test_utils::TestAppStateBuilder;

    #[tokio::test]
    async fn routes_are_nested_under_api() {
        let (app_state, _provider, _store) = TestAppStateBuilder::new().build();
        let server = TestServer::new(create_app(app_state)).unwrap();

        server
            .post("/api/billing/customers")
            .json(&json!({ "email": "ada@example.com" }))
            .await
            .assert_status_ok();
        server.get("/api/reference/prices").await.assert_status_ok();
        server
            .get("/billing/customers")
            .await
            .assert_status(http::StatusCode::NOT_FOUND);
    }
}
