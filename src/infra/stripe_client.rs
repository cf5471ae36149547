use reqwest::{Client, Method, RequestBuilder, header::CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    app_error::{AppError, AppResult},
    infra::{config::ProviderConfig, http_client::try_build_client},
    params::Params,
};

/// Thin REST client for the provider API.
///
/// Entities come back as JSON on 2xx; anything else is decoded into
/// `AppError::Provider`. Network failures surface as `AppError::Transport` and
/// are never retried here.
#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    api_base: String,
    secret_key: SecretString,
    api_version: String,
}

impl StripeClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(try_build_client()?, config))
    }

    pub fn with_client(client: Client, config: &ProviderConfig) -> Self {
        Self {
            client,
            api_base: config.api_base.clone(),
            secret_key: config.secret_key.clone(),
            api_version: config.api_version.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.api_base, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .bearer_auth(self.secret_key.expose_secret())
            .header("Stripe-Version", &self.api_version)
    }

    // ========================================================================
    // Verbs
    // ========================================================================

    /// `GET /v1/{endpoint}/{id}`
    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str, id: &str) -> AppResult<T> {
        self.get_with_query(&format!("{}/{}", endpoint, id), &[]).await
    }

    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> AppResult<T> {
        let mut builder = self.request(Method::GET, path);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        self.send(builder).await
    }

    /// `POST /v1/{path}` with the canonical form encoding of `params` as body.
    pub async fn post<T: DeserializeOwned>(&self, path: &str, params: &Params) -> AppResult<T> {
        let builder = self
            .request(Method::POST, path)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(params.encode());
        self.send(builder).await
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> AppResult<T> {
        let response = builder.send().await.map_err(|e| {
            tracing::warn!(error = %e, "Provider request failed");
            AppError::Transport(e.to_string())
        })?;
        self.handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> AppResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Transport(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            tracing::error!(status = %status, body = %body, "Provider API error");
            return Err(decode_error(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(body = %body, error = %e, "Failed to parse provider response");
            AppError::Internal(format!("Failed to parse provider response: {}", e))
        })
    }
}

fn decode_error(status: u16, body: &str) -> AppError {
    match serde_json::from_str::<StripeErrorResponse>(body) {
        Ok(parsed) => AppError::Provider {
            status,
            message: parsed
                .error
                .message
                .unwrap_or_else(|| parsed.error.error_type.clone()),
            kind: parsed.error.error_type,
        },
        Err(_) => AppError::Provider {
            status,
            message: body.to_string(),
            kind: "api_error".to_string(),
        },
    }
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    #[serde(rename = "type")]
    error_type: String,
    message: Option<String>,
}
