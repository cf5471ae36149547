//! Test AppState builder for HTTP route testing.
//!
//! Wires the real use cases over the in-memory store and the fake provider,
//! with the store sync handlers registered, so routes can be exercised
//! end to end with `axum_test::TestServer`.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use secrecy::SecretString;

use crate::{
    adapters::http::app_state::AppState,
    application::ports::{payment_provider::PaymentProviderPort, store::Store},
    infra::{
        config::{AppConfig, DEFAULT_API_VERSION, DEFAULT_WEBHOOK_TOLERANCE_SECS, ProviderConfig},
        webhook_signature::StripeSignatureVerifier,
    },
    test_utils::{CountingStore, FakePaymentProvider},
    use_cases::{
        billing::BillingUseCases,
        reference_data::{DEFAULT_LOADER_HEADROOM, ReferenceData},
        webhook::{WebhookDispatcher, register_store_sync},
    },
};

pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret";

/// Config pointing nowhere; nothing in the test state talks to the network.
pub fn create_test_config() -> AppConfig {
    AppConfig {
        bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
        database_url: None,
        run_migrations: false,
        provider: ProviderConfig {
            secret_key: SecretString::new("sk_test_123".into()),
            api_base: "http://127.0.0.1:9".to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
        },
        webhook_secret: SecretString::new(TEST_WEBHOOK_SECRET.into()),
        webhook_tolerance_secs: DEFAULT_WEBHOOK_TOLERANCE_SECS,
        tax_rates_file: None,
        prices_file: None,
        loader_headroom: DEFAULT_LOADER_HEADROOM,
    }
}

pub struct TestAppStateBuilder {
    provider: FakePaymentProvider,
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            provider: FakePaymentProvider::new(),
        }
    }

    pub fn with_provider(mut self, provider: FakePaymentProvider) -> Self {
        self.provider = provider;
        self
    }

    /// Build the state, handing back the fake provider and store for assertions.
    pub fn build(self) -> (AppState, Arc<FakePaymentProvider>, Arc<CountingStore>) {
        let config = create_test_config();
        let provider = Arc::new(self.provider);
        let store = Arc::new(CountingStore::new());

        let provider_port = provider.clone() as Arc<dyn PaymentProviderPort>;
        let store_port = store.clone() as Arc<dyn Store>;

        let reference = Arc::new(ReferenceData::new(
            provider_port.clone(),
            config.loader_headroom,
        ));
        let billing = Arc::new(BillingUseCases::new(
            store_port.clone(),
            provider_port,
            reference.clone(),
        ));
        let verifier = Arc::new(StripeSignatureVerifier::new(
            config.webhook_secret.clone(),
            config.webhook_tolerance_secs,
        ));
        let webhooks = Arc::new(WebhookDispatcher::new(verifier, store_port.clone()));
        register_store_sync(&webhooks, store_port);

        let app_state = AppState {
            config: Arc::new(config),
            billing,
            reference,
            webhooks,
        };
        (app_state, provider, store)
    }
}
