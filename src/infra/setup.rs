use crate::{
    adapters::{http::app_state::AppState, persistence::in_memory::InMemoryStore},
    application::ports::{payment_provider::PaymentProviderPort, store::Store},
    infra::{
        config::AppConfig, error::InfraError, postgres_persistence,
        stripe_client::StripeClient, stripe_payment_adapter::StripePaymentAdapter,
        webhook_signature::StripeSignatureVerifier,
    },
    use_cases::{
        billing::BillingUseCases,
        reference_data::ReferenceData,
        webhook::{WebhookDispatcher, register_store_sync},
    },
};
use std::fs::File;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env();

    let store: Arc<dyn Store> = match config.database_url.as_deref() {
        Some(database_url) => {
            Arc::new(postgres_persistence(database_url, config.run_migrations).await?)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store");
            Arc::new(InMemoryStore::new())
        }
    };

    let client = StripeClient::new(&config.provider).map_err(InfraError::HttpClient)?;
    let provider: Arc<dyn PaymentProviderPort> = Arc::new(StripePaymentAdapter::new(client));

    let reference = Arc::new(ReferenceData::new(
        provider.clone(),
        config.loader_headroom,
    ));
    let billing = Arc::new(BillingUseCases::new(
        store.clone(),
        provider,
        reference.clone(),
    ));

    let verifier = Arc::new(StripeSignatureVerifier::new(
        config.webhook_secret.clone(),
        config.webhook_tolerance_secs,
    ));
    let webhooks = Arc::new(WebhookDispatcher::new(verifier, store.clone()));
    register_store_sync(&webhooks, store);

    Ok(AppState {
        config: Arc::new(config),
        billing,
        reference,
        webhooks,
    })
}

/// Load (or reload) the configured reference id files.
///
/// Per-id failures are logged by the loader and left for the next reload; an
/// unreadable file fails the whole call.
pub async fn load_reference_data(app_state: &AppState) -> Result<(), InfraError> {
    let config = &app_state.config;
    app_state
        .reference
        .reload_from_files(config.tax_rates_file.as_deref(), config.prices_file.as_deref())
        .await
        .map_err(|source| InfraError::ReferenceFile {
            path: [&config.tax_rates_file, &config.prices_file]
                .into_iter()
                .flatten()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
            source,
        })?;

    tracing::info!(
        tax_rates = app_state.reference.tax_rates().len(),
        prices = app_state.reference.prices().len(),
        "Reference data loaded"
    );
    Ok(())
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "paysync=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .pretty();

    // File (structured JSON logs), skipped when the file cannot be created.
    let json_layer = File::create("app.log").ok().map(|file| {
        fmt::layer()
            .json()
            .with_writer(file)
            .with_current_span(true)
            .with_span_list(true)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
