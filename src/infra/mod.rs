use crate::{adapters::persistence::PostgresPersistence, infra::{db::init_db, error::InfraError}};

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod http_client;
pub mod setup;
pub mod stripe_client;
pub mod stripe_payment_adapter;
pub mod webhook_signature;

pub async fn postgres_persistence(
    database_url: &str,
    run_migrations: bool,
) -> Result<PostgresPersistence, InfraError> {
    let pool = init_db(database_url, run_migrations).await?;
    Ok(PostgresPersistence::new(pool))
}
