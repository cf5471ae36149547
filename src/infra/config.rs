use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;

use crate::application::use_cases::reference_data::DEFAULT_LOADER_HEADROOM;

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";
pub const DEFAULT_API_VERSION: &str = "2020-08-27";
pub const DEFAULT_WEBHOOK_TOLERANCE_SECS: i64 = 300;

/// Connection settings for the payment provider API.
pub struct ProviderConfig {
    pub secret_key: SecretString,
    /// Scheme and host, without the `/v1` prefix.
    pub api_base: String,
    pub api_version: String,
}

pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Absent selects the in-memory store.
    pub database_url: Option<String>,
    pub run_migrations: bool,
    pub provider: ProviderConfig,
    pub webhook_secret: SecretString,
    pub webhook_tolerance_secs: i64,
    /// Newline separated tax rate ids, loaded at startup and on SIGHUP.
    pub tax_rates_file: Option<PathBuf>,
    pub prices_file: Option<PathBuf>,
    /// Added to the hardware parallelism to size the reference loader.
    pub loader_headroom: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let bind_addr: SocketAddr = get_env_default(
            "BIND_ADDR",
            SocketAddr::from((Ipv4Addr::LOCALHOST, 3001)),
        );
        let database_url = optional_env("DATABASE_URL");
        let run_migrations: bool = get_env_default("RUN_MIGRATIONS", true);

        let secret_key = SecretString::new(get_env::<String>("STRIPE_SECRET_KEY").into());
        let api_base: String = get_env_default("STRIPE_API_BASE", DEFAULT_API_BASE.to_string());
        let api_version: String =
            get_env_default("STRIPE_API_VERSION", DEFAULT_API_VERSION.to_string());

        let webhook_secret =
            SecretString::new(get_env::<String>("STRIPE_WEBHOOK_SECRET").into());
        let webhook_tolerance_secs: i64 =
            get_env_default("WEBHOOK_TOLERANCE_SECS", DEFAULT_WEBHOOK_TOLERANCE_SECS);

        let tax_rates_file = optional_env("TAX_RATES_FILE").map(PathBuf::from);
        let prices_file = optional_env("PRICES_FILE").map(PathBuf::from);
        let loader_headroom: usize = get_env_default("LOADER_HEADROOM", DEFAULT_LOADER_HEADROOM);

        Self {
            bind_addr,
            database_url,
            run_migrations,
            provider: ProviderConfig {
                secret_key,
                api_base: api_base.trim_end_matches('/').to_string(),
                api_version,
            },
            webhook_secret,
            webhook_tolerance_secs,
            tax_rates_file,
            prices_file,
            loader_headroom,
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
