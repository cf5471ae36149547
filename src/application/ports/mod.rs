pub mod event_verifier;
pub mod payment_provider;
pub mod store;
