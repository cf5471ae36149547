use crate::{app_error::AppResult, domain::entities::event::ProviderEvent};

/// Turns a raw webhook payload and its signature header into a trusted event.
///
/// Fails with `SignatureInvalid` when the signature does not match or is
/// outside the accepted time window.
pub trait EventVerifier: Send + Sync {
    fn verify(&self, payload: &[u8], signature: &str) -> AppResult<ProviderEvent>;
}
