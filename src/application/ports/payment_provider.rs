use async_trait::async_trait;

use crate::{
    app_error::AppResult,
    domain::entities::{
        customer::CustomerAttributes,
        invoice::InvoiceAttributes,
        payment_method::PaymentMethodAttributes,
        price::{Price, Product},
        subscription::SubscriptionAttributes,
        tax_rate::TaxRate,
    },
    params::Params,
};

// ============================================================================
// Payment Provider Port - Domain-action based interface
// ============================================================================

/// Payment provider port - abstracts the remote resource API.
///
/// Every call is a single remote round trip (two for `retrieve_price` when the
/// adapter expands the product). Nothing here retries; failures surface as
/// `Transport` or `Provider` errors.
#[async_trait]
pub trait PaymentProviderPort: Send + Sync {
    // ========================================================================
    // Customers
    // ========================================================================

    async fn create_customer(&self, params: &Params) -> AppResult<CustomerAttributes>;

    async fn update_customer(
        &self,
        customer_id: &str,
        params: &Params,
    ) -> AppResult<CustomerAttributes>;

    // ========================================================================
    // Payment methods
    // ========================================================================

    async fn retrieve_payment_method(
        &self,
        payment_method_id: &str,
    ) -> AppResult<PaymentMethodAttributes>;

    async fn attach_payment_method(
        &self,
        payment_method_id: &str,
        customer_id: &str,
    ) -> AppResult<PaymentMethodAttributes>;

    async fn detach_payment_method(
        &self,
        payment_method_id: &str,
    ) -> AppResult<PaymentMethodAttributes>;

    // ========================================================================
    // Subscriptions & invoices
    // ========================================================================

    /// Create a subscription. Callers pass `expand` in `params` when they
    /// need the latest invoice inline.
    async fn create_subscription(&self, params: &Params) -> AppResult<SubscriptionAttributes>;

    async fn update_subscription(
        &self,
        subscription_id: &str,
        params: &Params,
    ) -> AppResult<SubscriptionAttributes>;

    /// Preview of the next invoice the provider would issue for the customer.
    async fn upcoming_invoice(&self, customer_id: &str) -> AppResult<InvoiceAttributes>;

    // ========================================================================
    // Reference data
    // ========================================================================

    async fn retrieve_tax_rate(&self, tax_rate_id: &str) -> AppResult<TaxRate>;

    /// Retrieve a price with its product expanded.
    async fn retrieve_price(&self, price_id: &str) -> AppResult<Price>;

    async fn retrieve_product(&self, product_id: &str) -> AppResult<Product>;
}
