use async_trait::async_trait;
use tracing::instrument;

use crate::{
    app_error::AppResult,
    application::ports::payment_provider::PaymentProviderPort,
    domain::entities::{
        customer::CustomerAttributes,
        invoice::InvoiceAttributes,
        payment_method::PaymentMethodAttributes,
        price::{Price, Product},
        subscription::SubscriptionAttributes,
        tax_rate::TaxRate,
    },
    infra::stripe_client::StripeClient,
    params::Params,
};

/// Adapter that wraps StripeClient to implement PaymentProviderPort.
///
/// Translates domain actions into endpoint paths; payloads pass through
/// untouched as wire-shaped attribute structs.
#[derive(Clone)]
pub struct StripePaymentAdapter {
    client: StripeClient,
}

impl StripePaymentAdapter {
    pub fn new(client: StripeClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PaymentProviderPort for StripePaymentAdapter {
    // ========================================================================
    // Customers
    // ========================================================================

    #[instrument(skip(self, params))]
    async fn create_customer(&self, params: &Params) -> AppResult<CustomerAttributes> {
        self.client.post("customers", params).await
    }

    #[instrument(skip(self, params))]
    async fn update_customer(
        &self,
        customer_id: &str,
        params: &Params,
    ) -> AppResult<CustomerAttributes> {
        self.client
            .post(&format!("customers/{}", customer_id), params)
            .await
    }

    // ========================================================================
    // Payment methods
    // ========================================================================

    async fn retrieve_payment_method(
        &self,
        payment_method_id: &str,
    ) -> AppResult<PaymentMethodAttributes> {
        self.client.get("payment_methods", payment_method_id).await
    }

    #[instrument(skip(self))]
    async fn attach_payment_method(
        &self,
        payment_method_id: &str,
        customer_id: &str,
    ) -> AppResult<PaymentMethodAttributes> {
        let params = Params::new().set("customer", customer_id);
        self.client
            .post(
                &format!("payment_methods/{}/attach", payment_method_id),
                &params,
            )
            .await
    }

    #[instrument(skip(self))]
    async fn detach_payment_method(
        &self,
        payment_method_id: &str,
    ) -> AppResult<PaymentMethodAttributes> {
        self.client
            .post(
                &format!("payment_methods/{}/detach", payment_method_id),
                &Params::new(),
            )
            .await
    }

    // ========================================================================
    // Subscriptions & invoices
    // ========================================================================

    #[instrument(skip(self, params))]
    async fn create_subscription(&self, params: &Params) -> AppResult<SubscriptionAttributes> {
        self.client.post("subscriptions", params).await
    }

    #[instrument(skip(self, params))]
    async fn update_subscription(
        &self,
        subscription_id: &str,
        params: &Params,
    ) -> AppResult<SubscriptionAttributes> {
        self.client
            .post(&format!("subscriptions/{}", subscription_id), params)
            .await
    }

    async fn upcoming_invoice(&self, customer_id: &str) -> AppResult<InvoiceAttributes> {
        self.client
            .get_with_query("invoices/upcoming", &[("customer", customer_id)])
            .await
    }

    // ========================================================================
    // Reference data
    // ========================================================================

    async fn retrieve_tax_rate(&self, tax_rate_id: &str) -> AppResult<TaxRate> {
        self.client.get("tax_rates", tax_rate_id).await
    }

    async fn retrieve_price(&self, price_id: &str) -> AppResult<Price> {
        let price: Price = self.client.get("prices", price_id).await?;
        let product = self.retrieve_product(price.product_id()).await?;
        Ok(price.with_product(product))
    }

    async fn retrieve_product(&self, product_id: &str) -> AppResult<Product> {
        self.client.get("products", product_id).await
    }
}
