use async_trait::async_trait;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::AppResult,
    application::ports::store::Store,
    domain::entities::{
        customer::Customer, invoice::Invoice, payment_method::PaymentMethod,
        resource::Resource, subscription::Subscription,
    },
};

#[async_trait]
impl Store for PostgresPersistence {
    async fn lookup_customer(&self, email: &str) -> AppResult<Option<Customer>> {
        self.find_customer_by_email(email).await
    }

    async fn lookup_invoice(
        &self,
        customer: &Customer,
        number: &str,
    ) -> AppResult<Option<Invoice>> {
        self.find_invoice_by_number(customer.id(), number).await
    }

    async fn subscription(&self, customer: &Customer) -> AppResult<Option<Subscription>> {
        self.latest_subscription(customer.id()).await
    }

    async fn default_payment_method(
        &self,
        customer: &Customer,
    ) -> AppResult<Option<PaymentMethod>> {
        self.find_default_payment_method(customer.id()).await
    }

    async fn invoices(&self, customer: &Customer) -> AppResult<Vec<Invoice>> {
        self.list_invoices(customer.id()).await
    }

    async fn payment_methods(&self, customer: &Customer) -> AppResult<Vec<PaymentMethod>> {
        self.list_payment_methods(customer.id()).await
    }

    async fn put(&self, resource: Resource<'_>) -> AppResult<()> {
        match resource {
            Resource::Customer(c) => self.upsert_customer(c).await,
            Resource::Invoice(i) => self.upsert_invoice(i).await,
            Resource::PaymentMethod(pm) => self.upsert_payment_method(pm).await,
            Resource::Subscription(s) => self.upsert_subscription(s).await,
        }
    }

    async fn remove(&self, resource: Resource<'_>) -> AppResult<()> {
        match resource {
            Resource::Customer(c) => self.delete_customer(c.id()).await,
            Resource::Invoice(i) => self.delete_invoice(i.id()).await,
            Resource::PaymentMethod(pm) => self.delete_payment_method(pm.id()).await,
            Resource::Subscription(s) => self.delete_subscription(s.id()).await,
        }
    }

    async fn log_event(&self, event_id: &str) -> AppResult<()> {
        self.insert_event(event_id).await
    }

    async fn customer_by_id(&self, customer_id: &str) -> AppResult<Option<Customer>> {
        self.find_customer_by_id(customer_id).await
    }

    async fn payment_method_by_id(
        &self,
        payment_method_id: &str,
    ) -> AppResult<Option<PaymentMethod>> {
        self.find_payment_method_by_id(payment_method_id).await
    }
}
