use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::{
    adapters::persistence::in_memory::InMemoryStore,
    app_error::{AppError, AppResult},
    application::ports::store::Store,
    domain::entities::{
        customer::Customer, invoice::Invoice, payment_method::PaymentMethod,
        resource::Resource, subscription::Subscription,
    },
};

/// In-memory store that counts writes and can be told to fail them.
#[derive(Default)]
pub struct CountingStore {
    pub inner: InMemoryStore,
    pub put_calls: AtomicUsize,
    pub remove_calls: AtomicUsize,
    pub fail_writes: AtomicBool,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst) + self.remove_calls.load(Ordering::SeqCst)
    }

    fn check_writable(&self) -> AppResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database("Database operation failed".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for CountingStore {
    async fn lookup_customer(&self, email: &str) -> AppResult<Option<Customer>> {
        self.inner.lookup_customer(email).await
    }

    async fn lookup_invoice(
        &self,
        customer: &Customer,
        number: &str,
    ) -> AppResult<Option<Invoice>> {
        self.inner.lookup_invoice(customer, number).await
    }

    async fn subscription(&self, customer: &Customer) -> AppResult<Option<Subscription>> {
        self.inner.subscription(customer).await
    }

    async fn default_payment_method(
        &self,
        customer: &Customer,
    ) -> AppResult<Option<PaymentMethod>> {
        self.inner.default_payment_method(customer).await
    }

    async fn invoices(&self, customer: &Customer) -> AppResult<Vec<Invoice>> {
        self.inner.invoices(customer).await
    }

    async fn payment_methods(&self, customer: &Customer) -> AppResult<Vec<PaymentMethod>> {
        self.inner.payment_methods(customer).await
    }

    async fn put(&self, resource: Resource<'_>) -> AppResult<()> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        self.check_writable()?;
        self.inner.put(resource).await
    }

    async fn remove(&self, resource: Resource<'_>) -> AppResult<()> {
        self.remove_calls.fetch_add(1, Ordering::SeqCst);
        self.check_writable()?;
        self.inner.remove(resource).await
    }

    async fn log_event(&self, event_id: &str) -> AppResult<()> {
        self.check_writable()?;
        self.inner.log_event(event_id).await
    }

    async fn customer_by_id(&self, customer_id: &str) -> AppResult<Option<Customer>> {
        self.inner.customer_by_id(customer_id).await
    }

    async fn payment_method_by_id(
        &self,
        payment_method_id: &str,
    ) -> AppResult<Option<PaymentMethod>> {
        self.inner.payment_method_by_id(payment_method_id).await
    }
}
