use async_trait::async_trait;

use crate::{
    app_error::AppResult,
    domain::entities::{
        customer::Customer, invoice::Invoice, payment_method::PaymentMethod,
        resource::Resource, subscription::Subscription,
    },
};

/// Persistence for the billing entities.
///
/// Lookups return `Ok(None)` when nothing matches. Writes to one customer's
/// payment methods are serialised by the implementation, so concurrent
/// callers cannot leave two defaults behind.
#[async_trait]
pub trait Store: Send + Sync {
    async fn lookup_customer(&self, email: &str) -> AppResult<Option<Customer>>;

    async fn lookup_invoice(&self, customer: &Customer, number: &str)
    -> AppResult<Option<Invoice>>;

    /// The most recently started subscription of the customer.
    async fn subscription(&self, customer: &Customer) -> AppResult<Option<Subscription>>;

    async fn default_payment_method(&self, customer: &Customer)
    -> AppResult<Option<PaymentMethod>>;

    /// Newest first.
    async fn invoices(&self, customer: &Customer) -> AppResult<Vec<Invoice>>;

    async fn payment_methods(&self, customer: &Customer) -> AppResult<Vec<PaymentMethod>>;

    /// Upsert by id. Putting a default payment method clears the flag on the
    /// customer's other payment methods in the same operation.
    async fn put(&self, resource: Resource<'_>) -> AppResult<()>;

    /// Delete by id. Removing something that is not stored succeeds.
    async fn remove(&self, resource: Resource<'_>) -> AppResult<()>;

    /// Record an event id, failing with `DuplicateEvent` if it was seen before.
    async fn log_event(&self, event_id: &str) -> AppResult<()>;

    /// Customer by provider id. Used when syncing pushed events, which only
    /// carry the id.
    async fn customer_by_id(&self, customer_id: &str) -> AppResult<Option<Customer>>;

    /// Payment method by provider id, keeping its local default flag.
    async fn payment_method_by_id(&self, payment_method_id: &str)
    -> AppResult<Option<PaymentMethod>>;
}
