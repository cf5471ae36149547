use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::store::Store,
    domain::entities::{
        customer::Customer, invoice::Invoice, payment_method::PaymentMethod,
        resource::Resource, subscription::Subscription,
    },
};

#[derive(Default)]
struct State {
    customers: HashMap<String, Customer>,
    invoices: HashMap<String, Invoice>,
    // Ordered by id so listings are stable.
    payment_methods: BTreeMap<String, PaymentMethod>,
    subscriptions: HashMap<String, Subscription>,
    events: HashSet<String>,
}

/// Store kept entirely in process memory. Every write holds the one lock, so
/// per-customer writes are trivially serialised.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn lookup_customer(&self, email: &str) -> AppResult<Option<Customer>> {
        let state = self.state.read().await;
        Ok(state
            .customers
            .values()
            .find(|c| c.email() == email)
            .cloned())
    }

    async fn lookup_invoice(
        &self,
        customer: &Customer,
        number: &str,
    ) -> AppResult<Option<Invoice>> {
        let state = self.state.read().await;
        Ok(state
            .invoices
            .values()
            .find(|i| i.customer_id() == customer.id() && i.number() == Some(number))
            .cloned())
    }

    async fn subscription(&self, customer: &Customer) -> AppResult<Option<Subscription>> {
        let state = self.state.read().await;
        Ok(state
            .subscriptions
            .values()
            .filter(|s| s.customer_id() == customer.id())
            .max_by_key(|s| s.started_at())
            .cloned())
    }

    async fn default_payment_method(
        &self,
        customer: &Customer,
    ) -> AppResult<Option<PaymentMethod>> {
        let state = self.state.read().await;
        Ok(state
            .payment_methods
            .values()
            .find(|pm| pm.customer_id() == Some(customer.id()) && pm.is_default())
            .cloned())
    }

    async fn invoices(&self, customer: &Customer) -> AppResult<Vec<Invoice>> {
        let state = self.state.read().await;
        let mut invoices: Vec<Invoice> = state
            .invoices
            .values()
            .filter(|i| i.customer_id() == customer.id())
            .cloned()
            .collect();
        invoices.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(a.id()))
        });
        Ok(invoices)
    }

    async fn payment_methods(&self, customer: &Customer) -> AppResult<Vec<PaymentMethod>> {
        let state = self.state.read().await;
        Ok(state
            .payment_methods
            .values()
            .filter(|pm| pm.customer_id() == Some(customer.id()))
            .cloned()
            .collect())
    }

    async fn put(&self, resource: Resource<'_>) -> AppResult<()> {
        let mut state = self.state.write().await;
        match resource {
            Resource::Customer(customer) => {
                let taken = state
                    .customers
                    .values()
                    .any(|c| c.email() == customer.email() && c.id() != customer.id());
                if taken {
                    return Err(AppError::InvalidInput(
                        "A record with this value already exists".into(),
                    ));
                }
                state
                    .customers
                    .insert(customer.id().to_string(), customer.clone());
            }
            Resource::Invoice(invoice) => {
                state
                    .invoices
                    .insert(invoice.id().to_string(), invoice.clone());
            }
            Resource::PaymentMethod(pm) => {
                let customer_id = pm.customer_id().ok_or_else(|| {
                    AppError::InvalidInput(format!("payment method {} has no customer", pm.id()))
                })?;
                if pm.is_default() {
                    for other in state.payment_methods.values_mut() {
                        if other.customer_id() == Some(customer_id) && other.id() != pm.id() {
                            other.set_default(false);
                        }
                    }
                }
                state
                    .payment_methods
                    .insert(pm.id().to_string(), pm.clone());
            }
            Resource::Subscription(subscription) => {
                state
                    .subscriptions
                    .insert(subscription.id().to_string(), subscription.clone());
            }
        }
        Ok(())
    }

    async fn remove(&self, resource: Resource<'_>) -> AppResult<()> {
        let mut state = self.state.write().await;
        let id = resource.id();
        match resource {
            Resource::Customer(_) => {
                state.customers.remove(id);
            }
            Resource::Invoice(_) => {
                state.invoices.remove(id);
            }
            Resource::PaymentMethod(_) => {
                state.payment_methods.remove(id);
            }
            Resource::Subscription(_) => {
                state.subscriptions.remove(id);
            }
        }
        Ok(())
    }

    async fn log_event(&self, event_id: &str) -> AppResult<()> {
        let mut state = self.state.write().await;
        if !state.events.insert(event_id.to_string()) {
            return Err(AppError::DuplicateEvent);
        }
        Ok(())
    }

    async fn customer_by_id(&self, customer_id: &str) -> AppResult<Option<Customer>> {
        let state = self.state.read().await;
        Ok(state.customers.get(customer_id).cloned())
    }

    async fn payment_method_by_id(
        &self,
        payment_method_id: &str,
    ) -> AppResult<Option<PaymentMethod>> {
        let state = self.state.read().await;
        Ok(state.payment_methods.get(payment_method_id).cloned())
    }
}
