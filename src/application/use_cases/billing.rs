use std::future::Future;
use std::sync::Arc;

use tracing::instrument;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::{payment_provider::PaymentProviderPort, store::Store},
        use_cases::reference_data::ReferenceData,
    },
    domain::entities::{
        customer::Customer,
        invoice::{Invoice, InvoiceAttributes},
        payment_method::PaymentMethod,
        resource::Resource,
        subscription::Subscription,
    },
    params::Params,
};

// ============================================================================
// Saga log
// ============================================================================

/// Step log for a multi-step billing operation.
///
/// Completed steps are never rolled back automatically. When a later step
/// fails, the log names every completed step and the compensation an
/// operator would have to run, newest first.
struct Saga<'a> {
    operation: &'static str,
    customer_id: &'a str,
    completed: Vec<(&'static str, &'static str)>,
}

impl<'a> Saga<'a> {
    fn new(operation: &'static str, customer_id: &'a str) -> Self {
        Self {
            operation,
            customer_id,
            completed: Vec::new(),
        }
    }

    async fn step<T, F>(
        &mut self,
        step: &'static str,
        compensation: &'static str,
        action: F,
    ) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        match action.await {
            Ok(value) => {
                tracing::info!(
                    operation = self.operation,
                    customer_id = %self.customer_id,
                    step,
                    compensation,
                    "Billing step completed"
                );
                self.completed.push((step, compensation));
                Ok(value)
            }
            Err(err) => {
                self.abort(step, &err);
                Err(err)
            }
        }
    }

    fn abort(&self, failed_step: &'static str, err: &AppError) {
        let completed: Vec<&str> = self.completed.iter().map(|(step, _)| *step).collect();
        let pending: Vec<&str> = self
            .completed
            .iter()
            .rev()
            .map(|(_, compensation)| *compensation)
            .collect();
        tracing::error!(
            operation = self.operation,
            customer_id = %self.customer_id,
            failed_step,
            completed_steps = ?completed,
            pending_compensations = ?pending,
            error = %err,
            "Billing operation aborted; completed steps were not rolled back"
        );
    }
}

// ============================================================================
// Use cases
// ============================================================================

/// Drives customers, payment methods and subscriptions through the provider
/// and keeps the store in step.
///
/// Operations on the same customer may race; the store serialises the
/// writes that matter (the default payment method).
pub struct BillingUseCases {
    store: Arc<dyn Store>,
    provider: Arc<dyn PaymentProviderPort>,
    reference: Arc<ReferenceData>,
}

impl BillingUseCases {
    pub fn new(
        store: Arc<dyn Store>,
        provider: Arc<dyn PaymentProviderPort>,
        reference: Arc<ReferenceData>,
    ) -> Self {
        Self {
            store,
            provider,
            reference,
        }
    }

    // ========================================================================
    // Customers
    // ========================================================================

    /// Stored customer for `email`, created remotely and stored if missing.
    #[instrument(skip(self))]
    pub async fn customer(&self, email: &str) -> AppResult<Customer> {
        if let Some(customer) = self.store.lookup_customer(email).await? {
            return Ok(customer);
        }

        let attrs = self
            .provider
            .create_customer(&Params::new().set("email", email))
            .await?;
        let customer = Customer::new(attrs);
        self.store.put(Resource::from(&customer)).await?;

        tracing::info!(customer_id = %customer.id(), "Created customer");
        Ok(customer)
    }

    /// Existing customer for `email`, or `NotFound`.
    pub async fn existing_customer(&self, email: &str) -> AppResult<Customer> {
        self.store
            .lookup_customer(email)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Local-only: the provider never sees the jurisdiction.
    #[instrument(skip(self, customer), fields(customer_id = %customer.id()))]
    pub async fn set_jurisdiction(
        &self,
        customer: &mut Customer,
        jurisdiction: Option<String>,
    ) -> AppResult<()> {
        customer.set_jurisdiction(jurisdiction);
        self.store.put(Resource::from(&*customer)).await
    }

    // ========================================================================
    // Payment methods
    // ========================================================================

    pub async fn retrieve_payment_method(&self, payment_method_id: &str) -> AppResult<PaymentMethod> {
        let attrs = self
            .provider
            .retrieve_payment_method(payment_method_id)
            .await?;
        Ok(PaymentMethod::new(attrs))
    }

    /// Detach remotely, then drop the local copy.
    #[instrument(skip(self, customer), fields(customer_id = %customer.id()))]
    pub async fn detach_payment_method(
        &self,
        customer: &Customer,
        payment_method_id: &str,
    ) -> AppResult<()> {
        let stored = self.store.payment_method_by_id(payment_method_id).await?;
        if let Some(pm) = &stored {
            if pm.customer_id() != Some(customer.id()) {
                return Err(AppError::NotFound);
            }
        }

        let attrs = self
            .provider
            .detach_payment_method(payment_method_id)
            .await?;
        let pm = stored.unwrap_or_else(|| PaymentMethod::new(attrs));
        self.store.remove(Resource::from(&pm)).await
    }

    pub async fn payment_methods(&self, customer: &Customer) -> AppResult<Vec<PaymentMethod>> {
        self.store.payment_methods(customer).await
    }

    pub async fn default_payment_method(
        &self,
        customer: &Customer,
    ) -> AppResult<Option<PaymentMethod>> {
        self.store.default_payment_method(customer).await
    }

    // ========================================================================
    // Invoices
    // ========================================================================

    pub async fn invoices(&self, customer: &Customer) -> AppResult<Vec<Invoice>> {
        self.store.invoices(customer).await
    }

    pub async fn lookup_invoice(
        &self,
        customer: &Customer,
        number: &str,
    ) -> AppResult<Option<Invoice>> {
        self.store.lookup_invoice(customer, number).await
    }

    /// Preview of the next invoice. Not stored.
    pub async fn upcoming_invoice(&self, customer: &Customer) -> AppResult<InvoiceAttributes> {
        self.provider.upcoming_invoice(customer.id()).await
    }

    // ========================================================================
    // Subscription lifecycle
    // ========================================================================

    pub async fn subscription(&self, customer: &Customer) -> AppResult<Option<Subscription>> {
        self.store.subscription(customer).await
    }

    /// Make `payment_method_id` the customer's default and ensure a valid
    /// subscription exists.
    ///
    /// A valid stored subscription is returned as is. Otherwise a new one is
    /// created with `params`; it is stored, together with its latest invoice,
    /// only when the payment intent is processing or succeeded. Any other
    /// intent status is a `PaymentFailure` and nothing is stored, although
    /// the subscription now exists remotely.
    #[instrument(skip(self, customer, params), fields(customer_id = %customer.id()))]
    pub async fn subscribe(
        &self,
        customer: &Customer,
        payment_method_id: &str,
        params: Params,
    ) -> AppResult<Subscription> {
        let existing = self.store.subscription(customer).await?;
        let mut saga = Saga::new("subscribe", customer.id());

        let attrs = saga
            .step(
                "attach_payment_method",
                "detach the payment method",
                self.provider
                    .attach_payment_method(payment_method_id, customer.id()),
            )
            .await?;

        let default_settings = Params::new().set(
            "invoice_settings",
            Params::new().set("default_payment_method", payment_method_id),
        );
        saga.step(
            "set_remote_default",
            "restore the previous invoice_settings.default_payment_method",
            self.provider.update_customer(customer.id(), &default_settings),
        )
        .await?;

        let mut pm = PaymentMethod::new(attrs).with_default(true);
        pm.assign_customer(customer.id());
        saga.step(
            "store_default_payment_method",
            "restore the previous default payment method in the store",
            self.store.put(Resource::from(&pm)),
        )
        .await?;

        if let Some(subscription) = existing.filter(Subscription::is_valid) {
            tracing::info!(
                subscription_id = %subscription.id(),
                "Customer already has a valid subscription"
            );
            return Ok(subscription);
        }

        let params = params
            .set("customer", customer.id())
            .set("expand", vec!["latest_invoice.payment_intent"]);
        let attrs = saga
            .step(
                "create_subscription",
                "cancel the remote subscription",
                self.provider.create_subscription(&params),
            )
            .await?;
        let subscription = Subscription::from_attributes(attrs);

        let settled = subscription
            .latest_payment_intent_status()
            .is_some_and(|status| status.is_settling());
        if !settled {
            let err = AppError::PaymentFailure {
                invoice_id: subscription
                    .latest_invoice_id()
                    .unwrap_or_default()
                    .to_string(),
                status: subscription
                    .latest_payment_intent_status()
                    .map(|status| status.to_string())
                    .unwrap_or_else(|| "missing".to_string()),
            };
            saga.abort("confirm_payment", &err);
            return Err(err);
        }

        saga.step(
            "store_subscription",
            "remove the stored subscription",
            self.store.put(Resource::from(&subscription)),
        )
        .await?;

        if let Some(invoice) = subscription.latest_invoice().cloned().map(Invoice::new) {
            saga.step(
                "store_invoice",
                "remove the stored invoice",
                self.store.put(Resource::from(&invoice)),
            )
            .await?;
        }

        tracing::info!(subscription_id = %subscription.id(), "Subscription created");
        Ok(subscription)
    }

    /// Subscribe to a single price, applying the tax rate loaded for the
    /// customer's jurisdiction when there is one.
    pub async fn subscribe_to_price(
        &self,
        customer: &Customer,
        payment_method_id: &str,
        price_id: &str,
    ) -> AppResult<Subscription> {
        let mut params = Params::new().set("items", vec![Params::new().set("price", price_id)]);

        if let Some(rate) = customer
            .jurisdiction()
            .and_then(|j| self.reference.tax_rates().find(j))
        {
            params.insert("default_tax_rates", vec![rate.id]);
        }

        self.subscribe(customer, payment_method_id, params).await
    }

    /// Undo a scheduled cancellation. Does nothing unless one is scheduled.
    #[instrument(skip(self, customer), fields(customer_id = %customer.id()))]
    pub async fn resubscribe(&self, customer: &Customer) -> AppResult<Option<Subscription>> {
        let Some(subscription) = self.store.subscription(customer).await? else {
            return Ok(None);
        };
        if subscription.ends_at().is_none() {
            return Ok(Some(subscription));
        }

        let attrs = self
            .provider
            .update_subscription(
                subscription.id(),
                &Params::new().set("cancel_at_period_end", false),
            )
            .await?;
        let reactivated = Subscription::from_attributes(attrs);
        self.store.put(Resource::from(&reactivated)).await?;

        tracing::info!(subscription_id = %reactivated.id(), "Subscription reactivated");
        Ok(Some(reactivated))
    }

    /// Schedule cancellation at the end of the current period.
    ///
    /// Returns `None` without side effects when there is no valid
    /// subscription, and the stored subscription unchanged when a
    /// cancellation is already scheduled.
    #[instrument(skip(self, customer), fields(customer_id = %customer.id()))]
    pub async fn unsubscribe(&self, customer: &Customer) -> AppResult<Option<Subscription>> {
        let Some(subscription) = self.store.subscription(customer).await? else {
            return Ok(None);
        };
        if !subscription.is_valid() {
            return Ok(None);
        }
        if subscription.ends_at().is_some() || subscription.attributes().cancel_at_period_end {
            return Ok(Some(subscription));
        }

        let attrs = self
            .provider
            .update_subscription(
                subscription.id(),
                &Params::new().set("cancel_at_period_end", true),
            )
            .await?;
        let canceled = Subscription::from_attributes(attrs);
        self.store.put(Resource::from(&canceled)).await?;

        tracing::info!(
            subscription_id = %canceled.id(),
            ends_at = ?canceled.ends_at(),
            "Subscription cancellation scheduled"
        );
        Ok(Some(canceled))
    }
}
