//! Scriptable in-memory payment provider.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_provider::PaymentProviderPort,
    domain::entities::{
        customer::CustomerAttributes,
        expandable::Expandable,
        invoice::{InvoiceAttributes, InvoiceStatus, PaymentIntentAttributes, PaymentIntentStatus},
        payment_method::PaymentMethodAttributes,
        price::{Price, Product},
        subscription::{SubscriptionAttributes, SubscriptionStatus},
        tax_rate::TaxRate,
    },
    params::{ParamValue, Params},
    test_utils::{create_test_price, create_test_tax_rate, test_card_attributes, test_datetime},
};

fn param_str(params: &Params, key: &str) -> Option<String> {
    match params.get(key) {
        Some(ParamValue::Str(s)) => Some(s.clone()),
        _ => None,
    }
}

fn not_found(id: &str) -> AppError {
    AppError::Provider {
        status: 404,
        message: format!("No such resource: '{}'", id),
        kind: "invalid_request_error".to_string(),
    }
}

/// Fake provider that answers from memory and counts every call.
///
/// Reference lookups for ids in `failing_ids` fail with a 404 provider error;
/// so do attach calls for failing payment method ids.
#[derive(Default)]
pub struct FakePaymentProvider {
    pub intent_status: Mutex<Option<PaymentIntentStatus>>,
    pub failing_ids: Mutex<HashSet<String>>,
    pub tax_rates: Mutex<HashMap<String, TaxRate>>,
    pub subscriptions: Mutex<HashMap<String, SubscriptionAttributes>>,
    pub subscription_params: Mutex<Vec<Params>>,
    pub fetch_delay: Mutex<Option<Duration>>,

    pub create_customer_calls: AtomicUsize,
    pub update_customer_calls: AtomicUsize,
    pub attach_calls: AtomicUsize,
    pub detach_calls: AtomicUsize,
    pub create_subscription_calls: AtomicUsize,
    pub update_subscription_calls: AtomicUsize,
    pub reference_calls: AtomicUsize,

    in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
}

impl FakePaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Payment intent status reported on new subscriptions (default `succeeded`).
    pub fn with_intent_status(self, status: PaymentIntentStatus) -> Self {
        *self.intent_status.lock().unwrap() = Some(status);
        self
    }

    pub fn with_failing_ids(self, ids: &[&str]) -> Self {
        self.failing_ids
            .lock()
            .unwrap()
            .extend(ids.iter().map(|id| id.to_string()));
        self
    }

    pub fn with_tax_rate(self, rate: TaxRate) -> Self {
        self.tax_rates.lock().unwrap().insert(rate.id.clone(), rate);
        self
    }

    pub fn with_fetch_delay(self, delay: Duration) -> Self {
        *self.fetch_delay.lock().unwrap() = Some(delay);
        self
    }

    pub fn with_subscription(self, attrs: SubscriptionAttributes) -> Self {
        self.subscriptions
            .lock()
            .unwrap()
            .insert(attrs.id.clone(), attrs);
        self
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn fails(&self, id: &str) -> bool {
        self.failing_ids.lock().unwrap().contains(id)
    }

    async fn reference_fetch(&self, id: &str) -> AppResult<()> {
        self.reference_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.fetch_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.fails(id) {
            return Err(not_found(id));
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentProviderPort for FakePaymentProvider {
    async fn create_customer(&self, params: &Params) -> AppResult<CustomerAttributes> {
        let n = self.create_customer_calls.fetch_add(1, Ordering::SeqCst);
        Ok(CustomerAttributes {
            id: format!("cus_fake_{}", n),
            email: param_str(params, "email"),
            created: Utc::now(),
        })
    }

    async fn update_customer(
        &self,
        customer_id: &str,
        params: &Params,
    ) -> AppResult<CustomerAttributes> {
        self.update_customer_calls.fetch_add(1, Ordering::SeqCst);
        Ok(CustomerAttributes {
            id: customer_id.to_string(),
            email: param_str(params, "email").or_else(|| Some("customer@example.com".into())),
            created: test_datetime(),
        })
    }

    async fn retrieve_payment_method(
        &self,
        payment_method_id: &str,
    ) -> AppResult<PaymentMethodAttributes> {
        if self.fails(payment_method_id) {
            return Err(not_found(payment_method_id));
        }
        Ok(test_card_attributes(payment_method_id, None))
    }

    async fn attach_payment_method(
        &self,
        payment_method_id: &str,
        customer_id: &str,
    ) -> AppResult<PaymentMethodAttributes> {
        self.attach_calls.fetch_add(1, Ordering::SeqCst);
        if self.fails(payment_method_id) {
            return Err(not_found(payment_method_id));
        }
        Ok(test_card_attributes(payment_method_id, Some(customer_id)))
    }

    async fn detach_payment_method(
        &self,
        payment_method_id: &str,
    ) -> AppResult<PaymentMethodAttributes> {
        self.detach_calls.fetch_add(1, Ordering::SeqCst);
        Ok(test_card_attributes(payment_method_id, None))
    }

    async fn create_subscription(&self, params: &Params) -> AppResult<SubscriptionAttributes> {
        let n = self.create_subscription_calls.fetch_add(1, Ordering::SeqCst);
        self.subscription_params.lock().unwrap().push(params.clone());

        let customer = param_str(params, "customer")
            .ok_or_else(|| AppError::InvalidInput("customer is required".into()))?;
        let intent_status = self
            .intent_status
            .lock()
            .unwrap()
            .clone()
            .unwrap_or(PaymentIntentStatus::Succeeded);
        let status = if intent_status.is_settling() {
            SubscriptionStatus::Active
        } else {
            SubscriptionStatus::Incomplete
        };

        let now = Utc::now();
        let attrs = SubscriptionAttributes {
            id: format!("sub_fake_{}", n),
            customer: customer.clone(),
            status,
            start_date: now,
            current_period_end: Some(now + chrono::Duration::days(30)),
            cancel_at_period_end: false,
            latest_invoice: Some(Expandable::Object(Box::new(InvoiceAttributes {
                id: format!("in_fake_{}", n),
                customer,
                number: Some(format!("FAKE-{:04}", n)),
                amount_due: 2000,
                status: Some(if status == SubscriptionStatus::Active {
                    InvoiceStatus::Paid
                } else {
                    InvoiceStatus::Open
                }),
                created: now,
                payment_intent: Some(Expandable::Object(Box::new(PaymentIntentAttributes {
                    id: format!("pi_fake_{}", n),
                    status: intent_status,
                }))),
            }))),
        };
        self.subscriptions
            .lock()
            .unwrap()
            .insert(attrs.id.clone(), attrs.clone());
        Ok(attrs)
    }

    async fn update_subscription(
        &self,
        subscription_id: &str,
        params: &Params,
    ) -> AppResult<SubscriptionAttributes> {
        self.update_subscription_calls.fetch_add(1, Ordering::SeqCst);
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let attrs = subscriptions
            .get_mut(subscription_id)
            .ok_or_else(|| not_found(subscription_id))?;
        if let Some(ParamValue::Bool(cancel)) = params.get("cancel_at_period_end") {
            attrs.cancel_at_period_end = *cancel;
        }
        Ok(attrs.clone())
    }

    async fn upcoming_invoice(&self, customer_id: &str) -> AppResult<InvoiceAttributes> {
        Ok(InvoiceAttributes {
            id: String::new(),
            customer: customer_id.to_string(),
            number: None,
            amount_due: 2000,
            status: Some(InvoiceStatus::Draft),
            created: Utc::now(),
            payment_intent: None,
        })
    }

    async fn retrieve_tax_rate(&self, tax_rate_id: &str) -> AppResult<TaxRate> {
        self.reference_fetch(tax_rate_id).await?;
        if let Some(rate) = self.tax_rates.lock().unwrap().get(tax_rate_id) {
            return Ok(rate.clone());
        }
        Ok(create_test_tax_rate(|r| {
            r.id = tax_rate_id.to_string();
            r.jurisdiction = Some(format!("J-{}", tax_rate_id));
        }))
    }

    async fn retrieve_price(&self, price_id: &str) -> AppResult<Price> {
        self.reference_fetch(price_id).await?;
        Ok(create_test_price(|p| {
            p.id = price_id.to_string();
            p.product = Expandable::Object(Box::new(Product {
                id: format!("prod_{}", price_id),
                name: format!("Product for {}", price_id),
                description: None,
                active: true,
            }));
        }))
    }

    async fn retrieve_product(&self, product_id: &str) -> AppResult<Product> {
        self.reference_fetch(product_id).await?;
        Ok(Product {
            id: product_id.to_string(),
            name: "Pro".to_string(),
            description: None,
            active: true,
        })
    }
}
