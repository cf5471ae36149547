//! Test data factories for creating valid test fixtures.
//!
//! Each factory function creates a complete, valid object with sensible defaults.
//! Use the closure parameter to override specific fields as needed.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::domain::entities::{
    customer::{Customer, CustomerAttributes},
    expandable::Expandable,
    invoice::{Invoice, InvoiceAttributes, InvoiceStatus},
    payment_method::{CardDetails, PaymentMethod, PaymentMethodAttributes},
    price::{Price, Product},
    subscription::{Subscription, SubscriptionAttributes, SubscriptionStatus},
    tax_rate::TaxRate,
};

/// Fixed timestamp for deterministic tests.
pub fn test_datetime() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

/// Create a test customer with sensible defaults.
pub fn create_test_customer(overrides: impl FnOnce(&mut CustomerAttributes)) -> Customer {
    let mut attrs = CustomerAttributes {
        id: "cus_test".to_string(),
        email: Some("customer@example.com".to_string()),
        created: test_datetime(),
    };
    overrides(&mut attrs);
    Customer::new(attrs)
}

/// Create a test card payment method owned by `customer_id`.
pub fn create_test_payment_method(
    customer_id: &str,
    overrides: impl FnOnce(&mut PaymentMethodAttributes),
) -> PaymentMethod {
    let mut attrs = test_card_attributes("pm_test", Some(customer_id));
    overrides(&mut attrs);
    PaymentMethod::new(attrs)
}

pub fn test_card_attributes(id: &str, customer_id: Option<&str>) -> PaymentMethodAttributes {
    PaymentMethodAttributes {
        id: id.to_string(),
        customer: customer_id.map(str::to_string),
        kind: "card".to_string(),
        created: test_datetime(),
        card: Some(CardDetails {
            brand: "visa".to_string(),
            exp_month: 12,
            exp_year: 2030,
            last4: "4242".to_string(),
        }),
        au_becs_debit: None,
        bacs_debit: None,
        sepa_debit: None,
        ideal: None,
        fpx: None,
        p24: None,
    }
}

/// Active subscription whose current period ends 30 days from now.
pub fn test_subscription_attributes(customer_id: &str) -> SubscriptionAttributes {
    SubscriptionAttributes {
        id: "sub_test".to_string(),
        customer: customer_id.to_string(),
        status: SubscriptionStatus::Active,
        start_date: test_datetime(),
        current_period_end: Some(Utc::now() + Duration::days(30)),
        cancel_at_period_end: false,
        latest_invoice: None,
    }
}

/// Create a test subscription. `ends_at` is derived from the attributes.
pub fn create_test_subscription(
    customer_id: &str,
    overrides: impl FnOnce(&mut SubscriptionAttributes),
) -> Subscription {
    let mut attrs = test_subscription_attributes(customer_id);
    overrides(&mut attrs);
    Subscription::from_attributes(attrs)
}

pub fn create_test_invoice(
    customer_id: &str,
    overrides: impl FnOnce(&mut InvoiceAttributes),
) -> Invoice {
    let mut attrs = InvoiceAttributes {
        id: "in_test".to_string(),
        customer: customer_id.to_string(),
        number: Some("TEST-0001".to_string()),
        amount_due: 2000,
        status: Some(InvoiceStatus::Paid),
        created: test_datetime(),
        payment_intent: None,
    };
    overrides(&mut attrs);
    Invoice::new(attrs)
}

pub fn create_test_tax_rate(overrides: impl FnOnce(&mut TaxRate)) -> TaxRate {
    let mut rate = TaxRate {
        id: "txr_test".to_string(),
        display_name: "VAT".to_string(),
        percentage: 20.0,
        inclusive: false,
        active: true,
        jurisdiction: Some("GB".to_string()),
        country: Some("GB".to_string()),
        description: None,
    };
    overrides(&mut rate);
    rate
}

pub fn create_test_price(overrides: impl FnOnce(&mut Price)) -> Price {
    let mut price = Price {
        id: "price_test".to_string(),
        product: Expandable::Object(Box::new(Product {
            id: "prod_test".to_string(),
            name: "Pro".to_string(),
            description: None,
            active: true,
        })),
        currency: "gbp".to_string(),
        unit_amount: Some(500),
        recurring: None,
        active: true,
        nickname: None,
    };
    overrides(&mut price);
    price
}
