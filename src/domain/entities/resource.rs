use thiserror::Error;

use super::customer::{Customer, CustomerAttributes};
use super::invoice::{Invoice, InvoiceAttributes};
use super::payment_method::{PaymentMethod, PaymentMethodAttributes};
use super::subscription::{Subscription, SubscriptionAttributes};

/// Any entity the store can put or remove.
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    Customer(&'a Customer),
    Invoice(&'a Invoice),
    PaymentMethod(&'a PaymentMethod),
    Subscription(&'a Subscription),
}

impl Resource<'_> {
    pub fn id(&self) -> &str {
        match self {
            Resource::Customer(c) => c.id(),
            Resource::Invoice(i) => i.id(),
            Resource::PaymentMethod(pm) => pm.id(),
            Resource::Subscription(s) => s.id(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Resource::Customer(_) => "customer",
            Resource::Invoice(_) => "invoice",
            Resource::PaymentMethod(_) => "payment_method",
            Resource::Subscription(_) => "subscription",
        }
    }
}

impl<'a> From<&'a Customer> for Resource<'a> {
    fn from(value: &'a Customer) -> Self {
        Resource::Customer(value)
    }
}

impl<'a> From<&'a Invoice> for Resource<'a> {
    fn from(value: &'a Invoice) -> Self {
        Resource::Invoice(value)
    }
}

impl<'a> From<&'a PaymentMethod> for Resource<'a> {
    fn from(value: &'a PaymentMethod) -> Self {
        Resource::PaymentMethod(value)
    }
}

impl<'a> From<&'a Subscription> for Resource<'a> {
    fn from(value: &'a Subscription) -> Self {
        Resource::Subscription(value)
    }
}

#[derive(Error, Debug)]
pub enum ProviderObjectError {
    #[error("unsupported resource kind {0:?}")]
    UnknownKind(String),
    #[error("malformed {kind} object: {source}")]
    Malformed {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// A provider object as found in an event payload, tagged by its `object` field.
#[derive(Debug, Clone)]
pub enum ProviderObject {
    Customer(CustomerAttributes),
    Invoice(InvoiceAttributes),
    PaymentMethod(PaymentMethodAttributes),
    Subscription(SubscriptionAttributes),
}

impl ProviderObject {
    pub fn from_value(value: serde_json::Value) -> Result<Self, ProviderObjectError> {
        let kind = value
            .get("object")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();

        fn decode<T: serde::de::DeserializeOwned>(
            kind: &'static str,
            value: serde_json::Value,
        ) -> Result<T, ProviderObjectError> {
            serde_json::from_value(value).map_err(|source| ProviderObjectError::Malformed { kind, source })
        }

        match kind.as_str() {
            "customer" => Ok(ProviderObject::Customer(decode("customer", value)?)),
            "invoice" => Ok(ProviderObject::Invoice(decode("invoice", value)?)),
            "payment_method" => Ok(ProviderObject::PaymentMethod(decode("payment_method", value)?)),
            "subscription" => Ok(ProviderObject::Subscription(decode("subscription", value)?)),
            _ => Err(ProviderObjectError::UnknownKind(kind)),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            ProviderObject::Customer(a) => &a.id,
            ProviderObject::Invoice(a) => &a.id,
            ProviderObject::PaymentMethod(a) => &a.id,
            ProviderObject::Subscription(a) => &a.id,
        }
    }
}
