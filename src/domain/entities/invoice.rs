use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::expandable::{Expandable, HasId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentIntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
    Other(String),
}

impl PaymentIntentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            PaymentIntentStatus::RequiresPaymentMethod => "requires_payment_method",
            PaymentIntentStatus::RequiresConfirmation => "requires_confirmation",
            PaymentIntentStatus::RequiresAction => "requires_action",
            PaymentIntentStatus::Processing => "processing",
            PaymentIntentStatus::RequiresCapture => "requires_capture",
            PaymentIntentStatus::Canceled => "canceled",
            PaymentIntentStatus::Succeeded => "succeeded",
            PaymentIntentStatus::Other(s) => s,
        }
    }

    /// Returns true if the payment has been taken or is on its way.
    pub fn is_settling(&self) -> bool {
        matches!(
            self,
            PaymentIntentStatus::Processing | PaymentIntentStatus::Succeeded
        )
    }
}

impl From<String> for PaymentIntentStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "requires_payment_method" => PaymentIntentStatus::RequiresPaymentMethod,
            "requires_confirmation" => PaymentIntentStatus::RequiresConfirmation,
            "requires_action" => PaymentIntentStatus::RequiresAction,
            "processing" => PaymentIntentStatus::Processing,
            "requires_capture" => PaymentIntentStatus::RequiresCapture,
            "canceled" => PaymentIntentStatus::Canceled,
            "succeeded" => PaymentIntentStatus::Succeeded,
            _ => PaymentIntentStatus::Other(s),
        }
    }
}

impl From<PaymentIntentStatus> for String {
    fn from(status: PaymentIntentStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for PaymentIntentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntentAttributes {
    pub id: String,
    pub status: PaymentIntentStatus,
}

impl HasId for PaymentIntentAttributes {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Invoice status as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Open,
    Paid,
    Uncollectible,
    Void,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Open => "open",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Uncollectible => "uncollectible",
            InvoiceStatus::Void => "void",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "paid" => InvoiceStatus::Paid,
            "uncollectible" => InvoiceStatus::Uncollectible,
            "void" => InvoiceStatus::Void,
            "draft" => InvoiceStatus::Draft,
            _ => InvoiceStatus::Open,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceAttributes {
    /// Upcoming invoices have no id yet.
    #[serde(default)]
    pub id: String,
    pub customer: String,
    #[serde(default)]
    pub number: Option<String>,
    pub amount_due: i64,
    #[serde(default)]
    pub status: Option<InvoiceStatus>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_intent: Option<Expandable<PaymentIntentAttributes>>,
}

impl HasId for InvoiceAttributes {
    fn id(&self) -> &str {
        &self.id
    }
}

/// A provider invoice plus the time we last saw it change.
#[derive(Debug, Clone, PartialEq)]
pub struct Invoice {
    attrs: InvoiceAttributes,
    updated_at: DateTime<Utc>,
}

impl Invoice {
    pub fn new(attrs: InvoiceAttributes) -> Self {
        let updated_at = attrs.created;
        Self { attrs, updated_at }
    }

    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = updated_at;
        self
    }

    pub fn id(&self) -> &str {
        &self.attrs.id
    }

    pub fn customer_id(&self) -> &str {
        &self.attrs.customer
    }

    pub fn number(&self) -> Option<&str> {
        self.attrs.number.as_deref()
    }

    pub fn amount_due(&self) -> i64 {
        self.attrs.amount_due
    }

    pub fn status(&self) -> InvoiceStatus {
        self.attrs.status.unwrap_or(InvoiceStatus::Draft)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.attrs.created
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Status of the expanded payment intent, if the invoice carries one.
    pub fn payment_intent_status(&self) -> Option<&PaymentIntentStatus> {
        self.attrs
            .payment_intent
            .as_ref()
            .and_then(Expandable::as_object)
            .map(|pi| &pi.status)
    }

    pub fn attributes(&self) -> &InvoiceAttributes {
        &self.attrs
    }
}
