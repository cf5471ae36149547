use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDetails {
    pub brand: String,
    pub exp_month: i64,
    pub exp_year: i64,
    pub last4: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuBecsDebitDetails {
    pub bsb_number: Option<String>,
    pub last4: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacsDebitDetails {
    pub last4: Option<String>,
    pub sort_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SepaDebitDetails {
    pub bank_code: Option<String>,
    pub branch_code: Option<String>,
    pub country: Option<String>,
    pub last4: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankDetails {
    pub bank: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bic: Option<String>,
}

/// Type-specific attributes of a payment method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentMethodDetails {
    Card(CardDetails),
    AuBecsDebit(AuBecsDebitDetails),
    BacsDebit(BacsDebitDetails),
    SepaDebit(SepaDebitDetails),
    Ideal(BankDetails),
    Fpx(BankDetails),
    P24(BankDetails),
    Unknown,
}

impl PaymentMethodDetails {
    /// Decode the stored `info` column for the given type tag. Unknown tags
    /// and null info decode to `Unknown`.
    pub fn from_info(kind: &str, info: serde_json::Value) -> Result<Self, serde_json::Error> {
        if info.is_null() {
            return Ok(PaymentMethodDetails::Unknown);
        }
        Ok(match kind {
            "card" => PaymentMethodDetails::Card(serde_json::from_value(info)?),
            "au_becs_debit" => PaymentMethodDetails::AuBecsDebit(serde_json::from_value(info)?),
            "bacs_debit" => PaymentMethodDetails::BacsDebit(serde_json::from_value(info)?),
            "sepa_debit" => PaymentMethodDetails::SepaDebit(serde_json::from_value(info)?),
            "ideal" => PaymentMethodDetails::Ideal(serde_json::from_value(info)?),
            "fpx" => PaymentMethodDetails::Fpx(serde_json::from_value(info)?),
            "p24" => PaymentMethodDetails::P24(serde_json::from_value(info)?),
            _ => PaymentMethodDetails::Unknown,
        })
    }

    /// The value stored in the `info` column.
    pub fn to_info(&self) -> serde_json::Value {
        let value = match self {
            PaymentMethodDetails::Card(d) => serde_json::to_value(d),
            PaymentMethodDetails::AuBecsDebit(d) => serde_json::to_value(d),
            PaymentMethodDetails::BacsDebit(d) => serde_json::to_value(d),
            PaymentMethodDetails::SepaDebit(d) => serde_json::to_value(d),
            PaymentMethodDetails::Ideal(d)
            | PaymentMethodDetails::Fpx(d)
            | PaymentMethodDetails::P24(d) => serde_json::to_value(d),
            PaymentMethodDetails::Unknown => Ok(serde_json::Value::Null),
        };
        value.unwrap_or(serde_json::Value::Null)
    }
}

/// Payment method fields owned by the payment provider, in wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethodAttributes {
    pub id: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<CardDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub au_becs_debit: Option<AuBecsDebitDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bacs_debit: Option<BacsDebitDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sepa_debit: Option<SepaDebitDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ideal: Option<BankDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fpx: Option<BankDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p24: Option<BankDetails>,
}

impl PaymentMethodAttributes {
    pub fn details(&self) -> PaymentMethodDetails {
        let details = match self.kind.as_str() {
            "card" => self.card.clone().map(PaymentMethodDetails::Card),
            "au_becs_debit" => self.au_becs_debit.clone().map(PaymentMethodDetails::AuBecsDebit),
            "bacs_debit" => self.bacs_debit.clone().map(PaymentMethodDetails::BacsDebit),
            "sepa_debit" => self.sepa_debit.clone().map(PaymentMethodDetails::SepaDebit),
            "ideal" => self.ideal.clone().map(PaymentMethodDetails::Ideal),
            "fpx" => self.fpx.clone().map(PaymentMethodDetails::Fpx),
            "p24" => self.p24.clone().map(PaymentMethodDetails::P24),
            _ => None,
        };
        details.unwrap_or(PaymentMethodDetails::Unknown)
    }

    /// Rebuild wire attributes from a stored row.
    pub fn from_parts(
        id: String,
        customer: String,
        kind: String,
        details: PaymentMethodDetails,
        created: DateTime<Utc>,
    ) -> Self {
        let mut attrs = PaymentMethodAttributes {
            id,
            customer: Some(customer),
            kind,
            created,
            card: None,
            au_becs_debit: None,
            bacs_debit: None,
            sepa_debit: None,
            ideal: None,
            fpx: None,
            p24: None,
        };
        match details {
            PaymentMethodDetails::Card(d) => attrs.card = Some(d),
            PaymentMethodDetails::AuBecsDebit(d) => attrs.au_becs_debit = Some(d),
            PaymentMethodDetails::BacsDebit(d) => attrs.bacs_debit = Some(d),
            PaymentMethodDetails::SepaDebit(d) => attrs.sepa_debit = Some(d),
            PaymentMethodDetails::Ideal(d) => attrs.ideal = Some(d),
            PaymentMethodDetails::Fpx(d) => attrs.fpx = Some(d),
            PaymentMethodDetails::P24(d) => attrs.p24 = Some(d),
            PaymentMethodDetails::Unknown => {}
        }
        attrs
    }
}

/// A provider payment method plus the locally tracked default flag.
///
/// At most one payment method per customer is the default; the store
/// enforces that on `put`.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentMethod {
    attrs: PaymentMethodAttributes,
    is_default: bool,
}

impl PaymentMethod {
    pub fn new(attrs: PaymentMethodAttributes) -> Self {
        Self {
            attrs,
            is_default: false,
        }
    }

    pub fn with_default(mut self, is_default: bool) -> Self {
        self.is_default = is_default;
        self
    }

    pub fn id(&self) -> &str {
        &self.attrs.id
    }

    pub fn customer_id(&self) -> Option<&str> {
        self.attrs.customer.as_deref()
    }

    pub fn kind(&self) -> &str {
        &self.attrs.kind
    }

    pub fn details(&self) -> PaymentMethodDetails {
        self.attrs.details()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.attrs.created
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    pub fn set_default(&mut self, is_default: bool) {
        self.is_default = is_default;
    }

    pub fn attributes(&self) -> &PaymentMethodAttributes {
        &self.attrs
    }

    /// Record the owning customer locally after a remote attach.
    pub fn assign_customer(&mut self, customer_id: &str) {
        self.attrs.customer = Some(customer_id.to_string());
    }
}
