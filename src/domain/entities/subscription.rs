use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::expandable::{Expandable, HasId};
use super::invoice::{InvoiceAttributes, PaymentIntentStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SubscriptionStatus {
    All,
    Active,
    Trialing,
    PastDue,
    Canceled,
    Incomplete,
    IncompleteExpired,
    Unpaid,
    Paused,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::All => "all",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Incomplete => "incomplete",
            SubscriptionStatus::IncompleteExpired => "incomplete_expired",
            SubscriptionStatus::Unpaid => "unpaid",
            SubscriptionStatus::Paused => "paused",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "all" => SubscriptionStatus::All,
            "active" => SubscriptionStatus::Active,
            "trialing" => SubscriptionStatus::Trialing,
            "past_due" => SubscriptionStatus::PastDue,
            "canceled" | "cancelled" => SubscriptionStatus::Canceled,
            "incomplete_expired" => SubscriptionStatus::IncompleteExpired,
            "unpaid" => SubscriptionStatus::Unpaid,
            "paused" => SubscriptionStatus::Paused,
            _ => SubscriptionStatus::Incomplete,
        }
    }

    /// Statuses under which the customer may use what they subscribed to.
    pub fn is_usable(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::All | SubscriptionStatus::Active | SubscriptionStatus::Trialing
        )
    }
}

impl From<String> for SubscriptionStatus {
    fn from(s: String) -> Self {
        SubscriptionStatus::from_str(&s)
    }
}

impl From<SubscriptionStatus> for String {
    fn from(status: SubscriptionStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a subscription sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    PendingPayment,
    Active,
    GracePeriod,
    Canceled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionAttributes {
    pub id: String,
    pub customer: String,
    pub status: SubscriptionStatus,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub start_date: DateTime<Utc>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub current_period_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_invoice: Option<Expandable<InvoiceAttributes>>,
}

impl HasId for SubscriptionAttributes {
    fn id(&self) -> &str {
        &self.id
    }
}

/// A provider subscription plus the locally tracked end of its grace period.
///
/// `ends_at` is set exactly while a cancellation is scheduled and has not been
/// undone by a reactivation.
#[derive(Debug, Clone, PartialEq)]
pub struct Subscription {
    attrs: SubscriptionAttributes,
    ends_at: Option<DateTime<Utc>>,
}

impl Subscription {
    /// Build from a provider response, deriving `ends_at` from the scheduled
    /// cancellation.
    pub fn from_attributes(attrs: SubscriptionAttributes) -> Self {
        let ends_at = if attrs.cancel_at_period_end {
            if attrs.current_period_end.is_none() {
                tracing::warn!(
                    subscription_id = %attrs.id,
                    "Cancellation scheduled without a current period end; grace period is unknown"
                );
            }
            attrs.current_period_end
        } else {
            None
        };
        Self { attrs, ends_at }
    }

    /// Rebuild a stored subscription.
    pub fn from_parts(
        id: String,
        customer_id: String,
        status: SubscriptionStatus,
        started_at: DateTime<Utc>,
        current_period_end: Option<DateTime<Utc>>,
        ends_at: Option<DateTime<Utc>>,
    ) -> Self {
        let attrs = SubscriptionAttributes {
            id,
            customer: customer_id,
            status,
            start_date: started_at,
            current_period_end,
            cancel_at_period_end: ends_at.is_some(),
            latest_invoice: None,
        };
        Self { attrs, ends_at }
    }

    pub fn id(&self) -> &str {
        &self.attrs.id
    }

    pub fn customer_id(&self) -> &str {
        &self.attrs.customer
    }

    pub fn status(&self) -> SubscriptionStatus {
        self.attrs.status
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.attrs.start_date
    }

    pub fn current_period_end(&self) -> Option<DateTime<Utc>> {
        self.attrs.current_period_end
    }

    pub fn ends_at(&self) -> Option<DateTime<Utc>> {
        self.ends_at
    }

    pub fn attributes(&self) -> &SubscriptionAttributes {
        &self.attrs
    }

    /// The latest invoice, when the provider response expanded it.
    pub fn latest_invoice(&self) -> Option<&InvoiceAttributes> {
        self.attrs
            .latest_invoice
            .as_ref()
            .and_then(Expandable::as_object)
    }

    pub fn latest_invoice_id(&self) -> Option<&str> {
        self.attrs.latest_invoice.as_ref().map(Expandable::id)
    }

    pub fn latest_payment_intent_status(&self) -> Option<&PaymentIntentStatus> {
        self.latest_invoice()
            .and_then(|invoice| invoice.payment_intent.as_ref())
            .and_then(Expandable::as_object)
            .map(|pi| &pi.status)
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.within_grace_at(now) || self.attrs.status.is_usable()
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    pub fn within_grace_at(&self, now: DateTime<Utc>) -> bool {
        self.ends_at.is_some_and(|ends_at| now < ends_at)
    }

    pub fn within_grace(&self) -> bool {
        self.within_grace_at(Utc::now())
    }

    pub fn lifecycle_state_at(&self, now: DateTime<Utc>) -> LifecycleState {
        if self.attrs.status == SubscriptionStatus::Incomplete {
            LifecycleState::PendingPayment
        } else if self.within_grace_at(now) {
            LifecycleState::GracePeriod
        } else if self.attrs.status.is_usable() {
            LifecycleState::Active
        } else {
            LifecycleState::Canceled
        }
    }

    pub fn lifecycle_state(&self) -> LifecycleState {
        self.lifecycle_state_at(Utc::now())
    }
}
