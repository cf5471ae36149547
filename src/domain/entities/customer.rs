use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::expandable::HasId;

/// Customer fields owned by the payment provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerAttributes {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created: DateTime<Utc>,
}

impl HasId for CustomerAttributes {
    fn id(&self) -> &str {
        &self.id
    }
}

/// A provider customer plus the jurisdiction we track locally.
#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    attrs: CustomerAttributes,
    jurisdiction: Option<String>,
}

impl Customer {
    pub fn new(attrs: CustomerAttributes) -> Self {
        Self {
            attrs,
            jurisdiction: None,
        }
    }

    pub fn with_jurisdiction(mut self, jurisdiction: Option<String>) -> Self {
        self.jurisdiction = jurisdiction;
        self
    }

    pub fn id(&self) -> &str {
        &self.attrs.id
    }

    pub fn email(&self) -> &str {
        self.attrs.email.as_deref().unwrap_or_default()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.attrs.created
    }

    pub fn jurisdiction(&self) -> Option<&str> {
        self.jurisdiction.as_deref()
    }

    pub fn set_jurisdiction(&mut self, jurisdiction: Option<String>) {
        self.jurisdiction = jurisdiction;
    }

    pub fn attributes(&self) -> &CustomerAttributes {
        &self.attrs
    }

    /// Replace the provider-owned half after a remote round trip, keeping
    /// the local jurisdiction.
    pub fn refresh(&mut self, attrs: CustomerAttributes) {
        self.attrs = attrs;
    }
}
