use serde::{Deserialize, Serialize};

use super::expandable::{Expandable, HasId};
use super::reference::ReferenceEntity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub active: bool,
}

impl HasId for Product {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recurring {
    pub interval: String,
    #[serde(default = "default_interval_count")]
    pub interval_count: i64,
}

fn default_interval_count() -> i64 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub id: String,
    pub product: Expandable<Product>,
    pub currency: String,
    #[serde(default)]
    pub unit_amount: Option<i64>,
    #[serde(default)]
    pub recurring: Option<Recurring>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub nickname: Option<String>,
}

impl Price {
    pub fn product_id(&self) -> &str {
        self.product.id()
    }

    pub fn product(&self) -> Option<&Product> {
        self.product.as_object()
    }

    /// Replace the product reference with the full product.
    pub fn with_product(mut self, product: Product) -> Self {
        self.product = Expandable::Object(Box::new(product));
        self
    }
}

impl ReferenceEntity for Price {
    fn id(&self) -> &str {
        &self.id
    }

    fn grouping_key(&self) -> &str {
        self.product_id()
    }
}
