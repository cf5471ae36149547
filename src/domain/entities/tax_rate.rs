use serde::{Deserialize, Serialize};

use super::reference::ReferenceEntity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxRate {
    pub id: String,
    pub display_name: String,
    pub percentage: f64,
    #[serde(default)]
    pub inclusive: bool,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub jurisdiction: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ReferenceEntity for TaxRate {
    fn id(&self) -> &str {
        &self.id
    }

    fn grouping_key(&self) -> &str {
        self.jurisdiction.as_deref().unwrap_or_default()
    }
}
