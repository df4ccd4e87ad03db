use std::collections::BTreeMap;
use std::fmt;

use canonical::Category;
use serde::{Deserialize, Serialize};

/// Identifies the nutrition database a record came from.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SourceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for SourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A nutrition record owned by one backend.
///
/// Records are read-only to the search engine. `source_database` is filled
/// in by the adapter that returned the record, so a JSON store may omit it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FoodRecord {
    /// Opaque id, unique within its backend.
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub category: Category,
    #[serde(default)]
    pub source_database: SourceId,
    /// Nutrient amounts keyed by nutrient name, per 100 g of food.
    #[serde(default)]
    pub nutrients_per_100g: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_weight_grams: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_owner: Option<String>,
}

impl FoodRecord {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, category: Category) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            aliases: Vec::new(),
            category,
            source_database: SourceId::default(),
            nutrients_per_100g: BTreeMap::new(),
            reference_weight_grams: None,
            brand_owner: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<SourceId>) -> Self {
        self.source_database = source.into();
        self
    }

    pub fn with_nutrient(mut self, name: impl Into<String>, amount: f64) -> Self {
        self.nutrients_per_100g.insert(name.into(), amount);
        self
    }

    pub fn with_reference_weight(mut self, grams: f64) -> Self {
        self.reference_weight_grams = Some(grams);
        self
    }

    pub fn with_brand_owner(mut self, owner: impl Into<String>) -> Self {
        self.brand_owner = Some(owner.into());
        self
    }

    /// Display name followed by every alias.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.display_name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}
