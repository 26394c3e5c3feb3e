use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::serde_helpers::{deserialize_id, deserialize_optional_text};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    #[serde(deserialize_with = "deserialize_id")]
    pub property_id: String,
    #[serde(default, deserialize_with = "deserialize_optional_text")]
    pub property_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_text")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_text")]
    pub state: Option<String>,
    #[serde(default)]
    pub unit_count: Option<u32>,
}

/// Resolves a property to the city it sits in.
///
/// The join lives outside the aggregation code; anything that can answer
/// "which city is this property in" can drive the by-city report.
pub trait PropertyDirectory {
    fn city_of(&self, property_id: &str) -> Option<&str>;
}

impl PropertyDirectory for HashMap<String, String> {
    fn city_of(&self, property_id: &str) -> Option<&str> {
        self.get(property_id).map(|s| s.as_str())
    }
}

/// Directory built from the exported properties table.
#[derive(Debug, Clone, Default)]
pub struct PropertyIndex {
    cities: HashMap<String, String>,
}

impl PropertyIndex {
    pub fn new(properties: &[Property]) -> Self {
        let cities = properties
            .iter()
            .filter_map(|p| p.city.as_ref().map(|city| (p.property_id.clone(), city.clone())))
            .collect();
        Self { cities }
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }
}

impl PropertyDirectory for PropertyIndex {
    fn city_of(&self, property_id: &str) -> Option<&str> {
        self.cities.city_of(property_id)
    }
}
