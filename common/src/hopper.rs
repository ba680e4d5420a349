use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::value;

/// Level and pellet name from the dedicated hopper endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HopperDetails {
    pub level: i64,
    pub name: String,
}

impl HopperDetails {
    pub fn from_json(raw: &Value) -> Self {
        Self {
            level: value::int_or(raw, "hopper_level", 0),
            name: value::text_or(raw, "hopper_pellets", "Unknown"),
        }
    }

    /// Overlays `level` and `name` onto a notify-derived hopper record.
    pub fn merge_into(&self, mut record: Map<String, Value>) -> Map<String, Value> {
        record.insert("level".to_string(), json!(self.level));
        record.insert("name".to_string(), json!(self.name));
        record
    }
}

/// Last successfully fetched hopper details. Never expires; a failed fetch
/// leaves the previous value in place.
#[derive(Debug, Clone, Default)]
pub struct HopperCache {
    last: Option<HopperDetails>,
}

impl HopperCache {
    /// Empty or non-object replies leave the cached value alone.
    pub fn update(&mut self, raw: &Value) {
        if raw.as_object().is_some_and(|record| !record.is_empty()) {
            self.last = Some(HopperDetails::from_json(raw));
        }
    }

    pub fn get(&self) -> Option<&HopperDetails> {
        self.last.as_ref()
    }
}
