//! Shared newtypes and utilities used across all domain modules.
//!
//! These types are serialization-transparent: they serialize/deserialize identically
//! to the raw integers the backend sends, so they can be used directly in wire types
//! and as JSON object keys in the persisted snapshot.

pub mod fmt;

use serde::{Deserialize, Serialize};

// ─── CommodityId ─────────────────────────────────────────────────────────────

/// Identifier of a traded agricultural good.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommodityId(i64);

impl CommodityId {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for CommodityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for CommodityId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

// ─── CircleId ────────────────────────────────────────────────────────────────

/// Identifier of a regional market circle (a mandi catchment area).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CircleId(i64);

impl CircleId {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for CircleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for CircleId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

// ─── UserId ──────────────────────────────────────────────────────────────────

/// Identifier of the signed-in user, as cached by the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_ids_serialize_as_plain_integers() {
        assert_eq!(serde_json::to_string(&CommodityId::new(7)).unwrap(), "7");
        let circle: CircleId = serde_json::from_str("42").unwrap();
        assert_eq!(circle.get(), 42);
    }

    #[test]
    fn test_ids_roundtrip_as_map_keys() {
        let mut map = BTreeMap::new();
        map.insert(CommodityId::new(3), "wheat");
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"3":"wheat"}"#);
        let back: BTreeMap<CommodityId, String> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get(&CommodityId::new(3)).map(String::as_str), Some("wheat"));
    }
}
