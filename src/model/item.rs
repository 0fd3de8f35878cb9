// File: ./src/model/item.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

pub const TO_PACK: &str = "To Pack";
pub const PACKED: &str = "Packed";
pub const DELIVERED: &str = "Delivered";

/// Where an item is in its packing lifecycle.
///
/// Deserialization never fails: a missing or unrecognized status lands in
/// `ToPack`, which is also the bucket the board renders it into.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ItemStatus {
    #[default]
    #[serde(rename = "To Pack")]
    ToPack,
    Packed,
    Delivered,
}

impl ItemStatus {
    pub const ALL: [ItemStatus; 3] = [ItemStatus::ToPack, ItemStatus::Packed, ItemStatus::Delivered];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::ToPack => TO_PACK,
            ItemStatus::Packed => PACKED,
            ItemStatus::Delivered => DELIVERED,
        }
    }

    /// Lenient parse used for both cached and server values.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "packed" => ItemStatus::Packed,
            "delivered" => ItemStatus::Delivered,
            _ => ItemStatus::ToPack,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            ItemStatus::ToPack => 0,
            ItemStatus::Packed => 1,
            ItemStatus::Delivered => 2,
        }
    }

    pub fn from_index(idx: usize) -> Self {
        Self::ALL[idx.min(2)]
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ItemStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(match raw {
            Some(serde_json::Value::String(s)) => ItemStatus::parse(&s),
            _ => ItemStatus::ToPack,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChecklistItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default, rename = "assignedTo")]
    pub assignee: Option<String>,
    #[serde(default)]
    pub status: ItemStatus,
    #[serde(default)]
    pub checklist_id: Option<String>,
}

pub fn default_category() -> String {
    "General".to_string()
}

impl ChecklistItem {
    pub fn new(name: &str, checklist_id: Option<String>) -> Self {
        Self {
            id: String::new(),
            name: name.trim().to_string(),
            description: String::new(),
            category: default_category(),
            assignee: None,
            status: ItemStatus::ToPack,
            checklist_id,
        }
    }

    /// Items created optimistically carry this prefix until the server
    /// assigns a real identifier.
    pub fn is_local(&self) -> bool {
        self.id.starts_with(LOCAL_ID_PREFIX)
    }
}

pub const LOCAL_ID_PREFIX: &str = "local-";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Checklist {
    pub id: String,
    pub title: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Alert {
    pub id: String,
    pub kind: String,
    pub message: String,
    pub read: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub checklist: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub title: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TripDetails {
    pub trip_type: String,
    pub destination: String,
    pub duration_days: u32,
    pub group_size: u32,
}
