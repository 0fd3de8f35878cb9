use crate::model::ChecklistItem;
use crate::storage::LocalStorage;
use anyhow::Result;
use tracing::{debug, warn};

pub const ITEMS_KEY: &str = "checklist_items";
pub const CHECKLIST_ID_KEY: &str = "current_checklist_id";

/// Last-known item set, mirrored to durable storage.
///
/// Last writer wins; there is no concurrency control beyond the storage lock.
#[derive(Debug)]
pub struct Cache {
    storage: LocalStorage,
    items: Vec<ChecklistItem>,
}

impl Cache {
    /// Loads the persisted list. A corrupt value is discarded and the cache
    /// starts empty.
    pub fn load(storage: LocalStorage) -> Self {
        let items = match storage.get(ITEMS_KEY) {
            Ok(Some(json)) => match serde_json::from_str::<Vec<ChecklistItem>>(&json) {
                Ok(items) => items,
                Err(e) => {
                    warn!("Discarding corrupt item cache: {}", e);
                    let _ = storage.remove(ITEMS_KEY);
                    vec![]
                }
            },
            Ok(None) => vec![],
            Err(e) => {
                warn!("Could not read item cache: {}", e);
                vec![]
            }
        };
        debug!("Loaded {} cached items", items.len());
        Self { storage, items }
    }

    pub fn get(&self) -> &[ChecklistItem] {
        &self.items
    }

    /// Replaces the list and persists a copy of it.
    /// The in-memory copy only changes once the write has succeeded.
    pub fn set(&mut self, items: &[ChecklistItem]) -> Result<()> {
        let json = serde_json::to_string_pretty(items)?;
        self.storage.set(ITEMS_KEY, &json)?;
        self.items = items.to_vec();
        Ok(())
    }

    pub fn current_checklist(&self) -> Option<String> {
        let raw = self.storage.get(CHECKLIST_ID_KEY).ok().flatten()?;
        let id = match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(serde_json::Value::String(s)) => s,
            Ok(serde_json::Value::Number(n)) => n.to_string(),
            // written by hand or by an older build
            _ => raw.trim().to_string(),
        };
        Some(id).filter(|s| !s.is_empty())
    }

    pub fn set_current_checklist(&self, id: &str) -> Result<()> {
        self.storage.set(CHECKLIST_ID_KEY, &serde_json::to_string(id)?)
    }

    pub fn forget_current_checklist(&self) -> Result<()> {
        self.storage.remove(CHECKLIST_ID_KEY)
    }
}
