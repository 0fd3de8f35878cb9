// File: ./src/store.rs
//! Owned item state with a single write path.
//!
//! Every mutation is a [`Patch`]. [`ItemStore::apply`] applies it, persists
//! the new list through the [`Cache`] and hands back the inverse patch, which
//! is what the optimistic commit in `sync` uses to roll back.

use crate::cache::Cache;
use crate::model::{ChecklistItem, ItemStatus};

#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    Insert(ChecklistItem),
    /// Insert at a position; the inverse of removing the item found there.
    InsertAt { index: usize, item: ChecklistItem },
    Remove(String),
    SetStatus { id: String, status: ItemStatus },
    Replace(ChecklistItem),
    Rekey { from: String, to: String },
    Reset(Vec<ChecklistItem>),
}

#[derive(Debug)]
pub enum StoreError {
    UnknownItem(String),
    DuplicateId(String),
    Persist(anyhow::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownItem(id) => write!(f, "unknown item {id}"),
            Self::DuplicateId(id) => write!(f, "item id {id} already in use"),
            Self::Persist(err) => write!(f, "cache write failed: {err}"),
        }
    }
}

impl std::error::Error for StoreError {}

pub struct ItemStore {
    cache: Cache,
    items: Vec<ChecklistItem>,
}

impl ItemStore {
    pub fn new(cache: Cache) -> Self {
        let items = cache.get().to_vec();
        Self { cache, items }
    }

    pub fn items(&self) -> &[ChecklistItem] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&ChecklistItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Applies `patch` and returns the patch that undoes it.
    ///
    /// `Ok(None)` means nothing changed (removing an absent id, setting the
    /// status an item already has); the cache is not rewritten in that case.
    /// The new list only becomes visible once it has been persisted, so on
    /// any error the store is left as it was.
    pub fn apply(&mut self, patch: Patch) -> Result<Option<Patch>, StoreError> {
        let mut next = self.items.clone();
        let Some(inverse) = apply_to(&mut next, patch)? else {
            return Ok(None);
        };
        self.cache.set(&next).map_err(StoreError::Persist)?;
        self.items = next;
        Ok(Some(inverse))
    }
}

fn position(items: &[ChecklistItem], id: &str) -> Result<usize, StoreError> {
    items
        .iter()
        .position(|i| i.id == id)
        .ok_or_else(|| StoreError::UnknownItem(id.to_string()))
}

fn insert_at(items: &mut Vec<ChecklistItem>, index: usize, item: ChecklistItem) -> Patch {
    match items.iter().position(|i| i.id == item.id) {
        Some(idx) => Patch::Replace(std::mem::replace(&mut items[idx], item)),
        None => {
            let id = item.id.clone();
            items.insert(index.min(items.len()), item);
            Patch::Remove(id)
        }
    }
}

fn apply_to(items: &mut Vec<ChecklistItem>, patch: Patch) -> Result<Option<Patch>, StoreError> {
    let inverse = match patch {
        Patch::Insert(item) => {
            let end = items.len();
            Some(insert_at(items, end, item))
        }
        Patch::InsertAt { index, item } => Some(insert_at(items, index, item)),
        Patch::Remove(id) => items.iter().position(|i| i.id == id).map(|index| Patch::InsertAt {
            index,
            item: items.remove(index),
        }),
        Patch::SetStatus { id, status } => {
            let idx = position(items, &id)?;
            let old = items[idx].status;
            if old == status {
                None
            } else {
                items[idx].status = status;
                Some(Patch::SetStatus { id, status: old })
            }
        }
        Patch::Replace(item) => {
            let idx = position(items, &item.id)?;
            if items[idx] == item {
                None
            } else {
                Some(Patch::Replace(std::mem::replace(&mut items[idx], item)))
            }
        }
        Patch::Rekey { from, to } => {
            if from == to {
                None
            } else {
                if items.iter().any(|i| i.id == to) {
                    return Err(StoreError::DuplicateId(to));
                }
                let idx = position(items, &from)?;
                items[idx].id = to.clone();
                Some(Patch::Rekey { from: to, to: from })
            }
        }
        Patch::Reset(new_items) => {
            let mut unique: Vec<ChecklistItem> = Vec::with_capacity(new_items.len());
            for item in new_items {
                if let Some(existing) = unique.iter_mut().find(|i| i.id == item.id) {
                    *existing = item;
                } else {
                    unique.push(item);
                }
            }
            Some(Patch::Reset(std::mem::replace(items, unique)))
        }
    };
    Ok(inverse)
}
