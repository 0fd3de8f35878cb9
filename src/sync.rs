// File: ./src/sync.rs
//! Client session: the item store, the REST client and the optimistic commit
//! that ties them together.
//!
//! Every mutation goes through [`Session::commit`]: the patch is applied to
//! the store (and cache) first, then the remote call runs, and if that fails
//! the inverse patch is applied before the error is returned.
//!
//! The server is the source of truth whenever it answers. The cached list is
//! only shown when the server cannot be reached.

use crate::board::{Board, Progress};
use crate::cache::Cache;
use crate::client::{ApiError, PackClient};
use crate::config::Config;
use crate::drag::DropOutcome;
use crate::model::item::LOCAL_ID_PREFIX;
use crate::model::{Alert, Checklist, ChecklistItem, ItemStatus, Suggestion, TripDetails};
use crate::storage::LocalStorage;
use crate::store::{ItemStore, Patch, StoreError};
use std::future::Future;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug)]
pub enum SyncError {
    Api(ApiError),
    Store(StoreError),
    UnknownItem(String),
    /// The item only exists locally; its create call has not completed.
    NotSynced(String),
    NoChecklist,
    InvalidInput(&'static str),
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Api(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::UnknownItem(id) => write!(f, "item {id} not found"),
            Self::NotSynced(id) => write!(f, "item {id} is not on the server yet"),
            Self::NoChecklist => write!(f, "no checklist available to add items"),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
        }
    }
}

impl std::error::Error for SyncError {}

impl From<ApiError> for SyncError {
    fn from(err: ApiError) -> Self {
        Self::Api(err)
    }
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UnknownItem(id) => Self::UnknownItem(id),
            other => Self::Store(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub checklist: Option<Checklist>,
    pub items: usize,
    /// Set when the server was unreachable and the cache is being shown.
    pub warning: Option<String>,
}

#[derive(Debug, Default)]
pub struct SuggestionReport {
    pub added: Vec<ChecklistItem>,
    pub failed: Vec<(String, SyncError)>,
}

pub struct Session {
    client: PackClient,
    store: ItemStore,
    checklists: Vec<Checklist>,
    current: Option<Checklist>,
    preferred: Option<String>,
    offline: bool,
}

impl Session {
    pub fn new(client: PackClient, storage: LocalStorage, preferred: Option<String>) -> Self {
        let store = ItemStore::new(Cache::load(storage));
        Self {
            client,
            store,
            checklists: vec![],
            current: None,
            preferred,
            offline: false,
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = PackClient::from_config(config).map_err(anyhow::Error::msg)?;
        let storage = LocalStorage::open_default()
            .ok_or_else(|| anyhow::anyhow!("no data directory on this platform"))?;
        Ok(Self::new(client, storage, config.default_checklist.clone()))
    }

    pub fn client(&self) -> &PackClient {
        &self.client
    }

    pub fn items(&self) -> &[ChecklistItem] {
        self.store.items()
    }

    pub fn board(&self) -> Board {
        Board::project(self.store.items())
    }

    pub fn checklists(&self) -> &[Checklist] {
        &self.checklists
    }

    pub fn checklist(&self) -> Option<&Checklist> {
        self.current.as_ref()
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    /// Optimistic two-phase commit.
    ///
    /// Applies `patch` locally, then awaits `remote`. On remote failure the
    /// inverse patch is applied and the remote error returned.
    pub async fn commit<T, Fut>(&mut self, patch: Patch, remote: Fut) -> Result<T, SyncError>
    where
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let inverse = self.store.apply(patch)?;
        match remote.await {
            Ok(value) => Ok(value),
            Err(err) => {
                warn!("Remote change failed ({}), reverting local change", err);
                if let Some(inverse) = inverse
                    && let Err(revert_err) = self.store.apply(inverse)
                {
                    warn!("Revert failed: {}", revert_err);
                }
                Err(SyncError::Api(err))
            }
        }
    }

    /// Fetches checklists and the active checklist's items.
    ///
    /// Unreachable server: keeps the cached items and reports a warning.
    /// Any other failure is returned as an error.
    pub async fn load(&mut self) -> Result<LoadReport, SyncError> {
        let checklists = match self.client.list_checklists().await {
            Ok(list) => list,
            Err(err) if err.is_unreachable() => {
                warn!("Server unreachable ({}), showing cached items", err);
                self.offline = true;
                let cached_id = self.store.cache().current_checklist();
                return Ok(LoadReport {
                    checklist: self.current.clone().or_else(|| {
                        cached_id.map(|id| Checklist {
                            title: format!("Checklist {}", id),
                            id,
                            created_at: None,
                        })
                    }),
                    items: self.store.items().len(),
                    warning: Some("Offline Mode".to_string()),
                });
            }
            Err(err) => return Err(err.into()),
        };
        self.offline = false;
        self.checklists = checklists;

        let wanted = self
            .current
            .as_ref()
            .map(|c| c.id.clone())
            .or_else(|| self.preferred.clone())
            .or_else(|| self.store.cache().current_checklist());
        let chosen = wanted
            .and_then(|id| self.checklists.iter().find(|c| c.id == id).cloned())
            .or_else(|| self.checklists.first().cloned());

        match chosen {
            Some(checklist) => self.open(&checklist.id).await,
            None => {
                self.current = None;
                self.store.apply(Patch::Reset(vec![]))?;
                Ok(LoadReport {
                    checklist: None,
                    items: 0,
                    warning: None,
                })
            }
        }
    }

    /// Switches to checklist `id`, replacing the cached items with the server's.
    pub async fn open(&mut self, id: &str) -> Result<LoadReport, SyncError> {
        let (checklist, items) = self.client.get_checklist(id).await?;
        let count = items.len();
        self.store.apply(Patch::Reset(items))?;
        if let Err(e) = self.store.cache().set_current_checklist(&checklist.id) {
            warn!("Could not persist current checklist: {}", e);
        }
        info!("Opened checklist {} with {} items", checklist.id, count);
        self.current = Some(checklist.clone());
        Ok(LoadReport {
            checklist: Some(checklist),
            items: count,
            warning: None,
        })
    }

    pub async fn create_checklist(&mut self, title: &str) -> Result<Checklist, SyncError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(SyncError::InvalidInput("checklist title is required"));
        }
        let checklist = self.client.create_checklist(title).await?;
        self.checklists.push(checklist.clone());
        Ok(checklist)
    }

    pub async fn rename_checklist(&mut self, id: &str, title: &str) -> Result<(), SyncError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(SyncError::InvalidInput("checklist title is required"));
        }
        self.client.rename_checklist(id, title).await?;
        for checklist in self.checklists.iter_mut().chain(self.current.as_mut()) {
            if checklist.id == id {
                checklist.title = title.to_string();
            }
        }
        Ok(())
    }

    /// Deletes checklist `id` on the server. When it was the open one, the
    /// cached items go with it and the next [`Session::load`] picks another.
    pub async fn delete_checklist(&mut self, id: &str) -> Result<(), SyncError> {
        self.client.delete_checklist(id).await?;
        self.checklists.retain(|c| c.id != id);
        if self.current.as_ref().is_some_and(|c| c.id == id) {
            self.current = None;
            self.store.apply(Patch::Reset(vec![]))?;
            if let Err(e) = self.store.cache().forget_current_checklist() {
                warn!("Could not forget current checklist: {}", e);
            }
        }
        if self.preferred.as_deref() == Some(id) {
            self.preferred = None;
        }
        info!("Deleted checklist {}", id);
        Ok(())
    }

    /// Adds `draft` to the current checklist and returns it with its server id.
    pub async fn create_item(&mut self, mut draft: ChecklistItem) -> Result<ChecklistItem, SyncError> {
        draft.name = draft.name.trim().to_string();
        if draft.name.is_empty() {
            return Err(SyncError::InvalidInput("item name is required"));
        }
        let checklist_id = self
            .current
            .as_ref()
            .map(|c| c.id.clone())
            .ok_or(SyncError::NoChecklist)?;
        draft.checklist_id = Some(checklist_id);
        draft.id = format!("{}{}", LOCAL_ID_PREFIX, Uuid::new_v4());

        let temp_id = draft.id.clone();
        let client = self.client.clone();
        let payload = draft.clone();
        let server_id = self
            .commit(Patch::Insert(draft.clone()), async move {
                client.create_item(&payload).await
            })
            .await?;

        match self.store.apply(Patch::Rekey {
            from: temp_id.clone(),
            to: server_id.clone(),
        }) {
            Ok(_) => {}
            Err(StoreError::DuplicateId(_)) => {
                // server id already cached from an earlier load; keep one copy
                self.store.apply(Patch::Remove(temp_id))?;
                let mut item = draft.clone();
                item.id = server_id.clone();
                self.store.apply(Patch::Insert(item))?;
            }
            Err(e) => return Err(e.into()),
        }
        draft.id = server_id;
        info!("Created item {} ({})", draft.id, draft.name);
        Ok(draft)
    }

    /// Moves an item to `status`. Returns `false` when it already had it, in
    /// which case nothing is sent.
    pub async fn set_status(&mut self, id: &str, status: ItemStatus) -> Result<bool, SyncError> {
        let item = self
            .store
            .get(id)
            .ok_or_else(|| SyncError::UnknownItem(id.to_string()))?;
        if item.is_local() {
            return Err(SyncError::NotSynced(id.to_string()));
        }
        if item.status == status {
            return Ok(false);
        }

        let client = self.client.clone();
        let remote_id = id.to_string();
        self.commit(
            Patch::SetStatus {
                id: id.to_string(),
                status,
            },
            async move { client.update_status(&remote_id, status).await },
        )
        .await?;
        info!("Item {} is now {}", id, status);
        Ok(true)
    }

    /// Carries out a finished drag gesture.
    pub async fn apply_drop(&mut self, outcome: DropOutcome) -> Result<bool, SyncError> {
        match outcome {
            DropOutcome::Move { id, to, .. } => self.set_status(&id, to).await,
            DropOutcome::Unchanged | DropOutcome::Nothing => Ok(false),
        }
    }

    /// Replaces an item's fields, sending only what changed.
    pub async fn edit_item(&mut self, updated: ChecklistItem) -> Result<(), SyncError> {
        if updated.name.trim().is_empty() {
            return Err(SyncError::InvalidInput("item name is required"));
        }
        let before = self
            .store
            .get(&updated.id)
            .cloned()
            .ok_or_else(|| SyncError::UnknownItem(updated.id.clone()))?;
        if before.is_local() {
            return Err(SyncError::NotSynced(before.id));
        }
        let changes = updated.to_api_diff(&before);
        let client = self.client.clone();
        let id = updated.id.clone();
        self.commit(Patch::Replace(updated), async move {
            client.update_item(&id, changes).await
        })
        .await
    }

    /// Deletes an item. Deleting an id that is not in the list is a no-op
    /// and returns `false`.
    pub async fn delete_item(&mut self, id: &str) -> Result<bool, SyncError> {
        let Some(item) = self.store.get(id) else {
            return Ok(false);
        };
        if item.is_local() {
            return Err(SyncError::NotSynced(id.to_string()));
        }
        let client = self.client.clone();
        let remote_id = id.to_string();
        self.commit(Patch::Remove(id.to_string()), async move {
            client.delete_item(&remote_id).await
        })
        .await?;
        info!("Deleted item {}", id);
        Ok(true)
    }

    pub async fn suggestions(&self, trip: &TripDetails) -> Result<Vec<Suggestion>, SyncError> {
        Ok(self.client.get_suggestions(trip).await?)
    }

    /// Creates one item per suggestion. Failures are collected, not fatal.
    pub async fn add_suggestions(
        &mut self,
        suggestions: &[Suggestion],
        status: ItemStatus,
    ) -> SuggestionReport {
        let mut report = SuggestionReport::default();
        for suggestion in suggestions {
            let mut draft = ChecklistItem::new(&suggestion.title, None);
            draft.description = suggestion.reason.clone();
            draft.category = "Suggested".to_string();
            draft.status = status;
            match self.create_item(draft).await {
                Ok(item) => report.added.push(item),
                Err(e) => report.failed.push((suggestion.title.clone(), e)),
            }
        }
        report
    }

    pub async fn alerts(&self) -> Result<Vec<Alert>, SyncError> {
        Ok(self.client.list_alerts().await?)
    }

    pub async fn mark_alert_read(&self, id: &str) -> Result<(), SyncError> {
        Ok(self.client.mark_alert_read(id).await?)
    }

    /// Progress of every checklist, for the dashboard line.
    pub async fn overview(&self) -> Result<Vec<(Checklist, Progress)>, SyncError> {
        let checklists = self.client.list_checklists().await?;
        let mut all: Vec<(Checklist, Progress)> = self
            .client
            .get_all_checklists(&checklists)
            .await
            .into_iter()
            .map(|(c, items)| (c, Board::project(&items).progress()))
            .collect();
        // fetched concurrently; put them back in the server's order
        all.sort_by_key(|(c, _)| checklists.iter().position(|l| l.id == c.id));
        Ok(all)
    }
}
