//! Reprimand history store
//!
//! This module provides the persistent store for reprimand records, keyed by
//! id and queried by (user, guild). Counts are computed per call; nothing is
//! cached across calls.

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;
use uuid::Uuid;

use crate::moderation::{
    ExpirableEntry, ModerationAction, ModerationError, ModerationResult, Reprimand, ReprimandKind,
    ReprimandStatus, ReprimandType,
};

/// Store for reprimand records
#[derive(Clone)]
pub struct HistoryStore {
    /// Single map containing all reprimands
    records: Arc<DashMap<Uuid, Reprimand>>,
    /// YAML file backing the store; in-memory only when unset
    persist_path: Option<PathBuf>,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryStore {
    /// Create a new in-memory store
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Arc::new(DashMap::new()),
            persist_path: None,
        }
    }

    /// Load the store from a YAML file, creating an empty store when the file
    /// does not exist yet
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let store = Self {
            records: Arc::new(DashMap::new()),
            persist_path: Some(path.clone()),
        };

        if let Ok(file_content) = tokio::fs::read_to_string(&path).await {
            if let Ok(records) = serde_yaml::from_str::<Vec<Reprimand>>(&file_content) {
                for record in records {
                    store.records.insert(record.id, record);
                }
            }
        }

        info!(records = store.records.len(), "Reprimand history loaded");
        store
    }

    /// Write the store to its backing file; a no-op for in-memory stores
    ///
    /// # Errors
    /// Returns `ModerationError::Persistence` if serialization or the write
    /// fails.
    pub async fn save(&self) -> ModerationResult<()> {
        let Some(path) = &self.persist_path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ModerationError::Persistence(e.to_string()))?;
        }

        let records: Vec<Reprimand> = self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let yaml = serde_yaml::to_string(&records)
            .map_err(|e| ModerationError::Persistence(e.to_string()))?;

        tokio::fs::write(path, yaml)
            .await
            .map_err(|e| ModerationError::Persistence(e.to_string()))?;

        Ok(())
    }

    /// Add a new reprimand record
    pub fn insert(&self, record: Reprimand) {
        self.records.insert(record.id, record);
    }

    /// Get a reprimand record by id
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<Reprimand> {
        self.records.get(&id).map(|entry| entry.value().clone())
    }

    /// Remove a reprimand record by id (hard purge)
    pub fn remove(&self, id: Uuid) -> Option<Reprimand> {
        self.records.remove(&id).map(|(_, record)| record)
    }

    /// Transition a record to a new status
    ///
    /// # Errors
    /// Returns `NotFound` for an unknown id and `InvalidTransition` when the
    /// status change would move backwards.
    pub fn update_status(
        &self,
        id: Uuid,
        status: ReprimandStatus,
        action: ModerationAction,
    ) -> ModerationResult<Reprimand> {
        let mut record = self
            .records
            .get_mut(&id)
            .ok_or(ModerationError::NotFound(id))?;

        record.transition(status, action)?;
        Ok(record.clone())
    }

    /// All records for a member in a guild
    #[must_use]
    pub fn for_user(&self, user_id: u64, guild_id: u64) -> Vec<Reprimand> {
        let mut records: Vec<Reprimand> = self
            .records
            .iter()
            .filter(|entry| {
                let record = entry.value();
                record.user_id == user_id && record.guild_id == guild_id
            })
            .map(|entry| entry.value().clone())
            .collect();

        records.sort_by_key(|r| r.created.timestamp);
        records
    }

    /// Count a member's active history of one kind
    ///
    /// Deleted records never count; hidden records count only when asked.
    /// Warnings sum their amounts rather than counting records.
    #[must_use]
    pub fn count_active(
        &self,
        user_id: u64,
        guild_id: u64,
        kind: ReprimandType,
        count_hidden: bool,
    ) -> u32 {
        self.records
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|r| r.user_id == user_id && r.guild_id == guild_id)
            .filter(|r| r.kind.get_type() == kind)
            .filter(|r| r.is_counted(count_hidden))
            .map(|r| match r.kind {
                ReprimandKind::Warning { amount } => amount,
                _ => 1,
            })
            .sum()
    }

    /// A member's active censored contents in creation order, optionally
    /// narrowed to the records one censor trigger produced
    #[must_use]
    pub fn censored_contents(
        &self,
        user_id: u64,
        guild_id: u64,
        trigger_id: Option<Uuid>,
    ) -> Vec<String> {
        let mut records: Vec<Reprimand> = self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|r| r.user_id == user_id && r.guild_id == guild_id)
            .filter(|r| r.is_counted(false))
            .filter(|r| trigger_id.is_none() || r.trigger_id == trigger_id)
            .filter(|r| r.kind.get_type() == ReprimandType::Censored)
            .collect();

        records.sort_by_key(|r| r.created.timestamp);
        records
            .into_iter()
            .filter_map(|r| match r.kind {
                ReprimandKind::Censored { content, .. } => Some(content),
                _ => None,
            })
            .collect()
    }

    /// The member's standing reprimand of one kind, if any
    #[must_use]
    pub fn find_active(&self, user_id: u64, guild_id: u64, kind: ReprimandType) -> Option<Reprimand> {
        self.records
            .iter()
            .map(|entry| entry.value().clone())
            .find(|r| {
                r.user_id == user_id
                    && r.guild_id == guild_id
                    && r.kind.get_type() == kind
                    && r.is_expiry_pending()
            })
    }

    /// Ids of the reprimands a record cascaded into
    #[must_use]
    pub fn cascade_children(&self, id: Uuid) -> Vec<Uuid> {
        self.records
            .iter()
            .filter(|entry| entry.value().cascade_of == Some(id))
            .map(|entry| *entry.key())
            .collect()
    }

    /// Every time-bound record whose effect is still standing, optionally
    /// narrowed to one guild; used once at scheduler startup
    #[must_use]
    pub fn find_active_expirable(&self, guild_id: Option<u64>) -> Vec<ExpirableEntry> {
        self.records
            .iter()
            .filter(|entry| guild_id.is_none_or(|g| entry.value().guild_id == g))
            .filter_map(|entry| entry.value().expirable())
            .collect()
    }
}
