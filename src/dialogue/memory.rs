//! Per-session conversation memory.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Oldest history entries are evicted beyond this many.
pub const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// A furniture piece the user added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddedItem {
    pub item: String,
    pub color: Option<String>,
    pub material: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Log entry for a removed piece.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovedItem {
    pub item: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct Memory {
    history: VecDeque<HistoryEntry>,
    added: Vec<AddedItem>,
    removed: Vec<RemovedItem>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a history entry, evicting the oldest past [`HISTORY_LIMIT`].
    pub fn record(&mut self, role: Role, content: impl Into<String>) {
        self.history.push_back(HistoryEntry {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        });
        while self.history.len() > HISTORY_LIMIT {
            self.history.pop_front();
        }
    }

    pub fn history(&self) -> &VecDeque<HistoryEntry> {
        &self.history
    }

    /// The last `n` history entries, oldest first.
    pub fn recent(&self, n: usize) -> Vec<&HistoryEntry> {
        let skip = self.history.len().saturating_sub(n);
        self.history.iter().skip(skip).collect()
    }

    pub fn add_item(&mut self, item: &str, color: Option<&str>, material: Option<&str>) {
        self.added.push(AddedItem {
            item: item.to_string(),
            color: color.map(str::to_string),
            material: material.map(str::to_string),
            timestamp: Utc::now(),
        });
        debug!(item, "Added item to memory");
    }

    /// Remove the first added entry for `item` and log it. Returns the entry.
    pub fn remove_first(&mut self, item: &str) -> Option<AddedItem> {
        let index = self.added.iter().position(|a| a.item == item)?;
        let entry = self.added.remove(index);
        self.removed.push(RemovedItem {
            item: item.to_string(),
            timestamp: Utc::now(),
        });
        debug!(item, "Removed item from memory");
        Some(entry)
    }

    /// Set colour and/or material on every added entry for `item`.
    /// Returns how many entries changed.
    pub fn update_items(&mut self, item: &str, color: Option<&str>, material: Option<&str>) -> usize {
        let mut updated = 0;
        for entry in self.added.iter_mut().filter(|a| a.item == item) {
            if let Some(color) = color {
                entry.color = Some(color.to_string());
            }
            if let Some(material) = material {
                entry.material = Some(material.to_string());
            }
            updated += 1;
        }
        updated
    }

    pub fn added_items(&self) -> &[AddedItem] {
        &self.added
    }

    pub fn removed_items(&self) -> &[RemovedItem] {
        &self.removed
    }
}
