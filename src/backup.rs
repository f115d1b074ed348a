//! Whole-data JSON backup
//!
//! A backup carries all three collections. Restoring one replaces the
//! local collections outright; nothing is merged.

use crate::core::error::{OdrnaError, Result};
use crate::entity::Snapshot;
use crate::store::EntityStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const BACKUP_VERSION: &str = "1.0.0";

/// Who the backup belongs to, for display on restore
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackupUser {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backup {
    pub version: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub user: BackupUser,
    pub data: Snapshot,
}

impl Backup {
    /// Capture the current contents of the store
    pub fn export(store: &EntityStore, user: BackupUser) -> Self {
        Self {
            version: BACKUP_VERSION.to_string(),
            timestamp: Utc::now(),
            user,
            data: store.snapshot(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let backup: Backup = serde_json::from_str(json)
            .map_err(|e| OdrnaError::Backup(format!("not a backup file: {}", e)))?;
        if backup.version.trim().is_empty() {
            return Err(OdrnaError::Backup("missing version".into()));
        }
        if backup.version != BACKUP_VERSION {
            tracing::warn!(
                "Backup version {} differs from {}, restoring anyway",
                backup.version,
                BACKUP_VERSION
            );
        }
        Ok(backup)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn read_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn write_file(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Replace every local collection with the backup's contents
    pub fn restore(&self, store: &mut EntityStore) -> Result<()> {
        store.replace_all(&self.data)?;
        tracing::info!("Restored backup from {}: {}", self.timestamp, self.counts());
        Ok(())
    }

    /// Suggested file name for an export
    pub fn file_name(&self) -> String {
        format!("odrna-backup-{}.json", self.timestamp.format("%Y-%m-%d"))
    }

    pub fn counts(&self) -> String {
        format!(
            "{} tarefas, {} eventos e {} transações",
            self.data.tasks.len(),
            self.data.events.len(),
            self.data.transactions.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Category, Task};

    #[test]
    fn test_export_restore_replaces_collections() {
        let mut source = EntityStore::in_memory();
        source
            .add(Task::new("Estudar", Category::Study, Utc::now()))
            .unwrap();
        let backup = Backup::export(
            &source,
            BackupUser {
                email: "ana@example.com".into(),
                name: "Ana".into(),
            },
        );

        let mut target = EntityStore::in_memory();
        target
            .add(Task::new("Antiga", Category::Work, Utc::now()))
            .unwrap();
        let parsed = Backup::from_json(&backup.to_json().unwrap()).unwrap();
        parsed.restore(&mut target).unwrap();

        assert_eq!(target.get_tasks(), source.get_tasks());
        assert!(target.get_events().is_empty());
    }

    #[test]
    fn test_rejects_invalid_backup() {
        assert!(Backup::from_json("{}").is_err());
        assert!(Backup::from_json("not json").is_err());
        let blank = r#"{"version": "", "timestamp": "2025-01-14T10:00:00Z", "data": {}}"#;
        assert!(matches!(Backup::from_json(blank), Err(OdrnaError::Backup(_))));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.json");
        let backup = Backup::export(&EntityStore::in_memory(), BackupUser::default());

        backup.write_file(&path).unwrap();
        let read = Backup::read_file(&path).unwrap();
        assert_eq!(read.version, BACKUP_VERSION);
        assert!(read.file_name().starts_with("odrna-backup-"));
    }
}
