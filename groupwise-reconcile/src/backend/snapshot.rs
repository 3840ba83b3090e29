//! JSON snapshot-file backend

use super::apply_allocations;
use async_trait::async_trait;
use groupwise_core::{
    ErrorContext, Group, GroupAllocations, GroupwiseError, GroupwiseResult, Identity,
    PermissionsBackend, PermissionsSnapshot,
};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Backend reading and writing a `PermissionsSnapshot` JSON file
///
/// Every call goes back to disk; writes are serialized through a lock.
#[derive(Debug)]
pub struct SnapshotBackend {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl SnapshotBackend {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the snapshot file from scratch
    pub async fn create(&self, snapshot: &PermissionsSnapshot) -> GroupwiseResult<()> {
        let _guard = self.write_lock.lock().await;
        self.write(snapshot).await
    }

    pub async fn load(&self) -> GroupwiseResult<PermissionsSnapshot> {
        let data = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| GroupwiseError::Snapshot {
                message: format!("Failed to read snapshot {}: {}", self.path.display(), e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("snapshot")
                    .with_operation("read_file")
                    .with_suggestion("Check the snapshot.path setting or pass --snapshot"),
            })?;

        let snapshot = serde_json::from_str(&data).map_err(|e| GroupwiseError::Snapshot {
            message: format!("Failed to parse snapshot {}: {}", self.path.display(), e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("snapshot")
                .with_operation("parse_json")
                .with_suggestion("The snapshot must be {\"identities\": [...], \"groups\": [...]}"),
        })?;

        debug!(path = %self.path.display(), "Loaded permissions snapshot");
        Ok(snapshot)
    }

    async fn write(&self, snapshot: &PermissionsSnapshot) -> GroupwiseResult<()> {
        let data = serde_json::to_string_pretty(snapshot)?;
        tokio::fs::write(&self.path, data)
            .await
            .map_err(|e| GroupwiseError::Snapshot {
                message: format!("Failed to write snapshot {}: {}", self.path.display(), e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("snapshot").with_operation("write_file"),
            })
    }
}

#[async_trait]
impl PermissionsBackend for SnapshotBackend {
    async fn fetch_identities(&self) -> GroupwiseResult<Vec<Identity>> {
        Ok(self.load().await?.identities)
    }

    async fn fetch_groups(&self) -> GroupwiseResult<Vec<Group>> {
        Ok(self.load().await?.groups)
    }

    async fn update_groups_for_identities(
        &self,
        identities: &[Identity],
        allocations: &GroupAllocations,
    ) -> GroupwiseResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut snapshot = self.load().await?;
        let ids: Vec<String> = identities.iter().map(|i| i.id.clone()).collect();

        let updated = apply_allocations(&mut snapshot, &ids, allocations)?;
        self.write(&snapshot).await?;

        info!(
            path = %self.path.display(),
            updated = updated,
            "Wrote updated identity groups to snapshot"
        );
        Ok(())
    }
}
