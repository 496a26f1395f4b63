//! Generic versioned registry over any serializable spec type. One
//! `Registry<T>` instance per entity kind (`Workflow`, `NodeSpec`,
//! `EdgeSpec`, `ToolSpec`) sharing the same storage backend and the same
//! immutable-once-published contract.

use super::error::RegistryError;
use super::semver::SemVer;
use super::storage::RegistryStorage;
use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;

pub struct Registry<T> {
    kind: &'static str,
    storage: Arc<dyn RegistryStorage>,
    _marker: PhantomData<T>,
}

impl<T> Registry<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    pub fn new(kind: &'static str, storage: Arc<dyn RegistryStorage>) -> Self {
        Self { kind, storage, _marker: PhantomData }
    }

    /// Publish a new, immutable version. If `version` is `None`, auto-bumps
    /// the patch segment of the highest existing version for `id` (starting
    /// at `0.1.0` when none exists).
    pub async fn publish(&self, id: &str, version: Option<&str>, value: &T) -> Result<String, RegistryError> {
        let resolved_version = match version {
            Some(v) => {
                SemVer::parse(v)?;
                v.to_string()
            }
            None => self.next_version(id).await?.to_string(),
        };

        let body = serde_json::to_value(value).map_err(|e| RegistryError::BackendUnavailable(e.to_string()))?;
        self.storage.put(self.kind, id, &resolved_version, body).await?;
        Ok(resolved_version)
    }

    async fn next_version(&self, id: &str) -> Result<SemVer, RegistryError> {
        let versions = self.storage.list_versions(self.kind, id).await?;
        let highest = versions
            .iter()
            .filter_map(|v| SemVer::parse(v).ok())
            .max();
        Ok(match highest {
            Some(v) => v.bump_patch(),
            None => SemVer { major: 0, minor: 1, patch: 0 },
        })
    }

    pub async fn get(&self, id: &str, version: &str) -> Result<T, RegistryError> {
        let body = self
            .storage
            .get(self.kind, id, version)
            .await?
            .ok_or_else(|| RegistryError::NotFound { kind: self.kind, id: id.to_string() })?;
        serde_json::from_value(body).map_err(|e| RegistryError::BackendUnavailable(e.to_string()))
    }

    /// Fetch the highest published version for `id`.
    pub async fn get_latest(&self, id: &str) -> Result<(String, T), RegistryError> {
        let versions = self.storage.list_versions(self.kind, id).await?;
        let highest = versions
            .iter()
            .filter_map(|v| SemVer::parse(v).ok().map(|s| (s, v.clone())))
            .max_by_key(|(s, _)| *s)
            .ok_or_else(|| RegistryError::NotFound { kind: self.kind, id: id.to_string() })?;
        let value = self.get(id, &highest.1).await?;
        Ok((highest.1, value))
    }

    pub async fn list_versions(&self, id: &str) -> Result<Vec<String>, RegistryError> {
        let mut versions = self.storage.list_versions(self.kind, id).await?;
        versions.sort_by(super::semver::cmp_versions);
        Ok(versions)
    }

    pub async fn list_ids(&self) -> Result<Vec<String>, RegistryError> {
        self.storage.list_ids(self.kind).await
    }

    /// Flip `(id, version)` to published. From then on, `publish()` calls
    /// targeting the same triple fail with `ImmutableVersion` rather than
    /// `VersionExists`.
    pub async fn publish_version(&self, id: &str, version: &str) -> Result<(), RegistryError> {
        self.storage.mark_published(self.kind, id, version).await
    }

    pub async fn is_published(&self, id: &str, version: &str) -> Result<bool, RegistryError> {
        self.storage.is_published(self.kind, id, version).await
    }

    /// Versions are immutable once published; this only removes local
    /// bookkeeping in test/dev backends and is expected to be disabled
    /// (return `ImmutableVersion`) against production storage in a fuller
    /// deployment. Exposed here for test cleanup.
    pub async fn delete(&self, id: &str, version: &str) -> Result<(), RegistryError> {
        self.storage.delete(self.kind, id, version).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::storage::ObjectStoreStorage;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
    struct Dummy {
        value: i64,
    }

    #[tokio::test]
    async fn auto_increments_patch_version() {
        let storage: Arc<dyn RegistryStorage> = Arc::new(ObjectStoreStorage::new());
        let registry: Registry<Dummy> = Registry::new("workflow", storage);

        let v1 = registry.publish("wf1", None, &Dummy { value: 1 }).await.unwrap();
        assert_eq!(v1, "0.1.0");
        let v2 = registry.publish("wf1", None, &Dummy { value: 2 }).await.unwrap();
        assert_eq!(v2, "0.1.1");

        let (latest_version, latest) = registry.get_latest("wf1").await.unwrap();
        assert_eq!(latest_version, "0.1.1");
        assert_eq!(latest.value, 2);
    }

    #[tokio::test]
    async fn republishing_same_version_is_rejected() {
        let storage: Arc<dyn RegistryStorage> = Arc::new(ObjectStoreStorage::new());
        let registry: Registry<Dummy> = Registry::new("tool", storage);
        registry.publish("t1", Some("1.0.0"), &Dummy { value: 1 }).await.unwrap();
        let result = registry.publish("t1", Some("1.0.0"), &Dummy { value: 99 }).await;
        assert!(matches!(result, Err(RegistryError::VersionExists { .. })));
    }

    #[tokio::test]
    async fn publishing_a_version_makes_it_immutable() {
        let storage: Arc<dyn RegistryStorage> = Arc::new(ObjectStoreStorage::new());
        let registry: Registry<Dummy> = Registry::new("workflow", storage);
        registry.publish("wf1", Some("1.0.0"), &Dummy { value: 1 }).await.unwrap();
        assert!(!registry.is_published("wf1", "1.0.0").await.unwrap());

        registry.publish_version("wf1", "1.0.0").await.unwrap();
        assert!(registry.is_published("wf1", "1.0.0").await.unwrap());

        let result = registry.publish("wf1", Some("1.0.0"), &Dummy { value: 2 }).await;
        assert!(matches!(result, Err(RegistryError::ImmutableVersion { .. })));
    }

    #[tokio::test]
    async fn missing_entry_is_not_found() {
        let storage: Arc<dyn RegistryStorage> = Arc::new(ObjectStoreStorage::new());
        let registry: Registry<Dummy> = Registry::new("node", storage);
        let result = registry.get("nope", "1.0.0").await;
        assert!(matches!(result, Err(RegistryError::NotFound { .. })));
    }
}
