//! Storage backends for the versioned spec registry. `RegistryStorage` is
//! kept deliberately narrow — raw JSON blobs keyed by (kind, id, version) —
//! so swapping `LocalFileStorage` for `ObjectStoreStorage` never touches the
//! `Registry<T>` layer above it.

use super::error::RegistryError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::RwLock;

/// On-disk/in-memory envelope around a stored spec body. `published` starts
/// `false` on every `put` and is flipped exactly once by `mark_published`;
/// after that the `(kind, id, version)` triple is immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    #[serde(default)]
    published: bool,
    body: serde_json::Value,
}

#[async_trait]
pub trait RegistryStorage: Send + Sync {
    /// Persist `body` under (kind, id, version) as a new, unpublished draft.
    /// Returns `ImmutableVersion` if that triple already exists and is
    /// published, or `VersionExists` if it exists but is still a draft.
    async fn put(&self, kind: &str, id: &str, version: &str, body: serde_json::Value) -> Result<(), RegistryError>;

    async fn get(&self, kind: &str, id: &str, version: &str) -> Result<Option<serde_json::Value>, RegistryError>;

    /// Versions stored for (kind, id), in storage order (not necessarily sorted).
    async fn list_versions(&self, kind: &str, id: &str) -> Result<Vec<String>, RegistryError>;

    async fn list_ids(&self, kind: &str) -> Result<Vec<String>, RegistryError>;

    async fn delete(&self, kind: &str, id: &str, version: &str) -> Result<(), RegistryError>;

    /// Whether (kind, id, version) has been published. `false` for drafts
    /// and for versions that don't exist.
    async fn is_published(&self, kind: &str, id: &str, version: &str) -> Result<bool, RegistryError>;

    /// Flip the published flag, making the version immutable from then on.
    /// Returns `NotFound` if the version has not been saved yet.
    async fn mark_published(&self, kind: &str, id: &str, version: &str) -> Result<(), RegistryError>;
}

fn sanitize(segment: &str) -> String {
    segment
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
        .collect()
}

/// Filesystem-backed storage: `{root}/{kind}/{sanitized-id}/{version}.json`.
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn dir(&self, kind: &str, id: &str) -> PathBuf {
        self.root.join(sanitize(kind)).join(sanitize(id))
    }

    fn file(&self, kind: &str, id: &str, version: &str) -> PathBuf {
        self.dir(kind, id).join(format!("{}.json", sanitize(version)))
    }

    async fn read_entry(&self, path: &PathBuf) -> Result<Option<StoredEntry>, RegistryError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => {
                let entry = serde_json::from_slice(&bytes).map_err(|e| RegistryError::BackendUnavailable(e.to_string()))?;
                Ok(Some(entry))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(RegistryError::BackendUnavailable(e.to_string())),
        }
    }

    async fn write_entry(&self, path: &PathBuf, entry: &StoredEntry) -> Result<(), RegistryError> {
        let bytes = serde_json::to_vec_pretty(entry).map_err(|e| RegistryError::BackendUnavailable(e.to_string()))?;
        tokio::fs::write(path, bytes).await.map_err(|e| RegistryError::BackendUnavailable(e.to_string()))
    }
}

#[async_trait]
impl RegistryStorage for LocalFileStorage {
    async fn put(&self, kind: &str, id: &str, version: &str, body: serde_json::Value) -> Result<(), RegistryError> {
        let dir = self.dir(kind, id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| RegistryError::BackendUnavailable(e.to_string()))?;
        let path = self.file(kind, id, version);
        if let Some(existing) = self.read_entry(&path).await? {
            if existing.published {
                return Err(RegistryError::ImmutableVersion {
                    kind: leak_kind(kind),
                    id: id.to_string(),
                    version: version.to_string(),
                });
            }
            return Err(RegistryError::VersionExists {
                kind: leak_kind(kind),
                id: id.to_string(),
                version: version.to_string(),
            });
        }
        self.write_entry(&path, &StoredEntry { published: false, body }).await
    }

    async fn get(&self, kind: &str, id: &str, version: &str) -> Result<Option<serde_json::Value>, RegistryError> {
        let path = self.file(kind, id, version);
        Ok(self.read_entry(&path).await?.map(|entry| entry.body))
    }

    async fn is_published(&self, kind: &str, id: &str, version: &str) -> Result<bool, RegistryError> {
        let path = self.file(kind, id, version);
        Ok(self.read_entry(&path).await?.map(|entry| entry.published).unwrap_or(false))
    }

    async fn mark_published(&self, kind: &str, id: &str, version: &str) -> Result<(), RegistryError> {
        let path = self.file(kind, id, version);
        let mut entry = self.read_entry(&path).await?.ok_or_else(|| RegistryError::NotFound {
            kind: leak_kind(kind),
            id: id.to_string(),
        })?;
        entry.published = true;
        self.write_entry(&path, &entry).await
    }

    async fn list_versions(&self, kind: &str, id: &str) -> Result<Vec<String>, RegistryError> {
        let dir = self.dir(kind, id);
        let mut versions = Vec::new();
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(versions),
            Err(e) => return Err(RegistryError::BackendUnavailable(e.to_string())),
        };
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| RegistryError::BackendUnavailable(e.to_string()))?
        {
            if let Some(name) = entry.path().file_stem().and_then(|s| s.to_str()) {
                versions.push(name.to_string());
            }
        }
        Ok(versions)
    }

    async fn list_ids(&self, kind: &str) -> Result<Vec<String>, RegistryError> {
        let dir = self.root.join(sanitize(kind));
        let mut ids = Vec::new();
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
            Err(e) => return Err(RegistryError::BackendUnavailable(e.to_string())),
        };
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| RegistryError::BackendUnavailable(e.to_string()))?
        {
            if entry.path().is_dir() {
                if let Some(name) = entry.path().file_name().and_then(|s| s.to_str()) {
                    ids.push(name.to_string());
                }
            }
        }
        Ok(ids)
    }

    async fn delete(&self, kind: &str, id: &str, version: &str) -> Result<(), RegistryError> {
        let path = self.file(kind, id, version);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RegistryError::BackendUnavailable(e.to_string())),
        }
    }
}

/// In-process object-store simulation, modeled on the
/// `tools/{id}/versions/{version}/spec.json` key layout a real object-store
/// (S3-compatible) backend would use. Useful for tests and for embedding
/// the registry without a filesystem.
#[derive(Default)]
pub struct ObjectStoreStorage {
    objects: RwLock<BTreeMap<String, StoredEntry>>,
}

impl ObjectStoreStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(kind: &str, id: &str, version: &str) -> String {
        format!("{kind}/{id}/versions/{version}/spec.json")
    }

    fn prefix(kind: &str, id: &str) -> String {
        format!("{kind}/{id}/versions/")
    }
}

#[async_trait]
impl RegistryStorage for ObjectStoreStorage {
    async fn put(&self, kind: &str, id: &str, version: &str, body: serde_json::Value) -> Result<(), RegistryError> {
        let key = Self::key(kind, id, version);
        let mut objects = self.objects.write().await;
        if let Some(existing) = objects.get(&key) {
            if existing.published {
                return Err(RegistryError::ImmutableVersion {
                    kind: leak_kind(kind),
                    id: id.to_string(),
                    version: version.to_string(),
                });
            }
            return Err(RegistryError::VersionExists {
                kind: leak_kind(kind),
                id: id.to_string(),
                version: version.to_string(),
            });
        }
        objects.insert(key, StoredEntry { published: false, body });
        Ok(())
    }

    async fn get(&self, kind: &str, id: &str, version: &str) -> Result<Option<serde_json::Value>, RegistryError> {
        let key = Self::key(kind, id, version);
        Ok(self.objects.read().await.get(&key).map(|entry| entry.body.clone()))
    }

    async fn is_published(&self, kind: &str, id: &str, version: &str) -> Result<bool, RegistryError> {
        let key = Self::key(kind, id, version);
        Ok(self.objects.read().await.get(&key).map(|entry| entry.published).unwrap_or(false))
    }

    async fn mark_published(&self, kind: &str, id: &str, version: &str) -> Result<(), RegistryError> {
        let key = Self::key(kind, id, version);
        let mut objects = self.objects.write().await;
        let entry = objects.get_mut(&key).ok_or_else(|| RegistryError::NotFound {
            kind: leak_kind(kind),
            id: id.to_string(),
        })?;
        entry.published = true;
        Ok(())
    }

    async fn list_versions(&self, kind: &str, id: &str) -> Result<Vec<String>, RegistryError> {
        let prefix = Self::prefix(kind, id);
        let objects = self.objects.read().await;
        let mut versions = Vec::new();
        for key in objects.keys() {
            if let Some(rest) = key.strip_prefix(&prefix) {
                if let Some(version) = rest.strip_suffix("/spec.json") {
                    versions.push(version.to_string());
                }
            }
        }
        Ok(versions)
    }

    async fn list_ids(&self, kind: &str) -> Result<Vec<String>, RegistryError> {
        let prefix = format!("{kind}/");
        let objects = self.objects.read().await;
        let mut ids = std::collections::BTreeSet::new();
        for key in objects.keys() {
            if let Some(rest) = key.strip_prefix(&prefix) {
                if let Some(id) = rest.split('/').next() {
                    ids.insert(id.to_string());
                }
            }
        }
        Ok(ids.into_iter().collect())
    }

    async fn delete(&self, kind: &str, id: &str, version: &str) -> Result<(), RegistryError> {
        let key = Self::key(kind, id, version);
        self.objects.write().await.remove(&key);
        Ok(())
    }
}

fn leak_kind(kind: &str) -> &'static str {
    match kind {
        "workflow" => "workflow",
        "node" => "node",
        "edge" => "edge",
        "tool" => "tool",
        _ => "entity",
    }
}
