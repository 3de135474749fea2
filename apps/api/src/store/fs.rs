//! Filesystem storage backend.
//!
//! Layout: `<root>/<job_slug>/<doc_type>/v<version>.json`, one pretty-printed
//! JSON record per version. Writes go to a temp file in the same directory and
//! are renamed into place, so a crash mid-write never leaves a torn record.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::warn;
use uuid::Uuid;

use crate::models::document::{DocumentKey, DocumentVersion};
use crate::store::{StorageBackend, StorageError};

pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn key_dir(&self, key: &DocumentKey) -> Result<PathBuf, StorageError> {
        let slug = Path::new(&key.job_slug);
        let single_normal_component = {
            let mut components = slug.components();
            matches!(
                (components.next(), components.next()),
                (Some(Component::Normal(_)), None)
            )
        };
        if !single_normal_component {
            return Err(StorageError::InvalidKey(key.job_slug.clone()));
        }
        Ok(self.root.join(slug).join(key.doc_type.as_str()))
    }

    /// Lists `(version, path)` for every record file under the key. Missing dir → empty.
    async fn version_files(&self, dir: &Path) -> Result<Vec<(u32, PathBuf)>, StorageError> {
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::ReadError(format!("{}: {e}", dir.display()))),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::ReadError(format!("{}: {e}", dir.display())))?
        {
            let path = entry.path();
            if let Some(version) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(parse_version_file_name)
            {
                files.push((version, path));
            }
        }
        Ok(files)
    }
}

fn version_file_name(version: u32) -> String {
    format!("v{version}.json")
}

fn parse_version_file_name(name: &str) -> Option<u32> {
    name.strip_prefix('v')?.strip_suffix(".json")?.parse().ok()
}

#[async_trait]
impl StorageBackend for FsStorage {
    async fn put(&self, record: &DocumentVersion) -> Result<(), StorageError> {
        let dir = self.key_dir(&record.key())?;
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| StorageError::WriteError(format!("create dir {}: {e}", dir.display())))?;

        let contents = serde_json::to_string_pretty(record)
            .map_err(|e| StorageError::SerializeError(e.to_string()))?;

        let path = dir.join(version_file_name(record.version));
        // Unique temp name: concurrent writers to one version must not share a temp file.
        let tmp_path = dir.join(format!(".v{}.{}.tmp", record.version, Uuid::new_v4()));

        fs::write(&tmp_path, contents)
            .await
            .map_err(|e| StorageError::WriteError(format!("{}: {e}", tmp_path.display())))?;
        if let Err(e) = fs::rename(&tmp_path, &path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::WriteError(format!("{}: {e}", path.display())));
        }
        Ok(())
    }

    async fn fetch_all(&self, key: &DocumentKey) -> Result<Vec<DocumentVersion>, StorageError> {
        let dir = self.key_dir(key)?;
        let mut records = Vec::new();

        for (version, path) in self.version_files(&dir).await? {
            let contents = fs::read_to_string(&path)
                .await
                .map_err(|e| StorageError::ReadError(format!("{}: {e}", path.display())))?;

            // A corrupt file costs one version, not the whole history.
            match serde_json::from_str::<DocumentVersion>(&contents) {
                Ok(record) if record.version == version => records.push(record),
                Ok(record) => warn!(
                    "Skipping {}: file name says v{version} but record says v{}",
                    path.display(),
                    record.version
                ),
                Err(e) => warn!("Skipping corrupt record {}: {e}", path.display()),
            }
        }

        Ok(records)
    }

    async fn delete_after(&self, key: &DocumentKey, version: u32) -> Result<usize, StorageError> {
        let dir = self.key_dir(key)?;
        let mut deleted = 0;

        for (v, path) in self.version_files(&dir).await? {
            if v <= version {
                continue;
            }
            fs::remove_file(&path)
                .await
                .map_err(|e| StorageError::WriteError(format!("{}: {e}", path.display())))?;
            deleted += 1;
        }

        Ok(deleted)
    }

    // Check-then-rename is not atomic across processes; in-process writers are
    // serialized per key by the version manager.
    async fn set_embedding(
        &self,
        key: &DocumentKey,
        version: u32,
        content_hash: &str,
        embedding: &[f32],
    ) -> Result<bool, StorageError> {
        let path = self.key_dir(key)?.join(version_file_name(version));
        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(StorageError::ReadError(format!("{}: {e}", path.display()))),
        };

        let mut record: DocumentVersion = match serde_json::from_str(&contents) {
            Ok(record) => record,
            Err(e) => {
                warn!("Not backfilling corrupt record {}: {e}", path.display());
                return Ok(false);
            }
        };
        if record.version != version || record.content_hash != content_hash {
            return Ok(false);
        }

        record.embedding = embedding.to_vec();
        self.put(&record).await?;
        Ok(true)
    }
}
