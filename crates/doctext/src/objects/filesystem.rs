use std::collections::HashMap;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use super::ObjectStore;
use crate::error::ObjectStoreError;
use crate::model::ObjectRef;

const METADATA_DIR: &str = ".metadata";

/// Object store laid out on a local directory.
///
/// Content lives at `<root>/<bucket>/<key>`; metadata at
/// `<root>/.metadata/<bucket>/<key>.json`.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn content_path(&self, object: &ObjectRef) -> Result<PathBuf, ObjectStoreError> {
        let bucket = validate_segment(&object.bucket, "bucket")?;
        let key = validate_key(&object.key)?;
        Ok(self.root.join(bucket).join(key))
    }

    fn metadata_path(&self, object: &ObjectRef) -> Result<PathBuf, ObjectStoreError> {
        let bucket = validate_segment(&object.bucket, "bucket")?;
        let key = validate_key(&object.key)?;
        let mut path = self.root.join(METADATA_DIR).join(bucket).join(key);
        let mut name = path.file_name().unwrap_or_default().to_os_string();
        name.push(".json");
        path.set_file_name(name);
        Ok(path)
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn head_metadata(
        &self,
        object: &ObjectRef,
    ) -> Result<HashMap<String, String>, ObjectStoreError> {
        let content_path = self.content_path(object)?;
        if !content_path.is_file() {
            return Err(ObjectStoreError::NotFound(object.clone()));
        }

        let metadata_path = self.metadata_path(object)?;
        let raw = match std::fs::read(&metadata_path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => {
                return Err(ObjectStoreError::Read {
                    path: metadata_path,
                    source: e,
                })
            }
        };

        serde_json::from_slice(&raw).map_err(|e| ObjectStoreError::Metadata {
            object: object.clone(),
            source: e,
        })
    }

    async fn download(&self, object: &ObjectRef) -> Result<Vec<u8>, ObjectStoreError> {
        let path = self.content_path(object)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ObjectStoreError::NotFound(object.clone()))
            }
            Err(e) => Err(ObjectStoreError::Read { path, source: e }),
        }
    }

    async fn put(
        &self,
        object: &ObjectRef,
        content: &[u8],
        metadata: &HashMap<String, String>,
    ) -> Result<(), ObjectStoreError> {
        let normalized: HashMap<String, String> = metadata
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.clone()))
            .collect();
        let metadata_json = serde_json::to_vec_pretty(&normalized).map_err(|e| {
            ObjectStoreError::Metadata {
                object: object.clone(),
                source: e,
            }
        })?;

        // Metadata first so a reader never sees content without its identifier.
        write_atomic(&self.metadata_path(object)?, &metadata_json)?;
        write_atomic(&self.content_path(object)?, content)?;

        tracing::debug!(object = %object, bytes = content.len(), "Stored object");
        Ok(())
    }
}

fn validate_segment<'a>(segment: &'a str, what: &str) -> Result<&'a str, ObjectStoreError> {
    if segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment == METADATA_DIR
        || segment.contains(['/', '\\'])
    {
        return Err(ObjectStoreError::InvalidKey {
            key: segment.to_string(),
            reason: format!("invalid {} name", what),
        });
    }
    Ok(segment)
}

fn validate_key(key: &str) -> Result<&Path, ObjectStoreError> {
    let invalid = |reason: &str| ObjectStoreError::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    };

    if key.is_empty() {
        return Err(invalid("key is empty"));
    }
    if key.split('/').any(|s| s.is_empty()) {
        return Err(invalid("key has an empty path segment"));
    }

    let path = Path::new(key);
    for component in path.components() {
        match component {
            Component::Normal(_) => {}
            Component::ParentDir => return Err(invalid("key escapes the bucket")),
            _ => return Err(invalid("key must be a relative path")),
        }
    }
    Ok(path)
}

/// Writes `content` to a sibling temp file, then renames it over `path`.
fn write_atomic(path: &Path, content: &[u8]) -> Result<(), ObjectStoreError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| ObjectStoreError::Write {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let temp_path = dir.join(format!(".tmp-{}", uuid::Uuid::new_v4()));
    let write_err = |e| ObjectStoreError::Write {
        path: path.to_path_buf(),
        source: e,
    };

    let result = std::fs::File::create(&temp_path)
        .and_then(|mut file| {
            file.write_all(content)?;
            file.sync_all()
        })
        .and_then(|_| std::fs::rename(&temp_path, path));

    if let Err(e) = result {
        let _ = std::fs::remove_file(&temp_path);
        return Err(write_err(e));
    }
    Ok(())
}
