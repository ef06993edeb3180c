//! Object storage collaborator: metadata lookup and content download.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::ObjectStoreError;
use crate::model::ObjectRef;

pub mod filesystem;

pub use filesystem::FsObjectStore;

/// Metadata key holding the object's MIME type.
pub const CONTENT_TYPE_KEY: &str = "content-type";

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// User metadata attached to the object. Keys are lower-case.
    async fn head_metadata(
        &self,
        object: &ObjectRef,
    ) -> Result<HashMap<String, String>, ObjectStoreError>;

    async fn download(&self, object: &ObjectRef) -> Result<Vec<u8>, ObjectStoreError>;

    /// Stores `content` together with its metadata, replacing any previous object.
    async fn put(
        &self,
        object: &ObjectRef,
        content: &[u8],
        metadata: &HashMap<String, String>,
    ) -> Result<(), ObjectStoreError>;
}
