use bytes::Bytes;
use cloud::{ArtifactRef, BucketProvider, Notices, ServiceResult};
use futures::TryStreamExt;
use object_store::ObjectStore;
use object_store::path::Path;
use std::sync::Arc;

/// Documents and images stored in one bucket, optionally under a prefix.
#[derive(Clone)]
pub struct ArtifactCatalog {
    bucket: String,
    prefix: Option<Path>,
    store: Arc<dyn ObjectStore>,
}

impl ArtifactCatalog {
    pub fn new(bucket: impl Into<String>, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: None,
            store,
        }
    }

    pub fn open(buckets: &dyn BucketProvider, bucket: &str) -> ServiceResult<Self> {
        Ok(Self::new(bucket, buckets.open(bucket)?))
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        let prefix = prefix.trim_matches('/');
        self.prefix = (!prefix.is_empty()).then(|| Path::from(prefix));
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn artifact(&self, key: &str) -> ArtifactRef {
        ArtifactRef::new(self.bucket.clone(), key)
    }

    /// Keys under the prefix. Never fails: an unreachable bucket is reported
    /// and yields an empty list.
    pub async fn list_keys(&self, notices: &mut Notices) -> Vec<String> {
        let listing: Result<Vec<_>, _> = self.store.list(self.prefix.as_ref()).try_collect().await;

        match listing {
            Ok(objects) => {
                let mut keys: Vec<String> =
                    objects.into_iter().map(|meta| meta.location.to_string()).collect();
                keys.sort();
                tracing::debug!(bucket = %self.bucket, count = keys.len(), "Listed artifacts");
                keys
            }
            Err(e) => {
                notices.failure("An error occurred while listing files", e);
                Vec::new()
            }
        }
    }

    /// Store `bytes` under `object_name`, or under `file_name` when none is
    /// given. Returns the stored key.
    pub async fn upload(
        &self,
        bytes: Bytes,
        file_name: &str,
        object_name: Option<&str>,
        notices: &mut Notices,
    ) -> Option<String> {
        let key = object_name.unwrap_or(file_name);
        let location = match self.location(key) {
            Ok(location) => location,
            Err(e) => {
                notices.failure("An error occurred while uploading", e);
                return None;
            }
        };

        let size = bytes.len();
        match self.store.put(&location, bytes.into()).await {
            Ok(_) => {
                let stored = location.to_string();
                tracing::info!(bucket = %self.bucket, key = %stored, size, "Uploaded artifact");
                notices.success(format!(
                    "File uploaded successfully to {}/{}",
                    self.bucket, stored
                ));
                Some(stored)
            }
            Err(e) => {
                notices.failure("An error occurred while uploading", e);
                None
            }
        }
    }

    /// Fetch an object as UTF-8 text
    pub async fn load_text(&self, key: &str, notices: &mut Notices) -> Option<String> {
        let fetched = async {
            let location = self.location(key)?;
            let bytes = self.store.get(&location).await?.bytes().await?;
            Ok::<_, object_store::Error>(bytes)
        }
        .await;

        let bytes = match fetched {
            Ok(bytes) => bytes,
            Err(e) => {
                notices.failure("Failed to load data from storage", e);
                return None;
            }
        };

        match String::from_utf8(bytes.to_vec()) {
            Ok(text) => Some(text),
            Err(e) => {
                notices.failure("Failed to load data from storage", e);
                None
            }
        }
    }

    fn location(&self, key: &str) -> Result<Path, object_store::Error> {
        let path = Path::parse(key.trim_matches('/')).map_err(object_store::Error::from)?;
        if path.as_ref().is_empty() {
            return Err(object_store::Error::Generic {
                store: "catalog",
                source: "object key is empty".into(),
            });
        }
        Ok(match &self.prefix {
            Some(prefix) if !path.prefix_matches(prefix) => {
                prefix.parts().chain(path.parts()).collect()
            }
            _ => path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloud::{CloudConfig, S3Buckets, StorageBackend, StorageConfig};
    use object_store::memory::InMemory;

    fn catalog() -> ArtifactCatalog {
        ArtifactCatalog::new("underwriting-documents", Arc::new(InMemory::new()))
    }

    #[tokio::test]
    async fn test_empty_bucket_lists_nothing() {
        let mut notices = Notices::new();
        let keys = catalog().list_keys(&mut notices).await;

        assert!(keys.is_empty());
        assert!(notices.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_bucket_lists_nothing() {
        let buckets = S3Buckets::new(CloudConfig {
            storage: StorageConfig {
                backend: StorageBackend::S3,
                endpoint: Some("http://127.0.0.1:9".to_string()),
                access_key_id: Some("test".to_string()),
                secret_access_key: Some("test".to_string()),
                allow_http: true,
            },
            ..CloudConfig::default()
        });
        let catalog = ArtifactCatalog::open(&buckets, "docs").unwrap();
        let mut notices = Notices::new();

        let keys = catalog.list_keys(&mut notices).await;

        assert_eq!(keys, Vec::<String>::new());
        assert!(notices.has_errors());
        let message = &notices.iter().next().unwrap().message;
        assert!(message.starts_with("An error occurred while listing files"));
        assert!(!message.contains("max_retries: 10"));
    }

    #[tokio::test]
    async fn test_upload_defaults_to_file_name() {
        let catalog = catalog();
        let mut notices = Notices::new();

        let key = catalog
            .upload(Bytes::from_static(b"jpeg"), "license.jpg", None, &mut notices)
            .await;

        assert_eq!(key.as_deref(), Some("license.jpg"));
        assert!(!notices.has_errors());
        assert_eq!(
            notices.iter().next().unwrap().message,
            "File uploaded successfully to underwriting-documents/license.jpg"
        );
        assert_eq!(catalog.list_keys(&mut notices).await, vec!["license.jpg"]);
    }

    #[tokio::test]
    async fn test_upload_prefers_object_name() {
        let catalog = catalog();
        let mut notices = Notices::new();

        let key = catalog
            .upload(Bytes::from_static(b"png"), "scan.png", Some("renamed.png"), &mut notices)
            .await;

        assert_eq!(key.as_deref(), Some("renamed.png"));
    }

    #[tokio::test]
    async fn test_upload_rejects_empty_name() {
        let mut notices = Notices::new();
        let key = catalog()
            .upload(Bytes::from_static(b"x"), "", None, &mut notices)
            .await;

        assert!(key.is_none());
        assert!(notices.has_errors());
    }

    #[tokio::test]
    async fn test_prefix_scopes_listing_and_upload() {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        let root = ArtifactCatalog::new("docs", store.clone());
        let scoped = ArtifactCatalog::new("docs", store).with_prefix("licenses/");
        let mut notices = Notices::new();

        root.upload(Bytes::from_static(b"a"), "other.txt", None, &mut notices).await;
        let key = scoped
            .upload(Bytes::from_static(b"b"), "a.jpg", None, &mut notices)
            .await;

        assert_eq!(key.as_deref(), Some("licenses/a.jpg"));
        assert_eq!(scoped.list_keys(&mut notices).await, vec!["licenses/a.jpg"]);
    }

    #[tokio::test]
    async fn test_load_text() {
        let catalog = catalog();
        let mut notices = Notices::new();
        catalog
            .upload(Bytes::from_static(b"row 1\nrow 2"), "data.txt", None, &mut notices)
            .await;

        let text = catalog.load_text("data.txt", &mut notices).await;
        assert_eq!(text.as_deref(), Some("row 1\nrow 2"));

        let missing = catalog.load_text("missing.txt", &mut notices).await;
        assert!(missing.is_none());
        assert!(notices.has_errors());
    }

    #[tokio::test]
    async fn test_load_text_rejects_binary() {
        let catalog = catalog();
        let mut notices = Notices::new();
        catalog
            .upload(Bytes::from_static(&[0xff, 0xfe, 0x00]), "blob.bin", None, &mut notices)
            .await;

        assert!(catalog.load_text("blob.bin", &mut notices).await.is_none());
        assert!(notices.has_errors());
    }
}
