// Copyright 2025 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.
//
// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::BytesMut;
use chrono::Utc;
use futures::stream::{StreamExt, TryStreamExt};
use object_store::azure::MicrosoftAzureBuilder;
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, AttributeValue, Attributes, ObjectStore, PutOptions, PutPayload};
use tracing::info;

use super::config::StorageConfig;
use super::error::{StorageError, StorageResult};
use super::naming::{resolve_unique_file_name, resolve_unique_folder_name, UploadContext};
use super::path::{join_logical, leaf_name, parent_and_leaf, sanitize};
use super::provider::{ByteStream, FileUpload, PathKind, StorageProvider, StoredItem};
use crate::archive::ArchiveEntry;

/// File store backed by a flat blob key space.
///
/// There are no native directories: a path is a folder exactly when at least
/// one blob key lives under `path/`. Folder semantics (listing, downloads,
/// recursive deletes) are emulated over key prefixes.
pub struct BlobStorageProvider {
    store: Arc<dyn ObjectStore>,
    container: String,
}

impl BlobStorageProvider {
    /// Create a provider from configuration.
    ///
    /// Accepts either a `connection_string`
    /// (`AccountName=…;AccountKey=…;BlobEndpoint=…`) or discrete
    /// `account_name` / `access_key` / `sas_token` / service-principal
    /// options, plus the `container` name.
    ///
    /// # Errors
    ///
    /// Fails with `ConfigError` if the blob client cannot be built from the
    /// supplied options.
    pub fn from_config(config: &StorageConfig) -> StorageResult<Self> {
        let container = config
            .get_option("container")
            .cloned()
            .unwrap_or_else(|| "uploads".to_string());

        let mut builder = MicrosoftAzureBuilder::new().with_container_name(&container);

        for (key, value) in &config.options {
            match key.as_str() {
                "container" => {}
                "connection_string" => builder = apply_connection_string(builder, value),
                "account_name" => builder = builder.with_account(value),
                "access_key" | "account_key" => builder = builder.with_access_key(value),
                "tenant_id" => builder = builder.with_tenant_id(value),
                "client_id" => builder = builder.with_client_id(value),
                "client_secret" => builder = builder.with_client_secret(value),
                "endpoint" => builder = builder.with_endpoint(value.clone()),
                _ => {
                    info!("Unknown blob option: {}", key);
                }
            }
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(format!("Failed to create blob store: {}", e)))?;

        info!("Initialized blob storage provider container={}", container);
        Ok(Self::with_store(Arc::new(store), container))
    }

    /// Create a provider over an already-built object store.
    pub fn with_store(store: Arc<dyn ObjectStore>, container: impl Into<String>) -> Self {
        Self {
            store,
            container: container.into(),
        }
    }

    /// Existence check for file names: only an exact blob key counts.
    async fn blob_exists(&self, logical: String) -> StorageResult<bool> {
        let location = ObjectPath::from(logical.as_str());
        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Existence check for folder names: an exact blob or any key under the
    /// prefix occupies the name.
    async fn name_taken(&self, logical: String) -> StorageResult<bool> {
        Ok(self.classify(&logical).await? != PathKind::Missing)
    }
}

/// Apply `AccountName=…;AccountKey=…;BlobEndpoint=…` pairs to the builder.
///
/// Values may themselves contain `=` (base64 keys), so each pair splits only
/// on its first separator. Unknown keys are ignored.
fn apply_connection_string(
    mut builder: MicrosoftAzureBuilder,
    connection_string: &str,
) -> MicrosoftAzureBuilder {
    for pair in connection_string.split(';') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        match key.trim() {
            "AccountName" => builder = builder.with_account(value),
            "AccountKey" => builder = builder.with_access_key(value),
            "BlobEndpoint" => builder = builder.with_endpoint(value.to_string()),
            _ => {}
        }
    }
    builder
}

#[async_trait]
impl StorageProvider for BlobStorageProvider {
    fn base_path(&self) -> &str {
        &self.container
    }

    async fn classify(&self, path: &str) -> StorageResult<PathKind> {
        let logical = sanitize(path)?;
        if logical.is_empty() {
            return Ok(PathKind::Folder);
        }

        let location = ObjectPath::from(logical.as_str());
        match self.store.head(&location).await {
            Ok(_) => return Ok(PathKind::File),
            Err(object_store::Error::NotFound { .. }) => {}
            Err(e) => return Err(e.into()),
        }

        // A folder is emergent: it exists while at least one key sits under
        // the prefix.
        let mut keys = self.store.list(Some(&location));
        match keys.next().await {
            Some(Ok(_)) => Ok(PathKind::Folder),
            Some(Err(e)) => Err(e.into()),
            None => Ok(PathKind::Missing),
        }
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<StoredItem>> {
        let logical = sanitize(prefix)?;

        if !logical.is_empty() {
            match self.classify(&logical).await? {
                PathKind::Folder => {}
                PathKind::File => return Err(StorageError::InvalidPath(logical)),
                PathKind::Missing => return Err(StorageError::NotFound(logical)),
            }
        }

        let object_prefix = if logical.is_empty() {
            None
        } else {
            Some(ObjectPath::from(logical.as_str()))
        };
        let listing = self.store.list_with_delimiter(object_prefix.as_ref()).await?;

        let mut items = Vec::new();
        for meta in listing.objects {
            // A blob key equal to the prefix itself is not a child
            if meta.location.as_ref() == logical {
                continue;
            }
            items.push(StoredItem::file(
                meta.location.to_string(),
                meta.size,
                meta.last_modified,
            ));
        }
        for folder_prefix in listing.common_prefixes {
            // Virtual folders have no stored object to take a timestamp from
            items.push(StoredItem::folder(folder_prefix.to_string(), Utc::now()));
        }

        Ok(items)
    }

    async fn upload(
        &self,
        upload: FileUpload,
        ctx: &mut UploadContext,
    ) -> StorageResult<StoredItem> {
        let logical = sanitize(&upload.path)?;
        let (source_dir, file_name) = parent_and_leaf(&logical);
        if file_name.is_empty() {
            return Err(StorageError::InvalidPath(upload.path));
        }

        let base = match ctx.destination() {
            Some(dest) => sanitize(dest)?,
            None => String::new(),
        };

        // Same policy as the local backend: root-level files honor the
        // destination override, nested files go through the request's folder
        // mapping.
        let target_dir = if source_dir.is_empty() {
            base.clone()
        } else {
            let candidate = join_logical(&base, source_dir);
            ctx.map_folder(source_dir, || {
                resolve_unique_folder_name(&candidate, |name| self.name_taken(name))
            })
            .await?
        };

        let final_name = resolve_unique_file_name(file_name, |name| {
            self.blob_exists(join_logical(&target_dir, &name))
        })
        .await?;
        let final_path = join_logical(&target_dir, &final_name);

        // Blob put takes a complete payload; drain the stream first.
        let mut content = upload.content;
        let mut buf = BytesMut::with_capacity(upload.size_hint.unwrap_or(0) as usize);
        while let Some(chunk) = content.next().await {
            buf.extend_from_slice(&chunk?);
        }
        let data = buf.freeze();
        let size = data.len() as u64;

        let content_type = upload.content_type.clone().unwrap_or_else(|| {
            mime_guess::from_path(&final_path)
                .first_or_octet_stream()
                .to_string()
        });
        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, AttributeValue::from(content_type));

        let location = ObjectPath::from(final_path.as_str());
        self.store
            .put_opts(
                &location,
                PutPayload::from(data),
                PutOptions {
                    attributes,
                    ..Default::default()
                },
            )
            .await?;

        info!("Uploaded blob path={} size={}", final_path, size);
        Ok(StoredItem::file(final_path, size, Utc::now()))
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        let logical = sanitize(path)?;
        if logical.is_empty() {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        let location = ObjectPath::from(logical.as_str());

        match self.classify(&logical).await? {
            PathKind::File => {
                self.store.delete(&location).await?;
                info!("Deleted blob path={}", logical);
                Ok(())
            }
            PathKind::Folder => {
                // Not transactional: the first failure leaves earlier
                // deletions in place.
                let locations: Vec<ObjectPath> = self
                    .store
                    .list(Some(&location))
                    .map_ok(|meta| meta.location)
                    .try_collect()
                    .await?;
                let count = locations.len();
                for key in locations {
                    self.store.delete(&key).await?;
                }
                info!("Deleted prefix path={} blobs={}", logical, count);
                Ok(())
            }
            PathKind::Missing => Err(StorageError::NotFound(logical)),
        }
    }

    async fn raw_file_stream(&self, path: &str) -> StorageResult<(ByteStream, u64)> {
        let logical = sanitize(path)?;
        let location = ObjectPath::from(logical.as_str());

        let result = self.store.get(&location).await.map_err(|e| match e {
            object_store::Error::NotFound { .. } => StorageError::NotFound(logical.clone()),
            other => other.into(),
        })?;
        let size = result.meta.size;
        let stream = result
            .into_stream()
            .map(|res| res.map_err(StorageError::from))
            .boxed();
        Ok((stream, size))
    }

    async fn archive_entries(&self, path: &str, alias: &str) -> StorageResult<Vec<ArchiveEntry>> {
        let logical = sanitize(path)?;

        match self.classify(&logical).await? {
            PathKind::Missing => Err(StorageError::NotFound(logical)),
            PathKind::File => {
                let name = if alias.is_empty() {
                    leaf_name(&logical).to_string()
                } else {
                    alias.to_string()
                };
                Ok(vec![ArchiveEntry::object(
                    name,
                    Arc::clone(&self.store),
                    ObjectPath::from(logical.as_str()),
                )])
            }
            PathKind::Folder => {
                let prefix = ObjectPath::from(logical.as_str());
                let metas: Vec<_> = self.store.list(Some(&prefix)).try_collect().await?;

                let strip = format!("{}/", logical);
                let mut entries = Vec::with_capacity(metas.len());
                for meta in metas {
                    let full = meta.location.to_string();
                    let relative = full.strip_prefix(&strip).unwrap_or(&full).to_string();
                    entries.push(ArchiveEntry::object(
                        join_logical(alias, &relative),
                        Arc::clone(&self.store),
                        meta.location,
                    ));
                }
                Ok(entries)
            }
        }
    }
}

impl Debug for BlobStorageProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "BlobStorageProvider(container={})", self.container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::provider::Download;
    use bytes::Bytes;
    use object_store::memory::InMemory;
    use std::collections::HashSet;

    fn provider() -> BlobStorageProvider {
        BlobStorageProvider::with_store(Arc::new(InMemory::new()), "uploads")
    }

    async fn seed(provider: &BlobStorageProvider, key: &str, data: &[u8]) {
        provider
            .store
            .put(&ObjectPath::from(key), Bytes::copy_from_slice(data).into())
            .await
            .unwrap();
    }

    async fn collect(mut stream: ByteStream) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_classify_truth_table() {
        let provider = provider();
        seed(&provider, "docs/a.txt", b"a").await;

        // Exact key match wins
        assert_eq!(provider.classify("docs/a.txt").await.unwrap(), PathKind::File);
        // No exact key, but a key under the prefix
        assert_eq!(provider.classify("docs").await.unwrap(), PathKind::Folder);
        // Neither
        assert_eq!(provider.classify("ghost").await.unwrap(), PathKind::Missing);
        // Sibling key sharing a string prefix is not a folder match
        assert_eq!(provider.classify("doc").await.unwrap(), PathKind::Missing);
    }

    #[tokio::test]
    async fn test_upload_and_download_round_trip() {
        let provider = provider();
        let mut ctx = UploadContext::new();

        let item = provider
            .upload(FileUpload::from_bytes("hello.txt", "blob bytes".as_bytes().to_vec()), &mut ctx)
            .await
            .unwrap();
        assert_eq!(item.path, "hello.txt");
        assert_eq!(item.size, 10);

        match provider.download("hello.txt").await.unwrap() {
            Download::File { stream, size, .. } => {
                assert_eq!(size, 10);
                assert_eq!(collect(stream).await, b"blob bytes");
            }
            other => panic!("expected file download, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_upload_collision_renames_blob() {
        let provider = provider();
        seed(&provider, "report.txt", b"old").await;
        seed(&provider, "report(1).txt", b"older").await;

        let mut ctx = UploadContext::new();
        let item = provider
            .upload(FileUpload::from_bytes("report.txt", "new".as_bytes().to_vec()), &mut ctx)
            .await
            .unwrap();
        assert_eq!(item.path, "report(2).txt");
    }

    #[tokio::test]
    async fn test_upload_folder_mapping_against_virtual_folder() {
        let provider = provider();
        // "docs" exists only as a key prefix
        seed(&provider, "docs/old.txt", b"old").await;

        let mut ctx = UploadContext::new();
        let a = provider
            .upload(FileUpload::from_bytes("docs/a.txt", "a".as_bytes().to_vec()), &mut ctx)
            .await
            .unwrap();
        let b = provider
            .upload(FileUpload::from_bytes("docs/b.txt", "b".as_bytes().to_vec()), &mut ctx)
            .await
            .unwrap();

        assert_eq!(a.path, "docs(1)/a.txt");
        assert_eq!(b.path, "docs(1)/b.txt");
    }

    #[tokio::test]
    async fn test_upload_honors_destination_override_for_root_files() {
        let provider = provider();
        let mut ctx = UploadContext::with_destination("inbox");

        let item = provider
            .upload(FileUpload::from_bytes("a.txt", "x".as_bytes().to_vec()), &mut ctx)
            .await
            .unwrap();
        assert_eq!(item.path, "inbox/a.txt");
    }

    #[tokio::test]
    async fn test_list_one_level_with_virtual_folders() {
        let provider = provider();
        seed(&provider, "top.txt", b"t").await;
        seed(&provider, "docs/inner.txt", b"i").await;
        seed(&provider, "docs/nested/deep.txt", b"d").await;

        let root: HashSet<String> = provider
            .list("")
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.path)
            .collect();
        assert_eq!(root, HashSet::from(["top.txt".to_string(), "docs".to_string()]));

        let docs = provider.list("docs").await.unwrap();
        let paths: HashSet<String> = docs.iter().map(|i| i.path.clone()).collect();
        assert_eq!(
            paths,
            HashSet::from(["docs/inner.txt".to_string(), "docs/nested".to_string()])
        );

        let folder = docs.iter().find(|i| i.is_folder).unwrap();
        assert_eq!(folder.name, "nested");
        assert_eq!(folder.kind, "folder");
        assert_eq!(folder.size, 0);
    }

    #[tokio::test]
    async fn test_list_missing_prefix_is_not_found() {
        let provider = provider();
        assert!(matches!(
            provider.list("ghost").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_file_and_prefix() {
        let provider = provider();
        seed(&provider, "docs/a.txt", b"a").await;
        seed(&provider, "docs/sub/b.txt", b"b").await;
        seed(&provider, "keep.txt", b"k").await;

        provider.delete("docs").await.unwrap();
        assert_eq!(provider.classify("docs").await.unwrap(), PathKind::Missing);
        assert_eq!(provider.classify("keep.txt").await.unwrap(), PathKind::File);

        provider.delete("keep.txt").await.unwrap();
        assert_eq!(provider.classify("keep.txt").await.unwrap(), PathKind::Missing);
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let provider = provider();
        assert!(matches!(
            provider.delete("ghost").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_folder_archive_entries_relative_names() {
        let provider = provider();
        seed(&provider, "docs/a.txt", b"a").await;
        seed(&provider, "docs/sub/b.txt", b"b").await;

        let entries = provider.archive_entries("docs", "").await.unwrap();
        let names: HashSet<String> = entries.iter().map(|e| e.name.clone()).collect();
        assert_eq!(
            names,
            HashSet::from(["a.txt".to_string(), "sub/b.txt".to_string()])
        );

        let aliased = provider.archive_entries("docs", "docs").await.unwrap();
        let names: HashSet<String> = aliased.iter().map(|e| e.name.clone()).collect();
        assert_eq!(
            names,
            HashSet::from(["docs/a.txt".to_string(), "docs/sub/b.txt".to_string()])
        );
    }

    #[tokio::test]
    async fn test_folder_download_is_archive() {
        let provider = provider();
        seed(&provider, "docs/a.txt", b"a").await;

        match provider.download("docs").await.unwrap() {
            Download::Archive { stream, file_name } => {
                assert_eq!(file_name, "docs.zip");
                let data = collect(stream).await;
                assert_eq!(&data[..4], b"PK\x03\x04");
            }
            other => panic!("expected archive download, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_as_buffer_file() {
        let provider = provider();
        seed(&provider, "a.txt", b"buffered").await;
        let buf = provider.get_as_buffer("a.txt").await.unwrap();
        assert_eq!(&buf[..], b"buffered");
    }

    #[tokio::test]
    async fn test_download_missing_is_not_found() {
        let provider = provider();
        assert!(matches!(
            provider.download("ghost").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_connection_string_parsing_keeps_base64_padding() {
        // AccountKey values end in '='; the parse must split on the first
        // separator only. Building the store validates the key format.
        let config = StorageConfig::blob()
            .with_option("container", "uploads")
            .with_option(
                "connection_string",
                "AccountName=devaccount;AccountKey=ZGV2a2V5cGFkZGluZw==;",
            );
        let provider = BlobStorageProvider::from_config(&config).unwrap();
        assert_eq!(provider.base_path(), "uploads");
    }
}
