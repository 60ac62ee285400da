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
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::info;

use super::config::StorageConfig;
use super::error::{StorageError, StorageResult};
use super::naming::{resolve_unique_file_name, resolve_unique_folder_name, UploadContext};
use super::path::{join_logical, leaf_name, parent_and_leaf, sanitize};
use super::provider::{ByteStream, FileUpload, PathKind, StorageProvider, StoredItem};
use crate::archive::ArchiveEntry;

/// File store backed by a directory tree on the local filesystem.
///
/// Folders are real directories here; the virtual-folder semantics of the
/// blob backend fall out naturally from directory stat calls.
pub struct LocalStorageProvider {
    root: PathBuf,
    base_path: String,
}

impl LocalStorageProvider {
    /// Create a provider from configuration.
    ///
    /// # Errors
    ///
    /// Fails if the `path` option is missing, or if the uploads directory
    /// cannot be created or resolved.
    pub fn from_config(config: &StorageConfig) -> StorageResult<Self> {
        let path = config.get_option("path").ok_or_else(|| {
            StorageError::ConfigError("Local storage requires 'path' option".to_string())
        })?;
        Self::with_root(path)
    }

    /// Create a provider rooted at `root`, creating the directory if missing.
    pub fn with_root(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create uploads directory '{}': {}",
                root.display(),
                e
            ))
        })?;

        // Canonicalize so the escape check below compares resolved paths
        let canonical = root.canonicalize().map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to resolve uploads directory '{}': {}",
                root.display(),
                e
            ))
        })?;

        let base_path = canonical.to_string_lossy().to_string();
        info!("Initialized local storage provider root={}", base_path);

        Ok(Self {
            root: canonical,
            base_path,
        })
    }

    /// Resolve a sanitized logical path under the root.
    ///
    /// The sanitizer already guarantees a relative path, but the resolved
    /// absolute path is still checked against the root before use.
    fn resolve(&self, logical: &str) -> StorageResult<PathBuf> {
        let full = if logical.is_empty() {
            self.root.clone()
        } else {
            self.root.join(logical)
        };
        if !full.starts_with(&self.root) {
            return Err(StorageError::InvalidPath(logical.to_string()));
        }
        Ok(full)
    }

    /// Existence check used by the name resolver: any entry, file or
    /// directory, occupies the name.
    async fn entry_exists(&self, logical: String) -> StorageResult<bool> {
        let full = self.resolve(&logical)?;
        Ok(tokio::fs::metadata(&full).await.is_ok())
    }
}

fn modified_time(meta: &std::fs::Metadata) -> DateTime<Utc> {
    meta.modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now())
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |e| StorageError::from_io(path, e)
}

#[async_trait]
impl StorageProvider for LocalStorageProvider {
    fn base_path(&self) -> &str {
        &self.base_path
    }

    async fn classify(&self, path: &str) -> StorageResult<PathKind> {
        let logical = sanitize(path)?;
        let full = self.resolve(&logical)?;

        match tokio::fs::metadata(&full).await {
            Ok(meta) if meta.is_file() => Ok(PathKind::File),
            Ok(meta) if meta.is_dir() => Ok(PathKind::Folder),
            // Sockets, fifos and friends are not part of the store
            Ok(_) => Ok(PathKind::Missing),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(PathKind::Missing),
            Err(e) => Err(StorageError::from_io(&full, e)),
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

        let dir = self.resolve(&logical)?;
        let mut entries = tokio::fs::read_dir(&dir).await.map_err(io_err(&dir))?;
        let mut items = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(io_err(&dir))? {
            let name = entry.file_name().to_string_lossy().to_string();
            let meta = entry.metadata().await.map_err(io_err(&dir))?;
            let item_path = join_logical(&logical, &name);

            if meta.is_dir() {
                items.push(StoredItem::folder(item_path, modified_time(&meta)));
            } else if meta.is_file() {
                items.push(StoredItem::file(item_path, meta.len(), modified_time(&meta)));
            }
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

        // Root-level files land directly in the destination; nested files go
        // through the request's folder mapping so one batch never splits a
        // source folder across several suffixed destinations.
        let target_dir = if source_dir.is_empty() {
            base.clone()
        } else {
            let candidate = join_logical(&base, source_dir);
            ctx.map_folder(source_dir, || {
                resolve_unique_folder_name(&candidate, |name| self.entry_exists(name))
            })
            .await?
        };

        let dir_path = self.resolve(&target_dir)?;
        tokio::fs::create_dir_all(&dir_path)
            .await
            .map_err(io_err(&dir_path))?;

        let final_name = resolve_unique_file_name(file_name, |name| {
            self.entry_exists(join_logical(&target_dir, &name))
        })
        .await?;

        let final_path = join_logical(&target_dir, &final_name);
        let full = self.resolve(&final_path)?;
        let mut file = tokio::fs::File::create(&full).await.map_err(io_err(&full))?;

        let mut content = upload.content;
        let mut written: u64 = 0;
        while let Some(chunk) = content.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await.map_err(io_err(&full))?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(io_err(&full))?;

        info!("Uploaded file path={} size={}", final_path, written);
        Ok(StoredItem::file(final_path, written, Utc::now()))
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        let logical = sanitize(path)?;
        if logical.is_empty() {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        let full = self.resolve(&logical)?;

        match self.classify(&logical).await? {
            PathKind::File => {
                tokio::fs::remove_file(&full).await.map_err(io_err(&full))?;
                info!("Deleted file path={}", logical);
                Ok(())
            }
            PathKind::Folder => {
                tokio::fs::remove_dir_all(&full).await.map_err(io_err(&full))?;
                info!("Deleted directory path={}", logical);
                Ok(())
            }
            PathKind::Missing => Err(StorageError::NotFound(logical)),
        }
    }

    async fn raw_file_stream(&self, path: &str) -> StorageResult<(ByteStream, u64)> {
        let logical = sanitize(path)?;
        let full = self.resolve(&logical)?;

        let meta = tokio::fs::metadata(&full).await.map_err(io_err(&full))?;
        if !meta.is_file() {
            return Err(StorageError::NotFound(logical));
        }

        let file = tokio::fs::File::open(&full).await.map_err(io_err(&full))?;
        let stream = ReaderStream::new(file)
            .map(|res| res.map_err(StorageError::from))
            .boxed();
        Ok((stream, meta.len()))
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
                Ok(vec![ArchiveEntry::local_file(name, self.resolve(&logical)?)])
            }
            PathKind::Folder => {
                let mut entries = Vec::new();
                let mut pending = vec![(self.resolve(&logical)?, String::new())];

                while let Some((dir, rel)) = pending.pop() {
                    let mut read_dir = tokio::fs::read_dir(&dir).await.map_err(io_err(&dir))?;
                    while let Some(entry) = read_dir.next_entry().await.map_err(io_err(&dir))? {
                        let name = entry.file_name().to_string_lossy().to_string();
                        let child_rel = join_logical(&rel, &name);
                        let meta = entry.metadata().await.map_err(io_err(&dir))?;

                        if meta.is_dir() {
                            pending.push((entry.path(), child_rel));
                        } else if meta.is_file() {
                            entries.push(ArchiveEntry::local_file(
                                join_logical(alias, &child_rel),
                                entry.path(),
                            ));
                        }
                    }
                }

                Ok(entries)
            }
        }
    }
}

impl Debug for LocalStorageProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "LocalStorageProvider(root={})", self.base_path)
    }
}
