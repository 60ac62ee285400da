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

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::io::Cursor;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use serde::Serialize;

use super::error::{StorageError, StorageResult};
use super::naming::{split_file_name, UploadContext};
use super::path::{leaf_name, sanitize};
use crate::archive::{write_zip, zip_stream, ArchiveEntry};

/// A stream of content chunks flowing to or from a backend.
pub type ByteStream = BoxStream<'static, StorageResult<Bytes>>;

/// One file or virtual folder as exposed to callers.
///
/// Folders are derived, never stored: on the blob backend a folder exists
/// exactly while at least one key lives under its prefix. Within one listing
/// response `path` values are unique, and a folder's `path` plus `/` is a
/// prefix of every descendant's `path`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredItem {
    /// Leaf display name
    pub name: String,

    /// Full logical path relative to the store root, forward-slash separated
    pub path: String,

    /// Whether this entry is a (virtual) folder
    pub is_folder: bool,

    /// Byte length; 0 for folders
    pub size: u64,

    /// Classification derived from the file extension, or `"folder"`
    #[serde(rename = "type")]
    pub kind: String,

    /// Backend modification time; synthesized as "now" for virtual folders
    pub modified: DateTime<Utc>,
}

impl StoredItem {
    /// Build a file entry from its logical path.
    pub fn file(path: impl Into<String>, size: u64, modified: DateTime<Utc>) -> Self {
        let path = path.into();
        let name = leaf_name(&path).to_string();
        let kind = kind_from_name(&name);
        Self {
            name,
            path,
            is_folder: false,
            size,
            kind,
            modified,
        }
    }

    /// Build a virtual folder entry from its logical path.
    pub fn folder(path: impl Into<String>, modified: DateTime<Utc>) -> Self {
        let path = path.into();
        let name = leaf_name(&path).to_string();
        Self {
            name,
            path,
            is_folder: true,
            size: 0,
            kind: "folder".to_string(),
            modified,
        }
    }
}

/// What a logical path denotes in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// An object with exactly this path exists
    File,
    /// No exact object, but descendants exist under `path/`
    Folder,
    /// Neither an object nor a prefix
    Missing,
}

/// The result of a download request.
pub enum Download {
    /// Raw file content with its inferred content type
    File {
        stream: ByteStream,
        content_type: String,
        size: u64,
    },
    /// A zip of a folder (or batch), with the suggested attachment name
    Archive { stream: ByteStream, file_name: String },
}

impl Debug for Download {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::File {
                content_type, size, ..
            } => write!(f, "Download::File(type={}, size={})", content_type, size),
            Self::Archive { file_name, .. } => write!(f, "Download::Archive({})", file_name),
        }
    }
}

/// One file of an upload request.
pub struct FileUpload {
    /// Desired path relative to the store root (or to the request's
    /// destination override), as supplied by the client
    pub path: String,

    /// File content, consumed once
    pub content: ByteStream,

    /// Client-declared size, when known
    pub size_hint: Option<u64>,

    /// Client-declared content type, when known
    pub content_type: Option<String>,
}

impl FileUpload {
    /// Build an upload from in-memory bytes.
    pub fn from_bytes(path: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let size = bytes.len() as u64;
        Self {
            path: path.into(),
            content: stream::once(std::future::ready(Ok(bytes))).boxed(),
            size_hint: Some(size),
            content_type: None,
        }
    }

    /// Set the client-declared content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Generic trait for file store backends.
///
/// Both implementations (local filesystem, cloud blob) satisfy the same
/// contract; `download` and `get_as_buffer` are provided once on top of the
/// backend primitives so the classification branching is written in a single
/// place. No operation retries internally: the first I/O error from the
/// medium propagates typed as [`StorageError`].
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Get the base path (local root directory or blob container) for this
    /// storage provider.
    fn base_path(&self) -> &str;

    /// Determine whether `path` denotes a file, a folder, or nothing.
    ///
    /// # Errors
    ///
    /// Fails on medium-level errors other than "does not exist"; ambiguity is
    /// reported as `Missing`, never silently resolved.
    async fn classify(&self, path: &str) -> StorageResult<PathKind>;

    /// List the direct children of `prefix` (one level deep).
    ///
    /// Nested descendants are represented by a single folder entry, not
    /// expanded. Ordering is not guaranteed; sorting is a caller concern.
    ///
    /// # Errors
    ///
    /// Fails with `NotFound` when a non-empty prefix denotes nothing, or on
    /// medium-level listing errors.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<StoredItem>>;

    /// Write one file, resolving a collision-free final path first.
    ///
    /// The desired path is sanitized, its folder mapped through the
    /// request-scoped `ctx` (first-seen wins within a request), and the leaf
    /// name suffixed `name(1).ext`-style until free. Missing intermediate
    /// structure is created (directories locally; implicit key prefixes on
    /// blob).
    ///
    /// # Errors
    ///
    /// Fails with `InvalidPath` when the sanitized path has no leaf name, or
    /// on medium-level write errors.
    async fn upload(
        &self,
        upload: FileUpload,
        ctx: &mut UploadContext,
    ) -> StorageResult<StoredItem>;

    /// Remove a file, or everything under a folder prefix.
    ///
    /// Folder deletion is not transactional: a failure mid-way leaves earlier
    /// removals in place and surfaces the first error without rollback.
    ///
    /// # Errors
    ///
    /// Fails with `NotFound` when the path denotes nothing.
    async fn delete(&self, path: &str) -> StorageResult<()>;

    /// Backend primitive: open a raw content stream for a known file path,
    /// returning the stream and the file's byte length.
    async fn raw_file_stream(&self, path: &str) -> StorageResult<(ByteStream, u64)>;

    /// Backend primitive: enumerate archive entries for `path`.
    ///
    /// A file yields one entry; a folder yields one entry per descendant,
    /// named relative to the folder. A non-empty `alias` is prepended to every
    /// entry name so batch archives preserve each folder as a subdirectory.
    async fn archive_entries(&self, path: &str, alias: &str) -> StorageResult<Vec<ArchiveEntry>>;

    /// Download a file as a raw stream, or a folder as a streaming zip.
    ///
    /// # Errors
    ///
    /// Fails with `NotFound` for missing paths and `InvalidPath` for the
    /// empty path. Archive assembly errors surface through the returned
    /// stream, and a partially-written archive is not usable.
    async fn download(&self, path: &str) -> StorageResult<Download> {
        let logical = sanitize(path)?;
        if logical.is_empty() {
            return Err(StorageError::InvalidPath(path.to_string()));
        }

        match self.classify(&logical).await? {
            PathKind::Missing => Err(StorageError::NotFound(logical)),
            PathKind::File => {
                let (stream, size) = self.raw_file_stream(&logical).await?;
                let content_type = mime_guess::from_path(&logical)
                    .first_or_octet_stream()
                    .to_string();
                Ok(Download::File {
                    stream,
                    content_type,
                    size,
                })
            }
            PathKind::Folder => {
                let entries = self.archive_entries(&logical, "").await?;
                let file_name = format!("{}.zip", leaf_name(&logical));
                Ok(Download::Archive {
                    stream: zip_stream(entries),
                    file_name,
                })
            }
        }
    }

    /// Materialize a download fully into memory.
    ///
    /// Same classification branching as [`download`](Self::download): file
    /// content as-is, or a zip of everything under a folder. Used when a
    /// result must be embedded whole into an outer archive.
    async fn get_as_buffer(&self, path: &str) -> StorageResult<Bytes> {
        let logical = sanitize(path)?;
        if logical.is_empty() {
            return Err(StorageError::InvalidPath(path.to_string()));
        }

        match self.classify(&logical).await? {
            PathKind::Missing => Err(StorageError::NotFound(logical)),
            PathKind::File => {
                let (mut stream, size) = self.raw_file_stream(&logical).await?;
                let mut buf = BytesMut::with_capacity(size as usize);
                while let Some(chunk) = stream.next().await {
                    buf.extend_from_slice(&chunk?);
                }
                Ok(buf.freeze())
            }
            PathKind::Folder => {
                let entries = self.archive_entries(&logical, "").await?;
                let mut cursor = Cursor::new(Vec::new());
                write_zip(entries, &mut cursor).await?;
                Ok(Bytes::from(cursor.into_inner()))
            }
        }
    }
}

impl Debug for dyn StorageProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "StorageProvider(base_path={})", self.base_path())
    }
}

/// Derive a display classification from a file name's extension.
pub(crate) fn kind_from_name(name: &str) -> String {
    let (_, ext) = split_file_name(name);
    if ext.len() > 1 {
        ext[1..].to_ascii_lowercase()
    } else {
        "file".to_string()
    }
}
