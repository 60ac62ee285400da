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

//! Collision-free name resolution.
//!
//! Both backends resolve upload names through the same deterministic suffix
//! scheme: a candidate that already exists becomes `base(1).ext`, `base(2).ext`
//! and so on until the backend's existence predicate reports a free name.
//! Folder names use the whole name as the base. The only state involved is the
//! per-request [`UploadContext`], which pins every file of one upload batch
//! that came from the same source folder to the same resolved folder.

use std::collections::HashMap;
use std::future::Future;

use super::error::StorageResult;

/// Split a file name at its last dot.
///
/// The extension keeps its leading dot; a name without a dot has an empty
/// extension. A leading-dot name like `.env` splits into `("", ".env")`, so
/// collisions on it resolve to `(1).env`.
pub fn split_file_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) => (&name[..idx], &name[idx..]),
        None => (name, ""),
    }
}

/// Resolve a collision-free file name against a backend existence predicate.
///
/// Returns `candidate` unchanged when it is free; otherwise the first
/// `{base}({counter}){ext}` with counters starting at 1. Counters are never
/// reused within one call and there is no upper bound — termination is the
/// predicate's responsibility.
pub async fn resolve_unique_file_name<F, Fut>(candidate: &str, exists: F) -> StorageResult<String>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = StorageResult<bool>>,
{
    let (base, ext) = split_file_name(candidate);
    resolve_with_suffix(candidate, base, ext, exists).await
}

/// Resolve a collision-free folder name.
///
/// Folders carry no extension: the whole candidate is the base, so `docs`
/// becomes `docs(1)`, not `docs(1).`.
pub async fn resolve_unique_folder_name<F, Fut>(candidate: &str, exists: F) -> StorageResult<String>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = StorageResult<bool>>,
{
    resolve_with_suffix(candidate, candidate, "", exists).await
}

async fn resolve_with_suffix<F, Fut>(
    candidate: &str,
    base: &str,
    ext: &str,
    exists: F,
) -> StorageResult<String>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = StorageResult<bool>>,
{
    if !exists(candidate.to_string()).await? {
        return Ok(candidate.to_string());
    }

    let mut counter: u64 = 1;
    loop {
        let attempt = format!("{}({}){}", base, counter, ext);
        if !exists(attempt.clone()).await? {
            return Ok(attempt);
        }
        counter += 1;
    }
}

/// Per-request upload state.
///
/// Holds the optional request-level destination folder override and the folder
/// mapping built up while the request's files are processed. Created empty at
/// the start of a multi-file upload, threaded through each per-file resolution,
/// and discarded with the request. Never shared across requests.
#[derive(Debug, Default)]
pub struct UploadContext {
    destination: Option<String>,
    folders: HashMap<String, String>,
}

impl UploadContext {
    /// Create an empty context for a request with no destination override.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context whose files all land under `destination`.
    pub fn with_destination(destination: impl Into<String>) -> Self {
        Self {
            destination: Some(destination.into()),
            folders: HashMap::new(),
        }
    }

    /// The request-level destination folder override, if any.
    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }

    /// Map a source folder to its resolved destination folder.
    ///
    /// First-seen wins: the first file from `source` runs `resolve` and the
    /// result is reused for every later file of the same request, so one batch
    /// never splits a folder into `folder`, `folder(1)`, `folder(2)`.
    pub async fn map_folder<F, Fut>(&mut self, source: &str, resolve: F) -> StorageResult<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = StorageResult<String>>,
    {
        if let Some(mapped) = self.folders.get(source) {
            return Ok(mapped.clone());
        }
        let resolved = resolve().await?;
        self.folders.insert(source.to_string(), resolved.clone());
        Ok(resolved)
    }
}
