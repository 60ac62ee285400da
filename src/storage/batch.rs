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

//! Best-effort batch operations.
//!
//! Batch delete and batch download process their item list independently:
//! one item's failure never cancels the remaining items. Each item yields a
//! [`BatchItemOutcome`] so callers can report partial success precisely.
//! Batch archives are assembled after the gather phase; an error during
//! assembly itself aborts the whole archive stream (see [`crate::archive`]).

use serde::Serialize;
use tracing::warn;

use super::path::{leaf_name, sanitize};
use super::provider::{Download, StorageProvider};
use crate::archive::zip_stream;

/// Per-item result of a batch operation.
#[derive(Debug, Clone, Serialize)]
pub struct BatchItemOutcome {
    /// The item path as supplied by the caller
    pub path: String,
    /// Whether the item was processed successfully
    pub success: bool,
    /// Failure message when `success` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchItemOutcome {
    fn ok(path: &str) -> Self {
        Self {
            path: path.to_string(),
            success: true,
            error: None,
        }
    }

    fn err(path: &str, message: impl ToString) -> Self {
        Self {
            path: path.to_string(),
            success: false,
            error: Some(message.to_string()),
        }
    }
}

/// Delete every item in `paths`, collecting per-item outcomes.
///
/// Items are processed in order; a missing or failing item is reported in its
/// outcome while the remaining items are still deleted.
pub async fn delete_batch(
    provider: &dyn StorageProvider,
    paths: &[String],
) -> Vec<BatchItemOutcome> {
    let mut outcomes = Vec::with_capacity(paths.len());

    for path in paths {
        match provider.delete(path).await {
            Ok(()) => outcomes.push(BatchItemOutcome::ok(path)),
            Err(e) => {
                warn!("Batch delete failed path={} error={}", path, e);
                outcomes.push(BatchItemOutcome::err(path, e));
            }
        }
    }

    outcomes
}

/// Assemble one archive from a mixed set of files and folders.
///
/// Each file contributes a single entry named by its leaf; each folder
/// contributes its recursive contents rewritten under the folder's own leaf
/// name, so the archive preserves it as a subdirectory. Gathering is
/// best-effort per item; items that cannot be gathered are reported in the
/// outcomes and the remaining items still make it into the archive.
pub async fn download_batch(
    provider: &dyn StorageProvider,
    paths: &[String],
) -> (Download, Vec<BatchItemOutcome>) {
    let mut entries = Vec::new();
    let mut outcomes = Vec::with_capacity(paths.len());

    for path in paths {
        let alias = match sanitize(path) {
            Ok(logical) if !logical.is_empty() => leaf_name(&logical).to_string(),
            Ok(_) => {
                outcomes.push(BatchItemOutcome::err(path, "empty path"));
                continue;
            }
            Err(e) => {
                outcomes.push(BatchItemOutcome::err(path, e));
                continue;
            }
        };

        match provider.archive_entries(path, &alias).await {
            Ok(mut item_entries) => {
                entries.append(&mut item_entries);
                outcomes.push(BatchItemOutcome::ok(path));
            }
            Err(e) => {
                warn!("Batch download failed path={} error={}", path, e);
                outcomes.push(BatchItemOutcome::err(path, e));
            }
        }
    }

    let download = Download::Archive {
        stream: zip_stream(entries),
        file_name: "archive.zip".to_string(),
    };
    (download, outcomes)
}
