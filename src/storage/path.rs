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

//! Logical path sanitization.
//!
//! A logical path is forward-slash separated and relative to the store root.
//! [`sanitize`] guarantees the output contains no `..` segment and no root or
//! drive marker, so joining it under the store root can never escape the root.
//! The local backend performs an additional check on the resolved absolute
//! path as a second line of defense.

use super::error::{StorageError, StorageResult};

/// Normalize and validate a user-supplied relative path.
///
/// Backslashes are treated as separators, empty and `.` segments are dropped,
/// and `..` segments collapse against the segments already accepted. Leading
/// traversal (`../`, `..\`) is stripped rather than rejected, matching how
/// upload clients commonly mangle relative paths. Drive markers (`C:`) and
/// leading separators are removed so the result is always relative.
///
/// # Errors
///
/// Returns `InvalidPath` if the input contains a NUL byte, which no backend
/// can represent.
pub fn sanitize(raw: &str) -> StorageResult<String> {
    if raw.contains('\0') {
        return Err(StorageError::InvalidPath(raw.replace('\0', "\\0")));
    }

    let normalized = raw.replace('\\', "/");
    let mut segments: Vec<&str> = Vec::new();

    for segment in normalized.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                // Leading traversal has nothing to pop and is dropped.
                segments.pop();
            }
            s if s.ends_with(':') && segments.is_empty() => {
                // Windows drive marker ("C:") at the front of an absolute path.
            }
            s => segments.push(s),
        }
    }

    Ok(segments.join("/"))
}

/// Return the leaf (display) name of a logical path.
pub fn leaf_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Split a logical path into its parent folder and leaf name.
///
/// Root-level paths yield an empty parent.
pub fn parent_and_leaf(path: &str) -> (&str, &str) {
    match path.rsplit_once('/') {
        Some((parent, leaf)) => (parent, leaf),
        None => ("", path),
    }
}

/// Join two logical path fragments, skipping empty sides.
pub fn join_logical(left: &str, right: &str) -> String {
    if left.is_empty() {
        right.to_string()
    } else if right.is_empty() {
        left.to_string()
    } else {
        format!("{}/{}", left, right)
    }
}
