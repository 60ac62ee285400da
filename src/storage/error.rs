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

use std::path::Path;

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Archive error: {0}")]
    ArchiveError(#[from] async_zip::error::ZipError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Object store error: {0}")]
    ObjectStoreError(#[from] object_store::Error),
}

impl StorageError {
    /// Map an I/O error to its storage error kind, attributing it to `path`.
    ///
    /// `NotFound` and `PermissionDenied` are lifted into their typed variants
    /// so callers can branch on them; anything else stays an `IoError`.
    pub fn from_io(path: &Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.display().to_string()),
            std::io::ErrorKind::PermissionDenied => {
                Self::PermissionDenied(path.display().to_string())
            }
            _ => Self::IoError(err),
        }
    }

    /// Whether this error denotes a missing file, folder, or blob.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::ObjectStoreError(object_store::Error::NotFound { .. })
        )
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn test_config_error() {
        let error = StorageError::ConfigError("Invalid configuration".to_string());
        assert_eq!(
            error.to_string(),
            "Configuration error: Invalid configuration"
        );
    }

    #[test]
    fn test_invalid_path_error() {
        let error = StorageError::InvalidPath("../escape".to_string());
        assert_eq!(error.to_string(), "Invalid path: ../escape");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::other("disk on fire");
        let storage_error: StorageError = io_error.into();

        match storage_error {
            StorageError::IoError(_) => {
                assert!(storage_error.to_string().contains("IO error"));
            }
            _ => panic!("Expected IoError variant"),
        }
    }

    #[test]
    fn test_from_io_not_found() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "no such file");
        let path = PathBuf::from("uploads/missing.txt");
        let storage_error = StorageError::from_io(&path, io_error);

        match &storage_error {
            StorageError::NotFound(p) => assert!(p.contains("missing.txt")),
            other => panic!("Expected NotFound, got {:?}", other),
        }
        assert!(storage_error.is_not_found());
    }

    #[test]
    fn test_from_io_permission_denied() {
        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let path = PathBuf::from("uploads/locked");
        let storage_error = StorageError::from_io(&path, io_error);

        match storage_error {
            StorageError::PermissionDenied(p) => assert!(p.contains("locked")),
            other => panic!("Expected PermissionDenied, got {:?}", other),
        }
    }

    #[test]
    fn test_from_io_other_kind_stays_io() {
        let io_error = io::Error::new(io::ErrorKind::Interrupted, "interrupted");
        let storage_error = StorageError::from_io(&PathBuf::from("x"), io_error);
        assert!(matches!(storage_error, StorageError::IoError(_)));
    }

    #[test]
    fn test_object_store_not_found_is_not_found() {
        let err: StorageError = object_store::Error::NotFound {
            path: "docs/a.txt".to_string(),
            source: Box::new(io::Error::new(io::ErrorKind::NotFound, "gone")),
        }
        .into();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_error_debug() {
        let error = StorageError::ConfigError("test".to_string());
        let debug_str = format!("{:?}", error);
        assert!(debug_str.contains("ConfigError"));
    }

    #[test]
    fn test_storage_result_ok() {
        let result: StorageResult<i32> = Ok(42);
        assert!(result.is_ok());
    }
}
