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

use std::sync::Arc;

use tracing::info;

use super::blob::BlobStorageProvider;
use super::config::{StorageConfig, StorageType};
use super::error::StorageResult;
use super::local::LocalStorageProvider;
use super::provider::StorageProvider;

/// Factory for creating storage providers
pub struct StorageProviderFactory;

impl StorageProviderFactory {
    /// Create a storage provider from a configuration.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// * Required configuration options are missing
    /// * The backend cannot be initialized (unreadable uploads directory,
    ///   malformed blob credentials)
    pub async fn from_config(config: StorageConfig) -> StorageResult<Arc<dyn StorageProvider>> {
        info!("Using storage provider: {}", config.storage_type_str());

        match config.storage_type {
            StorageType::Local => Ok(Arc::new(LocalStorageProvider::from_config(&config)?)),
            StorageType::Blob => Ok(Arc::new(BlobStorageProvider::from_config(&config)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::error::StorageError;

    #[tokio::test]
    async fn test_factory_builds_local_provider() {
        let dir = tempfile::tempdir().unwrap();
        let config =
            StorageConfig::local().with_option("path", dir.path().to_string_lossy().to_string());

        let provider = StorageProviderFactory::from_config(config).await.unwrap();
        assert!(provider.list("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_factory_builds_blob_provider() {
        let config = StorageConfig::blob()
            .with_option("container", "uploads")
            .with_option("account_name", "devaccount")
            .with_option("access_key", "ZGV2a2V5cGFkZGluZw==");

        let provider = StorageProviderFactory::from_config(config).await.unwrap();
        assert_eq!(provider.base_path(), "uploads");
    }

    #[tokio::test]
    async fn test_factory_local_missing_path_is_config_error() {
        let result = StorageProviderFactory::from_config(StorageConfig::local()).await;
        assert!(matches!(result, Err(StorageError::ConfigError(_))));
    }
}
