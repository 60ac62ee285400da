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

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Storage backend kind
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// Local filesystem storage
    Local,
    /// Cloud blob storage
    Blob,
}

/// Generic configuration for storage providers
///
/// Provider-specific settings live in an options map rather than per-backend
/// structs, so the factory and callers handle one configuration shape.
///
/// # Examples
///
/// ## Local filesystem
/// ```
/// use filedock::StorageConfig;
///
/// let config = StorageConfig::local()
///     .with_option("path", "./uploads");
/// ```
///
/// ## Blob storage
/// ```
/// use filedock::StorageConfig;
///
/// let config = StorageConfig::blob()
///     .with_option("container", "uploads")
///     .with_option("account_name", "myaccount")
///     .with_option("access_key", "ACCOUNT_KEY");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage backend kind
    #[serde(rename = "type")]
    pub storage_type: StorageType,

    /// Provider-specific configuration options
    ///
    /// Local:
    /// - path: uploads root directory (created if missing)
    ///
    /// Blob:
    /// - container: container name (defaults to "uploads")
    /// - connection_string: `AccountName=…;AccountKey=…;BlobEndpoint=…`
    /// - account_name / access_key: discrete credentials
    /// - tenant_id / client_id / client_secret: service principal credentials
    /// - endpoint: custom endpoint URL
    #[serde(default)]
    pub options: HashMap<String, String>,
}

impl StorageConfig {
    /// Create a local filesystem storage configuration.
    pub fn local() -> Self {
        Self {
            storage_type: StorageType::Local,
            options: HashMap::new(),
        }
    }

    /// Create a blob storage configuration.
    pub fn blob() -> Self {
        Self {
            storage_type: StorageType::Blob,
            options: HashMap::new(),
        }
    }

    /// Build a configuration from the process environment.
    ///
    /// `STORAGE_PROVIDER` selects the backend (`blob`, anything else means
    /// local). Local reads `UPLOAD_DIR` (default `uploads`); blob reads
    /// `CONNECTION_STRING` or `AZURE_STORAGE_CONNECTION_STRING` plus
    /// `CONTAINER_NAME` (default `uploads`).
    pub fn from_env() -> Self {
        let provider = std::env::var("STORAGE_PROVIDER").unwrap_or_else(|_| "local".to_string());

        if provider.eq_ignore_ascii_case("blob") || provider.eq_ignore_ascii_case("azure") {
            let mut config = Self::blob();
            if let Ok(connection_string) = std::env::var("CONNECTION_STRING")
                .or_else(|_| std::env::var("AZURE_STORAGE_CONNECTION_STRING"))
            {
                config = config.with_option("connection_string", connection_string);
            }
            let container =
                std::env::var("CONTAINER_NAME").unwrap_or_else(|_| "uploads".to_string());
            config.with_option("container", container)
        } else {
            let upload_dir = std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string());
            Self::local().with_option("path", upload_dir)
        }
    }

    /// Add a configuration option.
    pub fn with_option(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Add multiple configuration options.
    pub fn with_options(mut self, options: HashMap<String, String>) -> Self {
        self.options.extend(options);
        self
    }

    /// Get a configuration option.
    pub fn get_option(&self, key: &str) -> Option<&String> {
        self.options.get(key)
    }

    /// Get the storage type as a string.
    pub fn storage_type_str(&self) -> &str {
        match self.storage_type {
            StorageType::Local => "local",
            StorageType::Blob => "blob",
        }
    }
}
