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

//! # Filedock
//!
//! A single logical file store over two interchangeable backends: the local
//! filesystem and cloud blob storage. Both backends satisfy the same
//! [`StorageProvider`] contract — listing, collision-safe uploads, file and
//! virtual-folder downloads, recursive deletes — and share one name-resolution
//! and classification algorithm parameterized only by backend primitives.
//!
//! Folders are virtual on the blob backend: a path is a folder exactly when at
//! least one stored key lives under the `path/` prefix. Folder downloads and
//! multi-item batch downloads are assembled incrementally into a streaming zip.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use filedock::{StorageConfig, StorageProviderFactory};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! // Local filesystem store rooted at ./uploads
//! let config = StorageConfig::local().with_option("path", "./uploads");
//! let provider = StorageProviderFactory::from_config(config).await?;
//!
//! for item in provider.list("").await? {
//!     println!("{} ({} bytes)", item.path, item.size);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ```rust,no_run
//! use filedock::{StorageConfig, StorageProviderFactory};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! // Azure blob container as the backing store
//! let config = StorageConfig::blob()
//!     .with_option("container", "uploads")
//!     .with_option("account_name", "myaccount")
//!     .with_option("access_key", "ACCOUNT_KEY");
//!
//! let provider = StorageProviderFactory::from_config(config).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`storage`] - Provider contract, both backend implementations, naming and
//!   batch helpers
//! - [`archive`] - Incremental zip assembly for folder and batch downloads

pub mod archive;
pub mod storage;

// Re-export commonly used types
pub use storage::batch::{delete_batch, download_batch, BatchItemOutcome};
pub use storage::error::{StorageError, StorageResult};
pub use storage::naming::UploadContext;
pub use storage::provider::{Download, FileUpload, PathKind, StorageProvider, StoredItem};
pub use storage::{StorageConfig, StorageProviderFactory};
