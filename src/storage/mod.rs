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

//! Storage abstraction over interchangeable backends.
//!
//! The [`provider::StorageProvider`] trait is the contract; the local
//! filesystem and cloud blob backends implement its primitives while the
//! shared download, archive and naming algorithms live in the trait and in
//! the `naming` and `path` modules, so both backends behave identically.

pub mod batch;
pub mod blob;
pub mod config;
pub mod error;
pub mod factory;
pub mod local;
pub mod naming;
pub mod path;
pub mod provider;

pub use config::{StorageConfig, StorageType};
pub use factory::StorageProviderFactory;
