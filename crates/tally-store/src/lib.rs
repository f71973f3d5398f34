// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

pub mod aggregate;
pub mod error;
pub mod file;
pub mod memory;
pub mod store;

pub use aggregate::{AggregateStore, Persisted};
pub use error::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use store::KeyValueStore;
