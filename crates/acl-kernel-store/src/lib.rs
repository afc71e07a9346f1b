//! # ACL Kernel Store
//!
//! Storage abstraction for the ACL Kernel. Provides a trait-based interface
//! for grant and identity persistence with SQLite and in-memory
//! implementations.
//!
//! ## Overview
//!
//! The store module abstracts grant storage behind the [`GrantStore`] trait,
//! allowing the kernel to be storage-agnostic. The primary implementation
//! is [`SqliteStore`], with [`MemoryStore`] for testing.
//!
//! The store holds flat tuples only. It knows nothing about groups: group
//! expansion happens at evaluation time against the Group Index.
//!
//! ## Key Types
//!
//! - [`GrantStore`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`InsertResult`] - Result of inserting a grant
//! - [`DumpResult`] - Result of loading a bulk dump
//!
//! ## Usage
//!
//! ```rust,no_run
//! use acl_kernel_store::{GrantStore, InsertResult, SqliteStore};
//! use acl_kernel_core::{Grant, Id};
//!
//! async fn example() {
//!     // Open a SQLite database
//!     let store = SqliteStore::open("acl.db").unwrap();
//!
//!     // Or use an in-memory database for testing
//!     let store = SqliteStore::open_memory().unwrap();
//!
//!     let grant = Grant::new(Id::new_v4(), Id::new_v4(), Id::new_v4());
//!     let result = store.insert_grant(&grant).await.unwrap();
//!     assert!(matches!(result, InsertResult::Inserted(_)));
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Idempotent inserts**: Inserting the same grant twice returns `AlreadyExists`
//! - **Conflict detection**: Same key with a different plural flag returns `Conflict`
//! - **Atomic dumps**: A clashing identity rolls back the whole dump

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{DeleteResult, DumpResult, GrantStore, IdentityResult, InsertResult, UpdateResult};
