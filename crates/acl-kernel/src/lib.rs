//! # ACL Kernel
//!
//! The unified API of the ACL Kernel: permission checks and grant
//! management over flat grants and a live, externally maintained group
//! graph.
//!
//! ## Overview
//!
//! - **Grants**: flat `(principal, permission, target, plural)` tuples
//! - **Groups**: principal, permission and target groups live in an external
//!   Group Index and are expanded at evaluation time
//! - **Snapshots**: evaluation reads an immutable snapshot that is replaced
//!   whenever grants, identities or groups change
//! - **Mutations**: every write goes through a correlated bus and is visible
//!   to readers by the time it is acknowledged
//!
//! ## Key Types
//!
//! - [`Authorizer`] - Checks, management operations and their gated `_as` forms
//! - [`AuthConfig`] - Root principal, bootstrap ACL, cache lifetime
//! - [`SnapshotCache`] - Published snapshots and cached effective ACLs
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use acl_kernel::{AuthConfig, Authorizer};
//! use acl_kernel::core::{Grant, Id, Special};
//! use acl_kernel::eval::GroupIndex;
//! use acl_kernel::store::SqliteStore;
//!
//! async fn example(index: Arc<dyn GroupIndex>) {
//!     let store = Arc::new(SqliteStore::open("acl.db").unwrap());
//!     let auth = Authorizer::start(AuthConfig::from_env().unwrap(), store, index)
//!         .await
//!         .unwrap();
//!
//!     let (principal, permission) = (Id::new_v4(), Id::new_v4());
//!     auth.add_grant(Grant::new(principal, permission, Special::WILDCARD))
//!         .await
//!         .unwrap();
//!
//!     let allowed = auth
//!         .check(&format!("uuid:{}", principal), permission, Id::new_v4(), true)
//!         .await;
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `acl_kernel::core` - Identifiers, grants, identities, dumps
//! - `acl_kernel::store` - Grant storage and SQLite
//! - `acl_kernel::eval` - Group Index contract and evaluation
//! - `acl_kernel::bus` - Mutation bus and acks

pub mod authorizer;
pub mod cache;
pub mod config;
pub mod error;
pub mod identity;

// Re-export component crates
pub use acl_kernel_bus as bus;
pub use acl_kernel_core as core;
pub use acl_kernel_eval as eval;
pub use acl_kernel_store as store;

// Re-export main types for convenience
pub use authorizer::Authorizer;
pub use cache::{Snapshot, SnapshotCache};
pub use config::AuthConfig;
pub use error::{AuthError, Result};
pub use identity::IdentityTable;

// Re-export commonly used types
pub use acl_kernel_bus::{Ack, AckStatus, Rejection};
pub use acl_kernel_core::{Grant, GrantId, GrantPattern, Id, Identity, PrincipalRef, StoredGrant};
pub use acl_kernel_eval::{EffectiveAcl, GroupIndex, Permitted};
