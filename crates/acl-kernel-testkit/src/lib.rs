//! # ACL Kernel Testkit
//!
//! Testing utilities for the ACL Kernel.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Group Index**: [`MemoryGroupIndex`], an in-memory Group Index that
//!   broadcasts a change after every edit
//! - **Fixtures**: [`TestFixture`] for setting up principals, permissions
//!   and groups, plus an authorizer over them
//! - **Generators**: Proptest strategies, including closed-world
//!   [`Scenario`](generators::Scenario)s for evaluation properties
//!
//! The integration tests of the workspace live in this crate's `tests/`
//! directory.
//!
//! ## Test Fixtures
//!
//! ```rust
//! use acl_kernel_testkit::TestFixture;
//! use acl_kernel::core::{Grant, Special};
//!
//! # tokio_test_main();
//! # fn tokio_test_main() {
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let fixture = TestFixture::new();
//! let alice = fixture.principal("alice@REALM").await;
//! let read = fixture.permission();
//!
//! let auth = fixture.authorizer().await;
//! auth.add_grant(Grant::new(alice, read, Special::SELF)).await.unwrap();
//! assert!(auth.check("alice@REALM", read, alice, false).await);
//! # });
//! # }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use acl_kernel_eval::effective_acl;
//! use acl_kernel_testkit::generators::scenario;
//!
//! proptest! {
//!     #[test]
//!     fn unknown_principals_have_no_acl(s in scenario()) {
//!         let unknown = acl_kernel_core::Id::from_u128(90);
//!         prop_assert!(effective_acl(unknown, &s.snapshot(), &s.grants).is_none());
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod group_index;

pub use fixtures::{generation, init_tracing, wait_for_generation, TestFixture};
pub use group_index::MemoryGroupIndex;
