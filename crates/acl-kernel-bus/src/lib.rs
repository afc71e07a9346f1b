//! # ACL Kernel Bus
//!
//! Correlated request/ack mutation bus for the ACL Kernel.
//!
//! ## Overview
//!
//! All writes to the grant store go through one dispatcher task. Callers
//! submit a [`MutationRequest`] and await the [`Ack`] carrying the same
//! [`CorrelationId`]; many callers may be waiting at once and each one
//! receives only its own ack.
//!
//! Before a successful mutation is acked, the dispatcher refetches the
//! affected lists from the store and hands them to a [`RefreshSink`]. A
//! caller that has its ack can therefore rely on the cache already
//! reflecting the change.
//!
//! ## Key Types
//!
//! - [`MutationBus`] - Handle for submitting requests
//! - [`MutationRequest`] - A `kind` plus a JSON body
//! - [`GrantRequest`], [`IdentityRequest`], [`DumpRequest`] - Typed bodies
//! - [`Ack`] / [`AckStatus`] - The outcome of a request
//! - [`RefreshSink`] - Receives refetched lists before the ack
//!
//! ## Request Kinds
//!
//! | Kind       | Body                | Success statuses                |
//! |------------|---------------------|---------------------------------|
//! | `grant`    | [`GrantRequest`]    | `Created`, `AlreadyTrue`, `Applied` |
//! | `identity` | [`IdentityRequest`] | `Created`, `AlreadyTrue`, `Applied` |
//! | `dump`     | [`DumpRequest`]     | `Applied`                       |
//!
//! A request with any other kind is answered with `ServerError`; the bus
//! keeps running.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use acl_kernel_bus::{BusConfig, GrantRequest, MutationBus, MutationRequest, RefreshSink};
//! use acl_kernel_core::{Grant, Id};
//! use acl_kernel_eval::Permitted;
//! use acl_kernel_store::MemoryStore;
//!
//! async fn example(sink: Arc<dyn RefreshSink>) {
//!     let bus = MutationBus::spawn(Arc::new(MemoryStore::new()), sink, BusConfig::default());
//!
//!     let request = MutationRequest::grant(&GrantRequest::Create {
//!         grant: Grant::new(Id::new_v4(), Id::new_v4(), Id::new_v4()),
//!         permitted: Permitted::All,
//!     })
//!     .unwrap();
//!
//!     let ack = bus.request(request).await.unwrap();
//!     assert!(ack.status.is_success());
//! }
//! ```

pub mod bus;
pub mod error;
pub mod handlers;
pub mod messages;
pub mod registry;

pub use bus::{BusConfig, MutationBus, RefreshSink};
pub use error::{BusError, Result};
pub use handlers::{MutationHandler, Outcome, Refresh};
pub use messages::{
    Ack, AckStatus, CorrelationId, DumpRequest, GrantRequest, IdentityRequest, MutationRequest,
    Rejection, KIND_DUMP, KIND_GRANT, KIND_IDENTITY,
};
pub use registry::Registry;
