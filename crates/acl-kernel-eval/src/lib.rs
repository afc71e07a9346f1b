//! # ACL Kernel Evaluation
//!
//! Group expansion and permission evaluation for the ACL Kernel.
//!
//! ## Overview
//!
//! Grants are stored as flat tuples. Whether a grant applies to a principal,
//! which leaf permissions it carries and which targets it covers all depend
//! on the current state of the external Group Index. This crate defines the
//! read-only contract for that index ([`GroupIndex`]), captures what
//! evaluation needs from it in an immutable [`GroupSnapshot`], and turns
//! snapshot plus grants into an [`EffectiveAcl`].
//!
//! ## Key Types
//!
//! - [`GroupIndex`] - Async query contract of the external Group Index
//! - [`GroupSnapshot`] - Class membership, group members and ownership at one point in time
//! - [`EffectiveAcl`] - The `(permission, target)` list of one principal
//! - [`Permitted`] - The permitted-target predicate for one permission
//! - [`BootstrapAcl`] - Static entries used before the Auth data is available
//!
//! ## Evaluation
//!
//! For a principal `P`:
//!
//! 1. `P` must be a leaf member of the Principal class, otherwise there is no ACL
//! 2. A grant applies when its principal is `P` or a group containing `P`
//! 3. Permission groups expand to their leaf permission members
//! 4. Plural grants expand over the target group's members; `Mine` expands
//!    to the objects `P` owns
//! 5. `Self` targets become `P`
//!
//! ## Usage
//!
//! ```rust
//! use acl_kernel_core::{Grant, Id};
//! use acl_kernel_eval::{effective_acl, GroupSnapshot, Permitted};
//!
//! let (p, perm, group, t) = (Id::new_v4(), Id::new_v4(), Id::new_v4(), Id::new_v4());
//! let snapshot = GroupSnapshot::new()
//!     .with_principal(p)
//!     .with_permission(perm)
//!     .with_members(group, [t]);
//!
//! let grants = [Grant::plural(p, perm, group)];
//! let acl = effective_acl(p, &snapshot, &grants).unwrap();
//! let permitted = Permitted::from_entries(acl.entries(), &perm, false);
//! assert!(permitted.allows(&t));
//! ```

pub mod bootstrap;
pub mod engine;
pub mod error;
pub mod group;
pub mod permitted;
pub mod snapshot;

pub use bootstrap::BootstrapAcl;
pub use engine::{effective_acl, AclEntry, EffectiveAcl};
pub use error::{EvalError, GroupIndexError, Result};
pub use group::{GroupChange, GroupIndex};
pub use permitted::Permitted;
pub use snapshot::GroupSnapshot;
