//! Structural validation of grants, identities and dumps.
//!
//! Validation never consults the Group Index: it only rejects tuples that
//! could not mean anything regardless of current group membership.

use std::collections::HashMap;

use crate::dump::{Dump, DUMP_VERSION};
use crate::error::ValidationError;
use crate::grant::Grant;
use crate::identity::Identity;
use crate::types::Id;
use crate::wellknown::Special;

/// Validate a grant tuple.
///
/// - principal and permission are ordinary ids;
/// - `Mine` only makes sense as a plural target;
/// - `Self` and `Null` (the wildcard) only make sense as single targets.
pub fn validate_grant(grant: &Grant) -> Result<(), ValidationError> {
    if Special::is_special(&grant.principal) {
        return Err(ValidationError::ReservedPrincipal(grant.principal));
    }
    if Special::is_special(&grant.permission) {
        return Err(ValidationError::ReservedPermission(grant.permission));
    }

    let target = grant.target;
    let ok = if target == Special::MINE {
        grant.plural
    } else if target == Special::SELF || target == Special::NULL {
        !grant.plural
    } else {
        target != Special::UNOWNED
    };
    if !ok {
        return Err(ValidationError::InvalidPluralTarget(target, grant.plural));
    }

    Ok(())
}

/// Validate an identity.
pub fn validate_identity(identity: &Identity) -> Result<(), ValidationError> {
    if identity.kind.is_empty() {
        return Err(ValidationError::EmptyIdentityKind);
    }
    if identity.kind == "uuid" {
        return Err(ValidationError::ReservedIdentityKind(identity.kind.clone()));
    }
    if identity.name.is_empty() {
        return Err(ValidationError::EmptyIdentityName);
    }
    Ok(())
}

/// Validate a whole dump. Every entry is checked before anything is applied.
pub fn validate_dump(dump: &Dump) -> Result<(), ValidationError> {
    if dump.version != DUMP_VERSION {
        return Err(ValidationError::UnsupportedDumpVersion(dump.version));
    }

    for (index, grant) in dump.grants.iter().enumerate() {
        validate_grant(grant).map_err(|e| ValidationError::DumpEntry {
            index,
            source: Box::new(e),
        })?;
    }

    let mut seen: HashMap<(&str, &str), Id> = HashMap::new();
    for (index, identity) in dump.identities.iter().enumerate() {
        validate_identity(identity).map_err(|e| ValidationError::DumpEntry {
            index,
            source: Box::new(e),
        })?;

        let key = (identity.kind.as_str(), identity.name.as_str());
        if let Some(previous) = seen.insert(key, identity.principal) {
            if previous != identity.principal {
                return Err(ValidationError::DuplicateIdentity {
                    kind: identity.kind.clone(),
                    name: identity.name.clone(),
                });
            }
        }
    }

    Ok(())
}
