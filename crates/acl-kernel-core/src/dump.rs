//! Bulk import documents.
//!
//! A dump carries grants and identities for many principals at once. The
//! schema is closed: unknown fields are rejected so that a misspelt section
//! cannot be silently ignored.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::grant::Grant;
use crate::identity::Identity;
use crate::types::Id;
use crate::validation::validate_dump;

/// The only dump version currently understood.
pub const DUMP_VERSION: u32 = 1;

/// A bulk import document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Dump {
    /// Schema version, must be [`DUMP_VERSION`].
    pub version: u32,

    /// Grants to load. The grant set of every principal named here is
    /// replaced by the grants listed for it.
    #[serde(default)]
    pub grants: Vec<Grant>,

    /// Identities to load.
    #[serde(default)]
    pub identities: Vec<Identity>,
}

impl Dump {
    /// An empty dump of the current version.
    pub fn new() -> Self {
        Self {
            version: DUMP_VERSION,
            grants: Vec::new(),
            identities: Vec::new(),
        }
    }

    pub fn with_grant(mut self, grant: Grant) -> Self {
        self.grants.push(grant);
        self
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identities.push(identity);
        self
    }

    /// Parse and validate a JSON dump.
    pub fn from_json(text: &str) -> Result<Self, crate::ValidationError> {
        let dump: Dump = serde_json::from_str(text)
            .map_err(|e| CoreError::DecodingError(e.to_string()))?;
        validate_dump(&dump)?;
        Ok(dump)
    }

    /// Parse and validate a CBOR dump.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self, crate::ValidationError> {
        let dump: Dump = ciborium::from_reader(bytes)
            .map_err(|e| CoreError::DecodingError(e.to_string()))?;
        validate_dump(&dump)?;
        Ok(dump)
    }

    /// Serialize to CBOR bytes.
    pub fn to_cbor(&self) -> Result<Vec<u8>, CoreError> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| CoreError::EncodingError(e.to_string()))?;
        Ok(buf)
    }

    /// Principals whose grant sets this dump replaces.
    pub fn grant_principals(&self) -> BTreeSet<Id> {
        self.grants.iter().map(|g| g.principal).collect()
    }

    /// Permissions named by the dump's grants.
    pub fn grant_permissions(&self) -> BTreeSet<Id> {
        self.grants.iter().map(|g| g.permission).collect()
    }

    /// Principals whose identities this dump writes.
    pub fn identity_principals(&self) -> BTreeSet<Id> {
        self.identities.iter().map(|i| i.principal).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty() && self.identities.is_empty()
    }
}

impl Default for Dump {
    fn default() -> Self {
        Self::new()
    }
}
