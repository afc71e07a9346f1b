//! Configuration for the Authorizer.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use acl_kernel_bus::BusConfig;
use acl_kernel_core::{Id, Perm, PrincipalRef, Special, DEFAULT_IDENTITY_KIND};
use acl_kernel_eval::BootstrapAcl;

use crate::error::{AuthError, Result};

/// Environment variable naming the root principal.
pub const ENV_ROOT_PRINCIPAL: &str = "ROOT_PRINCIPAL";
/// Environment variable holding the bootstrap ACL.
pub const ENV_BOOTSTRAP: &str = "BOOTSTRAP_ACL";
/// Environment variable holding the effective-ACL lifetime in seconds.
pub const ENV_CACHE_TTL_SECS: &str = "ACL_CACHE_TTL_SECS";

/// Configuration for the Authorizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Name of the principal that bypasses every check.
    pub root_principal: Option<String>,

    /// Identity kind assumed for bare names.
    pub default_identity_kind: String,

    /// How long a computed effective ACL may be reused, in seconds.
    pub acl_ttl_secs: u64,

    /// Depth of the mutation bus queues.
    pub bus_queue_depth: usize,

    /// Bootstrap ACL, one `principal:permission:target` per line.
    pub bootstrap: String,

    /// Extra names usable in the bootstrap ACL, on top of the built-in ones.
    pub well_known: HashMap<String, Id>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            root_principal: None,
            default_identity_kind: DEFAULT_IDENTITY_KIND.to_string(),
            acl_ttl_secs: 30 * 60,
            bus_queue_depth: BusConfig::default().request_queue,
            bootstrap: String::new(),
            well_known: HashMap::new(),
        }
    }
}

impl AuthConfig {
    /// Defaults overridden by `ROOT_PRINCIPAL`, `BOOTSTRAP_ACL` and
    /// `ACL_CACHE_TTL_SECS`.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable lookup.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(root) = var(ENV_ROOT_PRINCIPAL).filter(|s| !s.is_empty()) {
            config.root_principal = Some(root);
        }
        if let Some(bootstrap) = var(ENV_BOOTSTRAP) {
            config.bootstrap = bootstrap;
        }
        if let Some(ttl) = var(ENV_CACHE_TTL_SECS) {
            config.acl_ttl_secs = ttl.trim().parse().map_err(|_| {
                AuthError::Config(format!("{} is not a number of seconds: {:?}", ENV_CACHE_TTL_SECS, ttl))
            })?;
        }

        Ok(config)
    }

    /// Parse a JSON configuration. Missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| AuthError::Config(e.to_string()))
    }

    pub fn acl_ttl(&self) -> Duration {
        Duration::from_secs(self.acl_ttl_secs)
    }

    pub fn bus(&self) -> BusConfig {
        BusConfig {
            request_queue: self.bus_queue_depth,
            ack_queue: self.bus_queue_depth,
        }
    }

    /// The root principal as a principal reference.
    pub fn root(&self) -> Option<PrincipalRef> {
        self.root_principal.as_deref().map(|name| self.principal_ref(name))
    }

    /// Parse a principal name, applying the configured default kind to
    /// bare names.
    pub fn principal_ref(&self, name: &str) -> PrincipalRef {
        match PrincipalRef::parse(name) {
            PrincipalRef::Named { kind, name: bare }
                if kind == DEFAULT_IDENTITY_KIND && !name.contains(':') =>
            {
                PrincipalRef::Named {
                    kind: self.default_identity_kind.clone(),
                    name: bare,
                }
            }
            other => other,
        }
    }

    /// Parse the bootstrap ACL against the built-in and configured names.
    pub fn bootstrap_acl(&self) -> Result<BootstrapAcl> {
        let mut names = builtin_names();
        names.extend(self.well_known.iter().map(|(k, v)| (k.clone(), *v)));
        Ok(BootstrapAcl::parse(&self.bootstrap, &names)?)
    }
}

/// Names of the well-known ids.
fn builtin_names() -> HashMap<String, Id> {
    [
        ("ReadACL", Perm::READ_ACL),
        ("WriteACL", Perm::WRITE_ACL),
        ("ReadIdentity", Perm::READ_IDENTITY),
        ("WriteIdentity", Perm::WRITE_IDENTITY),
        ("Null", Special::NULL),
        ("Wildcard", Special::WILDCARD),
        ("Self", Special::SELF),
        ("Mine", Special::MINE),
    ]
    .into_iter()
    .map(|(name, id)| (name.to_string(), id))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AuthConfig::default();
        assert_eq!(config.acl_ttl(), Duration::from_secs(1800));
        assert_eq!(config.default_identity_kind, "kerberos");
        assert!(config.root().is_none());
        assert!(config.bootstrap_acl().unwrap().is_empty());
    }

    #[test]
    fn test_from_vars() {
        let vars = HashMap::from([
            (ENV_ROOT_PRINCIPAL, "admin@REALM"),
            (ENV_CACHE_TTL_SECS, "60"),
            (ENV_BOOTSTRAP, "svc@REALM:ReadACL:Wildcard"),
        ]);
        let config = AuthConfig::from_vars(|k| vars.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.root(), Some(PrincipalRef::kerberos("admin@REALM")));
        assert_eq!(config.acl_ttl(), Duration::from_secs(60));

        let bootstrap = config.bootstrap_acl().unwrap();
        let entries = bootstrap.entries_for("svc@REALM").unwrap();
        assert_eq!(entries[0].permission, Perm::READ_ACL);
        assert_eq!(entries[0].target, Special::WILDCARD);
    }

    #[test]
    fn test_platform_variable_names() {
        let vars = HashMap::from([
            ("ROOT_PRINCIPAL", "root@REALM"),
            ("BOOTSTRAP_ACL", "svc@REALM:ReadACL:Null"),
        ]);
        let config = AuthConfig::from_vars(|k| vars.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.root_principal.as_deref(), Some("root@REALM"));
        assert!(config.bootstrap_acl().unwrap().entries_for("svc@REALM").is_some());
    }

    #[test]
    fn test_bad_ttl_is_rejected() {
        let result = AuthConfig::from_vars(|k| (k == ENV_CACHE_TTL_SECS).then(|| "soon".to_string()));
        assert!(matches!(result, Err(AuthError::Config(_))));
    }

    #[test]
    fn test_from_json() {
        let config = AuthConfig::from_json(
            r#"{"root_principal": "root@R", "acl_ttl_secs": 5, "well_known": {"Edge": "00000000-0000-0000-0000-000000000007"}}"#,
        )
        .unwrap();
        assert_eq!(config.acl_ttl_secs, 5);
        assert_eq!(config.bus_queue_depth, 64);
        assert_eq!(config.well_known["Edge"], Id::from_u128(7));

        assert!(AuthConfig::from_json(r#"{"nonsense": true}"#).is_err());
    }

    #[test]
    fn test_default_kind_applies_to_bare_names() {
        let config = AuthConfig {
            default_identity_kind: "sparkplug".into(),
            ..AuthConfig::default()
        };
        assert_eq!(
            config.principal_ref("G/N"),
            PrincipalRef::Named {
                kind: "sparkplug".into(),
                name: "G/N".into(),
            }
        );
        assert_eq!(
            config.principal_ref("kerberos:a@R"),
            PrincipalRef::kerberos("a@R")
        );
    }
}
