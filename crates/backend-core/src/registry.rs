//! # Backend Registry
//!
//! Account → region → backend map with lazy construction. A backend for a key is built the
//! first time it is looked up and lives until the registry (or that partition) is reset.
//! Global services such as IAM keep one instance per account under the region key
//! [`GLOBAL_REGION`].

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// Region key used by services that are not regional.
pub const GLOBAL_REGION: &str = "global";

/// The (account, region) pair a backend instance serves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Scope {
    pub account_id: String,
    pub region: String,
    pub partition: String,
}

impl Scope {
    pub fn new(account_id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            region: region.into(),
            partition: "aws".to_string(),
        }
    }

    /// `arn:{partition}:{service}:{region}:{account}:{resource}`
    pub fn arn(&self, service: &str, resource: &str) -> String {
        crate::ids::arn(&self.partition, service, &self.region, &self.account_id, resource)
    }

    /// ARN without a region component, as global services emit them.
    pub fn global_arn(&self, service: &str, resource: &str) -> String {
        crate::ids::arn(&self.partition, service, "", &self.account_id, resource)
    }
}

/// A per-scope service simulation that the registry can construct on demand.
pub trait Backend {
    /// Service name used in log records and ARNs.
    const SERVICE: &'static str;

    /// Whether one instance serves every region of an account.
    const GLOBAL: bool = false;

    fn new(scope: Scope) -> Self;
}

/// Lazily populated map of backends, keyed by account then region.
#[derive(Debug)]
pub struct BackendRegistry<B: Backend> {
    backends: BTreeMap<String, BTreeMap<String, B>>,
}

impl<B: Backend> Default for BackendRegistry<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> BackendRegistry<B> {
    pub fn new() -> Self {
        Self {
            backends: BTreeMap::new(),
        }
    }

    fn region_key(region: &str) -> &str {
        if B::GLOBAL {
            GLOBAL_REGION
        } else {
            region
        }
    }

    /// Returns the backend for `(account_id, region)`, constructing it on first use.
    pub fn get_or_create(&mut self, account_id: &str, region: &str) -> &mut B {
        let region = Self::region_key(region);
        self.backends
            .entry(account_id.to_string())
            .or_default()
            .entry(region.to_string())
            .or_insert_with(|| {
                info!(service = B::SERVICE, account_id, region, "Backend created");
                B::new(Scope::new(account_id, region))
            })
    }

    /// Returns the backend only if it was already constructed.
    pub fn get(&self, account_id: &str, region: &str) -> Option<&B> {
        self.backends
            .get(account_id)
            .and_then(|regions| regions.get(Self::region_key(region)))
    }

    pub fn contains(&self, account_id: &str, region: &str) -> bool {
        self.get(account_id, region).is_some()
    }

    /// Rebuilds the backend for one key from scratch.
    pub fn reset_partition(&mut self, account_id: &str, region: &str) {
        let region = Self::region_key(region);
        if let Some(regions) = self.backends.get_mut(account_id) {
            if regions.remove(region).is_some() {
                info!(service = B::SERVICE, account_id, region, "Backend reset");
            }
        }
    }

    /// Drops every backend.
    pub fn reset(&mut self) {
        let count: usize = self.backends.values().map(BTreeMap::len).sum();
        self.backends.clear();
        info!(service = B::SERVICE, count, "Registry reset");
    }

    /// Every constructed backend with its account and region key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &B)> {
        self.backends.iter().flat_map(|(account, regions)| {
            regions
                .iter()
                .map(move |(region, backend)| (account.as_str(), region.as_str(), backend))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Counter {
        scope: Scope,
        hits: u32,
    }

    impl Backend for Counter {
        const SERVICE: &'static str = "counter";

        fn new(scope: Scope) -> Self {
            Self { scope, hits: 0 }
        }
    }

    #[derive(Debug)]
    struct GlobalCounter(Scope);

    impl Backend for GlobalCounter {
        const SERVICE: &'static str = "global-counter";
        const GLOBAL: bool = true;

        fn new(scope: Scope) -> Self {
            Self(scope)
        }
    }

    #[test]
    fn construction_is_lazy_and_idempotent() {
        let mut registry = BackendRegistry::<Counter>::new();
        assert!(!registry.contains("111111111111", "us-east-1"));
        registry.get_or_create("111111111111", "us-east-1").hits += 1;
        registry.get_or_create("111111111111", "us-east-1").hits += 1;
        let backend = registry.get("111111111111", "us-east-1").unwrap();
        assert_eq!(backend.hits, 2);
        assert_eq!(backend.scope.region, "us-east-1");
        assert!(!registry.contains("111111111111", "eu-west-1"));
    }

    #[test]
    fn reset_partition_rebuilds_one_key() {
        let mut registry = BackendRegistry::<Counter>::new();
        registry.get_or_create("a", "r1").hits = 5;
        registry.get_or_create("a", "r2").hits = 7;
        registry.reset_partition("a", "r1");
        assert_eq!(registry.get_or_create("a", "r1").hits, 0);
        assert_eq!(registry.get_or_create("a", "r2").hits, 7);
        registry.reset();
        assert_eq!(registry.iter().count(), 0);
    }

    #[test]
    fn global_services_share_one_instance() {
        let mut registry = BackendRegistry::<GlobalCounter>::new();
        registry.get_or_create("a", "us-east-1");
        registry.get_or_create("a", "eu-west-1");
        assert_eq!(registry.iter().count(), 1);
        assert_eq!(registry.get("a", "ap-south-1").unwrap().0.region, GLOBAL_REGION);
    }

    #[test]
    fn scope_builds_arns() {
        let scope = Scope::new("123456789012", "us-east-1");
        assert_eq!(
            scope.arn("codepipeline", "build"),
            "arn:aws:codepipeline:us-east-1:123456789012:build"
        );
        assert_eq!(
            scope.global_arn("iam", "role/x"),
            "arn:aws:iam::123456789012:role/x"
        );
    }
}
