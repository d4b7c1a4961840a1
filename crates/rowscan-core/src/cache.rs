//! Plan cache.
//!
//! Field trees are memoized per destination type and naming configuration;
//! matching a tree against a column set is cheap and runs on every lookup.

use std::any::TypeId;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, trace};

use crate::columns::ColumnSet;
use crate::config::ScanConfig;
use crate::error::Error;
use crate::plan::{BindingPlan, FieldTree};
use crate::shape::Shape;

/// Cache statistics.
#[derive(Debug, Default)]
pub struct CacheStats {
    lookups: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    builds: AtomicU64,
}

impl CacheStats {
    /// Get lookup count.
    pub fn lookups(&self) -> u64 {
        self.lookups.load(AtomicOrdering::Relaxed)
    }

    /// Get hit count.
    pub fn hits(&self) -> u64 {
        self.hits.load(AtomicOrdering::Relaxed)
    }

    /// Get miss count.
    pub fn misses(&self) -> u64 {
        self.misses.load(AtomicOrdering::Relaxed)
    }

    /// Get count of successfully built field trees.
    pub fn builds(&self) -> u64 {
        self.builds.load(AtomicOrdering::Relaxed)
    }

    /// Calculate hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits() as f64;
        let total = hits + self.misses() as f64;
        if total > 0.0 {
            hits / total
        } else {
            0.0
        }
    }
}

/// Identity of a cached field tree.
///
/// Everything in [`ScanConfig`] that changes column names takes part in the
/// key, so scanners with different configurations can share one cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TreeKey {
    type_id: TypeId,
    ignore_marker: String,
    prefix_separator: String,
    name_mapper: usize,
}

impl TreeKey {
    fn new(shape: &Shape, config: &ScanConfig) -> Self {
        Self {
            type_id: shape.type_id(),
            ignore_marker: config.ignore_marker.clone(),
            prefix_separator: config.prefix_separator.clone(),
            name_mapper: config.name_mapper as usize,
        }
    }
}

/// Concurrency-safe cache of field trees keyed by destination type and
/// naming configuration.
///
/// Two threads missing on the same type both build a tree; the last insert
/// wins. Trees are immutable once built, so either result is valid. Failed
/// builds are not cached.
#[derive(Debug, Default)]
pub struct PlanCache {
    trees: DashMap<TreeKey, Arc<FieldTree>>,
    stats: CacheStats,
}

impl PlanCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up (or build) the field tree of `shape` and match it against `columns`.
    pub fn get_or_build(
        &self,
        shape: &Shape,
        columns: &ColumnSet,
        config: &ScanConfig,
    ) -> Result<BindingPlan, Error> {
        self.field_tree(shape, config)?.resolve(columns, config)
    }

    /// Look up (or build) the field tree of `shape`.
    pub fn field_tree(&self, shape: &Shape, config: &ScanConfig) -> Result<Arc<FieldTree>, Error> {
        self.stats.lookups.fetch_add(1, AtomicOrdering::Relaxed);
        let key = TreeKey::new(shape, config);

        // Clone out of the map so no shard lock is held while building.
        let cached = self.trees.get(&key).map(|t| Arc::clone(t.value()));
        if let Some(tree) = cached {
            self.stats.hits.fetch_add(1, AtomicOrdering::Relaxed);
            trace!(destination = %shape.short_name(), "Plan cache hit");
            return Ok(tree);
        }

        self.stats.misses.fetch_add(1, AtomicOrdering::Relaxed);
        let tree = Arc::new(FieldTree::build(shape, config)?);
        self.stats.builds.fetch_add(1, AtomicOrdering::Relaxed);
        debug!(
            destination = %shape.short_name(),
            cached = self.trees.len() + 1,
            "Cached field tree"
        );
        self.trees.insert(key, Arc::clone(&tree));
        Ok(tree)
    }

    /// Get cache statistics.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Get the number of cached field trees.
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Drop every cached field tree.
    pub fn clear(&self) {
        self.trees.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Bind;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize)]
    struct Foo {
        foo_column: String,
        bar: i64,
    }

    crate::bind_struct!(Foo {
        foo_column: String,
        bar: i64,
    });

    #[derive(Debug, Default, Deserialize)]
    struct Clashing {
        foo: String,
        bar: String,
    }

    crate::bind_struct!(Clashing {
        foo: String = "foo_column",
        bar: String = "foo_column",
    });

    fn columns(names: &[&str]) -> ColumnSet {
        ColumnSet::new(names.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    #[test]
    fn test_cache_hit_and_miss() {
        let cache = PlanCache::new();
        let config = ScanConfig::default();
        let shape = Foo::shape();

        cache.get_or_build(&shape, &columns(&["foo_column"]), &config).unwrap();
        cache
            .get_or_build(&shape, &columns(&["bar", "foo_column"]), &config)
            .unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().lookups(), 2);
        assert_eq!(cache.stats().hits(), 1);
        assert_eq!(cache.stats().misses(), 1);
        assert_eq!(cache.stats().builds(), 1);
        assert!((cache.stats().hit_rate() - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_resolve_errors_keep_tree() {
        let cache = PlanCache::new();
        let config = ScanConfig::default();

        let err = cache
            .get_or_build(&Clashing::shape(), &columns(&["foo_column"]), &config)
            .unwrap_err();
        assert!(matches!(err, Error::AmbiguousField { .. }));
        // The tree itself is valid; only the column set is rejected.
        assert_eq!(cache.len(), 1);
    }

    #[derive(Debug, Default, Deserialize)]
    struct Outer {
        inner: Foo,
    }

    crate::bind_struct!(Outer {
        #[embedded]
        inner: Foo = "in",
    });

    #[test]
    fn test_trees_keyed_by_config() {
        let cache = PlanCache::new();
        let dotted = ScanConfig::default();
        let underscored = ScanConfig::new().with_prefix_separator("__");

        cache
            .get_or_build(&Outer::shape(), &columns(&["in.bar"]), &dotted)
            .unwrap();
        let plan = cache
            .get_or_build(&Outer::shape(), &columns(&["in__bar"]), &underscored)
            .unwrap();
        assert_eq!(plan.entries().len(), 1);

        cache
            .get_or_build(&Outer::shape(), &columns(&["in.foo_column"]), &dotted)
            .unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().builds(), 2);
        assert_eq!(cache.stats().hits(), 1);
    }

    #[test]
    fn test_clear() {
        let cache = PlanCache::new();
        cache
            .get_or_build(&Foo::shape(), &columns(&["bar"]), &ScanConfig::default())
            .unwrap();
        assert!(!cache.is_empty());

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_builds() {
        let cache = PlanCache::new();
        let config = ScanConfig::default();

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    let plan = cache
                        .get_or_build(&Foo::shape(), &columns(&["bar", "foo_column"]), &config)
                        .unwrap();
                    assert_eq!(plan.entries().len(), 2);
                });
            }
        });

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().lookups(), 8);
        assert_eq!(cache.stats().hits() + cache.stats().misses(), 8);
        assert!(cache.stats().builds() >= 1);
    }
}
