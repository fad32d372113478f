//! Time-limited cache of computed paths
//!
//! Keys quantize start and target to a coarse grid so that nearby queries
//! from consecutive frames share one computed path.

use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::race::constants::pathfinding::{CACHE_PRUNE_THRESHOLD, CACHE_QUANTUM};
use crate::race::systems::pathfinding::{LineType, PathPoint};
use crate::util::vec3::Vec3;

/// Shared, immutable path
pub type SharedPath = Arc<[PathPoint]>;

/// Grid cell of a quantized position
pub type CellKey = (i32, i32, i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathKey {
    pub start: CellKey,
    pub target: CellKey,
    pub line_type: LineType,
}

impl PathKey {
    pub fn new(start: Vec3, target: Vec3, line_type: LineType) -> Self {
        Self {
            start: quantize(start),
            target: quantize(target),
            line_type,
        }
    }
}

#[inline]
fn quantize(p: Vec3) -> CellKey {
    (
        (p.x / CACHE_QUANTUM).floor() as i32,
        (p.y / CACHE_QUANTUM).floor() as i32,
        (p.z / CACHE_QUANTUM).floor() as i32,
    )
}

#[derive(Debug, Clone)]
struct CacheEntry {
    path: SharedPath,
    created_at_ms: u64,
}

#[derive(Debug)]
pub struct PathCache {
    entries: FxHashMap<PathKey, CacheEntry>,
    ttl_ms: u64,
    hits: u64,
    misses: u64,
}

impl PathCache {
    pub fn new(ttl_ms: u64) -> Self {
        Self {
            entries: FxHashMap::default(),
            ttl_ms,
            hits: 0,
            misses: 0,
        }
    }

    /// Cached path for `key` if it is younger than the TTL
    pub fn get(&mut self, key: &PathKey, now_ms: u64) -> Option<SharedPath> {
        let ttl = self.ttl_ms;
        match self.entries.get(key) {
            Some(entry) if now_ms.saturating_sub(entry.created_at_ms) < ttl => {
                self.hits += 1;
                Some(Arc::clone(&entry.path))
            }
            _ => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, key: PathKey, path: SharedPath, now_ms: u64) {
        if self.entries.len() >= CACHE_PRUNE_THRESHOLD {
            self.prune(now_ms);
        }
        self.entries.insert(
            key,
            CacheEntry {
                path,
                created_at_ms: now_ms,
            },
        );
    }

    /// Drop expired entries
    pub fn prune(&mut self, now_ms: u64) {
        let ttl = self.ttl_ms;
        self.entries
            .retain(|_, e| now_ms.saturating_sub(e.created_at_ms) < ttl);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (hits, misses) since creation
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::race::systems::pathfinding::RiskLevel;

    fn path() -> SharedPath {
        Arc::from(vec![PathPoint {
            position: Vec3::ZERO,
            target_speed: 50.0,
            line_index: None,
            is_corner: false,
            risk: RiskLevel::Medium,
        }])
    }

    #[test]
    fn test_nearby_positions_share_key() {
        let a = PathKey::new(Vec3::ground(1.0, 1.0), Vec3::ground(51.0, 0.0), LineType::Optimal);
        let b = PathKey::new(Vec3::ground(9.0, 2.0), Vec3::ground(55.0, 9.0), LineType::Optimal);
        assert_eq!(a, b);
        let c = PathKey::new(Vec3::ground(1.0, 1.0), Vec3::ground(51.0, 0.0), LineType::Safe);
        assert_ne!(a, c);
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let mut cache = PathCache::new(1000);
        let key = PathKey::new(Vec3::ZERO, Vec3::ground(100.0, 0.0), LineType::Optimal);
        cache.insert(key, path(), 0);
        assert!(cache.get(&key, 999).is_some());
        assert!(cache.get(&key, 1000).is_none());
        assert_eq!(cache.stats(), (1, 1));
    }

    #[test]
    fn test_prune_drops_only_expired() {
        let mut cache = PathCache::new(1000);
        let old = PathKey::new(Vec3::ZERO, Vec3::ground(100.0, 0.0), LineType::Optimal);
        let fresh = PathKey::new(Vec3::ZERO, Vec3::ground(200.0, 0.0), LineType::Optimal);
        cache.insert(old, path(), 0);
        cache.insert(fresh, path(), 900);
        cache.prune(1500);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&fresh, 1500).is_some());
    }
}
