use std::path::PathBuf;
use std::str::FromStr;

use crate::cache::{DEFAULT_CAPACITY, DEFAULT_K};

/// Engine-wide tunables, constructed from environment variables with
/// documented defaults (teacher: `DatabaseConnectionInfo::from_env()`).
///
/// `node_fanout`/`page_capacity` document the `N`/`M` the concrete
/// `BTree<K, V, NODE_CAP, PAGE_CAP>` type aliases in `reservation` are built
/// with — const generics are fixed at compile time, so these fields cannot
/// actually resize a running tree. They exist so the defaults live in one
/// place and so `reservation`'s type aliases have a single source of truth
/// to stay in sync with.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub data_dir: PathBuf,
    pub node_fanout: usize,
    pub page_capacity: usize,
    pub cache_k: usize,
    pub cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            node_fanout: 63,
            page_capacity: 63,
            cache_k: DEFAULT_K,
            cache_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            data_dir: std::env::var("RESERVATION_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.data_dir),
            node_fanout: env_or("RESERVATION_NODE_FANOUT", default.node_fanout),
            page_capacity: env_or("RESERVATION_PAGE_CAPACITY", default.page_capacity),
            cache_k: env_or("RESERVATION_CACHE_K", default.cache_k),
            cache_capacity: env_or("RESERVATION_CACHE_CAPACITY", default.cache_capacity),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.cache_k, DEFAULT_K);
        assert_eq!(cfg.cache_capacity, DEFAULT_CAPACITY);
        assert!(cfg.node_fanout > 0 && cfg.page_capacity > 0);
    }
}
