use std::path::{Path, PathBuf};

use crate::cached_file::CachedPagedFile;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::record::{Bounded, Codec, FixedSizeRecord};
use crate::varint_file::VarIntFile;
use crate::btree::BTree;

/// Owns a data directory and the tunables every store opened under it
/// should share (§4 expansion: "Engine façade"). Exists purely for
/// `crates/server`'s wiring convenience — it performs no business logic,
/// the way the teacher's `PgDatabase` is a thin handle around a pool.
pub struct Engine {
    data_dir: PathBuf,
    config: EngineConfig,
}

impl Engine {
    pub fn open(config: EngineConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir).map_err(|source| crate::error::Error::Io {
            path: config.data_dir.display().to_string(),
            source,
        })?;
        let data_dir = config.data_dir.clone();
        Ok(Self { data_dir, config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn path(&self, file_stem: &str) -> PathBuf {
        self.data_dir.join(file_stem)
    }

    pub fn open_btree<K, V, const NODE_CAP: usize, const PAGE_CAP: usize>(
        &self,
        name: &str,
    ) -> Result<BTree<K, V, NODE_CAP, PAGE_CAP>>
    where
        K: Bounded,
        V: Codec,
    {
        BTree::open_with(
            self.path(&format!("{name}.nodes")),
            self.path(&format!("{name}.data")),
            self.config.cache_k,
            self.config.cache_capacity,
        )
    }

    pub fn open_cached_file<T: FixedSizeRecord>(
        &self,
        name: &str,
        info_len: usize,
    ) -> Result<CachedPagedFile<T>> {
        CachedPagedFile::open_with(
            self.path(name),
            info_len,
            self.config.cache_k,
            self.config.cache_capacity,
        )
    }

    pub fn open_varint_file(&self, name: &str, info_len: usize) -> Result<VarIntFile> {
        VarIntFile::open(self.path(name), info_len)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
