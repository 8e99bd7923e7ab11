use std::path::Path;

use crate::cache::{LruKCache, DEFAULT_CAPACITY, DEFAULT_K};
use crate::error::Result;
use crate::paged_file::{PagedFile, RecordId};
use crate::record::FixedSizeRecord;

/// F wrapped by C so that reads and writes of fixed-size records go through
/// the cache (§4.4). Writes populate the cache dirty; `remove` flushes
/// first to avoid resurrecting stale state; `flush`/`Drop` write back every
/// dirty entry.
pub struct CachedPagedFile<T: FixedSizeRecord> {
    disk: PagedFile<T>,
    cache: LruKCache<RecordId, T>,
    k: usize,
    capacity: usize,
}

impl<T: FixedSizeRecord> CachedPagedFile<T> {
    pub fn open(path: impl AsRef<Path>, info_len: usize) -> Result<Self> {
        Self::open_with(path, info_len, DEFAULT_K, DEFAULT_CAPACITY)
    }

    pub fn open_with(
        path: impl AsRef<Path>,
        info_len: usize,
        k: usize,
        capacity: usize,
    ) -> Result<Self> {
        Ok(Self {
            disk: PagedFile::open(path, info_len)?,
            cache: LruKCache::new(k, capacity),
            k,
            capacity,
        })
    }

    fn write_back(&mut self, id: RecordId, value: &T) -> Result<()> {
        self.disk.overwrite(id, value)
    }

    fn apply_eviction(&mut self, evicted: Option<(RecordId, T, bool)>) -> Result<()> {
        if let Some((id, value, dirty)) = evicted {
            if dirty {
                tracing::debug!(record_id = id, "writing back dirty record on cache eviction");
                self.write_back(id, &value)?;
            }
        }
        Ok(())
    }

    pub fn get_info(&mut self, slot: usize) -> Result<i32> {
        self.disk.get_info(slot)
    }

    pub fn write_info(&mut self, slot: usize, value: i32) -> Result<()> {
        self.disk.write_info(slot, value)
    }

    pub fn is_empty(&mut self) -> Result<bool> {
        self.disk.is_empty()
    }

    pub fn append(&mut self, record: &T) -> Result<RecordId> {
        let id = self.disk.append(record)?;
        let evicted = self.cache.put(id, record.clone(), false);
        self.apply_eviction(evicted)?;
        Ok(id)
    }

    pub fn read(&mut self, id: RecordId) -> Result<T> {
        if let Some(value) = self.cache.get(&id) {
            return Ok(value);
        }
        let value = self.disk.read(id)?;
        let evicted = self.cache.put(id, value.clone(), false);
        self.apply_eviction(evicted)?;
        Ok(value)
    }

    /// Defers the write-back: the record only hits disk on eviction or flush.
    pub fn update(&mut self, id: RecordId, record: &T) -> Result<()> {
        let evicted = self.cache.put(id, record.clone(), true);
        self.apply_eviction(evicted)
    }

    pub fn remove(&mut self, id: RecordId) -> Result<()> {
        tracing::debug!(record_id = id, "flushing before remove to avoid resurrecting stale state");
        self.flush()?;
        self.disk.mark_removed(id)
    }

    pub fn flush(&mut self) -> Result<()> {
        let dirty = self.cache.drain_dirty();
        if !dirty.is_empty() {
            tracing::debug!(count = dirty.len(), "flushing dirty cache entries");
        }
        for (id, value) in dirty {
            self.write_back(id, &value)?;
        }
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.cache = LruKCache::new(self.k, self.capacity);
        self.disk.clear()
    }
}

impl<T: FixedSizeRecord> Drop for CachedPagedFile<T> {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
    use std::io::{Read, Write};

    #[derive(Clone, PartialEq, Debug)]
    struct Fixed(i32);

    impl FixedSizeRecord for Fixed {
        const ENCODED_LEN: usize = 4;
        fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
            w.write_i32::<LittleEndian>(self.0)
        }
        fn read_from<R: Read>(r: &mut R) -> std::io::Result<Self> {
            Ok(Fixed(r.read_i32::<LittleEndian>()?))
        }
    }

    #[test]
    fn update_is_visible_before_flush_and_persists_after() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cf.bin");
        let mut cf = CachedPagedFile::<Fixed>::open(&path, 1).unwrap();
        let id = cf.append(&Fixed(1)).unwrap();
        cf.update(id, &Fixed(99)).unwrap();
        assert_eq!(cf.read(id).unwrap(), Fixed(99));
        cf.flush().unwrap();
        drop(cf);

        let mut disk = PagedFile::<Fixed>::open(&path, 1).unwrap();
        assert_eq!(disk.read(id).unwrap(), Fixed(99));
    }

    #[test]
    fn drop_flushes_dirty_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cf.bin");
        let id;
        {
            let mut cf = CachedPagedFile::<Fixed>::open(&path, 1).unwrap();
            id = cf.append(&Fixed(1)).unwrap();
            cf.update(id, &Fixed(55)).unwrap();
        }
        let mut disk = PagedFile::<Fixed>::open(&path, 1).unwrap();
        assert_eq!(disk.read(id).unwrap(), Fixed(55));
    }
}
