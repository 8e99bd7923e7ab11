use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};
use crate::record::FixedSizeRecord;

/// A permanent record identifier: the record's 0-based slot index, not a raw
/// byte offset. `append` returns this id; it never changes for the record's
/// lifetime (§4.1: "no physical reclamation").
pub type RecordId = u64;

/// Typed append-only file of fixed-size records, with a small header of
/// `info_len` machine integers (§4.1).
pub struct PagedFile<T: FixedSizeRecord> {
    file: File,
    path: PathBuf,
    info_len: usize,
    _marker: PhantomData<T>,
}

impl<T: FixedSizeRecord> PagedFile<T> {
    const INT_SIZE: u64 = 4;

    pub fn open(path: impl AsRef<Path>, info_len: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let existed = path.exists();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .map_err(|source| Error::Io {
                path: path.display().to_string(),
                source,
            })?;

        let mut store = Self {
            file,
            path,
            info_len,
            _marker: PhantomData,
        };
        if !existed {
            tracing::debug!(path = %store.path.display(), info_len, "creating paged file with fresh header");
            store.write_header()?;
        }
        Ok(store)
    }

    fn io_err(&self, source: std::io::Error) -> Error {
        Error::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    fn write_header(&mut self) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(0))
            .map_err(|e| self.io_err(e))?;
        for _ in 0..self.info_len {
            self.file
                .write_i32::<LittleEndian>(0)
                .map_err(|e| self.io_err(e))?;
        }
        Ok(())
    }

    fn header_bytes(&self) -> u64 {
        self.info_len as u64 * Self::INT_SIZE
    }

    fn record_offset(&self, id: RecordId) -> u64 {
        self.header_bytes() + id * T::ENCODED_LEN as u64
    }

    /// 1-indexed, matching the source's `get_info`/`write_info` convention.
    pub fn get_info(&mut self, slot: usize) -> Result<i32> {
        if slot == 0 || slot > self.info_len {
            return Err(Error::InfoSlotOutOfRange(slot));
        }
        self.file
            .seek(SeekFrom::Start((slot as u64 - 1) * Self::INT_SIZE))
            .map_err(|e| self.io_err(e))?;
        self.file
            .read_i32::<LittleEndian>()
            .map_err(|e| self.io_err(e))
    }

    pub fn write_info(&mut self, slot: usize, value: i32) -> Result<()> {
        if slot == 0 || slot > self.info_len {
            return Err(Error::InfoSlotOutOfRange(slot));
        }
        self.file
            .seek(SeekFrom::Start((slot as u64 - 1) * Self::INT_SIZE))
            .map_err(|e| self.io_err(e))?;
        self.file
            .write_i32::<LittleEndian>(value)
            .map_err(|e| self.io_err(e))
    }

    pub fn append(&mut self, record: &T) -> Result<RecordId> {
        let len = self.file.metadata().map_err(|e| self.io_err(e))?.len();
        let header = self.header_bytes();
        let id = (len - header) / T::ENCODED_LEN as u64;
        self.file
            .seek(SeekFrom::Start(header + id * T::ENCODED_LEN as u64))
            .map_err(|e| self.io_err(e))?;
        record.write_to(&mut self.file).map_err(|e| self.io_err(e))?;
        Ok(id)
    }

    pub fn read(&mut self, id: RecordId) -> Result<T> {
        self.file
            .seek(SeekFrom::Start(self.record_offset(id)))
            .map_err(|e| self.io_err(e))?;
        T::read_from(&mut self.file).map_err(|e| self.io_err(e))
    }

    pub fn overwrite(&mut self, id: RecordId, record: &T) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(self.record_offset(id)))
            .map_err(|e| self.io_err(e))?;
        record.write_to(&mut self.file).map_err(|e| self.io_err(e))
    }

    /// No-op: space is never reclaimed at this layer (§4.1).
    pub fn mark_removed(&mut self, _id: RecordId) -> Result<()> {
        Ok(())
    }

    pub fn is_empty(&mut self) -> Result<bool> {
        let len = self.file.metadata().map_err(|e| self.io_err(e))?.len();
        Ok(len == self.header_bytes())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.file.set_len(0).map_err(|e| self.io_err(e))?;
        self.write_header()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    #[derive(Clone, PartialEq, Debug)]
    struct Fixed(i32, i32);

    impl FixedSizeRecord for Fixed {
        const ENCODED_LEN: usize = 8;

        fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
            w.write_i32::<LittleEndian>(self.0)?;
            w.write_i32::<LittleEndian>(self.1)
        }

        fn read_from<R: Read>(r: &mut R) -> std::io::Result<Self> {
            let a = r.read_i32::<LittleEndian>()?;
            let b = r.read_i32::<LittleEndian>()?;
            Ok(Fixed(a, b))
        }
    }

    #[test]
    fn append_read_overwrite_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixed.bin");
        let mut store = PagedFile::<Fixed>::open(&path, 2).unwrap();

        assert!(store.is_empty().unwrap());
        let id0 = store.append(&Fixed(1, 2)).unwrap();
        let id1 = store.append(&Fixed(3, 4)).unwrap();
        assert_eq!(id0, 0);
        assert_eq!(id1, 1);
        assert!(!store.is_empty().unwrap());

        assert_eq!(store.read(id0).unwrap(), Fixed(1, 2));
        assert_eq!(store.read(id1).unwrap(), Fixed(3, 4));

        store.overwrite(id0, &Fixed(9, 9)).unwrap();
        assert_eq!(store.read(id0).unwrap(), Fixed(9, 9));
    }

    #[test]
    fn info_slots_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixed.bin");
        let mut store = PagedFile::<Fixed>::open(&path, 2).unwrap();
        store.write_info(1, 42).unwrap();
        store.write_info(2, -7).unwrap();
        assert_eq!(store.get_info(1).unwrap(), 42);
        assert_eq!(store.get_info(2).unwrap(), -7);
    }

    #[test]
    fn reopen_preserves_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixed.bin");
        {
            let mut store = PagedFile::<Fixed>::open(&path, 1).unwrap();
            store.write_info(1, 7).unwrap();
            store.append(&Fixed(5, 6)).unwrap();
        }
        let mut reopened = PagedFile::<Fixed>::open(&path, 1).unwrap();
        assert_eq!(reopened.get_info(1).unwrap(), 7);
        assert_eq!(reopened.read(0).unwrap(), Fixed(5, 6));
    }

    #[test]
    fn clear_truncates_and_resets_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixed.bin");
        let mut store = PagedFile::<Fixed>::open(&path, 1).unwrap();
        store.append(&Fixed(1, 1)).unwrap();
        store.clear().unwrap();
        assert!(store.is_empty().unwrap());
        assert_eq!(store.get_info(1).unwrap(), 0);
    }
}
