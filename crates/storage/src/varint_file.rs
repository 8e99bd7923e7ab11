use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};

pub type BucketId = u64;

/// Append-only file of length-prefixed int32 arrays (§4.2). Unlike
/// [`crate::paged_file::PagedFile`], ids here are raw byte offsets, since
/// records are not uniformly sized.
pub struct VarIntFile {
    file: File,
    path: PathBuf,
    info_len: usize,
}

impl VarIntFile {
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
        };
        if !existed {
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

    /// Appends a fresh array of `n` copies of `init_value`.
    pub fn append(&mut self, init_value: i32, n: usize) -> Result<BucketId> {
        self.append_slice(&vec![init_value; n])
    }

    pub fn append_slice(&mut self, data: &[i32]) -> Result<BucketId> {
        let id = self.file.seek(SeekFrom::End(0)).map_err(|e| self.io_err(e))?;
        self.file
            .write_i32::<LittleEndian>(data.len() as i32)
            .map_err(|e| self.io_err(e))?;
        for &v in data {
            self.file
                .write_i32::<LittleEndian>(v)
                .map_err(|e| self.io_err(e))?;
        }
        Ok(id)
    }

    fn read_len(&mut self, id: BucketId) -> Result<usize> {
        self.file
            .seek(SeekFrom::Start(id))
            .map_err(|e| self.io_err(e))?;
        let len = self
            .file
            .read_i32::<LittleEndian>()
            .map_err(|e| self.io_err(e))?;
        Ok(len.max(0) as usize)
    }

    pub fn read(&mut self, id: BucketId) -> Result<Vec<i32>> {
        let len = self.read_len(id)?;
        self.read_range(id, 0, len)
    }

    pub fn read_range(&mut self, id: BucketId, offset: usize, n: usize) -> Result<Vec<i32>> {
        self.file
            .seek(SeekFrom::Start(
                id + Self::INT_SIZE + offset as u64 * Self::INT_SIZE,
            ))
            .map_err(|e| self.io_err(e))?;
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(
                self.file
                    .read_i32::<LittleEndian>()
                    .map_err(|e| self.io_err(e))?,
            );
        }
        Ok(out)
    }

    pub fn update(&mut self, id: BucketId, data: &[i32]) -> Result<()> {
        self.update_range(id, 0, data.len(), data)
    }

    pub fn update_range(&mut self, id: BucketId, offset: usize, n: usize, data: &[i32]) -> Result<()> {
        let len = self.read_len(id)?;
        if offset + n > len {
            tracing::warn!(id, len, offset, n, "varint update range exceeds stored bucket length");
            return Err(Error::VarIntRangeExceeded {
                id,
                len,
                offset,
                n,
            });
        }
        self.file
            .seek(SeekFrom::Start(
                id + Self::INT_SIZE + offset as u64 * Self::INT_SIZE,
            ))
            .map_err(|e| self.io_err(e))?;
        for &v in &data[..n] {
            self.file
                .write_i32::<LittleEndian>(v)
                .map_err(|e| self.io_err(e))?;
        }
        Ok(())
    }

    /// Writes `length=0` in place (§4.2): no reclamation.
    pub fn mark_removed(&mut self, id: BucketId) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(id))
            .map_err(|e| self.io_err(e))?;
        self.file
            .write_i32::<LittleEndian>(0)
            .map_err(|e| self.io_err(e))
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

    #[test]
    fn append_and_read_full_array() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = VarIntFile::open(dir.path().join("v.bin"), 2).unwrap();
        let id = store.append(7, 5).unwrap();
        assert_eq!(store.read(id).unwrap(), vec![7, 7, 7, 7, 7]);
    }

    #[test]
    fn update_sub_range() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = VarIntFile::open(dir.path().join("v.bin"), 2).unwrap();
        let id = store.append(0, 4).unwrap();
        store.update_range(id, 1, 2, &[9, 8]).unwrap();
        assert_eq!(store.read(id).unwrap(), vec![0, 9, 8, 0]);
        assert_eq!(store.read_range(id, 1, 2).unwrap(), vec![9, 8]);
    }

    #[test]
    fn update_beyond_length_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = VarIntFile::open(dir.path().join("v.bin"), 2).unwrap();
        let id = store.append(0, 2).unwrap();
        assert!(store.update_range(id, 1, 2, &[1, 1]).is_err());
    }

    #[test]
    fn mark_removed_zeroes_length() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = VarIntFile::open(dir.path().join("v.bin"), 2).unwrap();
        let id = store.append(1, 3).unwrap();
        store.mark_removed(id).unwrap();
        assert_eq!(store.read(id).unwrap(), Vec::<i32>::new());
    }
}
