// src/drivers/storage.rs
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use crate::drivers::DeviceError;
/// One entry of the storage root listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}
#[cfg(test)]
impl DirEntry {
    pub fn file(name: &str) -> Self {
        Self {
            name: name.to_string(),
            is_dir: false,
        }
    }
    pub fn dir(name: &str) -> Self {
        Self {
            name: name.to_string(),
            is_dir: true,
        }
    }
}
/// Removable storage with a flat root directory.
pub trait Storage: Send {
    /// Lists the root directory in the device's own enumeration order.
    fn entries(&self) -> Result<Vec<DirEntry>, DeviceError>;
    fn open_read(&self, name: &str) -> Result<Box<dyn BufRead>, DeviceError>;
    /// Writes a whole file. Either the complete contents land or nothing does.
    fn write_file(&mut self, name: &str, contents: &[u8]) -> Result<(), DeviceError>;
    fn remove(&mut self, name: &str) -> Result<(), DeviceError>;
    fn exists(&self, name: &str) -> bool;
}
/// A host directory standing in for the card root.
pub struct DirStorage {
    root: PathBuf,
}
impl DirStorage {
    pub fn mount(root: impl AsRef<Path>, create_if_missing: bool) -> Result<Self, DeviceError> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            if !create_if_missing {
                return Err(DeviceError::StorageUnavailable);
            }
            fs::create_dir_all(&root).map_err(|_| DeviceError::StorageUnavailable)?;
        }
        Ok(Self { root })
    }
    pub fn root(&self) -> &Path {
        &self.root
    }
    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name.trim_start_matches('/'))
    }
}
impl Storage for DirStorage {
    fn entries(&self) -> Result<Vec<DirEntry>, DeviceError> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let is_dir = entry.file_type()?.is_dir();
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir,
            });
        }
        Ok(entries)
    }
    fn open_read(&self, name: &str) -> Result<Box<dyn BufRead>, DeviceError> {
        let file = fs::File::open(self.path(name)).map_err(|e| DeviceError::file_open(name, e))?;
        Ok(Box::new(BufReader::new(file)))
    }
    fn write_file(&mut self, name: &str, contents: &[u8]) -> Result<(), DeviceError> {
        let target = self.path(name);
        let partial = self.path(&format!("{name}.part"));
        let mut file =
            fs::File::create(&partial).map_err(|e| DeviceError::file_open(name, e))?;
        let written = file.write_all(contents).and_then(|_| file.sync_all());
        if let Err(e) = written {
            let _ = fs::remove_file(&partial);
            return Err(e.into());
        }
        fs::rename(&partial, &target)?;
        Ok(())
    }
    fn remove(&mut self, name: &str) -> Result<(), DeviceError> {
        fs::remove_file(self.path(name)).map_err(|e| DeviceError::file_open(name, e))
    }
    fn exists(&self, name: &str) -> bool {
        self.path(name).exists()
    }
}
#[cfg(test)]
pub use memory::MemStorage;
