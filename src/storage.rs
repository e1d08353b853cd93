use crate::error::{DmgError, IoSnafu};
use log::debug;
use snafu::ResultExt;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

/// Named blobs of battery-backed cartridge RAM.
pub trait Storage {
    fn save(&mut self, name: &str, data: &[u8]) -> Result<(), DmgError>;
    fn load(&self, name: &str) -> Result<Option<Vec<u8>>, DmgError>;
    fn exists(&self, name: &str) -> bool;
}

/// Keeps every blob as `<name>.sav` inside a directory.
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> FileStorage {
        FileStorage { root: root.into() }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.sav", name))
    }
}

impl Storage for FileStorage {
    fn save(&mut self, name: &str, data: &[u8]) -> Result<(), DmgError> {
        fs::create_dir_all(&self.root).context(IoSnafu {
            path: self.root.display().to_string(),
        })?;

        let path = self.path(name);
        fs::write(&path, data).context(IoSnafu {
            path: path.display().to_string(),
        })?;

        debug!("Storage: Wrote {} bytes to {}", data.len(), path.display());
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Option<Vec<u8>>, DmgError> {
        let path = self.path(name);
        if !path.exists() {
            return Ok(None);
        }

        let data = fs::read(&path).context(IoSnafu {
            path: path.display().to_string(),
        })?;

        debug!("Storage: Read {} bytes from {}", data.len(), path.display());
        Ok(Some(data))
    }

    fn exists(&self, name: &str) -> bool {
        self.path(name).is_file()
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    blobs: HashMap<String, Vec<u8>>,
}

impl MemoryStorage {
    pub fn new() -> MemoryStorage {
        MemoryStorage::default()
    }
}

impl Storage for MemoryStorage {
    fn save(&mut self, name: &str, data: &[u8]) -> Result<(), DmgError> {
        self.blobs.insert(name.to_string(), data.to_vec());
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Option<Vec<u8>>, DmgError> {
        Ok(self.blobs.get(name).cloned())
    }

    fn exists(&self, name: &str) -> bool {
        self.blobs.contains_key(name)
    }
}
