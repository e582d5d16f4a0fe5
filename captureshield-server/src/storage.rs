//! Zone list persistence in a JSON file.
//!
//! Writes go to a sibling temporary file which is synced and then renamed
//! over the target, so a crash leaves either the old or the new list.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use captureshield_core::{StorageError, ZoneStorage};

pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStorage { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn io_error(path: &Path, e: std::io::Error) -> StorageError {
    StorageError::Io(format!("{}: {}", path.display(), e))
}

impl ZoneStorage for JsonFileStorage {
    fn read(&mut self) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&self.path, e)),
        }
    }

    fn write(&mut self, contents: &str) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;
        }

        let temp = self.temp_path();
        let mut file = File::create(&temp).map_err(|e| io_error(&temp, e))?;
        file.write_all(contents.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| io_error(&temp, e))?;
        drop(file);

        fs::rename(&temp, &self.path).map_err(|e| io_error(&self.path, e))?;
        log::trace!("Wrote {} bytes to {}", contents.len(), self.path.display());
        Ok(())
    }
}
