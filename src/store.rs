//! Byte-blob cache store for downloaded and locally edited blacklists.
//!
//! Sources never touch `std::fs` directly; they go through [`CacheStore`] so
//! refresh decisions that hinge on modification times can be tested with a
//! mock store.

use chrono::{DateTime, Utc};
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

#[cfg(test)]
use mockall::automock;

/// Read/write access to cached list files plus their modification times.
#[cfg_attr(test, automock)]
pub trait CacheStore: Send + Sync {
    /// Read the whole file.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Replace the file contents atomically.
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Check if a path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Last modification time of the file.
    fn modified(&self, path: &Path) -> io::Result<DateTime<Utc>>;
}

/// [`CacheStore`] backed by the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileStore;

impl CacheStore for FileStore {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    /// Writes to a temporary file in the same directory, then renames it over
    /// the target so a reader never sees a half-written list.
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut temp_file = NamedTempFile::new_in(parent)?;
        temp_file.write_all(contents)?;
        temp_file.as_file().sync_all()?;
        temp_file.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn modified(&self, path: &Path) -> io::Result<DateTime<Utc>> {
        let mtime = std::fs::metadata(path)?.modified()?;
        Ok(DateTime::<Utc>::from(mtime))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_read_write() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("voipbl.db");

        let store = FileStore;
        store.write(&file_path, b"1.2.3.4/32\n").unwrap();

        assert_eq!(store.read(&file_path).unwrap(), b"1.2.3.4/32\n");
    }

    #[test]
    fn test_file_store_write_replaces_content() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("voipbl.db");

        let store = FileStore;
        store.write(&file_path, b"first, much longer content\n").unwrap();
        store.write(&file_path, b"second\n").unwrap();

        assert_eq!(store.read(&file_path).unwrap(), b"second\n");
    }

    #[test]
    fn test_file_store_exists() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("localbl.db");

        let store = FileStore;
        assert!(!store.exists(&file_path));
        store.write(&file_path, b"").unwrap();
        assert!(store.exists(&file_path));
    }

    #[test]
    fn test_file_store_modified_is_recent() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("voipbl.db");

        let store = FileStore;
        let before = Utc::now() - chrono::Duration::seconds(5);
        store.write(&file_path, b"x").unwrap();

        let mtime = store.modified(&file_path).unwrap();
        assert!(mtime >= before);
        assert!(mtime <= Utc::now() + chrono::Duration::seconds(5));
    }

    #[test]
    fn test_file_store_read_nonexistent() {
        let store = FileStore;
        let result = store.read(Path::new("/nonexistent/path/voipbl.db"));
        assert_eq!(result.unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_file_store_write_to_nonexistent_dir() {
        let store = FileStore;
        assert!(store
            .write(Path::new("/nonexistent/path/voipbl.db"), b"x")
            .is_err());
    }

    #[test]
    fn test_file_store_modified_nonexistent() {
        let store = FileStore;
        assert!(store.modified(Path::new("/nonexistent/voipbl.db")).is_err());
    }

    #[test]
    fn test_file_store_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FileStore>();
    }

    #[test]
    fn test_mock_store_error_simulation() {
        let mut mock = MockCacheStore::new();
        mock.expect_read().returning(|_| {
            Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "access denied",
            ))
        });

        let result = mock.read(Path::new("/any/path"));
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::PermissionDenied);
    }
}
