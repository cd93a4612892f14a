// File-backed storage: one open per call, nothing kept open between calls.
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::core::codec::{Codec, Format};
use crate::core::error::Error;
use crate::core::lock::Lock;
use crate::core::storage::Storage;
use crate::core::transport::{encode, load_from, write_payload};

/// Storage in one file, opened for reading on `load` and created or truncated on `store`.
pub struct FileStorage {
    path: PathBuf,
    codec: Arc<dyn Codec>,
    lock: Lock,
}

impl FileStorage {
    /// Handle on `path` using `codec`; share `lock` to serialize with other handles.
    pub fn new(path: impl Into<PathBuf>, codec: Arc<dyn Codec>, lock: Lock) -> Self {
        Self {
            path: path.into(),
            codec,
            lock,
        }
    }

    /// Handle using a built-in format and its own private lock.
    pub fn with_format(path: impl Into<PathBuf>, format: Format) -> Self {
        Self::new(path, Arc::new(format), Lock::private())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock(&self) -> &Lock {
        &self.lock
    }
}

impl Storage for FileStorage {
    fn load<T: DeserializeOwned>(&self, dest: &mut T) -> Result<(), Error> {
        load_file(&self.path, dest, self.codec.as_ref(), &self.lock)
    }

    fn store<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), Error> {
        store_file(&self.path, value, self.codec.as_ref(), &self.lock)
    }
}

impl std::fmt::Debug for FileStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStorage")
            .field("path", &self.path)
            .field("lock", &self.lock)
            .finish_non_exhaustive()
    }
}

/// Opens `path` for reading and loads it; a missing file is a `NotFound` error.
pub(crate) fn load_file<T: DeserializeOwned>(
    path: &Path,
    dest: &mut T,
    codec: &dyn Codec,
    lock: &Lock,
) -> Result<(), Error> {
    debug!(path = %path.display(), "loading file");
    let mut file = File::open(path).map_err(|err| Error::io(err).with_path(path))?;
    load_from(&mut file, dest, codec, lock).map_err(|err| err.with_path(path))
}

/// Encodes `value`, then creates or truncates `path` and writes the payload.
///
/// A value that fails to encode leaves the file untouched.
pub(crate) fn store_file<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
    codec: &dyn Codec,
    lock: &Lock,
) -> Result<(), Error> {
    debug!(path = %path.display(), "storing file");
    let buf = encode(value, codec).map_err(|err| err.with_path(path))?;
    let mut file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)
        .map_err(|err| Error::io(err).with_path(path))?;
    write_payload(&mut file, &buf, lock).map_err(|err| err.with_path(path))
}

#[cfg(test)]
mod tests {
    use super::FileStorage;
    use crate::core::codec::{Codec, Format};
    use crate::core::error::ErrorKind;
    use crate::core::lock::Lock;
    use crate::core::storage::Storage;
    use std::sync::Arc;

    fn json_storage(path: impl Into<std::path::PathBuf>) -> FileStorage {
        let codec: Arc<dyn Codec> = Arc::new(Format::Json);
        FileStorage::new(path, codec, Lock::private())
    }

    #[test]
    fn missing_file_is_not_found_with_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nonexistent");
        let mut dest = 0.0_f64;
        let err = json_storage(&path).load(&mut dest).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.path(), Some(path.as_path()));
        assert_eq!(
            err.io_error().map(|io_err| io_err.kind()),
            Some(std::io::ErrorKind::NotFound)
        );
    }

    #[test]
    fn store_truncates_previous_contents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        std::fs::write(&path, "a much longer previous payload").expect("seed");

        json_storage(&path).store(&42.5).expect("store");
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "42.5");
    }

    #[test]
    fn undecodable_file_is_a_decode_error_not_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("garbage.json");
        std::fs::write(&path, "not json").expect("seed");

        let mut dest = String::new();
        let err = json_storage(&path).load(&mut dest).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(!err.is_not_found());
        assert_eq!(err.path(), Some(path.as_path()));
    }

    #[test]
    fn encode_failure_leaves_previous_contents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.toml");
        std::fs::write(&path, "foo = \"bar\"\n").expect("seed");

        let err = FileStorage::with_format(&path, Format::Toml)
            .store("bare strings are not TOML documents")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encode);
        assert_eq!(err.path(), Some(path.as_path()));
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "foo = \"bar\"\n");
    }

    #[test]
    fn store_into_missing_directory_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing").join("state.json");
        let err = json_storage(&path).store("value").unwrap_err();
        assert!(err.is_not_found());
    }
}
