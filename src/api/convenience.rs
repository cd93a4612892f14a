//! Purpose: Zero-configuration load/store entry points and their explicit configuration.
//! Exports: `Endure`, `load`, `store`, `load_with_reader`, `store_with_writer`, `must`.
//! Role: Binds a codec and a lock to the transport primitives for ad hoc calls.
//! Invariants: Free functions use the process default codec and the process-wide lock.
//! Invariants: The process-wide lock serializes every free-function call, file or stream.
//! Notes: `must` is for scripts and binaries; library code returns errors instead.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::defaults::default_codec;
use crate::core::codec::Codec;
use crate::core::error::Error;
use crate::core::file::{FileStorage, load_file, store_file};
use crate::core::lock::{Lock, LockMode};
use crate::core::stream::StreamStorage;
use crate::core::transport::{load_from, store_to};

/// A codec plus a lock, threaded explicitly instead of relying on process globals.
#[derive(Clone)]
pub struct Endure {
    codec: Arc<dyn Codec>,
    lock: Lock,
}

impl Endure {
    /// Configuration with its own private lock.
    pub fn new(codec: impl Codec + 'static) -> Self {
        Self {
            codec: Arc::new(codec),
            lock: Lock::private(),
        }
    }

    /// The configuration behind the free functions: default codec, process-wide lock.
    pub fn global() -> Self {
        Self {
            codec: default_codec(),
            lock: Lock::process(),
        }
    }

    pub fn with_lock_mode(mut self, mode: LockMode) -> Self {
        self.lock = Lock::new(mode);
        self
    }

    pub fn with_lock(mut self, lock: Lock) -> Self {
        self.lock = lock;
        self
    }

    pub fn codec(&self) -> &Arc<dyn Codec> {
        &self.codec
    }

    pub fn lock(&self) -> &Lock {
        &self.lock
    }

    pub fn load<T: DeserializeOwned>(
        &self,
        path: impl AsRef<Path>,
        dest: &mut T,
    ) -> Result<(), Error> {
        load_file(path.as_ref(), dest, self.codec.as_ref(), &self.lock)
    }

    pub fn store<T: Serialize + ?Sized>(
        &self,
        path: impl AsRef<Path>,
        value: &T,
    ) -> Result<(), Error> {
        store_file(path.as_ref(), value, self.codec.as_ref(), &self.lock)
    }

    pub fn load_with_reader<R: Read, T: DeserializeOwned>(
        &self,
        mut reader: R,
        dest: &mut T,
    ) -> Result<(), Error> {
        load_from(&mut reader, dest, self.codec.as_ref(), &self.lock)
    }

    pub fn store_with_writer<W: Write, T: Serialize + ?Sized>(
        &self,
        mut writer: W,
        value: &T,
    ) -> Result<(), Error> {
        store_to(&mut writer, value, self.codec.as_ref(), &self.lock)
    }

    /// File handle sharing this configuration's codec and lock.
    pub fn file_storage(&self, path: impl Into<PathBuf>) -> FileStorage {
        FileStorage::new(path, Arc::clone(&self.codec), self.lock.clone())
    }

    /// Stream handle sharing this configuration's codec and lock.
    pub fn stream_storage<S: Read + Write>(&self, stream: S) -> StreamStorage<S> {
        StreamStorage::new(stream, Arc::clone(&self.codec), self.lock.clone())
    }
}

impl std::fmt::Debug for Endure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endure")
            .field("lock", &self.lock)
            .finish_non_exhaustive()
    }
}

/// Loads `path` with the default codec. A missing file reports `is_not_found()`.
pub fn load<T: DeserializeOwned>(path: impl AsRef<Path>, dest: &mut T) -> Result<(), Error> {
    Endure::global().load(path, dest)
}

/// Stores `value` into `path` (created or truncated) with the default codec.
pub fn store<T: Serialize + ?Sized>(path: impl AsRef<Path>, value: &T) -> Result<(), Error> {
    Endure::global().store(path, value)
}

pub fn load_with_reader<R: Read, T: DeserializeOwned>(
    reader: R,
    dest: &mut T,
) -> Result<(), Error> {
    Endure::global().load_with_reader(reader, dest)
}

pub fn store_with_writer<W: Write, T: Serialize + ?Sized>(
    writer: W,
    value: &T,
) -> Result<(), Error> {
    Endure::global().store_with_writer(writer, value)
}

/// Unwraps `result`, panicking with the error description on failure.
pub fn must<T>(result: Result<T, Error>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("{err}"),
    }
}
