// Stream-backed storage over a caller-supplied, already open byte stream.
use std::io::{Read, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::core::codec::{Codec, Format};
use crate::core::error::Error;
use crate::core::lock::Lock;
use crate::core::storage::Storage;
use crate::core::transport::{encode, load_from, write_payload};

/// Storage over any `Read + Write` stream: a socket, a pipe, a `VecDeque<u8>` buffer.
///
/// The whole stream content of one call is the payload; nothing is framed. The
/// handle never opens or closes the stream. Pass `&mut stream` to keep ownership,
/// or hand the stream over and take it back with [`StreamStorage::into_inner`].
pub struct StreamStorage<S> {
    // Interior mutability only; held for I/O, never while encoding. Exclusion between
    // handles comes from `lock`.
    stream: Mutex<S>,
    codec: Arc<dyn Codec>,
    lock: Lock,
}

impl<S: Read + Write> StreamStorage<S> {
    /// Handle over `stream` using `codec`; share `lock` to serialize with other handles.
    pub fn new(stream: S, codec: Arc<dyn Codec>, lock: Lock) -> Self {
        Self {
            stream: Mutex::new(stream),
            codec,
            lock,
        }
    }

    /// Handle using a built-in format and its own private lock.
    pub fn with_format(stream: S, format: Format) -> Self {
        Self::new(stream, Arc::new(format), Lock::private())
    }

    pub fn lock(&self) -> &Lock {
        &self.lock
    }

    pub fn get_mut(&mut self) -> &mut S {
        self.stream.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn into_inner(self) -> S {
        self.stream.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn stream(&self) -> MutexGuard<'_, S> {
        self.stream.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: Read + Write> Storage for StreamStorage<S> {
    fn load<T: DeserializeOwned>(&self, dest: &mut T) -> Result<(), Error> {
        let mut stream = self.stream();
        load_from(&mut *stream, dest, self.codec.as_ref(), &self.lock)
    }

    fn store<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), Error> {
        let buf = encode(value, self.codec.as_ref())?;
        let mut stream = self.stream();
        write_payload(&mut *stream, &buf, &self.lock)
    }
}

impl<S> std::fmt::Debug for StreamStorage<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamStorage")
            .field("lock", &self.lock)
            .finish_non_exhaustive()
    }
}
