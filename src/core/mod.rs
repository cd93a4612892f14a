// Core modules implementing codecs, locking, transport, backends, and error modeling.
pub mod codec;
pub mod error;
pub mod file;
pub mod lock;
pub mod storage;
pub mod stream;
pub mod transport;
pub mod xml;
