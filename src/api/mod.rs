//! Purpose: Define the public Rust API boundary for endure.
//! Exports: Storage handles, codecs, locks, errors, and the convenience functions.
//! Role: Public, additive-only surface; hides the internal core modules.
//! Invariants: This module is the only public path to storage primitives.
//! Invariants: Every load/store path routes through the core transport primitives.

mod convenience;
mod defaults;

pub use crate::core::codec::{Codec, FnCodec, Format};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::file::FileStorage;
pub use crate::core::lock::{Lock, LockMode};
pub use crate::core::storage::Storage;
pub use crate::core::stream::StreamStorage;
pub use crate::core::transport::{load_from, store_to};
pub use convenience::{Endure, load, load_with_reader, must, store, store_with_writer};
pub use defaults::{default_codec, set_default_codec};
