//! Purpose: Hold the process-wide default codec used by the convenience functions.
//! Exports: `set_default_codec`, `default_codec`.
//! Role: One-time initialization seam; embedders pick an encoding at startup.
//! Invariants: The default is JSON until `set_default_codec` runs.
//! Invariants: The default can be set once, and only before it is first read.

use std::sync::{Arc, OnceLock};

use crate::core::codec::{Codec, Format};
use crate::core::error::{Error, ErrorKind};

static DEFAULT_CODEC: OnceLock<Arc<dyn Codec>> = OnceLock::new();

/// Replaces the JSON default for every later convenience call in this process.
///
/// Fails with `ErrorKind::Usage` if the default was already set, or already read by
/// a convenience call.
pub fn set_default_codec(codec: impl Codec + 'static) -> Result<(), Error> {
    let codec: Arc<dyn Codec> = Arc::new(codec);
    DEFAULT_CODEC.set(codec).map_err(|_| {
        Error::new(ErrorKind::Usage)
            .with_message("default codec is already initialized")
            .with_hint("Call set_default_codec once at startup, before any load or store.")
    })
}

pub fn default_codec() -> Arc<dyn Codec> {
    Arc::clone(DEFAULT_CODEC.get_or_init(|| Arc::new(Format::Json)))
}
