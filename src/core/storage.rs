// The load/store contract implemented by every backend.
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::core::error::Error;

/// A place a value can be stored into and loaded back from.
///
/// Calls on one handle are serialized by the handle's lock. A failed `load` leaves
/// `dest` as it was.
pub trait Storage {
    /// Reads the whole payload and decodes it into `dest`. Nothing stored yet is an
    /// error with `is_not_found()`.
    fn load<T: DeserializeOwned>(&self, dest: &mut T) -> Result<(), Error>;

    /// Encodes `value` and writes it in one piece. A write that fails partway is not
    /// rolled back.
    fn store<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), Error>;
}
