//! Binary codec for protobuf messages.
//!
//! The contract layer never serializes anything itself; it holds a
//! [`Marshaller`] per message type inside each method descriptor and calls
//! into it at the edges of a call. Serialization is delegated entirely to
//! `prost`.

use crate::common::error::{Error, Result};
use bytes::Bytes;
use core::marker::PhantomData;
use prost::Message;

/// A typed handle over the `prost` encode/decode pair for one message type.
///
/// A `Marshaller<T>` carries no state; it exists so that a method descriptor
/// can reference its request and response codecs as values, keyed by message
/// type at compile time.
pub struct Marshaller<T> {
    _message: PhantomData<fn() -> T>,
}

impl<T> Marshaller<T> {
    pub const fn new() -> Self {
        Self {
            _message: PhantomData,
        }
    }
}

impl<T> Default for Marshaller<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Marshaller<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> core::fmt::Debug for Marshaller<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Marshaller<{}>", core::any::type_name::<T>())
    }
}

impl<T: Message + Default> Marshaller<T> {
    /// Encodes `message` into a contiguous binary frame.
    pub fn encode(&self, message: &T) -> Bytes {
        Bytes::from(message.encode_to_vec())
    }

    /// Decodes one binary frame into a message.
    ///
    /// A malformed frame surfaces as [`Error::Decode`], which maps to an
    /// `Internal` status when forwarded to a caller.
    pub fn decode(&self, frame: Bytes) -> Result<T> {
        T::decode(frame).map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{Request, Response};

    #[test]
    fn test_encode_decode_request() {
        let marshaller = Marshaller::<Request>::new();
        let frame = marshaller.encode(&Request {
            data: "abcd".to_string(),
        });
        let decoded = marshaller.decode(frame).unwrap();
        assert_eq!(decoded.data, "abcd");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let marshaller = Marshaller::<Response>::new();
        // 0xff is not a valid field key byte.
        let err = marshaller
            .decode(Bytes::from_static(&[0xff, 0xff, 0xff]))
            .unwrap_err();
        assert!(matches!(err, Error::Decode(_)), "got {err:?}");
    }
}
