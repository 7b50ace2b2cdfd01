//! Error types for the `Reverse` contract layer.
//!
//! This module defines the central `Error` enum for failures that originate
//! inside the contract layer itself, as opposed to failures a remote peer
//! reports. It implements `From<Error>` for `tonic::Status` so every failure
//! reaches the caller through the call's normal failure channel with an
//! appropriate status code.
//!
//! ## Error Cases
//! - `Decode`: a binary frame could not be decoded into its message type.
//! - `ChannelError`: an internal send/receive failure between the two halves
//!   of a call (e.g. the peer dropped its end).
//! - `Cancelled`: the call was torn down before a result arrived.

use tonic::Status;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the contract layer.
#[derive(Clone, thiserror::Error, Debug)]
pub enum Error {
    /// A frame failed to decode into its protobuf message.
    #[error("Decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    /// Internal channel send/receive failure (e.g. closed channel).
    #[error("Channel error: {context}")]
    ChannelError { context: String },

    /// The call was cancelled before completion.
    #[error("Call cancelled")]
    Cancelled,
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::Decode(e) => Status::internal(format!("Failed to decode message: {e}")),
            Error::ChannelError { context } => {
                Status::internal(format!("Channel error: {context}"))
            }
            Error::Cancelled => Status::cancelled("Call was cancelled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Code;

    #[test]
    fn test_status_codes() {
        let status: Status = Error::Cancelled.into();
        assert_eq!(status.code(), Code::Cancelled);

        let status: Status = Error::ChannelError {
            context: "response stream closed".to_string(),
        }
        .into();
        assert_eq!(status.code(), Code::Internal);
    }
}
