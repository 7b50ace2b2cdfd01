//! Message types for the `Reverse` service contract.
//!
//! These mirror the `Request` and `Response` messages from
//! `microservice.proto`. They are written out by hand with `prost` derives
//! rather than generated by a build script, so the crate builds without
//! `protoc` on the host. The contract layer treats both messages as opaque
//! payloads; only the `data` field is meaningful to the echo scenarios used
//! in tests.

/// A single request to the `Reverse` service.
///
/// Sent once for the unary `Do` call, or repeatedly over the inbound half of
/// a `Stream` call.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Request {
    /// The payload the service operates on.
    #[prost(string, tag = "1")]
    pub data: ::prost::alloc::string::String,
}

/// A single response from the `Reverse` service.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Response {
    /// The payload produced by the service.
    #[prost(string, tag = "1")]
    pub data: ::prost::alloc::string::String,
}
