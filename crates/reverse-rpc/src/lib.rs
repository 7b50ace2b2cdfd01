#![doc = include_str!("../README.md")]

pub mod client;
pub mod descriptor;
pub mod local;
pub mod server;

pub use client::{
    CallOptions, Channel, ReverseBlockingClient, ReverseClient, ReverseFutureClient,
};
pub use descriptor::{
    CallShape, MethodDescriptor, MethodId, SERVICE_NAME, ServiceDescriptor, do_method,
    service_descriptor, stream_method,
};
pub use server::{Reverse, ServiceBinding, bind_service};

// Public re-export so downstream crates can access the message types via
// `reverse_rpc::reverse_core`
pub use reverse_core;

use bytes::Bytes;
use core::pin::Pin;
use futures::Stream;
use tonic::Status;

/// A stream of encoded message frames, the wire-level view of one direction
/// of a call. Both the [`Channel`] seam and [`ServiceBinding`] speak this
/// type; codecs are applied only at the typed edges.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, Status>> + Send>>;
