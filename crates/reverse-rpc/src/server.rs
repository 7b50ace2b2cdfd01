//! Server-side contract and call dispatch for the `Reverse` service.
//!
//! An implementation overrides zero, one, or both methods of the [`Reverse`]
//! trait; anything left unoverridden answers every call with an
//! `Unimplemented` status through the call's normal failure channel, so a
//! partial implementation can be registered and probed without crashing
//! anything.
//!
//! [`bind_service`] turns an implementation into a [`ServiceBinding`]: the
//! service descriptor plus a fixed table mapping each [`MethodId`] to a
//! shape-tagged handler closure. The binding is what an external registrar
//! consumes to expose the service; it speaks encoded frames on the outside
//! and typed messages on the inside, applying the descriptor's codecs at the
//! edges.
//!
//! The handler table and the descriptor set are derived from the same
//! declaration, so an identifier resolving to a handler of the wrong shape
//! can only mean the two were edited inconsistently. That case panics; it is
//! an internal-consistency fault, not a runtime error.

use crate::ByteStream;
use crate::descriptor::{self, MethodId, ServiceDescriptor};
use bytes::Bytes;
use core::pin::Pin;
use futures::future::BoxFuture;
use futures::stream::{self, Stream, StreamExt};
use futures::FutureExt;
use reverse_core::proto::{Request, Response};
use std::sync::Arc;
use tonic::Status;

/// Inbound request stream handed to a streaming handler. Items arrive in the
/// order the peer sent them.
pub type RequestStream = Pin<Box<dyn Stream<Item = Result<Request, Status>> + Send>>;

/// Outbound response stream returned by a streaming handler. Items reach the
/// peer in emission order.
pub type ResponseStream = Pin<Box<dyn Stream<Item = Result<Response, Status>> + Send>>;

/// The `Reverse` service contract.
///
/// Both methods default to failing with `Unimplemented`.
#[tonic::async_trait]
pub trait Reverse: Send + Sync + 'static {
    /// Handles the unary `Reverse/Do` call: one request, one terminal
    /// completion (response or status).
    async fn r#do(&self, request: Request) -> Result<Response, Status> {
        let _ = request;
        Err(Status::unimplemented("Method Reverse/Do is not implemented"))
    }

    /// Handles the bidirectional `Reverse/Stream` call.
    ///
    /// The handler receives each inbound request in arrival order via
    /// `requests` and may emit responses at any time, independent of inbound
    /// timing, until its returned stream ends.
    async fn stream(&self, requests: RequestStream) -> Result<ResponseStream, Status> {
        drop(requests);
        Err(Status::unimplemented(
            "Method Reverse/Stream is not implemented",
        ))
    }
}

type UnaryHandler =
    Box<dyn Fn(Bytes) -> BoxFuture<'static, Result<Bytes, Status>> + Send + Sync>;
type StreamingHandler = Box<dyn Fn(ByteStream) -> ByteStream + Send + Sync>;

/// A handler closure tagged with the call shape it serves.
enum MethodHandler {
    Unary(UnaryHandler),
    BidiStreaming(StreamingHandler),
}

/// Opaque registration object binding one service implementation to the
/// service descriptor.
///
/// Cheap to build (references the already-cached descriptors) and immutable;
/// a registrar routes each inbound call through [`lookup`](Self::lookup) and
/// one of the two `call_*` entry points.
pub struct ServiceBinding {
    descriptor: &'static ServiceDescriptor,
    // Indexed by `MethodId` discriminant; construction order must match
    // `MethodId::ALL`.
    handlers: [MethodHandler; 2],
}

impl ServiceBinding {
    pub fn descriptor(&self) -> &'static ServiceDescriptor {
        self.descriptor
    }

    /// Resolves a wire path to a method identifier, or `None` for methods
    /// this service does not declare.
    pub fn lookup(&self, path: &str) -> Option<MethodId> {
        self.descriptor.lookup(path)
    }

    /// Invokes the unary handler registered for `id` with one encoded
    /// request frame.
    ///
    /// # Panics
    ///
    /// Panics if `id` names a streaming method: the dispatch table and the
    /// descriptor set disagree on the call shape, which is a broken build of
    /// this crate rather than anything a peer did.
    pub fn call_unary(&self, id: MethodId, request: Bytes) -> BoxFuture<'static, Result<Bytes, Status>> {
        tracing::debug!(method = id.descriptor().path(), "dispatching unary call");
        match &self.handlers[id as usize] {
            MethodHandler::Unary(handler) => handler(request),
            MethodHandler::BidiStreaming(_) => panic!(
                "dispatch table and service descriptor disagree: {id:?} is not a unary method"
            ),
        }
    }

    /// Invokes the streaming handler registered for `id`, connecting the
    /// inbound frame stream to the handler and returning its outbound frame
    /// stream.
    ///
    /// # Panics
    ///
    /// Panics if `id` names a unary method, for the same reason as
    /// [`call_unary`](Self::call_unary).
    pub fn call_streaming(&self, id: MethodId, requests: ByteStream) -> ByteStream {
        tracing::debug!(method = id.descriptor().path(), "dispatching streaming call");
        match &self.handlers[id as usize] {
            MethodHandler::BidiStreaming(handler) => handler(requests),
            MethodHandler::Unary(_) => panic!(
                "dispatch table and service descriptor disagree: {id:?} is not a streaming method"
            ),
        }
    }
}

/// Binds `service` to the service descriptor, producing the registration
/// object an external registrar consumes.
///
/// Each call builds a fresh binding over the same shared descriptors; the
/// binding holds the implementation behind an `Arc` and has no lifecycle of
/// its own.
pub fn bind_service<S: Reverse>(service: Arc<S>) -> ServiceBinding {
    let unary: UnaryHandler = {
        let service = Arc::clone(&service);
        let method = descriptor::do_method();
        Box::new(move |frame: Bytes| {
            let service = Arc::clone(&service);
            async move {
                let request = method.request_codec().decode(frame).map_err(Status::from)?;
                let response = service.r#do(request).await?;
                Ok(method.response_codec().encode(&response))
            }
            .boxed()
        })
    };

    let streaming: StreamingHandler = {
        let method = descriptor::stream_method();
        Box::new(move |frames: ByteStream| {
            let service = Arc::clone(&service);
            let requests: RequestStream = frames
                .map(move |frame| {
                    frame.and_then(|f| method.request_codec().decode(f).map_err(Status::from))
                })
                .boxed();

            // The handler itself is async; surface its outcome as the head
            // of the outbound stream. A handler error becomes the stream's
            // single terminal item.
            let responses = stream::once(async move {
                match service.stream(requests).await {
                    Ok(responses) => responses,
                    Err(status) => stream::iter([Err(status)]).boxed(),
                }
            })
            .flatten();

            responses
                .map(move |item| item.map(|response| method.response_codec().encode(&response)))
                .boxed()
        })
    };

    ServiceBinding {
        descriptor: descriptor::service_descriptor(),
        handlers: [MethodHandler::Unary(unary), MethodHandler::BidiStreaming(streaming)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use tonic::Code;

    /// Implementation that overrides nothing.
    struct Unimplemented;
    impl Reverse for Unimplemented {}

    fn encode_request(data: &str) -> Bytes {
        descriptor::do_method().request_codec().encode(&Request {
            data: data.to_string(),
        })
    }

    #[test]
    fn test_unimplemented_unary_fails_through_status_channel() {
        let binding = bind_service(Arc::new(Unimplemented));
        let err = block_on(binding.call_unary(MethodId::Do, encode_request("abcd"))).unwrap_err();
        assert_eq!(err.code(), Code::Unimplemented);
    }

    #[test]
    fn test_unimplemented_streaming_yields_single_terminal_failure() {
        let binding = bind_service(Arc::new(Unimplemented));
        let inbound: ByteStream = stream::iter(
            ["ab", "xyz", "q"].map(|data| Ok(encode_request(data))),
        )
        .boxed();

        let items = block_on(binding.call_streaming(MethodId::Stream, inbound).collect::<Vec<_>>());
        assert_eq!(items.len(), 1, "expected no responses, one failure");
        assert_eq!(items[0].as_ref().unwrap_err().code(), Code::Unimplemented);
    }

    #[test]
    #[should_panic(expected = "not a unary method")]
    fn test_unary_dispatch_of_streaming_id_is_fatal() {
        let binding = bind_service(Arc::new(Unimplemented));
        let _ = binding.call_unary(MethodId::Stream, encode_request("abcd"));
    }

    #[test]
    #[should_panic(expected = "not a streaming method")]
    fn test_streaming_dispatch_of_unary_id_is_fatal() {
        let binding = bind_service(Arc::new(Unimplemented));
        let _ = binding.call_streaming(MethodId::Do, stream::empty().boxed());
    }

    #[test]
    fn test_overridden_unary_reverses_payload() {
        struct Impl;
        #[tonic::async_trait]
        impl Reverse for Impl {
            async fn r#do(&self, request: Request) -> Result<Response, Status> {
                Ok(Response {
                    data: request.data.chars().rev().collect(),
                })
            }
        }

        let binding = bind_service(Arc::new(Impl));
        let frame = block_on(binding.call_unary(MethodId::Do, encode_request("abcd"))).unwrap();
        let response = descriptor::do_method()
            .response_codec()
            .decode(frame)
            .unwrap();
        assert_eq!(response.data, "dcba");
    }

    #[test]
    fn test_corrupt_unary_frame_surfaces_internal_status() {
        struct Impl;
        #[tonic::async_trait]
        impl Reverse for Impl {
            async fn r#do(&self, _request: Request) -> Result<Response, Status> {
                Ok(Response::default())
            }
        }

        let binding = bind_service(Arc::new(Impl));
        let err = block_on(
            binding.call_unary(MethodId::Do, Bytes::from_static(&[0xff, 0xff])),
        )
        .unwrap_err();
        assert_eq!(err.code(), Code::Internal);
    }
}
