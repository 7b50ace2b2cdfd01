//! Client-side stubs for the `Reverse` service.
//!
//! Three calling conventions are exposed over the same two methods:
//!
//! - [`ReverseClient`] — async; unary calls are `async fn`, the streaming
//!   call hands back a request sink and a response stream immediately.
//! - [`ReverseBlockingClient`] — synchronous; the calling thread suspends
//!   until the unary call completes. There is no blocking form of the
//!   streaming method: a bidirectional stream has no single synchronous
//!   return to block on.
//! - [`ReverseFutureClient`] — unary calls return a named [`ResponseFuture`]
//!   immediately, for composition with other asynchronous work.
//!
//! All three are thin adapters over one private stub core holding the
//! `(channel, options)` pair; they are independently constructible from the
//! same pair, share no mutable state, and every invocation opens a fresh
//! call on the channel.

use crate::ByteStream;
use crate::descriptor::{self, MethodDescriptor};
use bytes::Bytes;
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};
use core::time::Duration;
use futures::FutureExt;
use futures::future::BoxFuture;
use futures::stream::StreamExt;
use reverse_core::Error;
use reverse_core::proto::{Request, Response};
use tokio::sync::mpsc;
use tonic::Status;

/// Per-stub call options, threaded through to the transport on every call.
///
/// The transport owns their interpretation; this layer only carries them.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    deadline: Option<Duration>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upper bound on how long a call may remain outstanding.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }
}

/// The transport seam this layer calls into, never implements.
///
/// A channel moves encoded frames for one call; codecs, retries and
/// connection management are the implementor's concern. Method metadata
/// arrives as the shared `&'static` descriptor so the transport can route
/// and tag the call without re-deriving anything.
pub trait Channel: Send + Sync {
    /// Starts a unary call, resolving to the encoded response frame.
    fn unary(
        &self,
        method: &'static MethodDescriptor<Request, Response>,
        options: CallOptions,
        request: Bytes,
    ) -> BoxFuture<'static, Result<Bytes, Status>>;

    /// Opens a bidirectional streaming call, returning the request-frame
    /// sink and the response-frame stream. Either side may close its
    /// direction independently.
    fn streaming(
        &self,
        method: &'static MethodDescriptor<Request, Response>,
        options: CallOptions,
    ) -> Result<(mpsc::Sender<Bytes>, ByteStream), Status>;
}

/// Shared stub core: the `(channel, options)` binding plus the two call
/// primitives every calling convention is built from.
#[derive(Debug, Clone)]
struct Stub<C> {
    channel: C,
    options: CallOptions,
}

impl<C: Channel> Stub<C> {
    fn invoke_unary(
        &self,
        method: &'static MethodDescriptor<Request, Response>,
        request: Request,
    ) -> BoxFuture<'static, Result<Response, Status>> {
        let frame = method.request_codec().encode(&request);
        let call = self.channel.unary(method, self.options.clone(), frame);
        async move {
            let frame = call.await?;
            method.response_codec().decode(frame).map_err(Status::from)
        }
        .boxed()
    }

    fn invoke_stream(
        &self,
        method: &'static MethodDescriptor<Request, Response>,
    ) -> Result<(RequestSink, ResponseStream), Status> {
        let (frames_tx, frames) = self.channel.streaming(method, self.options.clone())?;
        let responses = frames
            .map(move |frame| {
                frame.and_then(|f| method.response_codec().decode(f).map_err(Status::from))
            })
            .boxed();
        Ok((
            RequestSink {
                frames: frames_tx,
                method,
            },
            responses,
        ))
    }
}

/// Typed responses arriving from the peer, in the order it emitted them.
pub type ResponseStream = Pin<Box<dyn futures::Stream<Item = Result<Response, Status>> + Send>>;

/// Write half of an open streaming call.
///
/// Requests are delivered to the peer in push order. Dropping the sink (or
/// calling [`close`](Self::close)) half-closes the outbound direction; the
/// response stream remains readable until the peer finishes its side.
pub struct RequestSink {
    frames: mpsc::Sender<Bytes>,
    method: &'static MethodDescriptor<Request, Response>,
}

impl RequestSink {
    /// Pushes one request onto the outbound direction.
    ///
    /// Fails once the call is terminated or the peer has closed the inbound
    /// side.
    pub async fn send(&self, request: Request) -> Result<(), Status> {
        let frame = self.method.request_codec().encode(&request);
        self.frames.send(frame).await.map_err(|_| {
            Status::from(Error::ChannelError {
                context: "request stream closed by the peer".to_string(),
            })
        })
    }

    /// Half-closes the outbound direction.
    pub fn close(self) {}
}

/// Unary response handle returned by [`ReverseFutureClient`].
///
/// Resolves to the response or the call's failure; the caller is never
/// suspended until it awaits (or polls) the handle.
pub struct ResponseFuture {
    inner: BoxFuture<'static, Result<Response, Status>>,
}

impl Future for ResponseFuture {
    type Output = Result<Response, Status>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}

/// Async stub for the `Reverse` service.
#[derive(Debug, Clone)]
pub struct ReverseClient<C> {
    inner: Stub<C>,
}

impl<C: Channel> ReverseClient<C> {
    pub fn new(channel: C) -> Self {
        Self::with_options(channel, CallOptions::default())
    }

    pub fn with_options(channel: C, options: CallOptions) -> Self {
        Self {
            inner: Stub { channel, options },
        }
    }

    /// Invokes the unary `Reverse/Do` call.
    pub async fn r#do(&self, request: Request) -> Result<Response, Status> {
        self.inner
            .invoke_unary(descriptor::do_method(), request)
            .await
    }

    /// Opens the bidirectional `Reverse/Stream` call.
    ///
    /// Returns immediately with the request sink and response stream; the
    /// caller pushes and reads at whatever pace it likes.
    pub fn stream(&self) -> Result<(RequestSink, ResponseStream), Status> {
        self.inner.invoke_stream(descriptor::stream_method())
    }
}

/// Blocking stub for the `Reverse` service.
///
/// Must not be used from within an async task: it parks the calling thread
/// until the call completes.
#[derive(Debug, Clone)]
pub struct ReverseBlockingClient<C> {
    inner: Stub<C>,
}

impl<C: Channel> ReverseBlockingClient<C> {
    pub fn new(channel: C) -> Self {
        Self::with_options(channel, CallOptions::default())
    }

    pub fn with_options(channel: C, options: CallOptions) -> Self {
        Self {
            inner: Stub { channel, options },
        }
    }

    /// Invokes the unary `Reverse/Do` call, suspending the calling thread
    /// until the response or failure arrives.
    pub fn r#do(&self, request: Request) -> Result<Response, Status> {
        futures::executor::block_on(self.inner.invoke_unary(descriptor::do_method(), request))
    }
}

/// Future stub for the `Reverse` service.
#[derive(Debug, Clone)]
pub struct ReverseFutureClient<C> {
    inner: Stub<C>,
}

impl<C: Channel> ReverseFutureClient<C> {
    pub fn new(channel: C) -> Self {
        Self::with_options(channel, CallOptions::default())
    }

    pub fn with_options(channel: C, options: CallOptions) -> Self {
        Self {
            inner: Stub { channel, options },
        }
    }

    /// Starts the unary `Reverse/Do` call, returning a handle that resolves
    /// once the call completes.
    pub fn r#do(&self, request: Request) -> ResponseFuture {
        ResponseFuture {
            inner: self.inner.invoke_unary(descriptor::do_method(), request),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use futures::stream;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tonic::Code;

    /// Channel that answers every unary call with a fixed response and
    /// counts how many calls were opened.
    #[derive(Clone)]
    struct FixedChannel {
        response: Bytes,
        calls: Arc<AtomicUsize>,
    }

    impl FixedChannel {
        fn respond_with(data: &str) -> Self {
            let frame = descriptor::do_method().response_codec().encode(&Response {
                data: data.to_string(),
            });
            Self {
                response: frame,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl Channel for FixedChannel {
        fn unary(
            &self,
            _method: &'static MethodDescriptor<Request, Response>,
            _options: CallOptions,
            _request: Bytes,
        ) -> BoxFuture<'static, Result<Bytes, Status>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let response = self.response.clone();
            async move { Ok(response) }.boxed()
        }

        fn streaming(
            &self,
            _method: &'static MethodDescriptor<Request, Response>,
            _options: CallOptions,
        ) -> Result<(mpsc::Sender<Bytes>, ByteStream), Status> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (tx, _rx) = mpsc::channel(1);
            Ok((tx, stream::empty().boxed()))
        }
    }

    #[test]
    fn test_three_conventions_over_one_channel() {
        let channel = FixedChannel::respond_with("dcba");
        let request = Request {
            data: "abcd".to_string(),
        };

        let async_client = ReverseClient::new(channel.clone());
        let blocking_client = ReverseBlockingClient::new(channel.clone());
        let future_client = ReverseFutureClient::new(channel.clone());

        let from_async = block_on(async_client.r#do(request.clone())).unwrap();
        let from_blocking = blocking_client.r#do(request.clone()).unwrap();
        let from_future = block_on(future_client.r#do(request)).unwrap();

        assert_eq!(from_async.data, "dcba");
        assert_eq!(from_blocking.data, "dcba");
        assert_eq!(from_future.data, "dcba");

        // One fresh underlying call per invocation.
        assert_eq!(channel.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_corrupt_response_frame_surfaces_internal_status() {
        let channel = FixedChannel {
            response: Bytes::from_static(&[0xff, 0xff, 0xff]),
            calls: Arc::new(AtomicUsize::new(0)),
        };
        let client = ReverseBlockingClient::new(channel);
        let err = client.r#do(Request::default()).unwrap_err();
        assert_eq!(err.code(), Code::Internal);
    }

    #[test]
    fn test_call_options_deadline_round_trip() {
        let options = CallOptions::new().with_deadline(Duration::from_secs(5));
        assert_eq!(options.deadline(), Some(Duration::from_secs(5)));
        assert_eq!(CallOptions::default().deadline(), None);
    }
}
