//! In-process channel over a service binding.
//!
//! [`LocalChannel`] implements the client-side [`Channel`] seam by routing
//! calls directly into a [`ServiceBinding`] — no network, no serialization
//! shortcut (frames still round-trip through the codecs), and no background
//! tasks: calls are demand-driven, so the whole loop runs wherever the
//! caller polls it. This is the transport stand-in used by the contract
//! tests and by embedded deployments that host client and service in one
//! process.

use crate::ByteStream;
use crate::client::{CallOptions, Channel};
use crate::descriptor::MethodDescriptor;
use crate::server::ServiceBinding;
use bytes::Bytes;
use futures::FutureExt;
use futures::future::{self, BoxFuture};
use futures::stream::{self, StreamExt};
use reverse_core::Error;
use reverse_core::proto::{Request, Response};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tonic::Status;

/// Outbound frames buffered per streaming call before the sender is asked
/// to wait for the handler to catch up.
const DEFAULT_STREAM_BUFFER: usize = 64;

/// A [`Channel`] that dispatches into a bound service in the same process.
///
/// Cloning is cheap and every clone shares the same binding and shutdown
/// state. [`close`](Self::close) cancels the channel: calls in flight fail
/// with a `Cancelled` status instead of leaving suspended callers hanging,
/// and new calls fail the same way.
#[derive(Clone)]
pub struct LocalChannel {
    binding: Arc<ServiceBinding>,
    shutdown: CancellationToken,
    stream_buffer: usize,
}

impl LocalChannel {
    pub fn new(binding: ServiceBinding) -> Self {
        Self::with_buffer(binding, DEFAULT_STREAM_BUFFER)
    }

    pub fn with_buffer(binding: ServiceBinding, stream_buffer: usize) -> Self {
        Self {
            binding: Arc::new(binding),
            shutdown: CancellationToken::new(),
            stream_buffer,
        }
    }

    /// Tears the channel down, failing pending and future calls with
    /// `Cancelled`.
    pub fn close(&self) {
        self.shutdown.cancel();
    }

    fn reject_unknown(&self, path: &str) -> Status {
        tracing::warn!(method = path, "rejecting call to unknown method");
        Status::unimplemented(format!("Unknown method {path}"))
    }
}

impl Channel for LocalChannel {
    fn unary(
        &self,
        method: &'static MethodDescriptor<Request, Response>,
        _options: CallOptions,
        request: Bytes,
    ) -> BoxFuture<'static, Result<Bytes, Status>> {
        let Some(id) = self.binding.lookup(method.path()) else {
            let status = self.reject_unknown(method.path());
            return future::ready(Err(status)).boxed();
        };

        let call = self.binding.call_unary(id, request);
        let shutdown = self.shutdown.clone();
        async move {
            tokio::select! {
                _ = shutdown.cancelled() => Err(Error::Cancelled.into()),
                result = call => result,
            }
        }
        .boxed()
    }

    fn streaming(
        &self,
        method: &'static MethodDescriptor<Request, Response>,
        _options: CallOptions,
    ) -> Result<(mpsc::Sender<Bytes>, ByteStream), Status> {
        let id = self
            .binding
            .lookup(method.path())
            .ok_or_else(|| self.reject_unknown(method.path()))?;

        let (frames_tx, frames_rx) = mpsc::channel(self.stream_buffer);
        let inbound: ByteStream = ReceiverStream::new(frames_rx).map(Ok).boxed();
        let outbound = self.binding.call_streaming(id, inbound);

        // End the stream on channel shutdown and surface the cancellation as
        // its terminal item, so readers observe a failure rather than a
        // quiet end.
        let shutdown = self.shutdown.clone();
        let was_cancelled = self.shutdown.clone();
        let outbound = outbound
            .take_until(shutdown.cancelled_owned())
            .chain(
                stream::once(async move {
                    if was_cancelled.is_cancelled() {
                        let status: Status = Error::Cancelled.into();
                        Some(Err(status))
                    } else {
                        None
                    }
                })
                .filter_map(|item| async move { item }),
            )
            .boxed();

        Ok((frames_tx, outbound))
    }
}
