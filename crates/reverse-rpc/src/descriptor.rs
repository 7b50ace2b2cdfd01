//! Method and service descriptors for the `Reverse` service.
//!
//! A descriptor is immutable metadata about one method (name, call shape,
//! codecs) or the whole service. The service is declared exactly once, here;
//! clients, the dispatcher and any external registrar all consult the same
//! `&'static` descriptors.
//!
//! Each descriptor lives in its own [`OnceLock`] slot: the first caller
//! builds it, concurrent first callers block only on that slot, and every
//! later access is a lock-free read of the published reference. A caller can
//! never observe a partially built descriptor. Construction is static codec
//! wiring and cannot fail.

use reverse_core::Marshaller;
use reverse_core::proto::{Request, Response};
use std::sync::OnceLock;

/// The wire-visible service name.
pub const SERVICE_NAME: &str = "Reverse";

/// The calling convention of a method, tagged at the descriptor level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallShape {
    /// One request, one response.
    Unary,
    /// Both directions are independent message streams over one call.
    BidiStreaming,
}

/// Identifier for one method of the service.
///
/// The set is closed: the two variants are the whole service, and an
/// identifier outside it is unrepresentable. Extending the service means
/// adding a variant here *and* a handler arm in the dispatch table; the
/// compiler enforces that both stay in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodId {
    Do = 0,
    Stream = 1,
}

impl MethodId {
    /// Every method of the service, in descriptor order.
    pub const ALL: [MethodId; 2] = [MethodId::Do, MethodId::Stream];

    /// The descriptor this identifier names.
    pub fn descriptor(self) -> &'static MethodDescriptor<Request, Response> {
        match self {
            MethodId::Do => do_method(),
            MethodId::Stream => stream_method(),
        }
    }
}

/// Immutable metadata for a single RPC method.
///
/// Exactly one instance exists per method for the lifetime of the process;
/// all stubs and bindings share it by reference.
#[derive(Debug)]
pub struct MethodDescriptor<Req, Res> {
    service_name: &'static str,
    method_name: &'static str,
    path: String,
    call_shape: CallShape,
    request_codec: Marshaller<Req>,
    response_codec: Marshaller<Res>,
}

impl<Req, Res> MethodDescriptor<Req, Res> {
    pub fn new(
        service_name: &'static str,
        method_name: &'static str,
        call_shape: CallShape,
    ) -> Self {
        Self {
            service_name,
            method_name,
            // Full method name as it appears on the wire: `Service/Method`.
            path: format!("{service_name}/{method_name}"),
            call_shape,
            request_codec: Marshaller::new(),
            response_codec: Marshaller::new(),
        }
    }

    pub fn service_name(&self) -> &'static str {
        self.service_name
    }

    pub fn method_name(&self) -> &'static str {
        self.method_name
    }

    /// The full method path used for wire routing, e.g. `Reverse/Do`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn call_shape(&self) -> CallShape {
        self.call_shape
    }

    pub fn request_codec(&self) -> &Marshaller<Req> {
        &self.request_codec
    }

    pub fn response_codec(&self) -> &Marshaller<Res> {
        &self.response_codec
    }
}

/// Immutable metadata for the whole service: its name plus the closed set of
/// method descriptors. This is the handle external registration and
/// discovery mechanisms consult.
#[derive(Debug)]
pub struct ServiceDescriptor {
    name: &'static str,
    methods: [&'static MethodDescriptor<Request, Response>; 2],
}

impl ServiceDescriptor {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// All method descriptors, in [`MethodId`] order.
    pub fn methods(&self) -> &[&'static MethodDescriptor<Request, Response>; 2] {
        &self.methods
    }

    /// Resolves a wire path to a method identifier.
    ///
    /// Returns `None` for paths outside the service. Unknown paths are
    /// untrusted input, not a contract violation; the registrar edge rejects
    /// them with an `Unimplemented` status.
    pub fn lookup(&self, path: &str) -> Option<MethodId> {
        MethodId::ALL
            .into_iter()
            .find(|id| id.descriptor().path() == path)
    }
}

static DO_METHOD: OnceLock<MethodDescriptor<Request, Response>> = OnceLock::new();
static STREAM_METHOD: OnceLock<MethodDescriptor<Request, Response>> = OnceLock::new();
static SERVICE_DESCRIPTOR: OnceLock<ServiceDescriptor> = OnceLock::new();

/// Descriptor for the unary `Reverse/Do` method.
pub fn do_method() -> &'static MethodDescriptor<Request, Response> {
    DO_METHOD.get_or_init(|| MethodDescriptor::new(SERVICE_NAME, "Do", CallShape::Unary))
}

/// Descriptor for the bidirectional streaming `Reverse/Stream` method.
pub fn stream_method() -> &'static MethodDescriptor<Request, Response> {
    STREAM_METHOD
        .get_or_init(|| MethodDescriptor::new(SERVICE_NAME, "Stream", CallShape::BidiStreaming))
}

/// Descriptor for the whole `Reverse` service.
///
/// Built after both method descriptors exist; they are constructed
/// transitively on first demand.
pub fn service_descriptor() -> &'static ServiceDescriptor {
    SERVICE_DESCRIPTOR.get_or_init(|| ServiceDescriptor {
        name: SERVICE_NAME,
        methods: [do_method(), stream_method()],
    })
}
