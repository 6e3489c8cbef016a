//! Request execution for probes.
//!
//! The prober never opens connections itself. It hands a finished
//! request to a [`Transport`] and gets back a response with the body
//! already buffered. [`HttpTransport`] is the default, a pooled hyper
//! client for plain HTTP.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{Request, Response};
use http_body_util::{BodyExt, Empty};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use tracing::trace;

/// Error produced when a round trip cannot complete.
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// A probe request. Probes are always body-less GETs.
pub type ProbeRequest = Request<Empty<Bytes>>;

/// Default dial timeout for [`HttpTransport`].
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Executes one HTTP round trip.
///
/// Implementations must be safe to share across concurrent probe loops.
/// Dropping the returned future abandons the request.
pub trait Transport: Send + Sync {
    fn round_trip(
        &self,
        req: ProbeRequest,
    ) -> impl Future<Output = Result<Response<Bytes>, TransportError>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn round_trip(
        &self,
        req: ProbeRequest,
    ) -> impl Future<Output = Result<Response<Bytes>, TransportError>> + Send {
        (**self).round_trip(req)
    }
}

/// Pooled HTTP/1 client transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client<HttpConnector, Empty<Bytes>>,
}

impl HttpTransport {
    /// Create a transport with the default dial timeout.
    pub fn new() -> Self {
        Self::with_connect_timeout(DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a transport that gives up dialing after `timeout`.
    pub fn with_connect_timeout(timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(timeout));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn round_trip(
        &self,
        req: ProbeRequest,
    ) -> impl Future<Output = Result<Response<Bytes>, TransportError>> + Send {
        async move {
            let uri = req.uri().clone();
            let resp = self.client.request(req).await?;
            let (parts, body) = resp.into_parts();
            let body = body.collect().await?.to_bytes();
            trace!(%uri, status = %parts.status, bytes = body.len(), "probe round trip complete");
            Ok::<_, TransportError>(Response::from_parts(parts, body))
        }
    }
}
