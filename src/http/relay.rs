//! Streaming relay between a client exchange and a backend exchange.
//!
//! # Responsibilities
//! - Build the outbound request: method, rewritten URI, client headers verbatim
//! - Pipe request and response bodies frame by frame, never collecting them
//! - Copy backend status, reason phrase and headers to the client response
//! - Map connect and transport failures to a single `500` answer
//!
//! # Design Decisions
//! - Framing headers are dropped on both legs so hyper re-frames the unknown
//!   length body as chunked; responses to `HEAD` and `204`/`304` keep them
//! - Pull-based: a frame is read from the producer only when the consumer's
//!   writer asks for the next one, so a slow peer stalls the other side
//!   instead of filling a buffer
//! - Dropping a [`RelayBody`] drops the body it wraps; a client that goes away
//!   tears down the backend exchange with it
//! - No retries

use std::pin::Pin;
use std::task::{ready, Context, Poll};
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    BoxError,
};
use hyper::body::{Body as HttpBody, Frame, SizeHint};

use crate::backend::{ConnectionLease, PoolClosed};
use crate::config::RelaySettings;
use crate::routing::Forward;

/// Per-exchange relay progress.
///
/// `Idle → HeadersSent → Streaming → Completed`, or `Failed` from any
/// non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    /// Nothing has been relayed yet.
    Idle,
    /// The backend response head has been handed to the client side.
    HeadersSent,
    /// At least one body frame has been relayed.
    Streaming,
    /// The body ended normally.
    Completed,
    /// A transport error ended the exchange.
    Failed,
}

/// Error type for upstream exchanges.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("{}", describe(.0))]
    Upstream(#[from] hyper_util::client::legacy::Error),

    #[error("backend did not answer within {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Pool(#[from] PoolClosed),

    #[error("invalid upstream request: {0}")]
    Request(#[from] axum::http::Error),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

/// Render an error with its chain of causes.
fn describe(err: &(dyn std::error::Error + 'static)) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

/// Strip headers that describe the original framing.
fn strip_framing(headers: &mut HeaderMap) {
    headers.remove(header::CONTENT_LENGTH);
    headers.remove(header::TRANSFER_ENCODING);
}

/// Responses that never carry a body keep the backend's advertised length.
fn response_has_body(method: &Method, status: StatusCode) -> bool {
    method != Method::HEAD
        && status != StatusCode::NO_CONTENT
        && status != StatusCode::NOT_MODIFIED
        && !status.is_informational()
}

/// Relays exchanges to resolved backends.
#[derive(Debug, Clone)]
pub struct Relay {
    response_timeout: Option<Duration>,
}

impl Relay {
    pub fn new(settings: &RelaySettings) -> Self {
        Self {
            response_timeout: settings.response_timeout,
        }
    }

    /// Relay `request` to the backend chosen by the dispatcher.
    ///
    /// Never fails: upstream errors become a `500` carrying the error text.
    pub async fn forward(
        &self,
        forward: Forward<'_>,
        request: Request<Body>,
        request_id: &str,
    ) -> Response {
        let original_uri = request.uri().clone();
        let span = tracing::debug_span!(
            "relay",
            request_id = %request_id,
            backend = %forward.backend.label(),
            uri = %original_uri,
        );

        match self.exchange(forward, request, span).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    request_id = %request_id,
                    uri = %original_uri,
                    state = ?RelayState::Failed,
                    error = %e,
                    "Problem with requesting proxied resource"
                );
                e.into_response()
            }
        }
    }

    async fn exchange(
        &self,
        forward: Forward<'_>,
        request: Request<Body>,
        span: tracing::Span,
    ) -> Result<Response, RelayError> {
        let Forward {
            backend,
            path_and_query,
        } = forward;

        let lease = backend.pool().acquire().await?;
        let uri = backend.upstream_uri(&path_and_query)?;

        let (parts, body) = request.into_parts();
        let method = parts.method.clone();
        let mut headers = parts.headers;
        strip_framing(&mut headers);

        let body = if body.is_end_stream() {
            Body::empty()
        } else {
            Body::new(RelayBody::upstream(body, span.clone()))
        };
        let mut outbound = Request::builder().method(parts.method).uri(uri).body(body)?;
        *outbound.headers_mut() = headers;

        tracing::debug!(
            parent: &span,
            path = %path_and_query,
            in_use = backend.pool().in_use(),
            "Forwarding to backend"
        );

        let pending = backend.pool().client().request(outbound);
        let response = match self.response_timeout {
            Some(limit) => tokio::time::timeout(limit, pending)
                .await
                .map_err(|_| RelayError::Timeout(limit))??,
            None => pending.await?,
        };

        // Status, reason phrase (an extension) and headers carry over as-is.
        let (mut parts, incoming) = response.into_parts();
        if response_has_body(&method, parts.status) {
            strip_framing(&mut parts.headers);
        }
        tracing::debug!(parent: &span, status = %parts.status, "Backend responded");

        let body = RelayBody::downstream(incoming, span).with_lease(lease);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

/// Which leg of the exchange a [`RelayBody`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Client request body to the backend.
    Upstream,
    /// Backend response body to the client.
    Downstream,
}

/// A body that forwards frames of `B` unchanged while tracking relay state.
///
/// Reports an unknown size so the writer always uses chunked framing.
#[derive(Debug)]
pub struct RelayBody<B> {
    inner: B,
    direction: Direction,
    state: RelayState,
    bytes: u64,
    span: tracing::Span,
    _lease: Option<ConnectionLease>,
}

impl<B> RelayBody<B> {
    /// Wrap a client request body; nothing has been sent yet.
    pub fn upstream(inner: B, span: tracing::Span) -> Self {
        Self::new(inner, Direction::Upstream, RelayState::Idle, span)
    }

    /// Wrap a backend response body whose head was already relayed.
    pub fn downstream(inner: B, span: tracing::Span) -> Self {
        Self::new(inner, Direction::Downstream, RelayState::HeadersSent, span)
    }

    fn new(inner: B, direction: Direction, state: RelayState, span: tracing::Span) -> Self {
        Self {
            inner,
            direction,
            state,
            bytes: 0,
            span,
            _lease: None,
        }
    }

    /// Hold a pool slot until this body is finished or dropped.
    pub fn with_lease(mut self, lease: ConnectionLease) -> Self {
        self._lease = Some(lease);
        self
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    /// Data bytes relayed so far.
    pub fn bytes_relayed(&self) -> u64 {
        self.bytes
    }

    fn is_finished(&self) -> bool {
        matches!(self.state, RelayState::Completed | RelayState::Failed)
    }
}

impl<B> HttpBody for RelayBody<B>
where
    B: HttpBody<Data = Bytes> + Unpin,
    B::Error: Into<BoxError>,
{
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        if this.is_finished() {
            return Poll::Ready(None);
        }

        match ready!(Pin::new(&mut this.inner).poll_frame(cx)) {
            Some(Ok(frame)) => {
                if let Some(data) = frame.data_ref() {
                    this.bytes += data.len() as u64;
                }
                this.state = RelayState::Streaming;
                Poll::Ready(Some(Ok(frame)))
            }
            Some(Err(e)) => {
                let e: BoxError = e.into();
                this.state = RelayState::Failed;
                tracing::warn!(
                    parent: &this.span,
                    direction = ?this.direction,
                    bytes = this.bytes,
                    error = %e,
                    "Relay failed mid-stream"
                );
                Poll::Ready(Some(Err(e)))
            }
            None => {
                this.state = RelayState::Completed;
                tracing::trace!(
                    parent: &this.span,
                    direction = ?this.direction,
                    bytes = this.bytes,
                    "Relay completed"
                );
                Poll::Ready(None)
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.state == RelayState::Completed
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::default()
    }
}

impl<B> Drop for RelayBody<B> {
    fn drop(&mut self) {
        if self.state == RelayState::Streaming {
            tracing::debug!(
                parent: &self.span,
                direction = ?self.direction,
                bytes = self.bytes,
                "Peer went away, relay aborted"
            );
        }
    }
}
