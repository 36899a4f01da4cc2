//! Transport seam and the ureq-backed implementation.
//!
//! # Design
//! `Transport` is the only place that performs I/O. It receives a fully built
//! `HttpRequest` and must return whatever status came back, including 4xx and
//! 5xx; only a missing response is an error. `UreqTransport` runs ureq's
//! blocking agent on tokio's blocking pool so callers see a plain future.

use std::future::Future;
use std::pin::Pin;

use tracing::{debug, warn};

use crate::error::{TransportError, TransportErrorKind};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Upper bound on a buffered response body.
const MAX_BODY_BYTES: u64 = 64 * 1024 * 1024;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Sends one HTTP request and reports the response.
pub trait Transport: Send + Sync {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, TransportError>>;
}

/// Production transport over a shared `ureq::Agent`.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl UreqTransport {
    pub fn new() -> Self {
        // Status interpretation belongs to the client, so 4xx/5xx come back
        // as responses.
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, TransportError>> {
        let agent = self.agent.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || execute(&agent, request))
                .await
                .map_err(|e| TransportError::new(TransportErrorKind::Other, e.to_string()))?
        })
    }
}

fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, headers: &[(String, String)]) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn execute(agent: &ureq::Agent, request: HttpRequest) -> Result<HttpResponse, TransportError> {
    debug!(method = %request.method, url = %request.url, "sending");
    let timeout = Some(request.timeout);
    let result = match request.method {
        HttpMethod::Get => with_headers(agent.get(&request.url), &request.headers)
            .config()
            .timeout_global(timeout)
            .build()
            .call(),
        HttpMethod::Delete => with_headers(agent.delete(&request.url), &request.headers)
            .config()
            .timeout_global(timeout)
            .build()
            .call(),
        HttpMethod::Post | HttpMethod::Put => {
            let builder = if request.method == HttpMethod::Post {
                agent.post(&request.url)
            } else {
                agent.put(&request.url)
            };
            let builder = with_headers(builder, &request.headers)
                .config()
                .timeout_global(timeout)
                .build();
            match request.body.as_deref() {
                Some(body) => builder.send(body),
                None => builder.send_empty(),
            }
        }
    };

    let mut response = result.map_err(classify)?;
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    // A status line has arrived; a body that cannot be read must not turn the
    // response into a transport failure.
    let body = match response.body_mut().with_config().limit(MAX_BODY_BYTES).read_to_vec() {
        Ok(bytes) => decode_body(bytes),
        Err(e) => {
            warn!(status, error = %e, "discarding unreadable response body");
            String::new()
        }
    };

    Ok(HttpResponse { status, headers, body })
}

/// Bodies are expected to be UTF-8 JSON; anything else is decoded lossily so
/// the status still gets classified.
fn decode_body(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

fn classify(err: ureq::Error) -> TransportError {
    let kind = match &err {
        ureq::Error::Timeout(_) => TransportErrorKind::Timeout,
        ureq::Error::HostNotFound | ureq::Error::ConnectionFailed => TransportErrorKind::Connect,
        ureq::Error::Io(io) if io.kind() == std::io::ErrorKind::ConnectionRefused => TransportErrorKind::Connect,
        _ => TransportErrorKind::Other,
    };
    TransportError::new(kind, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_body_is_kept() {
        assert_eq!(decode_body(br#"{"code":200}"#.to_vec()), r#"{"code":200}"#);
    }

    #[test]
    fn invalid_utf8_body_is_decoded_lossily() {
        let body = decode_body(vec![b'<', 0xff, 0xfe, b'>']);
        assert_eq!(body, "<\u{fffd}\u{fffd}>");
    }

    #[test]
    fn error_kinds() {
        assert_eq!(classify(ureq::Error::HostNotFound).kind, TransportErrorKind::Connect);
        assert_eq!(classify(ureq::Error::ConnectionFailed).kind, TransportErrorKind::Connect);
        let refused = std::io::Error::from(std::io::ErrorKind::ConnectionRefused);
        assert_eq!(classify(ureq::Error::Io(refused)).kind, TransportErrorKind::Connect);
        assert_eq!(classify(ureq::Error::BadUri("x".to_string())).kind, TransportErrorKind::Other);
    }
}
