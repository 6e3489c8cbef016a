//! Single-shot probe logic.
//!
//! Builds one GET request from the target URL and [`Expectations`],
//! runs it through a [`Transport`], and checks the response: status
//! first, then headers, then body. No retries happen here.

use bytes::Bytes;
use http::header::{HOST, USER_AGENT};
use http::uri::PathAndQuery;
use http::{HeaderName, HeaderValue, Request, Response, Uri};
use http_body_util::Empty;
use tracing::debug;

use crate::error::{ProbeError, ProbeResult};
use crate::header::PROBE_USER_AGENT;
use crate::options::Expectations;
use crate::transport::{ProbeRequest, Transport};

/// Most body bytes echoed into a status mismatch error.
const MAX_BODY_SNIPPET: usize = 256;

/// Perform exactly one probe of `target`.
///
/// Returns `Ok(())` only if the round trip completed and every
/// expectation held. A malformed URL or header fails before any I/O.
pub async fn probe<T: Transport>(
    transport: &T,
    target: &str,
    expectations: &Expectations,
) -> ProbeResult<()> {
    let req = build_request(target, expectations)?;

    let resp = transport
        .round_trip(req)
        .await
        .map_err(|source| ProbeError::Transport {
            url: target.to_string(),
            source,
        })?;

    let result = verify(&resp, expectations);
    match &result {
        Ok(()) => debug!(%target, status = %resp.status(), "probe passed"),
        Err(e) => debug!(%target, status = %resp.status(), error = %e, "probe did not match"),
    }
    result
}

fn build_request(target: &str, expectations: &Expectations) -> ProbeResult<ProbeRequest> {
    let invalid_url = |reason: String| ProbeError::InvalidUrl {
        url: target.to_string(),
        reason,
    };

    let mut uri: Uri = target.parse().map_err(|e: http::uri::InvalidUri| invalid_url(e.to_string()))?;
    if uri.scheme().is_none() {
        return Err(invalid_url("missing scheme".to_string()));
    }
    if uri.authority().is_none() {
        return Err(invalid_url("missing host".to_string()));
    }
    if let Some(path) = expectations.path() {
        uri = override_path(uri, path).map_err(|e| invalid_url(e.to_string()))?;
    }

    let mut req = Request::new(Empty::<Bytes>::new());
    *req.uri_mut() = uri;

    let headers = req.headers_mut();
    headers.insert(USER_AGENT, HeaderValue::from_static(PROBE_USER_AGENT));
    for (name, value) in expectations.request_headers() {
        headers.insert(header_name(name)?, header_value(name, value)?);
    }
    if let Some(host) = expectations.host() {
        headers.insert(HOST, header_value(HOST.as_str(), host)?);
    }

    Ok(req)
}

/// Swap the path of `uri`, keeping its original query string.
fn override_path(uri: Uri, path: &str) -> Result<Uri, http::Error> {
    let mut parts = uri.into_parts();
    let query = parts
        .path_and_query
        .as_ref()
        .and_then(PathAndQuery::query)
        .map(|q| format!("?{q}"))
        .unwrap_or_default();

    // The override is a path only; query and fragment delimiters are escaped.
    let path = path.replace('?', "%3F").replace('#', "%23");
    let path = if path.starts_with('/') {
        path
    } else {
        format!("/{path}")
    };

    parts.path_and_query = Some(PathAndQuery::try_from(format!("{path}{query}"))?);
    Ok(Uri::from_parts(parts)?)
}

fn header_name(name: &str) -> ProbeResult<HeaderName> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|e| ProbeError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

fn header_value(name: &str, value: &str) -> ProbeResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| ProbeError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

fn verify(resp: &Response<Bytes>, expectations: &Expectations) -> ProbeResult<()> {
    let status = resp.status().as_u16();
    if !expectations.accepts_status(status) {
        let body = resp.body();
        let snippet = &body[..body.len().min(MAX_BODY_SNIPPET)];
        return Err(ProbeError::UnexpectedStatus {
            expected: expectations.status_codes().iter().copied().collect(),
            actual: status,
            body: String::from_utf8_lossy(snippet).into_owned(),
        });
    }

    for (name, want) in expectations.headers() {
        let Some(got) = resp.headers().get(name.as_str()) else {
            return Err(ProbeError::MissingHeader { name: name.clone() });
        };
        if got.as_bytes() != want.as_bytes() {
            return Err(ProbeError::UnexpectedHeader {
                name: name.clone(),
                expected: want.clone(),
                actual: String::from_utf8_lossy(got.as_bytes()).into_owned(),
            });
        }
    }

    if let Some(want) = expectations.body() {
        if resp.body().as_ref() != want.as_bytes() {
            return Err(ProbeError::UnexpectedBody {
                expected: want.to_string(),
                actual: String::from_utf8_lossy(resp.body()).into_owned(),
            });
        }
    }

    Ok(())
}
