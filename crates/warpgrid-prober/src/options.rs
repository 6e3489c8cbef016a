//! Probe options: what a request looks like and what counts as ready.
//!
//! An [`Expectations`] value is built by folding [`ProbeOption`]s in
//! order. Header options accumulate per header name, compared
//! case-insensitively and stored lowercase; every other option
//! overwrites its field. Building never fails and never touches the
//! network: a malformed value only shows up when a probe runs.

use std::collections::{BTreeMap, BTreeSet};

/// A single configuration step applied to an [`Expectations`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOption {
    /// Add a header to the outgoing request.
    Header { name: String, value: String },
    /// Replace the path of the target URL.
    Path(String),
    /// Send this value as the `host` header instead of the URL authority.
    Host(String),
    /// Accept only these response status codes.
    StatusCodes(Vec<u16>),
    /// Require the response body to equal this string.
    Body(String),
    /// Require the response to carry this header with this value.
    ExpectHeader { name: String, value: String },
}

/// Add `name: value` to the probe request.
pub fn with_header(name: impl Into<String>, value: impl Into<String>) -> ProbeOption {
    ProbeOption::Header {
        name: name.into(),
        value: value.into(),
    }
}

/// Probe `path` instead of the target URL's path.
pub fn with_path(path: impl Into<String>) -> ProbeOption {
    ProbeOption::Path(path.into())
}

/// Route the probe to virtual host `host`.
pub fn with_host(host: impl Into<String>) -> ProbeOption {
    ProbeOption::Host(host.into())
}

/// Accept the listed status codes.
pub fn expects_status_codes(codes: impl IntoIterator<Item = u16>) -> ProbeOption {
    ProbeOption::StatusCodes(codes.into_iter().collect())
}

/// Require an exact response body.
pub fn expects_body(body: impl Into<String>) -> ProbeOption {
    ProbeOption::Body(body.into())
}

/// Require a response header with an exact value.
pub fn expects_header(name: impl Into<String>, value: impl Into<String>) -> ProbeOption {
    ProbeOption::ExpectHeader {
        name: name.into(),
        value: value.into(),
    }
}

/// The request shape and response predicates for one probe target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expectations {
    status_codes: BTreeSet<u16>,
    body: Option<String>,
    headers: BTreeMap<String, String>,
    request_headers: BTreeMap<String, String>,
    path: Option<String>,
    host: Option<String>,
}

impl Expectations {
    /// An empty set: no request tweaks, no predicates.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one option, overwriting or accumulating as described
    /// in the module docs.
    pub fn apply(&mut self, option: ProbeOption) {
        match option {
            ProbeOption::Header { name, value } => {
                self.request_headers.insert(name.to_ascii_lowercase(), value);
            }
            ProbeOption::Path(path) => self.path = Some(path),
            ProbeOption::Host(host) => self.host = Some(host),
            ProbeOption::StatusCodes(codes) => self.status_codes = codes.into_iter().collect(),
            ProbeOption::Body(body) => self.body = Some(body),
            ProbeOption::ExpectHeader { name, value } => {
                self.headers.insert(name.to_ascii_lowercase(), value);
            }
        }
    }

    /// Builder method: apply an arbitrary option.
    pub fn with(mut self, option: ProbeOption) -> Self {
        self.apply(option);
        self
    }

    /// Builder method: add a request header.
    pub fn with_header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(with_header(name, value))
    }

    /// Builder method: override the request path.
    pub fn with_path(self, path: impl Into<String>) -> Self {
        self.with(with_path(path))
    }

    /// Builder method: override the `host` header.
    pub fn with_host(self, host: impl Into<String>) -> Self {
        self.with(with_host(host))
    }

    /// Builder method: set the accepted status codes.
    pub fn expects_status_codes(self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.with(expects_status_codes(codes))
    }

    /// Builder method: require an exact body.
    pub fn expects_body(self, body: impl Into<String>) -> Self {
        self.with(expects_body(body))
    }

    /// Builder method: require a response header value.
    pub fn expects_header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(expects_header(name, value))
    }

    /// Accepted status codes. Empty means any status is accepted.
    pub fn status_codes(&self) -> &BTreeSet<u16> {
        &self.status_codes
    }

    /// Whether `status` satisfies the status predicate.
    pub fn accepts_status(&self, status: u16) -> bool {
        self.status_codes.is_empty() || self.status_codes.contains(&status)
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Response headers that must be present with these exact values.
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Headers merged into the outgoing request.
    pub fn request_headers(&self) -> &BTreeMap<String, String> {
        &self.request_headers
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }
}

impl FromIterator<ProbeOption> for Expectations {
    fn from_iter<I: IntoIterator<Item = ProbeOption>>(iter: I) -> Self {
        let mut expectations = Self::new();
        expectations.extend(iter);
        expectations
    }
}

impl Extend<ProbeOption> for Expectations {
    fn extend<I: IntoIterator<Item = ProbeOption>>(&mut self, iter: I) {
        for option in iter {
            self.apply(option);
        }
    }
}
