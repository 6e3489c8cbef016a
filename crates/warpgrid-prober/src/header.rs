//! Header conventions for probe traffic.
//!
//! Serving endpoints can recognise probe requests by [`PROBE_HEADER`].
//! Callers attach it through [`with_header`](crate::options::with_header);
//! the prober itself only sets the user agent.

/// Header some deployments use to mark probe requests.
pub const PROBE_HEADER: &str = "x-warpgrid-probe";

/// User agent sent with every probe unless overridden.
pub const PROBE_USER_AGENT: &str = "warpgrid-prober/0.1";
