//! warpgrid-prober — HTTP readiness probing for WarpGrid.
//!
//! Two layers: [`probe()`] issues one GET against a target and checks the
//! response against a set of [`Expectations`]; the [`Manager`] keeps
//! retrying that probe on a fixed interval until it passes or a deadline
//! expires, and reports the outcome once through a callback.
//!
//! # Architecture
//!
//! ```text
//! Manager::offer(key, ...)
//!   ├── registry: key → CancellationToken (one loop per key)
//!   └── background task per accepted offer
//!       ├── probe() immediately, then every interval
//!       │   ├── build GET (path/host overrides, extra headers)
//!       │   ├── Transport::round_trip()
//!       │   └── check status → headers → body
//!       ├── stop on success, deadline, or cancellation
//!       └── callback(arg, outcome), then release key
//! ```
//!
//! # Deduplication
//!
//! A second offer for a key that is still in flight returns `false` and
//! never reaches the callback. The key is released after the first
//! offer's callback returns, so a later offer starts a fresh loop.
//!
//! Intermediate attempt failures are only logged. The callback sees
//! `Ok(())`, [`ProbeError::Timeout`] (carrying the last attempt's error),
//! or [`ProbeError::Cancelled`].

pub mod config;
pub mod error;
pub mod header;
pub mod manager;
pub mod options;
pub mod probe;
pub mod transport;

pub use config::ProbeConfig;
pub use error::{ProbeError, ProbeResult};
pub use manager::{Manager, ProbeCallback, ProbeSchedule};
pub use options::{Expectations, ProbeOption};
pub use probe::probe;
pub use transport::{HttpTransport, Transport, TransportError};
pub use tokio_util::sync::CancellationToken;
