//! Declarative readiness probe settings.
//!
//! The serialisable form of a probe, as it appears in deployment specs:
//! durations are strings ("10ms", "5s", "1m") and every field has a
//! default, so a bare `[probe]` table is a valid 200-OK probe.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ProbeError, ProbeResult};
use crate::manager::ProbeSchedule;
use crate::options::{
    Expectations, expects_body, expects_header, expects_status_codes, with_header, with_host,
    with_path,
};

/// Readiness probe settings for one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Path to probe instead of the target's own (e.g., "/healthz").
    pub path: Option<String>,
    /// Virtual host to send in the `host` header.
    pub host: Option<String>,
    /// Pause between attempts (e.g., "1s").
    pub interval: String,
    /// Give up after this long (e.g., "30s").
    pub timeout: String,
    /// Extra request headers.
    pub headers: BTreeMap<String, String>,
    /// Accepted response status codes.
    pub expected_status: Vec<u16>,
    /// Exact response body, if any.
    pub expected_body: Option<String>,
    /// Response headers that must match exactly.
    pub expected_headers: BTreeMap<String, String>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            path: None,
            host: None,
            interval: "1s".to_string(),
            timeout: "30s".to_string(),
            headers: BTreeMap::new(),
            expected_status: vec![200],
            expected_body: None,
            expected_headers: BTreeMap::new(),
        }
    }
}

impl ProbeConfig {
    /// Retry cadence. Both durations must parse and be non-zero.
    pub fn schedule(&self) -> ProbeResult<ProbeSchedule> {
        let interval = parse_field("interval", &self.interval)?;
        let timeout = parse_field("timeout", &self.timeout)?;
        Ok(ProbeSchedule::new(interval, timeout))
    }

    /// Request shape and response predicates.
    pub fn expectations(&self) -> Expectations {
        let mut expectations: Expectations = self
            .headers
            .iter()
            .map(|(name, value)| with_header(name, value))
            .chain(
                self.expected_headers
                    .iter()
                    .map(|(name, value)| expects_header(name, value)),
            )
            .collect();

        expectations.apply(expects_status_codes(self.expected_status.iter().copied()));
        if let Some(path) = &self.path {
            expectations.apply(with_path(path));
        }
        if let Some(host) = &self.host {
            expectations.apply(with_host(host));
        }
        if let Some(body) = &self.expected_body {
            expectations.apply(expects_body(body));
        }
        expectations
    }
}

fn parse_field(field: &str, value: &str) -> ProbeResult<Duration> {
    match parse_duration(value) {
        Some(d) if !d.is_zero() => Ok(d),
        Some(_) => Err(ProbeError::InvalidConfig(format!("{field} must be non-zero"))),
        None => Err(ProbeError::InvalidConfig(format!(
            "{field}: cannot parse duration {value:?}"
        ))),
    }
}

/// Parse a duration string like "500ms", "5s", "2m", or "10" (seconds).
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.trim()
            .parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_units() {
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration(" 10 "), Some(Duration::from_secs(10)));
    }

    #[test]
    fn parse_duration_rejects_garbage() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("fast"), None);
        assert_eq!(parse_duration("-1s"), None);
        assert_eq!(parse_duration("1h"), None);
    }

    #[test]
    fn default_config_probes_for_200() {
        let config = ProbeConfig::default();
        let schedule = config.schedule().unwrap();
        assert_eq!(schedule.interval, Duration::from_secs(1));
        assert_eq!(schedule.timeout, Duration::from_secs(30));

        let expectations = config.expectations();
        assert!(expectations.accepts_status(200));
        assert!(!expectations.accepts_status(404));
    }

    #[test]
    fn zero_or_unparsable_durations_are_rejected() {
        let config = ProbeConfig {
            interval: "0s".to_string(),
            ..ProbeConfig::default()
        };
        assert!(matches!(config.schedule(), Err(ProbeError::InvalidConfig(_))));

        let config = ProbeConfig {
            timeout: "soon".to_string(),
            ..ProbeConfig::default()
        };
        let err = config.schedule().unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn parses_from_toml() {
        let config: ProbeConfig = toml::from_str(
            r#"
            path = "/healthz"
            host = "api.internal"
            interval = "10ms"
            timeout = "200ms"
            expected_status = [200, 204]
            expected_body = "test-server"

            [headers]
            x-warpgrid-probe = "test-server"

            [expected_headers]
            x-ready = "yes"
            "#,
        )
        .unwrap();

        let schedule = config.schedule().unwrap();
        assert_eq!(schedule.interval, Duration::from_millis(10));
        assert_eq!(schedule.timeout, Duration::from_millis(200));

        let expectations = config.expectations();
        assert_eq!(expectations.path(), Some("/healthz"));
        assert_eq!(expectations.host(), Some("api.internal"));
        assert!(expectations.accepts_status(204));
        assert_eq!(expectations.body(), Some("test-server"));
        assert_eq!(expectations.request_headers()["x-warpgrid-probe"], "test-server");
        assert_eq!(expectations.headers()["x-ready"], "yes");
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: ProbeConfig = toml::from_str(r#"timeout = "5s""#).unwrap();
        assert_eq!(config.interval, "1s");
        assert_eq!(config.expected_status, vec![200]);
        assert!(config.path.is_none());
    }
}
