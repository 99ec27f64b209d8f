//! Website executor: HTTP semantics with a default 200-299 expectation,
//! plus optional TLS certificate inspection on HTTPS targets.
//!
//! Certificate inspection may be throttled by an SSL-specific interval so a
//! long interval configured separately from the main check frequency does
//! not re-handshake on every tick; the throttle lifts automatically once
//! expiry enters the warning window.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use pulsemon_common::types::{ExecutionOutcome, HttpRequestConfig, WebsiteConfig};
use rustls::ClientConfig;
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_rustls::TlsConnector;
use x509_parser::prelude::*;

use crate::validator::TargetValidator;
use crate::{http, remaining, CheckError};

/// Certificate summary stored under `detail.tls` on website results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsSummary {
    pub valid: bool,
    pub issuer: Option<String>,
    pub subject: Option<String>,
    pub not_before: Option<DateTime<Utc>>,
    pub not_after: Option<DateTime<Utc>>,
    pub days_remaining: Option<i64>,
    pub checked_at: DateTime<Utc>,
    pub error: Option<String>,
}

impl TlsSummary {
    fn failed(error: String, now: DateTime<Utc>) -> Self {
        Self {
            valid: false,
            issuer: None,
            subject: None,
            not_before: None,
            not_after: None,
            days_remaining: None,
            checked_at: now,
            error: Some(error),
        }
    }
}

/// Whether the certificate should be (re-)inspected on this tick.
///
/// No interval configured → every tick. No previous summary → now. Once
/// `days_remaining` is at or below the warning threshold the interval is
/// ignored and inspection happens every tick.
pub fn ssl_check_due(
    previous: Option<&TlsSummary>,
    interval_secs: Option<u64>,
    warning_days: i64,
    now: DateTime<Utc>,
) -> bool {
    let Some(interval) = interval_secs else {
        return true;
    };
    let Some(prev) = previous else {
        return true;
    };
    if prev.days_remaining.is_some_and(|d| d <= warning_days) {
        return true;
    }
    now - prev.checked_at >= chrono::Duration::seconds(interval as i64)
}

/// Extracts the stored TLS summary from a persisted result detail payload.
pub fn tls_summary_from_detail(detail: &serde_json::Value) -> Option<TlsSummary> {
    detail
        .get("tls")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
}

#[allow(clippy::too_many_arguments)]
pub(crate) async fn execute(
    client: &reqwest::Client,
    validator: &TargetValidator,
    target: &str,
    config: &WebsiteConfig,
    deadline: Instant,
    body_snippet_max: usize,
    inspect_tls: bool,
) -> Result<ExecutionOutcome, CheckError> {
    let http_config = HttpRequestConfig {
        method: "GET".to_string(),
        headers: Default::default(),
        body: None,
        auth: None,
        expected_status_codes: config.expected_status_codes.clone(),
        keyword: config.keyword.clone(),
        json_match: None,
        timeout_secs: config.timeout_secs,
    };
    let mut outcome =
        http::execute(client, validator, target, &http_config, deadline, body_snippet_max).await?;

    if inspect_tls && config.check_tls {
        if let Ok(url) = reqwest::Url::parse(target) {
            if url.scheme() == "https" {
                if let Some(host) = url.host_str() {
                    let port = url.port_or_known_default().unwrap_or(443);
                    let summary =
                        inspect_certificate(host, port, remaining(deadline).max(Duration::from_secs(1)))
                            .await;
                    if let Ok(value) = serde_json::to_value(&summary) {
                        outcome.detail["tls"] = value;
                    }
                }
            }
        }
    }

    Ok(outcome)
}

/// Connects, handshakes, and summarizes the leaf certificate. All failure
/// paths are captured in the summary rather than raised.
pub async fn inspect_certificate(host: &str, port: u16, timeout: Duration) -> TlsSummary {
    let now = Utc::now();
    match handshake_and_parse(host, port, timeout).await {
        Ok(summary) => summary,
        Err(e) => TlsSummary::failed(e.to_string(), now),
    }
}

async fn handshake_and_parse(
    host: &str,
    port: u16,
    timeout: Duration,
) -> anyhow::Result<TlsSummary> {
    let now = Utc::now();

    let mut root_store = rustls::RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();
    let connector = TlsConnector::from(Arc::new(config));

    let addr = format!("{host}:{port}");
    let server_name = rustls::pki_types::ServerName::try_from(host.to_string())
        .map_err(|e| anyhow::anyhow!("invalid server name: {e}"))?;

    let tcp = tokio::time::timeout(timeout, TcpStream::connect(&addr))
        .await
        .map_err(|_| anyhow::anyhow!("tcp connect timed out"))?
        .map_err(|e| anyhow::anyhow!("tcp connect failed: {e}"))?;

    // A handshake error usually means an invalid chain or expired leaf;
    // that is a verdict, not an inspection failure.
    let tls_stream = match tokio::time::timeout(timeout, connector.connect(server_name, tcp)).await
    {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => return Ok(TlsSummary::failed(format!("tls handshake failed: {e}"), now)),
        Err(_) => return Err(anyhow::anyhow!("tls handshake timed out")),
    };

    let (_io, conn) = tls_stream.into_inner();
    let certs = conn
        .peer_certificates()
        .ok_or_else(|| anyhow::anyhow!("no peer certificates"))?;
    if certs.is_empty() {
        return Err(anyhow::anyhow!("empty certificate chain"));
    }

    let (_, cert) = X509Certificate::from_der(certs[0].as_ref())
        .map_err(|e| anyhow::anyhow!("failed to parse X.509 certificate: {e}"))?;

    let not_before_ts = cert.validity().not_before.to_datetime();
    let not_after_ts = cert.validity().not_after.to_datetime();
    let not_before =
        DateTime::from_timestamp(not_before_ts.unix_timestamp(), 0).unwrap_or_default();
    let not_after = DateTime::from_timestamp(not_after_ts.unix_timestamp(), 0).unwrap_or_default();
    let days_remaining = (not_after - now).num_days();
    let valid = now >= not_before && now <= not_after;

    Ok(TlsSummary {
        valid,
        issuer: Some(cert.issuer().to_string()),
        subject: Some(cert.subject().to_string()),
        not_before: Some(not_before),
        not_after: Some(not_after),
        days_remaining: Some(days_remaining),
        checked_at: now,
        error: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn summary(days_remaining: i64, checked_secs_ago: i64) -> TlsSummary {
        let now = Utc::now();
        TlsSummary {
            valid: true,
            issuer: Some("CN=Test CA".to_string()),
            subject: Some("CN=example.com".to_string()),
            not_before: Some(now - ChronoDuration::days(30)),
            not_after: Some(now + ChronoDuration::days(days_remaining)),
            days_remaining: Some(days_remaining),
            checked_at: now - ChronoDuration::seconds(checked_secs_ago),
            error: None,
        }
    }

    #[test]
    fn ssl_check_runs_every_tick_without_interval() {
        let prev = summary(200, 10);
        assert!(ssl_check_due(Some(&prev), None, 30, Utc::now()));
    }

    #[test]
    fn ssl_check_is_throttled_by_interval() {
        let now = Utc::now();
        let prev = summary(200, 60);
        assert!(!ssl_check_due(Some(&prev), Some(86400), 30, now));

        let stale = summary(200, 90000);
        assert!(ssl_check_due(Some(&stale), Some(86400), 30, now));
    }

    #[test]
    fn ssl_throttle_lifts_near_expiry() {
        // Checked a minute ago with a day-long interval, but only 10 days
        // remain — the warning window overrides the throttle.
        let prev = summary(10, 60);
        assert!(ssl_check_due(Some(&prev), Some(86400), 30, Utc::now()));
    }

    #[test]
    fn ssl_check_runs_when_no_prior_summary() {
        assert!(ssl_check_due(None, Some(86400), 30, Utc::now()));
    }

    #[test]
    fn tls_summary_round_trips_through_detail() {
        let prev = summary(42, 0);
        let detail = serde_json::json!({"tls": serde_json::to_value(&prev).unwrap()});
        let restored = tls_summary_from_detail(&detail).unwrap();
        assert_eq!(restored.days_remaining, Some(42));
        assert!(restored.valid);
        assert!(tls_summary_from_detail(&serde_json::json!({})).is_none());
    }
}
