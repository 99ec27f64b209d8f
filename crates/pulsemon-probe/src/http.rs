//! HTTP request executor: issues the configured method/headers/body/auth
//! and classifies the response against expected status codes plus optional
//! keyword and JSON-path assertions.

use pulsemon_common::types::{
    CheckStatus, ExecutionOutcome, HttpAuth, HttpRequestConfig, JsonPathCheck, KeywordCheck,
};
use serde_json::json;
use tokio::time::Instant;

use crate::validator::TargetValidator;
use crate::{elapsed_ms, remaining, truncate_chars, CheckError};

/// Matcher for the `expected_status_codes` pattern: a single code (`404`),
/// an `Nxx` wildcard (`2xx`), a range (`200-299`), or a comma list of any
/// of those. Matching is order-independent.
///
/// # Examples
///
/// ```
/// use pulsemon_probe::http::StatusMatcher;
///
/// let m = StatusMatcher::parse("2xx,404").unwrap();
/// assert!(m.matches(204));
/// assert!(m.matches(404));
/// assert!(!m.matches(500));
/// ```
#[derive(Debug, Clone)]
pub struct StatusMatcher {
    ranges: Vec<(u16, u16)>,
}

impl StatusMatcher {
    pub fn parse(pattern: &str) -> Result<Self, CheckError> {
        let mut ranges = Vec::new();
        for part in pattern.split(',') {
            let part = part.trim().to_ascii_lowercase();
            if part.is_empty() {
                return Err(CheckError::Validation(format!(
                    "empty entry in status pattern '{pattern}'"
                )));
            }
            if let Some(hundreds) = part.strip_suffix("xx") {
                let h: u16 = hundreds.parse().map_err(|_| {
                    CheckError::Validation(format!("bad status wildcard '{part}'"))
                })?;
                if !(1..=5).contains(&h) {
                    return Err(CheckError::Validation(format!(
                        "bad status wildcard '{part}'"
                    )));
                }
                ranges.push((h * 100, h * 100 + 99));
            } else if let Some((lo, hi)) = part.split_once('-') {
                let lo: u16 = lo.trim().parse().map_err(|_| {
                    CheckError::Validation(format!("bad status range '{part}'"))
                })?;
                let hi: u16 = hi.trim().parse().map_err(|_| {
                    CheckError::Validation(format!("bad status range '{part}'"))
                })?;
                if lo > hi {
                    return Err(CheckError::Validation(format!(
                        "inverted status range '{part}'"
                    )));
                }
                ranges.push((lo, hi));
            } else {
                let code: u16 = part.parse().map_err(|_| {
                    CheckError::Validation(format!("bad status code '{part}'"))
                })?;
                ranges.push((code, code));
            }
        }
        if ranges.is_empty() {
            return Err(CheckError::Validation(format!(
                "empty status pattern '{pattern}'"
            )));
        }
        Ok(Self { ranges })
    }

    pub fn matches(&self, code: u16) -> bool {
        self.ranges.iter().any(|(lo, hi)| (*lo..=*hi).contains(&code))
    }
}

/// Dot-separated JSON traversal; numeric segments index into arrays.
pub fn json_path_lookup<'a>(value: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    let mut current = value;
    for segment in path.split('.') {
        if segment.is_empty() {
            return None;
        }
        current = match current {
            serde_json::Value::Object(map) => map.get(segment)?,
            serde_json::Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Evaluates the optional body assertions. Returns the pass verdict plus
/// human-readable failure reasons for the result detail.
pub(crate) fn body_checks(
    body: &str,
    keyword: &Option<KeywordCheck>,
    json_match: &Option<JsonPathCheck>,
) -> (bool, Vec<String>) {
    let mut reasons = Vec::new();

    if let Some(check) = keyword {
        let found = body.contains(&check.keyword);
        if check.expect_absent && found {
            reasons.push(format!("keyword '{}' unexpectedly present", check.keyword));
        } else if !check.expect_absent && !found {
            reasons.push(format!("keyword '{}' not found", check.keyword));
        }
    }

    if let Some(check) = json_match {
        match serde_json::from_str::<serde_json::Value>(body) {
            Ok(parsed) => match json_path_lookup(&parsed, &check.path) {
                Some(actual) if *actual == check.expected => {}
                Some(actual) => reasons.push(format!(
                    "json path '{}' is {actual}, expected {}",
                    check.path, check.expected
                )),
                None => reasons.push(format!("json path '{}' not found", check.path)),
            },
            Err(e) => reasons.push(format!("response body is not valid JSON: {e}")),
        }
    }

    (reasons.is_empty(), reasons)
}

pub(crate) async fn execute(
    client: &reqwest::Client,
    validator: &TargetValidator,
    target: &str,
    config: &HttpRequestConfig,
    deadline: Instant,
    body_snippet_max: usize,
) -> Result<ExecutionOutcome, CheckError> {
    let (url, resolved_ip) = validator.validate_url(target).await?;
    let matcher = StatusMatcher::parse(&config.expected_status_codes)?;
    let method = reqwest::Method::from_bytes(config.method.to_ascii_uppercase().as_bytes())
        .map_err(|_| CheckError::Validation(format!("invalid http method '{}'", config.method)))?;

    let mut request = client.request(method, url).timeout(remaining(deadline));
    for (name, value) in &config.headers {
        request = request.header(name, value);
    }
    match &config.auth {
        Some(HttpAuth::Basic { username, password }) => {
            request = request.basic_auth(username, Some(password));
        }
        Some(HttpAuth::Bearer { token }) => {
            request = request.bearer_auth(token);
        }
        None => {}
    }
    if let Some(body) = &config.body {
        request = request.body(body.clone());
    }

    let started = Instant::now();
    let response = match request.send().await {
        Ok(r) => r,
        Err(e) => {
            let elapsed = elapsed_ms(started);
            if e.is_timeout() {
                return Ok(ExecutionOutcome::new(
                    CheckStatus::Timeout,
                    elapsed,
                    json!({"resolved_ip": resolved_ip.to_string(), "reason": "request timed out"}),
                ));
            }
            if e.is_connect() {
                return Err(CheckError::TransientNetwork(format!(
                    "connect to {target} failed: {e}"
                )));
            }
            return Ok(ExecutionOutcome::new(
                CheckStatus::Down,
                elapsed,
                json!({"resolved_ip": resolved_ip.to_string(), "reason": e.to_string()}),
            ));
        }
    };

    let status_code = response.status().as_u16();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    // Response time is time-to-headers; body read continues under the same
    // per-request timeout.
    let elapsed = elapsed_ms(started);

    let body = match response.text().await {
        Ok(text) => text,
        Err(e) if e.is_timeout() => {
            return Ok(ExecutionOutcome::new(
                CheckStatus::Timeout,
                elapsed_ms(started),
                json!({
                    "status_code": status_code,
                    "resolved_ip": resolved_ip.to_string(),
                    "reason": "body read timed out",
                }),
            ));
        }
        Err(e) => {
            tracing::debug!(target = %target, error = %e, "Failed to read response body");
            String::new()
        }
    };

    let status_ok = matcher.matches(status_code);
    let (body_ok, mut reasons) = body_checks(&body, &config.keyword, &config.json_match);
    if !status_ok {
        reasons.insert(
            0,
            format!(
                "status {status_code} not in '{}'",
                config.expected_status_codes
            ),
        );
    }

    let mut detail = json!({
        "status_code": status_code,
        "resolved_ip": resolved_ip.to_string(),
        "content_type": content_type,
        "body_snippet": truncate_chars(&body, body_snippet_max),
    });
    if !reasons.is_empty() {
        detail["failed_checks"] = json!(reasons);
    }

    let status = if status_ok && body_ok {
        CheckStatus::Up
    } else {
        CheckStatus::Down
    };
    Ok(ExecutionOutcome::new(status, elapsed, detail))
}
