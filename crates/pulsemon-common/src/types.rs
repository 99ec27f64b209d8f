use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Monitor probe type, fixed at creation and immutable thereafter.
///
/// # Examples
///
/// ```
/// use pulsemon_common::types::MonitorType;
///
/// let t: MonitorType = "http_request".parse().unwrap();
/// assert_eq!(t, MonitorType::HttpRequest);
/// assert_eq!(t.to_string(), "http_request");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MonitorType {
    HttpRequest,
    Website,
    PingHost,
    PortCheck,
    SyntheticTest,
}

impl std::fmt::Display for MonitorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorType::HttpRequest => write!(f, "http_request"),
            MonitorType::Website => write!(f, "website"),
            MonitorType::PingHost => write!(f, "ping_host"),
            MonitorType::PortCheck => write!(f, "port_check"),
            MonitorType::SyntheticTest => write!(f, "synthetic_test"),
        }
    }
}

impl std::str::FromStr for MonitorType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http_request" => Ok(MonitorType::HttpRequest),
            "website" => Ok(MonitorType::Website),
            "ping_host" => Ok(MonitorType::PingHost),
            "port_check" => Ok(MonitorType::PortCheck),
            "synthetic_test" => Ok(MonitorType::SyntheticTest),
            _ => Err(format!("unknown monitor type: {s}")),
        }
    }
}

/// Server-computed monitor state. `Paused` and `Maintenance` are the only
/// values a user may request directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MonitorStatus {
    Pending,
    Up,
    Down,
    Paused,
    Maintenance,
    Error,
}

impl std::fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorStatus::Pending => write!(f, "pending"),
            MonitorStatus::Up => write!(f, "up"),
            MonitorStatus::Down => write!(f, "down"),
            MonitorStatus::Paused => write!(f, "paused"),
            MonitorStatus::Maintenance => write!(f, "maintenance"),
            MonitorStatus::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for MonitorStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MonitorStatus::Pending),
            "up" => Ok(MonitorStatus::Up),
            "down" => Ok(MonitorStatus::Down),
            "paused" => Ok(MonitorStatus::Paused),
            "maintenance" => Ok(MonitorStatus::Maintenance),
            "error" => Ok(MonitorStatus::Error),
            _ => Err(format!("unknown monitor status: {s}")),
        }
    }
}

/// Verdict of a single executed check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Up,
    Down,
    Error,
    Timeout,
}

impl CheckStatus {
    /// Up/down classification used for status-change detection: only `Up`
    /// counts as up; `Down`, `Error` and `Timeout` all count as not-up.
    pub fn is_up(self) -> bool {
        matches!(self, CheckStatus::Up)
    }
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckStatus::Up => write!(f, "up"),
            CheckStatus::Down => write!(f, "down"),
            CheckStatus::Error => write!(f, "error"),
            CheckStatus::Timeout => write!(f, "timeout"),
        }
    }
}

impl std::str::FromStr for CheckStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(CheckStatus::Up),
            "down" => Ok(CheckStatus::Down),
            "error" => Ok(CheckStatus::Error),
            "timeout" => Ok(CheckStatus::Timeout),
            _ => Err(format!("unknown check status: {s}")),
        }
    }
}

/// Alert event category handed to the notification delivery collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AlertEventKind {
    Failure,
    Recovery,
    SslExpiring,
}

impl std::fmt::Display for AlertEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertEventKind::Failure => write!(f, "failure"),
            AlertEventKind::Recovery => write!(f, "recovery"),
            AlertEventKind::SslExpiring => write!(f, "ssl_expiring"),
        }
    }
}

/// Raw executor return value, consumed by the result evaluator. Not
/// persisted as-is: the evaluator turns it into a [`MonitorResult`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub status: CheckStatus,
    /// Elapsed wall time measured with a monotonic clock, including on
    /// timeout (records time spent, never a sentinel).
    pub elapsed_ms: u64,
    /// Type-specific detail payload (status code, body snippet, resolved
    /// IP, TLS summary, per-location breakdown, ...).
    pub detail: serde_json::Value,
}

impl ExecutionOutcome {
    pub fn new(status: CheckStatus, elapsed_ms: u64, detail: serde_json::Value) -> Self {
        Self {
            status,
            elapsed_ms,
            detail,
        }
    }
}

// ---- Per-type check configuration ----

/// HTTP basic/bearer credentials attached to outgoing probe requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(tag = "scheme", rename_all = "lowercase")]
pub enum HttpAuth {
    Basic { username: String, password: String },
    Bearer { token: String },
}

/// Body keyword assertion: the keyword must be present, or absent when
/// `expect_absent` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct KeywordCheck {
    pub keyword: String,
    #[serde(default)]
    pub expect_absent: bool,
}

/// JSON-path equality assertion against the response body. `path` is a
/// dot-separated traversal; numeric segments index into arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct JsonPathCheck {
    pub path: String,
    #[schema(value_type = Object)]
    pub expected: serde_json::Value,
}

fn default_http_method() -> String {
    "GET".to_string()
}

fn default_expected_status_codes() -> String {
    "200-299".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct HttpRequestConfig {
    #[serde(default = "default_http_method")]
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub auth: Option<HttpAuth>,
    /// Accepted response codes: a single code (`404`), an `Nxx` wildcard
    /// (`2xx`), a range (`200-299`), or a comma list (`200,201,204`).
    #[serde(default = "default_expected_status_codes")]
    pub expected_status_codes: String,
    #[serde(default)]
    pub keyword: Option<KeywordCheck>,
    #[serde(default)]
    pub json_match: Option<JsonPathCheck>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct WebsiteConfig {
    #[serde(default = "default_expected_status_codes")]
    pub expected_status_codes: String,
    /// Inspect the TLS certificate on HTTPS targets.
    #[serde(default = "default_true")]
    pub check_tls: bool,
    /// Re-inspect the certificate at most this often. When unset the
    /// certificate is inspected on every tick. As expiry approaches the
    /// warning threshold the throttle is lifted automatically.
    #[serde(default)]
    pub ssl_check_interval_secs: Option<u64>,
    #[serde(default)]
    pub keyword: Option<KeywordCheck>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PingHostConfig {
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PortProtocol {
    #[default]
    Tcp,
    Udp,
}

impl std::fmt::Display for PortProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortProtocol::Tcp => write!(f, "tcp"),
            PortProtocol::Udp => write!(f, "udp"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PortCheckConfig {
    pub port: u16,
    #[serde(default)]
    pub protocol: PortProtocol,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SyntheticTestConfig {
    /// Reference to a stored test script, resolved by the external
    /// test-runner collaborator.
    pub script_ref: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// 按监控类型区分的检查配置（tagged union）。
///
/// 校验在联合类型边界完成：`from_type_and_value` 负责把 API 传入的
/// 无标签 JSON 与监控类型组装成合法变体，各执行器内部不再做配置校验。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorConfig {
    HttpRequest(HttpRequestConfig),
    Website(WebsiteConfig),
    PingHost(PingHostConfig),
    PortCheck(PortCheckConfig),
    SyntheticTest(SyntheticTestConfig),
}

impl MonitorConfig {
    pub fn monitor_type(&self) -> MonitorType {
        match self {
            MonitorConfig::HttpRequest(_) => MonitorType::HttpRequest,
            MonitorConfig::Website(_) => MonitorType::Website,
            MonitorConfig::PingHost(_) => MonitorType::PingHost,
            MonitorConfig::PortCheck(_) => MonitorType::PortCheck,
            MonitorConfig::SyntheticTest(_) => MonitorType::SyntheticTest,
        }
    }

    /// Explicitly configured timeout, if any. Type-specific defaults are an
    /// engine configuration concern.
    pub fn explicit_timeout_secs(&self) -> Option<u64> {
        match self {
            MonitorConfig::HttpRequest(c) => c.timeout_secs,
            MonitorConfig::Website(c) => c.timeout_secs,
            MonitorConfig::PingHost(c) => c.timeout_secs,
            MonitorConfig::PortCheck(c) => c.timeout_secs,
            MonitorConfig::SyntheticTest(c) => c.timeout_secs,
        }
    }

    /// Builds the config union from a monitor type plus the untagged JSON
    /// object supplied by the API, applying per-variant validation.
    ///
    /// # Examples
    ///
    /// ```
    /// use pulsemon_common::types::{MonitorConfig, MonitorType};
    /// use serde_json::json;
    ///
    /// let cfg = MonitorConfig::from_type_and_value(
    ///     MonitorType::PortCheck,
    ///     Some(json!({"port": 5432, "protocol": "tcp"})),
    /// )
    /// .unwrap();
    /// assert_eq!(cfg.monitor_type(), MonitorType::PortCheck);
    ///
    /// // Missing required field is rejected at the union boundary.
    /// assert!(MonitorConfig::from_type_and_value(MonitorType::PortCheck, None).is_err());
    /// ```
    pub fn from_type_and_value(
        monitor_type: MonitorType,
        value: Option<serde_json::Value>,
    ) -> Result<Self, String> {
        let mut obj = match value {
            None => serde_json::Map::new(),
            Some(serde_json::Value::Object(map)) => map,
            Some(_) => return Err("config must be a JSON object".to_string()),
        };
        obj.insert(
            "type".to_string(),
            serde_json::Value::String(monitor_type.to_string()),
        );
        let config: MonitorConfig = serde_json::from_value(serde_json::Value::Object(obj))
            .map_err(|e| format!("invalid {monitor_type} config: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            MonitorConfig::HttpRequest(c) => {
                if c.method.trim().is_empty() {
                    return Err("http method must not be empty".to_string());
                }
                if let Some(check) = &c.json_match {
                    if check.path.trim().is_empty() {
                        return Err("json_match.path must not be empty".to_string());
                    }
                }
                Ok(())
            }
            MonitorConfig::PortCheck(c) => {
                if c.port == 0 {
                    return Err("port must be in 1-65535".to_string());
                }
                Ok(())
            }
            MonitorConfig::SyntheticTest(c) => {
                if c.script_ref.trim().is_empty() {
                    return Err("script_ref must not be empty".to_string());
                }
                Ok(())
            }
            MonitorConfig::Website(_) | MonitorConfig::PingHost(_) => Ok(()),
        }
    }
}

// ---- Alerting & locations ----

fn default_failure_threshold() -> u32 {
    3
}

fn default_recovery_threshold() -> u32 {
    1
}

fn default_ssl_warning_days() -> i64 {
    30
}

/// 告警配置：阈值驱动，首次告警后按阈值倍数重复，单次故障最多 3 条。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AlertConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Notification provider IDs resolved by the delivery collaborator.
    #[serde(default)]
    pub provider_ids: Vec<String>,
    #[serde(default = "default_true")]
    pub alert_on_failure: bool,
    #[serde(default = "default_true")]
    pub alert_on_recovery: bool,
    #[serde(default)]
    pub alert_on_ssl_expiration: bool,
    #[serde(default = "default_true")]
    pub alert_on_timeout: bool,
    /// Consecutive failures before the first failure alert.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_recovery_threshold")]
    pub recovery_threshold: u32,
    /// SSL-expiry alerts fire when days remaining drop to this value.
    #[serde(default = "default_ssl_warning_days")]
    pub ssl_days_until_expiration_warning: i64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider_ids: Vec::new(),
            alert_on_failure: true,
            alert_on_recovery: true,
            alert_on_ssl_expiration: false,
            alert_on_timeout: true,
            failure_threshold: default_failure_threshold(),
            recovery_threshold: default_recovery_threshold(),
            ssl_days_until_expiration_warning: default_ssl_warning_days(),
        }
    }
}

impl AlertConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.failure_threshold == 0 {
            return Err("failure_threshold must be at least 1".to_string());
        }
        if self.recovery_threshold == 0 {
            return Err("recovery_threshold must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Reduction strategy for multi-location runs. The strategy determines the
/// effective up-percentage threshold; `Custom` uses the stored percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AggregationStrategy {
    #[default]
    All,
    Majority,
    Any,
    Custom,
}

impl AggregationStrategy {
    /// 按策略推导生效阈值（百分比）：all→100，majority→50，any→1，
    /// custom 直接使用存储值。
    pub fn effective_threshold(self, custom_percent: u8) -> u8 {
        match self {
            AggregationStrategy::All => 100,
            AggregationStrategy::Majority => 50,
            AggregationStrategy::Any => 1,
            AggregationStrategy::Custom => custom_percent,
        }
    }
}

fn default_threshold_percent() -> u8 {
    100
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LocationConfig {
    #[serde(default)]
    pub enabled: bool,
    pub locations: Vec<String>,
    #[serde(default)]
    pub strategy: AggregationStrategy,
    #[serde(default = "default_threshold_percent")]
    pub threshold_percent: u8,
}

impl LocationConfig {
    /// Zero selected locations is invalid configuration, rejected at save
    /// time rather than at run time.
    pub fn validate(&self) -> Result<(), String> {
        if self.enabled && self.locations.is_empty() {
            return Err("location_config.locations must not be empty".to_string());
        }
        if !(1..=100).contains(&self.threshold_percent) {
            return Err("location_config.threshold_percent must be in 1-100".to_string());
        }
        Ok(())
    }
}

// ---- Monitor & results ----

/// A persisted probe definition.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Monitor {
    pub id: String,
    pub org_id: String,
    pub project_id: String,
    pub created_by: String,
    pub name: String,
    pub monitor_type: MonitorType,
    /// URL, hostname, or IP — validated per type before every network call.
    pub target: String,
    /// Check interval; minimum 60 seconds, enforced at save time.
    pub frequency_secs: u64,
    pub enabled: bool,
    pub status: MonitorStatus,
    pub config: MonitorConfig,
    pub alert_config: AlertConfig,
    pub location_config: Option<LocationConfig>,
    pub muted_until: Option<DateTime<Utc>>,
    pub last_check_at: Option<DateTime<Utc>>,
    pub last_status_change_at: Option<DateTime<Utc>>,
    /// Opaque handle into the scheduler registry.
    pub scheduled_job_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Monitor {
    pub fn is_muted(&self, now: DateTime<Utc>) -> bool {
        self.muted_until.is_some_and(|until| until > now)
    }

    /// Whether multi-location fan-out applies to this monitor.
    pub fn fan_out_locations(&self) -> Option<&LocationConfig> {
        self.location_config
            .as_ref()
            .filter(|lc| lc.enabled && !lc.locations.is_empty())
    }
}

/// The persisted, evaluated record of one executed check. Rows are
/// append-only and never mutated after insert; exactly one row per monitor
/// is the latest (by `checked_at`).
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MonitorResult {
    pub id: String,
    pub monitor_id: String,
    pub checked_at: DateTime<Utc>,
    pub status: CheckStatus,
    /// Non-negative even on timeout: records elapsed time, not a sentinel.
    pub response_time_ms: u64,
    #[schema(value_type = Object)]
    pub details: serde_json::Value,
    pub is_up: bool,
    /// True iff the up/down classification differs from the immediately
    /// preceding result for the same monitor.
    pub is_status_change: bool,
    /// Resets to 0 on an up result; increments on down/error/timeout.
    pub consecutive_failure_count: u32,
    /// Failure alerts emitted during the current failure streak, capped at 3.
    pub alerts_sent_for_failure: u32,
    pub created_at: DateTime<Utc>,
}

/// One scheduled or ad hoc request to run a monitor's check once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionJob {
    pub monitor_id: String,
    pub attempt: u32,
    pub enqueued_at: DateTime<Utc>,
}

impl ExecutionJob {
    pub fn new(monitor_id: impl Into<String>) -> Self {
        Self {
            monitor_id: monitor_id.into(),
            attempt: 0,
            enqueued_at: Utc::now(),
        }
    }

    pub fn retry(&self) -> Self {
        Self {
            monitor_id: self.monitor_id.clone(),
            attempt: self.attempt + 1,
            enqueued_at: Utc::now(),
        }
    }
}

// ---- API request types ----

/// 创建监控请求
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct CreateMonitorRequest {
    /// 监控名称（必填）
    pub name: String,
    /// 所属组织（必填）
    pub org_id: String,
    /// 所属项目（必填）
    pub project_id: String,
    /// 创建者标识（可选）
    #[serde(default)]
    pub created_by: Option<String>,
    /// 监控类型（必填，创建后不可变更）
    pub monitor_type: MonitorType,
    /// 探测目标：URL / 主机名 / IP（必填）
    pub target: String,
    /// 检查间隔秒数（可选，默认与下限由服务端配置决定）
    #[serde(default)]
    pub frequency_secs: Option<u64>,
    /// 是否启用（可选，默认 true）
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 类型相关检查配置（无标签 JSON 对象，服务端按类型校验）
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub config: Option<serde_json::Value>,
    /// 告警配置（可选）
    #[serde(default)]
    pub alert_config: Option<AlertConfig>,
    /// 多地域配置（可选）
    #[serde(default)]
    pub location_config: Option<LocationConfig>,
}

/// 更新监控请求（双层 Option 字段：缺省 = 不修改，null = 清除）
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct UpdateMonitorRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub frequency_secs: Option<u64>,
    #[serde(default)]
    pub enabled: Option<bool>,
    /// 类型相关检查配置（无标签 JSON 对象；类型本身不可变更）
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub config: Option<serde_json::Value>,
    #[serde(default)]
    pub alert_config: Option<AlertConfig>,
    #[serde(default, deserialize_with = "deserialize_optional_nullable")]
    #[schema(value_type = Option<LocationConfig>)]
    pub location_config: Option<Option<LocationConfig>>,
    #[serde(default, deserialize_with = "deserialize_optional_nullable")]
    #[schema(value_type = Option<String>)]
    pub muted_until: Option<Option<DateTime<Utc>>>,
}

/// Deserialize a double-option field: absent → `None`, `null` →
/// `Some(None)`, value → `Some(Some(v))`.
fn deserialize_optional_nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn monitor_type_round_trips_through_strings() {
        for t in [
            MonitorType::HttpRequest,
            MonitorType::Website,
            MonitorType::PingHost,
            MonitorType::PortCheck,
            MonitorType::SyntheticTest,
        ] {
            let parsed: MonitorType = t.to_string().parse().unwrap();
            assert_eq!(parsed, t);
        }
    }

    #[test]
    fn config_union_rejects_type_mismatch_payload() {
        // port_check without the required port field
        let err = MonitorConfig::from_type_and_value(MonitorType::PortCheck, Some(json!({})))
            .unwrap_err();
        assert!(err.contains("port_check"), "unexpected error: {err}");
    }

    #[test]
    fn config_union_applies_defaults() {
        let cfg =
            MonitorConfig::from_type_and_value(MonitorType::HttpRequest, None).unwrap();
        match cfg {
            MonitorConfig::HttpRequest(http) => {
                assert_eq!(http.method, "GET");
                assert_eq!(http.expected_status_codes, "200-299");
                assert!(http.timeout_secs.is_none());
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn location_config_rejects_empty_locations() {
        let lc = LocationConfig {
            enabled: true,
            locations: vec![],
            strategy: AggregationStrategy::Majority,
            threshold_percent: 50,
        };
        assert!(lc.validate().is_err());
    }

    #[test]
    fn strategy_thresholds_follow_spec_table() {
        assert_eq!(AggregationStrategy::All.effective_threshold(42), 100);
        assert_eq!(AggregationStrategy::Majority.effective_threshold(42), 50);
        assert_eq!(AggregationStrategy::Any.effective_threshold(42), 1);
        assert_eq!(AggregationStrategy::Custom.effective_threshold(42), 42);
    }

    #[test]
    fn alert_config_validates_thresholds() {
        let mut cfg = AlertConfig::default();
        assert!(cfg.validate().is_ok());
        cfg.failure_threshold = 0;
        assert!(cfg.validate().is_err());
    }
}
