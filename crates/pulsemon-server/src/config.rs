use pulsemon_common::types::MonitorType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// CORS 允许的 origins 列表，为空时允许所有来源（开发模式）
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,

    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub runner: RunnerConfig,

    /// 通知渠道种子：每个条目注册为一个 provider
    #[serde(default)]
    pub channels: Vec<ChannelSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// 完整数据库连接 URL；为空时使用 data_dir 下的 SQLite 文件
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            data_dir: default_data_dir(),
        }
    }
}

impl DatabaseConfig {
    pub fn connection_url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!("sqlite://{}/pulsemon.db?mode=rwc", self.data_dir),
        }
    }
}

/// Scheduling/execution engine knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// 最小检查间隔（秒），保存时强制
    #[serde(default = "default_min_frequency_secs")]
    pub min_frequency_secs: u64,
    /// 执行工作池容量（并发上限）
    #[serde(default = "default_worker_capacity")]
    pub worker_capacity: usize,
    /// 执行队列容量；超出容量的任务排队等待（背压，不拒绝）
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// 瞬态网络失败的最大执行尝试次数
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// 重试退避基数（毫秒），按尝试次数指数放大
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
    /// 响应体入库截断长度（字符）
    #[serde(default = "default_body_snippet_max_chars")]
    pub body_snippet_max_chars: usize,
    /// 允许探测内网地址（SSRF 防护开关，默认关闭）
    #[serde(default)]
    pub allow_internal_targets: bool,
    #[serde(default = "default_timeout_http_secs")]
    pub default_timeout_http_secs: u64,
    #[serde(default = "default_timeout_ping_secs")]
    pub default_timeout_ping_secs: u64,
    #[serde(default = "default_timeout_port_secs")]
    pub default_timeout_port_secs: u64,
    #[serde(default = "default_timeout_synthetic_secs")]
    pub default_timeout_synthetic_secs: u64,
    /// 检查结果保留天数
    #[serde(default = "default_result_retention_days")]
    pub result_retention_days: u32,
    /// 结果清理周期（秒）
    #[serde(default = "default_retention_sweep_secs")]
    pub retention_sweep_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_frequency_secs: default_min_frequency_secs(),
            worker_capacity: default_worker_capacity(),
            queue_capacity: default_queue_capacity(),
            max_attempts: default_max_attempts(),
            retry_base_ms: default_retry_base_ms(),
            body_snippet_max_chars: default_body_snippet_max_chars(),
            allow_internal_targets: false,
            default_timeout_http_secs: default_timeout_http_secs(),
            default_timeout_ping_secs: default_timeout_ping_secs(),
            default_timeout_port_secs: default_timeout_port_secs(),
            default_timeout_synthetic_secs: default_timeout_synthetic_secs(),
            result_retention_days: default_result_retention_days(),
            retention_sweep_secs: default_retention_sweep_secs(),
        }
    }
}

impl EngineConfig {
    /// Type-specific default deadline, used when the monitor config does not
    /// set one explicitly.
    pub fn default_timeout_secs(&self, monitor_type: MonitorType) -> u64 {
        match monitor_type {
            MonitorType::HttpRequest | MonitorType::Website => self.default_timeout_http_secs,
            MonitorType::PingHost => self.default_timeout_ping_secs,
            MonitorType::PortCheck => self.default_timeout_port_secs,
            MonitorType::SyntheticTest => self.default_timeout_synthetic_secs,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RunnerConfig {
    /// 合成测试 runner 端点；为空时合成监控记录 runner 错误
    #[serde(default)]
    pub url: Option<String>,
}

/// 通知渠道种子条目（`[[channels]]`）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSeed {
    /// Provider ID，监控告警配置中引用
    pub id: String,
    /// 渠道类型（如 webhook）
    pub channel_type: String,
    /// 渠道配置（传给对应插件校验）
    pub config: serde_json::Value,
}

impl Default for ServerConfig {
    /// Matches the serde field defaults, so a missing config file and an
    /// empty config file behave identically.
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            cors_allowed_origins: Vec::new(),
            database: DatabaseConfig::default(),
            engine: EngineConfig::default(),
            runner: RunnerConfig::default(),
            channels: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}

fn default_http_port() -> u16 {
    8686
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_min_frequency_secs() -> u64 {
    60
}

fn default_worker_capacity() -> usize {
    16
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_base_ms() -> u64 {
    500
}

fn default_body_snippet_max_chars() -> usize {
    1000
}

fn default_timeout_http_secs() -> u64 {
    30
}

fn default_timeout_ping_secs() -> u64 {
    5
}

fn default_timeout_port_secs() -> u64 {
    10
}

fn default_timeout_synthetic_secs() -> u64 {
    60
}

fn default_result_retention_days() -> u32 {
    30
}

fn default_retention_sweep_secs() -> u64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config.http_port, 8686);
        assert_eq!(config.engine.min_frequency_secs, 60);
        assert_eq!(config.engine.max_attempts, 3);
        assert_eq!(config.engine.body_snippet_max_chars, 1000);
        assert!(!config.engine.allow_internal_targets);
        assert!(config.channels.is_empty());
    }

    #[test]
    fn per_type_timeout_defaults() {
        let engine = EngineConfig::default();
        assert_eq!(engine.default_timeout_secs(MonitorType::HttpRequest), 30);
        assert_eq!(engine.default_timeout_secs(MonitorType::Website), 30);
        assert_eq!(engine.default_timeout_secs(MonitorType::PingHost), 5);
        assert_eq!(engine.default_timeout_secs(MonitorType::PortCheck), 10);
        assert_eq!(engine.default_timeout_secs(MonitorType::SyntheticTest), 60);
    }

    #[test]
    fn channel_seeds_parse_from_toml() {
        let config: ServerConfig = toml::from_str(
            r#"
            [[channels]]
            id = "ops-webhook"
            channel_type = "webhook"
            [channels.config]
            url = "https://hooks.example.com/pulsemon"
            "#,
        )
        .unwrap();
        assert_eq!(config.channels.len(), 1);
        assert_eq!(config.channels[0].id, "ops-webhook");
        assert_eq!(
            config.channels[0].config["url"],
            "https://hooks.example.com/pulsemon"
        );
    }

    #[test]
    fn sqlite_url_is_derived_from_data_dir() {
        let db = DatabaseConfig::default();
        assert_eq!(db.connection_url(), "sqlite://data/pulsemon.db?mode=rwc");
        let db = DatabaseConfig {
            url: Some("postgres://mon:secret@db/pulsemon".to_string()),
            data_dir: "data".to_string(),
        };
        assert_eq!(db.connection_url(), "postgres://mon:secret@db/pulsemon");
    }
}
