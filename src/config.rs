use crate::error::{AppResult, ConfigError};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// 程序配置
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// 远程 REST 服务地址
    pub api_base_url: String,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
    /// 倒计时周期（毫秒）
    pub tick_interval_ms: u64,
    /// 剩余时间低于该值时提示时间紧张（秒）
    pub low_time_threshold_secs: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080/api".to_string(),
            request_timeout_secs: 30,
            tick_interval_ms: 1000,
            low_time_threshold_secs: 300,
            verbose_logging: false,
            output_log_file: "quiz_session.log".to_string(),
        }
    }
}

impl Config {
    /// 先读取 `QUIZ_CONFIG_FILE` 指定的 TOML 文件（如果有），再叠加环境变量
    pub fn load() -> AppResult<Self> {
        let base = match std::env::var("QUIZ_CONFIG_FILE") {
            Ok(path) => Self::from_toml_file(&path)?,
            Err(_) => Self::default(),
        };
        base.with_env_overrides()
    }

    /// 只从环境变量读取，缺省值见 `Default`
    pub fn from_env() -> AppResult<Self> {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件读取，未出现的字段使用缺省值
    pub fn from_toml_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref().display().to_string();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadFailed {
            path: path.clone(),
            source: e,
        })?;
        Ok(parse_toml(&content, &path)?)
    }

    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        Ok(parse_toml(content, "<inline>")?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    fn with_env_overrides(self) -> AppResult<Self> {
        Ok(Self {
            api_base_url: std::env::var("API_BASE_URL").unwrap_or(self.api_base_url),
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", "u64")?
                .unwrap_or(self.request_timeout_secs),
            tick_interval_ms: env_parse("TICK_INTERVAL_MS", "u64")?.unwrap_or(self.tick_interval_ms),
            low_time_threshold_secs: env_parse("LOW_TIME_THRESHOLD_SECS", "u64")?
                .unwrap_or(self.low_time_threshold_secs),
            verbose_logging: env_parse("VERBOSE_LOGGING", "bool")?.unwrap_or(self.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(self.output_log_file),
        })
    }
}

fn parse_toml(content: &str, path: &str) -> Result<Config, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::TomlParseFailed {
        path: path.to_string(),
        source: e,
    })
}

/// 读取并解析环境变量；变量不存在时返回 `None`，无法解析时报错
fn env_parse<T: std::str::FromStr>(var_name: &str, expected_type: &str) -> AppResult<Option<T>> {
    match std::env::var(var_name) {
        Ok(value) => {
            let parsed = value.trim().parse::<T>();
            match parsed {
                Ok(parsed) => Ok(Some(parsed)),
                Err(_) => Err(ConfigError::EnvVarParseFailed {
                    var_name: var_name.to_string(),
                    value,
                    expected_type: expected_type.to_string(),
                }
                .into()),
            }
        }
        Err(_) => Ok(None),
    }
}
