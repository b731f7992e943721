use crate::audio::AudioConfig;
use crate::error::{Error, Result};
use std::time::Duration;
use url::Url;

/// 运行时可覆盖 ws_url 的环境变量
pub const WS_URL_ENV: &str = "RECORDER_WS_URL";

#[derive(Debug, Clone)]
pub struct Config {
    pub app_name: &'static str,
    pub app_version: &'static str,

    pub audio: AudioConfig,

    // 网络配置
    pub ws_url: String,
    pub connect_timeout_ms: u64,
}

impl Config {
    /// 从编译时设置的环境变量创建配置
    /// 所有参数都在编译时从 config.toml 中读取，ws_url 可在运行时通过 RECORDER_WS_URL 覆盖
    pub fn new() -> Result<Self> {
        let audio = AudioConfig {
            capture_device: env!("CAPTURE_DEVICE").to_string(),
            input_sample_rate: parse_env("INPUT_SAMPLE_RATE", env!("INPUT_SAMPLE_RATE"))?,
            output_sample_rate: parse_env("OUTPUT_SAMPLE_RATE", env!("OUTPUT_SAMPLE_RATE"))?,
            quantum_size: parse_env("QUANTUM_SIZE", env!("QUANTUM_SIZE"))?,
            flush_quanta: parse_env("FLUSH_QUANTA", env!("FLUSH_QUANTA"))?,
            max_frame_bytes: parse_env("MAX_FRAME_BYTES", env!("MAX_FRAME_BYTES"))?,
            relay_capacity: parse_env("RELAY_CAPACITY", env!("RELAY_CAPACITY"))?,
        };

        let ws_url = std::env::var(WS_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| env!("WS_URL").to_string());

        let config = Self {
            app_name: env!("APP_NAME"),
            app_version: env!("APP_VERSION"),
            audio,
            ws_url,
            connect_timeout_ms: parse_env("CONNECT_TIMEOUT_MS", env!("CONNECT_TIMEOUT_MS"))?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.audio.validate()?;

        let url = Url::parse(&self.ws_url)
            .map_err(|e| Error::Config(format!("invalid ws_url '{}': {}", self.ws_url, e)))?;
        match url.scheme() {
            "ws" | "wss" => Ok(()),
            other => Err(Error::Config(format!(
                "ws_url must use ws:// or wss://, got '{}://'",
                other
            ))),
        }
    }

    /// None 表示不设置握手超时
    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.connect_timeout_ms > 0).then(|| Duration::from_millis(self.connect_timeout_ms))
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| Error::Config(format!("Failed to parse {}: '{}'", name, raw)))
}
