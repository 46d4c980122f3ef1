use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::models::loaders::load_toml;

/// 浏览器引擎
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserEngine {
    Chrome,
    Chromium,
    Edge,
}

impl BrowserEngine {
    pub fn name(self) -> &'static str {
        match self {
            BrowserEngine::Chrome => "chrome",
            BrowserEngine::Chromium => "chromium",
            BrowserEngine::Edge => "edge",
        }
    }

    /// 未指定可执行文件时尝试的默认路径，空表示交给 chromiumoxide 自动探测
    pub fn default_executables(self) -> &'static [&'static str] {
        match self {
            BrowserEngine::Chrome => &[],
            BrowserEngine::Chromium => &["/usr/bin/chromium", "/usr/bin/chromium-browser"],
            BrowserEngine::Edge => &[
                "/usr/bin/microsoft-edge",
                "/opt/microsoft/msedge/msedge",
                "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
                r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
            ],
        }
    }
}

impl FromStr for BrowserEngine {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chrome" => Ok(BrowserEngine::Chrome),
            "chromium" => Ok(BrowserEngine::Chromium),
            "edge" | "msedge" => Ok(BrowserEngine::Edge),
            other => Err(ConfigError::UnknownBrowser(other.to_string())),
        }
    }
}

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
    /// 被测控制器（nmos-js）的地址
    pub ncut_url: String,
    /// 测试工具 mock registry 的地址
    pub mock_registry_url: String,
    /// 浏览器引擎
    pub browser: BrowserEngine,
    /// 浏览器可执行文件路径
    pub browser_executable: Option<String>,
    /// 已运行浏览器的调试端口，设置后连接该浏览器而不是启动新的
    pub browser_debug_port: Option<u16>,
    /// 是否无头模式
    pub headless: bool,
    /// 等待元素出现的秒数
    pub wait_time_secs: u64,
    /// 刷新/翻页后的等待毫秒数
    pub settle_delay_ms: u64,
    /// 轮询间隔毫秒数
    pub poll_interval_ms: u64,
    /// 回调请求超时毫秒数
    pub callback_timeout_ms: u64,
    /// 单个例程的最长执行秒数
    pub routine_deadline_secs: u64,
    /// 关闭浏览器会话的最长等待毫秒数
    pub session_timeout_ms: u64,
    /// 收到 post_tests_message 后退出
    pub exit_after_post_tests: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
            ncut_url: "http://localhost:3000/#/".to_string(),
            mock_registry_url: "http://127.0.0.1:5102/".to_string(),
            browser: BrowserEngine::Chrome,
            browser_executable: None,
            browser_debug_port: None,
            headless: true,
            wait_time_secs: 10,
            settle_delay_ms: 1000,
            poll_interval_ms: 4000,
            callback_timeout_ms: 1000,
            routine_deadline_secs: 120,
            session_timeout_ms: 10_000,
            exit_after_post_tests: true,
        }
    }
}

impl Config {
    /// 默认值 + 环境变量
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env()
    }

    /// 配置文件 + 环境变量
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let config: Config = load_toml(path).await.map_err(|e| ConfigError::File {
            path: path.display().to_string(),
            reason: format!("{:#}", e),
        })?;
        config.with_env()
    }

    /// 用环境变量覆盖当前值
    pub fn with_env(self) -> Result<Self, ConfigError> {
        self.with_vars(|key| std::env::var(key).ok())
    }

    /// 用 `lookup` 给出的变量覆盖当前值，无法解析的值直接报错
    pub fn with_vars<F>(self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &'static str| lookup(key).filter(|v| !v.trim().is_empty());
        let parse = |key: &'static str| -> Result<Option<u64>, ConfigError> {
            var(key).map(|v| parse_value(key, &v)).transpose()
        };

        let config = Self {
            host: var("FACADE_HOST").unwrap_or(self.host),
            port: var("FACADE_PORT")
                .map(|v| parse_value("FACADE_PORT", &v))
                .transpose()?
                .unwrap_or(self.port),
            ncut_url: var("NCUT_URL").unwrap_or(self.ncut_url),
            mock_registry_url: var("MOCK_REGISTRY_URL").unwrap_or(self.mock_registry_url),
            browser: var("FACADE_BROWSER").map(|v| v.parse::<BrowserEngine>()).transpose()?.unwrap_or(self.browser),
            browser_executable: var("BROWSER_EXECUTABLE").or(self.browser_executable),
            browser_debug_port: var("BROWSER_DEBUG_PORT")
                .map(|v| parse_value("BROWSER_DEBUG_PORT", &v))
                .transpose()?
                .or(self.browser_debug_port),
            headless: var("FACADE_HEADLESS")
                .map(|v| parse_flag("FACADE_HEADLESS", &v))
                .transpose()?
                .unwrap_or(self.headless),
            wait_time_secs: parse("FACADE_WAIT_TIME")?.unwrap_or(self.wait_time_secs),
            settle_delay_ms: parse("SETTLE_DELAY_MS")?.unwrap_or(self.settle_delay_ms),
            poll_interval_ms: parse("POLL_INTERVAL_MS")?.unwrap_or(self.poll_interval_ms),
            callback_timeout_ms: parse("CALLBACK_TIMEOUT_MS")?.unwrap_or(self.callback_timeout_ms),
            routine_deadline_secs: parse("ROUTINE_DEADLINE_SECS")?.unwrap_or(self.routine_deadline_secs),
            session_timeout_ms: parse("SESSION_TIMEOUT_MS")?.unwrap_or(self.session_timeout_ms),
            exit_after_post_tests: var("EXIT_AFTER_POST_TESTS")
                .map(|v| parse_flag("EXIT_AFTER_POST_TESTS", &v))
                .transpose()?
                .unwrap_or(self.exit_after_post_tests),
        };
        config.validate()?;
        Ok(config)
    }

    /// 检查 URL 与时间参数
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [("ncut_url", &self.ncut_url), ("mock_registry_url", &self.mock_registry_url)] {
            if !(value.starts_with("http://") || value.starts_with("https://")) {
                return Err(ConfigError::InvalidValue {
                    key,
                    value: value.clone(),
                });
            }
        }
        if !self.mock_registry_url.ends_with('/') {
            return Err(ConfigError::InvalidValue {
                key: "mock_registry_url",
                value: self.mock_registry_url.clone(),
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "poll_interval_ms",
                value: "0".to_string(),
            });
        }
        if self.routine_deadline_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "routine_deadline_secs",
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    pub fn wait_time(&self) -> Duration {
        Duration::from_secs(self.wait_time_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn callback_timeout(&self) -> Duration {
        Duration::from_millis(self.callback_timeout_ms)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }

    /// 例程结束后关闭会话与回调所需的时间
    pub fn answer_margin(&self) -> Duration {
        self.session_timeout() + self.callback_timeout()
    }

    /// 例程（含启动浏览器）的截止时间
    ///
    /// 题目自带超时时，先扣掉 `answer_margin`，保证测试套件放弃之前答案已送达并释放存储槽；
    /// 扣除后至少保留一半。结果不超过 `routine_deadline_secs`，没有有效超时时直接用上限。
    /// 全程在 f64 上比较，任意大的超时都不会溢出
    pub fn routine_deadline(&self, question_timeout_secs: f64) -> Duration {
        let cap = Duration::from_secs(self.routine_deadline_secs);
        let t = question_timeout_secs;
        if !(t.is_finite() && t > 0.0) {
            return cap;
        }
        let secs = (t - self.answer_margin().as_secs_f64()).max(t / 2.0);
        if secs < cap.as_secs_f64() {
            Duration::from_secs_f64(secs)
        } else {
            cap
        }
    }

    /// Settings 页地址
    pub fn settings_url(&self) -> String {
        format!("{}Settings", self.ncut_url)
    }

    /// 写入控制器的 Query API 地址
    pub fn query_api_url(&self) -> String {
        format!("{}x-nmos/query/v1.3", self.mock_registry_url)
    }
}

fn parse_value<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

/// true/false、1/0、yes/no、on/off，不区分大小写
fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}
