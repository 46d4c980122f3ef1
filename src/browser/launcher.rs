use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::browser::{connect_to_browser_and_page, launch_browser, BrowserSession, SessionLauncher};
use crate::config::{BrowserEngine, Config};
use crate::error::DriverError;
use crate::infrastructure::{ChromiumSession, JsExecutor};

/// 浏览器启动参数
#[derive(Clone, Debug)]
pub struct LaunchOptions {
    pub engine: BrowserEngine,
    pub executable: Option<PathBuf>,
    pub headless: bool,
    /// 设置后连接已运行的浏览器
    pub debug_port: Option<u16>,
    /// 会话打开的第一个页面
    pub start_url: String,
}

impl LaunchOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            engine: config.browser,
            executable: config.browser_executable.as_ref().map(PathBuf::from),
            headless: config.headless,
            debug_port: config.browser_debug_port,
            start_url: config.settings_url(),
        }
    }

    /// 显式路径优先，其次该引擎的常见安装位置
    pub fn resolve_executable(&self) -> Option<PathBuf> {
        if let Some(path) = &self.executable {
            return Some(path.clone());
        }
        self.engine
            .default_executables()
            .iter()
            .map(Path::new)
            .find(|p| p.exists())
            .map(Path::to_path_buf)
    }
}

/// chromiumoxide 会话工厂
pub struct ChromiumLauncher {
    options: LaunchOptions,
}

impl ChromiumLauncher {
    pub fn new(options: LaunchOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl SessionLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, DriverError> {
        let session = match self.options.debug_port {
            Some(port) => {
                debug!("使用调试端口 {} 上的浏览器", port);
                let (browser, page, handler) = connect_to_browser_and_page(port, &self.options.start_url)
                    .await
                    .map_err(|e| DriverError::Launch(format!("{:#}", e)))?;
                ChromiumSession::attached(browser, JsExecutor::new(page), handler)
            }
            None => {
                let (browser, page, handler) = launch_browser(&self.options, &self.options.start_url)
                    .await
                    .map_err(|e| DriverError::Launch(format!("{:#}", e)))?;
                ChromiumSession::launched(browser, JsExecutor::new(page), handler)
            }
        };
        Ok(Box::new(session))
    }
}
