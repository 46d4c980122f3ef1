use anyhow::{Context, Result};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::browser::LaunchOptions;

/// 启动浏览器并导航到指定 URL
///
/// 返回的 JoinHandle 是后台事件循环，会话结束时需要中止
pub async fn launch_browser(options: &LaunchOptions, url: &str) -> Result<(Browser, Page, JoinHandle<()>)> {
    info!(
        "🚀 启动浏览器 ({}, {})...",
        options.engine.name(),
        if options.headless { "无头" } else { "有界面" }
    );
    debug!("目标 URL: {}", url);

    let mut builder = BrowserConfig::builder();
    builder = if options.headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };
    if let Some(executable) = options.resolve_executable() {
        debug!("浏览器可执行文件: {}", executable.display());
        builder = builder.chrome_executable(executable);
    }

    let config = builder
        .args(vec![
            "--disable-gpu",           // 无头模式下禁用 GPU
            "--no-sandbox",            // 容器内没有沙盒权限
            "--disable-dev-shm-usage", // 防止共享内存不足
            "--window-size=1920,1080", // 侧边菜单需要足够宽度才显示链接文本
        ])
        .build()
        .map_err(|e| {
            error!("配置浏览器失败: {}", e);
            anyhow::anyhow!("配置浏览器失败: {}", e)
        })?;

    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        anyhow::anyhow!("启动浏览器失败: {}", e)
    })?;
    debug!("浏览器启动成功");

    // 在后台处理浏览器事件
    let handler_task = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    let page = browser
        .new_page(url)
        .await
        .with_context(|| format!("创建页面失败: {}", url))?;

    info!("✅ 浏览器已导航到: {}", url);

    Ok((browser, page, handler_task))
}
