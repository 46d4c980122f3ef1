/// 日志工具模块
///
/// 提供日志格式化和输出的辅助函数
use tracing::info;

use crate::config::Config;
use crate::models::{Question, SuiteKind};

/// 记录程序启动信息
pub fn log_startup(config: &Config, suite: SuiteKind) {
    info!("{}", "=".repeat(60));
    info!("🚀 NMOS 控制器测试代理启动");
    info!(
        "启动时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("📋 测试套件: {}", suite);
    info!("🌐 被测控制器: {}", config.ncut_url);
    info!("🗂️ Mock Registry: {}", config.mock_registry_url);
    match config.browser_debug_port {
        Some(port) => info!("🔌 浏览器: 连接调试端口 {}", port),
        None => info!(
            "🔌 浏览器: {} ({})",
            config.browser.name(),
            if config.headless { "无头" } else { "有界面" }
        ),
    }
    info!("👂 监听地址: {}:{}", config.host, config.port);
    info!("{}", "=".repeat(60));
}

/// 记录收到的题目
pub fn log_question(question: &Question) {
    info!("\n{}", "─".repeat(60));
    info!("📨 [{}] {}", question.question_id, question.name);
    info!("题目: {}", truncate_text(&question.question, 80));
    info!(
        "候选答案: {} 个 | 超时: {}s",
        question.answers.len(),
        question.timeout
    );
    info!("{}", "─".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
