use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 初始化日志
///
/// 级别从 `RUST_LOG` 读取，默认 info；`debug` 为 true 时强制 debug
pub fn init(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // 测试中可能被多次调用
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .try_init();
}
