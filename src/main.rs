use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use nmos_testing_facade::{logger, App, Config, SuiteKind};

#[derive(Parser)]
#[command(name = "nmos-testing-facade")]
#[command(about = "NMOS 控制器测试代理 - 自动回答测试工具的交互式题目")]
#[command(version)]
struct Cli {
    /// 测试套件 (IS-04-04, IS-05-03)
    #[arg(long)]
    suite: String,

    /// 配置文件 (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 覆盖监听端口
    #[arg(short, long)]
    port: Option<u16>,

    /// 输出 debug 日志
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志
    logger::init(cli.debug);

    // 解析测试套件
    let suite = SuiteKind::parse(&cli.suite)?;

    // 加载配置
    let mut config = match &cli.config {
        Some(path) => Config::load(path).await?,
        None => Config::from_env()?,
    };
    if let Some(port) = cli.port {
        config.port = port;
    }

    // 初始化并运行应用
    App::initialize(config, suite)?.run().await?;

    Ok(())
}
