//! # NMOS Testing Facade
//!
//! NMOS 控制器测试代理：接收 NMOS 测试工具发来的交互式题目，
//! 驱动浏览器操作被测控制器（nmos-js），再把答案回传给测试工具
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `JsExecutor` - 唯一的 page owner，提供 eval() 能力
//! - `ChromiumSession` - 基于 JsExecutor 实现 `BrowserSession`
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `QuestionStore` - 单槽题目存储
//! - `ControllerDriver` - 操作控制器界面的能力（导航、刷新、翻页、读标签）
//! - `CallbackReporter` - 把答案 POST 给测试工具
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一道题"在界面上怎么做
//! - `Routine` - 例程（浏览、比对、轮询、连接）
//! - `TestSuite` - 按套件组织的例程表，以及多段题目的共享数据
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/dispatcher` - HTTP 入口
//! - `orchestrator/executor` - 单道题目的完整生命周期
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::{BrowserSession, Locator, SessionLauncher};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::JsExecutor;
pub use models::{Question, SuiteKind};
pub use orchestrator::{App, Executor};
pub use workflow::{QuestionCtx, Routine, TestSuite};
