//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责接收题目和调度执行，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `dispatcher` - HTTP 入口
//! - 校验入站题目，写入 `QuestionStore`
//! - 立即返回 202，把题目交给执行器
//! - 提供当前题目查询与健康检查
//!
//! ### `executor` - 题目执行器
//! - 执行锁保证同一时间只有一个例程
//! - 管理浏览器会话的启动与关闭
//! - 记录答案并回调测试套件
//!
//! ## 层次关系
//!
//! ```text
//! dispatcher (HTTP)
//!     ↓
//! executor (单道题目的生命周期)
//!     ↓
//! workflow::Routine (界面操作流程)
//!     ↓
//! services (能力层：driver / store / callback)
//!     ↓
//! infrastructure (基础设施：JsExecutor / ChromiumSession)
//! ```

pub mod dispatcher;
pub mod executor;

// 重新导出主要类型
pub use dispatcher::{router, App, AppState};
pub use executor::Executor;
