//! HTTP 入口 - 编排层
//!
//! ## 路由
//!
//! - `POST /x-nmos/testquestion/{version}`：接收题目或 `clear`，立即返回 202
//! - `GET /controller_questions`：当前题目（不含答案）
//! - `GET /health`：运行状态
//!
//! 请求路径上不做任何等待，题目交给 `Executor` 在后台处理

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::Value as JsonValue;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::browser::{ChromiumLauncher, LaunchOptions, SessionLauncher};
use crate::config::Config;
use crate::error::{AppResult, StoreError};
use crate::models::question::is_clear_request;
use crate::models::{Question, SuiteKind};
use crate::orchestrator::executor::Executor;
use crate::services::QuestionStore;
use crate::utils::logging::log_startup;
use crate::workflow::TestSuite;

/// 路由共享状态
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<QuestionStore>,
    pub executor: Arc<Executor>,
    pub suite: SuiteKind,
}

/// 构建路由（版本号与末尾斜杠都接受）
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/x-nmos/testquestion/:version", post(question_handler))
        .route("/x-nmos/testquestion/:version/", post(question_handler))
        .route("/controller_questions", get(controller_questions_handler))
        .route("/controller_questions/", get(controller_questions_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

async fn question_handler(
    State(state): State<AppState>,
    Path(version): Path<String>,
    body: Bytes,
) -> Response {
    let body: JsonValue = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            debug!("无法解析请求体: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid JSON received").into_response();
        }
    };

    if is_clear_request(&body) {
        info!("🧹 收到 clear 请求");
        state.store.clear();
        return StatusCode::ACCEPTED.into_response();
    }

    let question = match Question::from_json(&body) {
        Ok(q) => q,
        Err(StoreError::Validation(message)) => {
            warn!("⚠️ 拒绝题目: {}", message);
            return (StatusCode::BAD_REQUEST, message).into_response();
        }
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    let ticket = match state.store.submit(question.clone()) {
        Ok(ticket) => ticket,
        Err(StoreError::Busy { question_id }) => {
            warn!("⚠️ 题目 {} 仍在处理中，拒绝 {}", question_id, question.question_id);
            return (
                StatusCode::CONFLICT,
                format!("Question {} still in progress", question_id),
            )
                .into_response();
        }
        Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    };

    debug!("接受题目 {} (testquestion {})", ticket.question_id(), version);
    state.executor.spawn(ticket, question);
    StatusCode::ACCEPTED.into_response()
}

async fn controller_questions_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.store.current_question_view())
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "suite": state.suite.name(),
    }))
}

/// 应用主结构
pub struct App {
    config: Config,
    state: AppState,
}

impl App {
    /// 用 chromiumoxide 启动器初始化应用
    pub fn initialize(config: Config, suite: SuiteKind) -> AppResult<Self> {
        let launcher = Arc::new(ChromiumLauncher::new(LaunchOptions::from_config(&config)));
        Self::with_launcher(config, suite, launcher)
    }

    /// 使用指定的会话启动器初始化应用
    pub fn with_launcher(
        config: Config,
        suite: SuiteKind,
        launcher: Arc<dyn SessionLauncher>,
    ) -> AppResult<Self> {
        let routines = TestSuite::new(suite);
        info!("📋 {} 共 {} 道题目: {}", suite, routines.question_ids().len(), routines.question_ids().join(", "));
        let store = Arc::new(QuestionStore::new());
        let executor = Executor::new(config.clone(), Arc::clone(&store), Arc::new(routines), launcher)?;

        Ok(Self {
            config,
            state: AppState {
                store,
                executor: Arc::new(executor),
                suite,
            },
        })
    }

    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    pub fn store(&self) -> Arc<QuestionStore> {
        Arc::clone(&self.state.store)
    }

    /// 测试套件结束（post_tests_message 已回调）时触发
    pub fn shutdown_signal(&self) -> Arc<Notify> {
        self.state.executor.shutdown_signal()
    }

    /// 运行 HTTP 服务，直到 Ctrl-C 或测试套件结束
    pub async fn run(self) -> AppResult<()> {
        log_startup(&self.config, self.state.suite);

        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        info!("✓ 开始监听 http://{}", addr);

        let finished = self.state.executor.shutdown_signal();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = finished.notified() => info!("👋 测试套件已结束，正在退出"),
                    _ = tokio::signal::ctrl_c() => info!("👋 收到 Ctrl-C，正在退出"),
                }
            })
            .await?;

        info!("✓ 服务已停止");
        Ok(())
    }
}
