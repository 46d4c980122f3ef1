//! 题目执行器 - 编排层
//!
//! ## 职责
//!
//! 每道被接受的题目对应一次 `handle`：
//!
//! 1. 通过执行锁排队，同一时间只有一个例程操作浏览器
//! 2. 按题目 ID 找到例程，在截止时间内启动浏览器会话并运行例程
//! 3. 无论成功、失败、超时还是 panic，都在限定时间内关闭会话并记录答案（失败时为 null）
//! 4. 把答案 POST 到题目自带的 `answer_uri`，然后释放存储槽
//!
//! 题目在处理期间被清空时，不发送答案

use std::sync::Arc;

use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, error, info, warn};

use crate::browser::SessionLauncher;
use crate::config::Config;
use crate::error::{CallbackError, RoutineError};
use crate::models::question::{POST_TESTS_MESSAGE, PRE_TESTS_MESSAGE};
use crate::models::{AnswerResponse, Question};
use crate::services::{CallbackReporter, ControllerDriver, DriverSettings, QuestionStore, Ticket};
use crate::utils::logging::log_question;
use crate::workflow::{QuestionCtx, Routine, TestSuite};

/// 题目执行器
pub struct Executor {
    config: Config,
    store: Arc<QuestionStore>,
    suite: Arc<TestSuite>,
    launcher: Arc<dyn SessionLauncher>,
    reporter: CallbackReporter,
    driver_settings: DriverSettings,
    /// 串行化所有例程
    execution_lock: Mutex<()>,
    /// post_tests_message 处理完后通知服务退出
    shutdown: Arc<Notify>,
}

impl Executor {
    pub fn new(
        config: Config,
        store: Arc<QuestionStore>,
        suite: Arc<TestSuite>,
        launcher: Arc<dyn SessionLauncher>,
    ) -> Result<Self, CallbackError> {
        let reporter = CallbackReporter::new(config.callback_timeout())?;
        let driver_settings = DriverSettings::from_config(&config);
        Ok(Self {
            config,
            store,
            suite,
            launcher,
            reporter,
            driver_settings,
            execution_lock: Mutex::new(()),
            shutdown: Arc::new(Notify::new()),
        })
    }

    pub fn shutdown_signal(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown)
    }

    /// 在后台处理题目
    pub fn spawn(self: &Arc<Self>, ticket: Ticket, question: Question) -> JoinHandle<()> {
        let executor = Arc::clone(self);
        tokio::spawn(async move { executor.handle(ticket, question).await })
    }

    /// 处理一道题目：求解、记录、回调、释放
    ///
    /// 求解在单独的任务里进行，其中的 panic 只会让答案变成 null，存储槽照常释放
    pub async fn handle(self: Arc<Self>, ticket: Ticket, question: Question) {
        let _guard = self.execution_lock.lock().await;
        let id = question.question_id.clone();
        log_question(&question);

        let solver = Arc::clone(&self);
        let asked = question.clone();
        let answer = match tokio::spawn(async move { solver.answer(&asked).await }).await {
            Ok(answer) => answer,
            Err(e) => {
                error!("[{}] ❌ 求解任务异常结束，答案为 null: {}", id, e);
                None
            }
        };

        if let Err(e) = self.store.record_answer(&ticket, answer) {
            warn!("[{}] ⚠️ 题目已被清空，不发送答案: {}", id, e);
            return;
        }
        let payload = match self.store.answer_payload(&ticket) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("[{}] ⚠️ 无法构建回调内容: {}", id, e);
                return;
            }
        };

        if let Err(e) = self.reporter.post(&question.answer_uri, &payload).await {
            error!("[{}] ❌ 答案发送失败 ({}): {}", id, question.answer_uri, e);
        }
        if let Err(e) = self.store.mark_dispatched(&ticket) {
            debug!("[{}] 存储槽已被替换: {}", id, e);
        }

        if id == POST_TESTS_MESSAGE {
            info!("🏁 测试套件已结束");
            if self.config.exit_after_post_tests {
                self.shutdown.notify_one();
            }
        }
    }

    /// 求解题目，任何失败都得到 null
    async fn answer(&self, question: &Question) -> Option<AnswerResponse> {
        let id = question.question_id.as_str();

        if question.is_lifecycle_marker() {
            if id == PRE_TESTS_MESSAGE {
                // 新一轮测试，丢弃上一轮多段题目留下的数据
                self.suite.scratch().clear();
            }
            info!("[{}] 📨 确认消息，答案为 null", id);
            return None;
        }
        if !id.starts_with("test_") {
            warn!("[{}] ⚠️ 无法识别的题目，答案为 null", id);
            return None;
        }
        let Some(routine) = self.suite.routine(id) else {
            warn!("[{}] ⚠️ {} 中没有该题目，答案为 null", id, self.suite.kind());
            return None;
        };
        if let Some(text) = routine.fixed_answer() {
            info!("[{}] ✓ 固定答复", id);
            return Some(AnswerResponse::Text(text.to_string()));
        }

        match self.run_routine(routine, question).await {
            Ok(answer) => {
                info!("[{}] ✅ 答案: {}", id, serde_json::to_string(&answer).unwrap_or_default());
                Some(answer)
            }
            Err(e) if e.is_element_not_found() => {
                warn!("[{}] ⚠️ 界面上未找到元素，答案为 null: {}", id, e);
                None
            }
            Err(e) => {
                error!("[{}] ❌ 例程失败，答案为 null: {}", id, e);
                None
            }
        }
    }

    /// 在截止时间内启动会话并运行例程，最后总是关闭会话
    async fn run_routine(&self, routine: Routine, question: &Question) -> Result<AnswerResponse, RoutineError> {
        let deadline = self.config.routine_deadline(question.timeout);
        let deadline_at = Instant::now() + deadline;
        let ctx = QuestionCtx::new(question, self.config.poll_interval(), deadline);

        let session = match timeout_at(deadline_at, self.launcher.launch()).await {
            Ok(session) => session?,
            Err(_) => return Err(RoutineError::Timeout(format!("启动浏览器超过截止时间 {:?}", deadline))),
        };
        let driver = Arc::new(ControllerDriver::new(session, self.driver_settings.clone()));
        debug!("{} 浏览器会话已启动，截止时间 {:?}", ctx, deadline);

        let task_driver = Arc::clone(&driver);
        let suite = Arc::clone(&self.suite);
        let mut task = tokio::spawn(async move {
            task_driver.set_up().await.map_err(RoutineError::from)?;
            routine.run(&task_driver, &ctx, suite.scratch()).await
        });

        let result = match timeout_at(deadline_at, &mut task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) if join_err.is_panic() => Err(RoutineError::Aborted("例程 panic".to_string())),
            Ok(Err(join_err)) => Err(RoutineError::Aborted(join_err.to_string())),
            Err(_) => {
                task.abort();
                // 等任务真正结束，会话不再被使用
                let _ = task.await;
                Err(RoutineError::Timeout(format!("超过截止时间 {:?}", deadline)))
            }
        };

        match timeout(self.config.session_timeout(), driver.tear_down()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("[{}] ⚠️ 关闭浏览器会话失败: {}", question.question_id, e),
            Err(_) => warn!(
                "[{}] ⚠️ 关闭浏览器会话超过 {:?}，不再等待",
                question.question_id,
                self.config.session_timeout()
            ),
        }
        result
    }
}
