//! 集成测试共用的脚本化假浏览器
//!
//! `FakeUi` 模拟 nmos-js 的几个页面：Settings、Senders/Receivers 列表、接收端详情（Connect / Active 标签）。
//! 刷新按钮每点一次，从 `refresh_script` 取出一个变化应用到界面上

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use axum::{extract::Path, http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value};
use tokio::sync::mpsc;

use nmos_testing_facade::browser::{BrowserSession, Locator, SessionLauncher};
use nmos_testing_facade::config::Config;
use nmos_testing_facade::error::DriverError;
use nmos_testing_facade::models::{AnswerOption, Question};
use nmos_testing_facade::services::{ControllerDriver, DriverSettings, DriverTiming, UiConventions};
use nmos_testing_facade::QuestionCtx;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Blank,
    Settings,
    Senders,
    Receivers,
    Receiver { label: String, tab: Tab },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Overview,
    Connect,
    Active,
}

#[derive(Debug, Clone)]
pub struct FakeReceiver {
    pub label: String,
    pub connectable: bool,
    pub connected: Option<String>,
}

impl FakeReceiver {
    pub fn new(label: &str, connectable: bool) -> Self {
        Self {
            label: label.to_string(),
            connectable,
            connected: None,
        }
    }
}

/// 一次刷新带来的变化
#[derive(Debug, Clone)]
pub enum Mutation {
    Senders(Vec<String>),
    Disconnect(String),
    Nothing,
}

#[derive(Debug)]
pub struct FakeUi {
    pub view: View,
    pub senders: Vec<String>,
    /// 0 表示不分页
    pub page_size: usize,
    pub page: usize,
    pub receivers: Vec<FakeReceiver>,
    pub refresh_script: VecDeque<Mutation>,
    pub menu_open: bool,
    pub rql_enabled: bool,
    pub query_api: String,
    pub launches: usize,
    pub closes: usize,
    pub refreshes: usize,
    pub next_clicks: usize,
    pub panic_on_refresh: bool,
    /// 刷新按钮永远不返回
    pub stall_on_refresh: bool,
    pub launch_delay: Duration,
    pub close_delay: Duration,
}

impl Default for FakeUi {
    fn default() -> Self {
        Self {
            view: View::Blank,
            senders: Vec::new(),
            page_size: 0,
            page: 0,
            receivers: Vec::new(),
            refresh_script: VecDeque::new(),
            menu_open: false,
            rql_enabled: true,
            query_api: String::new(),
            launches: 0,
            closes: 0,
            refreshes: 0,
            next_clicks: 0,
            panic_on_refresh: false,
            stall_on_refresh: false,
            launch_delay: Duration::ZERO,
            close_delay: Duration::ZERO,
        }
    }
}

pub type SharedUi = Arc<Mutex<FakeUi>>;

pub fn shared_ui(ui: FakeUi) -> SharedUi {
    Arc::new(Mutex::new(ui))
}

pub fn lock(ui: &SharedUi) -> MutexGuard<'_, FakeUi> {
    ui.lock().unwrap_or_else(|p| p.into_inner())
}

pub fn labels(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl FakeUi {
    fn current_receiver(&self) -> Option<&FakeReceiver> {
        match &self.view {
            View::Receiver { label, .. } => self.receivers.iter().find(|r| &r.label == label),
            _ => None,
        }
    }

    fn current_receiver_mut(&mut self) -> Option<&mut FakeReceiver> {
        let View::Receiver { label, .. } = &self.view else {
            return None;
        };
        let label = label.clone();
        self.receivers.iter_mut().find(|r| r.label == label)
    }

    fn set_tab(&mut self, new_tab: Tab) {
        if let View::Receiver { tab, .. } = &mut self.view {
            *tab = new_tab;
        }
    }

    fn sender_page(&self) -> Vec<String> {
        if self.page_size == 0 {
            return if self.page == 0 { self.senders.clone() } else { Vec::new() };
        }
        self.senders
            .iter()
            .skip(self.page * self.page_size)
            .take(self.page_size)
            .cloned()
            .collect()
    }

    fn links(&self) -> Vec<String> {
        let mut links = labels(&["Senders", "Receivers"]);
        if self.view == View::Receivers {
            links.extend(self.receivers.iter().map(|r| r.label.clone()));
        }
        links
    }

    fn texts(&self, locator: &Locator) -> Vec<String> {
        match (locator, &self.view) {
            (Locator::Name(n), View::Senders) if n == "label" => self.sender_page(),
            (Locator::Name(n), View::Receivers) if n == "label" => {
                self.receivers.iter().map(|r| r.label.clone()).collect()
            }
            (Locator::Name(n), View::Receiver { tab: Tab::Connect, .. }) if n == "label" => self.senders.clone(),
            (Locator::Name(n), View::Receiver { tab: Tab::Active, .. }) if n == "sender" => self
                .current_receiver()
                .and_then(|r| r.connected.clone())
                .into_iter()
                .collect(),
            (Locator::LinkText(text), _) => self.links().into_iter().filter(|l| l == text).collect(),
            _ => Vec::new(),
        }
    }

    fn count(&self, locator: &Locator) -> usize {
        let is_list = matches!(self.view, View::Senders | View::Receivers);
        let is_detail = matches!(self.view, View::Receiver { .. });
        match locator {
            Locator::Name(n) if n == "queryapi" || n == "userql" => usize::from(self.view == View::Settings),
            Locator::XPath(_) => usize::from(!self.menu_open),
            Locator::Css(_) => usize::from(is_list || is_detail),
            Locator::Name(n) if n == "next" => usize::from(is_list),
            Locator::Name(n) if n == "connect" => usize::from(is_detail),
            Locator::Name(n) if n == "activate" => match self.view {
                View::Receiver { tab: Tab::Connect, .. } => self.senders.len(),
                _ => 0,
            },
            Locator::Name(n) if n == "active" => match self.view {
                View::Receivers => self.receivers.len(),
                View::Receiver { .. } => 1,
                _ => 0,
            },
            other => self.texts(other).len(),
        }
    }

    fn attributes(&self, locator: &Locator, name: &str) -> Vec<Option<String>> {
        match (locator, name) {
            (Locator::Name(n), "checked") if n == "userql" && self.view == View::Settings => {
                vec![Some(self.rql_enabled.to_string())]
            }
            (Locator::Name(n), "aria-disabled") if n == "connect" => self
                .current_receiver()
                .map(|r| Some((!r.connectable).to_string()))
                .into_iter()
                .collect(),
            (Locator::Name(n), "value") if n == "active" && self.view == View::Receivers => self
                .receivers
                .iter()
                .map(|r| Some(r.connected.is_some().to_string()))
                .collect(),
            _ => vec![None; self.count(locator)],
        }
    }

    fn apply(&mut self, mutation: Mutation) {
        match mutation {
            Mutation::Senders(senders) => self.senders = senders,
            Mutation::Disconnect(label) => {
                if let Some(r) = self.receivers.iter_mut().find(|r| r.label == label) {
                    r.connected = None;
                }
            }
            Mutation::Nothing => {}
        }
    }

    fn click(&mut self, locator: &Locator, index: usize) -> Result<(), DriverError> {
        if index >= self.count(locator) {
            return Err(DriverError::ElementNotFound(locator.clone()));
        }
        match locator {
            Locator::Name(n) if n == "userql" => self.rql_enabled = !self.rql_enabled,
            Locator::XPath(_) => self.menu_open = true,
            Locator::Css(_) => {
                self.refreshes += 1;
                if let Some(mutation) = self.refresh_script.pop_front() {
                    self.apply(mutation);
                }
            }
            Locator::Name(n) if n == "next" => {
                self.next_clicks += 1;
                self.page += 1;
            }
            Locator::LinkText(text) => {
                self.page = 0;
                self.view = match text.as_str() {
                    "Senders" => View::Senders,
                    "Receivers" => View::Receivers,
                    label => View::Receiver {
                        label: label.to_string(),
                        tab: Tab::Overview,
                    },
                };
            }
            Locator::Name(n) if n == "connect" => {
                if self.current_receiver().map(|r| r.connectable).unwrap_or(false) {
                    self.set_tab(Tab::Connect);
                }
            }
            Locator::Name(n) if n == "activate" => {
                let sender = self.senders[index].clone();
                if let Some(r) = self.current_receiver_mut() {
                    r.connected = Some(sender);
                }
            }
            Locator::Name(n) if n == "active" => match self.view {
                View::Receivers => self.receivers[index].connected = None,
                _ => self.set_tab(Tab::Active),
            },
            _ => {}
        }
        Ok(())
    }
}

/// 脚本化的浏览器会话
pub struct FakeBrowser {
    ui: SharedUi,
}

impl FakeBrowser {
    pub fn new(ui: SharedUi) -> Self {
        Self { ui }
    }
}

#[async_trait]
impl BrowserSession for FakeBrowser {
    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        let mut ui = lock(&self.ui);
        ui.view = if url.ends_with("Settings") { View::Settings } else { View::Blank };
        Ok(())
    }

    async fn count(&self, locator: &Locator) -> Result<usize, DriverError> {
        Ok(lock(&self.ui).count(locator))
    }

    async fn texts(&self, locator: &Locator) -> Result<Vec<String>, DriverError> {
        Ok(lock(&self.ui).texts(locator))
    }

    async fn attributes(&self, locator: &Locator, name: &str) -> Result<Vec<Option<String>>, DriverError> {
        Ok(lock(&self.ui).attributes(locator, name))
    }

    async fn click(&self, locator: &Locator, index: usize) -> Result<(), DriverError> {
        let (explode, stall) = {
            let ui = lock(&self.ui);
            let refresh = matches!(locator, Locator::Css(_));
            (refresh && ui.panic_on_refresh, refresh && ui.stall_on_refresh)
        };
        if explode {
            panic!("脚本要求刷新时 panic");
        }
        if stall {
            std::future::pending::<()>().await;
        }
        lock(&self.ui).click(locator, index)
    }

    async fn fill(&self, locator: &Locator, text: &str) -> Result<(), DriverError> {
        let mut ui = lock(&self.ui);
        if ui.count(locator) == 0 {
            return Err(DriverError::ElementNotFound(locator.clone()));
        }
        ui.query_api = text.to_string();
        Ok(())
    }

    async fn close(&self) -> Result<(), DriverError> {
        let delay = {
            let mut ui = lock(&self.ui);
            ui.closes += 1;
            ui.close_delay
        };
        tokio::time::sleep(delay).await;
        Ok(())
    }
}

/// 每次启动都返回同一个界面上的新会话
pub struct FakeLauncher {
    ui: SharedUi,
}

impl FakeLauncher {
    pub fn new(ui: SharedUi) -> Self {
        Self { ui }
    }
}

#[async_trait]
impl SessionLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, DriverError> {
        let delay = {
            let mut ui = lock(&self.ui);
            ui.launches += 1;
            ui.launch_delay
        };
        tokio::time::sleep(delay).await;
        Ok(Box::new(FakeBrowser::new(Arc::clone(&self.ui))))
    }
}

pub fn driver_settings() -> DriverSettings {
    DriverSettings {
        settings_url: "http://localhost:3000/#/Settings".to_string(),
        query_api_url: "http://127.0.0.1:5102/x-nmos/query/v1.3".to_string(),
        timing: DriverTiming {
            wait_time: Duration::from_millis(50),
            settle_delay: Duration::from_millis(1),
            action_delay: Duration::from_millis(2),
        },
        ui: UiConventions::default(),
    }
}

pub fn driver(ui: &SharedUi) -> ControllerDriver {
    ControllerDriver::new(Box::new(FakeBrowser::new(Arc::clone(ui))), driver_settings())
}

/// 候选答案：answer_id 从 1 开始
pub fn answers(items: &[&str]) -> Vec<AnswerOption> {
    let list: Vec<Value> = items
        .iter()
        .enumerate()
        .map(|(i, label)| json!({"answer_id": i + 1, "resource": {"id": format!("id-{}", i + 1), "label": label}}))
        .collect();
    serde_json::from_value(Value::Array(list)).expect("候选答案格式错误")
}

pub fn ctx(id: &str, items: &[&str], metadata: Value) -> QuestionCtx {
    QuestionCtx {
        question_id: id.to_string(),
        answers: answers(items),
        metadata,
        poll_budget: Duration::from_secs(30),
        poll_interval: Duration::from_secs(1),
    }
}

/// 测试工具发来的题目
pub fn question_body(id: &str, items: &[&str], answer_uri: &str) -> Value {
    let answers: Vec<Value> = items
        .iter()
        .enumerate()
        .map(|(i, label)| json!({"answer_id": i + 1, "resource": {"label": label}}))
        .collect();
    json!({
        "test_type": "multi_choice",
        "question_id": id,
        "name": id,
        "description": "",
        "question": format!("question {}", id),
        "answers": answers,
        "timeout": 5,
        "answer_uri": answer_uri,
        "metadata": {}
    })
}

pub fn question(id: &str, items: &[&str], answer_uri: &str) -> Question {
    Question::from_json(&question_body(id, items, answer_uri)).expect("题目格式错误")
}

/// 测试用配置：不等待元素，短间隔
pub fn test_config() -> Config {
    Config {
        wait_time_secs: 0,
        settle_delay_ms: 1,
        poll_interval_ms: 10,
        callback_timeout_ms: 1000,
        routine_deadline_secs: 5,
        session_timeout_ms: 1000,
        ..Config::default()
    }
}

/// 本地答案接收端，`POST /answer/{name}` 的内容从 channel 取出
pub async fn spawn_answer_server() -> (String, mpsc::UnboundedReceiver<(String, Value)>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let app = Router::new().route(
        "/answer/:name",
        post(move |Path(name): Path<String>, Json(body): Json<Value>| {
            let tx = tx.clone();
            async move {
                let _ = tx.send((name, body));
                StatusCode::OK
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("绑定端口失败");
    let addr = listener.local_addr().expect("获取地址失败");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{}", addr), rx)
}
