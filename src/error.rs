use thiserror::Error;

use crate::browser::Locator;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 题目存储错误
    #[error("题目存储错误: {0}")]
    Store(#[from] StoreError),
    /// 浏览器驱动错误
    #[error("浏览器错误: {0}")]
    Driver(#[from] DriverError),
    /// 测试例程错误
    #[error("例程错误: {0}")]
    Routine(#[from] RoutineError),
    /// 回调投递错误
    #[error("回调错误: {0}")]
    Callback(#[from] CallbackError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// IO 错误（监听端口等）
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 题目存储错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// 入站题目缺少必填字段或格式错误
    #[error("{0}")]
    Validation(String),
    /// 上一道题目尚未投递答案
    #[error("题目 {question_id} 仍在处理中")]
    Busy { question_id: String },
    /// 当前没有活动题目（或题目已被清空/替换）
    #[error("没有活动题目")]
    NoActiveQuestion,
    /// 尚未记录答案
    #[error("尚未记录答案")]
    NoAnswerRecorded,
}

/// 浏览器驱动错误
#[derive(Debug, Error)]
pub enum DriverError {
    /// 等待超时后仍未找到元素
    #[error("未找到元素: {0}")]
    ElementNotFound(Locator),
    /// 启动或连接浏览器失败
    #[error("启动浏览器失败: {0}")]
    Launch(String),
    /// 浏览器协议调用失败
    #[error("浏览器调用失败: {0}")]
    Browser(String),
    /// 页面脚本返回了无法解析的结果
    #[error("执行脚本失败: {0}")]
    Script(String),
}

impl From<chromiumoxide::error::CdpError> for DriverError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        DriverError::Browser(err.to_string())
    }
}

impl From<serde_json::Error> for DriverError {
    fn from(err: serde_json::Error) -> Self {
        DriverError::Script(err.to_string())
    }
}

/// 测试例程错误
#[derive(Debug, Error)]
pub enum RoutineError {
    /// 驱动层错误
    #[error(transparent)]
    Driver(#[from] DriverError),
    /// 前置条件不满足（例如找不到活动的接收端）
    #[error("未找到: {0}")]
    NotFound(String),
    /// 离线发送端数量不是恰好一个
    #[error("期望恰好 1 个离线发送端，实际 {0} 个")]
    UnexpectedOfflineCount(usize),
    /// metadata 缺少字段
    #[error("metadata 缺少字段: {0}")]
    MissingMetadata(&'static str),
    /// 多段题目的前置数据不存在
    #[error("缺少多段题目数据: {0}")]
    MissingScratch(String),
    /// 轮询或整体截止时间到期
    #[error("等待超时: {0}")]
    Timeout(String),
    /// 例程任务 panic 或被取消
    #[error("例程异常终止: {0}")]
    Aborted(String),
}

impl RoutineError {
    /// 是否为可在例程内部恢复的元素缺失
    pub fn is_element_not_found(&self) -> bool {
        matches!(self, RoutineError::Driver(DriverError::ElementNotFound(_)))
    }
}

/// 回调投递错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CallbackError {
    #[error("回调请求超时")]
    Timeout,
    #[error("重定向次数过多")]
    TooManyRedirects,
    /// 安全链接被重定向到非安全链接
    #[error("安全链接被重定向到非安全地址: {0}")]
    InsecureRedirect(String),
    #[error("连接失败: {0}")]
    Connection(String),
    #[error("请求失败: {0}")]
    Request(String),
}

/// 配置错误（启动阶段致命）
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("无效的测试套件: {0} (可选: IS-04-04, IS-05-03)")]
    UnknownSuite(String),
    #[error("不支持的浏览器: {0} (可选: chrome, chromium, edge)")]
    UnknownBrowser(String),
    #[error("配置项 {key} 的值 '{value}' 无效")]
    InvalidValue { key: &'static str, value: String },
    #[error("读取配置文件 {path} 失败: {reason}")]
    File { path: String, reason: String },
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
