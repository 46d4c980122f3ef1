//! 浏览器能力抽象
//!
//! 例程只依赖这里的 trait，具体实现可以是 chromiumoxide，也可以是测试里的脚本化假浏览器

use std::fmt;

use async_trait::async_trait;

use crate::error::DriverError;

/// 元素定位方式
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// `name` 属性
    Name(String),
    /// 链接的可见文本（精确匹配）
    LinkText(String),
    /// CSS 选择器
    Css(String),
    /// XPath 表达式
    XPath(String),
}

impl Locator {
    pub fn name(s: impl Into<String>) -> Self {
        Locator::Name(s.into())
    }

    pub fn link_text(s: impl Into<String>) -> Self {
        Locator::LinkText(s.into())
    }

    pub fn css(s: impl Into<String>) -> Self {
        Locator::Css(s.into())
    }

    pub fn xpath(s: impl Into<String>) -> Self {
        Locator::XPath(s.into())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Name(n) => write!(f, "name={}", n),
            Locator::LinkText(t) => write!(f, "link={}", t),
            Locator::Css(s) => write!(f, "css={}", s),
            Locator::XPath(x) => write!(f, "xpath={}", x),
        }
    }
}

/// 一个浏览器会话（一个页面）
///
/// 所有查询都是即时的，不做隐式等待；等待由驱动层负责
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// 打开地址
    async fn goto(&self, url: &str) -> Result<(), DriverError>;

    /// 匹配元素数量
    async fn count(&self, locator: &Locator) -> Result<usize, DriverError>;

    /// 每个匹配元素的可见文本
    async fn texts(&self, locator: &Locator) -> Result<Vec<String>, DriverError>;

    /// 每个匹配元素的属性值
    async fn attributes(&self, locator: &Locator, name: &str) -> Result<Vec<Option<String>>, DriverError>;

    /// 点击第 `index` 个匹配元素，不存在时返回 `ElementNotFound`
    async fn click(&self, locator: &Locator, index: usize) -> Result<(), DriverError>;

    /// 清空并填写第一个匹配的输入框
    async fn fill(&self, locator: &Locator, text: &str) -> Result<(), DriverError>;

    /// 关闭会话，重复调用无副作用
    async fn close(&self) -> Result<(), DriverError>;
}

/// 为每道题目创建新的浏览器会话
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, DriverError>;
}
