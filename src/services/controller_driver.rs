//! 控制器驱动 - 业务能力层
//!
//! 在浏览器会话之上提供"操作 nmos-js 界面"的能力：
//! - 会话准备（把控制器指向 mock registry）与收尾
//! - 按链接文本导航、刷新、翻页
//! - 读取带标签的资源行
//!
//! 界面约定（name 属性、按钮选择器）作为数据放在 `UiConventions` 里，不写死在代码中

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::browser::{BrowserSession, Locator};
use crate::config::Config;
use crate::error::DriverError;
use crate::utils::Poller;

/// 隐式等待的检查间隔
const ELEMENT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// 资源列表页
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourcePage {
    Senders,
    Receivers,
}

/// 被测控制器的界面约定
#[derive(Debug, Clone)]
pub struct UiConventions {
    /// Settings 页 Query API 输入框的 name
    pub query_api_field: String,
    /// Settings 页 RQL 开关的 name
    pub rql_switch: String,
    /// 展开侧边菜单的按钮
    pub open_menu: Locator,
    /// 列表页刷新按钮
    pub refresh_button: Locator,
    /// 资源标签
    pub label: String,
    /// 下一页按钮
    pub next_page: String,
    /// 接收端详情页的 Connect 标签
    pub connect_tab: String,
    /// Connect 页每行的激活按钮
    pub activate_button: String,
    /// 接收端 active 开关（列表页每行一个；详情页为 Active 标签）
    pub active_switch: String,
    /// Active 标签里显示的已连接发送端
    pub connected_sender: String,
    pub senders_link: String,
    pub receivers_link: String,
}

impl Default for UiConventions {
    /// nmos-js 的界面约定
    fn default() -> Self {
        Self {
            query_api_field: "queryapi".to_string(),
            rql_switch: "userql".to_string(),
            open_menu: Locator::xpath(r#"//*[@title="Open menu"]"#),
            refresh_button: Locator::css("[aria-label='Refresh']"),
            label: "label".to_string(),
            next_page: "next".to_string(),
            connect_tab: "connect".to_string(),
            activate_button: "activate".to_string(),
            active_switch: "active".to_string(),
            connected_sender: "sender".to_string(),
            senders_link: "Senders".to_string(),
            receivers_link: "Receivers".to_string(),
        }
    }
}

impl UiConventions {
    pub fn page_link(&self, page: ResourcePage) -> &str {
        match page {
            ResourcePage::Senders => &self.senders_link,
            ResourcePage::Receivers => &self.receivers_link,
        }
    }
}

/// 驱动层的等待时间
#[derive(Debug, Clone, Copy)]
pub struct DriverTiming {
    /// 等待元素出现的最长时间
    pub wait_time: Duration,
    /// 刷新、翻页后的等待
    pub settle_delay: Duration,
    /// 建立/断开连接后的等待
    pub action_delay: Duration,
}

impl DriverTiming {
    pub fn from_config(config: &Config) -> Self {
        Self {
            wait_time: config.wait_time(),
            settle_delay: config.settle_delay(),
            action_delay: config.settle_delay() * 2,
        }
    }
}

/// 会话准备所需的地址
#[derive(Debug, Clone)]
pub struct DriverSettings {
    pub settings_url: String,
    pub query_api_url: String,
    pub timing: DriverTiming,
    pub ui: UiConventions,
}

impl DriverSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            settings_url: config.settings_url(),
            query_api_url: config.query_api_url(),
            timing: DriverTiming::from_config(config),
            ui: UiConventions::default(),
        }
    }
}

/// 控制器驱动
///
/// 独占一个浏览器会话，生命周期与单道题目相同
pub struct ControllerDriver {
    session: Box<dyn BrowserSession>,
    settings: DriverSettings,
}

impl ControllerDriver {
    pub fn new(session: Box<dyn BrowserSession>, settings: DriverSettings) -> Self {
        Self { session, settings }
    }

    pub fn ui(&self) -> &UiConventions {
        &self.settings.ui
    }

    pub fn timing(&self) -> DriverTiming {
        self.settings.timing
    }

    /// 打开 Settings，把 Query API 指向 mock registry，关闭 RQL，展开菜单
    pub async fn set_up(&self) -> Result<(), DriverError> {
        let ui = &self.settings.ui;
        self.session.goto(&self.settings.settings_url).await?;

        let query_api = Locator::name(ui.query_api_field.as_str());
        self.require(&query_api).await?;
        self.session.fill(&query_api, &self.settings.query_api_url).await?;
        debug!("Query API 已设置为 {}", self.settings.query_api_url);

        let use_rql = Locator::name(ui.rql_switch.as_str());
        self.require(&use_rql).await?;
        if self.first_attribute(&use_rql, "checked").await?.as_deref() == Some("true") {
            self.session.click(&use_rql, 0).await?;
            debug!("已关闭 RQL");
        }

        // 菜单可能已经展开
        if self.session.count(&ui.open_menu).await? > 0 {
            self.session.click(&ui.open_menu, 0).await?;
        }

        info!("✓ 控制器已指向 mock registry");
        Ok(())
    }

    /// 关闭会话
    pub async fn tear_down(&self) -> Result<(), DriverError> {
        self.session.close().await
    }

    /// 等待元素出现，返回数量；超时返回 0
    pub async fn wait_for(&self, locator: &Locator) -> Result<usize, DriverError> {
        let mut poller = Poller::new(ELEMENT_POLL_INTERVAL, self.settings.timing.wait_time);
        loop {
            let count = self.session.count(locator).await?;
            if count > 0 {
                return Ok(count);
            }
            if !poller.tick().await {
                debug!("等待 {} 超时", locator);
                return Ok(0);
            }
        }
    }

    /// 等待元素出现，超时返回 `ElementNotFound`
    pub async fn require(&self, locator: &Locator) -> Result<usize, DriverError> {
        match self.wait_for(locator).await? {
            0 => Err(DriverError::ElementNotFound(locator.clone())),
            n => Ok(n),
        }
    }

    /// 等待并点击第 `index` 个元素
    pub async fn click(&self, locator: &Locator, index: usize) -> Result<(), DriverError> {
        self.require(locator).await?;
        self.session.click(locator, index).await
    }

    /// 读取所有匹配元素的文本（等待至少一个出现，没有则为空）
    pub async fn texts(&self, locator: &Locator) -> Result<Vec<String>, DriverError> {
        if self.wait_for(locator).await? == 0 {
            return Ok(Vec::new());
        }
        self.session.texts(locator).await
    }

    /// 读取所有匹配元素的属性（不等待）
    pub async fn attributes(&self, locator: &Locator, name: &str) -> Result<Vec<Option<String>>, DriverError> {
        self.session.attributes(locator, name).await
    }

    /// 第一个匹配元素的属性
    pub async fn first_attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>, DriverError> {
        Ok(self.session.attributes(locator, name).await?.into_iter().next().flatten())
    }

    /// 点击刷新按钮并等待加载
    pub async fn refresh_page(&self) -> Result<(), DriverError> {
        self.click(&self.settings.ui.refresh_button, 0).await?;
        self.settle().await;
        Ok(())
    }

    /// 按链接文本导航，然后刷新
    pub async fn navigate_to(&self, link_text: &str) -> Result<(), DriverError> {
        debug!("导航到页面: {}", link_text);
        self.click(&Locator::link_text(link_text), 0).await?;
        self.refresh_page().await
    }

    /// 导航到资源列表页
    pub async fn navigate_to_page(&self, page: ResourcePage) -> Result<(), DriverError> {
        let link = self.settings.ui.page_link(page).to_string();
        self.navigate_to(&link).await
    }

    /// 当前页所有资源标签
    pub async fn find_resource_labels(&self) -> Result<Vec<String>, DriverError> {
        self.texts(&self.label_locator()).await
    }

    /// 点击下一页；没有下一页按钮时返回 false
    pub async fn next_page(&self) -> Result<bool, DriverError> {
        let next = Locator::name(self.settings.ui.next_page.as_str());
        match self.click(&next, 0).await {
            Ok(()) => {
                self.settle().await;
                Ok(true)
            }
            Err(DriverError::ElementNotFound(_)) => {
                warn!("未找到下一页按钮，停止翻页");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    pub fn label_locator(&self) -> Locator {
        Locator::name(self.settings.ui.label.as_str())
    }

    /// 刷新/翻页后的等待
    pub async fn settle(&self) {
        sleep(self.settings.timing.settle_delay).await;
    }

    /// 建立/断开连接后的等待
    pub async fn settle_action(&self) {
        sleep(self.settings.timing.action_delay).await;
    }
}
