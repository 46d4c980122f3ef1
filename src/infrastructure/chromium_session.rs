//! chromiumoxide 实现的浏览器会话
//!
//! 元素查询全部通过页面内 JS 完成，定位方式翻译成 `document` 上的查询表达式

use async_trait::async_trait;
use chromiumoxide::Browser;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::browser::{BrowserSession, Locator};
use crate::error::DriverError;
use crate::infrastructure::JsExecutor;

/// 会话来源
enum Ownership {
    /// 自己启动的浏览器，关闭时整个退出
    Launched(Browser),
    /// 连接到已运行的浏览器，关闭时只关页面
    Attached(Browser),
}

pub struct ChromiumSession {
    executor: JsExecutor,
    ownership: Mutex<Option<Ownership>>,
    handler: JoinHandle<()>,
}

impl ChromiumSession {
    pub fn launched(browser: Browser, executor: JsExecutor, handler: JoinHandle<()>) -> Self {
        Self {
            executor,
            ownership: Mutex::new(Some(Ownership::Launched(browser))),
            handler,
        }
    }

    pub fn attached(browser: Browser, executor: JsExecutor, handler: JoinHandle<()>) -> Self {
        Self {
            executor,
            ownership: Mutex::new(Some(Ownership::Attached(browser))),
            handler,
        }
    }
}

/// 生成返回元素数组的 JS 表达式
fn collect_expr(locator: &Locator) -> Result<String, DriverError> {
    Ok(match locator {
        Locator::Name(name) => format!(
            "Array.from(document.getElementsByName({}))",
            serde_json::to_string(name)?
        ),
        Locator::Css(selector) => format!(
            "Array.from(document.querySelectorAll({}))",
            serde_json::to_string(selector)?
        ),
        Locator::LinkText(text) => format!(
            "Array.from(document.querySelectorAll('a')).filter(a => a.innerText.trim() === {})",
            serde_json::to_string(text)?
        ),
        Locator::XPath(xpath) => format!(
            r#"(() => {{
                const snap = document.evaluate({}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
                const out = [];
                for (let i = 0; i < snap.snapshotLength; i++) out.push(snap.snapshotItem(i));
                return out;
            }})()"#,
            serde_json::to_string(xpath)?
        ),
    })
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        self.executor.goto(url).await
    }

    async fn count(&self, locator: &Locator) -> Result<usize, DriverError> {
        let js = format!("{}.length", collect_expr(locator)?);
        self.executor.eval_as(js).await
    }

    async fn texts(&self, locator: &Locator) -> Result<Vec<String>, DriverError> {
        let js = format!(
            "{}.map(e => (e.innerText || e.textContent || '').trim())",
            collect_expr(locator)?
        );
        self.executor.eval_as(js).await
    }

    async fn attributes(&self, locator: &Locator, name: &str) -> Result<Vec<Option<String>>, DriverError> {
        // value / checked 以 DOM 属性为准，React 受控组件不会回写 attribute
        let js = format!(
            r#"{}.map(e => {{
                const n = {};
                if (n === 'value' && 'value' in e) return String(e.value);
                if (n === 'checked' && 'checked' in e) return String(e.checked);
                return e.getAttribute(n);
            }})"#,
            collect_expr(locator)?,
            serde_json::to_string(name)?
        );
        self.executor.eval_as(js).await
    }

    async fn click(&self, locator: &Locator, index: usize) -> Result<(), DriverError> {
        let js = format!(
            r#"(() => {{
                const el = {}[{}];
                if (!el) return false;
                el.scrollIntoView({{block: 'center'}});
                el.click();
                return true;
            }})()"#,
            collect_expr(locator)?,
            index
        );
        debug!("点击 {} [{}]", locator, index);
        if self.executor.eval_as::<bool>(js).await? {
            Ok(())
        } else {
            Err(DriverError::ElementNotFound(locator.clone()))
        }
    }

    async fn fill(&self, locator: &Locator, text: &str) -> Result<(), DriverError> {
        // 通过原生 setter 写值并派发 input 事件，React 才能感知
        let js = format!(
            r#"(() => {{
                const el = {}[0];
                if (!el) return false;
                const proto = el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
                const setter = Object.getOwnPropertyDescriptor(proto, 'value').set;
                el.focus();
                setter.call(el, {});
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                el.blur();
                return true;
            }})()"#,
            collect_expr(locator)?,
            serde_json::to_string(text)?
        );
        if self.executor.eval_as::<bool>(js).await? {
            Ok(())
        } else {
            Err(DriverError::ElementNotFound(locator.clone()))
        }
    }

    async fn close(&self) -> Result<(), DriverError> {
        let Some(ownership) = self.ownership.lock().await.take() else {
            return Ok(());
        };

        let result = match ownership {
            Ownership::Launched(mut browser) => {
                debug!("关闭浏览器");
                let closed = browser.close().await.map(|_| ());
                if let Err(e) = browser.wait().await {
                    warn!("等待浏览器进程退出失败: {}", e);
                }
                closed
            }
            Ownership::Attached(_browser) => {
                debug!("关闭页面（保留外部浏览器）");
                self.executor.page().clone().close().await
            }
        };
        self.handler.abort();
        result.map_err(DriverError::from)
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}
