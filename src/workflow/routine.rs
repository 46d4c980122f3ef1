//! 测试例程 - 流程层
//!
//! 核心职责：定义"回答一道题"需要在控制器界面上做什么
//!
//! 例程分为四类：
//! 1. 固定答复（不需要浏览器）
//! 2. 浏览页面后回答 "Next"
//! 3. 逐页读取资源标签并与候选答案比对
//! 4. 定时刷新直到条件满足
//!
//! 例程只依赖 `ControllerDriver` 提供的能力，不持有浏览器资源

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::browser::Locator;
use crate::error::RoutineError;
use crate::models::{AnswerId, AnswerResponse};
use crate::services::{ControllerDriver, ResourcePage};
use crate::utils::Poller;
use crate::workflow::question_ctx::QuestionCtx;
use crate::workflow::scratch::{ScratchValue, Scratchpad};

/// 浏览/连接类题目的答复
pub const NEXT: &str = "Next";
/// 重新上线的发送端与离线的不是同一个
pub const UNRECOGNISED_SENDER: &str = "Unrecognised Sender";

/// 一道题对应的例程
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routine {
    /// 直接返回固定文本
    Informational(&'static str),
    /// 依次浏览这些页面
    Browse(&'static [ResourcePage]),
    /// 逐页读取标签，返回匹配的候选答案
    MatchListed(ResourcePage),
    /// 记下当前列表，供后续题目使用
    CaptureListed {
        page: ResourcePage,
        slot: &'static str,
    },
    /// 与 `baseline` 相比恰好消失了一个的资源
    SelectVanished {
        page: ResourcePage,
        baseline: &'static str,
        slot: &'static str,
    },
    /// 等待列表恢复到 `baseline` 的数量，并检查最后出现的是否为 `returned`
    AwaitReturn {
        page: ResourcePage,
        baseline: &'static str,
        returned: &'static str,
    },
    /// 可以通过 IS-05 连接的接收端
    ConnectableReceivers,
    /// 把 metadata.sender 连接到 metadata.receiver
    Connect,
    /// 断开 metadata.receiver 的连接
    Disconnect,
    /// 当前处于激活状态的接收端
    ActiveReceiver,
    /// metadata.receiver 当前连接的发送端
    ConnectedSender,
    /// 等待所有接收端都断开
    AwaitDisconnect,
}

impl Routine {
    /// 不需要浏览器就能给出的答复
    pub fn fixed_answer(&self) -> Option<&'static str> {
        match *self {
            Routine::Informational(text) => Some(text),
            _ => None,
        }
    }

    pub async fn run(
        &self,
        driver: &ControllerDriver,
        ctx: &QuestionCtx,
        scratch: &Scratchpad,
    ) -> Result<AnswerResponse, RoutineError> {
        match *self {
            Routine::Informational(text) => Ok(AnswerResponse::Text(text.to_string())),

            Routine::Browse(pages) => {
                for page in pages {
                    driver.navigate_to_page(*page).await?;
                }
                info!("{} ✓ 已浏览 {} 个页面", ctx, pages.len());
                Ok(next())
            }

            Routine::MatchListed(page) => {
                let ids = match_listed(driver, ctx, page).await?;
                Ok(AnswerResponse::Choices(ids))
            }

            Routine::CaptureListed { page, slot } => {
                driver.navigate_to_page(page).await?;
                let labels = driver.find_resource_labels().await?;
                info!("{} 📝 记录 {} 个资源: {:?}", ctx, labels.len(), labels);
                scratch.put(slot, ScratchValue::Labels(labels));
                Ok(next())
            }

            Routine::SelectVanished { page, baseline, slot } => {
                let before = scratch.labels(baseline)?;
                driver.navigate_to_page(page).await?;
                let now = driver.find_resource_labels().await?;

                let vanished = vanished_labels(&before, &now);
                if vanished.len() != 1 {
                    warn!("{} ⚠️ 离线资源数量异常: {:?}", ctx, vanished);
                    return Err(RoutineError::UnexpectedOfflineCount(vanished.len()));
                }
                let offline = vanished[0].clone();
                info!("{} 🔌 离线资源: {}", ctx, offline);
                scratch.put(slot, ScratchValue::Label(offline.clone()));

                ctx.answer_id_for(&offline)
                    .map(AnswerResponse::Choice)
                    .ok_or_else(|| RoutineError::NotFound(format!("候选答案中没有 {}", offline)))
            }

            Routine::AwaitReturn { page, baseline, returned } => {
                let expected = scratch.labels(baseline)?.into_iter().collect::<HashSet<_>>().len();
                let returned = scratch.label(returned)?;
                driver.navigate_to_page(page).await?;

                let last = await_full_list(driver, ctx, expected).await?;
                if last.as_deref() == Some(returned.as_str()) {
                    info!("{} ✓ {} 已重新上线", ctx, returned);
                    Ok(next())
                } else {
                    warn!("{} ⚠️ 重新上线的是 {:?}，期望 {}", ctx, last, returned);
                    Ok(AnswerResponse::Text(UNRECOGNISED_SENDER.to_string()))
                }
            }

            Routine::ConnectableReceivers => {
                driver.navigate_to_page(ResourcePage::Receivers).await?;
                let receivers = driver.find_resource_labels().await?;

                let mut connectable = Vec::new();
                for receiver in &receivers {
                    driver.navigate_to(receiver).await?;
                    if check_connectable(driver).await? {
                        connectable.push(receiver.clone());
                    }
                    driver.navigate_to_page(ResourcePage::Receivers).await?;
                }
                info!("{} ✓ 可连接的接收端: {:?}", ctx, connectable);
                Ok(AnswerResponse::Choices(ctx.answer_ids_for(&connectable)))
            }

            Routine::Connect => {
                let sender = ctx.metadata_label("sender")?;
                let receiver = ctx.metadata_label("receiver")?;
                driver.navigate_to_page(ResourcePage::Receivers).await?;
                driver.navigate_to(&receiver).await?;
                make_connection(driver, &sender).await?;
                info!("{} 🔗 已连接 {} -> {}", ctx, sender, receiver);
                Ok(next())
            }

            Routine::Disconnect => {
                let receiver = ctx.metadata_label("receiver")?;
                driver.navigate_to_page(ResourcePage::Receivers).await?;
                remove_connection(driver, &receiver).await?;
                info!("{} ✂️ 已断开 {}", ctx, receiver);
                Ok(next())
            }

            Routine::ActiveReceiver => {
                driver.navigate_to_page(ResourcePage::Receivers).await?;
                let receiver = get_active_receiver(driver)
                    .await?
                    .ok_or_else(|| RoutineError::NotFound("激活的接收端".to_string()))?;
                info!("{} ✓ 激活的接收端: {}", ctx, receiver);
                answer_for(ctx, &receiver)
            }

            Routine::ConnectedSender => {
                let receiver = ctx.metadata_label("receiver")?;
                driver.navigate_to_page(ResourcePage::Receivers).await?;
                driver.navigate_to(&receiver).await?;
                let sender = get_connected_sender(driver).await?;
                info!("{} ✓ {} 连接的发送端: {}", ctx, receiver, sender);
                answer_for(ctx, &sender)
            }

            Routine::AwaitDisconnect => {
                driver.navigate_to_page(ResourcePage::Receivers).await?;
                let mut poller = Poller::new(ctx.poll_interval, ctx.poll_budget);
                while poller.tick().await {
                    driver.refresh_page().await?;
                    match get_active_receiver(driver).await? {
                        None => {
                            info!("{} ✓ 所有接收端已断开 (第 {} 次检查)", ctx, poller.attempts());
                            return Ok(next());
                        }
                        Some(receiver) => debug!("{} {} 仍处于激活状态", ctx, receiver),
                    }
                }
                Err(RoutineError::Timeout(format!("{} 等待断开连接", ctx)))
            }
        }
    }
}

fn next() -> AnswerResponse {
    AnswerResponse::Text(NEXT.to_string())
}

fn answer_for(ctx: &QuestionCtx, label: &str) -> Result<AnswerResponse, RoutineError> {
    ctx.answer_id_for(label)
        .map(AnswerResponse::Choice)
        .ok_or_else(|| RoutineError::NotFound(format!("候选答案中没有 {}", label)))
}

/// `before` 中有、`now` 中没有的标签（去重，保持原顺序）
pub fn vanished_labels(before: &[String], now: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    before
        .iter()
        .filter(|label| !now.contains(label) && seen.insert(label.as_str()))
        .cloned()
        .collect()
}

/// 翻页读取全部标签，最多 `answers.len()` 页或遇到空页为止
async fn match_listed(
    driver: &ControllerDriver,
    ctx: &QuestionCtx,
    page: ResourcePage,
) -> Result<Vec<AnswerId>, RoutineError> {
    driver.navigate_to_page(page).await?;

    let mut observed: Vec<String> = Vec::new();
    for index in 0..ctx.answers.len() {
        let labels = driver.find_resource_labels().await?;
        if labels.is_empty() {
            break;
        }
        debug!("{} 第 {} 页: {:?}", ctx, index + 1, labels);
        observed.extend(labels);

        if !driver.next_page().await? {
            break;
        }
    }

    let ids = ctx.answer_ids_for(&observed);
    info!("{} ✓ 共看到 {} 个资源，匹配 {} 个候选答案", ctx, observed.len(), ids.len());
    Ok(ids)
}

/// 定时刷新，直到看到过的不同标签数达到 `expected`；返回最后一次列表的最后一项
async fn await_full_list(
    driver: &ControllerDriver,
    ctx: &QuestionCtx,
    expected: usize,
) -> Result<Option<String>, RoutineError> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut last: Option<String> = None;
    let mut poller = Poller::new(ctx.poll_interval, ctx.poll_budget);

    while poller.tick().await {
        driver.refresh_page().await?;
        let labels = driver.find_resource_labels().await?;
        if let Some(label) = labels.last() {
            last = Some(label.clone());
        }
        seen.extend(labels);
        debug!("{} 已看到 {}/{} 个资源", ctx, seen.len(), expected);

        if seen.len() >= expected {
            return Ok(last);
        }
    }
    Err(RoutineError::Timeout(format!("{} 等待资源重新上线", ctx)))
}

/// 接收端详情页的 Connect 标签是否可用
async fn check_connectable(driver: &ControllerDriver) -> Result<bool, RoutineError> {
    let connect = Locator::name(driver.ui().connect_tab.as_str());
    driver.require(&connect).await?;
    let disabled = driver.first_attribute(&connect, "aria-disabled").await?;
    Ok(disabled.as_deref() == Some("false"))
}

/// 打开 Connect 标签，激活 `sender` 所在行
async fn make_connection(driver: &ControllerDriver, sender: &str) -> Result<(), RoutineError> {
    let ui = driver.ui();
    driver.click(&Locator::name(ui.connect_tab.as_str()), 0).await?;

    let senders = driver.find_resource_labels().await?;
    let row = senders
        .iter()
        .position(|s| s == sender)
        .ok_or_else(|| RoutineError::NotFound(format!("发送端 {}", sender)))?;

    driver.click(&Locator::name(ui.activate_button.as_str()), row).await?;
    driver.settle_action().await;
    Ok(())
}

/// 关闭 `receiver` 所在行的 active 开关（已关闭时不动）
async fn remove_connection(driver: &ControllerDriver, receiver: &str) -> Result<(), RoutineError> {
    let receivers = driver.find_resource_labels().await?;
    let row = receivers
        .iter()
        .position(|r| r == receiver)
        .ok_or_else(|| RoutineError::NotFound(format!("接收端 {}", receiver)))?;

    let active = Locator::name(driver.ui().active_switch.as_str());
    let values = driver.attributes(&active, "value").await?;
    match values.get(row) {
        Some(Some(value)) if value == "true" => driver.click(&active, row).await?,
        Some(_) => debug!("{} 未激活，无需断开", receiver),
        None => return Err(RoutineError::NotFound(format!("{} 的 active 开关", receiver))),
    }
    driver.settle_action().await;
    Ok(())
}

/// 列表页第一个 active 开关为 true 的接收端
async fn get_active_receiver(driver: &ControllerDriver) -> Result<Option<String>, RoutineError> {
    let active = Locator::name(driver.ui().active_switch.as_str());
    let values = driver.attributes(&active, "value").await?;
    let Some(row) = values.iter().position(|v| v.as_deref() == Some("true")) else {
        return Ok(None);
    };
    let labels = driver.find_resource_labels().await?;
    Ok(labels.get(row).cloned())
}

/// 打开接收端的 Active 标签，读取已连接的发送端
async fn get_connected_sender(driver: &ControllerDriver) -> Result<String, RoutineError> {
    let ui = driver.ui();
    driver.click(&Locator::name(ui.active_switch.as_str()), 0).await?;
    driver
        .texts(&Locator::name(ui.connected_sender.as_str()))
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| RoutineError::NotFound("已连接的发送端".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_vanished_labels() {
        let before = labels(&["A", "B", "C", "B"]);
        assert_eq!(vanished_labels(&before, &labels(&["A", "C"])), labels(&["B"]));
        assert!(vanished_labels(&before, &before).is_empty());
        assert_eq!(vanished_labels(&before, &[]), labels(&["A", "B", "C"]));
    }

    #[test]
    fn test_fixed_answer() {
        assert_eq!(Routine::Informational("x").fixed_answer(), Some("x"));
        assert_eq!(Routine::Connect.fixed_answer(), None);
    }
}
