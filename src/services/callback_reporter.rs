//! 回调投递 - 业务能力层
//!
//! 只负责"把答案 POST 给测试套件"能力，失败只记录不重试

use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use reqwest::redirect::{Attempt, Policy};
use reqwest::Url;
use tracing::{debug, info, warn};

use crate::error::CallbackError;
use crate::models::AnswerPayload;

/// 最多跟随的重定向次数
pub const MAX_REDIRECTS: usize = 10;

/// 重定向策略拒绝时挂在 reqwest 错误链上的标记
#[derive(Debug)]
enum RedirectViolation {
    TooMany,
    Insecure(String),
}

impl fmt::Display for RedirectViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedirectViolation::TooMany => write!(f, "too many redirects"),
            RedirectViolation::Insecure(url) => write!(f, "insecure redirect to {}", url),
        }
    }
}

impl StdError for RedirectViolation {}

/// 安全链接之后出现了 http 链接
pub fn is_downgrade(previous: &[Url], next: &Url) -> bool {
    next.scheme() == "http" && previous.iter().any(|u| u.scheme() == "https")
}

/// 是否允许跟随到 `next`
fn check_redirect(previous: &[Url], next: &Url) -> Result<(), RedirectViolation> {
    if previous.len() > MAX_REDIRECTS {
        return Err(RedirectViolation::TooMany);
    }
    if is_downgrade(previous, next) {
        return Err(RedirectViolation::Insecure(next.to_string()));
    }
    Ok(())
}

fn redirect_policy() -> Policy {
    Policy::custom(|attempt: Attempt<'_>| match check_redirect(attempt.previous(), attempt.url()) {
        Ok(()) => attempt.follow(),
        Err(violation) => attempt.error(violation),
    })
}

/// 把 reqwest 错误归类
fn classify(err: &reqwest::Error) -> CallbackError {
    let mut source = err.source();
    while let Some(e) = source {
        if let Some(violation) = e.downcast_ref::<RedirectViolation>() {
            return match violation {
                RedirectViolation::TooMany => CallbackError::TooManyRedirects,
                RedirectViolation::Insecure(url) => CallbackError::InsecureRedirect(url.clone()),
            };
        }
        source = e.source();
    }

    if err.is_timeout() {
        CallbackError::Timeout
    } else if err.is_redirect() {
        CallbackError::TooManyRedirects
    } else if err.is_connect() {
        CallbackError::Connection(err.to_string())
    } else {
        CallbackError::Request(err.to_string())
    }
}

/// 回调投递服务
pub struct CallbackReporter {
    client: reqwest::Client,
}

impl CallbackReporter {
    /// 创建新的回调投递服务
    pub fn new(timeout: Duration) -> Result<Self, CallbackError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(redirect_policy())
            .build()
            .map_err(|e| CallbackError::Request(e.to_string()))?;
        Ok(Self { client })
    }

    /// 发送答案，返回对方的 HTTP 状态码
    pub async fn post(&self, url: &str, payload: &AnswerPayload) -> Result<u16, CallbackError> {
        debug!("POST {} <- {}", url, serde_json::to_string(payload).unwrap_or_default());

        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| classify(&e))?;

        let status = response.status();
        if status.is_success() {
            info!("✓ 答案已发送 [{}] -> {} ({})", payload.question_id, url, status);
        } else {
            warn!("⚠️ 测试套件返回非成功状态 [{}]: {}", payload.question_id, status);
        }
        Ok(status.as_u16())
    }
}
