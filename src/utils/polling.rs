//! 有界轮询
//!
//! 固定间隔 + 最长等待时间，到期后由调用方给出可区分的超时结果

use std::time::Duration;

use tokio::time::{sleep, Instant};

/// 轮询计时器
///
/// ```no_run
/// # use std::time::Duration;
/// # use nmos_testing_facade::utils::polling::Poller;
/// # async fn example() {
/// let mut poller = Poller::new(Duration::from_secs(4), Duration::from_secs(60));
/// while poller.tick().await {
///     // 刷新并检查条件，满足时 return
/// }
/// // 走到这里说明超时
/// # }
/// ```
#[derive(Debug)]
pub struct Poller {
    interval: Duration,
    deadline: Instant,
    attempts: usize,
}

impl Poller {
    pub fn new(interval: Duration, max_elapsed: Duration) -> Self {
        Self {
            interval,
            deadline: Instant::now() + max_elapsed,
            attempts: 0,
        }
    }

    /// 等待一个间隔后返回 true；下一次检查会超过截止时间时立即返回 false
    pub async fn tick(&mut self) -> bool {
        if Instant::now() + self.interval > self.deadline {
            return false;
        }
        sleep(self.interval).await;
        self.attempts += 1;
        true
    }

    /// 已完成的等待次数
    pub fn attempts(&self) -> usize {
        self.attempts
    }
}
