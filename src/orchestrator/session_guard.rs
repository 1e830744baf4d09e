//! 会话守卫 - 编排层
//!
//! 两个独立的计时器：
//! - 无操作计时：任何用户操作都会重置，超时后先尽力保存草稿再强制登出
//! - 自动保存：固定间隔保存草稿
//!
//! 计时器是 `SessionGuard` 持有的 tokio 任务，`stop()` 或 drop 时一并取消，
//! 不会在页面切换后残留。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::Config;

/// 计时器触发时的回调
#[async_trait]
pub trait SessionHooks: Send + Sync + 'static {
    /// 定时自动保存
    async fn autosave(&self);
    /// 长时间无操作：保存后登出
    async fn expire(&self);
}

/// 两个计时器的时长
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimings {
    pub inactivity: Duration,
    pub autosave: Duration,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            inactivity: Duration::from_secs(5 * 60),
            autosave: Duration::from_secs(2 * 60),
        }
    }
}

impl From<&Config> for SessionTimings {
    fn from(config: &Config) -> Self {
        Self {
            inactivity: config.inactivity_timeout(),
            autosave: config.autosave_interval(),
        }
    }
}

/// 会话守卫，持有两个计时任务
pub struct SessionGuard {
    cancel: CancellationToken,
    activity: Arc<Notify>,
    tasks: Vec<JoinHandle<()>>,
}

impl SessionGuard {
    /// 启动两个计时器；必须在 tokio 运行时内调用
    pub fn start<H: SessionHooks>(hooks: Arc<H>, timings: SessionTimings) -> Self {
        let cancel = CancellationToken::new();
        let activity = Arc::new(Notify::new());

        // interval 不接受 0
        let inactivity = timings.inactivity.max(Duration::from_secs(1));
        let autosave = timings.autosave.max(Duration::from_secs(1));

        let tasks = vec![
            tokio::spawn(watch_inactivity(
                hooks.clone(),
                inactivity,
                activity.clone(),
                cancel.clone(),
            )),
            tokio::spawn(run_autosave(hooks, autosave, cancel.clone())),
        ];

        debug!(
            "会话计时器已启动: 无操作 {:?}, 自动保存 {:?}",
            inactivity, autosave
        );
        Self {
            cancel,
            activity,
            tasks,
        }
    }

    /// 用户有操作（鼠标、键盘、点击），重置无操作计时
    pub fn record_activity(&self) {
        self.activity.notify_one();
    }

    /// 停止两个计时器
    pub fn stop(&self) {
        if !self.cancel.is_cancelled() {
            self.cancel.cancel();
            debug!("会话计时器已停止");
        }
    }

    /// 停止并等待计时任务退出
    pub async fn shutdown(mut self) {
        self.stop();
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn watch_inactivity<H: SessionHooks>(
    hooks: Arc<H>,
    idle: Duration,
    activity: Arc<Notify>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = activity.notified() => continue,
            _ = sleep(idle) => {
                info!("⏰ {:?} 内无任何操作，保存草稿并登出", idle);
                hooks.expire().await;
                cancel.cancel();
                return;
            }
        }
    }
}

async fn run_autosave<H: SessionHooks>(hooks: Arc<H>, period: Duration, cancel: CancellationToken) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => hooks.autosave().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingHooks {
        saves: AtomicUsize,
        expiries: AtomicUsize,
    }

    impl CountingHooks {
        fn saves(&self) -> usize {
            self.saves.load(Ordering::SeqCst)
        }

        fn expiries(&self) -> usize {
            self.expiries.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SessionHooks for CountingHooks {
        async fn autosave(&self) {
            self.saves.fetch_add(1, Ordering::SeqCst);
        }

        async fn expire(&self) {
            self.expiries.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[tokio::test(start_paused = true)]
    async fn test_autosave_then_idle_expiry() {
        let hooks = Arc::new(CountingHooks::default());
        let guard = SessionGuard::start(hooks.clone(), SessionTimings::default());

        sleep(secs(250)).await;
        assert_eq!(hooks.saves(), 2);
        assert_eq!(hooks.expiries(), 0);

        sleep(secs(60)).await;
        assert_eq!(hooks.expiries(), 1);
        assert!(guard.cancel.is_cancelled());

        // 登出后自动保存也停止
        sleep(secs(600)).await;
        assert_eq!(hooks.saves(), 2);
        assert_eq!(hooks.expiries(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_resets_idle_timer() {
        let hooks = Arc::new(CountingHooks::default());
        let guard = SessionGuard::start(hooks.clone(), SessionTimings::default());

        for _ in 0..4 {
            sleep(secs(200)).await;
            guard.record_activity();
        }
        sleep(secs(1)).await;

        assert_eq!(hooks.expiries(), 0);
        assert!(!guard.cancel.is_cancelled());
        assert_eq!(hooks.saves(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_timers() {
        let hooks = Arc::new(CountingHooks::default());
        let guard = SessionGuard::start(hooks.clone(), SessionTimings::default());
        drop(guard);

        sleep(secs(1000)).await;
        assert_eq!(hooks.saves(), 0);
        assert_eq!(hooks.expiries(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_waits_for_tasks() {
        let hooks = Arc::new(CountingHooks::default());
        let guard = SessionGuard::start(hooks.clone(), SessionTimings::default());
        sleep(secs(130)).await;
        guard.shutdown().await;

        sleep(secs(1000)).await;
        assert_eq!(hooks.saves(), 1);
        assert_eq!(hooks.expiries(), 0);
    }
}
