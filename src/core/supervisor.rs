//! # Timeout Supervisor Module / 超时监督器模块
//!
//! Runs alongside the executor and polls the shared in-flight table on a
//! fixed interval. Executions past the suite deadline are force-failed with
//! a timeout-specific message; since the interrupt slot is written once and
//! the executor owns the terminal-state write, a completed execution can
//! never be reverted by a late sweep.
//!
//! 与执行器并行运行，按固定间隔轮询共享的在途表。
//! 超过套件期限的执行会以超时专属的消息被强制判定失败；
//! 由于中断槽只写一次且终态由执行器写入，
//! 迟到的轮询永远不会回退已完成的执行。

use colored::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::core::execution::{InFlightTable, Interrupt};
use crate::infra::t;

/// Default sweep interval when the configuration does not override it.
/// 配置未覆盖时的默认轮询间隔。
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Watches in-flight executions and force-fails the ones that exceed the
/// suite's deadline.
/// 监视在途执行，并强制判定超过套件期限的执行为失败。
pub struct TimeoutSupervisor {
    in_flight: Arc<InFlightTable>,
    timeout: Duration,
    poll_interval: Duration,
}

impl TimeoutSupervisor {
    /// Creates a supervisor for the given table and deadline. The poll
    /// interval is clamped below the deadline so a timeout shorter than the
    /// configured interval still fires within one period of it.
    ///
    /// 为给定的在途表和期限创建监督器。轮询间隔被收敛到期限以内，
    /// 使得比配置间隔更短的超时也能在一个周期内触发。
    pub fn new(in_flight: Arc<InFlightTable>, timeout: Duration, poll_interval: Duration) -> Self {
        let poll_interval = poll_interval.min(timeout).max(Duration::from_millis(10));
        Self {
            in_flight,
            timeout,
            poll_interval,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// One pass over the in-flight table. Overdue executions get a timeout
    /// interrupt and leave the table; their slot frees up as soon as the
    /// owning task observes the interrupt. Returns how many were hit.
    ///
    /// 对在途表的一次扫描。逾期的执行收到超时中断并离开在途表；
    /// 持有任务观察到中断后其槽位即被释放。返回命中的数量。
    pub fn sweep(&self) -> usize {
        let mut timed_out = 0;
        for (execution_id, entry) in self.in_flight.snapshot() {
            let elapsed = entry.elapsed();
            if elapsed > self.timeout {
                self.in_flight.remove(&execution_id);
                entry.interrupt(Interrupt::TimedOut(format!(
                    "TimeoutError: execution exceeded the suite timeout of {} seconds (ran {:.1}s)",
                    self.timeout.as_secs(),
                    elapsed.as_secs_f64()
                )));
                println!(
                    "{}",
                    t!(
                        "supervisor_timed_out",
                        name = entry.test_name,
                        timeout = self.timeout.as_secs()
                    )
                    .red()
                );
                timed_out += 1;
            }
        }
        timed_out
    }

    /// Runs the sweep loop until the shutdown token fires. The first sweep
    /// happens one full interval after spawning.
    /// 运行轮询循环直到关闭令牌触发。首次扫描发生在启动后一个完整间隔。
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // An interval's first tick resolves immediately; skip it so the
            // loop sleeps before its first sweep.
            ticker.tick().await;
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        self.sweep();
                    }
                }
            }
        })
    }
}
