//! # Test Case Registry Module / 测试用例注册表模块
//!
//! The registry owns every known test case for the lifetime of a run. It is
//! the single place where rolling statistics are recomputed after an
//! execution completes, so statistics changes become visible to subsequent
//! prioritizer calls in the same process.
//!
//! 注册表在一次运行的生命周期内持有所有已知的测试用例。
//! 它是执行完成后重新计算滚动统计信息的唯一场所，
//! 因此统计变化对同一进程中后续的优先级排序调用可见。

use anyhow::{Result, bail};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::core::models::{Execution, ExecutionStatus, TestCase};

/// Weight given to the newest duration sample in the EMA.
/// 最新时长样本在指数移动平均中的权重。
pub const DURATION_EMA_WEIGHT: f64 = 0.2;
/// Weight given to the newest pass/fail sample in the EMA.
/// 最新通过/失败样本在指数移动平均中的权重。
pub const SUCCESS_EMA_WEIGHT: f64 = 0.1;
/// Flakiness bump when a retried attempt eventually passes.
/// 重试后最终通过时的不稳定性增量。
pub const FLAKINESS_INCREMENT: f64 = 0.1;
/// Flakiness reduction when retries are exhausted without success.
/// 重试耗尽仍未通过时的不稳定性减量。
pub const FLAKINESS_DECREMENT: f64 = 0.05;

/// Longest fingerprint kept from an error message, in characters.
const FINGERPRINT_MAX_LEN: usize = 100;

/// Known error shapes, tried in order; the first capture becomes the
/// fingerprint. The generic `Error:` form only matches up to a newline so
/// multi-line stack traces collapse to their head line.
///
/// 已知的错误形态，按顺序尝试；第一个捕获组即为指纹。
/// 通用的 `Error:` 形式只匹配到换行符，多行堆栈会收敛为首行。
static FINGERPRINT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)TimeoutError: (.+)",
        r"(?i)ElementNotFound: (.+)",
        r"(?i)AssertionError: (.+)",
        r"(?i)NetworkError: (.+)",
        r"(?i)Error: (.+?)\n",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("fingerprint pattern is valid"))
    .collect()
});

/// Extracts a normalized, truncated signature from an error message, used
/// for failure-pattern grouping. Falls back to the first line when no known
/// shape matches.
///
/// 从错误消息中提取规范化、截断后的签名，用于失败模式归组。
/// 没有已知形态匹配时回退到首行。
pub fn extract_fingerprint(error_message: &str) -> String {
    for pattern in FINGERPRINT_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(error_message) {
            if let Some(matched) = captures.get(1) {
                return truncate_fingerprint(matched.as_str());
            }
        }
    }
    truncate_fingerprint(error_message.lines().next().unwrap_or(""))
}

fn truncate_fingerprint(raw: &str) -> String {
    raw.trim().chars().take(FINGERPRINT_MAX_LEN).collect()
}

/// In-memory registry of test cases, keyed by id.
///
/// A single interior lock makes `update_statistics` atomic per call; the
/// executor guarantees no two concurrent attempts of the same test id, so
/// per-id updates never interleave. The lock is held only for the duration
/// of one map operation.
///
/// 以 id 为键的内存测试用例注册表。
/// 单一内部锁使 `update_statistics` 的每次调用具有原子性；
/// 执行器保证同一测试 id 不会有两个并发尝试，因此按 id 的更新不会交错。
/// 锁只在单次 map 操作期间持有。
#[derive(Debug, Default)]
pub struct TestCaseRegistry {
    cases: Mutex<HashMap<String, TestCase>>,
}

impl TestCaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from discovery output.
    pub fn from_cases(cases: impl IntoIterator<Item = TestCase>) -> Self {
        let registry = Self::new();
        for case in cases {
            registry.register(case);
        }
        registry
    }

    // A poisoned lock only means another statistics update panicked mid-way;
    // the map itself is still usable, so recover the guard.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, TestCase>> {
        self.cases
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Inserts or replaces a test case by id.
    /// 按 id 插入或替换测试用例。
    pub fn register(&self, case: TestCase) {
        self.lock().insert(case.id.clone(), case);
    }

    /// Returns a snapshot of the current case, or `None` when the id is
    /// unknown.
    pub fn get(&self, id: &str) -> Option<TestCase> {
        self.lock().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Snapshot of every registered case, in no particular order.
    pub fn snapshot(&self) -> Vec<TestCase> {
        self.lock().values().cloned().collect()
    }

    /// Resolves a list of ids to their cases, keeping the input order and
    /// skipping ids that are not registered.
    /// 将 id 列表解析为用例，保持输入顺序并跳过未注册的 id。
    pub fn select(&self, ids: &[String]) -> Vec<TestCase> {
        let cases = self.lock();
        ids.iter()
            .filter_map(|id| cases.get(id).cloned())
            .collect()
    }

    /// Recomputes a test case's rolling statistics from a completed
    /// execution: duration EMA, success-rate EMA, the flakiness adjustment
    /// and the failure-fingerprint list, then stamps the last-execution
    /// time. Atomic with respect to concurrent updates of other ids.
    ///
    /// 根据已完成的执行重新计算测试用例的滚动统计信息：
    /// 时长 EMA、成功率 EMA、不稳定性调整和失败指纹列表，
    /// 然后记录最近执行时间。相对其它 id 的并发更新是原子的。
    pub fn update_statistics(&self, id: &str, execution: &Execution) -> Result<()> {
        let mut cases = self.lock();
        let Some(case) = cases.get_mut(id) else {
            bail!("test case '{}' is not registered", id);
        };

        let duration_secs = execution.duration.as_secs_f64();
        if duration_secs > 0.0 {
            if case.avg_duration_secs == 0.0 {
                case.avg_duration_secs = duration_secs;
            } else {
                case.avg_duration_secs = case.avg_duration_secs * (1.0 - DURATION_EMA_WEIGHT)
                    + duration_secs * DURATION_EMA_WEIGHT;
            }
        }

        if execution.status == ExecutionStatus::Passed {
            case.success_rate = case.success_rate * (1.0 - SUCCESS_EMA_WEIGHT) + SUCCESS_EMA_WEIGHT;
        } else {
            case.success_rate *= 1.0 - SUCCESS_EMA_WEIGHT;
        }

        if execution.retry_attempt > 0 {
            if execution.status == ExecutionStatus::Passed {
                // Needed a retry to pass: the test is getting flakier.
                case.flakiness = (case.flakiness + FLAKINESS_INCREMENT).min(1.0);
            } else {
                // Retries did not help, so the failures look deterministic.
                case.flakiness = (case.flakiness - FLAKINESS_DECREMENT).max(0.0);
            }
        }

        if execution.status == ExecutionStatus::Failed {
            if let Some(message) = &execution.error_message {
                let fingerprint = extract_fingerprint(message);
                if !fingerprint.is_empty() {
                    case.push_fingerprint(fingerprint);
                }
            }
        }

        case.last_execution = Some(Utc::now());
        Ok(())
    }
}
