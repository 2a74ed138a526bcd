//! # Result Analyzer Module / 结果分析模块
//!
//! Pure aggregation over a completed execution list: status counts, pass
//! rate, duration statistics, flakiness-in-this-run detection, the
//! failure-fingerprint histogram and the parallel-efficiency ratio. The
//! output is an immutable report record; persisting it is someone else's
//! job.
//!
//! 对已完成执行列表的纯聚合：状态计数、通过率、时长统计、
//! 本次运行中的不稳定检测、失败指纹直方图和并行效率比。
//! 输出是不可变的报告记录；持久化它是其他组件的职责。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

use crate::core::models::{Execution, ExecutionStatus};
use crate::core::registry::extract_fingerprint;

/// How many fingerprint buckets the histogram keeps.
/// 直方图保留的指纹桶数量。
pub const TOP_FINGERPRINTS: usize = 5;

/// Status counts and duration totals for the whole run.
/// 整次运行的状态计数与时长汇总。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub pass_rate: f64,
    pub avg_duration_secs: f64,
    pub total_duration_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisPerformance {
    /// `Σ per-test duration / wall-clock duration`; ≈1.0 for a serial run,
    /// approaching the concurrency width for a perfectly parallel one.
    /// `Σ 单测试时长 / 墙钟时长`；串行运行约为 1.0，
    /// 完美并行时趋近并发宽度。
    pub parallel_efficiency: f64,
    pub fastest_test: Option<String>,
    pub slowest_test: Option<String>,
}

/// One bucket of the failure-fingerprint histogram.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintCount {
    pub fingerprint: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisQuality {
    /// Executions that passed only after at least one retry.
    /// 至少经过一次重试才通过的执行。
    pub flaky_passes: usize,
    /// Executions that used at least one retry, whatever the outcome.
    /// 至少使用了一次重试的执行，无论结果如何。
    pub retried: usize,
    pub retry_success_rate: f64,
    pub top_failure_fingerprints: Vec<FingerprintCount>,
}

/// The complete analysis block of a report.
/// 报告的完整分析块。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionAnalysis {
    pub summary: AnalysisSummary,
    pub performance: AnalysisPerformance,
    pub quality: AnalysisQuality,
}

/// The immutable record a run produces. The report sinks (console, JSON,
/// HTML) render it; the engine itself never looks at it again.
///
/// 一次运行产出的不可变记录。报告输出端（控制台、JSON、HTML）
/// 负责渲染它；引擎本身不再读取它。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub suite_name: String,
    pub run_id: Uuid,
    pub environment: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub wall_clock_secs: f64,
    pub analysis: ExecutionAnalysis,
    pub executions: Vec<Execution>,
}

/// Folds a completed execution list into its analysis. Pure; the wall
/// clock comes from the executor's own measurement of the run.
///
/// 将已完成的执行列表折叠为分析结果。纯函数；
/// 墙钟时间来自执行器对本次运行的测量。
pub fn analyze(executions: &[Execution], wall_clock: Duration) -> ExecutionAnalysis {
    let total = executions.len();
    let passed = count_status(executions, ExecutionStatus::Passed);
    let failed = count_status(executions, ExecutionStatus::Failed);
    let cancelled = count_status(executions, ExecutionStatus::Cancelled);

    let total_duration_secs: f64 = executions
        .iter()
        .map(|execution| execution.duration.as_secs_f64())
        .sum();
    let pass_rate = if total > 0 {
        passed as f64 / total as f64
    } else {
        0.0
    };
    let avg_duration_secs = if total > 0 {
        total_duration_secs / total as f64
    } else {
        0.0
    };

    let wall_clock_secs = wall_clock.as_secs_f64();
    let parallel_efficiency = if wall_clock_secs > 0.0 {
        total_duration_secs / wall_clock_secs
    } else {
        0.0
    };

    let fastest_test = executions
        .iter()
        .min_by(|a, b| a.duration.cmp(&b.duration))
        .map(|execution| execution.test_name.clone());
    let slowest_test = executions
        .iter()
        .max_by(|a, b| a.duration.cmp(&b.duration))
        .map(|execution| execution.test_name.clone());

    let flaky_passes = executions
        .iter()
        .filter(|execution| execution.passed_after_retry())
        .count();
    let retried = executions
        .iter()
        .filter(|execution| execution.retry_attempt > 0)
        .count();
    let retry_success_rate = if retried > 0 {
        flaky_passes as f64 / retried as f64
    } else {
        0.0
    };

    ExecutionAnalysis {
        summary: AnalysisSummary {
            total,
            passed,
            failed,
            cancelled,
            pass_rate,
            avg_duration_secs,
            total_duration_secs,
        },
        performance: AnalysisPerformance {
            parallel_efficiency,
            fastest_test,
            slowest_test,
        },
        quality: AnalysisQuality {
            flaky_passes,
            retried,
            retry_success_rate,
            top_failure_fingerprints: fingerprint_histogram(executions),
        },
    }
}

/// Assembles the full report record for a run.
pub fn build_report(
    suite_name: &str,
    environment: &str,
    started_at: DateTime<Utc>,
    executions: Vec<Execution>,
    wall_clock: Duration,
) -> ExecutionReport {
    let analysis = analyze(&executions, wall_clock);
    ExecutionReport {
        suite_name: suite_name.to_string(),
        run_id: Uuid::new_v4(),
        environment: environment.to_string(),
        started_at,
        finished_at: Utc::now(),
        wall_clock_secs: wall_clock.as_secs_f64(),
        analysis,
        executions,
    }
}

fn count_status(executions: &[Execution], status: ExecutionStatus) -> usize {
    executions
        .iter()
        .filter(|execution| execution.status == status)
        .count()
}

/// Top-N failure fingerprints by frequency; ties break alphabetically so
/// the histogram is deterministic.
/// 按频次取前 N 的失败指纹；并列时按字母序打破，使直方图确定。
fn fingerprint_histogram(executions: &[Execution]) -> Vec<FingerprintCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for execution in executions {
        if execution.status != ExecutionStatus::Failed {
            continue;
        }
        if let Some(message) = &execution.error_message {
            let fingerprint = extract_fingerprint(message);
            if !fingerprint.is_empty() {
                *counts.entry(fingerprint).or_insert(0) += 1;
            }
        }
    }

    let mut histogram: Vec<FingerprintCount> = counts
        .into_iter()
        .map(|(fingerprint, count)| FingerprintCount { fingerprint, count })
        .collect();
    histogram.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.fingerprint.cmp(&b.fingerprint))
    });
    histogram.truncate(TOP_FINGERPRINTS);
    histogram
}
