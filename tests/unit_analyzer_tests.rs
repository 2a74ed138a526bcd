//! # Analyzer Module Unit Tests / Analyzer 模块单元测试
//!
//! Unit tests for the pure result aggregation: status counts, rate math,
//! flakiness-in-this-run detection, the fingerprint histogram and the
//! parallel-efficiency ratio.
//!
//! 纯结果聚合的单元测试：状态计数、比率计算、本次运行不稳定检测、
//! 指纹直方图和并行效率比。

mod common;

use common::make_case;
use std::time::Duration;
use suite_runner::core::models::Execution;
use suite_runner::reporting::analyzer::{TOP_FINGERPRINTS, analyze, build_report};

fn passed(id: &str, secs: f64, retries: u32) -> Execution {
    let case = make_case(id);
    let mut execution = Execution::new(&case, "staging");
    execution.mark_running();
    execution.retry_attempt = retries;
    execution.pass();
    execution.duration = Duration::from_secs_f64(secs);
    execution
}

fn failed(id: &str, secs: f64, error: &str) -> Execution {
    let case = make_case(id);
    let mut execution = Execution::new(&case, "staging");
    execution.mark_running();
    execution.fail(error);
    execution.duration = Duration::from_secs_f64(secs);
    execution
}

fn cancelled(id: &str) -> Execution {
    let case = make_case(id);
    let mut execution = Execution::new(&case, "staging");
    execution.mark_running();
    execution.cancel("run aborted");
    execution
}

#[test]
fn test_counts_and_rates() {
    let executions = vec![
        passed("a", 1.0, 0),
        passed("b", 2.0, 1),
        failed("c", 3.0, "Error: boom\n"),
        cancelled("d"),
    ];
    let analysis = analyze(&executions, Duration::from_secs(3));

    assert_eq!(analysis.summary.total, 4);
    assert_eq!(analysis.summary.passed, 2);
    assert_eq!(analysis.summary.failed, 1);
    assert_eq!(analysis.summary.cancelled, 1);
    assert!((analysis.summary.pass_rate - 0.5).abs() < 1e-9);
    assert!((analysis.summary.total_duration_secs - 6.0).abs() < 1e-9);
    assert!((analysis.summary.avg_duration_secs - 1.5).abs() < 1e-9);
}

#[test]
fn test_parallel_efficiency_is_work_over_wall_clock() {
    let executions = vec![passed("a", 4.0, 0), passed("b", 4.0, 0)];
    // 8s of per-test work squeezed into 4s of wall clock: two workers.
    let analysis = analyze(&executions, Duration::from_secs(4));
    assert!((analysis.performance.parallel_efficiency - 2.0).abs() < 1e-9);
}

#[test]
fn test_fastest_and_slowest_tests() {
    let executions = vec![
        passed("quick", 0.5, 0),
        passed("slow", 9.0, 0),
        passed("middle", 3.0, 0),
    ];
    let analysis = analyze(&executions, Duration::from_secs(10));
    assert_eq!(analysis.performance.fastest_test.as_deref(), Some("quick"));
    assert_eq!(analysis.performance.slowest_test.as_deref(), Some("slow"));
}

#[test]
fn test_flaky_passes_and_retry_success_rate() {
    let executions = vec![
        passed("first-try", 1.0, 0),
        passed("flaky", 1.0, 2),
        {
            let mut execution = failed("hopeless", 1.0, "Error: nope\n");
            execution.retry_attempt = 3;
            execution
        },
    ];
    let analysis = analyze(&executions, Duration::from_secs(3));
    assert_eq!(analysis.quality.flaky_passes, 1);
    assert_eq!(analysis.quality.retried, 2);
    assert!((analysis.quality.retry_success_rate - 0.5).abs() < 1e-9);
}

#[test]
fn test_fingerprint_histogram_ranks_by_frequency() {
    let executions = vec![
        failed("a", 1.0, "TimeoutError: page load"),
        failed("b", 1.0, "TimeoutError: page load"),
        failed("c", 1.0, "NetworkError: reset"),
    ];
    let analysis = analyze(&executions, Duration::from_secs(3));

    let histogram = &analysis.quality.top_failure_fingerprints;
    assert_eq!(histogram.len(), 2);
    assert_eq!(histogram[0].fingerprint, "page load");
    assert_eq!(histogram[0].count, 2);
    assert_eq!(histogram[1].fingerprint, "reset");
    assert_eq!(histogram[1].count, 1);
}

#[test]
fn test_fingerprint_histogram_is_bounded() {
    let executions: Vec<Execution> = (0..(TOP_FINGERPRINTS + 4))
        .map(|i| {
            failed(
                &format!("case-{}", i),
                1.0,
                &format!("TimeoutError: distinct failure {}", i),
            )
        })
        .collect();
    let analysis = analyze(&executions, Duration::from_secs(1));
    assert_eq!(
        analysis.quality.top_failure_fingerprints.len(),
        TOP_FINGERPRINTS
    );
}

#[test]
fn test_empty_run_analyzes_to_zeroes() {
    let analysis = analyze(&[], Duration::ZERO);
    assert_eq!(analysis.summary.total, 0);
    assert_eq!(analysis.summary.pass_rate, 0.0);
    assert_eq!(analysis.performance.parallel_efficiency, 0.0);
    assert!(analysis.performance.fastest_test.is_none());
}

#[test]
fn test_build_report_carries_the_run_context() {
    let started_at = chrono::Utc::now();
    let executions = vec![passed("a", 1.0, 0)];
    let report = build_report(
        "smoke",
        "staging",
        started_at,
        executions,
        Duration::from_secs(1),
    );

    assert_eq!(report.suite_name, "smoke");
    assert_eq!(report.environment, "staging");
    assert_eq!(report.started_at, started_at);
    assert_eq!(report.executions.len(), 1);
    assert!((report.wall_clock_secs - 1.0).abs() < 1e-9);

    // The record round-trips through the JSON sink's format.
    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"suite_name\":\"smoke\""));
}
