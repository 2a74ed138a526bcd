//! # Executor Integration Tests / 执行器集成测试
//!
//! Drives the concurrent executor through the library API with a scripted
//! mock runner: the happy path, the retry loop, the concurrency invariant,
//! transport failures, cancellation and the no-execution-dropped rule.
//!
//! 通过库 API 和脚本化的模拟运行器驱动并发执行器：
//! 正常路径、重试循环、并发不变式、传输层失败、
//! 取消以及“不丢弃任何执行”的规则。

mod common;

use common::{MockBehavior, MockRunner, make_case, make_suite};
use std::sync::Arc;
use std::time::Duration;

use suite_runner::core::execution::{Executor, TestRunner};
use suite_runner::core::models::{ExecutionPlan, ExecutionStatus, TestCase};
use suite_runner::core::planner::plan_execution;
use suite_runner::core::registry::TestCaseRegistry;
use suite_runner::core::retry::{RetryConfig, RetryPolicy};
use suite_runner::reporting::analyzer::analyze;

fn quick_retry_config() -> RetryConfig {
    RetryConfig {
        base_delay_ms: 10,
        exponential_backoff: true,
        ..Default::default()
    }
}

fn build_executor(registry: &Arc<TestCaseRegistry>, runner: &Arc<MockRunner>) -> Executor {
    Executor::new(
        Arc::clone(registry),
        Arc::clone(runner) as Arc<dyn TestRunner>,
        RetryPolicy::new(quick_retry_config()),
    )
}

fn registry_of(cases: Vec<TestCase>) -> Arc<TestCaseRegistry> {
    Arc::new(TestCaseRegistry::from_cases(cases))
}

/// Scenario: three tests at width 1, all passing first try. The report
/// counts three passes, zero retries, and a parallel efficiency near 1.0.
#[tokio::test]
async fn test_sequential_suite_all_pass() {
    let cases = vec![make_case("a"), make_case("b"), make_case("c")];
    let registry = registry_of(cases.clone());
    let runner = Arc::new(MockRunner::new(MockBehavior::Pass {
        delay: Duration::from_millis(50),
    }));

    let mut suite = make_suite("smoke", &["a", "b", "c"]);
    suite.parallel_execution = false;
    let plan = plan_execution(&suite, &cases, "staging");
    assert_eq!(plan.concurrency, 1);

    let executor = build_executor(&registry, &runner);
    let completed = executor.run(&plan).await;

    assert_eq!(completed.executions.len(), 3);
    for execution in &completed.executions {
        assert_eq!(execution.status, ExecutionStatus::Passed);
        assert_eq!(execution.retry_attempt, 0);
    }
    assert_eq!(runner.max_active(), 1);

    let analysis = analyze(&completed.executions, completed.wall_clock);
    assert_eq!(analysis.summary.passed, 3);
    assert_eq!(analysis.quality.retried, 0);
    // Serial work over serial wall clock: the ratio sits at ~1.0, with a
    // little slack for scheduling overhead.
    assert!(
        analysis.performance.parallel_efficiency > 0.8
            && analysis.performance.parallel_efficiency < 1.1,
        "efficiency was {}",
        analysis.performance.parallel_efficiency
    );
}

/// Scenario: a test with `max_retries = 2` fails twice with a retryable
/// error and passes on the third attempt.
#[tokio::test]
async fn test_passes_after_two_retries() {
    let mut case = make_case("flaky");
    case.max_retries = 2;
    let registry = registry_of(vec![case.clone()]);
    let runner = Arc::new(MockRunner::new(MockBehavior::FailThenPass {
        failures: 2,
        delay: Duration::from_millis(5),
        error: "TimeoutError: page load".to_string(),
    }));

    let suite = make_suite("retry", &["flaky"]);
    let plan = plan_execution(&suite, &[case], "staging");
    let executor = build_executor(&registry, &runner);
    let completed = executor.run(&plan).await;

    let execution = &completed.executions[0];
    assert_eq!(execution.status, ExecutionStatus::Passed);
    assert_eq!(execution.retry_attempt, 2);
    assert_eq!(runner.invocations("flaky"), 3);
    assert!(execution.passed_after_retry());

    // Passing only after retries raises the flakiness score by exactly 0.1.
    let updated = registry.get("flaky").unwrap();
    assert!((updated.flakiness - 0.1).abs() < 1e-9);
}

/// Scenario: a skip-pattern failure on the first attempt fails immediately
/// with no retry; the attempt counter stays at 0.
#[tokio::test]
async fn test_skip_pattern_fails_without_retry() {
    let case = make_case("asserting");
    let registry = registry_of(vec![case.clone()]);
    let runner = Arc::new(MockRunner::new(MockBehavior::Fail {
        delay: Duration::from_millis(5),
        error: "AssertionError: expected true to be false".to_string(),
    }));

    let suite = make_suite("strict", &["asserting"]);
    let plan = plan_execution(&suite, &[case], "staging");
    let executor = build_executor(&registry, &runner);
    let completed = executor.run(&plan).await;

    let execution = &completed.executions[0];
    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert_eq!(execution.retry_attempt, 0);
    assert_eq!(runner.invocations("asserting"), 1);
}

/// The number of attempts never exceeds `max_retries + 1`, and exhausting
/// the budget without success nudges flakiness downward (floored at 0).
#[tokio::test]
async fn test_attempts_bounded_by_retry_budget() {
    let mut case = make_case("always-failing");
    case.max_retries = 2;
    case.flakiness = 0.5;
    let registry = registry_of(vec![case.clone()]);
    let runner = Arc::new(MockRunner::new(MockBehavior::Fail {
        delay: Duration::from_millis(5),
        error: "NetworkError: connection reset".to_string(),
    }));

    let suite = make_suite("bounded", &["always-failing"]);
    let plan = plan_execution(&suite, &[case], "staging");
    let executor = build_executor(&registry, &runner);
    let completed = executor.run(&plan).await;

    let execution = &completed.executions[0];
    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert_eq!(execution.retry_attempt, 2);
    assert_eq!(runner.invocations("always-failing"), 3);

    let updated = registry.get("always-failing").unwrap();
    assert!((updated.flakiness - 0.45).abs() < 1e-9);
}

/// Concurrency invariant: with a plan width of 2, the runner never observes
/// more than 2 concurrently active invocations, whatever the interleaving.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrency_cap_is_never_exceeded() {
    let cases: Vec<TestCase> = (0..8)
        .map(|i| {
            let mut case = make_case(&format!("case-{}", i));
            case.estimated_secs = 1;
            case
        })
        .collect();
    let registry = registry_of(cases.clone());
    let runner = Arc::new(MockRunner::new(MockBehavior::Pass {
        delay: Duration::from_millis(30),
    }));

    // 8s of serial estimate against a 4s timeout: the planner lands on
    // min(2, 8, 4) = 2 workers.
    let mut suite = make_suite("capped", &[]);
    suite.max_concurrency = 2;
    suite.timeout = Duration::from_secs(4);
    let plan = plan_execution(&suite, &cases, "staging");
    assert_eq!(plan.concurrency, 2);

    let executor = build_executor(&registry, &runner);
    let completed = executor.run(&plan).await;

    assert_eq!(completed.executions.len(), 8);
    assert!(
        completed
            .executions
            .iter()
            .all(|execution| execution.status == ExecutionStatus::Passed)
    );
    assert!(
        runner.max_active() <= 2,
        "observed {} concurrent invocations",
        runner.max_active()
    );
}

/// A transport failure (the collaborator itself errored) is terminal
/// `Failed` with no retry, even though the retry budget is untouched.
#[tokio::test]
async fn test_transport_failure_is_never_retried() {
    let case = make_case("unreachable");
    let registry = registry_of(vec![case.clone()]);
    let runner = Arc::new(MockRunner::new(MockBehavior::TransportError {
        error: "runner binary missing".to_string(),
    }));

    let suite = make_suite("transport", &["unreachable"]);
    let plan = plan_execution(&suite, &[case], "staging");
    let executor = build_executor(&registry, &runner);
    let completed = executor.run(&plan).await;

    let execution = &completed.executions[0];
    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert_eq!(execution.retry_attempt, 0);
    assert_eq!(runner.invocations("unreachable"), 1);
    let error = execution.error_message.as_deref().unwrap();
    assert!(error.contains("transport"), "unexpected error: {}", error);
    assert!(error.contains("runner binary missing"));
}

/// No execution is ever dropped: a plan id the registry has never heard of
/// still lands in the result list, as a synthetic failure.
#[tokio::test]
async fn test_unknown_plan_id_becomes_synthetic_failure() {
    let cases = vec![make_case("real")];
    let registry = registry_of(cases.clone());
    let runner = Arc::new(MockRunner::new(MockBehavior::Pass {
        delay: Duration::from_millis(5),
    }));

    let suite = make_suite("ghostly", &["real"]);
    let mut plan: ExecutionPlan = plan_execution(&suite, &cases, "staging");
    plan.case_ids.push("ghost".to_string());

    let executor = build_executor(&registry, &runner);
    let completed = executor.run(&plan).await;

    assert_eq!(completed.executions.len(), 2);
    let ghost = completed
        .executions
        .iter()
        .find(|execution| execution.test_id == "ghost")
        .expect("ghost execution present");
    assert_eq!(ghost.status, ExecutionStatus::Failed);
    assert!(
        ghost
            .error_message
            .as_deref()
            .unwrap()
            .contains("not registered")
    );
}

/// Cancelling before the run starts produces only `Cancelled` records and
/// never invokes the collaborator.
#[tokio::test]
async fn test_cancelled_run_starts_nothing() {
    let cases = vec![make_case("a"), make_case("b")];
    let registry = registry_of(cases.clone());
    let runner = Arc::new(MockRunner::new(MockBehavior::Pass {
        delay: Duration::from_millis(5),
    }));

    let suite = make_suite("aborted", &["a", "b"]);
    let plan = plan_execution(&suite, &cases, "staging");
    let executor = build_executor(&registry, &runner);

    executor.cancel_token().cancel();
    let completed = executor.run(&plan).await;

    assert_eq!(completed.executions.len(), 2);
    for execution in &completed.executions {
        assert_eq!(execution.status, ExecutionStatus::Cancelled);
    }
    assert_eq!(runner.invocations("a"), 0);
    assert_eq!(runner.invocations("b"), 0);
}

/// Cancelling mid-run stops the in-flight execution and keeps the queued
/// ones from ever starting.
#[tokio::test(start_paused = true)]
async fn test_cancellation_mid_run() {
    let cases = vec![make_case("stuck"), make_case("queued-1"), make_case("queued-2")];
    let registry = registry_of(cases.clone());
    let runner = Arc::new(
        MockRunner::new(MockBehavior::Pass {
            delay: Duration::from_millis(5),
        })
        .with_behavior("stuck", MockBehavior::Hang),
    );

    let mut suite = make_suite("hung", &["stuck", "queued-1", "queued-2"]);
    suite.parallel_execution = false;
    let plan = plan_execution(&suite, &cases, "staging");

    let executor = build_executor(&registry, &runner);
    let token = executor.cancel_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();
    });

    let completed = executor.run(&plan).await;

    assert_eq!(completed.executions.len(), 3);
    for execution in &completed.executions {
        assert_eq!(
            execution.status,
            ExecutionStatus::Cancelled,
            "{} ended {}",
            execution.test_id,
            execution.status
        );
    }
    // Only the hung test ever reached the collaborator.
    assert_eq!(runner.invocations("stuck"), 1);
    assert_eq!(runner.invocations("queued-1"), 0);
    assert_eq!(runner.invocations("queued-2"), 0);
}
