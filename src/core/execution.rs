//! # Concurrent Executor Module / 并发执行器模块
//!
//! Drives an execution plan to completion: every planned test id flows
//! through a bounded admission gate, runs its per-test retry loop as one
//! logical unit of work, and lands in the result list exactly once. The
//! in-flight table shared with the timeout supervisor is defined here as
//! well.
//!
//! 将执行计划推进到完成：每个计划内的测试 id 都经过有界的准入门限，
//! 作为一个逻辑工作单元运行其重试循环，并且恰好一次落入结果列表。
//! 与超时监督器共享的在途表也定义在这里。

use anyhow::Result;
use async_trait::async_trait;
use colored::*;
use futures::{StreamExt, stream};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::core::models::{Execution, ExecutionPlan, RunnerOutput, TestCase};
use crate::core::registry::TestCaseRegistry;
use crate::core::retry::RetryPolicy;
use crate::infra::t;

/// The test-runner collaborator: an opaque external process invoked once
/// per attempt. `Ok` carries the test verdict; `Err` means the collaborator
/// itself could not be invoked (a transport failure, never retried).
///
/// 测试运行器协作方：每次尝试调用一次的不透明外部进程。
/// `Ok` 携带测试裁定；`Err` 表示协作方自身无法被调用
/// （传输层失败，永不重试）。
#[async_trait]
pub trait TestRunner: Send + Sync {
    async fn invoke(
        &self,
        case: &TestCase,
        environment: &str,
        execution_id: Uuid,
    ) -> Result<RunnerOutput>;
}

/// Why an in-flight execution was interrupted from outside its own loop.
/// 在途执行被其循环之外中断的原因。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interrupt {
    /// The timeout supervisor hit the deadline; terminal `Failed`.
    TimedOut(String),
    /// A targeted cancellation; terminal `Cancelled`.
    Cancelled(String),
}

/// Book-keeping for one in-flight execution, shared between the executor
/// task that owns the execution and the supervisor that watches it.
///
/// 单个在途执行的簿记信息，由持有该执行的执行器任务
/// 与监视它的监督器共享。
#[derive(Debug)]
pub struct InFlightEntry {
    pub test_name: String,
    started: Instant,
    interrupt: Mutex<Option<Interrupt>>,
    token: CancellationToken,
}

impl InFlightEntry {
    fn new(test_name: String) -> Self {
        Self {
            test_name,
            started: Instant::now(),
            interrupt: Mutex::new(None),
            token: CancellationToken::new(),
        }
    }

    /// How long this execution has been running.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Records an interrupt and wakes the owning task. The first interrupt
    /// wins; later ones only re-trigger the (idempotent) token.
    /// 记录一次中断并唤醒持有任务。第一个中断生效；
    /// 之后的中断只会重复触发（幂等的）令牌。
    pub fn interrupt(&self, interrupt: Interrupt) {
        {
            let mut slot = self
                .interrupt
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if slot.is_none() {
                *slot = Some(interrupt);
            }
        }
        self.token.cancel();
    }

    fn take_interrupt(&self) -> Option<Interrupt> {
        self.interrupt
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    /// Resolves once an interrupt has been recorded.
    pub fn interrupted(&self) -> tokio_util::sync::WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }
}

/// The set of currently in-flight executions, keyed by execution id. The
/// executor inserts and removes entries; the supervisor and external
/// cancellation requests only ever signal through an entry's interrupt.
///
/// 当前在途执行的集合，以执行 id 为键。执行器负责插入和移除条目；
/// 监督器和外部取消请求只通过条目的中断机制发出信号。
#[derive(Debug, Default)]
pub struct InFlightTable {
    entries: Mutex<HashMap<Uuid, Arc<InFlightEntry>>>,
}

impl InFlightTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Arc<InFlightEntry>>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn insert(&self, execution_id: Uuid, test_name: String) -> Arc<InFlightEntry> {
        let entry = Arc::new(InFlightEntry::new(test_name));
        self.lock().insert(execution_id, Arc::clone(&entry));
        entry
    }

    pub fn remove(&self, execution_id: &Uuid) -> Option<Arc<InFlightEntry>> {
        self.lock().remove(execution_id)
    }

    /// Number of executions currently holding an admission slot.
    pub fn active_count(&self) -> usize {
        self.lock().len()
    }

    /// A point-in-time view for the supervisor's sweep.
    pub fn snapshot(&self) -> Vec<(Uuid, Arc<InFlightEntry>)> {
        self.lock()
            .iter()
            .map(|(id, entry)| (*id, Arc::clone(entry)))
            .collect()
    }

    /// Cancels a single in-flight execution. Its slot is released as soon
    /// as the owning task observes the interrupt. Returns whether the id
    /// was in flight.
    ///
    /// 取消单个在途执行。持有任务观察到中断后其槽位立即释放。
    /// 返回该 id 是否在途。
    pub fn cancel_execution(&self, execution_id: &Uuid, reason: &str) -> bool {
        match self.remove(execution_id) {
            Some(entry) => {
                entry.interrupt(Interrupt::Cancelled(reason.to_string()));
                true
            }
            None => false,
        }
    }

    /// Cancels every in-flight execution, draining the table.
    pub fn cancel_all(&self, reason: &str) {
        let drained: Vec<Arc<InFlightEntry>> = {
            let mut entries = self.lock();
            entries.drain().map(|(_, entry)| entry).collect()
        };
        for entry in drained {
            entry.interrupt(Interrupt::Cancelled(reason.to_string()));
        }
    }
}

/// Everything a run produced: one record per planned test (none dropped)
/// plus the run's wall-clock time for the efficiency ratio.
/// 一次运行的全部产出：每个计划内测试恰好一条记录（无遗漏），
/// 以及用于效率比的运行墙钟时间。
#[derive(Debug)]
pub struct CompletedRun {
    pub executions: Vec<Execution>,
    pub wall_clock: Duration,
}

struct ExecutorInner {
    registry: Arc<TestCaseRegistry>,
    runner: Arc<dyn TestRunner>,
    retry_policy: RetryPolicy,
    in_flight: Arc<InFlightTable>,
    cancel_token: CancellationToken,
}

/// Runs an [`ExecutionPlan`] under a counting admission gate of the plan's
/// width. Each test case's retry loop is one unit of work: it keeps its
/// slot across runner calls and backoff sleeps, and only ever runs one
/// attempt of its test at a time.
///
/// 在计划宽度的计数准入门限下运行 [`ExecutionPlan`]。
/// 每个测试用例的重试循环是一个工作单元：
/// 它在运行器调用和退避休眠期间一直占有槽位，
/// 且同一测试同一时间只运行一次尝试。
#[derive(Clone)]
pub struct Executor {
    inner: Arc<ExecutorInner>,
}

impl Executor {
    pub fn new(
        registry: Arc<TestCaseRegistry>,
        runner: Arc<dyn TestRunner>,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(ExecutorInner {
                registry,
                runner,
                retry_policy,
                in_flight: Arc::new(InFlightTable::new()),
                cancel_token: CancellationToken::new(),
            }),
        }
    }

    /// Token that cancels the whole run: in-flight executions stop, queued
    /// ones never start.
    /// 取消整个运行的令牌：在途执行停止，排队的执行不再启动。
    pub fn cancel_token(&self) -> CancellationToken {
        self.inner.cancel_token.clone()
    }

    /// The in-flight table, shared with the timeout supervisor.
    pub fn in_flight(&self) -> Arc<InFlightTable> {
        Arc::clone(&self.inner.in_flight)
    }

    /// Cancels one execution by id.
    pub fn cancel_execution(&self, execution_id: &Uuid) -> bool {
        self.inner
            .in_flight
            .cancel_execution(execution_id, "execution cancelled")
    }

    /// Executes the plan and gathers every outcome. A test whose task
    /// panics or whose collaborator call errored is still represented by a
    /// synthetic `Failed` record carrying the original error.
    ///
    /// 执行计划并收集所有结果。任务 panic 或协作方调用出错的测试
    /// 仍会以携带原始错误的合成 `Failed` 记录呈现。
    pub async fn run(&self, plan: &ExecutionPlan) -> CompletedRun {
        let width = plan.concurrency.max(1);
        let run_started = Instant::now();

        let case_ids: Vec<String> = plan.case_ids.clone();
        let environment = plan.environment.clone();

        let executions: Vec<Execution> = stream::iter(case_ids.into_iter().map(|case_id| {
            let inner = Arc::clone(&self.inner);
            let environment = environment.clone();
            async move {
                let id_for_error = case_id.clone();
                let env_for_error = environment.clone();
                // The spawn isolates a panicking collaborator to its own
                // execution record instead of tearing the whole run down.
                let handle =
                    tokio::spawn(async move { inner.run_case(case_id, environment).await });
                match handle.await {
                    Ok(execution) => execution,
                    Err(join_error) => Execution::synthetic_failure(
                        &id_for_error,
                        &env_for_error,
                        format!("orchestration error: {}", join_error),
                    ),
                }
            }
        }))
        .buffer_unordered(width)
        .collect()
        .await;

        CompletedRun {
            executions,
            wall_clock: run_started.elapsed(),
        }
    }
}

impl ExecutorInner {
    /// The per-test retry loop. Strictly sequential for its test id; the
    /// admission slot is held from the first attempt to the terminal state.
    async fn run_case(self: Arc<Self>, case_id: String, environment: String) -> Execution {
        let Some(case) = self.registry.get(&case_id) else {
            return Execution::synthetic_failure(
                &case_id,
                &environment,
                format!("test case '{}' is not registered", case_id),
            );
        };

        // A cancelled run never starts work it has not begun.
        if self.cancel_token.is_cancelled() {
            let mut execution = Execution::new(&case, &environment);
            execution.cancel("cancelled before start: run aborted");
            return execution;
        }

        let mut execution = Execution::new(&case, &environment);
        let entry = self.in_flight.insert(execution.id, case.name.clone());
        let loop_started = Instant::now();

        execution.mark_running();
        println!("{}", t!("exec_running_test", name = case.name).blue());

        let mut attempt: u32 = 0;
        loop {
            tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => {
                    execution.cancel("execution cancelled: run aborted");
                    println!("{}", t!("exec_test_cancelled", name = case.name).yellow());
                    break;
                }
                _ = entry.interrupted() => {
                    self.apply_interrupt(&entry, &mut execution, &case.name);
                    break;
                }
                invoked = self.runner.invoke(&case, &environment, execution.id) => {
                    match invoked {
                        Ok(output) => {
                            collect_logs(&mut execution, &output);
                            if output.success {
                                execution.pass();
                                if attempt > 0 {
                                    println!(
                                        "{}",
                                        t!("exec_test_passed_on_retry", name = case.name, retries = attempt)
                                            .green()
                                    );
                                } else {
                                    println!("{}", t!("exec_test_passed", name = case.name).green());
                                }
                                break;
                            }

                            let error_detail = output.error_detail();
                            execution.error_message = Some(error_detail.clone());

                            if !self.retry_policy.should_retry(&case, &error_detail, attempt).await {
                                execution.fail(error_detail);
                                println!(
                                    "{}",
                                    t!("exec_test_failed", name = case.name, attempts = attempt + 1).red()
                                );
                                break;
                            }

                            execution.mark_retrying();
                            let delay = self.retry_policy.retry_delay(attempt);
                            attempt += 1;
                            execution.retry_attempt = attempt;
                            println!(
                                "{}",
                                t!(
                                    "exec_test_retrying",
                                    name = case.name,
                                    attempt = attempt,
                                    delay = format!("{:.1}", delay.as_secs_f64())
                                )
                                .yellow()
                            );

                            // Backoff keeps the admission slot but must stay
                            // responsive to cancellation and timeouts.
                            tokio::select! {
                                biased;
                                _ = self.cancel_token.cancelled() => {
                                    execution.cancel("execution cancelled: run aborted");
                                    println!("{}", t!("exec_test_cancelled", name = case.name).yellow());
                                }
                                _ = entry.interrupted() => {
                                    self.apply_interrupt(&entry, &mut execution, &case.name);
                                }
                                _ = tokio::time::sleep(delay) => {}
                            }
                            if execution.is_terminal() {
                                break;
                            }
                            execution.mark_running();
                        }
                        Err(error) => {
                            // The collaborator itself failed; this is not a
                            // test failure and must not retry silently.
                            execution.fail(format!("runner transport failure: {}", error));
                            println!(
                                "{}",
                                t!("exec_transport_error", name = case.name, error = error).red()
                            );
                            break;
                        }
                    }
                }
            }
        }

        execution.duration = loop_started.elapsed();
        self.in_flight.remove(&execution.id);
        if let Err(error) = self.registry.update_statistics(&case.id, &execution) {
            println!(
                "{}",
                t!("exec_statistics_failed", name = case.name, error = error).red()
            );
        }
        execution
    }

    fn apply_interrupt(&self, entry: &InFlightEntry, execution: &mut Execution, name: &str) {
        match entry.take_interrupt() {
            Some(Interrupt::TimedOut(message)) => {
                execution.fail(message);
                println!("{}", t!("exec_test_timed_out", name = name).red());
            }
            Some(Interrupt::Cancelled(reason)) => {
                execution.cancel(reason);
                println!("{}", t!("exec_test_cancelled", name = name).yellow());
            }
            // The token fired without a recorded reason; treat it as a
            // plain cancellation.
            None => {
                execution.cancel("execution cancelled");
                println!("{}", t!("exec_test_cancelled", name = name).yellow());
            }
        }
    }
}

fn collect_logs(execution: &mut Execution, output: &RunnerOutput) {
    if !output.stdout.trim().is_empty() {
        execution
            .logs
            .push(format!("STDOUT: {}", output.stdout.trim_end()));
    }
    if !output.stderr.trim().is_empty() {
        execution
            .logs
            .push(format!("STDERR: {}", output.stderr.trim_end()));
    }
}
