// Shared test helpers for integration tests
#![allow(dead_code)]

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use suite_runner::core::execution::TestRunner;
use suite_runner::core::models::{RunnerOutput, TestCase, TestPriority, TestSuite};

/// Builds a test case with neutral metadata and fresh statistics.
pub fn make_case(id: &str) -> TestCase {
    TestCase {
        id: id.to_string(),
        name: id.to_string(),
        file: format!("tests/{}.spec.ts", id),
        framework: "mock".to_string(),
        tags: Vec::new(),
        priority: TestPriority::Medium,
        estimated_secs: 1,
        max_retries: 3,
        environments: vec!["staging".to_string()],
        dependencies: Vec::new(),
        avg_duration_secs: 0.0,
        success_rate: 1.0,
        flakiness: 0.0,
        failure_fingerprints: Vec::new(),
        last_execution: None,
    }
}

pub fn make_suite(name: &str, case_ids: &[&str]) -> TestSuite {
    TestSuite {
        name: name.to_string(),
        description: String::new(),
        case_ids: case_ids.iter().map(|id| id.to_string()).collect(),
        parallel_execution: true,
        max_concurrency: 4,
        timeout: Duration::from_secs(1800),
        environments: vec!["staging".to_string()],
    }
}

pub fn pass_output() -> RunnerOutput {
    RunnerOutput {
        success: true,
        return_code: Some(0),
        stdout: "1 passed".to_string(),
        stderr: String::new(),
        error_message: None,
    }
}

pub fn fail_output(error: &str) -> RunnerOutput {
    RunnerOutput {
        success: false,
        return_code: Some(1),
        stdout: String::new(),
        stderr: error.to_string(),
        error_message: Some(error.to_string()),
    }
}

/// What the mock runner should do for one test id.
#[derive(Clone)]
pub enum MockBehavior {
    /// Sleep, then report success.
    Pass { delay: Duration },
    /// Sleep, then report a test failure with the given error.
    Fail { delay: Duration, error: String },
    /// Report a failure for the first `failures` invocations, then pass.
    FailThenPass {
        failures: usize,
        delay: Duration,
        error: String,
    },
    /// Never return; only an interrupt can settle the execution.
    Hang,
    /// Simulate a collaborator that cannot be invoked at all.
    TransportError { error: String },
}

/// A scripted in-process stand-in for the test-runner collaborator. It
/// counts invocations per test id and tracks the high-water mark of
/// concurrent invocations, which is what the concurrency-invariant tests
/// assert on.
pub struct MockRunner {
    default: MockBehavior,
    behaviors: HashMap<String, MockBehavior>,
    invocations: Mutex<HashMap<String, usize>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl MockRunner {
    pub fn new(default: MockBehavior) -> Self {
        Self {
            default,
            behaviors: HashMap::new(),
            invocations: Mutex::new(HashMap::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    pub fn with_behavior(mut self, id: &str, behavior: MockBehavior) -> Self {
        self.behaviors.insert(id.to_string(), behavior);
        self
    }

    /// How many times `invoke` ran for the given test id.
    pub fn invocations(&self, id: &str) -> usize {
        self.invocations
            .lock()
            .unwrap()
            .get(id)
            .copied()
            .unwrap_or(0)
    }

    /// Highest number of concurrently active invocations observed.
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TestRunner for MockRunner {
    async fn invoke(
        &self,
        case: &TestCase,
        _environment: &str,
        _execution_id: Uuid,
    ) -> Result<RunnerOutput> {
        let invocation = {
            let mut map = self.invocations.lock().unwrap();
            let counter = map.entry(case.id.clone()).or_insert(0);
            *counter += 1;
            *counter
        };
        let behavior = self
            .behaviors
            .get(&case.id)
            .cloned()
            .unwrap_or_else(|| self.default.clone());

        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        let result = match behavior {
            MockBehavior::Pass { delay } => {
                tokio::time::sleep(delay).await;
                Ok(pass_output())
            }
            MockBehavior::Fail { delay, error } => {
                tokio::time::sleep(delay).await;
                Ok(fail_output(&error))
            }
            MockBehavior::FailThenPass {
                failures,
                delay,
                error,
            } => {
                tokio::time::sleep(delay).await;
                if invocation <= failures {
                    Ok(fail_output(&error))
                } else {
                    Ok(pass_output())
                }
            }
            MockBehavior::Hang => {
                futures::future::pending::<()>().await;
                unreachable!("a hung invocation never resolves on its own")
            }
            MockBehavior::TransportError { error } => Err(anyhow!(error)),
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Convenience wrapper: an Arc'd mock runner with a single default behavior.
pub fn shared_runner(default: MockBehavior) -> Arc<MockRunner> {
    Arc::new(MockRunner::new(default))
}
