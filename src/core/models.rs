//! # Data Models Module / 数据模型模块
//!
//! This module defines the core data structures used throughout the suite
//! runner: test cases with their rolling statistics, suite definitions,
//! execution plans and per-attempt execution records.
//!
//! 此模块定义了整个套件运行器中使用的核心数据结构：
//! 带有滚动统计信息的测试用例、套件定义、执行计划和每次尝试的执行记录。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// How many distinct failure fingerprints a test case remembers.
/// 一个测试用例记住的不同失败指纹的数量。
pub const MAX_FAILURE_FINGERPRINTS: usize = 10;

/// Declared business priority of a test case.
/// Higher priorities are scheduled earlier by the default ordering.
///
/// 测试用例声明的业务优先级。
/// 默认排序会更早调度优先级更高的用例。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestPriority {
    Critical,
    High,
    Medium,
    Low,
}

impl TestPriority {
    /// Numeric rank used for ordering and threshold filters. Higher is more urgent.
    /// 用于排序和阈值过滤的数字等级。数值越高越紧急。
    pub fn rank(&self) -> u8 {
        match self {
            TestPriority::Critical => 4,
            TestPriority::High => 3,
            TestPriority::Medium => 2,
            TestPriority::Low => 1,
        }
    }

    /// Parses the lowercase names used in configuration files and on the CLI.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "critical" => Some(TestPriority::Critical),
            "high" => Some(TestPriority::High),
            "medium" => Some(TestPriority::Medium),
            "low" => Some(TestPriority::Low),
            _ => None,
        }
    }
}

impl Default for TestPriority {
    fn default() -> Self {
        TestPriority::Medium
    }
}

impl fmt::Display for TestPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TestPriority::Critical => "critical",
            TestPriority::High => "high",
            TestPriority::Medium => "medium",
            TestPriority::Low => "low",
        };
        write!(f, "{}", name)
    }
}

/// Lifecycle state of a single execution.
///
/// The machine is `Pending → Running → {Passed, Failed, Cancelled}` with an
/// internal `Running → Retrying → Running` sub-loop. `Passed`, `Failed` and
/// `Cancelled` are terminal and never revert. A `Pending` execution may be
/// cancelled directly when the whole run is stopped before it starts.
///
/// 单次执行的生命周期状态。
/// 状态机为 `Pending → Running → {Passed, Failed, Cancelled}`，
/// 内部包含 `Running → Retrying → Running` 重试子循环。
/// `Passed`、`Failed` 和 `Cancelled` 是终态，永不回退。
/// 当整个运行在执行开始前被停止时，`Pending` 的执行可以被直接取消。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Retrying,
    Passed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    /// A terminal status has no outgoing transitions.
    /// 终态没有任何出边。
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Passed | ExecutionStatus::Failed | ExecutionStatus::Cancelled
        )
    }

    /// Whether the machine allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: ExecutionStatus) -> bool {
        use ExecutionStatus::*;
        match (self, next) {
            (Pending, Running) | (Pending, Cancelled) => true,
            (Running, Passed) | (Running, Failed) | (Running, Cancelled) | (Running, Retrying) => {
                true
            }
            (Retrying, Running) | (Retrying, Failed) | (Retrying, Cancelled) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Retrying => "retrying",
            ExecutionStatus::Passed => "passed",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", name)
    }
}

/// A test case as the engine sees it: immutable-until-updated metadata from
/// the discovery collaborator plus rolling statistics maintained by the
/// registry after every completed execution.
///
/// 引擎视角下的测试用例：来自发现协作方的元数据（更新前不可变），
/// 加上注册表在每次执行完成后维护的滚动统计信息。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    /// Stable identifier, unique within the configuration.
    /// 稳定的标识符，在配置中唯一。
    pub id: String,
    /// Human-readable display name.
    /// 人类可读的显示名称。
    pub name: String,
    /// Reference to the test artifact handed to the runner collaborator.
    /// 交给运行器协作方的测试产物引用。
    pub file: String,
    /// Framework tag selecting the runner command (e.g. "playwright").
    /// 选择运行器命令的框架标签（例如 "playwright"）。
    pub framework: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub priority: TestPriority,
    /// Declared duration estimate, used until enough history accumulates.
    /// 声明的时长估计，在积累足够历史之前使用。
    #[serde(default = "default_estimated_secs")]
    pub estimated_secs: u64,
    /// Upper bound on retry attempts; the attempt counter never exceeds it.
    /// 重试次数上限；尝试计数器永不超过它。
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default)]
    pub environments: Vec<String>,
    /// Dependency metadata from discovery, carried through to reports.
    /// 来自发现步骤的依赖元数据，透传到报告中。
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Exponential moving average of execution duration, weight 0.2.
    /// 执行时长的指数移动平均，权重 0.2。
    #[serde(default)]
    pub avg_duration_secs: f64,
    /// Exponential moving average of pass/fail outcomes, weight 0.1.
    /// 通过/失败结果的指数移动平均，权重 0.1。
    #[serde(default = "default_success_rate")]
    pub success_rate: f64,
    /// Rolling flakiness indicator in [0, 1]; higher means less trustworthy
    /// on the first attempt.
    /// [0, 1] 区间内的滚动不稳定性指标；越高表示首次尝试越不可信。
    #[serde(default)]
    pub flakiness: f64,
    /// The most recent distinct failure fingerprints, oldest first.
    /// 最近出现的不同失败指纹，最旧的在前。
    #[serde(default)]
    pub failure_fingerprints: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_execution: Option<DateTime<Utc>>,
}

fn default_estimated_secs() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

fn default_success_rate() -> f64 {
    1.0
}

impl TestCase {
    /// Duration estimate the scheduler should use: the learned average once
    /// history exists, otherwise the declared estimate.
    /// 调度器应使用的时长估计：有历史后用学习到的平均值，否则用声明值。
    pub fn expected_duration_secs(&self) -> f64 {
        if self.avg_duration_secs > 0.0 {
            self.avg_duration_secs
        } else {
            self.estimated_secs as f64
        }
    }

    /// Records a failure fingerprint, keeping at most
    /// [`MAX_FAILURE_FINGERPRINTS`] distinct entries with FIFO eviction.
    pub fn push_fingerprint(&mut self, fingerprint: String) {
        if self.failure_fingerprints.iter().any(|f| *f == fingerprint) {
            return;
        }
        self.failure_fingerprints.push(fingerprint);
        if self.failure_fingerprints.len() > MAX_FAILURE_FINGERPRINTS {
            self.failure_fingerprints.remove(0);
        }
    }
}

/// A named, immutable-for-the-run collection of test cases with its
/// execution constraints.
///
/// 一个命名的测试用例集合，在单次运行期间不可变，并携带其执行约束。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuite {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Ordered list of member test-case ids.
    /// 成员测试用例 id 的有序列表。
    pub case_ids: Vec<String>,
    pub parallel_execution: bool,
    pub max_concurrency: usize,
    /// Wall-clock budget for the run; also the per-execution deadline the
    /// timeout supervisor enforces.
    /// 运行的墙钟时间预算；也是超时监督器强制执行的单次执行期限。
    pub timeout: Duration,
    pub environments: Vec<String>,
}

/// The planner's output: which cases run, in which order, how wide, and how
/// long the run is expected to take. Created once per run, never mutated.
///
/// 计划器的输出：运行哪些用例、顺序如何、并发多宽、预计耗时多久。
/// 每次运行创建一次，永不修改。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub suite_name: String,
    pub environment: String,
    pub case_ids: Vec<String>,
    /// Bounded concurrency width of the admission gate.
    /// 准入门限的并发宽度。
    pub concurrency: usize,
    pub estimated_total: Duration,
}

/// One attempt-sequence of a single test case within a run. Owned
/// exclusively by the executor until it reaches a terminal status, then
/// handed to the analyzer as an immutable record.
///
/// 单个测试用例在一次运行中的一个尝试序列。
/// 在到达终态之前由执行器独占持有，之后作为不可变记录交给分析器。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    pub id: Uuid,
    pub test_id: String,
    pub test_name: String,
    pub status: ExecutionStatus,
    /// Zero-based retry counter; stays 0 when the first attempt settles it.
    /// 从零开始的重试计数；首次尝试即定胜负时保持为 0。
    pub retry_attempt: u32,
    pub environment: String,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration: Duration,
    pub error_message: Option<String>,
    pub logs: Vec<String>,
}

impl Execution {
    /// Creates a fresh `Pending` execution for a test case.
    pub fn new(case: &TestCase, environment: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            test_id: case.id.clone(),
            test_name: case.name.clone(),
            status: ExecutionStatus::Pending,
            retry_attempt: 0,
            environment: environment.to_string(),
            started_at: None,
            finished_at: None,
            duration: Duration::ZERO,
            error_message: None,
            logs: Vec::new(),
        }
    }

    /// A record for a test that never reached its own retry loop because of
    /// an orchestration-level error. It still walks the state machine to a
    /// legal terminal `Failed` so no invariant is bent.
    ///
    /// 因编排层错误而从未进入自身重试循环的测试的记录。
    /// 它仍按状态机走到合法的终态 `Failed`，不违反任何不变式。
    pub fn synthetic_failure(test_id: &str, environment: &str, error: impl Into<String>) -> Self {
        let mut execution = Self {
            id: Uuid::new_v4(),
            test_id: test_id.to_string(),
            test_name: test_id.to_string(),
            status: ExecutionStatus::Pending,
            retry_attempt: 0,
            environment: environment.to_string(),
            started_at: None,
            finished_at: None,
            duration: Duration::ZERO,
            error_message: None,
            logs: Vec::new(),
        };
        execution.mark_running();
        execution.fail(error);
        execution
    }

    /// Applies a status transition if the machine allows it. Returns whether
    /// the transition happened; terminal states silently reject everything.
    ///
    /// 如果状态机允许则应用状态转换。返回转换是否发生；
    /// 终态会静默拒绝一切转换。
    pub fn transition(&mut self, next: ExecutionStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        true
    }

    /// Enters `Running`, stamping the start time on the first attempt.
    pub fn mark_running(&mut self) -> bool {
        if self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
        self.transition(ExecutionStatus::Running)
    }

    pub fn mark_retrying(&mut self) -> bool {
        self.transition(ExecutionStatus::Retrying)
    }

    /// Moves to a terminal status and stamps the end time. The caller sets
    /// `duration` from its own monotonic clock.
    fn finish(&mut self, status: ExecutionStatus, error: Option<String>) -> bool {
        if !self.transition(status) {
            return false;
        }
        self.finished_at = Some(Utc::now());
        if error.is_some() {
            self.error_message = error;
        }
        true
    }

    pub fn pass(&mut self) -> bool {
        self.finish(ExecutionStatus::Passed, None)
    }

    pub fn fail(&mut self, error: impl Into<String>) -> bool {
        self.finish(ExecutionStatus::Failed, Some(error.into()))
    }

    pub fn cancel(&mut self, reason: impl Into<String>) -> bool {
        self.finish(ExecutionStatus::Cancelled, Some(reason.into()))
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// A pass that needed at least one retry; this is what "flaky in this
    /// run" means for the analyzer and the flakiness score.
    pub fn passed_after_retry(&self) -> bool {
        self.status == ExecutionStatus::Passed && self.retry_attempt > 0
    }
}

/// What the test-runner collaborator reports back for one invocation.
/// An `Err` from the collaborator itself is a transport failure and is
/// handled separately from this record.
///
/// 测试运行器协作方对一次调用的返回结果。
/// 协作方自身返回的 `Err` 属于传输层失败，与此记录分开处理。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerOutput {
    pub success: bool,
    pub return_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub error_message: Option<String>,
}

impl RunnerOutput {
    /// Best available error description for retry classification and
    /// fingerprinting.
    pub fn error_detail(&self) -> String {
        if let Some(message) = &self.error_message {
            if !message.trim().is_empty() {
                return message.clone();
            }
        }
        if !self.stderr.trim().is_empty() {
            return self.stderr.clone();
        }
        match self.return_code {
            Some(code) => format!("runner exited with status {}", code),
            None => "runner terminated without a status".to_string(),
        }
    }
}
