//! # Execution Planner Module / 执行计划模块
//!
//! Computes the bounded-parallelism plan for a run: how many workers the
//! admission gate admits, and what the run is expected to cost. Pure
//! function of its inputs; nothing here has side effects.
//!
//! 计算一次运行的有界并行计划：准入门限允许多少个工作单元，
//! 以及这次运行的预计成本。是输入的纯函数；此处没有任何副作用。

use std::time::Duration;

use crate::core::models::{ExecutionPlan, TestCase, TestSuite};

/// Builds the execution plan for an ordered selection of test cases.
///
/// The concurrency width is
/// `min(suite.max_concurrency, |cases|, max(1, ⌊Σ estimates / (timeout / 2)⌋))`:
/// never exceed the declared cap, never allocate more workers than tests,
/// and widen only when the serial estimate would overrun half the suite
/// timeout. A suite with parallel execution disabled is always planned at
/// width 1.
///
/// 为有序的测试用例选择构建执行计划。
///
/// 并发宽度为
/// `min(suite.max_concurrency, |cases|, max(1, ⌊Σ 估计 / (超时 / 2)⌋))`：
/// 不超过声明的上限，不分配多于测试数量的工作单元，
/// 只有当串行估计会超过套件超时的一半时才拓宽。
/// 禁用并行执行的套件始终按宽度 1 规划。
pub fn plan_execution(suite: &TestSuite, cases: &[TestCase], environment: &str) -> ExecutionPlan {
    let serial_estimate_secs: f64 = cases
        .iter()
        .map(|case| case.expected_duration_secs())
        .sum();

    let concurrency = if suite.parallel_execution {
        let half_timeout_secs = suite.timeout.as_secs_f64() / 2.0;
        let widening = if half_timeout_secs > 0.0 {
            (serial_estimate_secs / half_timeout_secs).floor() as usize
        } else {
            0
        };
        suite
            .max_concurrency
            .min(cases.len())
            .min(widening.max(1))
            .max(1)
    } else {
        1
    };

    let estimated_total = Duration::from_secs_f64(serial_estimate_secs / concurrency as f64);

    ExecutionPlan {
        suite_name: suite.name.clone(),
        environment: environment.to_string(),
        case_ids: cases.iter().map(|case| case.id.clone()).collect(),
        concurrency,
        estimated_total,
    }
}
