//! # Prioritizer Module / 优先级排序模块
//!
//! Turns a filtered set of test cases into a total execution order. The
//! default ordering is rule-based and deterministic; an external scorer can
//! propose its own order, and the engine repairs whatever the scorer leaves
//! out so no test is ever silently dropped.
//!
//! 将过滤后的测试用例集合转换为一个全序执行顺序。
//! 默认排序是确定性的规则排序；外部评分器可以提出自己的顺序，
//! 引擎会补全评分器遗漏的部分，确保没有任何测试被静默丢弃。

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use colored::*;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::core::models::{TestCase, TestPriority};
use crate::infra::t;

/// Conjunctive selection criteria applied before prioritization.
/// Applying the same filter twice yields the same set as applying it once.
///
/// 在优先级排序之前应用的合取筛选条件。
/// 对同一集合应用两次与应用一次的结果相同。
#[derive(Debug, Clone, Default)]
pub struct TestFilter {
    /// Keep cases whose tag set intersects this set (ignored when empty).
    /// 保留标签集合与此集合有交集的用例（为空时忽略）。
    pub tags: Vec<String>,
    /// Keep cases with priority rank at or above this threshold.
    /// 保留优先级等级不低于此阈值的用例。
    pub min_priority: Option<TestPriority>,
    /// Keep cases whose declared estimate does not exceed this bound.
    /// 保留声明估计时长不超过此上限的用例。
    pub max_duration_secs: Option<u64>,
}

impl TestFilter {
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.min_priority.is_none() && self.max_duration_secs.is_none()
    }

    pub fn matches(&self, case: &TestCase) -> bool {
        if !self.tags.is_empty() && !case.tags.iter().any(|tag| self.tags.contains(tag)) {
            return false;
        }
        if let Some(min_priority) = self.min_priority {
            if case.priority.rank() < min_priority.rank() {
                return false;
            }
        }
        if let Some(max_duration) = self.max_duration_secs {
            if case.estimated_secs > max_duration {
                return false;
            }
        }
        true
    }

    pub fn apply(&self, cases: Vec<TestCase>) -> Vec<TestCase> {
        cases.into_iter().filter(|case| self.matches(case)).collect()
    }
}

/// The statistics slice an external prioritization scorer gets to see.
/// 外部优先级评分器可见的统计信息切片。
#[derive(Debug, Clone, Serialize)]
pub struct TestSnapshot {
    pub name: String,
    pub priority: TestPriority,
    pub flakiness: f64,
    pub success_rate: f64,
    pub avg_duration_secs: f64,
    pub last_execution: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
}

impl From<&TestCase> for TestSnapshot {
    fn from(case: &TestCase) -> Self {
        Self {
            name: case.name.clone(),
            priority: case.priority,
            flakiness: case.flakiness,
            success_rate: case.success_rate,
            avg_duration_secs: case.avg_duration_secs,
            last_execution: case.last_execution,
            tags: case.tags.clone(),
        }
    }
}

/// An external ordering collaborator. It may return any subset or superset
/// of the offered names in its preferred order; the engine tolerates both.
///
/// 外部排序协作方。它可以以任意顺序返回所提供名称的子集或超集；
/// 引擎对两者都能容忍。
#[async_trait]
pub trait PrioritizationScorer: Send + Sync {
    async fn score(&self, tests: &[TestSnapshot]) -> Result<Vec<String>>;
}

/// The deterministic rule-based order: declared priority first, then the
/// least flaky, then the fastest. Cheap, fast, stable tests run first so
/// failures surface early.
///
/// 确定性的规则排序：先按声明优先级，再按最不稳定程度，最后按速度。
/// 便宜、快速、稳定的测试先运行，让失败尽早暴露。
pub fn default_order(mut cases: Vec<TestCase>) -> Vec<TestCase> {
    cases.sort_by(|a, b| {
        b.priority
            .rank()
            .cmp(&a.priority.rank())
            .then_with(|| {
                a.flakiness
                    .partial_cmp(&b.flakiness)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| {
                a.expected_duration_secs()
                    .partial_cmp(&b.expected_duration_secs())
                    .unwrap_or(Ordering::Equal)
            })
            // Stable last resort so full ties still order deterministically.
            .then_with(|| a.name.cmp(&b.name))
    });
    cases
}

/// Orders the given cases for execution. Without a scorer this is the
/// rule-based default; with one, the scorer's permutation is honored and
/// anything it omitted is appended afterwards in default order. A scorer
/// error falls back to the default order.
///
/// 为执行排序给定的用例。没有评分器时使用规则默认排序；
/// 有评分器时遵循其排列，遗漏的用例按默认顺序追加在后。
/// 评分器出错时回退到默认排序。
pub async fn prioritize(
    cases: Vec<TestCase>,
    scorer: Option<&dyn PrioritizationScorer>,
) -> Vec<TestCase> {
    let Some(scorer) = scorer else {
        return default_order(cases);
    };

    let snapshots: Vec<TestSnapshot> = cases.iter().map(TestSnapshot::from).collect();
    match scorer.score(&snapshots).await {
        Ok(proposed) => merge_scored_order(cases, &proposed),
        Err(error) => {
            println!(
                "{}",
                t!("prioritizer_scorer_failed", error = error).yellow()
            );
            default_order(cases)
        }
    }
}

/// Applies a proposed name order, ignoring names the engine never offered
/// and appending the cases the scorer left out.
fn merge_scored_order(cases: Vec<TestCase>, proposed: &[String]) -> Vec<TestCase> {
    let mut by_name: HashMap<String, TestCase> = cases
        .into_iter()
        .map(|case| (case.name.clone(), case))
        .collect();

    let mut ordered = Vec::with_capacity(by_name.len());
    for name in proposed {
        if let Some(case) = by_name.remove(name) {
            ordered.push(case);
        }
    }

    // Whatever the scorer omitted still has to run; it goes last, in
    // default order.
    ordered.extend(default_order(by_name.into_values().collect()));
    ordered
}
