//! # Statistics History Module / 统计历史模块
//!
//! Persists each test case's rolling statistics across runs as one small
//! JSON record per test id. The registry is seeded from here before a run
//! and flushed back here afterwards.
//!
//! 将每个测试用例的滚动统计信息以每个 id 一条小 JSON 记录的形式
//! 跨运行持久化。运行前从这里填充注册表，运行后再写回。

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use colored::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::models::TestCase;
use crate::infra::t;

/// The persisted slice of a test case: only the rolling statistics, never
/// the metadata (the configuration stays the source of truth for that).
///
/// 测试用例被持久化的切片：只有滚动统计信息，不含元数据
/// （元数据仍以配置为准）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestHistory {
    pub test_id: String,
    pub avg_duration_secs: f64,
    pub success_rate: f64,
    pub flakiness: f64,
    pub failure_fingerprints: Vec<String>,
    pub last_execution: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
}

impl From<&TestCase> for TestHistory {
    fn from(case: &TestCase) -> Self {
        Self {
            test_id: case.id.clone(),
            avg_duration_secs: case.avg_duration_secs,
            success_rate: case.success_rate,
            flakiness: case.flakiness,
            failure_fingerprints: case.failure_fingerprints.clone(),
            last_execution: case.last_execution,
            last_updated: Utc::now(),
        }
    }
}

/// File path for one test id's history record.
pub fn history_path(dir: &Path, test_id: &str) -> PathBuf {
    let sanitized: String = test_id
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    dir.join(format!("{}.json", sanitized))
}

/// Overlays a case's statistics from its history record, if one exists.
/// Returns whether anything was loaded.
/// 如果存在历史记录则覆盖用例的统计信息。返回是否加载了内容。
pub fn load_into_case(dir: &Path, case: &mut TestCase) -> Result<bool> {
    let path = history_path(dir, &case.id);
    if !path.exists() {
        return Ok(false);
    }

    let content = fs::read_to_string(&path)
        .with_context(|| format!("failed to read history file: {}", path.display()))?;
    let history: TestHistory = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse history file: {}", path.display()))?;

    case.avg_duration_secs = history.avg_duration_secs;
    case.success_rate = history.success_rate;
    case.flakiness = history.flakiness;
    case.failure_fingerprints = history.failure_fingerprints;
    case.last_execution = history.last_execution;
    Ok(true)
}

/// Seeds every case from the history directory. A corrupt record is
/// reported and skipped; it never blocks the run.
/// 从历史目录填充所有用例。损坏的记录会被报告并跳过，绝不会阻塞运行。
pub fn load_all(dir: &Path, cases: &mut [TestCase]) -> usize {
    let mut loaded = 0;
    for case in cases.iter_mut() {
        match load_into_case(dir, case) {
            Ok(true) => loaded += 1,
            Ok(false) => {}
            Err(error) => {
                println!(
                    "{}",
                    t!("history_load_failed", id = case.id, error = error).yellow()
                );
            }
        }
    }
    loaded
}

/// Writes one case's statistics back to its history record.
pub fn save_case(dir: &Path, case: &TestCase) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create history directory: {}", dir.display()))?;

    let history = TestHistory::from(case);
    let json = serde_json::to_string_pretty(&history)?;
    let path = history_path(dir, &case.id);
    fs::write(&path, json)
        .with_context(|| format!("failed to write history file: {}", path.display()))?;
    Ok(())
}

/// Flushes every case; returns how many records were written.
pub fn save_all(dir: &Path, cases: &[TestCase]) -> usize {
    let mut saved = 0;
    for case in cases {
        match save_case(dir, case) {
            Ok(()) => saved += 1,
            Err(error) => {
                println!(
                    "{}",
                    t!("history_save_failed", id = case.id, error = error).yellow()
                );
            }
        }
    }
    saved
}
