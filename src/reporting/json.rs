//! # JSON Report Sink / JSON 报告输出
//!
//! Persists the report record as one timestamped JSON file per run under
//! the configured reports directory.
//!
//! 将报告记录以每次运行一个带时间戳的 JSON 文件的形式
//! 持久化到配置的报告目录下。

use anyhow::{Context, Result};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

use crate::reporting::analyzer::ExecutionReport;

/// Writes the report and returns the path of the written file.
/// 写入报告并返回写入文件的路径。
pub fn write_report(report: &ExecutionReport, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create reports directory: {}", dir.display()))?;

    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("{}_{}.json", report.suite_name, timestamp));

    let json = serde_json::to_string_pretty(report).context("failed to serialize report")?;
    fs::write(&path, json)
        .with_context(|| format!("failed to write report file: {}", path.display()))?;

    Ok(path)
}
