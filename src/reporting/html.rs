//! # HTML Reporting Module / HTML 报告模块
//!
//! Renders the execution report as a single self-contained HTML file:
//! summary tiles, a per-execution table and collapsible failure output.
//!
//! 将执行报告渲染为单个自包含的 HTML 文件：
//! 摘要卡片、逐执行表格和可折叠的失败输出。

use anyhow::{Context, Result};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::fs;
use std::path::Path;

use crate::core::models::{Execution, ExecutionStatus};
use crate::reporting::analyzer::ExecutionReport;

/// Embedded CSS styles for HTML reports / HTML 报告的嵌入式 CSS 样式
const REPORT_CSS: &str = r#"
body { font-family: -apple-system, 'Segoe UI', sans-serif; margin: 2rem auto; max-width: 960px; color: #1f2430; }
h1 { font-size: 1.4rem; }
.meta { color: #6b7280; font-size: 0.9rem; }
.summary-container { display: flex; gap: 1rem; margin: 1.5rem 0; }
.summary-item { flex: 1; border: 1px solid #e5e7eb; border-radius: 8px; padding: 0.8rem; text-align: center; }
.summary-item .count { display: block; font-size: 1.6rem; font-weight: 600; }
.summary-item .label { color: #6b7280; font-size: 0.8rem; text-transform: uppercase; }
.passed-text { color: #15803d; }
.failed-text { color: #b91c1c; }
.cancelled-text { color: #b45309; }
table { width: 100%; border-collapse: collapse; }
th, td { text-align: left; padding: 0.5rem 0.7rem; border-bottom: 1px solid #e5e7eb; }
.status-cell { display: inline-block; padding: 0.1rem 0.5rem; border-radius: 999px; font-size: 0.8rem; }
.status-passed { background: #dcfce7; color: #15803d; }
.status-failed { background: #fee2e2; color: #b91c1c; }
.status-cancelled { background: #fef3c7; color: #b45309; }
.duration-cell, .retries-cell { text-align: right; font-variant-numeric: tabular-nums; }
.output-toggle { color: #2563eb; cursor: pointer; font-size: 0.8rem; margin-top: 0.2rem; }
.output-content { background: #111827; color: #e5e7eb; padding: 0.8rem; border-radius: 6px; overflow-x: auto; font-size: 0.8rem; }
"#;

/// Embedded JavaScript for HTML report interactivity / HTML 报告交互性的嵌入式 JavaScript
const REPORT_JS: &str = r#"
function toggleOutput(id) {
  var row = document.getElementById(id);
  if (row) {
    row.style.display = row.style.display === 'none' ? 'table-row' : 'none';
  }
}
"#;

/// Renders and writes the HTML report.
/// 渲染并写入 HTML 报告。
pub fn generate_html_report(report: &ExecutionReport, output_path: &Path) -> Result<()> {
    let markup = render_report(report);
    fs::write(output_path, markup.into_string())
        .with_context(|| format!("failed to write HTML report: {}", output_path.display()))?;
    Ok(())
}

fn render_report(report: &ExecutionReport) -> Markup {
    let summary = &report.analysis.summary;
    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { "Execution report: " (report.suite_name) }
                style { (PreEscaped(REPORT_CSS)) }
            }
            body {
                h1 { "Execution report: " (report.suite_name) }
                p class="meta" {
                    "Environment: " (report.environment)
                    " | Started: " (report.started_at.format("%Y-%m-%d %H:%M:%S UTC"))
                    " | Wall clock: " (format!("{:.2}s", report.wall_clock_secs))
                }
                div class="summary-container" {
                    (summary_tile(summary.total, "Total", ""))
                    (summary_tile(summary.passed, "Passed", "passed-text"))
                    (summary_tile(summary.failed, "Failed", "failed-text"))
                    (summary_tile(summary.cancelled, "Cancelled", "cancelled-text"))
                }
                p class="meta" {
                    "Pass rate: " (format!("{:.1}%", summary.pass_rate * 100.0))
                    " | Parallel efficiency: "
                    (format!("{:.2}", report.analysis.performance.parallel_efficiency))
                    " | Flaky passes: " (report.analysis.quality.flaky_passes)
                }
                table {
                    thead {
                        tr {
                            th { "Test" }
                            th { "Status" }
                            th class="duration-cell" { "Duration" }
                            th class="retries-cell" { "Retries" }
                        }
                    }
                    tbody {
                        @for (index, execution) in report.executions.iter().enumerate() {
                            (execution_row(index, execution))
                        }
                    }
                }
                script { (PreEscaped(REPORT_JS)) }
            }
        }
    }
}

fn summary_tile(count: usize, label: &str, class: &str) -> Markup {
    html! {
        div class="summary-item" {
            span class={ "count " (class) } { (count) }
            span class="label" { (label) }
        }
    }
}

fn execution_row(index: usize, execution: &Execution) -> Markup {
    let status_class = format!("status-{}", execution.status);
    let output_id = format!("output-{}", index);
    let failed = execution.status == ExecutionStatus::Failed;
    html! {
        tr {
            td { (execution.test_name) }
            td {
                span class={ "status-cell " (status_class) } { (execution.status) }
                @if failed {
                    div class="output-toggle" onclick={ "toggleOutput('" (output_id) "')" } {
                        "show output"
                    }
                }
            }
            td class="duration-cell" { (format!("{:.2}s", execution.duration.as_secs_f64())) }
            td class="retries-cell" {
                @if execution.retry_attempt > 0 { (execution.retry_attempt) }
            }
        }
        @if failed {
            tr id=(output_id) style="display:none;" {
                td colspan="4" {
                    pre class="output-content" {
                        @if let Some(error) = &execution.error_message {
                            (error) "\n"
                        }
                        @for line in &execution.logs {
                            (line) "\n"
                        }
                    }
                }
            }
        }
    }
}
