//! # Console Reporting Module / 控制台报告模块
//!
//! Renders the execution report in the terminal: a colored per-test table,
//! an analysis footer and detail blocks for every failure.
//!
//! 在终端渲染执行报告：彩色的逐测试表格、分析摘要脚注，
//! 以及每个失败的详情块。

use colored::*;

use crate::core::models::{Execution, ExecutionStatus};
use crate::infra::t;
use crate::reporting::analyzer::ExecutionReport;

/// Prints the per-test summary table and the analysis footer.
///
/// 打印逐测试摘要表格和分析脚注。
///
/// # Output Format / 输出格式
/// ```text
/// --- Execution Summary ---
///   - passed     | login-smoke                              |      1.24s
///   - failed     | checkout-flow                            |      8.02s  (2 retries)
///   - cancelled  | profile-edit                             |      0.00s
/// ```
pub fn print_summary(report: &ExecutionReport) {
    println!("\n{}", t!("report_summary_banner").bold());

    for execution in &report.executions {
        let status_colored = match execution.status {
            ExecutionStatus::Passed => execution.status.to_string().green(),
            ExecutionStatus::Failed => execution.status.to_string().red(),
            ExecutionStatus::Cancelled => execution.status.to_string().yellow(),
            _ => execution.status.to_string().dimmed(),
        };
        let retries_str = if execution.retry_attempt > 0 {
            format!(" ({} retries)", execution.retry_attempt)
        } else {
            String::new()
        };
        println!(
            "  - {:<10} | {:<40} | {:>9.2}s {}",
            status_colored,
            execution.test_name,
            execution.duration.as_secs_f64(),
            retries_str
        );
    }

    let summary = &report.analysis.summary;
    let performance = &report.analysis.performance;
    let quality = &report.analysis.quality;

    println!(
        "\n{}",
        t!(
            "report_totals",
            total = summary.total,
            passed = summary.passed,
            failed = summary.failed,
            cancelled = summary.cancelled
        )
    );
    println!(
        "{}",
        t!(
            "report_pass_rate",
            rate = format!("{:.1}", summary.pass_rate * 100.0)
        )
    );
    println!(
        "{}",
        t!(
            "report_durations",
            total = format!("{:.2}", summary.total_duration_secs),
            avg = format!("{:.2}", summary.avg_duration_secs),
            wall = format!("{:.2}", report.wall_clock_secs)
        )
    );
    println!(
        "{}",
        t!(
            "report_efficiency",
            efficiency = format!("{:.2}", performance.parallel_efficiency)
        )
    );
    if quality.retried > 0 {
        println!(
            "{}",
            t!(
                "report_flaky",
                flaky = quality.flaky_passes,
                retried = quality.retried
            )
            .yellow()
        );
    }
    if !quality.top_failure_fingerprints.is_empty() {
        println!("{}", t!("report_fingerprint_banner"));
        for bucket in &quality.top_failure_fingerprints {
            println!("  {:>3}x {}", bucket.count, bucket.fingerprint);
        }
    }
}

/// Prints the full detail block for every failed execution: the stored
/// error plus the captured runner output.
/// 为每个失败的执行打印完整详情块：存储的错误和捕获的运行器输出。
pub fn print_failure_details(report: &ExecutionReport) {
    let failures: Vec<&Execution> = report
        .executions
        .iter()
        .filter(|execution| execution.status == ExecutionStatus::Failed)
        .collect();
    if failures.is_empty() {
        return;
    }

    println!("\n{}", t!("report_failure_banner").red().bold());
    println!("{}", "-".repeat(80));

    for (index, execution) in failures.iter().enumerate() {
        println!(
            "[{}/{}] {} '{}'",
            index + 1,
            failures.len(),
            t!("report_failure_header").red(),
            execution.test_name.cyan()
        );
        if let Some(error) = &execution.error_message {
            println!("\n  {}", error);
        }
        if !execution.logs.is_empty() {
            println!("\n--- {} ---", t!("report_runner_output").yellow());
            for line in &execution.logs {
                println!("{}", line);
            }
        }
        println!("\n{}", "-".repeat(80));
    }
}
