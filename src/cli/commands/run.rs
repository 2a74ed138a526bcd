//! # Run Command Module / 运行命令模块
//!
//! Implements the `run` command: load and validate the configuration, seed
//! the registry from history, select and prioritize the suite's cases,
//! plan the run, execute it under the timeout supervisor, persist the
//! statistics and render the report. The exit status reflects whether any
//! execution ended `Failed`.
//!
//! 实现 `run` 命令：加载并验证配置，从历史填充注册表，
//! 选择并排序套件的用例，制定计划，在超时监督器下执行，
//! 持久化统计信息并渲染报告。退出状态反映是否有执行以 `Failed` 结束。

use anyhow::{Result, anyhow, bail};
use chrono::Utc;
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        config::{self, RunnerConfig},
        execution::Executor,
        models::TestPriority,
        planner,
        prioritizer::{self, TestFilter},
        registry::TestCaseRegistry,
        retry::RetryPolicy,
        supervisor::TimeoutSupervisor,
    },
    infra::{command::ProcessRunner, history, t},
    reporting::{
        analyzer::build_report,
        console::{print_failure_details, print_summary},
        html::generate_html_report,
        json,
    },
};

/// Executes the run command with the provided arguments.
///
/// # Arguments
/// * `suite_name` - Name of the suite to execute
/// * `environment` - Target environment (defaults to the suite's first)
/// * `tags` - Tag filter; kept cases must share at least one tag
/// * `priority` - Minimum priority filter
/// * `max_duration` - Maximum estimated duration filter, in seconds
/// * `config_path` - Path to the configuration file
/// * `write_json` - Whether to persist a JSON report
/// * `html` - Optional path for HTML report output
#[allow(clippy::too_many_arguments)]
pub async fn execute(
    suite_name: String,
    environment: Option<String>,
    tags: Vec<String>,
    priority: Option<String>,
    max_duration: Option<u64>,
    config_path: PathBuf,
    write_json: bool,
    html: Option<PathBuf>,
) -> Result<()> {
    let config = config::load_config(&config_path)?;
    rust_i18n::set_locale(&config.language);

    println!(
        "{}",
        t!("run_loading_config", path = config_path.display())
    );

    let suite_config = config.find_suite(&suite_name)?;
    let suite = suite_config.to_suite();
    let environment = RunnerConfig::resolve_environment(suite_config, environment.as_deref())?;

    println!(
        "{}",
        t!(
            "run_suite_header",
            suite = suite.name.yellow(),
            environment = environment.cyan()
        )
    );

    // Seed the registry: configuration metadata overlaid with the rolling
    // statistics persisted by earlier runs.
    let mut cases = config.cases.clone();
    let loaded = history::load_all(&config.execution.history_dir, &mut cases);
    if loaded > 0 {
        println!("{}", t!("run_history_loaded", count = loaded).cyan());
    }
    let registry = Arc::new(TestCaseRegistry::from_cases(cases));

    // Selection: suite membership, then the conjunctive filters.
    let members = registry.select(&suite.case_ids);
    let filter = build_filter(tags, priority, max_duration)?;
    let filtered = filter.apply(members);
    if filtered.is_empty() {
        bail!(t!("run_no_tests_match", suite = suite.name));
    }

    // Ordering is rule-based here; an external scorer plugs in through the
    // library API without touching this flow.
    let ordered = prioritizer::prioritize(filtered, None).await;

    let plan = planner::plan_execution(&suite, &ordered, &environment);
    println!(
        "{}",
        t!(
            "run_plan",
            count = plan.case_ids.len(),
            width = plan.concurrency,
            estimate = format!("{:.0}", plan.estimated_total.as_secs_f64())
        )
        .bold()
    );

    let runner = Arc::new(ProcessRunner::new(
        config.frameworks.clone(),
        std::env::current_dir()?,
    ));
    let retry_policy = RetryPolicy::new(config.retry.clone());
    let executor = Executor::new(Arc::clone(&registry), runner, retry_policy);

    setup_signal_handler(executor.cancel_token());

    let supervisor = TimeoutSupervisor::new(
        executor.in_flight(),
        suite.timeout,
        Duration::from_secs(config.execution.supervisor_poll_secs),
    );
    let supervisor_shutdown = CancellationToken::new();
    let supervisor_handle = supervisor.spawn(supervisor_shutdown.clone());

    let started_at = Utc::now();
    let completed = executor.run(&plan).await;

    supervisor_shutdown.cancel();
    let _ = supervisor_handle.await;

    let saved = history::save_all(&config.execution.history_dir, &registry.snapshot());
    if saved > 0 {
        println!("{}", t!("run_history_saved", count = saved).cyan());
    }

    let report = build_report(
        &suite.name,
        &environment,
        started_at,
        completed.executions,
        completed.wall_clock,
    );

    print_summary(&report);
    print_failure_details(&report);

    if write_json {
        match json::write_report(&report, &config.execution.reports_dir) {
            Ok(path) => println!("{}", t!("run_report_saved", path = path.display())),
            Err(error) => eprintln!("{} {}", t!("run_report_failed").red(), error),
        }
    }
    if let Some(html_path) = &html {
        match generate_html_report(&report, html_path) {
            Ok(()) => println!("{}", t!("run_html_saved", path = html_path.display())),
            Err(error) => eprintln!("{} {}", t!("run_html_failed").red(), error),
        }
    }

    if report.analysis.summary.failed > 0 {
        bail!(t!("run_suite_failed", failed = report.analysis.summary.failed));
    }
    println!("\n{}", t!("run_all_passed").green().bold());
    Ok(())
}

/// Builds the conjunctive test filter from the CLI flags. An unknown
/// priority name is a configuration failure.
fn build_filter(
    tags: Vec<String>,
    priority: Option<String>,
    max_duration: Option<u64>,
) -> Result<TestFilter> {
    let min_priority = match priority {
        Some(raw) => Some(
            TestPriority::parse(&raw)
                .ok_or_else(|| anyhow!(t!("run_invalid_priority", value = raw)))?,
        ),
        None => None,
    };
    Ok(TestFilter {
        tags,
        min_priority,
        max_duration_secs: max_duration,
    })
}

/// Sets up a signal handler for graceful shutdown: the first Ctrl-C cancels
/// the whole run.
fn setup_signal_handler(token: CancellationToken) {
    tokio::spawn(async move {
        signal::ctrl_c().await.expect("Failed to listen for Ctrl-C");
        println!("\n{}", t!("run_shutdown_signal").yellow());
        token.cancel();
    });
}
