//! # Configuration Initialization Module / 配置初始化模块
//!
//! Implements the `init` command: an interactive wizard (with a
//! `--non-interactive` escape hatch) that writes a starter
//! `TestSuites.toml` with example frameworks, cases and one suite.
//!
//! 实现 `init` 命令：一个交互式向导（带 `--non-interactive` 逃生口），
//! 写出包含示例框架、用例和一个套件的初始 `TestSuites.toml`。

use anyhow::{Context, Result};
use colored::*;
use dialoguer::{Confirm, Input, theme::ColorfulTheme};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::core::config::{
    DEFAULT_CONFIG_FILE, ExecutionConfig, FrameworkConfig, RunnerConfig, SuiteConfig,
};
use crate::core::models::{TestCase, TestPriority};
use crate::core::retry::RetryConfig;
use crate::infra::t;

/// Runs the wizard (or the non-interactive default path) and writes the
/// configuration file.
///
/// 运行向导（或非交互默认路径）并写出配置文件。
pub fn run_init_wizard(language: &str, non_interactive: bool) -> Result<()> {
    let config_path = Path::new(DEFAULT_CONFIG_FILE);
    let theme = ColorfulTheme::default();

    if !non_interactive {
        println!(
            "\n{}",
            t!("init_wizard_welcome", locale = language).cyan().bold()
        );
        println!("{}", t!("init_wizard_description", locale = language));
    }

    if config_path.exists() && !non_interactive {
        let confirmation = Confirm::with_theme(&theme)
            .with_prompt(
                t!(
                    "init_overwrite_prompt",
                    locale = language,
                    path = config_path.display()
                )
                .to_string(),
            )
            .default(false)
            .interact()
            .context(t!("init_prompt_failed", locale = language).to_string())?;
        if !confirmation {
            println!("{}", t!("init_aborted", locale = language));
            return Ok(());
        }
    }

    let config = if non_interactive {
        starter_config(language, "smoke", suggested_concurrency(), true)
    } else {
        let suite_name: String = Input::with_theme(&theme)
            .with_prompt(t!("init_suite_name_prompt", locale = language).to_string())
            .default("smoke".to_string())
            .interact_text()
            .context(t!("init_prompt_failed", locale = language).to_string())?;

        let max_concurrency: usize = Input::with_theme(&theme)
            .with_prompt(t!("init_concurrency_prompt", locale = language).to_string())
            .default(suggested_concurrency())
            .interact_text()
            .context(t!("init_prompt_failed", locale = language).to_string())?;

        let parallel = Confirm::with_theme(&theme)
            .with_prompt(t!("init_parallel_prompt", locale = language).to_string())
            .default(true)
            .interact()
            .context(t!("init_prompt_failed", locale = language).to_string())?;

        starter_config(language, &suite_name, max_concurrency.max(1), parallel)
    };

    let rendered =
        toml::to_string_pretty(&config).context("failed to serialize starter configuration")?;
    fs::write(config_path, rendered).with_context(|| {
        t!(
            "init_write_failed",
            locale = language,
            path = config_path.display()
        )
        .to_string()
    })?;

    println!(
        "{}",
        t!(
            "init_config_written",
            locale = language,
            path = config_path.display()
        )
        .green()
    );
    Ok(())
}

/// One worker per two cores plus one, the same heuristic the runner uses
/// for its own defaults.
fn suggested_concurrency() -> usize {
    num_cpus::get() / 2 + 1
}

/// A small but runnable-looking starter configuration: two example cases
/// across two frameworks and a single suite referencing both.
/// 一个小而像样的初始配置：跨两个框架的两个示例用例和引用它们的单个套件。
fn starter_config(
    language: &str,
    suite_name: &str,
    max_concurrency: usize,
    parallel_execution: bool,
) -> RunnerConfig {
    let mut frameworks = BTreeMap::new();
    frameworks.insert(
        "playwright".to_string(),
        FrameworkConfig {
            command: "npx playwright test".to_string(),
        },
    );
    frameworks.insert(
        "wdio".to_string(),
        FrameworkConfig {
            command: "npx wdio run".to_string(),
        },
    );

    let cases = vec![
        example_case(
            "login-smoke",
            "Login smoke test",
            "tests/login.spec.ts",
            "playwright",
            &["smoke"],
            TestPriority::High,
            45,
        ),
        example_case(
            "checkout-regression",
            "Checkout regression",
            "tests/checkout.spec.ts",
            "wdio",
            &["regression"],
            TestPriority::Medium,
            120,
        ),
    ];

    RunnerConfig {
        language: language.to_string(),
        execution: ExecutionConfig::default(),
        retry: RetryConfig::default(),
        frameworks,
        cases,
        suites: vec![SuiteConfig {
            name: suite_name.to_string(),
            description: "Starter suite generated by suite-runner init".to_string(),
            cases: vec!["login-smoke".to_string(), "checkout-regression".to_string()],
            parallel_execution,
            max_concurrency,
            timeout_secs: 1800,
            environments: vec!["staging".to_string()],
        }],
    }
}

fn example_case(
    id: &str,
    name: &str,
    file: &str,
    framework: &str,
    tags: &[&str],
    priority: TestPriority,
    estimated_secs: u64,
) -> TestCase {
    TestCase {
        id: id.to_string(),
        name: name.to_string(),
        file: file.to_string(),
        framework: framework.to_string(),
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
        priority,
        estimated_secs,
        max_retries: 2,
        environments: vec!["staging".to_string()],
        dependencies: Vec::new(),
        avg_duration_secs: 0.0,
        success_rate: 1.0,
        flakiness: 0.0,
        failure_fingerprints: Vec::new(),
        last_execution: None,
    }
}
