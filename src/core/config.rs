//! # Configuration Module / 配置模块
//!
//! The TOML configuration is the engine's discovery boundary: the
//! `[[cases]]` records are the already-validated output of whatever
//! metadata-extraction step produced them, and the `[[suites]]` records
//! name the runnable collections. Everything is validated on load so that
//! configuration failures surface before a single execution starts.
//!
//! TOML 配置是引擎的发现边界：`[[cases]]` 记录是元数据提取步骤
//! 产出的已验证结果，`[[suites]]` 记录命名了可运行的集合。
//! 所有内容在加载时验证，使配置错误在任何执行开始之前就暴露出来。

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::models::{TestCase, TestSuite};
use crate::core::retry::RetryConfig;
use crate::infra::t;

/// Default configuration file name in the working directory.
/// 工作目录中的默认配置文件名。
pub const DEFAULT_CONFIG_FILE: &str = "TestSuites.toml";

fn default_language() -> String {
    "en".to_string()
}

fn default_supervisor_poll_secs() -> u64 {
    60
}

fn default_history_dir() -> PathBuf {
    PathBuf::from("data/test_history")
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("reports")
}

fn default_parallel_execution() -> bool {
    true
}

fn default_max_concurrency() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    1800
}

fn default_environments() -> Vec<String> {
    vec!["staging".to_string()]
}

/// Engine-level execution options, independent of any one suite.
/// 引擎级执行选项，与具体套件无关。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Sweep interval of the timeout supervisor, in seconds.
    /// 超时监督器的扫描间隔，单位秒。
    #[serde(default = "default_supervisor_poll_secs")]
    pub supervisor_poll_secs: u64,
    /// Where per-test statistics are persisted across runs.
    /// 跨运行持久化单测试统计信息的位置。
    #[serde(default = "default_history_dir")]
    pub history_dir: PathBuf,
    /// Where execution reports are written.
    /// 执行报告的写入位置。
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            supervisor_poll_secs: default_supervisor_poll_secs(),
            history_dir: default_history_dir(),
            reports_dir: default_reports_dir(),
        }
    }
}

/// How to invoke the external runner for one framework tag.
/// 如何为一个框架标签调用外部运行器。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameworkConfig {
    /// Command line prefix; the test file reference is appended to it.
    /// 命令行前缀；测试文件引用会被追加到其后。
    pub command: String,
}

/// One `[[suites]]` record as written in the configuration file.
/// 配置文件中的一条 `[[suites]]` 记录。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Member test-case ids, in declaration order.
    /// 成员测试用例 id，按声明顺序。
    pub cases: Vec<String>,
    #[serde(default = "default_parallel_execution")]
    pub parallel_execution: bool,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_environments")]
    pub environments: Vec<String>,
}

impl SuiteConfig {
    pub fn to_suite(&self) -> TestSuite {
        TestSuite {
            name: self.name.clone(),
            description: self.description.clone(),
            case_ids: self.cases.clone(),
            parallel_execution: self.parallel_execution,
            max_concurrency: self.max_concurrency,
            timeout: Duration::from_secs(self.timeout_secs),
            environments: self.environments.clone(),
        }
    }
}

/// The whole configuration file.
/// 整个配置文件。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// The language for the runner's output messages (e.g. "en", "zh-CN").
    /// 运行器输出消息的语言（例如 "en"、"zh-CN"）。
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub frameworks: BTreeMap<String, FrameworkConfig>,
    #[serde(default)]
    pub cases: Vec<TestCase>,
    #[serde(default)]
    pub suites: Vec<SuiteConfig>,
}

impl RunnerConfig {
    /// Looks a suite up by name; unknown suites are a configuration error.
    pub fn find_suite(&self, name: &str) -> Result<&SuiteConfig> {
        match self.suites.iter().find(|suite| suite.name == name) {
            Some(suite) => Ok(suite),
            None => {
                let known: Vec<&str> = self.suites.iter().map(|s| s.name.as_str()).collect();
                bail!(t!(
                    "config_unknown_suite",
                    name = name,
                    known = known.join(", ")
                ));
            }
        }
    }

    /// Resolves the environment a suite should run against. An explicit
    /// request must be one of the suite's declared environments; without a
    /// request, the suite's first environment wins.
    ///
    /// 解析套件运行的目标环境。显式请求必须是套件声明的环境之一；
    /// 没有请求时使用套件的第一个环境。
    pub fn resolve_environment(suite: &SuiteConfig, requested: Option<&str>) -> Result<String> {
        match requested {
            Some(environment) => {
                if suite.environments.iter().any(|e| e == environment) {
                    Ok(environment.to_string())
                } else {
                    bail!(t!(
                        "config_unknown_environment",
                        environment = environment,
                        suite = suite.name,
                        known = suite.environments.join(", ")
                    ));
                }
            }
            None => match suite.environments.first() {
                Some(environment) => Ok(environment.clone()),
                None => bail!(t!("config_no_environments", suite = suite.name)),
            },
        }
    }

    /// Structural validation beyond what serde enforces. Every violation is
    /// a configuration failure that stops the run before it starts.
    /// serde 之外的结构性验证。任何违规都是在运行开始前
    /// 就终止运行的配置错误。
    pub fn validate(&self) -> Result<()> {
        let mut case_ids = HashSet::new();
        for case in &self.cases {
            if case.id.trim().is_empty() {
                bail!(t!("config_empty_case_id", name = case.name));
            }
            if !case_ids.insert(case.id.as_str()) {
                bail!(t!("config_duplicate_case", id = case.id));
            }
            if !self.frameworks.contains_key(&case.framework) {
                bail!(t!(
                    "config_unknown_framework",
                    id = case.id,
                    framework = case.framework
                ));
            }
        }

        let mut suite_names = HashSet::new();
        for suite in &self.suites {
            if !suite_names.insert(suite.name.as_str()) {
                bail!(t!("config_duplicate_suite", name = suite.name));
            }
            if suite.cases.is_empty() {
                bail!(t!("config_empty_suite", name = suite.name));
            }
            if suite.max_concurrency == 0 {
                bail!(t!("config_zero_concurrency", name = suite.name));
            }
            if suite.timeout_secs == 0 {
                bail!(t!("config_zero_timeout", name = suite.name));
            }
            if suite.environments.is_empty() {
                bail!(t!("config_no_environments", suite = suite.name));
            }
            for case_id in &suite.cases {
                if !case_ids.contains(case_id.as_str()) {
                    bail!(t!(
                        "config_unknown_case",
                        suite = suite.name,
                        id = case_id
                    ));
                }
            }
        }

        if self.execution.supervisor_poll_secs == 0 {
            bail!(t!("config_zero_poll_interval"));
        }

        Ok(())
    }
}

/// Reads and validates a configuration file.
pub fn load_config(path: &Path) -> Result<RunnerConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| t!("config_read_failed", path = path.display()))?;
    let config: RunnerConfig =
        toml::from_str(&content).with_context(|| t!("config_parse_failed", path = path.display()))?;
    config.validate()?;
    Ok(config)
}
