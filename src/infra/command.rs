//! # Process Runner Module / 进程运行器模块
//!
//! The default test-runner collaborator: it resolves a test case's
//! framework to a configured command line, spawns it with the execution
//! context in the environment, and captures both output streams. A spawn
//! or wait failure surfaces as a transport error, which the executor
//! treats as terminal without retry.
//!
//! 默认的测试运行器协作方：将测试用例的框架解析为配置的命令行，
//! 带着执行上下文环境变量派生进程，并捕获两个输出流。
//! 派生或等待失败会作为传输层错误上浮，执行器将其视为终态且不重试。

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use uuid::Uuid;

use crate::core::config::FrameworkConfig;
use crate::core::execution::TestRunner;
use crate::core::models::{RunnerOutput, TestCase};

/// Spawns the configured framework command for each attempt.
/// 为每次尝试派生配置的框架命令。
pub struct ProcessRunner {
    frameworks: BTreeMap<String, FrameworkConfig>,
    working_dir: PathBuf,
}

impl ProcessRunner {
    pub fn new(frameworks: BTreeMap<String, FrameworkConfig>, working_dir: PathBuf) -> Self {
        Self {
            frameworks,
            working_dir,
        }
    }

    /// Builds the command for a case: the framework's command line with the
    /// test file reference appended, after shell-style expansion.
    fn build_command(
        &self,
        case: &TestCase,
        environment: &str,
        execution_id: Uuid,
    ) -> Result<tokio::process::Command> {
        let framework = self.frameworks.get(&case.framework).ok_or_else(|| {
            anyhow!(
                "no command configured for framework '{}' (test '{}')",
                case.framework,
                case.id
            )
        })?;

        let expanded = shellexpand::full(&framework.command)
            .with_context(|| format!("failed to expand command: {}", framework.command))?
            .to_string();

        let mut parts = shlex::split(&expanded)
            .ok_or_else(|| anyhow!("failed to parse command: {}", expanded))?;
        if parts.is_empty() {
            bail!("empty runner command for framework '{}'", case.framework);
        }

        let program = parts.remove(0);
        let mut cmd = tokio::process::Command::new(program);
        cmd.args(&parts)
            .arg(&case.file)
            .env("TEST_ENV", environment)
            .env("EXECUTION_ID", execution_id.to_string())
            .env("TEST_CASE_ID", &case.id)
            .kill_on_drop(true)
            .current_dir(&self.working_dir);
        Ok(cmd)
    }
}

#[async_trait]
impl TestRunner for ProcessRunner {
    async fn invoke(
        &self,
        case: &TestCase,
        environment: &str,
        execution_id: Uuid,
    ) -> Result<RunnerOutput> {
        let cmd = self.build_command(case, environment, execution_id)?;
        let (status, stdout, stderr) = spawn_and_capture(cmd).await?;

        let success = status.success();
        let error_message = if success || stderr.trim().is_empty() {
            None
        } else {
            Some(stderr.trim().to_string())
        };

        Ok(RunnerOutput {
            success,
            return_code: status.code(),
            stdout,
            stderr,
            error_message,
        })
    }
}

/// Spawns a command and captures stdout and stderr concurrently, each into
/// its own buffer, while waiting for the process to exit.
///
/// 派生一个命令，并在等待进程退出的同时并发地捕获 stdout 和 stderr，
/// 各自写入独立的缓冲区。
pub async fn spawn_and_capture(
    mut cmd: tokio::process::Command,
) -> Result<(ExitStatus, String, String)> {
    let mut child = cmd
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .context("failed to spawn runner process")?;

    let stdout = child
        .stdout
        .take()
        .context("failed to capture runner stdout")?;
    let stderr = child
        .stderr
        .take()
        .context("failed to capture runner stderr")?;

    // Both streams are drained concurrently so a chatty process cannot
    // dead-lock on a full pipe.
    // 两个流被并发读空，避免输出量大的进程因管道写满而死锁。
    let stdout_handle = tokio::spawn(read_to_string(stdout));
    let stderr_handle = tokio::spawn(read_to_string(stderr));

    let status = child
        .wait()
        .await
        .context("failed to wait for runner process")?;

    let stdout = stdout_handle.await.unwrap_or_default();
    let stderr = stderr_handle.await.unwrap_or_default();

    Ok((status, stdout, stderr))
}

async fn read_to_string<R>(reader: R) -> String
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut collected = String::new();
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        collected.push_str(&line);
        collected.push('\n');
    }
    collected
}
