//! # Retry Policy Module / 重试策略模块
//!
//! Decides whether a failed execution deserves another attempt and how long
//! to wait before it. The rule-based classifier is the deterministic
//! default; an external decision scorer may override it, gated by a
//! confidence threshold and always capped by the test's retry budget.
//!
//! 判定失败的执行是否值得再次尝试，以及尝试前等待多久。
//! 基于规则的分类器是确定性的默认实现；
//! 外部决策评分器可以覆盖它，但受置信度阈值约束，
//! 并且始终受测试重试预算的限制。

use anyhow::Result;
use async_trait::async_trait;
use colored::*;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::core::models::TestCase;
use crate::infra::t;

/// An external verdict below or at this confidence is treated as
/// "do not retry", whatever its boolean says.
/// 置信度不高于此值的外部裁定一律视为“不重试”，无论其布尔值如何。
pub const CONFIDENCE_THRESHOLD: f64 = 0.6;

/// Symmetric jitter applied to the computed delay, as a fraction of it.
/// 应用于计算延迟的对称抖动，以延迟的比例表示。
pub const JITTER_FRACTION: f64 = 0.1;

/// Without a pattern match, only tests this stable get the benefit of the
/// doubt (the failure is assumed environmental).
const FLAKINESS_CUTOFF: f64 = 0.3;

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_exponential_backoff() -> bool {
    true
}

fn default_retry_patterns() -> Vec<String> {
    vec![
        "TimeoutError".to_string(),
        "ElementNotFound".to_string(),
        "NetworkError".to_string(),
    ]
}

fn default_skip_patterns() -> Vec<String> {
    vec!["AssertionError".to_string(), "ValidationError".to_string()]
}

/// Named, validated retry options from the configuration file.
/// 来自配置文件的具名、已验证的重试选项。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Base delay before the first retry, in milliseconds.
    /// 首次重试前的基础延迟，单位毫秒。
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Double the delay on every attempt when enabled.
    /// 启用时每次尝试将延迟翻倍。
    #[serde(default = "default_exponential_backoff")]
    pub exponential_backoff: bool,
    /// Error substrings that always warrant a retry (transient failures).
    /// 总是值得重试的错误子串（瞬态失败）。
    #[serde(default = "default_retry_patterns")]
    pub retry_on_patterns: Vec<String>,
    /// Error substrings that never warrant a retry (deterministic failures).
    /// 永远不值得重试的错误子串（确定性失败）。
    #[serde(default = "default_skip_patterns")]
    pub skip_on_patterns: Vec<String>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            exponential_backoff: default_exponential_backoff(),
            retry_on_patterns: default_retry_patterns(),
            skip_on_patterns: default_skip_patterns(),
        }
    }
}

/// Everything an external retry-decision scorer gets to see about one
/// failed attempt.
/// 外部重试决策评分器对一次失败尝试可见的全部信息。
#[derive(Debug, Clone, Serialize)]
pub struct RetryContext {
    pub test_name: String,
    pub attempt_number: u32,
    pub max_retries: u32,
    pub flakiness: f64,
    pub success_rate: f64,
    pub error_detail: String,
    pub recent_failure_patterns: Vec<String>,
}

/// The external scorer's answer. The boolean only counts when the
/// confidence clears [`CONFIDENCE_THRESHOLD`].
/// 外部评分器的回答。只有置信度超过阈值时布尔值才生效。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryVerdict {
    pub should_retry: bool,
    pub confidence: f64,
}

/// An external retry-decision collaborator.
/// 外部重试决策协作方。
#[async_trait]
pub trait RetryScorer: Send + Sync {
    async fn judge(&self, context: &RetryContext) -> Result<RetryVerdict>;
}

/// The retry policy consulted by the executor after every test failure.
/// 执行器在每次测试失败后咨询的重试策略。
#[derive(Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
    scorer: Option<Arc<dyn RetryScorer>>,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            scorer: None,
        }
    }

    pub fn with_scorer(config: RetryConfig, scorer: Arc<dyn RetryScorer>) -> Self {
        Self {
            config,
            scorer: Some(scorer),
        }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Whether the failed attempt should be retried. The attempt budget is
    /// enforced here, before any scorer gets a say; a scorer error falls
    /// back to the rule-based classification.
    ///
    /// 失败的尝试是否应当重试。尝试预算在任何评分器发言之前在此强制执行；
    /// 评分器出错时回退到规则分类。
    pub async fn should_retry(&self, case: &TestCase, error_detail: &str, attempt: u32) -> bool {
        if attempt >= case.max_retries {
            return false;
        }

        if let Some(scorer) = &self.scorer {
            let context = RetryContext {
                test_name: case.name.clone(),
                attempt_number: attempt,
                max_retries: case.max_retries,
                flakiness: case.flakiness,
                success_rate: case.success_rate,
                error_detail: error_detail.to_string(),
                recent_failure_patterns: case.failure_fingerprints.clone(),
            };
            match scorer.judge(&context).await {
                Ok(verdict) => {
                    return verdict.should_retry && verdict.confidence > CONFIDENCE_THRESHOLD;
                }
                Err(error) => {
                    println!(
                        "{}",
                        t!("retry_scorer_failed", name = case.name, error = error).yellow()
                    );
                }
            }
        }

        self.rule_based_decision(case, error_detail)
    }

    /// Deterministic classification: skip patterns win over retry patterns,
    /// and an unmatched error is retried only for tests that have been
    /// stable so far.
    ///
    /// 确定性分类：跳过模式优先于重试模式，
    /// 未匹配的错误只有在测试至今保持稳定时才会被重试。
    pub fn rule_based_decision(&self, case: &TestCase, error_detail: &str) -> bool {
        let lowered = error_detail.to_lowercase();

        if self
            .config
            .skip_on_patterns
            .iter()
            .any(|pattern| lowered.contains(&pattern.to_lowercase()))
        {
            return false;
        }

        if self
            .config
            .retry_on_patterns
            .iter()
            .any(|pattern| lowered.contains(&pattern.to_lowercase()))
        {
            return true;
        }

        case.flakiness < FLAKINESS_CUTOFF
    }

    /// The jitter-free backoff curve: `base · 2ⁿ` with exponential backoff
    /// enabled, a flat `base` otherwise. Saturates instead of overflowing.
    ///
    /// 无抖动的退避曲线：启用指数退避时为 `base · 2ⁿ`，否则为固定 `base`。
    /// 溢出时饱和而不回绕。
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let millis = if self.config.exponential_backoff {
            self.config
                .base_delay_ms
                .saturating_mul(2u64.saturating_pow(attempt))
        } else {
            self.config.base_delay_ms
        };
        Duration::from_millis(millis)
    }

    /// The delay actually slept before a retry: the backoff curve with
    /// ±10% symmetric jitter, so concurrently failing tests do not retry in
    /// lockstep.
    ///
    /// 重试前实际休眠的延迟：退避曲线加 ±10% 的对称抖动，
    /// 避免并发失败的测试以同样的节奏重试。
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let base_secs = self.backoff_delay(attempt).as_secs_f64();
        let jitter = rand::thread_rng().gen_range(-JITTER_FRACTION..=JITTER_FRACTION);
        Duration::from_secs_f64((base_secs * (1.0 + jitter)).max(0.0))
    }
}
