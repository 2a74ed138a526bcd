//! # Suite Runner Library / Suite Runner 库
//!
//! This library provides the core functionality of the Suite Runner tool,
//! a configuration-driven E2E test suite orchestrator: it selects,
//! prioritizes, schedules and executes test cases with bounded
//! concurrency, smart retries, timeout supervision and statistical
//! tracking, and produces a structured execution report.
//!
//! 此库为 Suite Runner 工具提供核心功能，
//! 这是一个配置驱动的端到端测试套件编排器：
//! 它以有界并发、智能重试、超时监督和统计跟踪的方式
//! 选择、排序、调度并执行测试用例，并产出结构化执行报告。
//!
//! ## Modules / 模块
//!
//! - `core` - Data models, registry, prioritization, planning, execution
//! - `infra` - Infrastructure services: the process runner and history store
//! - `reporting` - Result analysis and the console/JSON/HTML report sinks
//! - `cli` - Command-line interface and commands
//!
//! - `core` - 数据模型、注册表、优先级排序、计划与执行
//! - `infra` - 基础设施服务：进程运行器与历史存储
//! - `reporting` - 结果分析及控制台/JSON/HTML 报告输出
//! - `cli` - 命令行接口和命令

pub mod cli;
pub mod core;
pub mod infra;
pub mod reporting;

// Re-export commonly used items
pub use crate::core::config;
pub use crate::core::execution;
pub use crate::core::models;

/// Initializes the application's internationalization (i18n) based on the system locale.
///
/// This function detects the user's system locale and sets the appropriate
/// language for the application's user interface. It attempts to match the full
/// locale (e.g., "zh-CN"), then just the language code (e.g., "en"), and
/// finally falls back to the default language ("en").
pub fn init() {
    // Detect system locale and set it for i18n.
    // Fallback to "en" if detection fails.
    let locale = sys_locale::get_locale().unwrap_or_else(|| "en".to_string());
    let available_locales = rust_i18n::available_locales!();

    // Try to match the full locale first (e.g., "zh-CN")
    // Then try to match the language part only (e.g., "en" from "en-US")
    // Finally, fall back to "en"
    let lang = if available_locales.contains(&locale.as_str()) {
        &locale
    } else {
        locale
            .split('-')
            .next()
            .filter(|lang_code| available_locales.contains(lang_code))
            .unwrap_or("en")
    };

    rust_i18n::set_locale(lang);
}

// Initialize i18n
rust_i18n::i18n!("locales", fallback = "en");
