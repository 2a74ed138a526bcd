//! # Reporting Module / 报告模块
//!
//! Consumers of the completed execution list: the pure analyzer that folds
//! it into an immutable report record, and the console, JSON and HTML
//! sinks that render that record.
//!
//! 已完成执行列表的消费者：将其折叠为不可变报告记录的纯分析器，
//! 以及渲染该记录的控制台、JSON 和 HTML 输出。

pub mod analyzer;
pub mod console;
pub mod html;
pub mod json;

// Re-exports
pub use analyzer::{ExecutionAnalysis, ExecutionReport, analyze, build_report};
