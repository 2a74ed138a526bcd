//! # Infrastructure Module / 基础设施模块
//!
//! Infrastructure services around the engine: the process-spawning test
//! runner collaborator and the statistics history store, plus the i18n
//! re-export used throughout the crate.
//!
//! 引擎周边的基础设施服务：派生进程的测试运行器协作方和统计历史存储，
//! 以及整个 crate 使用的国际化再导出。

pub mod command;
pub mod history;

// Re-export i18n functions for easier access
pub use rust_i18n::t;
