//! # Core Module / 核心模块
//!
//! The orchestration engine itself: data models, configuration, the test
//! case registry, prioritization, planning, the concurrent executor, the
//! retry policy and the timeout supervisor.
//!
//! 编排引擎本体：数据模型、配置、测试用例注册表、优先级排序、
//! 执行计划、并发执行器、重试策略和超时监督器。

pub mod config;
pub mod execution;
pub mod models;
pub mod planner;
pub mod prioritizer;
pub mod registry;
pub mod retry;
pub mod supervisor;

// Re-exports
pub use execution::{CompletedRun, Executor, TestRunner};
pub use models::{Execution, ExecutionStatus, TestCase, TestSuite};
pub use registry::TestCaseRegistry;
