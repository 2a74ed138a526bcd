//! # Models Module Unit Tests / Models 模块单元测试
//!
//! Unit tests for the core data model: the execution status machine, the
//! execution record lifecycle and the test case statistics containers.
//!
//! 核心数据模型的单元测试：执行状态机、执行记录生命周期
//! 和测试用例统计容器。

mod common;

use common::make_case;
use suite_runner::core::models::{
    Execution, ExecutionStatus, MAX_FAILURE_FINGERPRINTS, RunnerOutput, TestPriority,
};

#[cfg(test)]
mod priority_tests {
    use super::*;

    #[test]
    fn test_priority_ranks_are_ordered() {
        assert!(TestPriority::Critical.rank() > TestPriority::High.rank());
        assert!(TestPriority::High.rank() > TestPriority::Medium.rank());
        assert!(TestPriority::Medium.rank() > TestPriority::Low.rank());
    }

    #[test]
    fn test_priority_parse_accepts_any_case() {
        assert_eq!(TestPriority::parse("critical"), Some(TestPriority::Critical));
        assert_eq!(TestPriority::parse("HIGH"), Some(TestPriority::High));
        assert_eq!(TestPriority::parse("Medium"), Some(TestPriority::Medium));
        assert_eq!(TestPriority::parse("low"), Some(TestPriority::Low));
        assert_eq!(TestPriority::parse("urgent"), None);
    }
}

#[cfg(test)]
mod status_machine_tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(ExecutionStatus::Passed.is_terminal());
        assert!(ExecutionStatus::Failed.is_terminal());
        assert!(ExecutionStatus::Cancelled.is_terminal());
        assert!(!ExecutionStatus::Pending.is_terminal());
        assert!(!ExecutionStatus::Running.is_terminal());
        assert!(!ExecutionStatus::Retrying.is_terminal());
    }

    #[test]
    fn test_legal_transitions() {
        assert!(ExecutionStatus::Pending.can_transition_to(ExecutionStatus::Running));
        assert!(ExecutionStatus::Pending.can_transition_to(ExecutionStatus::Cancelled));
        assert!(ExecutionStatus::Running.can_transition_to(ExecutionStatus::Retrying));
        assert!(ExecutionStatus::Retrying.can_transition_to(ExecutionStatus::Running));
        assert!(ExecutionStatus::Running.can_transition_to(ExecutionStatus::Passed));
        assert!(ExecutionStatus::Retrying.can_transition_to(ExecutionStatus::Failed));
    }

    #[test]
    fn test_illegal_transitions() {
        // Pending cannot pass or retry without running first.
        assert!(!ExecutionStatus::Pending.can_transition_to(ExecutionStatus::Passed));
        assert!(!ExecutionStatus::Pending.can_transition_to(ExecutionStatus::Retrying));
        // Retrying re-enters Running; it never passes directly.
        assert!(!ExecutionStatus::Retrying.can_transition_to(ExecutionStatus::Passed));
    }

    #[test]
    fn test_terminal_states_never_revert() {
        for terminal in [
            ExecutionStatus::Passed,
            ExecutionStatus::Failed,
            ExecutionStatus::Cancelled,
        ] {
            for next in [
                ExecutionStatus::Pending,
                ExecutionStatus::Running,
                ExecutionStatus::Retrying,
                ExecutionStatus::Passed,
                ExecutionStatus::Failed,
                ExecutionStatus::Cancelled,
            ] {
                assert!(
                    !terminal.can_transition_to(next),
                    "{} must not transition to {}",
                    terminal,
                    next
                );
            }
        }
    }
}

#[cfg(test)]
mod execution_tests {
    use super::*;

    #[test]
    fn test_execution_lifecycle() {
        let case = make_case("login-smoke");
        let mut execution = Execution::new(&case, "staging");

        assert_eq!(execution.status, ExecutionStatus::Pending);
        assert!(execution.started_at.is_none());

        assert!(execution.mark_running());
        assert!(execution.started_at.is_some());

        assert!(execution.pass());
        assert_eq!(execution.status, ExecutionStatus::Passed);
        assert!(execution.finished_at.is_some());
    }

    #[test]
    fn test_retry_sub_loop_re_enters_running() {
        let case = make_case("flaky");
        let mut execution = Execution::new(&case, "staging");

        assert!(execution.mark_running());
        assert!(execution.mark_retrying());
        execution.retry_attempt = 1;
        assert!(execution.mark_running());
        assert!(execution.pass());
        assert!(execution.passed_after_retry());
    }

    #[test]
    fn test_terminal_record_rejects_further_writes() {
        let case = make_case("stable");
        let mut execution = Execution::new(&case, "staging");
        execution.mark_running();
        execution.pass();

        assert!(!execution.fail("late timeout"));
        assert!(!execution.cancel("late cancel"));
        assert!(!execution.mark_running());
        assert_eq!(execution.status, ExecutionStatus::Passed);
        // A rejected transition must not smuggle in an error message.
        assert!(execution.error_message.is_none());
    }

    #[test]
    fn test_pending_execution_can_be_cancelled() {
        let case = make_case("queued");
        let mut execution = Execution::new(&case, "staging");
        assert!(execution.cancel("run aborted"));
        assert_eq!(execution.status, ExecutionStatus::Cancelled);
        assert_eq!(execution.error_message.as_deref(), Some("run aborted"));
    }

    #[test]
    fn test_synthetic_failure_is_terminal_failed() {
        let execution = Execution::synthetic_failure("ghost", "staging", "orchestration error");
        assert_eq!(execution.status, ExecutionStatus::Failed);
        assert_eq!(execution.test_id, "ghost");
        assert!(
            execution
                .error_message
                .as_deref()
                .unwrap()
                .contains("orchestration error")
        );
    }
}

#[cfg(test)]
mod test_case_tests {
    use super::*;

    #[test]
    fn test_expected_duration_prefers_history() {
        let mut case = make_case("timed");
        case.estimated_secs = 60;
        assert_eq!(case.expected_duration_secs(), 60.0);

        case.avg_duration_secs = 12.5;
        assert_eq!(case.expected_duration_secs(), 12.5);
    }

    #[test]
    fn test_fingerprints_are_distinct() {
        let mut case = make_case("fingerprinted");
        case.push_fingerprint("timeout waiting for #submit".to_string());
        case.push_fingerprint("timeout waiting for #submit".to_string());
        assert_eq!(case.failure_fingerprints.len(), 1);
    }

    #[test]
    fn test_fingerprints_evict_fifo() {
        let mut case = make_case("noisy");
        for i in 0..(MAX_FAILURE_FINGERPRINTS + 3) {
            case.push_fingerprint(format!("error-{}", i));
        }
        assert_eq!(case.failure_fingerprints.len(), MAX_FAILURE_FINGERPRINTS);
        // The three oldest entries are gone; the newest is last.
        assert_eq!(case.failure_fingerprints[0], "error-3");
        assert_eq!(
            case.failure_fingerprints[MAX_FAILURE_FINGERPRINTS - 1],
            format!("error-{}", MAX_FAILURE_FINGERPRINTS + 2)
        );
    }
}

#[cfg(test)]
mod runner_output_tests {
    use super::*;

    #[test]
    fn test_error_detail_prefers_explicit_message() {
        let output = RunnerOutput {
            success: false,
            return_code: Some(1),
            stdout: String::new(),
            stderr: "stderr noise".to_string(),
            error_message: Some("TimeoutError: page load".to_string()),
        };
        assert_eq!(output.error_detail(), "TimeoutError: page load");
    }

    #[test]
    fn test_error_detail_falls_back_to_stderr_then_status() {
        let output = RunnerOutput {
            success: false,
            return_code: Some(2),
            stdout: String::new(),
            stderr: "boom".to_string(),
            error_message: None,
        };
        assert_eq!(output.error_detail(), "boom");

        let silent = RunnerOutput {
            success: false,
            return_code: Some(3),
            stdout: String::new(),
            stderr: String::new(),
            error_message: None,
        };
        assert!(silent.error_detail().contains("status 3"));
    }
}
