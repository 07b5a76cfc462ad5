//! Lifecycle rules for tasks and terminal sessions.
//!
//! Task: `pending -> running -> {completed, failed}`. Pending may not skip running,
//! and completed/failed are final.
//!
//! Terminal session: `connecting -> connected -> disconnected`, with `error` reachable
//! from connecting or connected. Disconnected and error are final.
//!
//! Staying in the same state is not a transition and is rejected.

use chrono::{DateTime, Utc};

use crate::error::{SchemaError, SchemaResult};
use crate::models::{Task, TaskStatus, TerminalSession, TerminalStatus};
use crate::schema::{Validate, format_timestamp};

/// Task state transition table.
pub struct TaskTransition;

impl TaskTransition {
    pub fn is_valid(from: TaskStatus, to: TaskStatus) -> bool {
        Self::allowed_next_states(from).contains(&to)
    }

    pub fn allowed_next_states(from: TaskStatus) -> &'static [TaskStatus] {
        match from {
            TaskStatus::Pending => &[TaskStatus::Running],
            TaskStatus::Running => &[TaskStatus::Completed, TaskStatus::Failed],
            TaskStatus::Completed | TaskStatus::Failed => &[],
        }
    }
}

/// Terminal session state transition table.
pub struct TerminalTransition;

impl TerminalTransition {
    pub fn is_valid(from: TerminalStatus, to: TerminalStatus) -> bool {
        Self::allowed_next_states(from).contains(&to)
    }

    pub fn allowed_next_states(from: TerminalStatus) -> &'static [TerminalStatus] {
        match from {
            TerminalStatus::Connecting => &[TerminalStatus::Connected, TerminalStatus::Error],
            TerminalStatus::Connected => &[TerminalStatus::Disconnected, TerminalStatus::Error],
            TerminalStatus::Disconnected | TerminalStatus::Error => &[],
        }
    }
}

impl Task {
    /// Moves the task to `to`, stamping `completed_at` with `at` when `to` is final.
    pub fn transition_to(mut self, to: TaskStatus, at: DateTime<Utc>) -> SchemaResult<Task> {
        if !TaskTransition::is_valid(self.status, to) {
            return Err(SchemaError::transition(Task::ENTITY, self.status, to));
        }
        self.status = to;
        if to.is_terminal() {
            self.completed_at = Some(format_timestamp(at));
        }
        Ok(self)
    }

    /// Records progress of a running task and appends `output` to its accumulated output.
    /// Progress may not go backwards.
    pub fn record_progress(mut self, progress: f64, output: &str) -> SchemaResult<Task> {
        if self.status != TaskStatus::Running {
            return Err(SchemaError::validation(
                Task::ENTITY,
                format!("progress can only be recorded while running, status is {}", self.status),
            ));
        }
        if !progress.is_finite() || !(0.0..=100.0).contains(&progress) {
            return Err(SchemaError::validation(
                Task::ENTITY,
                format!("progress must be within [0, 100], got {}", progress),
            ));
        }
        if progress < self.progress {
            return Err(SchemaError::validation(
                Task::ENTITY,
                format!("progress must not decrease ({} -> {})", self.progress, progress),
            ));
        }
        self.progress = progress;
        self.output.push_str(output);
        Ok(self)
    }
}

/// Applies a task transition stamped with the current time.
pub fn transition_task(task: Task, to: TaskStatus) -> SchemaResult<Task> {
    let id = task.id.clone();
    let from = task.status;
    let result = task.transition_to(to, Utc::now());
    match &result {
        Ok(_) => tracing::debug!(task_id = %id, %from, %to, "task transitioned"),
        Err(e) => tracing::debug!(task_id = %id, error = %e, "task transition rejected"),
    }
    result
}

impl TerminalSession {
    pub fn transition_to(mut self, to: TerminalStatus) -> SchemaResult<TerminalSession> {
        if !TerminalTransition::is_valid(self.status, to) {
            return Err(SchemaError::transition(
                TerminalSession::ENTITY,
                self.status,
                to,
            ));
        }
        self.status = to;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_table_has_no_way_out_of_final_states() {
        assert!(TaskTransition::allowed_next_states(TaskStatus::Completed).is_empty());
        assert!(TaskTransition::allowed_next_states(TaskStatus::Failed).is_empty());
    }

    #[test]
    fn task_same_state_is_rejected() {
        assert!(!TaskTransition::is_valid(TaskStatus::Running, TaskStatus::Running));
        assert!(!TaskTransition::is_valid(TaskStatus::Pending, TaskStatus::Pending));
    }

    #[test]
    fn terminal_error_reachable_from_live_states_only() {
        assert!(TerminalTransition::is_valid(TerminalStatus::Connecting, TerminalStatus::Error));
        assert!(TerminalTransition::is_valid(TerminalStatus::Connected, TerminalStatus::Error));
        assert!(!TerminalTransition::is_valid(TerminalStatus::Disconnected, TerminalStatus::Error));
    }

    #[test]
    fn terminal_connecting_cannot_skip_to_disconnected() {
        assert!(!TerminalTransition::is_valid(
            TerminalStatus::Connecting,
            TerminalStatus::Disconnected
        ));
    }
}
