use crate::errors::{ErrorKind, MigrateError, MigrateResult};
use dashmap::DashMap;
use parking_lot::Mutex;

/// Operation types of the in-memory client, used by fail points and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Insert,
    Find,
    Delete,
    Drop,
    CreateIndex,
    Command,
    StartSession,
    StartTransaction,
    Commit,
    Abort,
}

/// Forces operations of one type to fail.
///
/// # Usage
/// ```text
/// client.configure_fail_point(
///     FailPoint::new(Operation::Command, ErrorKind::BackendError)
///         .command("insert")
///         .times(1),
/// );
/// ```
#[derive(Debug, Clone)]
pub struct FailPoint {
    operation: Operation,
    error_kind: ErrorKind,
    message: String,
    command: Option<String>,
    remaining: Option<usize>,
}

impl FailPoint {
    /// A fail point that triggers on every matching operation until cleared.
    pub fn new(operation: Operation, error_kind: ErrorKind) -> Self {
        FailPoint {
            operation,
            error_kind,
            message: format!("fail point triggered on {:?}", operation),
            command: None,
            remaining: None,
        }
    }

    /// Triggers only for the next `times` matching operations.
    pub fn times(mut self, times: usize) -> Self {
        self.remaining = Some(times);
        self
    }

    /// Narrows a [Operation::Command] fail point to one command name.
    pub fn command(mut self, name: &str) -> Self {
        self.command = Some(name.to_string());
        self
    }

    pub fn message(mut self, message: &str) -> Self {
        self.message = message.to_string();
        self
    }

    fn applies_to(&self, operation: Operation, command: Option<&str>) -> bool {
        if self.operation != operation || self.remaining == Some(0) {
            return false;
        }
        match (&self.command, command) {
            (Some(expected), Some(actual)) => expected == actual,
            (Some(_), None) => false,
            (None, _) => true,
        }
    }
}

/// Registered fail points and per-operation counters.
#[derive(Default)]
pub(crate) struct FailPoints {
    points: Mutex<Vec<FailPoint>>,
    counters: DashMap<Operation, usize>,
}

impl FailPoints {
    pub(crate) fn configure(&self, fail_point: FailPoint) {
        self.points.lock().push(fail_point);
    }

    pub(crate) fn clear(&self) {
        self.points.lock().clear();
    }

    /// Counts the operation and fails it if a fail point applies.
    pub(crate) fn check(&self, operation: Operation, command: Option<&str>) -> MigrateResult<()> {
        *self.counters.entry(operation).or_insert(0) += 1;

        let mut points = self.points.lock();
        let position = points.iter().position(|p| p.applies_to(operation, command));
        let Some(position) = position else {
            return Ok(());
        };

        let point = &mut points[position];
        let error = MigrateError::new(&point.message, point.error_kind);
        let exhausted = match point.remaining.as_mut() {
            Some(remaining) => {
                *remaining -= 1;
                *remaining == 0
            }
            None => false,
        };
        if exhausted {
            points.remove(position);
        }
        log::debug!("Fail point on {:?} triggered: {}", operation, error.message());
        Err(error)
    }

    pub(crate) fn count(&self, operation: Operation) -> usize {
        self.counters.get(&operation).map(|c| *c).unwrap_or(0)
    }

    pub(crate) fn total(&self) -> usize {
        self.counters.iter().map(|entry| *entry.value()).sum()
    }

    pub(crate) fn reset_counters(&self) {
        self.counters.clear();
    }
}
