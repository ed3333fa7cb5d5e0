/// Lifecycle of a [`Task`]. States are traversed monotonically, no state is
/// ever revisited:
///
/// `Idle -> Staged -> Active -> { Ended | Failed | Canceled }`
///
/// `Idle` is the nominal state of a freshly constructed, not-yet-scheduled
/// task; `schedule` stages it, its first `update` visit begins it, and it
/// leaves `Active` either by its own choice ([`TaskControl::end`] /
/// [`TaskControl::fail`]) or through cancellation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskState {
    Idle,
    Staged,
    Active,
    Ended,
    Failed,
    Canceled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TaskOutcome {
    Ended,
    Failed,
}

/// Handed to the `on_begin`/`on_update` hooks so a task can move itself out
/// of `Active`. The first call wins; later calls in the same tick are
/// ignored, keeping the state machine monotonic.
pub struct TaskControl {
    outcome: Option<TaskOutcome>,
}

impl TaskControl {
    pub(crate) fn new() -> Self {
        Self { outcome: None }
    }

    /// The task finished successfully. `on_end` will run and an owned
    /// successor (if any) will be scheduled.
    pub fn end(&mut self) {
        self.outcome.get_or_insert(TaskOutcome::Ended);
    }

    /// The task failed. `on_fail` will run and no successor is scheduled.
    pub fn fail(&mut self) {
        self.outcome.get_or_insert(TaskOutcome::Failed);
    }

    pub(crate) fn outcome(&self) -> Option<TaskOutcome> {
        self.outcome
    }
}

/// A unit of cooperative, steppable work driven by
/// [`TaskScheduler::update`](crate::TaskScheduler::update).
///
/// Only `on_update` is mandatory; the remaining hooks default to no-ops.
/// A task must return control from `on_update` promptly: nothing in this
/// model preempts it, and genuinely blocking work belongs behind a task that
/// polls an external asynchronous handle and calls `control.end()` /
/// `control.fail()` once it resolves.
pub trait Task {
    /// Runs on the task's first `update` visit, before any `on_update`.
    fn on_begin(&mut self, _control: &mut TaskControl) {}

    /// Runs once per `update` visit while the task is `Active`.
    fn on_update(&mut self, control: &mut TaskControl, delta_ms: u32);

    /// Runs when the task reached `Ended`, before it is torn down.
    fn on_end(&mut self) {}

    /// Runs when the task reached `Failed`, before it is torn down.
    fn on_fail(&mut self) {}

    /// Runs when a requested cancellation is applied, before teardown.
    fn on_cancel(&mut self) {}

    /// Transfers ownership of the successor task, queried exactly once when
    /// the task reaches `Ended`. Failed and canceled tasks never chain.
    fn take_successor(&mut self) -> Option<Box<dyn Task>> {
        None
    }
}
