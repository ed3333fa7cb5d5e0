use std::collections::HashMap;

use log::{trace, warn};

use crate::{
    key_generator::KeyGenerator,
    slot_arena::{SlotArena, SlotId},
    tasks::{
        error::TaskError,
        task::{Task, TaskControl, TaskOutcome, TaskState},
    },
    types::TaskHandle,
};

/// How many times a colliding handle is re-minted before scheduling is
/// rejected.
const MINT_RETRY_LIMIT: usize = 8;

/// Construction-time settings for a [`TaskScheduler`].
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Upper bound on live tasks. `None` grows on demand.
    pub task_capacity: Option<usize>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            task_capacity: None,
        }
    }
}

struct TaskSlot {
    task: Box<dyn Task>,
    state: TaskState,
    handle: TaskHandle,
    /// Set by `cancel`/`cancel_all`; applied on the task's next `update`
    /// visit, never synchronously.
    cancel_requested: bool,
}

/// Owns and steps all live [`Task`]s once per `update` tick, applies deferred
/// cancellation, and chains successor tasks.
///
/// Fully cooperative, single logical thread: tasks are stored in a
/// generation-checked slot arena, visited through a run list in schedule
/// order, and addressed externally through opaque handles that degrade to
/// no-ops once stale.
pub struct TaskScheduler {
    slots: SlotArena<TaskSlot>,
    run_list: Vec<SlotId>,
    handle_table: HashMap<TaskHandle, SlotId>,
    handle_keys: KeyGenerator,
    config: SchedulerConfig,
}

impl TaskScheduler {
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    pub fn with_config(config: SchedulerConfig) -> Self {
        let slots = match config.task_capacity {
            Some(capacity) => SlotArena::with_capacity(capacity),
            None => SlotArena::new(),
        };
        Self {
            slots,
            run_list: Vec::new(),
            handle_table: HashMap::new(),
            handle_keys: KeyGenerator::new(),
            config,
        }
    }

    /// Takes ownership of the task and stages it: it enters the run list and
    /// the handle store, and receives `on_begin` on its next `update` visit.
    pub fn try_schedule(&mut self, task: Box<dyn Task>) -> Result<TaskHandle, TaskError> {
        if let Some(capacity) = self.config.task_capacity {
            if self.slots.len() >= capacity {
                return Err(TaskError::TaskPoolExhausted { capacity });
            }
        }
        let handle = self.mint_handle()?;
        let id = self.slots.insert(TaskSlot {
            task,
            state: TaskState::Staged,
            handle,
            cancel_requested: false,
        });
        self.run_list.push(id);
        self.handle_table.insert(handle, id);
        trace!("task {} staged", handle);
        Ok(handle)
    }

    /// Infallible [`Self::try_schedule`]: degrades to a null handle, the
    /// task is dropped unscheduled.
    pub fn schedule(&mut self, task: Box<dyn Task>) -> TaskHandle {
        match self.try_schedule(task) {
            Ok(handle) => handle,
            Err(error) => {
                warn!("schedule failed: {}", error);
                0
            }
        }
    }

    /// Flags the task for cancellation. The observable state stays
    /// `Staged`/`Active` until the task's next `update` visit, which fires
    /// `on_cancel` exactly once and tears the task down. Stale handles are
    /// no-ops.
    pub fn cancel(&mut self, handle: TaskHandle) {
        let Some(&id) = self.handle_table.get(&handle) else {
            return;
        };
        if let Some(slot) = self.slots.get_mut(id) {
            slot.cancel_requested = true;
            trace!("task {} flagged for cancellation", handle);
        }
    }

    /// Flags every live task for cancellation.
    pub fn cancel_all(&mut self) {
        for &id in &self.run_list {
            if let Some(slot) = self.slots.get_mut(id) {
                slot.cancel_requested = true;
            }
        }
    }

    /// Observable state of a scheduled task, `None` once the handle is
    /// stale (the task was torn down).
    pub fn state(&self, handle: TaskHandle) -> Option<TaskState> {
        let &id = self.handle_table.get(&handle)?;
        self.slots.get(id).map(|slot| slot.state)
    }

    pub fn scheduled_count(&self) -> usize {
        self.handle_table.len()
    }

    /// Steps every live task once. Visits the run list as it stood at entry,
    /// so successors scheduled during the pass are not stepped until the
    /// next call. Per task, depending on its post-hook state: `Ended` runs
    /// `on_end` and schedules the successor, `Failed` runs `on_fail`,
    /// applied cancellation runs `on_cancel`; all three tear the task down.
    /// Teardown happens strictly after the hook invocations.
    pub fn update(&mut self, delta_ms: u32) {
        let visit_count = self.run_list.len();
        for slot_index in 0..visit_count {
            let id = self.run_list[slot_index];
            let Some(slot) = self.slots.get_mut(id) else {
                continue;
            };

            if slot.cancel_requested {
                slot.state = TaskState::Canceled;
                slot.task.on_cancel();
                self.release(id);
                continue;
            }

            let mut control = TaskControl::new();
            match slot.state {
                TaskState::Staged => {
                    slot.state = TaskState::Active;
                    slot.task.on_begin(&mut control);
                }
                TaskState::Active => {
                    slot.task.on_update(&mut control, delta_ms);
                }
                // terminal states are torn down in the same visit that
                // produced them, nothing else should be in the run list
                _ => continue,
            }

            match control.outcome() {
                Some(TaskOutcome::Ended) => {
                    slot.state = TaskState::Ended;
                    slot.task.on_end();
                    let successor = slot.task.take_successor();
                    self.release(id);
                    if let Some(next_task) = successor {
                        self.schedule(next_task);
                    }
                }
                Some(TaskOutcome::Failed) => {
                    slot.state = TaskState::Failed;
                    slot.task.on_fail();
                    self.release(id);
                }
                None => {}
            }
        }
        self.run_list.retain(|id| self.slots.contains(*id));
    }

    fn release(&mut self, id: SlotId) {
        if let Some(slot) = self.slots.remove(id) {
            self.handle_table.remove(&slot.handle);
            trace!("task {} reaped in state {:?}", slot.handle, slot.state);
        }
    }

    fn mint_handle(&mut self) -> Result<TaskHandle, TaskError> {
        let mut handle = 0;
        for _ in 0..MINT_RETRY_LIMIT {
            handle = self.handle_keys.generate();
            if !self.handle_table.contains_key(&handle) {
                return Ok(handle);
            }
            warn!("task handle {} already live, re-minting", handle);
        }
        Err(TaskError::HandleCollision { handle })
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}
