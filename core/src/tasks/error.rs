use thiserror::Error;

/// Errors that can occur while scheduling tasks
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// Task pool exhausted
    #[error("Task pool capacity of {capacity} exhausted. Increase SchedulerConfig::task_capacity or cancel stale tasks")]
    TaskPoolExhausted { capacity: usize },

    /// Freshly minted handle collides with a live task
    #[error("Generated task handle {handle} collides with a live task. This indicates handle counter wrap-around under extreme scheduling load")]
    HandleCollision { handle: u32 },
}
