use thiserror::Error;

/// Errors that can occur while registering or routing delegates
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Delegate pool exhausted
    #[error("Delegate pool capacity of {capacity} exhausted. Increase DispatcherConfig::delegate_capacity or remove stale subscriptions")]
    DelegatePoolExhausted { capacity: usize },

    /// Freshly minted handle collides with a live delegate
    #[error("Generated delegate handle {handle} collides with a live delegate. This indicates handle counter wrap-around under extreme registration load")]
    HandleCollision { handle: u32 },

    /// Freshly minted sequence id collides with a pending request
    #[error("Generated sequence id {sequence_id} collides with a pending request. This indicates sequence counter wrap-around while a very old request is still outstanding")]
    SequenceCollision { sequence_id: u32 },

    /// Message queue storage exhausted
    #[error("Message queue storage of {capacity} slots exhausted, message dropped. Drain the queue more often or enlarge it")]
    QueueFull { capacity: usize },
}
