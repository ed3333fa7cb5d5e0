/// Opaque identifier for a registered delegate. Zero is never a live handle,
/// so it doubles as the "no delegate" value returned by degraded operations.
pub type DelegateHandle = u32;

/// Opaque identifier for a scheduled task. Zero is never a live handle.
pub type TaskHandle = u32;

/// Correlates a request [`Message`](crate::Message) to exactly one future
/// response delegate. Zero means "no correlation, class-routed only".
pub type SequenceId = u32;
