//! # Axon Core
//! Class/sequence-addressed message dispatch plus a cooperative task
//! scheduler, used to decouple engine subsystems (simulation, UI, asset
//! streaming) without them knowing each other's concrete types.
//!
//! Producers wrap a [`Payload`] into a [`Message`] on a [`MessageQueue`],
//! optionally registering a one-shot response delegate keyed by a fresh
//! sequence id; once per engine tick, [`MessageDispatcher::dispatch`] drains
//! the queue and routes each message first by sequence id, then to all class
//! subscribers in subscription order. Long-running work runs as [`Task`]s
//! stepped by [`TaskScheduler::update`], with explicit lifecycle, deferred
//! cancellation, and successor chaining.
//!
//! Everything here assumes a single logical thread of control; no operation
//! suspends or blocks.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod class_id;
mod key_generator;
mod messages;
mod slot_arena;
mod tasks;
mod types;

pub use class_id::{category, ClassId};
pub use key_generator::KeyGenerator;
pub use messages::{
    dispatcher::{DelegateFn, DispatcherConfig, MessageDispatcher},
    error::DispatchError,
    message::Message,
    message_queue::MessageQueue,
    named::Named,
    payload::Payload,
};
pub use slot_arena::{SlotArena, SlotId};
pub use tasks::{
    error::TaskError,
    scheduler::{SchedulerConfig, TaskScheduler},
    task::{Task, TaskControl, TaskState},
};
pub use types::{DelegateHandle, SequenceId, TaskHandle};
