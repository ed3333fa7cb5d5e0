use crate::{
    class_id::ClassId,
    messages::{message::Message, payload::Payload},
    types::SequenceId,
};

/// Ordered, capacity-bounded holding area for [`Message`]s awaiting dispatch.
///
/// Backing storage is a `Vec` with a consumed-head cursor: `pop` retires the
/// slot at the cursor instead of shifting the tail. When the storage fills up
/// and consumed entries exist at the front, `push` compacts by shifting the
/// unconsumed tail back to the start, which amortizes to O(1) over a
/// push/pop cycle. When the storage is full with nothing consumed, the push
/// is dropped and the queue length does not change.
///
/// All operations are synchronous and non-suspending.
pub struct MessageQueue {
    buffer: Vec<Option<Message>>,
    head: usize,
    capacity: usize,
}

impl MessageQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            head: 0,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of unconsumed messages.
    pub fn len(&self) -> usize {
        self.buffer.len() - self.head
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clones the payload and appends a message. Returns `false` (length
    /// unchanged) if the backing storage is exhausted.
    pub fn push(&mut self, class_id: ClassId, payload: &dyn Payload, sequence_id: SequenceId) -> bool {
        self.push_message(Message::new(class_id, sequence_id, payload.clone_payload()))
    }

    /// Appends an already-built message without an extra payload clone.
    pub fn push_message(&mut self, message: Message) -> bool {
        if self.buffer.len() == self.capacity {
            if self.head == 0 {
                return false;
            }
            // shift the unconsumed tail to the start of the storage
            self.buffer.drain(..self.head);
            self.head = 0;
        }
        self.buffer.push(Some(message));
        true
    }

    /// The oldest unconsumed message, without retiring it.
    pub fn front(&self) -> Option<&Message> {
        self.buffer.get(self.head).and_then(|slot| slot.as_ref())
    }

    /// Retires and returns the oldest unconsumed message.
    pub fn pop(&mut self) -> Option<Message> {
        if self.head == self.buffer.len() {
            return None;
        }
        let message = self.buffer[self.head].take();
        self.head += 1;
        if self.head == self.buffer.len() {
            self.buffer.clear();
            self.head = 0;
        }
        message
    }
}
