use std::fmt;

use crate::{class_id::ClassId, messages::payload::Payload, types::SequenceId};

/// Envelope routed by the dispatcher: a class key, an optional correlation
/// sequence id (zero = none), and an exclusively owned payload.
pub struct Message {
    class_id: ClassId,
    sequence_id: SequenceId,
    payload: Box<dyn Payload>,
}

impl Message {
    pub fn new(class_id: ClassId, sequence_id: SequenceId, payload: Box<dyn Payload>) -> Self {
        Self {
            class_id,
            sequence_id,
            payload,
        }
    }

    pub fn class_id(&self) -> ClassId {
        self.class_id
    }

    pub fn sequence_id(&self) -> SequenceId {
        self.sequence_id
    }

    pub fn payload(&self) -> &dyn Payload {
        &*self.payload
    }

    /// Downcasts the payload to a concrete type.
    pub fn payload_as<P: Payload + 'static>(&self) -> Option<&P> {
        self.payload.as_any().downcast_ref::<P>()
    }
}

impl Clone for Message {
    fn clone(&self) -> Self {
        Self {
            class_id: self.class_id,
            sequence_id: self.sequence_id,
            payload: self.payload.clone_payload(),
        }
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Message")
            .field("class_id", &self.class_id)
            .field("sequence_id", &self.sequence_id)
            .field("payload", &self.payload.name())
            .finish()
    }
}
