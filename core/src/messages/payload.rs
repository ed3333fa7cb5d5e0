use std::any::Any;

use crate::{class_id::ClassId, messages::named::Named};

/// The polymorphic, cloneable data body carried inside a
/// [`Message`](crate::Message).
///
/// Concrete payload types carry only value data. A payload handed to
/// `queue_*`/`send` is cloned on insertion, so the caller's original may be
/// transient (e.g. built on the stack and dropped immediately after).
pub trait Payload: Named {
    /// The class this payload is routed under.
    fn class_id(&self) -> ClassId;

    fn is_of_class(&self, class_id: ClassId) -> bool {
        self.class_id() == class_id
    }

    /// Clones the payload into a fresh owned box. Called once per
    /// queue-insertion and once per `send`.
    fn clone_payload(&self) -> Box<dyn Payload>;

    /// Downcast access for consumers that know the concrete type.
    /// Implementations return `self`.
    fn as_any(&self) -> &dyn Any;
}
