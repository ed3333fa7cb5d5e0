use std::collections::HashMap;

use log::{trace, warn};

use crate::{
    class_id::ClassId,
    key_generator::KeyGenerator,
    messages::{
        error::DispatchError, message::Message, message_queue::MessageQueue, payload::Payload,
    },
    slot_arena::{SlotArena, SlotId},
    types::{DelegateHandle, SequenceId},
};

/// Signature invoked for every message delivered to a delegate. The delegate
/// receives the dispatcher itself so it can re-enter it: remove itself or a
/// sibling, register new delegates, `post` follow-up messages, or `send`
/// immediately.
pub type DelegateFn<C> = dyn FnMut(&mut MessageDispatcher<C>, &Message, &mut C);

/// How many times a colliding handle/sequence key is re-minted before the
/// registration is rejected.
const MINT_RETRY_LIMIT: usize = 8;

/// Construction-time settings for a [`MessageDispatcher`].
#[derive(Clone, Debug)]
pub struct DispatcherConfig {
    /// Upper bound on live delegate entries, class sentinels included.
    /// `None` grows on demand.
    pub delegate_capacity: Option<usize>,
    /// Maximum number of messages a single `dispatch` call will drain.
    /// Bounds the work of a callback-feedback loop to one tick's batch.
    pub drain_limit: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            delegate_capacity: None,
            drain_limit: 1024,
        }
    }
}

/// One registered callback, either a persistent class subscriber, a one-shot
/// sequence delegate, or a class sentinel (no callback, handle zero).
///
/// Class subscribers form a circular doubly-linked list through `prev`/`next`
/// slot ids, anchored on their class's sentinel; sequence delegates are
/// self-linked. While a callback executes it is checked out of the slot, so a
/// nested fan-out finds the slot empty and skips it instead of re-entering.
struct DelegateEntry<C> {
    callback: Option<Box<DelegateFn<C>>>,
    handle: DelegateHandle,
    sequence_id: SequenceId,
    prev: SlotId,
    next: SlotId,
    /// Logically removed: unlinked from the tables, skipped by fan-out, slot
    /// released once the enclosing fan-out finishes.
    pending_removal: bool,
}

/// Routes [`Message`]s to registered delegates, either by class (persistent
/// subscriptions, fan-out in subscription order) or by sequence id (one-shot
/// request callbacks, fired exactly once).
///
/// Single logical thread of control: `dispatch` is intended to be called once
/// per engine tick. Generic over a caller context type `C` handed through to
/// every delegate invocation.
pub struct MessageDispatcher<C> {
    entries: SlotArena<DelegateEntry<C>>,
    class_heads: HashMap<ClassId, SlotId>,
    handle_table: HashMap<DelegateHandle, SlotId>,
    sequence_table: HashMap<SequenceId, SlotId>,
    handle_keys: KeyGenerator,
    sequence_keys: KeyGenerator,
    /// Messages produced while a dispatch pass holds the queue; flushed into
    /// the drained queue between deliveries.
    outbox: Vec<Message>,
    /// Entries tombstoned during an active fan-out, released at depth zero.
    retired: Vec<SlotId>,
    fanout_depth: u32,
    dispatch_time_ms: u32,
    config: DispatcherConfig,
}

impl<C> MessageDispatcher<C> {
    pub fn new() -> Self {
        Self::with_config(DispatcherConfig::default())
    }

    pub fn with_config(config: DispatcherConfig) -> Self {
        let entries = match config.delegate_capacity {
            Some(capacity) => SlotArena::with_capacity(capacity),
            None => SlotArena::new(),
        };
        Self {
            entries,
            class_heads: HashMap::new(),
            handle_table: HashMap::new(),
            sequence_table: HashMap::new(),
            handle_keys: KeyGenerator::new(),
            sequence_keys: KeyGenerator::new(),
            outbox: Vec::new(),
            retired: Vec::new(),
            fanout_depth: 0,
            dispatch_time_ms: 0,
            config,
        }
    }

    // Registration

    /// Registers a persistent subscriber for a class, creating the class's
    /// sentinel on first subscription. Fan-out order is subscription order.
    pub fn try_subscribe<F>(
        &mut self,
        class_id: ClassId,
        callback: F,
    ) -> Result<DelegateHandle, DispatchError>
    where
        F: FnMut(&mut MessageDispatcher<C>, &Message, &mut C) + 'static,
    {
        let slots_needed = if self.class_heads.contains_key(&class_id) {
            1
        } else {
            2
        };
        self.check_pool_capacity(slots_needed)?;
        let handle = self.mint_handle()?;

        let head = self.ensure_class_head(class_id);
        let id = self.entries.insert(DelegateEntry {
            callback: Some(Box::new(callback)),
            handle,
            sequence_id: 0,
            prev: SlotId::NULL,
            next: SlotId::NULL,
            pending_removal: false,
        });
        self.link_before(head, id);
        self.handle_table.insert(handle, id);
        trace!("delegate {} subscribed to {:?}", handle, class_id);
        Ok(handle)
    }

    /// Infallible [`Self::try_subscribe`]: degrades to a null handle on
    /// failure, the caller simply gets no subscription.
    pub fn subscribe<F>(&mut self, class_id: ClassId, callback: F) -> DelegateHandle
    where
        F: FnMut(&mut MessageDispatcher<C>, &Message, &mut C) + 'static,
    {
        match self.try_subscribe(class_id, callback) {
            Ok(handle) => handle,
            Err(error) => {
                warn!("subscribe to {:?} failed: {}", class_id, error);
                0
            }
        }
    }

    /// Unsubscribes a delegate. Stale or duplicate handles are no-ops, and a
    /// delegate may remove itself (or a sibling) from within its own
    /// invocation: the entry is unlinked immediately but its slot is released
    /// only once the enclosing fan-out finishes with it.
    pub fn remove(&mut self, handle: DelegateHandle) {
        let Some(&id) = self.handle_table.get(&handle) else {
            return;
        };
        self.remove_slot(id);
    }

    // Producing messages

    /// Clones the payload and pushes an uncorrelated message onto `queue`.
    /// Returns `false` if the queue storage is exhausted (length unchanged).
    pub fn queue_message(
        &mut self,
        queue: &mut MessageQueue,
        class_id: ClassId,
        payload: &dyn Payload,
    ) -> bool {
        let accepted = queue.push(class_id, payload, 0);
        if !accepted {
            trace!(
                "queue full, dropped {} ({:?})",
                payload.name(),
                class_id
            );
        }
        accepted
    }

    /// Clones/pushes the payload as a request message stamped with a freshly
    /// minted sequence id, and records `callback` as its one-shot delegate in
    /// both the handle table and the sequence table. The delegate fires when
    /// the stamped message is dispatched, before that message's class
    /// fan-out, so it acts as a processed-notification carrying the request
    /// body. For a round trip that resolves against a later response, see
    /// [`Self::try_send_request`].
    ///
    /// On failure the registration is rolled back completely: no delegate is
    /// recorded and the queue length is unchanged.
    pub fn try_queue_request<F>(
        &mut self,
        queue: &mut MessageQueue,
        class_id: ClassId,
        payload: &dyn Payload,
        callback: F,
    ) -> Result<DelegateHandle, DispatchError>
    where
        F: FnMut(&mut MessageDispatcher<C>, &Message, &mut C) + 'static,
    {
        self.check_pool_capacity(1)?;
        let handle = self.mint_handle()?;
        let sequence_id = self.mint_sequence_id()?;

        let id = self.entries.insert(DelegateEntry {
            callback: Some(Box::new(callback)),
            handle,
            sequence_id,
            prev: SlotId::NULL,
            next: SlotId::NULL,
            pending_removal: false,
        });
        self.self_link(id);

        if !queue.push(class_id, payload, sequence_id) {
            self.entries.remove(id);
            return Err(DispatchError::QueueFull {
                capacity: queue.capacity(),
            });
        }

        self.handle_table.insert(handle, id);
        self.sequence_table.insert(sequence_id, id);
        trace!(
            "request {} ({:?}) queued with sequence {}",
            payload.name(),
            class_id,
            sequence_id
        );
        Ok(handle)
    }

    /// Infallible [`Self::try_queue_request`]: degrades to a null handle.
    pub fn queue_request<F>(
        &mut self,
        queue: &mut MessageQueue,
        class_id: ClassId,
        payload: &dyn Payload,
        callback: F,
    ) -> DelegateHandle
    where
        F: FnMut(&mut MessageDispatcher<C>, &Message, &mut C) + 'static,
    {
        match self.try_queue_request(queue, class_id, payload, callback) {
            Ok(handle) => handle,
            Err(error) => {
                warn!("queue_request for {:?} failed: {}", class_id, error);
                0
            }
        }
    }

    /// Appends a message to the dispatcher's outbox. The outbox is flushed
    /// into the queue being drained between deliveries, so a delegate that
    /// posts during `dispatch` sees its follow-up picked up in the same
    /// drain pass. Posts made outside a pass ride along with the next
    /// `dispatch` call.
    pub fn post(&mut self, class_id: ClassId, payload: &dyn Payload) {
        self.outbox
            .push(Message::new(class_id, 0, payload.clone_payload()));
    }

    /// [`Self::post`] carrying an explicit sequence id, for responders that
    /// answer a correlated request from inside a delegate.
    pub fn post_response(
        &mut self,
        class_id: ClassId,
        payload: &dyn Payload,
        sequence_id: SequenceId,
    ) {
        self.outbox
            .push(Message::new(class_id, sequence_id, payload.clone_payload()));
    }

    /// Synchronous, immediate fan-out to all current class subscribers,
    /// bypassing any queue. `sequence_id` is stamped on the message the
    /// subscribers observe; sequence-correlated delegates fire only on the
    /// queued/dispatched path.
    pub fn send(
        &mut self,
        class_id: ClassId,
        payload: &dyn Payload,
        sequence_id: SequenceId,
        context: &mut C,
    ) {
        let message = Message::new(class_id, sequence_id, payload.clone_payload());
        self.fanout_depth += 1;
        self.fan_out(&message, context);
        self.fanout_depth -= 1;
        if self.fanout_depth == 0 {
            self.release_retired();
        }
    }

    /// Registers a one-shot delegate under a freshly minted sequence id,
    /// then immediately [`Self::send`]s the request stamped with it. The
    /// synchronous fan-out never consults the sequence table, so the binding
    /// survives the request: it resolves against whichever later message
    /// carries the same sequence id through `dispatch`, produced by a
    /// responder via [`Self::post_response`] or pushed by a task that
    /// finishes ticks later.
    pub fn try_send_request<F>(
        &mut self,
        class_id: ClassId,
        payload: &dyn Payload,
        callback: F,
        context: &mut C,
    ) -> Result<DelegateHandle, DispatchError>
    where
        F: FnMut(&mut MessageDispatcher<C>, &Message, &mut C) + 'static,
    {
        self.check_pool_capacity(1)?;
        let handle = self.mint_handle()?;
        let sequence_id = self.mint_sequence_id()?;

        let id = self.entries.insert(DelegateEntry {
            callback: Some(Box::new(callback)),
            handle,
            sequence_id,
            prev: SlotId::NULL,
            next: SlotId::NULL,
            pending_removal: false,
        });
        self.self_link(id);
        self.handle_table.insert(handle, id);
        self.sequence_table.insert(sequence_id, id);
        trace!(
            "request {} ({:?}) sent with sequence {}",
            payload.name(),
            class_id,
            sequence_id
        );

        self.send(class_id, payload, sequence_id, context);
        Ok(handle)
    }

    /// Infallible [`Self::try_send_request`]: degrades to a null handle, the
    /// request is not sent.
    pub fn send_request<F>(
        &mut self,
        class_id: ClassId,
        payload: &dyn Payload,
        callback: F,
        context: &mut C,
    ) -> DelegateHandle
    where
        F: FnMut(&mut MessageDispatcher<C>, &Message, &mut C) + 'static,
    {
        match self.try_send_request(class_id, payload, callback, context) {
            Ok(handle) => handle,
            Err(error) => {
                warn!("send_request for {:?} failed: {}", class_id, error);
                0
            }
        }
    }

    // Consuming messages

    /// Drains `queue` message-by-message in FIFO order. For each message with
    /// a non-zero sequence id, the matching one-shot delegate (if any) fires
    /// exactly once and its binding is erased; whether or not a sequence
    /// match fired, the message then fans out to class subscribers via the
    /// same path as [`Self::send`].
    ///
    /// Drains to empty, including messages posted onto the same queue during
    /// the pass, bounded by [`DispatcherConfig::drain_limit`] per call.
    pub fn dispatch(&mut self, queue: &mut MessageQueue, time_ms: u32, context: &mut C) {
        self.dispatch_time_ms = time_ms;
        let mut drained = 0;
        while drained < self.config.drain_limit {
            self.flush_outbox(queue);
            let Some(message) = queue.pop() else {
                break;
            };
            self.deliver(&message, context);
            drained += 1;
        }
        if drained == self.config.drain_limit && !queue.is_empty() {
            trace!(
                "drain limit {} reached, {} message(s) deferred to the next dispatch",
                self.config.drain_limit,
                queue.len()
            );
        }
    }

    /// The `time_ms` of the dispatch pass currently in flight (or the most
    /// recent one).
    pub fn dispatch_time_ms(&self) -> u32 {
        self.dispatch_time_ms
    }

    // Introspection

    /// Number of live subscribers for a class (sentinel excluded).
    pub fn subscriber_count(&self, class_id: ClassId) -> usize {
        let Some(&head) = self.class_heads.get(&class_id) else {
            return 0;
        };
        let mut count = 0;
        let mut cursor = match self.entries.get(head) {
            Some(sentinel) => sentinel.next,
            None => return 0,
        };
        while cursor != head {
            let Some(entry) = self.entries.get(cursor) else {
                break;
            };
            if !entry.pending_removal {
                count += 1;
            }
            cursor = entry.next;
        }
        count
    }

    /// Total live delegates: class subscribers plus pending one-shot
    /// request delegates.
    pub fn delegate_count(&self) -> usize {
        self.handle_table.len()
    }

    // Internals

    fn deliver(&mut self, message: &Message, context: &mut C) {
        self.fanout_depth += 1;
        let sequence_id = message.sequence_id();
        if sequence_id != 0 {
            // erase the binding before invoking, so a (however implausible)
            // reuse of the sequence id can never double-fire
            if let Some(id) = self.sequence_table.remove(&sequence_id) {
                self.invoke_entry(id, message, context);
                self.remove_slot(id);
            }
        }
        self.fan_out(message, context);
        self.fanout_depth -= 1;
        if self.fanout_depth == 0 {
            self.release_retired();
        }
    }

    fn fan_out(&mut self, message: &Message, context: &mut C) {
        let Some(&head) = self.class_heads.get(&message.class_id()) else {
            // unknown class is not an error, the message is simply unrouted
            trace!(
                "no subscribers for {} ({:?}), message dropped",
                message.payload().name(),
                message.class_id()
            );
            return;
        };
        let mut cursor = match self.entries.get(head) {
            Some(sentinel) => sentinel.next,
            None => return,
        };
        while cursor != head {
            self.invoke_entry(cursor, message, context);
            // read the link after the callback ran: removals during the
            // invocation (of this entry or a later sibling) fix the links
            // up, and tombstones stay resolvable until the fan-out ends
            let Some(entry) = self.entries.get(cursor) else {
                break;
            };
            cursor = entry.next;
        }
    }

    /// Runs one delegate against one message. The callback box is checked
    /// out of the slot for the duration of the call, standing in for the
    /// invocation refcount: the slot visibly stays alive, re-entrant removal
    /// only tombstones it, and a nested fan-out reaching this entry skips it.
    fn invoke_entry(&mut self, id: SlotId, message: &Message, context: &mut C) {
        let Some(entry) = self.entries.get_mut(id) else {
            return;
        };
        if entry.pending_removal {
            return;
        }
        let Some(mut callback) = entry.callback.take() else {
            // sentinel, or already executing further up the stack
            return;
        };

        callback(self, message, context);

        if let Some(entry) = self.entries.get_mut(id) {
            if !entry.pending_removal {
                entry.callback = Some(callback);
            }
        }
    }

    /// Logically removes an entry: neighbors bypass it, both lookup tables
    /// forget it. Its own links stay intact so a fan-out standing on it can
    /// continue; the slot itself is released immediately outside a fan-out,
    /// or when the enclosing fan-out finishes.
    fn remove_slot(&mut self, id: SlotId) {
        let Some(entry) = self.entries.get(id) else {
            return;
        };
        if entry.pending_removal {
            return;
        }
        let (prev, next) = (entry.prev, entry.next);
        let handle = entry.handle;
        let sequence_id = entry.sequence_id;

        if prev != id {
            if let Some(previous) = self.entries.get_mut(prev) {
                previous.next = next;
            }
            if let Some(following) = self.entries.get_mut(next) {
                following.prev = prev;
            }
        }
        self.handle_table.remove(&handle);
        if sequence_id != 0 {
            self.sequence_table.remove(&sequence_id);
        }

        if self.fanout_depth > 0 {
            if let Some(entry) = self.entries.get_mut(id) {
                entry.pending_removal = true;
            }
            self.retired.push(id);
        } else {
            self.entries.remove(id);
        }
        trace!("delegate {} removed", handle);
    }

    fn release_retired(&mut self) {
        let retired = std::mem::take(&mut self.retired);
        for id in retired {
            self.entries.remove(id);
        }
    }

    fn flush_outbox(&mut self, queue: &mut MessageQueue) {
        if self.outbox.is_empty() {
            return;
        }
        for message in std::mem::take(&mut self.outbox) {
            let sequence_id = message.sequence_id();
            let name = message.payload().name();
            if !queue.push_message(message) {
                warn!("queue full, dropped posted message {}", name);
                // a correlated response that can never be delivered must not
                // leave its one-shot delegate dangling
                if sequence_id != 0 {
                    if let Some(&id) = self.sequence_table.get(&sequence_id) {
                        self.remove_slot(id);
                    }
                }
            }
        }
    }

    fn ensure_class_head(&mut self, class_id: ClassId) -> SlotId {
        if let Some(&head) = self.class_heads.get(&class_id) {
            return head;
        }
        let head = self.entries.insert(DelegateEntry {
            callback: None,
            handle: 0,
            sequence_id: 0,
            prev: SlotId::NULL,
            next: SlotId::NULL,
            pending_removal: false,
        });
        self.self_link(head);
        self.class_heads.insert(class_id, head);
        head
    }

    fn self_link(&mut self, id: SlotId) {
        if let Some(entry) = self.entries.get_mut(id) {
            entry.prev = id;
            entry.next = id;
        }
    }

    /// Tail-inserts `id` just before the sentinel, preserving subscription
    /// order as iteration order.
    fn link_before(&mut self, head: SlotId, id: SlotId) {
        let Some(sentinel) = self.entries.get(head) else {
            return;
        };
        let tail = sentinel.prev;
        if let Some(entry) = self.entries.get_mut(id) {
            entry.prev = tail;
            entry.next = head;
        }
        if let Some(previous_tail) = self.entries.get_mut(tail) {
            previous_tail.next = id;
        }
        if let Some(sentinel) = self.entries.get_mut(head) {
            sentinel.prev = id;
        }
    }

    fn check_pool_capacity(&self, slots_needed: usize) -> Result<(), DispatchError> {
        let Some(capacity) = self.config.delegate_capacity else {
            return Ok(());
        };
        if self.entries.len() + slots_needed > capacity {
            return Err(DispatchError::DelegatePoolExhausted { capacity });
        }
        Ok(())
    }

    fn mint_handle(&mut self) -> Result<DelegateHandle, DispatchError> {
        let mut handle = 0;
        for _ in 0..MINT_RETRY_LIMIT {
            handle = self.handle_keys.generate();
            if !self.handle_table.contains_key(&handle) {
                return Ok(handle);
            }
            warn!("delegate handle {} already live, re-minting", handle);
        }
        Err(DispatchError::HandleCollision { handle })
    }

    fn mint_sequence_id(&mut self) -> Result<SequenceId, DispatchError> {
        let mut sequence_id = 0;
        for _ in 0..MINT_RETRY_LIMIT {
            sequence_id = self.sequence_keys.generate();
            if !self.sequence_table.contains_key(&sequence_id) {
                return Ok(sequence_id);
            }
            warn!("sequence id {} still pending, re-minting", sequence_id);
        }
        Err(DispatchError::SequenceCollision { sequence_id })
    }
}

impl<C> Default for MessageDispatcher<C> {
    fn default() -> Self {
        Self::new()
    }
}
