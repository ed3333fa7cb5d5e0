//! Property tests over the queue/dispatch pipeline.
//!
//! Key invariants:
//! 1. Dispatch delivers messages in exactly the push order
//! 2. A bounded queue keeps the oldest messages and never overflows
//! 3. Every correlated request fires its one-shot exactly once

use proptest::prelude::*;

use axon_test::helpers::protocol::{
    CreateEntity, EntityCreated, EntityMoved, CREATE_ENTITY, ENTITY_CREATED, ENTITY_MOVED,
};
use axon_test::TestEngine;

proptest! {
    #[test]
    fn prop_dispatch_preserves_push_order(ids in prop::collection::vec(0u32..1000, 0..64)) {
        let mut engine = TestEngine::with_queue_capacity(64);
        let recorder = engine.recorder();

        let seen = recorder.clone();
        engine.dispatcher.subscribe(ENTITY_MOVED, move |_dispatcher, message, _context| {
            let moved = message.payload_as::<EntityMoved>().unwrap();
            seen.record(moved.entity_id.to_string());
        });

        for id in &ids {
            let accepted = engine.push(ENTITY_MOVED, &EntityMoved { entity_id: *id, x: 0, y: 0 });
            prop_assert!(accepted);
        }
        engine.tick(16);

        let expected: Vec<String> = ids.iter().map(u32::to_string).collect();
        prop_assert_eq!(recorder.entries(), expected);
        prop_assert_eq!(engine.queued_len(), 0);
    }

    #[test]
    fn prop_bounded_queue_keeps_the_oldest(capacity in 1usize..16, extra in 0usize..16) {
        let mut engine = TestEngine::with_queue_capacity(capacity);
        let recorder = engine.recorder();

        let seen = recorder.clone();
        engine.dispatcher.subscribe(ENTITY_MOVED, move |_dispatcher, message, _context| {
            let moved = message.payload_as::<EntityMoved>().unwrap();
            seen.record(moved.entity_id.to_string());
        });

        for id in 0..capacity + extra {
            let accepted = engine.push(
                ENTITY_MOVED,
                &EntityMoved { entity_id: id as u32, x: 0, y: 0 },
            );
            // pushes past capacity are dropped, nothing is evicted
            prop_assert_eq!(accepted, id < capacity);
        }
        engine.tick(16);

        let expected: Vec<String> = (0..capacity).map(|id| id.to_string()).collect();
        prop_assert_eq!(recorder.entries(), expected);
    }

    #[test]
    fn prop_one_shot_fires_exactly_once(request_count in 1usize..12, noise_count in 0usize..12) {
        let mut engine = TestEngine::with_queue_capacity(64);
        let recorder = engine.recorder();

        engine.dispatcher.subscribe(CREATE_ENTITY, move |dispatcher, message, _context| {
            dispatcher.post_response(
                ENTITY_CREATED,
                &EntityCreated { entity_id: message.sequence_id() },
                message.sequence_id(),
            );
        });

        for request in 0..request_count {
            let responses = recorder.clone();
            engine.dispatcher.send_request(
                CREATE_ENTITY,
                &CreateEntity { archetype: format!("kind-{}", request) },
                move |_dispatcher, _message, _context| {
                    responses.record(format!("response:{}", request));
                },
                &mut engine.context,
            );
        }
        // uncorrelated traffic interleaved with the requests
        for id in 0..noise_count {
            engine.push(ENTITY_MOVED, &EntityMoved { entity_id: id as u32, x: 1, y: 1 });
        }

        engine.run(2, 16);

        for request in 0..request_count {
            prop_assert_eq!(recorder.count_of(&format!("response:{}", request)), 1);
        }
        prop_assert_eq!(engine.queued_len(), 0);
        // every one-shot is spent, only the responder remains
        prop_assert_eq!(engine.dispatcher.delegate_count(), 1);
    }
}
