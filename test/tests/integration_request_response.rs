//! Request/response correlation: a requester registers a one-shot delegate
//! and sends the request via the immediate path, a responder answers from
//! inside its own delegate via `post_response`, and the next dispatch pass
//! resolves the one-shot against the response.

use axon_test::helpers::protocol::{CreateEntity, EntityCreated, CREATE_ENTITY, ENTITY_CREATED};
use axon_test::TestEngine;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Wires the standard responder: every `CreateEntity` command is answered
/// with an `EntityCreated` result carrying the request's sequence id.
fn install_responder(engine: &mut TestEngine, entity_id: u32) {
    let recorder = engine.recorder();
    engine
        .dispatcher
        .subscribe(CREATE_ENTITY, move |dispatcher, message, _context| {
            let request = message.payload_as::<CreateEntity>().unwrap();
            recorder.record(format!("spawn:{}", request.archetype));
            dispatcher.post_response(
                ENTITY_CREATED,
                &EntityCreated { entity_id },
                message.sequence_id(),
            );
        });
}

#[test]
fn response_resolves_the_one_shot() {
    init_logger();
    let mut engine = TestEngine::new();
    let recorder = engine.recorder();
    install_responder(&mut engine, 7);

    let requester = recorder.clone();
    engine.dispatcher.send_request(
        CREATE_ENTITY,
        &CreateEntity {
            archetype: "goblin".into(),
        },
        move |_dispatcher, message, _context| {
            let result = message.payload_as::<EntityCreated>().unwrap();
            requester.record(format!("created:{}", result.entity_id));
        },
        &mut engine.context,
    );

    // the request fanned out synchronously; the response is still in flight
    assert_eq!(recorder.entries(), vec!["spawn:goblin"]);
    assert_eq!(engine.dispatcher.delegate_count(), 2);

    engine.tick(16);

    assert_eq!(recorder.entries(), vec!["spawn:goblin", "created:7"]);
    assert_eq!(engine.queued_len(), 0);
    // the one-shot is spent, only the responder remains
    assert_eq!(engine.dispatcher.delegate_count(), 1);
}

#[test]
fn response_also_fans_out_to_class_subscribers() {
    init_logger();
    let mut engine = TestEngine::new();
    let recorder = engine.recorder();
    install_responder(&mut engine, 3);

    let observer = recorder.clone();
    engine
        .dispatcher
        .subscribe(ENTITY_CREATED, move |_dispatcher, message, _context| {
            let result = message.payload_as::<EntityCreated>().unwrap();
            observer.record(format!("observed:{}", result.entity_id));
        });

    let requester = recorder.clone();
    engine.dispatcher.send_request(
        CREATE_ENTITY,
        &CreateEntity {
            archetype: "imp".into(),
        },
        move |_dispatcher, _message, _context| {
            requester.record("created");
        },
        &mut engine.context,
    );

    engine.tick(16);

    // the one-shot fires first, then the class subscribers see the result
    assert_eq!(recorder.entries(), vec!["spawn:imp", "created", "observed:3"]);
}

#[test]
fn duplicate_responses_fire_the_one_shot_once() {
    init_logger();
    let mut engine = TestEngine::new();
    let recorder = engine.recorder();

    // misbehaving responder answers the same request twice
    engine
        .dispatcher
        .subscribe(CREATE_ENTITY, move |dispatcher, message, _context| {
            let sequence_id = message.sequence_id();
            dispatcher.post_response(ENTITY_CREATED, &EntityCreated { entity_id: 1 }, sequence_id);
            dispatcher.post_response(ENTITY_CREATED, &EntityCreated { entity_id: 1 }, sequence_id);
        });

    let requester = recorder.clone();
    engine.dispatcher.send_request(
        CREATE_ENTITY,
        &CreateEntity {
            archetype: "wisp".into(),
        },
        move |_dispatcher, _message, _context| {
            requester.record("created");
        },
        &mut engine.context,
    );

    engine.tick(16);

    assert_eq!(recorder.count_of("created"), 1);
    assert_eq!(engine.queued_len(), 0);
    assert_eq!(engine.dispatcher.delegate_count(), 1);
}

#[test]
fn pending_request_can_be_abandoned() {
    init_logger();
    let mut engine = TestEngine::new();
    let recorder = engine.recorder();
    install_responder(&mut engine, 9);

    let requester = recorder.clone();
    let handle = engine.dispatcher.send_request(
        CREATE_ENTITY,
        &CreateEntity {
            archetype: "ogre".into(),
        },
        move |_dispatcher, _message, _context| {
            requester.record("created");
        },
        &mut engine.context,
    );

    // requester loses interest before the response is dispatched
    engine.dispatcher.remove(handle);
    engine.tick(16);

    assert!(recorder.contains("spawn:ogre"));
    assert!(!recorder.contains("created"));
    assert_eq!(engine.dispatcher.delegate_count(), 1);
}

#[test]
fn queued_request_callback_acks_the_request_itself() {
    init_logger();
    let mut engine = TestEngine::new();
    let recorder = engine.recorder();
    install_responder(&mut engine, 5);

    // the queued-path callback is a processed-notification: it fires when
    // the request message is dispatched, before the responder's fan-out,
    // and receives the request body
    let ack = recorder.clone();
    let queue = engine.queue();
    engine.dispatcher.queue_request(
        &mut queue.borrow_mut(),
        CREATE_ENTITY,
        &CreateEntity {
            archetype: "slime".into(),
        },
        move |_dispatcher, message, _context| {
            let request = message.payload_as::<CreateEntity>().unwrap();
            ack.record(format!("ack:{}", request.archetype));
        },
    );

    engine.tick(16);

    assert_eq!(recorder.entries(), vec!["ack:slime", "spawn:slime"]);
    assert_eq!(engine.dispatcher.delegate_count(), 1);
}
