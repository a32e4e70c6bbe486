//! Record a session, then restore the world from keyframes during playback

use sim_e2e_tests::Harness;
use sim_replay::{KeyframeList, KeyframeRequest, LogKeyframe, LogState, MemoryLogStream};
use sim_types::MessageType;

fn keyframes(harness: &mut Harness) -> Vec<LogKeyframe> {
    harness.request(MessageType::LogRequestGetKeyframes);
    harness
        .collector()
        .of_type(&MessageType::LogInfoKeyframes)
        .last()
        .expect("keyframe list reply")
        .payload::<KeyframeList>()
        .unwrap()
        .keyframes
}

#[test]
fn test_jump_restores_keyframe_state() {
    let mut harness = Harness::with_recorder("recording", Box::new(MemoryLogStream::new()));
    let p = harness.spawn("P", 100);
    let q = harness.spawn("Q", 40);

    harness.request(MessageType::LogRequestChangeStateRecord);
    assert_eq!(harness.recorder().state(), LogState::Record);

    harness.run_until(10.0);
    harness.set_health(p, 75);
    harness.request_with(
        MessageType::LogRequestCaptureKeyframe,
        &KeyframeRequest {
            keyframe: LogKeyframe::new("t10"),
        },
    );

    harness.set_health(p, 10);
    assert!(harness.world_mut().mark_actor_for_removal(q));
    harness.run_until(12.0);
    assert!(harness.world().find_actor(q).is_none());

    harness.request(MessageType::LogRequestChangeStateIdle);
    harness.request(MessageType::LogRequestChangeStatePlayback);
    assert_eq!(harness.recorder().state(), LogState::Playback);

    // Playback starts from the first keyframe
    assert_eq!(harness.world().simulation_time(), 0.0);
    assert_eq!(harness.health(p), Some(100));
    assert_eq!(harness.health(q), Some(40));

    assert!(harness.world_mut().mark_actor_for_removal(q));
    let r = harness.spawn("R", 1);
    harness.set_health(p, 5);

    let t10 = keyframes(&mut harness)
        .into_iter()
        .find(|k| k.name == "t10")
        .expect("t10 keyframe is indexed");
    harness.request_with(
        MessageType::LogRequestJumpToKeyframe,
        &KeyframeRequest { keyframe: t10 },
    );

    assert_eq!(harness.world().simulation_time(), 10.0);
    assert_eq!(harness.health(p), Some(75));
    assert_eq!(harness.health(q), Some(40));
    assert!(harness.world().find_actor(r).is_none());
    assert!(!harness.world().clock().is_paused());

    let markers = harness
        .collector()
        .of_type(&MessageType::LogEndKeyframeTransaction)
        .len();
    assert!(markers >= 2);

    // The recorded deletion of Q follows the keyframe
    harness.system.step(0.1);
    harness.system.step(0.1);
    assert!(harness.world().find_actor(q).is_none());
}

#[test]
fn test_leaving_playback_removes_recreated_actors() {
    let mut harness = Harness::with_recorder("recording", Box::new(MemoryLogStream::new()));
    let q = harness.spawn("Q", 40);

    harness.request(MessageType::LogRequestChangeStateRecord);
    harness.run_until(1.0);
    harness.world_mut().mark_actor_for_removal(q);
    harness.run_until(2.0);
    harness.request(MessageType::LogRequestChangeStateIdle);

    harness.request(MessageType::LogRequestChangeStatePlayback);
    assert!(harness.recorder().is_playback_actor(q));
    assert_eq!(harness.health(q), Some(40));

    harness.request(MessageType::LogRequestChangeStateIdle);
    assert_eq!(harness.recorder().state(), LogState::Idle);
    assert!(harness.world().find_actor(q).is_none());
    assert!(harness.recorder().playback_actors().is_empty());
}

#[test]
fn test_invalid_transition_is_rejected() {
    let mut harness = Harness::with_recorder("recording", Box::new(MemoryLogStream::new()));
    harness.request(MessageType::LogRequestChangeStateRecord);
    harness.request(MessageType::LogRequestChangeStatePlayback);

    assert_eq!(harness.recorder().state(), LogState::Record);
    assert_eq!(harness.collector().count(&MessageType::RequestRejected), 1);
}
