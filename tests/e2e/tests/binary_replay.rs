//! Record to binary log files and play them back in a fresh process state

use sim_e2e_tests::Harness;
use sim_replay::{BinaryLogStream, LogList, LogState, LogStatusPayload, DEFAULT_LOG_NAME};
use sim_types::MessageType;
use tempfile::tempdir;

fn ping() -> MessageType {
    MessageType::Custom("ping".to_string())
}

#[test]
fn test_binary_log_replays_in_a_new_system() {
    let dir = tempdir().unwrap();

    let mut recording = Harness::with_recorder(
        "recording",
        Box::new(BinaryLogStream::new(dir.path())),
    );
    let p = recording.spawn("P", 50);
    recording.request(MessageType::LogRequestChangeStateRecord);
    recording.run_until(1.0);
    recording.request(ping());
    recording.run_until(2.0);
    recording.request(MessageType::LogRequestChangeStateIdle);
    assert_eq!(recording.recorder().state(), LogState::Idle);
    drop(recording);

    let stream = BinaryLogStream::new(dir.path());
    assert!(stream.log_path(DEFAULT_LOG_NAME).exists());
    assert!(stream.index_path(DEFAULT_LOG_NAME).exists());

    let mut viewer = Harness::with_recorder("viewer", Box::new(stream));
    viewer.request(MessageType::LogRequestGetLogs);
    let logs: LogList = viewer
        .collector()
        .of_type(&MessageType::LogInfoLogs)
        .last()
        .unwrap()
        .payload()
        .unwrap();
    assert_eq!(logs.logs, vec![DEFAULT_LOG_NAME.to_string()]);

    viewer.request(MessageType::LogRequestChangeStatePlayback);
    assert_eq!(viewer.recorder().state(), LogState::Playback);
    assert!(viewer.recorder().is_playback_actor(p));
    assert_eq!(viewer.health(p), Some(50));
    assert_eq!(viewer.world().find_actor(p).unwrap().name(), "P");

    for _ in 0..15 {
        viewer.system.step(0.1);
    }

    let replayed = viewer.collector().of_type(&ping());
    assert_eq!(replayed.len(), 1);
    assert_eq!(replayed[0].sender(), viewer.recorder().playback_identity());

    // End of stream pauses the clock and reports once
    assert!(viewer.world().clock().is_paused());
    let paused_at = viewer.world().simulation_time();
    viewer.system.step(0.1);
    assert_eq!(viewer.world().simulation_time(), paused_at);

    let statuses = viewer.collector().of_type(&MessageType::LogInfoStatus);
    let last: LogStatusPayload = statuses.last().unwrap().payload().unwrap();
    assert_eq!(last.status.state, LogState::Playback);
    assert!(last.status.num_messages >= 1);

    viewer.request(MessageType::LogRequestChangeStateIdle);
    assert!(viewer.world().find_actor(p).is_none());
    assert!(!viewer.world().clock().is_paused());
}

#[test]
fn test_playback_of_missing_log_is_rejected() {
    let dir = tempdir().unwrap();
    let mut viewer = Harness::with_recorder("viewer", Box::new(BinaryLogStream::new(dir.path())));

    viewer.request(MessageType::LogRequestChangeStatePlayback);

    assert_eq!(viewer.recorder().state(), LogState::Idle);
    assert_eq!(viewer.collector().count(&MessageType::RequestRejected), 1);
}
