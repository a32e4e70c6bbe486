//! Repeating timers driven by the scheduler and by the actor system

use proptest::prelude::*;
use sim_actors::test_utils::MessageCollector;
use sim_actors::{ActorSystem, ComponentPriority, InMemorySceneGraph, SimContext, TimerScheduler};
use sim_types::{
    seconds_to_micros, MachineInfo, Message, MessageFactory, MessageType, TimerElapsedPayload,
};

const SECOND: u64 = 1_000_000;

fn late_times(messages: &[Message]) -> Vec<f64> {
    messages
        .iter()
        .map(|m| m.payload::<TimerElapsedPayload>().unwrap().late_time)
        .collect()
}

#[test]
fn test_heartbeat_catches_up_one_interval_per_pass() {
    let factory = MessageFactory::new(MachineInfo::new("timers"));
    let mut timers = TimerScheduler::new();
    assert!(timers.set_timer("heartbeat", None, 0, 5.0, true));

    let first = timers.process_timers(12 * SECOND, &factory);
    assert_eq!(first.len(), 1);
    assert!((late_times(&first)[0] - 7.0).abs() < 1e-9);
    assert_eq!(
        timers.find("heartbeat", None).unwrap().fire_time_us,
        10 * SECOND
    );

    let second = timers.process_timers(12 * SECOND, &factory);
    assert_eq!(second.len(), 1);
    assert!((late_times(&second)[0] - 2.0).abs() < 1e-9);
    assert_eq!(
        timers.find("heartbeat", None).unwrap().fire_time_us,
        15 * SECOND
    );

    assert!(timers.process_timers(12 * SECOND, &factory).is_empty());
}

#[test]
fn test_one_shot_timer_is_dropped_after_firing() {
    let factory = MessageFactory::new(MachineInfo::new("timers"));
    let mut timers = TimerScheduler::new();
    timers.set_timer("once", None, 0, 1.0, false);

    assert_eq!(timers.process_timers(SECOND, &factory).len(), 1);
    assert!(timers.is_empty());
}

#[test]
fn test_system_delivers_timer_messages() {
    let mut system = ActorSystem::new(
        SimContext::new(MachineInfo::new("timers")),
        Box::new(InMemorySceneGraph::new()),
    );
    system
        .add_component(Box::new(MessageCollector::new()), ComponentPriority::LOWEST)
        .unwrap();
    system.world_mut().set_timer("pulse", None, 0.5, true, false);

    for _ in 0..20 {
        system.step(0.1);
    }

    let collector = system
        .component::<MessageCollector>(MessageCollector::NAME)
        .unwrap();
    assert_eq!(collector.count(&MessageType::TimerElapsed), 4);
}

proptest! {
    #[test]
    fn prop_timers_fire_in_time_order(intervals in prop::collection::vec(1u32..1000, 1..20)) {
        let factory = MessageFactory::new(MachineInfo::new("timers"));
        let mut timers = TimerScheduler::new();
        for (i, interval) in intervals.iter().enumerate() {
            timers.set_timer(&format!("t{}", i), None, 0, f64::from(*interval) / 1000.0, false);
        }

        let fired = timers.process_timers(seconds_to_micros(1.0), &factory);
        prop_assert_eq!(fired.len(), intervals.len());
        let late = late_times(&fired);
        prop_assert!(late.windows(2).all(|w| w[0] >= w[1]));
    }
}
