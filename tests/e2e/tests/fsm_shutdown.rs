//! Application state machine driven through the message bus

use sim_actors::test_utils::MessageCollector;
use sim_actors::{
    ActorSystem, ComponentPriority, EventId, InMemorySceneGraph, ShutdownObserver, SimContext,
    StateId, StateMachine, StepOutcome,
};
use sim_types::{MachineInfo, MessageType, StateChangedPayload, StateTransitionRequest};

const A: StateId = StateId::from_static("A");
const B: StateId = StateId::from_static("B");
const DONE: StateId = StateId::from_static("Done");
const E: EventId = EventId::from_static("E");
const QUIT: EventId = EventId::from_static("Quit");

fn system() -> ActorSystem {
    let mut system = ActorSystem::new(
        SimContext::new(MachineInfo::new("fsm")),
        Box::new(InMemorySceneGraph::new()),
    );
    let mut machine = StateMachine::new("app");
    machine.add_transition(E, A, B);
    machine.add_transition(QUIT, B, DONE);
    assert!(machine.set_current_state(&A, system.world_mut()));

    system
        .add_component(Box::new(machine), ComponentPriority::NORMAL)
        .unwrap();
    system
        .add_component(
            Box::new(ShutdownObserver::new(DONE).for_machine("app")),
            ComponentPriority::LOWER,
        )
        .unwrap();
    system
        .add_component(Box::new(MessageCollector::new()), ComponentPriority::LOWEST)
        .unwrap();
    system
}

fn fire(system: &mut ActorSystem, event: &str) {
    let message = system
        .world()
        .message_factory()
        .create_with(
            MessageType::RequestStateTransition,
            &StateTransitionRequest {
                event: event.to_string(),
                machine: Some("app".to_string()),
            },
        )
        .unwrap();
    system.send_message(message);
    system.dispatch_queued();
}

fn changes(system: &ActorSystem) -> Vec<StateChangedPayload> {
    system
        .component::<MessageCollector>(MessageCollector::NAME)
        .unwrap()
        .of_type(&MessageType::StateChanged)
        .into_iter()
        .map(|m| m.payload().unwrap())
        .collect()
}

#[test]
fn test_transition_broadcasts_one_state_change() {
    let mut system = system();
    fire(&mut system, "E");

    let changes = changes(&system);
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].old_state, "A");
    assert_eq!(changes[0].new_state, "B");
    assert_eq!(changes[0].event, "E");
    let machine = system.component::<StateMachine>("app").unwrap();
    assert_eq!(machine.current_state(), Some(&B));
}

#[test]
fn test_missing_transition_changes_nothing() {
    let mut system = system();
    fire(&mut system, "E");
    fire(&mut system, "E");

    assert_eq!(changes(&system).len(), 1);
    let machine = system.component::<StateMachine>("app").unwrap();
    assert_eq!(machine.current_state(), Some(&B));
}

#[test]
fn test_requests_for_other_machines_are_ignored() {
    let mut system = system();
    let message = system
        .world()
        .message_factory()
        .create_with(
            MessageType::RequestStateTransition,
            &StateTransitionRequest {
                event: "E".to_string(),
                machine: Some("other".to_string()),
            },
        )
        .unwrap();
    system.send_message(message);
    system.dispatch_queued();

    assert!(changes(&system).is_empty());
}

#[test]
fn test_entering_the_shutdown_state_stops_the_loop() {
    let mut system = system();
    assert_eq!(system.step(0.1), StepOutcome::Continue);

    fire(&mut system, "E");
    fire(&mut system, "Quit");
    assert!(system.world().is_quit_requested());
    assert_eq!(system.step(0.1), StepOutcome::Shutdown);
}
