//! Actor lifecycle across the registry, dispatch and deferred deletion

use sim_actors::{ActorComponent, ActorContext, ActorError, ActorProxy};
use sim_e2e_tests::{unit_type, unit_with_id, Harness};
use sim_types::{ActorId, MachineInfo, MessageFactory, MessageType};

struct Unpublishable;

impl ActorComponent for Unpublishable {
    fn component_type(&self) -> &'static str {
        "unpublishable"
    }

    fn on_publish(&mut self, _ctx: &mut ActorContext<'_>) -> sim_actors::Result<()> {
        Err(ActorError::component_failed("unpublishable", "refused"))
    }
}

#[test]
fn test_failed_publish_rolls_back_the_actor() {
    let mut harness = Harness::new("lifecycle");
    let mut actor = ActorProxy::new("doomed", unit_type());
    actor.add_component(Box::new(Unpublishable)).unwrap();
    let id = actor.id();

    let err = harness.world_mut().add_actor(actor, false, true).unwrap_err();
    assert!(err.is_rolled_back());
    assert!(harness.world().find_actor(id).is_none());

    harness.system.step(0.1);
    assert!(harness.world().registry().get(id).is_none());
    assert_eq!(harness.collector().count(&MessageType::ActorPublished), 0);
    assert_eq!(harness.collector().count(&MessageType::ActorDeleted), 1);
}

#[test]
fn test_deleting_a_parent_cascades_to_children() {
    let mut harness = Harness::new("lifecycle");
    let parent = harness.spawn("parent", 1);
    let first = harness.spawn("first", 1);
    let second = harness.spawn("second", 1);
    harness.world_mut().set_parent_actor(first, Some(parent)).unwrap();
    harness.world_mut().set_parent_actor(second, Some(parent)).unwrap();
    harness.system.dispatch_queued();
    harness.clear_messages();

    assert!(harness.world_mut().mark_actor_for_removal(parent));
    assert!(!harness.world_mut().mark_actor_for_removal(parent));
    harness.system.step(0.1);

    for id in [parent, first, second] {
        assert!(harness.world().registry().get(id).is_none());
    }
    let deleted: Vec<ActorId> = harness
        .collector()
        .of_type(&MessageType::ActorDeleted)
        .into_iter()
        .filter_map(|m| m.about_actor())
        .collect();
    assert_eq!(deleted, vec![parent, second, first]);
}

#[test]
fn test_reparenting_to_the_same_parent_is_a_duplicate() {
    let mut harness = Harness::new("lifecycle");
    let parent = harness.spawn("parent", 1);
    let child = harness.spawn("child", 1);
    harness.world_mut().set_parent_actor(child, Some(parent)).unwrap();

    let err = harness
        .world_mut()
        .set_parent_actor(child, Some(parent))
        .unwrap_err();
    assert!(err.is_duplicate());
    assert_eq!(
        harness.world().find_actor(parent).unwrap().children(),
        &[child]
    );
}

#[test]
fn test_double_add_is_ignored() {
    let mut harness = Harness::new("lifecycle");
    let id = harness.spawn("once", 1);
    let again = unit_with_id(id, "twice", 2);

    assert_eq!(harness.world_mut().add_actor(again, false, false).unwrap(), id);
    assert_eq!(harness.world().find_actor(id).unwrap().name(), "once");
    assert_eq!(harness.health(id), Some(1));
}

#[test]
fn test_foreign_updates_create_remote_actors() {
    let mut harness = Harness::new("lifecycle");
    let remote = ActorId::new();
    let update = unit_with_id(remote, "visitor", 30).populate_update();

    let message = MessageFactory::new(MachineInfo::new("peer"))
        .create_with(MessageType::ActorCreated, &update)
        .unwrap()
        .with_about_actor(remote);
    harness.system.send_message(message);
    harness.system.dispatch_queued();

    let actor = harness.world().find_actor(remote).expect("remote proxy");
    assert!(actor.is_remote());
    assert_eq!(harness.health(remote), Some(30));
}
