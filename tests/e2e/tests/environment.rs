//! Scene placement under an environment actor

use sim_actors::{ActorError, DrawableId, SceneNode};
use sim_e2e_tests::Harness;
use sim_types::MessageType;

#[test]
fn test_top_level_actors_follow_the_environment() {
    let mut harness = Harness::new("env");
    let x = harness.spawn("X", 1);
    let y = harness.spawn("Y", 1);
    assert_eq!(
        harness.world().scene().parent_of(DrawableId::for_actor(y)),
        Some(SceneNode::Root)
    );

    assert!(harness.world_mut().set_environment_actor(Some(x)).unwrap());
    assert_eq!(harness.world().environment_actor(), Some(x));
    assert_eq!(
        harness.world().scene().parent_of(DrawableId::for_actor(y)),
        Some(SceneNode::Drawable(DrawableId::for_actor(x)))
    );
    assert_eq!(
        harness.world().scene().parent_of(DrawableId::for_actor(x)),
        Some(SceneNode::Root)
    );

    assert!(harness.world_mut().set_environment_actor(None).unwrap());
    assert_eq!(harness.world().environment_actor(), None);
    assert!(harness.world().find_actor(x).is_some());

    let z = harness.spawn("Z", 1);
    assert_eq!(
        harness.world().scene().parent_of(DrawableId::for_actor(z)),
        Some(SceneNode::Root)
    );
    assert_eq!(
        harness.world().scene().parent_of(DrawableId::for_actor(y)),
        Some(SceneNode::Root)
    );

    harness.system.dispatch_queued();
    assert_eq!(harness.collector().count(&MessageType::EnvironmentChanged), 2);
}

#[test]
fn test_removing_the_environment_rehomes_its_drawables() {
    let mut harness = Harness::new("env");
    let x = harness.spawn("X", 1);
    harness.world_mut().set_environment_actor(Some(x)).unwrap();
    let y = harness.spawn("Y", 1);
    assert_eq!(
        harness.world().scene().parent_of(DrawableId::for_actor(y)),
        Some(SceneNode::Drawable(DrawableId::for_actor(x)))
    );

    harness.world_mut().mark_actor_for_removal(x);
    assert_eq!(harness.world().environment_actor(), None);
    harness.system.step(0.1);

    assert!(harness.world().find_actor(x).is_none());
    assert_eq!(
        harness.world().scene().parent_of(DrawableId::for_actor(y)),
        Some(SceneNode::Root)
    );
}

#[test]
fn test_environment_cannot_be_unknown_actor() {
    let mut harness = Harness::new("env");
    let ghost = sim_types::ActorId::new();
    assert!(harness.world_mut().set_environment_actor(Some(ghost)).is_err());
    assert_eq!(harness.world().environment_actor(), None);
}

#[test]
fn test_environment_cannot_be_parented_under_its_own_drawables() {
    let mut harness = Harness::new("env");
    let x = harness.spawn("X", 1);
    harness.world_mut().set_environment_actor(Some(x)).unwrap();
    let y = harness.spawn("Y", 1);

    let err = harness.world_mut().set_parent_actor(x, Some(y)).unwrap_err();
    assert!(matches!(err, ActorError::HierarchyCycle { .. }));
    assert_eq!(harness.world().find_actor(x).unwrap().parent(), None);
    assert!(harness.world().find_actor(y).unwrap().children().is_empty());
    assert_eq!(
        harness.world().scene().parent_of(DrawableId::for_actor(x)),
        Some(SceneNode::Root)
    );
    assert_eq!(
        harness.world().scene().parent_of(DrawableId::for_actor(y)),
        Some(SceneNode::Drawable(DrawableId::for_actor(x)))
    );
}
