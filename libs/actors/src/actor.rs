//! # Actor Proxies and Components
//!
//! An [`ActorProxy`] is the runtime's handle on one simulation entity: identity,
//! a property bag, an optional drawable in the scene graph, a parent/child
//! hierarchy and a list of pluggable [`ActorComponent`] behaviours.
//!
//! ## Component Lifecycle
//!
//! ```text
//! constructed ──► on_added_to_actor ──► on_entered_world ──► on_removed_from_world ──► on_removed_from_actor
//!                                        (only once the owner is registered)
//! ```
//!
//! Components are handed an [`ActorContext`] while their owner's hooks run.
//! During that window the owner's component list is detached from the proxy,
//! so a hook sees the rest of the world but not its sibling components.

use crate::error::{ActorError, Result};
use crate::scene::DrawableId;
use crate::world::World;
use sim_types::{
    ActorId, ActorType, ActorUpdatePayload, Message, MessageType, ParameterValue, Parameters,
    TickPayload,
};
use std::any::Any;

/// Upcast to `Any` so components can be downcast to their concrete type
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Pluggable behaviour attached to exactly one actor
pub trait ActorComponent: AsAny {
    /// Type name; an actor holds at most one component per type
    fn component_type(&self) -> &'static str;

    fn on_added_to_actor(&mut self, _owner: ActorId) {}

    fn on_removed_from_actor(&mut self, _owner: ActorId) {}

    fn on_entered_world(&mut self, _ctx: &mut ActorContext<'_>) -> Result<()> {
        Ok(())
    }

    fn on_removed_from_world(&mut self, _ctx: &mut ActorContext<'_>) {}

    /// Called while the owner is being published; an error aborts world entry
    fn on_publish(&mut self, _ctx: &mut ActorContext<'_>) -> Result<()> {
        Ok(())
    }

    fn on_tick(&mut self, _ctx: &mut ActorContext<'_>, _tick: &TickPayload) {}

    /// Messages about the owning actor
    fn process_message(&mut self, _ctx: &mut ActorContext<'_>, _message: &Message) -> Result<()> {
        Ok(())
    }

    /// Contribute properties to an actor update
    fn populate_update(&self, _properties: &mut Parameters) {}

    /// Read back properties from an actor update
    fn apply_update(&mut self, _properties: &Parameters) {}
}

/// Back-reference from a component to its owning actor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OwnerRef(Option<ActorId>);

impl OwnerRef {
    pub fn attach(&mut self, owner: ActorId) {
        self.0 = Some(owner);
    }

    pub fn detach(&mut self) {
        self.0 = None;
    }

    pub fn get(&self) -> Option<ActorId> {
        self.0
    }

    /// Owner id, or an invalid-state error naming the component
    pub fn require(&self, component: &str) -> Result<ActorId> {
        self.0.ok_or_else(|| ActorError::ComponentWithoutOwner {
            component: component.to_string(),
        })
    }
}

/// What an actor component sees of the world while one of its hooks runs
pub struct ActorContext<'w> {
    actor: ActorId,
    world: &'w mut World,
}

impl<'w> ActorContext<'w> {
    pub(crate) fn new(actor: ActorId, world: &'w mut World) -> Self {
        Self { actor, world }
    }

    pub fn actor_id(&self) -> ActorId {
        self.actor
    }

    pub fn world(&self) -> &World {
        &*self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut *self.world
    }

    /// New message about (and sent by) the owning actor
    pub fn create_message(&self, message_type: MessageType) -> Message {
        self.world
            .create_message(message_type)
            .with_about_actor(self.actor)
            .with_sending_actor(self.actor)
    }

    pub fn send_message(&mut self, message: Message) {
        self.world.send_message(message);
    }

    /// Schedule a simulation-time timer about the owning actor
    pub fn set_timer(&mut self, name: &str, interval_secs: f64, repeat: bool) -> bool {
        self.world
            .set_timer(name, Some(self.actor), interval_secs, repeat, false)
    }

    pub fn clear_timer(&mut self, name: &str) -> bool {
        self.world.clear_timer(name, Some(self.actor))
    }

    pub fn simulation_time(&self) -> f64 {
        self.world.simulation_time()
    }
}

/// Runtime handle on one simulation entity
pub struct ActorProxy {
    id: ActorId,
    name: String,
    actor_type: ActorType,
    drawable: Option<DrawableId>,
    parent: Option<ActorId>,
    children: Vec<ActorId>,
    properties: Parameters,
    pub(crate) components: Vec<Box<dyn ActorComponent>>,
    in_registry: bool,
    remote: bool,
    published: bool,
    deleted: bool,
}

impl std::fmt::Debug for ActorProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorProxy")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("actor_type", &self.actor_type)
            .field("components", &self.component_types())
            .field("in_registry", &self.in_registry)
            .field("remote", &self.remote)
            .field("published", &self.published)
            .field("deleted", &self.deleted)
            .finish()
    }
}

impl ActorProxy {
    /// New actor with a fresh id and a drawable of its own
    pub fn new(name: impl Into<String>, actor_type: ActorType) -> Self {
        Self::with_id(ActorId::new(), name, actor_type)
    }

    /// New actor under a known id, e.g. when recreated from a keyframe
    pub fn with_id(id: ActorId, name: impl Into<String>, actor_type: ActorType) -> Self {
        Self {
            id,
            name: name.into(),
            actor_type,
            drawable: Some(DrawableId::for_actor(id)),
            parent: None,
            children: Vec::new(),
            properties: Parameters::new(),
            components: Vec::new(),
            in_registry: false,
            remote: false,
            published: false,
            deleted: false,
        }
    }

    /// Actors without a visual representation never touch the scene graph
    pub fn without_drawable(mut self) -> Self {
        self.drawable = None;
        self
    }

    pub fn with_property(
        mut self,
        name: impl Into<String>,
        value: impl Into<ParameterValue>,
    ) -> Self {
        self.properties.set(name, value);
        self
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn actor_type(&self) -> &ActorType {
        &self.actor_type
    }

    pub fn drawable(&self) -> Option<DrawableId> {
        self.drawable
    }

    pub fn properties(&self) -> &Parameters {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&ParameterValue> {
        self.properties.get(name)
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<ParameterValue>) {
        self.properties.set(name, value);
    }

    pub fn is_in_registry(&self) -> bool {
        self.in_registry
    }

    pub fn is_remote(&self) -> bool {
        self.remote
    }

    pub fn is_published(&self) -> bool {
        self.published
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Flag a not-yet-registered actor as owned by another machine
    pub fn set_remote(&mut self, remote: bool) {
        self.remote = remote;
    }

    /// Flag a not-yet-registered actor to be published on world entry
    pub fn set_published(&mut self, published: bool) {
        self.published = published;
    }

    pub(crate) fn mark_registered(&mut self) {
        self.in_registry = true;
        self.deleted = false;
    }

    pub(crate) fn mark_deleted(&mut self) {
        self.in_registry = false;
        self.deleted = true;
    }

    pub(crate) fn mark_published(&mut self) {
        self.published = true;
    }

    // Hierarchy

    pub fn parent(&self) -> Option<ActorId> {
        self.parent
    }

    pub fn children(&self) -> &[ActorId] {
        &self.children
    }

    pub(crate) fn set_parent(&mut self, parent: Option<ActorId>) {
        self.parent = parent;
    }

    /// Add a hierarchical child; adding the same child twice is rejected
    pub fn add_child(&mut self, child: ActorId) -> Result<()> {
        if self.children.contains(&child) {
            return Err(ActorError::DuplicateChild {
                parent: self.id,
                child,
            });
        }
        self.children.push(child);
        Ok(())
    }

    pub fn remove_child(&mut self, child: ActorId) -> bool {
        let before = self.children.len();
        self.children.retain(|c| *c != child);
        before != self.children.len()
    }

    // Components

    /// Attach a component to an actor that is not in a world yet
    ///
    /// Use [`World::add_component_to_actor`] for registered actors so the
    /// entered-world hook runs as well.
    pub fn add_component(&mut self, mut component: Box<dyn ActorComponent>) -> Result<()> {
        let component_type = component.component_type();
        if self.has_component(component_type) {
            return Err(ActorError::DuplicateActorComponent {
                actor: self.id,
                component: component_type.to_string(),
            });
        }
        component.on_added_to_actor(self.id);
        self.components.push(component);
        Ok(())
    }

    /// Detach a component from an actor that is not in a world
    pub fn remove_component(&mut self, component_type: &str) -> Option<Box<dyn ActorComponent>> {
        let index = self
            .components
            .iter()
            .position(|c| c.component_type() == component_type)?;
        let mut component = self.components.remove(index);
        component.on_removed_from_actor(self.id);
        Some(component)
    }

    pub fn has_component(&self, component_type: &str) -> bool {
        self.components
            .iter()
            .any(|c| c.component_type() == component_type)
    }

    pub fn component_types(&self) -> Vec<&'static str> {
        self.components.iter().map(|c| c.component_type()).collect()
    }

    /// Typed access to a component
    pub fn component<T: ActorComponent>(&self) -> Option<&T> {
        self.components.iter().find_map(|c| {
            let component: &dyn ActorComponent = c.as_ref();
            component.as_any().downcast_ref::<T>()
        })
    }

    pub fn component_mut<T: ActorComponent>(&mut self) -> Option<&mut T> {
        self.components.iter_mut().find_map(|c| {
            let component: &mut dyn ActorComponent = c.as_mut();
            component.as_any_mut().downcast_mut::<T>()
        })
    }

    // Updates

    /// Full state of this actor as an update record
    pub fn populate_update(&self) -> ActorUpdatePayload {
        let mut properties = self.properties.clone();
        for component in &self.components {
            component.populate_update(&mut properties);
        }
        ActorUpdatePayload {
            name: Some(self.name.clone()),
            actor_type: Some(self.actor_type.clone()),
            parent: self.parent,
            properties,
        }
    }

    /// Apply name and properties from an update record
    ///
    /// Parent links are applied by the world, which also fixes the scene graph.
    pub fn apply_update(&mut self, update: &ActorUpdatePayload) {
        if let Some(name) = &update.name {
            if !name.is_empty() {
                self.name = name.clone();
            }
        }
        self.properties.merge(&update.properties);
        for component in &mut self.components {
            component.apply_update(&update.properties);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Health {
        owner: OwnerRef,
        value: i64,
        detached: bool,
    }

    impl ActorComponent for Health {
        fn component_type(&self) -> &'static str {
            "health"
        }

        fn on_added_to_actor(&mut self, owner: ActorId) {
            self.owner.attach(owner);
        }

        fn on_removed_from_actor(&mut self, _owner: ActorId) {
            self.owner.detach();
            self.detached = true;
        }

        fn populate_update(&self, properties: &mut Parameters) {
            properties.set("health", self.value);
        }

        fn apply_update(&mut self, properties: &Parameters) {
            if let Ok(value) = properties.get_as::<i64>("health") {
                self.value = value;
            }
        }
    }

    fn truck() -> ActorProxy {
        ActorProxy::new("truck", ActorType::new("vehicles", "Truck"))
    }

    #[test]
    fn test_new_actor_flags() {
        let actor = truck();
        assert!(!actor.is_in_registry());
        assert!(!actor.is_remote());
        assert!(!actor.is_published());
        assert!(!actor.is_deleted());
        assert_eq!(actor.drawable(), Some(DrawableId::for_actor(actor.id())));
        assert_eq!(truck().without_drawable().drawable(), None);
    }

    #[test]
    fn test_component_added_sets_owner() {
        let mut actor = truck();
        actor.add_component(Box::new(Health::default())).unwrap();

        let health = actor.component::<Health>().unwrap();
        assert_eq!(health.owner.require("health").unwrap(), actor.id());
    }

    #[test]
    fn test_duplicate_component_is_rejected() {
        let mut actor = truck();
        actor.add_component(Box::new(Health::default())).unwrap();
        let err = actor
            .add_component(Box::new(Health::default()))
            .unwrap_err();
        assert!(err.is_duplicate());
        assert_eq!(actor.component_types(), vec!["health"]);
    }

    #[test]
    fn test_component_without_owner_is_invalid_state() {
        let health = Health::default();
        let err = health.owner.require("health").unwrap_err();
        assert!(err.is_invalid_state());
    }

    #[test]
    fn test_remove_component_runs_detach_hook() {
        let mut actor = truck();
        actor.add_component(Box::new(Health::default())).unwrap();
        let removed = actor.remove_component("health").unwrap();
        let removed: &dyn ActorComponent = removed.as_ref();
        let health = removed.as_any().downcast_ref::<Health>().unwrap();
        assert!(health.detached);
        assert!(health.owner.get().is_none());
        assert!(actor.remove_component("health").is_none());
    }

    #[test]
    fn test_duplicate_child_leaves_children_unchanged() {
        let mut parent = truck();
        let child = ActorId::new();
        parent.add_child(child).unwrap();
        let err = parent.add_child(child).unwrap_err();
        assert!(matches!(err, ActorError::DuplicateChild { .. }));
        assert_eq!(parent.children(), &[child]);
        assert!(parent.remove_child(child));
        assert!(!parent.remove_child(child));
    }

    #[test]
    fn test_update_includes_component_properties() {
        let mut actor = truck().with_property("fuel", 0.5);
        actor
            .add_component(Box::new(Health {
                value: 80,
                ..Default::default()
            }))
            .unwrap();

        let update = actor.populate_update();
        assert_eq!(update.name.as_deref(), Some("truck"));
        assert_eq!(update.properties.get_as::<i64>("health").unwrap(), 80);
        assert_eq!(update.properties.get_as::<f64>("fuel").unwrap(), 0.5);
    }

    #[test]
    fn test_apply_update_keeps_name_when_absent() {
        let mut actor = truck();
        actor.add_component(Box::new(Health::default())).unwrap();

        actor.apply_update(&ActorUpdatePayload {
            properties: Parameters::new().with("health", 12i64),
            ..Default::default()
        });
        assert_eq!(actor.name(), "truck");
        assert_eq!(actor.component::<Health>().unwrap().value, 12);

        actor.apply_update(&ActorUpdatePayload {
            name: Some("tanker".into()),
            ..Default::default()
        });
        assert_eq!(actor.name(), "tanker");
    }
}
