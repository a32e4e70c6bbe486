//! # World
//!
//! Everything a component may touch while handling a message: the actor
//! registry, timers, scene graph and environment policy, the outgoing message
//! queue, the clock and the collaborators.
//!
//! The [`ActorSystem`](crate::system::ActorSystem) owns a `World` next to its
//! list of system components, so components receive `&mut World` during
//! dispatch without the orchestrator ever lending itself out.
//!
//! ## Mutation Rules
//!
//! - Removing an actor is two-phase: [`World::mark_actor_for_removal`] flags it
//!   and queues it, [`World::remove_deleted_actors`] destroys it between steps
//! - Messages sent during dispatch are queued and handled on a later pass
//! - Actor hooks run against a detached copy of the actor's component list

use crate::actor::{ActorComponent, ActorContext, ActorProxy};
use crate::clock::SimulationClock;
use crate::context::SimContext;
use crate::environment::EnvironmentManager;
use crate::error::{ActorError, Result};
use crate::host::{HeadlessHost, HostApplication, MapLoader, StaticMapLoader};
use crate::registry::{ActorFactory, ActorRegistry};
use crate::scene::{SceneGraph, SceneNode};
use crate::timer::TimerScheduler;
use sim_types::{
    ActorId, ActorType, ActorUpdatePayload, MachineInfo, MapChangedPayload, Message,
    MessageFactory, MessageType, TickPayload,
};
use std::collections::{HashSet, VecDeque};
use tracing::{debug, error, info, warn};

pub struct World {
    context: SimContext,
    factory: MessageFactory,
    registry: ActorRegistry,
    actor_factory: ActorFactory,
    sim_timers: TimerScheduler,
    real_timers: TimerScheduler,
    environment: EnvironmentManager,
    scene: Box<dyn SceneGraph>,
    map_loader: Box<dyn MapLoader>,
    host: Box<dyn HostApplication>,
    active_maps: Vec<String>,
    queue: VecDeque<Message>,
    quit_requested: bool,
}

impl World {
    pub fn new(context: SimContext, scene: Box<dyn SceneGraph>) -> Self {
        let factory = MessageFactory::new(context.machine().clone());
        Self {
            context,
            factory,
            registry: ActorRegistry::new(),
            actor_factory: ActorFactory::new(),
            sim_timers: TimerScheduler::new(),
            real_timers: TimerScheduler::new(),
            environment: EnvironmentManager::new(),
            scene,
            map_loader: Box::new(StaticMapLoader::new()),
            host: Box::new(HeadlessHost),
            active_maps: Vec::new(),
            queue: VecDeque::new(),
            quit_requested: false,
        }
    }

    pub fn with_map_loader(mut self, loader: Box<dyn MapLoader>) -> Self {
        self.map_loader = loader;
        self
    }

    pub fn with_host(mut self, host: Box<dyn HostApplication>) -> Self {
        self.host = host;
        self
    }

    // Identity and time

    pub fn context(&self) -> &SimContext {
        &self.context
    }

    pub fn machine_info(&self) -> &MachineInfo {
        self.context.machine()
    }

    pub fn message_factory(&self) -> &MessageFactory {
        &self.factory
    }

    pub fn create_message(&self, message_type: MessageType) -> Message {
        self.factory.create(message_type)
    }

    pub fn clock(&self) -> &SimulationClock {
        self.context.clock()
    }

    /// Simulation time in seconds
    pub fn simulation_time(&self) -> f64 {
        self.context.clock().simulation_time()
    }

    /// Jump the simulation clock and change its scale
    pub fn change_time_settings(&mut self, simulation_time: f64, time_scale: f64) {
        info!(
            "Changing simulation time to {:.3}s (scale {})",
            simulation_time, time_scale
        );
        self.context
            .clock_mut()
            .change_time_settings(simulation_time, time_scale);
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.context.clock_mut().set_paused(paused);
    }

    pub(crate) fn advance_clock(&mut self, delta_real_secs: f64) -> TickPayload {
        self.context.clock_mut().advance(delta_real_secs)
    }

    // Message queue

    /// Queue a message for dispatch on the next pass
    pub fn send_message(&mut self, message: Message) {
        self.queue.push_back(message);
    }

    pub fn pending_messages(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn pop_message(&mut self) -> Option<Message> {
        self.queue.pop_front()
    }

    fn send_about(&mut self, message_type: MessageType, actor: ActorId) {
        let message = self
            .factory
            .create(message_type)
            .with_about_actor(actor)
            .with_sending_actor(actor);
        self.queue.push_back(message);
    }

    // Actors

    pub fn registry(&self) -> &ActorRegistry {
        &self.registry
    }

    pub fn actor_factory_mut(&mut self) -> &mut ActorFactory {
        &mut self.actor_factory
    }

    /// Registered actor by id; actors marked for removal are not returned
    pub fn find_actor(&self, id: ActorId) -> Option<&ActorProxy> {
        self.registry.get(id).filter(|a| a.is_in_registry())
    }

    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut ActorProxy> {
        self.registry.get_mut(id).filter(|a| a.is_in_registry())
    }

    /// Ids of registered actors in insertion order
    pub fn actor_ids(&self) -> Vec<ActorId> {
        self.registry.registered_ids()
    }

    pub fn actors(&self) -> impl Iterator<Item = &ActorProxy> {
        self.registry.iter()
    }

    pub fn find_actors_by_name(&self, name: &str) -> Vec<ActorId> {
        self.registry
            .iter()
            .filter(|a| a.name() == name)
            .map(ActorProxy::id)
            .collect()
    }

    pub fn find_actors_by_type(&self, actor_type: &ActorType) -> Vec<ActorId> {
        self.registry
            .iter()
            .filter(|a| a.actor_type() == actor_type)
            .map(ActorProxy::id)
            .collect()
    }

    /// Add an actor, setting its remote and publish flags first
    pub fn add_actor(
        &mut self,
        mut actor: ActorProxy,
        remote: bool,
        publish: bool,
    ) -> Result<ActorId> {
        if remote && publish {
            return Err(ActorError::RemotePublish { actor: actor.id() });
        }
        actor.set_remote(remote);
        actor.set_published(publish);
        self.add_actor_to_world(actor)
    }

    /// Register an actor, attach it to the scene and run its world entry
    ///
    /// Adding an id that is already registered is a logged no-op. If publishing
    /// or an entered-world hook fails, the actor is marked for removal and
    /// [`ActorError::PublishRolledBack`] is returned.
    pub fn add_actor_to_world(&mut self, mut actor: ActorProxy) -> Result<ActorId> {
        let id = actor.id();
        if let Some(existing) = self.registry.get(id) {
            if existing.is_in_registry() {
                warn!("Actor {} is already registered, ignoring double add", id);
                return Ok(id);
            }
        }

        let publish = actor.is_published();
        let remote = actor.is_remote();
        if publish && remote {
            return Err(ActorError::RemotePublish { actor: id });
        }

        if self.registry.contains(id) {
            debug!("Actor {} re-added before its removal was flushed", id);
            self.registry.unqueue_removal(id);
            self.finalize_removal(id);
        }

        actor.set_published(false);
        actor.mark_registered();
        debug!("Adding actor {} '{}' ({})", id, actor.name(), actor.actor_type());
        self.registry.insert(actor);

        if let Err(e) = self.add_actor_to_scene(id) {
            warn!("Actor {} could not be attached to the scene: {}", id, e);
        }

        if !remote {
            self.emit_actor_created(id);
        }

        if let Err(source) = self.enter_world(id, publish) {
            error!("Actor {} failed to enter the world, removing it: {}", id, source);
            self.mark_actor_for_removal(id);
            return Err(ActorError::PublishRolledBack {
                actor: id,
                source: Box::new(source),
            });
        }
        Ok(id)
    }

    fn enter_world(&mut self, id: ActorId, publish: bool) -> Result<()> {
        if publish {
            self.publish_actor(id)?;
        }
        self.try_with_actor_components(id, |component, ctx| component.on_entered_world(ctx))
    }

    fn emit_actor_created(&mut self, id: ActorId) {
        let Some(actor) = self.registry.get(id) else {
            return;
        };
        let update = actor.populate_update();
        match self.factory.create_with(MessageType::ActorCreated, &update) {
            Ok(message) => self
                .queue
                .push_back(message.with_about_actor(id).with_sending_actor(id)),
            Err(e) => error!("Failed to build creation message for {}: {}", id, e),
        }
    }

    /// Publish a registered local actor
    pub fn publish_actor(&mut self, id: ActorId) -> Result<()> {
        let actor = self
            .find_actor(id)
            .ok_or(ActorError::NotRegistered { actor: id })?;
        if actor.is_remote() {
            return Err(ActorError::RemotePublish { actor: id });
        }
        if actor.is_published() {
            debug!("Actor {} is already published", id);
            return Ok(());
        }

        self.try_with_actor_components(id, |component, ctx| component.on_publish(ctx))?;
        if let Some(actor) = self.registry.get_mut(id) {
            actor.mark_published();
        }
        self.send_about(MessageType::ActorPublished, id);
        debug!("Published actor {}", id);
        Ok(())
    }

    /// Flag an actor for removal at the next deletion flush
    ///
    /// Returns false for unknown actors and double deletes. Child actors are
    /// marked as well, last child first.
    pub fn mark_actor_for_removal(&mut self, id: ActorId) -> bool {
        let Some(actor) = self.registry.get_mut(id) else {
            warn!("Cannot remove unknown actor {}", id);
            return false;
        };
        if !actor.is_in_registry() {
            warn!("Double delete of actor {}, ignoring", id);
            return false;
        }

        actor.mark_deleted();
        let remote = actor.is_remote();
        let children = actor.children().to_vec();
        self.registry.queue_removal(id);
        debug!("Marked actor {} for removal", id);

        if !remote {
            self.send_about(MessageType::ActorDeleted, id);
        }

        for child in children.into_iter().rev() {
            self.mark_actor_for_removal(child);
        }

        if self.environment.is_environment(id) {
            self.clear_environment_role();
        }
        true
    }

    /// Destroy every actor marked for removal
    ///
    /// Removals requested by world-exit hooks are flushed in the same call.
    /// Returns the number of actors destroyed.
    pub fn remove_deleted_actors(&mut self) -> usize {
        let mut removed = 0;
        loop {
            let pending = self.registry.take_pending_removals();
            if pending.is_empty() {
                break;
            }
            for id in pending {
                if self.finalize_removal(id) {
                    removed += 1;
                }
            }
        }
        removed
    }

    fn finalize_removal(&mut self, id: ActorId) -> bool {
        self.with_actor_components(id, |component, ctx| component.on_removed_from_world(ctx));

        let Some(mut actor) = self.registry.remove(id) else {
            return false;
        };

        for child in actor.children() {
            if let Some(child) = self.registry.get_mut(*child) {
                child.set_parent(None);
            }
        }
        if let Some(parent) = actor.parent() {
            if let Some(parent) = self.registry.get_mut(parent) {
                parent.remove_child(id);
            }
        }

        if let Some(drawable) = actor.drawable() {
            self.environment
                .reparent_dangling(self.scene.as_mut(), &self.registry, drawable);
            self.scene.detach(drawable);
        }

        let timers = self.sim_timers.clear_actor_timers(id) + self.real_timers.clear_actor_timers(id);
        if timers > 0 {
            debug!("Cleared {} timers of removed actor {}", timers, id);
        }

        for mut component in std::mem::take(&mut actor.components) {
            component.on_removed_from_actor(id);
        }
        debug!("Removed actor {}", id);
        true
    }

    /// Attach a component to a stored actor, running world entry if registered
    pub fn add_component_to_actor(
        &mut self,
        id: ActorId,
        mut component: Box<dyn ActorComponent>,
    ) -> Result<()> {
        let actor = self
            .registry
            .get(id)
            .ok_or(ActorError::NotRegistered { actor: id })?;
        let component_type = component.component_type();
        if actor.has_component(component_type) {
            return Err(ActorError::DuplicateActorComponent {
                actor: id,
                component: component_type.to_string(),
            });
        }
        let in_world = actor.is_in_registry();

        component.on_added_to_actor(id);
        if in_world {
            let mut ctx = ActorContext::new(id, self);
            if let Err(e) = component.on_entered_world(&mut ctx) {
                component.on_removed_from_actor(id);
                return Err(e);
            }
        }

        match self.registry.get_mut(id) {
            Some(actor) => {
                actor.components.push(component);
                Ok(())
            }
            None => Err(ActorError::NotRegistered { actor: id }),
        }
    }

    /// Detach a component, running world exit first if the actor is registered
    pub fn remove_component_from_actor(
        &mut self,
        id: ActorId,
        component_type: &str,
    ) -> Option<Box<dyn ActorComponent>> {
        let actor = self.registry.get_mut(id)?;
        let index = actor
            .components
            .iter()
            .position(|c| c.component_type() == component_type)?;
        let mut component = actor.components.remove(index);
        let in_world = actor.is_in_registry();

        if in_world {
            let mut ctx = ActorContext::new(id, self);
            component.on_removed_from_world(&mut ctx);
        }
        component.on_removed_from_actor(id);
        Some(component)
    }

    /// Move `child` under `parent` (or to the top level) in both the actor
    /// hierarchy and the scene graph
    pub fn set_parent_actor(&mut self, child: ActorId, parent: Option<ActorId>) -> Result<()> {
        let current = self
            .registry
            .get(child)
            .ok_or(ActorError::NotRegistered { actor: child })?
            .parent();

        if let Some(parent) = parent {
            let parent_actor = self
                .registry
                .get(parent)
                .ok_or(ActorError::NotRegistered { actor: parent })?;
            if parent == child || parent_actor.children().contains(&child) {
                return Err(ActorError::DuplicateChild { parent, child });
            }
            if self.is_ancestor(child, parent) {
                return Err(ActorError::HierarchyCycle { parent, child });
            }
        }
        if current == parent {
            return Ok(());
        }

        if let Some(old) = current {
            if let Some(old) = self.registry.get_mut(old) {
                old.remove_child(child);
            }
        }
        if let Some(parent) = parent {
            if let Some(parent_actor) = self.registry.get_mut(parent) {
                parent_actor.add_child(child)?;
            }
        }

        let Some(actor) = self.registry.get_mut(child) else {
            return Err(ActorError::NotRegistered { actor: child });
        };
        actor.set_parent(parent);
        let drawable = actor.drawable();
        let in_world = actor.is_in_registry();

        if let Some(drawable) = drawable {
            self.scene.detach(drawable);
            if in_world {
                self.add_actor_to_scene(child)?;
            }
        }
        Ok(())
    }

    /// True when `ancestor` is `actor` or hangs above it in the scene
    ///
    /// Follows actor parents, then the environment edge that top-level actors
    /// are composed under.
    fn is_ancestor(&self, ancestor: ActorId, actor: ActorId) -> bool {
        let environment = self.environment.environment();
        let mut visited = HashSet::new();
        let mut current = Some(actor);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            if !visited.insert(node) {
                return false;
            }
            current = match self.registry.get(node).and_then(ActorProxy::parent) {
                Some(parent) => Some(parent),
                None => environment.filter(|env| *env != node),
            };
        }
        false
    }

    /// Apply an update record, creating the actor when it does not exist
    ///
    /// Returns true when an actor was created.
    pub fn apply_actor_update(
        &mut self,
        id: ActorId,
        update: &ActorUpdatePayload,
        create_if_missing: bool,
        remote: bool,
    ) -> Result<bool> {
        if self.find_actor(id).is_none() {
            if !create_if_missing {
                debug!("Ignoring update for unknown actor {}", id);
                return Ok(false);
            }
            let actor_type = update
                .actor_type
                .as_ref()
                .ok_or_else(|| ActorError::UnknownActorType {
                    actor_type: "unspecified".to_string(),
                })?;
            let name = update.name.as_deref().unwrap_or_default();
            let mut actor = self.actor_factory.create(id, actor_type, name);
            actor.apply_update(update);
            actor.set_remote(remote);
            self.add_actor_to_world(actor)?;
            self.apply_parent(id, update.parent);
            return Ok(true);
        }

        if let Some(actor) = self.registry.get_mut(id) {
            actor.apply_update(update);
        }
        self.apply_parent(id, update.parent);
        Ok(false)
    }

    fn apply_parent(&mut self, id: ActorId, parent: Option<ActorId>) {
        let Some(parent) = parent else {
            return;
        };
        if self.find_actor(id).and_then(ActorProxy::parent) == Some(parent) {
            return;
        }
        if self.find_actor(parent).is_none() {
            debug!("Parent {} of {} is not registered yet", parent, id);
            return;
        }
        if let Err(e) = self.set_parent_actor(id, Some(parent)) {
            warn!("Failed to parent {} under {}: {}", id, parent, e);
        }
    }

    // Scene and environment

    pub fn scene(&self) -> &dyn SceneGraph {
        self.scene.as_ref()
    }

    /// Attach an actor's drawable according to the environment policy
    pub fn add_actor_to_scene(&mut self, id: ActorId) -> Result<bool> {
        self.environment
            .attach_actor(self.scene.as_mut(), &self.registry, id)
    }

    pub fn environment_actor(&self) -> Option<ActorId> {
        self.environment.environment()
    }

    /// Give the environment role to `actor`, or clear it with `None`
    ///
    /// Returns false when nothing changed.
    pub fn set_environment_actor(&mut self, actor: Option<ActorId>) -> Result<bool> {
        let Some(id) = actor else {
            return Ok(self.clear_environment_role());
        };
        if self.environment.is_environment(id) {
            warn!("Actor {} is already the environment actor", id);
            return Ok(false);
        }
        let drawable = self
            .find_actor(id)
            .ok_or(ActorError::NotRegistered { actor: id })?
            .drawable();

        let previous = self.environment.replace(Some(id));
        if let Some(previous_drawable) = previous
            .and_then(|p| self.registry.get(p))
            .and_then(ActorProxy::drawable)
        {
            self.environment.reparent_dangling(
                self.scene.as_mut(),
                &self.registry,
                previous_drawable,
            );
        }

        if let Some(drawable) = drawable {
            self.scene.detach(drawable);
            self.scene.attach(drawable, SceneNode::Root);
        }
        let moved = self
            .environment
            .rehome_top_level(self.scene.as_mut(), &self.registry);
        info!("Actor {} is now the environment ({} drawables moved)", id, moved);

        self.send_about(MessageType::EnvironmentChanged, id);
        Ok(true)
    }

    /// Sends `EnvironmentChanged` with no about-actor, meaning no environment
    fn clear_environment_role(&mut self) -> bool {
        let Some(previous) = self.environment.replace(None) else {
            debug!("No environment actor to clear");
            return false;
        };
        if let Some(drawable) = self.registry.get(previous).and_then(ActorProxy::drawable) {
            self.environment
                .reparent_dangling(self.scene.as_mut(), &self.registry, drawable);
        }
        info!("Actor {} is no longer the environment", previous);
        let message = self.factory.create(MessageType::EnvironmentChanged);
        self.queue.push_back(message);
        true
    }

    // Timers

    /// Schedule a timer; `real_time` timers run on the wall clock
    pub fn set_timer(
        &mut self,
        name: &str,
        about_actor: Option<ActorId>,
        interval_secs: f64,
        repeat: bool,
        real_time: bool,
    ) -> bool {
        let clock = self.context.clock();
        if real_time {
            let now = clock.real_time_us();
            self.real_timers
                .set_timer(name, about_actor, now, interval_secs, repeat)
        } else {
            let now = clock.sim_time_us();
            self.sim_timers
                .set_timer(name, about_actor, now, interval_secs, repeat)
        }
    }

    /// Clear a timer from both clocks; unknown timers are a no-op
    pub fn clear_timer(&mut self, name: &str, about_actor: Option<ActorId>) -> bool {
        let sim = self.sim_timers.clear_timer(name, about_actor);
        let real = self.real_timers.clear_timer(name, about_actor);
        sim || real
    }

    pub fn sim_timers(&self) -> &TimerScheduler {
        &self.sim_timers
    }

    pub fn real_timers(&self) -> &TimerScheduler {
        &self.real_timers
    }

    /// Queue timer messages for everything due on either clock
    pub(crate) fn process_timers(&mut self) -> usize {
        let clock = self.context.clock();
        let (sim_now, real_now) = (clock.sim_time_us(), clock.real_time_us());
        let fired: Vec<Message> = self
            .sim_timers
            .process_timers(sim_now, &self.factory)
            .into_iter()
            .chain(self.real_timers.process_timers(real_now, &self.factory))
            .collect();
        let count = fired.len();
        self.queue.extend(fired);
        count
    }

    // Maps

    pub fn active_maps(&self) -> &[String] {
        &self.active_maps
    }

    /// Load a new set of maps through the map loader
    pub fn change_map(&mut self, names: &[String]) -> Result<()> {
        if let Err(e) = self.map_loader.load_maps(names) {
            return Err(ActorError::MapChange {
                maps: names.to_vec(),
                reason: format!("{:#}", e),
            });
        }
        self.active_maps = names.to_vec();
        let payload = MapChangedPayload {
            map_names: names.to_vec(),
        };
        self.factory
            .create_with(MessageType::MapChanged, &payload)
            .map(|message| self.queue.push_back(message))?;
        info!("Active maps changed to {:?}", names);
        Ok(())
    }

    // Host

    pub fn request_quit(&mut self) {
        if !self.quit_requested {
            self.quit_requested = true;
            self.host.request_quit();
        }
    }

    pub fn is_quit_requested(&self) -> bool {
        self.quit_requested
    }

    // Actor hooks

    /// Run `f` on each component of `id` with the component list detached
    pub(crate) fn with_actor_components<F>(&mut self, id: ActorId, mut f: F)
    where
        F: FnMut(&mut dyn ActorComponent, &mut ActorContext<'_>),
    {
        let Some(actor) = self.registry.get_mut(id) else {
            return;
        };
        let mut components = std::mem::take(&mut actor.components);
        if !components.is_empty() {
            let mut ctx = ActorContext::new(id, self);
            for component in components.iter_mut() {
                f(&mut **component, &mut ctx);
            }
        }
        self.restore_components(id, components);
    }

    /// Like [`World::with_actor_components`], stopping at the first error
    pub(crate) fn try_with_actor_components<F>(&mut self, id: ActorId, mut f: F) -> Result<()>
    where
        F: FnMut(&mut dyn ActorComponent, &mut ActorContext<'_>) -> Result<()>,
    {
        let Some(actor) = self.registry.get_mut(id) else {
            return Err(ActorError::NotRegistered { actor: id });
        };
        let mut components = std::mem::take(&mut actor.components);
        let mut result = Ok(());
        if !components.is_empty() {
            let mut ctx = ActorContext::new(id, self);
            for component in components.iter_mut() {
                if let Err(e) = f(&mut **component, &mut ctx) {
                    result = Err(e);
                    break;
                }
            }
        }
        self.restore_components(id, components);
        result
    }

    fn restore_components(&mut self, id: ActorId, components: Vec<Box<dyn ActorComponent>>) {
        match self.registry.get_mut(id) {
            Some(actor) => {
                let added = std::mem::replace(&mut actor.components, components);
                actor.components.extend(added);
            }
            None => {
                for mut component in components {
                    component.on_removed_from_actor(id);
                }
            }
        }
    }

    /// Run every registered actor's tick hooks
    pub(crate) fn tick_actors(&mut self, tick: &TickPayload) {
        for id in self.registry.registered_ids() {
            if self.find_actor(id).is_none() {
                continue;
            }
            self.with_actor_components(id, |component, ctx| component.on_tick(ctx, tick));
        }
    }

    /// Hand a message to the components of the actor it is about
    pub(crate) fn deliver_to_actor(&mut self, message: &Message) {
        let Some(id) = message.about_actor() else {
            return;
        };
        match self.registry.get(id) {
            Some(actor) if !actor.is_deleted() => {}
            _ => return,
        }
        self.with_actor_components(id, |component, ctx| {
            if let Err(e) = component.process_message(ctx, message) {
                error!(
                    "Component '{}' of {} failed on {}: {}",
                    component.component_type(),
                    id,
                    message.message_type(),
                    e
                );
            }
        });
    }

    /// Mark every actor for removal and flush
    pub(crate) fn remove_all_actors(&mut self) -> usize {
        for id in self.registry.registered_ids() {
            self.mark_actor_for_removal(id);
        }
        let removed = self.remove_deleted_actors();
        self.sim_timers.clear();
        self.real_timers.clear();
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{DrawableId, InMemorySceneGraph};

    fn world() -> World {
        World::new(
            SimContext::new(MachineInfo::new("world")),
            Box::new(InMemorySceneGraph::new()),
        )
    }

    fn spawn(world: &mut World, name: &str) -> ActorId {
        let actor = ActorProxy::new(name, ActorType::new("test", "unit"));
        world.add_actor(actor, false, false).unwrap()
    }

    fn reaches_root(world: &World, id: ActorId) -> bool {
        let mut seen = HashSet::new();
        let mut node = DrawableId::for_actor(id);
        while seen.insert(node) {
            match world.scene().parent_of(node) {
                Some(SceneNode::Root) => return true,
                Some(SceneNode::Drawable(parent)) => node = parent,
                None => return false,
            }
        }
        false
    }

    #[test]
    fn test_direct_parent_cycle_is_rejected() {
        let mut world = world();
        let a = spawn(&mut world, "a");
        let b = spawn(&mut world, "b");
        world.set_parent_actor(b, Some(a)).unwrap();

        let err = world.set_parent_actor(a, Some(b)).unwrap_err();
        assert!(matches!(
            err,
            ActorError::HierarchyCycle { parent, child } if parent == b && child == a
        ));
        assert!(err.is_invalid_state());
        assert_eq!(world.find_actor(a).unwrap().parent(), None);
        assert!(world.find_actor(b).unwrap().children().is_empty());
        assert!(reaches_root(&world, a));
        assert!(reaches_root(&world, b));
    }

    #[test]
    fn test_longer_parent_cycle_is_rejected() {
        let mut world = world();
        let a = spawn(&mut world, "a");
        let b = spawn(&mut world, "b");
        let c = spawn(&mut world, "c");
        world.set_parent_actor(b, Some(a)).unwrap();
        world.set_parent_actor(c, Some(b)).unwrap();

        let err = world.set_parent_actor(a, Some(c)).unwrap_err();
        assert!(matches!(err, ActorError::HierarchyCycle { .. }));
        assert_eq!(world.find_actor(a).unwrap().parent(), None);
        for id in [a, b, c] {
            assert!(reaches_root(&world, id));
        }

        // Moving a subtree sideways is still allowed
        let d = spawn(&mut world, "d");
        world.set_parent_actor(b, Some(d)).unwrap();
        assert_eq!(world.find_actor(b).unwrap().parent(), Some(d));
        assert!(reaches_root(&world, c));
    }

    #[test]
    fn test_environment_cannot_move_under_its_composed_actors() {
        let mut world = world();
        let x = spawn(&mut world, "x");
        world.set_environment_actor(Some(x)).unwrap();
        let y = spawn(&mut world, "y");
        let z = spawn(&mut world, "z");
        world.set_parent_actor(z, Some(y)).unwrap();

        for parent in [y, z] {
            let err = world.set_parent_actor(x, Some(parent)).unwrap_err();
            assert!(matches!(err, ActorError::HierarchyCycle { .. }));
        }
        assert_eq!(world.find_actor(x).unwrap().parent(), None);
        for id in [x, y, z] {
            assert!(reaches_root(&world, id));
        }
    }

    #[test]
    fn test_clearing_environment_announces_without_actor() {
        let mut world = world();
        let x = spawn(&mut world, "x");
        world.set_environment_actor(Some(x)).unwrap();
        world.set_environment_actor(None).unwrap();

        let changes: Vec<Option<ActorId>> = world
            .queue
            .iter()
            .filter(|m| m.message_type() == &MessageType::EnvironmentChanged)
            .map(Message::about_actor)
            .collect();
        assert_eq!(changes, vec![Some(x), None]);
    }
}
