//! Actor Registry
//!
//! Authoritative store of actor proxies plus the deferred removal list, and
//! the [`ActorFactory`] used to construct actors by type when they arrive
//! from a remote machine or a replay log.

use crate::actor::ActorProxy;
use sim_types::{ActorId, ActorType};
use std::collections::HashMap;
use tracing::debug;

/// Owns every actor proxy known to a world
///
/// An actor stays stored after being marked for removal until the next
/// deletion flush; [`ActorRegistry::registered_ids`] skips such actors.
#[derive(Debug, Default)]
pub struct ActorRegistry {
    actors: HashMap<ActorId, ActorProxy>,
    /// Insertion order, for deterministic iteration
    order: Vec<ActorId>,
    pending_removal: Vec<ActorId>,
}

impl ActorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, actor: ActorProxy) {
        let id = actor.id();
        if self.actors.insert(id, actor).is_none() {
            self.order.push(id);
        }
    }

    pub(crate) fn remove(&mut self, id: ActorId) -> Option<ActorProxy> {
        let actor = self.actors.remove(&id)?;
        self.order.retain(|a| *a != id);
        Some(actor)
    }

    pub fn get(&self, id: ActorId) -> Option<&ActorProxy> {
        self.actors.get(&id)
    }

    pub fn get_mut(&mut self, id: ActorId) -> Option<&mut ActorProxy> {
        self.actors.get_mut(&id)
    }

    pub fn contains(&self, id: ActorId) -> bool {
        self.actors.contains_key(&id)
    }

    /// Ids of actors currently in the registry, in insertion order
    pub fn registered_ids(&self) -> Vec<ActorId> {
        self.order
            .iter()
            .copied()
            .filter(|id| self.actors.get(id).is_some_and(ActorProxy::is_in_registry))
            .collect()
    }

    /// Registered actors in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &ActorProxy> {
        self.order
            .iter()
            .filter_map(|id| self.actors.get(id))
            .filter(|actor| actor.is_in_registry())
    }

    pub(crate) fn queue_removal(&mut self, id: ActorId) {
        self.pending_removal.push(id);
    }

    pub(crate) fn unqueue_removal(&mut self, id: ActorId) {
        self.pending_removal.retain(|pending| *pending != id);
    }

    pub(crate) fn take_pending_removals(&mut self) -> Vec<ActorId> {
        std::mem::take(&mut self.pending_removal)
    }

    pub fn pending_removals(&self) -> &[ActorId] {
        &self.pending_removal
    }

    /// Number of registered actors
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builds an actor of a given type under a given id
pub type ActorBuilder = Box<dyn Fn(ActorId, &str) -> ActorProxy>;

/// Constructs actors by [`ActorType`]
///
/// Types without a registered builder are created as plain proxies carrying
/// only the type descriptor and the properties of the update that created
/// them.
#[derive(Default)]
pub struct ActorFactory {
    builders: HashMap<ActorType, ActorBuilder>,
}

impl std::fmt::Debug for ActorFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorFactory")
            .field("types", &self.builders.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ActorFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a builder, returning true if it replaced an existing one
    pub fn register<F>(&mut self, actor_type: ActorType, builder: F) -> bool
    where
        F: Fn(ActorId, &str) -> ActorProxy + 'static,
    {
        self.builders
            .insert(actor_type, Box::new(builder))
            .is_some()
    }

    pub fn is_registered(&self, actor_type: &ActorType) -> bool {
        self.builders.contains_key(actor_type)
    }

    pub fn create(&self, id: ActorId, actor_type: &ActorType, name: &str) -> ActorProxy {
        match self.builders.get(actor_type) {
            Some(builder) => builder(id, name),
            None => {
                debug!("No builder for {}, creating plain actor {}", actor_type, id);
                ActorProxy::with_id(id, name, actor_type.clone())
            }
        }
    }
}
