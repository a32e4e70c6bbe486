//! # Environment Manager
//!
//! Scene attachment policy. At most one actor holds the environment role; when
//! one does, every other top-level drawable is composed under the
//! environment's drawable instead of the scene root.
//!
//! | Actor being attached        | Environment set | Attached under            |
//! |-----------------------------|-----------------|---------------------------|
//! | has a parent actor          | either          | parent actor's drawable   |
//! | is the environment          | yes             | scene root                |
//! | any other actor             | yes             | environment's drawable    |
//! | any actor                   | no              | scene root                |
//!
//! A drawable that already has a parent is never attached a second time.

use crate::error::{ActorError, Result};
use crate::registry::ActorRegistry;
use crate::scene::{DrawableId, SceneGraph, SceneNode};
use sim_types::ActorId;
use tracing::{debug, error, warn};

#[derive(Debug, Default)]
pub struct EnvironmentManager {
    environment: Option<ActorId>,
}

impl EnvironmentManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn environment(&self) -> Option<ActorId> {
        self.environment
    }

    pub fn is_environment(&self, actor: ActorId) -> bool {
        self.environment == Some(actor)
    }

    /// Swap the environment role, returning the previous holder
    pub(crate) fn replace(&mut self, environment: Option<ActorId>) -> Option<ActorId> {
        std::mem::replace(&mut self.environment, environment)
    }

    /// Attach `actor`'s drawable according to the policy
    ///
    /// Returns false when nothing was attached (no drawable, already
    /// parented, or the environment has no drawable).
    pub fn attach_actor(
        &self,
        scene: &mut dyn SceneGraph,
        registry: &ActorRegistry,
        actor: ActorId,
    ) -> Result<bool> {
        let proxy = registry
            .get(actor)
            .ok_or(ActorError::NotRegistered { actor })?;
        let Some(drawable) = proxy.drawable() else {
            return Ok(false);
        };
        if scene.parent_of(drawable).is_some() {
            return Ok(false);
        }

        if let Some(parent) = proxy.parent() {
            if let Some(parent_drawable) = registry.get(parent).and_then(|p| p.drawable()) {
                return Ok(scene.attach(drawable, SceneNode::Drawable(parent_drawable)));
            }
        }

        match self.environment {
            Some(environment) if environment != actor => {
                self.delegate_to_environment(scene, registry, actor)
            }
            _ => Ok(scene.attach(drawable, SceneNode::Root)),
        }
    }

    /// Attach `actor`'s drawable under the environment's drawable
    pub fn delegate_to_environment(
        &self,
        scene: &mut dyn SceneGraph,
        registry: &ActorRegistry,
        actor: ActorId,
    ) -> Result<bool> {
        let Some(environment) = self.environment else {
            warn!("No environment actor to delegate {} to", actor);
            return Ok(false);
        };
        if environment == actor {
            error!("Environment actor {} cannot be added to itself", actor);
            return Err(ActorError::EnvironmentSelfDelegation { actor });
        }

        let Some(environment_drawable) = registry.get(environment).and_then(|e| e.drawable())
        else {
            warn!("Environment actor {} has no drawable, {} not attached", environment, actor);
            return Ok(false);
        };
        let Some(drawable) = registry.get(actor).and_then(|a| a.drawable()) else {
            return Ok(false);
        };
        Ok(scene.attach(drawable, SceneNode::Drawable(environment_drawable)))
    }

    /// Re-insert the children of an orphaned drawable through the policy
    ///
    /// Children that do not belong to a registered actor are only detached.
    /// Returns the number of drawables re-attached.
    pub fn reparent_dangling(
        &self,
        scene: &mut dyn SceneGraph,
        registry: &ActorRegistry,
        orphan: DrawableId,
    ) -> usize {
        let mut reattached = 0;
        for child in scene.children_of(SceneNode::Drawable(orphan)) {
            scene.detach(child);
            let actor = child.actor_id();
            if !registry.get(actor).is_some_and(|a| a.is_in_registry()) {
                continue;
            }
            match self.attach_actor(scene, registry, actor) {
                Ok(true) => reattached += 1,
                Ok(false) => debug!("Dangling drawable {} left detached", child),
                Err(e) => warn!("Failed to re-parent {}: {}", child, e),
            }
        }
        reattached
    }

    /// Move every top-level actor drawable under the current environment
    pub fn rehome_top_level(&self, scene: &mut dyn SceneGraph, registry: &ActorRegistry) -> usize {
        let mut moved = 0;
        for actor in registry.registered_ids() {
            if self.is_environment(actor) {
                continue;
            }
            let Some(drawable) = registry.get(actor).and_then(|a| a.drawable()) else {
                continue;
            };
            if scene.parent_of(drawable) != Some(SceneNode::Root) {
                continue;
            }
            scene.detach(drawable);
            match self.attach_actor(scene, registry, actor) {
                Ok(true) => moved += 1,
                Ok(false) => {
                    scene.attach(drawable, SceneNode::Root);
                }
                Err(e) => {
                    warn!("Failed to move {} under the environment: {}", actor, e);
                    scene.attach(drawable, SceneNode::Root);
                }
            }
        }
        moved
    }
}
