//! Actor runtime error types
//!
//! Most lifecycle misuse (double add, double delete, unknown timer, unknown
//! transition) is logged and reported through a boolean return instead of an
//! error. What remains here is the set of failures a caller must react to:
//! invalid-state and duplicate-registration errors, plus the one compensating
//! case, [`ActorError::PublishRolledBack`].

use sim_types::{ActorId, MessageError};
use thiserror::Error;

/// Errors from actor, component and orchestrator operations
#[derive(Debug, Error)]
pub enum ActorError {
    /// Operation needs an actor that is present in the registry
    #[error("Actor {actor} is not registered")]
    NotRegistered { actor: ActorId },

    /// Component was used before being attached to an actor
    #[error("Component '{component}' has no owning actor")]
    ComponentWithoutOwner { component: String },

    /// Remote actors are owned by another machine and cannot be published here
    #[error("Actor {actor} is remote and cannot be published")]
    RemotePublish { actor: ActorId },

    /// Hierarchy already contains this child
    #[error("Actor {child} is already a child of {parent}")]
    DuplicateChild { parent: ActorId, child: ActorId },

    /// Parenting would make an actor its own ancestor
    #[error("Actor {child} is an ancestor of {parent} and cannot become its child")]
    HierarchyCycle { parent: ActorId, child: ActorId },

    /// Actor already carries a component of this type
    #[error("Actor {actor} already has a component of type '{component}'")]
    DuplicateActorComponent { actor: ActorId, component: String },

    /// A system component with this name is already registered
    #[error("System component '{name}' is already registered")]
    DuplicateComponent { name: String },

    /// The environment actor tried to attach itself through delegation
    #[error("Environment actor {actor} cannot be delegated to itself")]
    EnvironmentSelfDelegation { actor: ActorId },

    /// A component lifecycle hook refused the operation
    #[error("Component '{component}' failed: {reason}")]
    ComponentFailed { component: String, reason: String },

    /// No factory is registered for the requested actor type
    #[error("No actor factory registered for type '{actor_type}'")]
    UnknownActorType { actor_type: String },

    /// Map loader collaborator failed
    #[error("Failed to change map to {maps:?}: {reason}")]
    MapChange { maps: Vec<String>, reason: String },

    /// Publishing during world entry failed; the actor was marked for removal
    #[error("Actor {actor} was removed after failing to enter the world: {source}")]
    PublishRolledBack {
        actor: ActorId,
        #[source]
        source: Box<ActorError>,
    },

    #[error("Message error: {0}")]
    Message(#[from] MessageError),
}

impl ActorError {
    pub fn component_failed(component: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ComponentFailed {
            component: component.into(),
            reason: reason.into(),
        }
    }

    /// The actor or component involved is unusable
    pub fn is_invalid_state(&self) -> bool {
        matches!(
            self,
            Self::NotRegistered { .. }
                | Self::ComponentWithoutOwner { .. }
                | Self::HierarchyCycle { .. }
        )
    }

    /// A registration was attempted twice; nothing was mutated
    pub fn is_duplicate(&self) -> bool {
        matches!(
            self,
            Self::DuplicateChild { .. }
                | Self::DuplicateActorComponent { .. }
                | Self::DuplicateComponent { .. }
        )
    }

    /// The operation partially mutated state and was compensated
    pub fn is_rolled_back(&self) -> bool {
        matches!(self, Self::PublishRolledBack { .. })
    }
}

pub type Result<T> = std::result::Result<T, ActorError>;
