//! # Identifiers
//!
//! Identity types shared by every layer of the simulation runtime:
//!
//! - [`ActorId`]: unique identity of an actor proxy, stable across record and
//!   replay so keyframes can recreate an actor under its original id
//! - [`MachineInfo`]: identity of a message sender (the local simulation, a
//!   remote peer, or the replay playback source)
//! - [`ActorType`]: category/name descriptor used to construct actors through a
//!   factory when replayed or received from a remote machine

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique actor identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId {
    id: Uuid,
}

impl ActorId {
    /// Create new random actor ID
    pub fn new() -> Self {
        Self { id: Uuid::new_v4() }
    }

    /// Create from UUID
    pub fn from_uuid(id: Uuid) -> Self {
        Self { id }
    }

    /// Get UUID
    pub fn uuid(&self) -> Uuid {
        self.id
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor-{}", self.id.simple())
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identity of a message sender
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MachineInfo {
    id: Uuid,
    name: String,
}

impl MachineInfo {
    /// Create a machine identity with a fresh id
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }

    pub fn with_id(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for MachineInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.id.simple())
    }
}

/// Descriptor of an actor's kind, e.g. `vehicles.Truck`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorType {
    category: String,
    name: String,
}

impl ActorType {
    pub fn new(category: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fully qualified `category.name` form
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.category, self.name)
    }
}

impl fmt::Display for ActorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.category, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_id_display_uses_simple_uuid() {
        let uuid = Uuid::new_v4();
        let id = ActorId::from_uuid(uuid);
        assert_eq!(id.to_string(), format!("actor-{}", uuid.simple()));
        assert_eq!(id.uuid(), uuid);
    }

    #[test]
    fn test_actor_ids_are_unique() {
        assert_ne!(ActorId::new(), ActorId::new());
    }

    #[test]
    fn test_machine_identity_compares_by_id_and_name() {
        let local = MachineInfo::new("local");
        let same = MachineInfo::with_id(local.id(), "local");
        assert_eq!(local, same);
        assert_ne!(local, MachineInfo::new("local"));
    }

    #[test]
    fn test_actor_type_full_name() {
        let kind = ActorType::new("vehicles", "Truck");
        assert_eq!(kind.full_name(), "vehicles.Truck");
        assert_eq!(kind.to_string(), "vehicles.Truck");
    }
}
