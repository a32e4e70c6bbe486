//! Scene graph contract
//!
//! Rendering lives outside the runtime. All the runtime needs is "attach
//! drawable under node", "detach drawable" and "who is this drawable's
//! parent"; [`SceneGraph`] is that contract. [`InMemorySceneGraph`] is the
//! implementation used by headless runs and tests.

use sim_types::ActorId;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Handle on an actor's visual representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DrawableId(ActorId);

impl DrawableId {
    /// Drawables are keyed by the id of the actor that owns them
    pub fn for_actor(actor: ActorId) -> Self {
        Self(actor)
    }

    pub fn actor_id(&self) -> ActorId {
        self.0
    }
}

impl fmt::Display for DrawableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "drawable:{}", self.0)
    }
}

/// A node a drawable can be attached under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneNode {
    Root,
    Drawable(DrawableId),
}

/// Scene graph operations consumed by the runtime
pub trait SceneGraph {
    /// Attach `drawable` under `parent`; false if it already has a parent
    fn attach(&mut self, drawable: DrawableId, parent: SceneNode) -> bool;

    /// Detach `drawable` from its parent; false if it had none
    fn detach(&mut self, drawable: DrawableId) -> bool;

    fn parent_of(&self, drawable: DrawableId) -> Option<SceneNode>;

    /// Direct children of `node` in attachment order
    fn children_of(&self, node: SceneNode) -> Vec<DrawableId>;
}

#[derive(Debug, Default)]
pub struct InMemorySceneGraph {
    parents: HashMap<DrawableId, SceneNode>,
    children: HashMap<SceneNode, Vec<DrawableId>>,
}

impl InMemorySceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of attached drawables
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}

impl SceneGraph for InMemorySceneGraph {
    fn attach(&mut self, drawable: DrawableId, parent: SceneNode) -> bool {
        if parent == SceneNode::Drawable(drawable) || self.parents.contains_key(&drawable) {
            return false;
        }
        debug!("Attaching {} under {:?}", drawable, parent);
        self.parents.insert(drawable, parent);
        self.children.entry(parent).or_default().push(drawable);
        true
    }

    fn detach(&mut self, drawable: DrawableId) -> bool {
        let Some(parent) = self.parents.remove(&drawable) else {
            return false;
        };
        if let Some(siblings) = self.children.get_mut(&parent) {
            siblings.retain(|d| *d != drawable);
            if siblings.is_empty() {
                self.children.remove(&parent);
            }
        }
        true
    }

    fn parent_of(&self, drawable: DrawableId) -> Option<SceneNode> {
        self.parents.get(&drawable).copied()
    }

    fn children_of(&self, node: SceneNode) -> Vec<DrawableId> {
        self.children.get(&node).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drawable() -> DrawableId {
        DrawableId::for_actor(ActorId::new())
    }

    #[test]
    fn test_attach_is_not_repeated() {
        let mut scene = InMemorySceneGraph::new();
        let a = drawable();
        assert!(scene.attach(a, SceneNode::Root));
        assert!(!scene.attach(a, SceneNode::Root));
        assert_eq!(scene.children_of(SceneNode::Root), vec![a]);
    }

    #[test]
    fn test_detach_and_reattach_elsewhere() {
        let mut scene = InMemorySceneGraph::new();
        let (a, b) = (drawable(), drawable());
        scene.attach(a, SceneNode::Root);
        scene.attach(b, SceneNode::Root);

        assert!(scene.detach(b));
        assert!(!scene.detach(b));
        assert!(scene.attach(b, SceneNode::Drawable(a)));
        assert_eq!(scene.parent_of(b), Some(SceneNode::Drawable(a)));
        assert_eq!(scene.children_of(SceneNode::Root), vec![a]);
        assert_eq!(scene.children_of(SceneNode::Drawable(a)), vec![b]);
    }

    #[test]
    fn test_cannot_attach_under_itself() {
        let mut scene = InMemorySceneGraph::new();
        let a = drawable();
        assert!(!scene.attach(a, SceneNode::Drawable(a)));
        assert!(scene.is_empty());
    }
}
