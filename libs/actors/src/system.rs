//! Actor System Core
//!
//! The orchestrator: owns the [`World`] and the priority ordered list of
//! [`SystemComponent`]s, and drives one simulation step at a time.
//!
//! ## Step Order
//!
//! 1. Flush actors marked for removal during the previous step
//! 2. Advance the clock, queue `TickLocal`, queue due timers
//! 3. Drain the message queue, then queue `TickRemote` and drain again
//! 4. Run per-actor tick hooks
//! 5. Deliver `TickEndOfFrame` to the system components
//!
//! ## Dispatch
//!
//! A message goes to every system component in ascending priority value,
//! then to the components of the actor it is about (unless that actor is
//! marked deleted). Dispatch never nests: whatever a component sends while
//! handling a message is queued and dispatched after the current message has
//! reached every consumer.

use crate::actor::AsAny;
use crate::context::SimContext;
use crate::error::{ActorError, Result};
use crate::scene::SceneGraph;
use crate::world::World;
use sim_types::{Message, MessageType, TickPayload};
use tracing::{debug, error, info, warn};

/// Dispatch order of a system component; lower values see messages first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentPriority(u32);

impl ComponentPriority {
    /// Reserved for components that must see every message before anyone else
    pub const HIGHEST: Self = Self(0);
    pub const HIGHER: Self = Self(100);
    pub const NORMAL: Self = Self(200);
    pub const LOWER: Self = Self(300);
    pub const LOWEST: Self = Self(400);

    /// Custom priority; never sorts ahead of [`ComponentPriority::HIGHEST`]
    pub fn custom(order: u32) -> Self {
        Self(order.max(1))
    }

    pub fn order(&self) -> u32 {
        self.0
    }
}

impl Default for ComponentPriority {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// Behaviour registered with the orchestrator that sees the message stream
pub trait SystemComponent: AsAny {
    /// Unique name within one system
    fn name(&self) -> &str;

    fn on_added_to_system(&mut self, _world: &mut World) {}

    fn on_removed_from_system(&mut self, _world: &mut World) {}

    /// Handle one dispatched message; errors are logged and dispatch continues
    fn process_message(&mut self, message: &Message, world: &mut World) -> Result<()>;
}

/// Whether the driver should keep stepping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    Shutdown,
}

/// Counters for the lifetime of a system
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemStats {
    pub steps: u64,
    pub messages_dispatched: u64,
    pub timers_fired: u64,
    pub actors_removed: u64,
    pub component_failures: u64,
}

struct RegisteredComponent {
    priority: ComponentPriority,
    component: Box<dyn SystemComponent>,
}

/// Core orchestrator of a simulation
pub struct ActorSystem {
    world: World,
    components: Vec<RegisteredComponent>,
    stats: SystemStats,
}

impl ActorSystem {
    pub fn new(context: SimContext, scene: Box<dyn SceneGraph>) -> Self {
        Self::with_world(World::new(context, scene))
    }

    pub fn with_world(world: World) -> Self {
        info!(
            "Creating actor system for machine {}",
            world.machine_info()
        );
        Self {
            world,
            components: Vec::new(),
            stats: SystemStats::default(),
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn stats(&self) -> &SystemStats {
        &self.stats
    }

    /// Register a system component; names must be unique
    ///
    /// Components with equal priority are dispatched in registration order.
    pub fn add_component(
        &mut self,
        mut component: Box<dyn SystemComponent>,
        priority: ComponentPriority,
    ) -> Result<()> {
        let name = component.name().to_string();
        if self.components.iter().any(|c| c.component.name() == name) {
            warn!("System component '{}' is already registered", name);
            return Err(ActorError::DuplicateComponent { name });
        }

        component.on_added_to_system(&mut self.world);
        let index = self
            .components
            .iter()
            .position(|c| c.priority > priority)
            .unwrap_or(self.components.len());
        self.components.insert(
            index,
            RegisteredComponent {
                priority,
                component,
            },
        );
        debug!(
            "Registered system component '{}' at priority {}",
            name,
            priority.order()
        );
        Ok(())
    }

    pub fn remove_component(&mut self, name: &str) -> Option<Box<dyn SystemComponent>> {
        let index = self
            .components
            .iter()
            .position(|c| c.component.name() == name)?;
        let mut entry = self.components.remove(index);
        entry.component.on_removed_from_system(&mut self.world);
        debug!("Removed system component '{}'", name);
        Some(entry.component)
    }

    /// Typed access to a registered component
    pub fn component<T: SystemComponent>(&self, name: &str) -> Option<&T> {
        self.components
            .iter()
            .find(|c| c.component.name() == name)
            .and_then(|c| {
                let component: &dyn SystemComponent = c.component.as_ref();
                component.as_any().downcast_ref::<T>()
            })
    }

    pub fn component_mut<T: SystemComponent>(&mut self, name: &str) -> Option<&mut T> {
        self.components
            .iter_mut()
            .find(|c| c.component.name() == name)
            .and_then(|c| {
                let component: &mut dyn SystemComponent = c.component.as_mut();
                component.as_any_mut().downcast_mut::<T>()
            })
    }

    /// Component names in dispatch order
    pub fn component_names(&self) -> Vec<&str> {
        self.components.iter().map(|c| c.component.name()).collect()
    }

    /// Queue a message for the next dispatch pass
    pub fn send_message(&mut self, message: Message) {
        self.world.send_message(message);
    }

    /// Deliver one message to every system component, then to the actor it is about
    pub fn process_message(&mut self, message: &Message) {
        self.dispatch_to_components(message);
        self.world.deliver_to_actor(message);
        self.stats.messages_dispatched += 1;
    }

    fn dispatch_to_components(&mut self, message: &Message) {
        for entry in self.components.iter_mut() {
            if let Err(e) = entry.component.process_message(message, &mut self.world) {
                self.stats.component_failures += 1;
                error!(
                    "System component '{}' failed on {}: {}",
                    entry.component.name(),
                    message.message_type(),
                    e
                );
            }
        }
    }

    /// Dispatch queued messages until the queue is empty
    pub fn dispatch_queued(&mut self) -> usize {
        let mut dispatched = 0;
        while let Some(message) = self.world.pop_message() {
            self.process_message(&message);
            dispatched += 1;
        }
        dispatched
    }

    fn queue_tick(&mut self, message_type: MessageType, tick: &TickPayload) {
        match self.world.message_factory().create_with(message_type, tick) {
            Ok(message) => self.world.send_message(message),
            Err(e) => error!("Failed to build tick message: {}", e),
        }
    }

    /// Run one simulation step of `delta_real_secs` wall clock seconds
    pub fn step(&mut self, delta_real_secs: f64) -> StepOutcome {
        let span = self.world.context().span().clone();
        let _guard = span.enter();

        self.stats.actors_removed += self.world.remove_deleted_actors() as u64;
        if self.world.is_quit_requested() {
            return StepOutcome::Shutdown;
        }

        let tick = self.world.advance_clock(delta_real_secs);
        self.queue_tick(MessageType::TickLocal, &tick);
        self.stats.timers_fired += self.world.process_timers() as u64;
        self.dispatch_queued();

        self.queue_tick(MessageType::TickRemote, &tick);
        self.dispatch_queued();

        self.world.tick_actors(&tick);

        match self
            .world
            .message_factory()
            .create_with(MessageType::TickEndOfFrame, &tick)
        {
            Ok(message) => self.dispatch_to_components(&message),
            Err(e) => error!("Failed to build end of frame tick: {}", e),
        }

        self.stats.steps += 1;
        if self.world.is_quit_requested() {
            info!("Simulation shutdown requested at {:.3}s", tick.simulation_time);
            StepOutcome::Shutdown
        } else {
            StepOutcome::Continue
        }
    }

    /// Remove every component and actor
    pub fn shutdown(&mut self) {
        info!("Shutting down actor system");
        while let Some(mut entry) = self.components.pop() {
            entry.component.on_removed_from_system(&mut self.world);
        }
        let removed = self.world.remove_all_actors();
        self.stats.actors_removed += removed as u64;
        info!("Actor system shutdown complete ({} actors removed)", removed);
    }
}
