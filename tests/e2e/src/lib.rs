//! End-to-end test fixtures
//!
//! [`Harness`] wires a complete actor system the way an application would:
//! default message processor, optional replay recorder and a
//! [`MessageCollector`] at the lowest priority for assertions.

use sim_actors::test_utils::MessageCollector;
use sim_actors::{
    ActorComponent, ActorProxy, ActorSystem, ComponentPriority, DefaultMessageProcessor,
    InMemorySceneGraph, OwnerRef, SimContext, World,
};
use sim_replay::{LogStream, ReplayRecorder};
use sim_types::{ActorId, ActorType, MachineInfo, MessagePayload, MessageType, Parameters};

pub const STEP_SECS: f64 = 0.1;

pub fn unit_type() -> ActorType {
    ActorType::new("test", "unit")
}

/// Health points of a unit, mirrored into update records
#[derive(Debug, Default)]
pub struct Vitals {
    owner: OwnerRef,
    pub health: i64,
}

impl ActorComponent for Vitals {
    fn component_type(&self) -> &'static str {
        "vitals"
    }

    fn on_added_to_actor(&mut self, owner: ActorId) {
        self.owner.attach(owner);
    }

    fn on_removed_from_actor(&mut self, _owner: ActorId) {
        self.owner.detach();
    }

    fn populate_update(&self, properties: &mut Parameters) {
        properties.set("health", self.health);
    }

    fn apply_update(&mut self, properties: &Parameters) {
        if let Ok(health) = properties.get_as::<i64>("health") {
            self.health = health;
        }
    }
}

pub fn unit_with_id(id: ActorId, name: &str, health: i64) -> ActorProxy {
    let mut actor = ActorProxy::with_id(id, name, unit_type());
    actor
        .add_component(Box::new(Vitals {
            health,
            ..Vitals::default()
        }))
        .expect("fresh actor accepts vitals");
    actor
}

pub struct Harness {
    pub system: ActorSystem,
}

impl Harness {
    pub fn new(machine: &str) -> Self {
        let mut system = ActorSystem::new(
            SimContext::new(MachineInfo::new(machine)),
            Box::new(InMemorySceneGraph::new()),
        );
        system
            .world_mut()
            .actor_factory_mut()
            .register(unit_type(), |id, name| unit_with_id(id, name, 0));
        system
            .add_component(
                Box::new(DefaultMessageProcessor::new()),
                ComponentPriority::HIGHER,
            )
            .expect("processor registers");
        system
            .add_component(Box::new(MessageCollector::new()), ComponentPriority::LOWEST)
            .expect("collector registers");
        Self { system }
    }

    pub fn with_recorder(machine: &str, stream: Box<dyn LogStream>) -> Self {
        let mut harness = Self::new(machine);
        harness
            .system
            .add_component(
                Box::new(ReplayRecorder::new(stream)),
                ComponentPriority::HIGHER,
            )
            .expect("recorder registers");
        harness
    }

    pub fn world(&self) -> &World {
        self.system.world()
    }

    pub fn world_mut(&mut self) -> &mut World {
        self.system.world_mut()
    }

    pub fn spawn(&mut self, name: &str, health: i64) -> ActorId {
        self.world_mut()
            .add_actor(unit_with_id(ActorId::new(), name, health), false, false)
            .expect("unit enters the world")
    }

    pub fn health(&self, id: ActorId) -> Option<i64> {
        self.world()
            .find_actor(id)
            .and_then(|actor| actor.component::<Vitals>())
            .map(|vitals| vitals.health)
    }

    pub fn set_health(&mut self, id: ActorId, health: i64) {
        if let Some(vitals) = self
            .world_mut()
            .actor_mut(id)
            .and_then(|actor| actor.component_mut::<Vitals>())
        {
            vitals.health = health;
        }
    }

    /// Send a payload-free request and dispatch it
    pub fn request(&mut self, message_type: MessageType) {
        let message = self.world().create_message(message_type);
        self.system.send_message(message);
        self.system.dispatch_queued();
    }

    pub fn request_with<P: MessagePayload>(&mut self, message_type: MessageType, payload: &P) {
        let message = self
            .world()
            .message_factory()
            .create_with(message_type, payload)
            .expect("payload fits request");
        self.system.send_message(message);
        self.system.dispatch_queued();
    }

    /// Step until simulation time reaches `sim_time`
    pub fn run_until(&mut self, sim_time: f64) {
        while self.world().simulation_time() + 1e-9 < sim_time {
            self.system.step(STEP_SECS);
        }
    }

    pub fn recorder(&self) -> &ReplayRecorder {
        self.system
            .component::<ReplayRecorder>(ReplayRecorder::NAME)
            .expect("recorder is registered")
    }

    pub fn collector(&self) -> &MessageCollector {
        self.system
            .component::<MessageCollector>(MessageCollector::NAME)
            .expect("collector is registered")
    }

    pub fn clear_messages(&mut self) {
        if let Some(collector) = self
            .system
            .component_mut::<MessageCollector>(MessageCollector::NAME)
        {
            collector.clear();
        }
    }
}
