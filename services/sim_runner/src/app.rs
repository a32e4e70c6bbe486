//! Demo application
//!
//! An application state machine (`startup` -> `running` -> `shutdown`) that
//! loads a map, spawns pulsing beacon actors and stops the simulation when it
//! reaches `shutdown`, wired into an [`ActorSystem`] from [`RuntimeConfig`].

use anyhow::{Context, Result};
use sim_actors::{
    ActorComponent, ActorContext, ActorProxy, ActorSystem, ComponentPriority,
    DefaultMessageProcessor, EventId, InMemorySceneGraph, OwnerRef, ShutdownObserver,
    SimContext, SimulationClock, StateHooks, StateId, StateMachine, StepOutcome, World,
};
use sim_config::{RuntimeConfig, StreamKind};
use sim_replay::{BinaryLogStream, LogStream, MemoryLogStream, ReplayRecorder};
use sim_types::{
    ActorId, ActorType, MachineInfo, Message, MessageType, Parameters, StateTransitionRequest,
    TimerElapsedPayload,
};
use tracing::{debug, error, info, warn};

pub const APP_MACHINE: &str = "application";

pub const STARTUP: StateId = StateId::from_static("startup");
pub const RUNNING: StateId = StateId::from_static("running");
pub const SHUTDOWN: StateId = StateId::from_static("shutdown");

pub const LOADED: EventId = EventId::from_static("loaded");
pub const QUIT: EventId = EventId::from_static("quit");

pub const DEMO_MAP: &str = "proving_ground";
pub const PULSE_TIMER: &str = "pulse";
/// Pulse period of every beacon, spawned or replayed
pub const PULSE_INTERVAL_SECS: f64 = 1.0;

pub fn beacon_type() -> ActorType {
    ActorType::new("demo", "beacon")
}

/// Counts timer pulses into the `pulses` property of its actor
#[derive(Debug)]
pub struct Beacon {
    owner: OwnerRef,
    interval: f64,
    pulses: i64,
}

impl Beacon {
    pub fn new(interval: f64) -> Self {
        Self {
            owner: OwnerRef::default(),
            interval,
            pulses: 0,
        }
    }

    pub fn pulses(&self) -> i64 {
        self.pulses
    }
}

impl ActorComponent for Beacon {
    fn component_type(&self) -> &'static str {
        "beacon"
    }

    fn on_added_to_actor(&mut self, owner: ActorId) {
        self.owner.attach(owner);
    }

    fn on_removed_from_actor(&mut self, _owner: ActorId) {
        self.owner.detach();
    }

    fn on_entered_world(&mut self, ctx: &mut ActorContext<'_>) -> sim_actors::Result<()> {
        self.owner.require(self.component_type())?;
        ctx.set_timer(PULSE_TIMER, self.interval, true);
        Ok(())
    }

    fn process_message(
        &mut self,
        ctx: &mut ActorContext<'_>,
        message: &Message,
    ) -> sim_actors::Result<()> {
        if *message.message_type() != MessageType::TimerElapsed {
            return Ok(());
        }
        let timer: TimerElapsedPayload = message.payload()?;
        if timer.timer_name != PULSE_TIMER {
            return Ok(());
        }
        self.pulses += 1;
        let id = ctx.actor_id();
        if let Some(actor) = ctx.world_mut().actor_mut(id) {
            actor.set_property("pulses", self.pulses);
        }
        debug!("Beacon {} pulse {} (late {:.3}s)", id, self.pulses, timer.late_time);
        Ok(())
    }

    fn populate_update(&self, properties: &mut Parameters) {
        properties.set("pulses", self.pulses);
    }

    fn apply_update(&mut self, properties: &Parameters) {
        if let Ok(pulses) = properties.get_as::<i64>("pulses") {
            self.pulses = pulses;
        }
    }
}

fn beacon(id: ActorId, name: &str, interval: f64) -> ActorProxy {
    let mut actor = ActorProxy::with_id(id, name, beacon_type());
    if let Err(e) = actor.add_component(Box::new(Beacon::new(interval))) {
        warn!("Failed to equip beacon {}: {}", id, e);
    }
    actor
}

fn request_transition(world: &mut World, event: &EventId) {
    let request = StateTransitionRequest {
        event: event.to_string(),
        machine: Some(APP_MACHINE.to_string()),
    };
    match world
        .message_factory()
        .create_with(MessageType::RequestStateTransition, &request)
    {
        Ok(message) => world.send_message(message),
        Err(e) => error!("Failed to build transition request: {}", e),
    }
}

/// Loads the demo map, then asks to move on
struct StartupState {
    maps: Vec<String>,
    requested: bool,
}

impl StateHooks for StartupState {
    fn on_entry(&mut self, world: &mut World) {
        if let Err(e) = world.change_map(&self.maps) {
            error!("Startup map load failed: {}", e);
        }
    }

    fn on_update(&mut self, _delta_sim_time: f64, world: &mut World) {
        if !self.requested {
            self.requested = true;
            request_transition(world, &LOADED);
        }
    }
}

/// Spawns the beacons; the first one wraps the others as the environment
struct RunningState {
    beacons: usize,
    pulse_interval: f64,
}

impl StateHooks for RunningState {
    fn on_entry(&mut self, world: &mut World) {
        let mut spawned = Vec::with_capacity(self.beacons);
        for index in 0..self.beacons {
            let name = format!("beacon-{}", index);
            match world.add_actor(beacon(ActorId::new(), &name, self.pulse_interval), false, true) {
                Ok(id) => spawned.push(id),
                Err(e) => error!("Failed to spawn {}: {}", name, e),
            }
        }
        if let Some(first) = spawned.first() {
            if let Err(e) = world.set_environment_actor(Some(*first)) {
                warn!("Failed to make {} the environment: {}", first, e);
            }
        }
        info!("Running with {} beacons", spawned.len());
    }

    fn on_exit(&mut self, world: &mut World) {
        info!("Leaving running state at {:.3}s", world.simulation_time());
    }
}

/// The application state machine in its `startup` state
pub fn application_state_machine(world: &mut World, beacons: usize) -> StateMachine {
    let mut machine = StateMachine::new(APP_MACHINE);
    machine.add_state_with_hooks(
        STARTUP,
        Box::new(StartupState {
            maps: vec![DEMO_MAP.to_string()],
            requested: false,
        }),
    );
    machine.add_state_with_hooks(
        RUNNING,
        Box::new(RunningState {
            beacons,
            pulse_interval: PULSE_INTERVAL_SECS,
        }),
    );
    machine.add_transition(LOADED, STARTUP, RUNNING);
    machine.add_transition(QUIT, RUNNING, SHUTDOWN);
    machine.add_transition(QUIT, STARTUP, SHUTDOWN);
    machine.set_current_state(&STARTUP, world);
    machine
}

fn log_stream(config: &RuntimeConfig) -> Box<dyn LogStream> {
    match config.replay.stream {
        StreamKind::Memory => Box::new(MemoryLogStream::new()),
        StreamKind::Binary => Box::new(BinaryLogStream::new(&config.replay.log_directory)),
    }
}

/// Build a system from configuration; `record` starts recording right away
pub fn build_system(config: &RuntimeConfig, record: bool) -> Result<ActorSystem> {
    let mut clock = SimulationClock::new(config.clock.time_scale);
    clock.set_paused(config.clock.start_paused);
    let context = SimContext::new(MachineInfo::new(&config.global.machine_name)).with_clock(clock);
    let mut system = ActorSystem::new(context, Box::new(InMemorySceneGraph::new()));

    system
        .world_mut()
        .actor_factory_mut()
        .register(beacon_type(), |id, name| beacon(id, name, PULSE_INTERVAL_SECS));

    system
        .add_component(
            Box::new(DefaultMessageProcessor::new()),
            ComponentPriority::HIGHER,
        )
        .context("Failed to add message processor")?;

    if config.replay.enabled || record {
        let recorder = ReplayRecorder::new(log_stream(config))
            .with_log_file(config.replay.log_file.clone())
            .with_auto_keyframe_interval(config.replay.auto_keyframe_interval);
        system
            .add_component(Box::new(recorder), ComponentPriority::HIGHER)
            .context("Failed to add replay recorder")?;
    }

    let machine = application_state_machine(system.world_mut(), 3);
    system
        .add_component(Box::new(machine), ComponentPriority::NORMAL)
        .context("Failed to add application state machine")?;
    system
        .add_component(
            Box::new(ShutdownObserver::new(SHUTDOWN).for_machine(APP_MACHINE)),
            ComponentPriority::LOWER,
        )
        .context("Failed to add shutdown observer")?;

    if record {
        let start = system
            .world()
            .create_message(MessageType::LogRequestChangeStateRecord);
        system.send_message(start);
    }
    Ok(system)
}

/// What a run did
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub steps: u64,
    pub simulation_time: f64,
    pub shutdown_requested: bool,
    pub actors: usize,
}

/// Step until shutdown or `max_steps`; asks the application to quit once
/// simulation time passes `quit_after`
pub fn run(
    system: &mut ActorSystem,
    step_secs: f64,
    max_steps: Option<u64>,
    quit_after: Option<f64>,
) -> RunSummary {
    let mut steps = 0;
    let mut quit_sent = false;
    let mut outcome = StepOutcome::Continue;

    while outcome == StepOutcome::Continue && max_steps.map_or(true, |max| steps < max) {
        outcome = system.step(step_secs);
        steps += 1;

        if !quit_sent && quit_after.is_some_and(|t| system.world().simulation_time() >= t) {
            info!("Quit time reached at {:.3}s", system.world().simulation_time());
            request_transition(system.world_mut(), &QUIT);
            quit_sent = true;
        }
    }

    let summary = RunSummary {
        steps,
        simulation_time: system.world().simulation_time(),
        shutdown_requested: outcome == StepOutcome::Shutdown,
        actors: system.world().actor_ids().len(),
    };
    info!(
        "Ran {} steps to {:.3}s ({} actors)",
        summary.steps, summary.simulation_time, summary.actors
    );
    summary
}

/// Stop any recording or playback so logs are closed, then tear down
pub fn finish(system: &mut ActorSystem) {
    if system.component::<ReplayRecorder>(ReplayRecorder::NAME).is_some() {
        let stop = system
            .world()
            .create_message(MessageType::LogRequestChangeStateIdle);
        system.send_message(stop);
        system.dispatch_queued();
    }
    system.shutdown();
}
