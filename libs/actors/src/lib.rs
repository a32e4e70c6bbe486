//! # Simulation Actor Runtime
//!
//! Single-threaded, message-driven runtime for simulation entities. Actors are
//! [`ActorProxy`] values extended by [`ActorComponent`]s; cross-cutting
//! behaviour plugs into the [`ActorSystem`] as prioritized
//! [`SystemComponent`]s that see every dispatched message.
//!
//! ## Architecture
//!
//! ```text
//! ActorSystem
//!  ├── system components (priority order)
//!  └── World
//!       ├── ActorRegistry      actors, insertion order, pending removals
//!       ├── TimerScheduler x2  simulation and real time
//!       ├── EnvironmentManager + SceneGraph
//!       ├── message queue      drained between dispatch passes
//!       └── MapLoader / HostApplication
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use sim_actors::{ActorProxy, ActorSystem, InMemorySceneGraph, SimContext, StepOutcome};
//! use sim_types::{ActorType, MachineInfo};
//!
//! let context = SimContext::new(MachineInfo::new("local"));
//! let mut system = ActorSystem::new(context, Box::new(InMemorySceneGraph::new()));
//!
//! let probe = ActorProxy::new("probe", ActorType::new("demo", "probe"));
//! let id = system.world_mut().add_actor(probe, false, true).unwrap();
//!
//! assert_eq!(system.step(1.0 / 60.0), StepOutcome::Continue);
//! assert!(system.world().find_actor(id).is_some());
//! ```

pub mod actor;
pub mod clock;
pub mod context;
pub mod environment;
pub mod error;
pub mod host;
pub mod processor;
pub mod registry;
pub mod scene;
pub mod state_machine;
pub mod system;
pub mod test_utils;
pub mod timer;
pub mod world;

pub use actor::{ActorComponent, ActorContext, ActorProxy, AsAny, OwnerRef};
pub use clock::SimulationClock;
pub use context::SimContext;
pub use environment::EnvironmentManager;
pub use error::{ActorError, Result};
pub use host::{HeadlessHost, HostApplication, MapLoader, StaticMapLoader};
pub use processor::DefaultMessageProcessor;
pub use registry::{ActorBuilder, ActorFactory, ActorRegistry};
pub use scene::{DrawableId, InMemorySceneGraph, SceneGraph, SceneNode};
pub use state_machine::{
    EventId, ShutdownObserver, StateHandle, StateHooks, StateId, StateMachine,
};
pub use system::{ActorSystem, ComponentPriority, StepOutcome, SystemComponent, SystemStats};
pub use timer::{TimerEntry, TimerScheduler};
pub use world::World;
