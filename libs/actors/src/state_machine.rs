//! # State Machine Component
//!
//! Message-driven finite state machine with named states, events and a
//! transition table keyed by `(event, from_state)`.
//!
//! States and events are small value types. Two [`StateId`]s with the same
//! name always compare equal, whether built from a `&'static str` constant or
//! at runtime:
//!
//! ```rust
//! use sim_actors::state_machine::{EventId, StateId, StateMachine};
//!
//! const IDLE: StateId = StateId::from_static("Idle");
//! const RUNNING: StateId = StateId::from_static("Running");
//! const START: EventId = EventId::from_static("Start");
//!
//! let mut machine = StateMachine::new("app");
//! assert!(machine.add_transition(START, IDLE, RUNNING));
//! assert_eq!(machine.state(&StateId::new("Idle")), machine.state(&IDLE));
//! ```
//!
//! As a [`SystemComponent`] the machine fires events carried by
//! `RequestStateTransition` messages and runs the current state's update hook
//! on every `TickLocal`. Each successful transition broadcasts
//! `StateChanged`; [`ShutdownObserver`] turns a transition into a designated
//! state into a quit request.

use crate::error::Result;
use crate::system::SystemComponent;
use crate::world::World;
use sim_types::{
    Message, MessageType, StateChangedPayload, StateTransitionRequest, TickPayload,
};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, error, info};

macro_rules! name_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Cow<'static, str>);

        impl $name {
            pub const fn from_static(name: &'static str) -> Self {
                Self(Cow::Borrowed(name))
            }

            pub fn new(name: impl Into<String>) -> Self {
                Self(Cow::Owned(name.into()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

name_id!(
    /// Identity of a state
    StateId
);
name_id!(
    /// Identity of an event that may trigger a transition
    EventId
);

/// Stable handle on a registered state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateHandle(usize);

/// Behaviour attached to a state
pub trait StateHooks {
    fn on_entry(&mut self, _world: &mut World) {}

    fn on_exit(&mut self, _world: &mut World) {}

    /// Once per simulation step while the state is current
    fn on_update(&mut self, _delta_sim_time: f64, _world: &mut World) {}
}

struct State {
    id: StateId,
    hooks: Option<Box<dyn StateHooks>>,
}

pub struct StateMachine {
    name: String,
    states: Vec<State>,
    index: HashMap<StateId, StateHandle>,
    transitions: HashMap<(EventId, StateHandle), StateHandle>,
    current: Option<StateHandle>,
}

impl fmt::Debug for StateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("name", &self.name)
            .field("states", &self.states.len())
            .field("transitions", &self.transitions.len())
            .field("current", &self.current_state())
            .finish()
    }
}

impl StateMachine {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            states: Vec::new(),
            index: HashMap::new(),
            transitions: HashMap::new(),
            current: None,
        }
    }

    pub fn machine_name(&self) -> &str {
        &self.name
    }

    /// Register a state; registering a known state returns its existing handle
    pub fn add_state(&mut self, id: StateId) -> StateHandle {
        if let Some(handle) = self.index.get(&id) {
            return *handle;
        }
        let handle = StateHandle(self.states.len());
        self.index.insert(id.clone(), handle);
        self.states.push(State { id, hooks: None });
        handle
    }

    /// Register a state together with its hooks
    pub fn add_state_with_hooks(&mut self, id: StateId, hooks: Box<dyn StateHooks>) -> StateHandle {
        let handle = self.add_state(id);
        self.states[handle.0].hooks = Some(hooks);
        handle
    }

    pub fn state(&self, id: &StateId) -> Option<StateHandle> {
        self.index.get(id).copied()
    }

    pub fn state_id(&self, handle: StateHandle) -> Option<&StateId> {
        self.states.get(handle.0).map(|s| &s.id)
    }

    /// Registered states in registration order
    pub fn states(&self) -> impl Iterator<Item = &StateId> {
        self.states.iter().map(|s| &s.id)
    }

    /// Add `event: from -> to`, registering both states if needed
    ///
    /// Returns false, leaving the table unchanged, if `(event, from)` already
    /// has a transition.
    pub fn add_transition(&mut self, event: EventId, from: StateId, to: StateId) -> bool {
        let from = self.add_state(from);
        let to = self.add_state(to);
        let key = (event, from);
        if self.transitions.contains_key(&key) {
            debug!(
                "Transition for '{}' from '{}' already exists in '{}'",
                key.0, self.states[from.0].id, self.name
            );
            return false;
        }
        self.transitions.insert(key, to);
        true
    }

    /// Remove `event: from -> to`; anything else is a no-op
    pub fn remove_transition(&mut self, event: &EventId, from: &StateId, to: &StateId) -> bool {
        let (Some(from), Some(to)) = (self.state(from), self.state(to)) else {
            return false;
        };
        let key = (event.clone(), from);
        if self.transitions.get(&key) != Some(&to) {
            debug!("No transition '{}' to remove in '{}'", event, self.name);
            return false;
        }
        self.transitions.remove(&key);
        true
    }

    /// Target of `event` from `from`, if any
    pub fn transition_target(&self, event: &EventId, from: &StateId) -> Option<&StateId> {
        let from = self.state(from)?;
        self.transitions
            .get(&(event.clone(), from))
            .and_then(|to| self.state_id(*to))
    }

    /// Events leaving `state`, with their targets, sorted by event
    pub fn transitions_from(&self, state: &StateId) -> Vec<(EventId, StateId)> {
        let Some(from) = self.state(state) else {
            return Vec::new();
        };
        let mut events: Vec<(EventId, StateId)> = self
            .transitions
            .iter()
            .filter(|((_, source), _)| *source == from)
            .filter_map(|((event, _), to)| Some((event.clone(), self.state_id(*to)?.clone())))
            .collect();
        events.sort();
        events
    }

    pub fn current_state(&self) -> Option<&StateId> {
        self.current.and_then(|handle| self.state_id(handle))
    }

    /// Force the current state, running exit and entry hooks without a
    /// notification
    pub fn set_current_state(&mut self, id: &StateId, world: &mut World) -> bool {
        let Some(next) = self.state(id) else {
            error!("Unknown state '{}' in '{}'", id, self.name);
            return false;
        };
        if let Some(previous) = self.current {
            self.run_exit(previous, world);
        }
        self.current = Some(next);
        self.run_entry(next, world);
        true
    }

    /// Fire `event` from the current state
    ///
    /// A missing transition is logged and returns false with no change.
    pub fn do_state_transition(&mut self, event: &EventId, world: &mut World) -> bool {
        let Some(current) = self.current else {
            error!("State machine '{}' has no current state", self.name);
            return false;
        };
        let Some(next) = self.transitions.get(&(event.clone(), current)).copied() else {
            error!(
                "No transition for event '{}' from state '{}' in '{}'",
                event, self.states[current.0].id, self.name
            );
            return false;
        };

        self.run_exit(current, world);
        self.current = Some(next);
        self.run_entry(next, world);

        let payload = StateChangedPayload {
            machine: self.name.clone(),
            event: event.to_string(),
            old_state: self.states[current.0].id.to_string(),
            new_state: self.states[next.0].id.to_string(),
        };
        info!(
            "State machine '{}': {} -> {} on '{}'",
            self.name, payload.old_state, payload.new_state, event
        );
        match world
            .message_factory()
            .create_with(MessageType::StateChanged, &payload)
        {
            Ok(message) => world.send_message(message),
            Err(e) => error!("Failed to build state change message: {}", e),
        }
        true
    }

    /// Run the current state's update hook
    pub fn update(&mut self, delta_sim_time: f64, world: &mut World) {
        if let Some(hooks) = self
            .current
            .and_then(|handle| self.states[handle.0].hooks.as_mut())
        {
            hooks.on_update(delta_sim_time, world);
        }
    }

    fn run_exit(&mut self, handle: StateHandle, world: &mut World) {
        if let Some(hooks) = self.states[handle.0].hooks.as_mut() {
            hooks.on_exit(world);
        }
    }

    fn run_entry(&mut self, handle: StateHandle, world: &mut World) {
        if let Some(hooks) = self.states[handle.0].hooks.as_mut() {
            hooks.on_entry(world);
        }
    }
}

impl SystemComponent for StateMachine {
    fn name(&self) -> &str {
        &self.name
    }

    fn process_message(&mut self, message: &Message, world: &mut World) -> Result<()> {
        match message.message_type() {
            MessageType::RequestStateTransition => {
                let request: StateTransitionRequest = message.payload()?;
                if request.machine.as_deref().is_some_and(|m| m != self.name) {
                    return Ok(());
                }
                self.do_state_transition(&EventId::new(request.event), world);
            }
            MessageType::TickLocal => {
                let tick: TickPayload = message.payload()?;
                self.update(tick.delta_sim_time, world);
            }
            _ => {}
        }
        Ok(())
    }
}

/// Requests application quit when a state machine enters its shutdown state
#[derive(Debug)]
pub struct ShutdownObserver {
    shutdown_state: StateId,
    machine: Option<String>,
}

impl ShutdownObserver {
    pub const NAME: &'static str = "shutdown_observer";

    pub fn new(shutdown_state: StateId) -> Self {
        Self {
            shutdown_state,
            machine: None,
        }
    }

    /// Only react to transitions of the named state machine
    pub fn for_machine(mut self, machine: impl Into<String>) -> Self {
        self.machine = Some(machine.into());
        self
    }
}

impl SystemComponent for ShutdownObserver {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn process_message(&mut self, message: &Message, world: &mut World) -> Result<()> {
        if *message.message_type() != MessageType::StateChanged {
            return Ok(());
        }
        let change: StateChangedPayload = message.payload()?;
        if self.machine.as_deref().is_some_and(|m| m != change.machine) {
            return Ok(());
        }
        if change.new_state == self.shutdown_state.as_str() {
            info!(
                "State machine '{}' entered '{}', requesting quit",
                change.machine, change.new_state
            );
            world.request_quit();
        }
        Ok(())
    }
}
