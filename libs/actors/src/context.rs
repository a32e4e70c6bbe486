//! Simulation context
//!
//! Explicit replacement for ambient machine-identity, logger and clock
//! lookups: the orchestrator receives one [`SimContext`] at construction and
//! everything it owns reads identity and time from there.

use crate::clock::SimulationClock;
use sim_types::MachineInfo;
use tracing::Span;

#[derive(Debug, Clone)]
pub struct SimContext {
    machine: MachineInfo,
    clock: SimulationClock,
    span: Span,
}

impl SimContext {
    pub fn new(machine: MachineInfo) -> Self {
        let span = tracing::info_span!("simulation", machine = %machine.name());
        Self {
            machine,
            clock: SimulationClock::default(),
            span,
        }
    }

    pub fn with_clock(mut self, clock: SimulationClock) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the logging span every step runs inside
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn machine(&self) -> &MachineInfo {
        &self.machine
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut SimulationClock {
        &mut self.clock
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}
