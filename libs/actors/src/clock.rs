//! Simulation clock
//!
//! Two microsecond clocks: simulation time advances by the real step scaled
//! by the time scale (and not at all while paused), real time advances by the
//! raw step.

use sim_types::{micros_to_seconds, seconds_to_micros, TickPayload};

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationClock {
    sim_time_us: u64,
    real_time_us: u64,
    time_scale: f64,
    paused: bool,
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self {
            sim_time_us: 0,
            real_time_us: 0,
            time_scale: 1.0,
            paused: false,
        }
    }
}

impl SimulationClock {
    pub fn new(time_scale: f64) -> Self {
        Self {
            time_scale,
            ..Self::default()
        }
    }

    /// Advance both clocks by one step and describe the step as a tick
    pub fn advance(&mut self, delta_real_secs: f64) -> TickPayload {
        let delta_real_us = seconds_to_micros(delta_real_secs);
        self.real_time_us += delta_real_us;

        let delta_sim_us = if self.paused {
            0
        } else {
            seconds_to_micros(delta_real_secs * self.time_scale)
        };
        self.sim_time_us += delta_sim_us;

        TickPayload {
            delta_sim_time: micros_to_seconds(delta_sim_us),
            delta_real_time: micros_to_seconds(delta_real_us),
            time_scale: self.time_scale,
            simulation_time: self.simulation_time(),
        }
    }

    /// Jump simulation time and change the scale, e.g. after a keyframe jump
    pub fn change_time_settings(&mut self, simulation_time: f64, time_scale: f64) {
        self.sim_time_us = seconds_to_micros(simulation_time);
        if time_scale > 0.0 {
            self.time_scale = time_scale;
        }
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    pub fn sim_time_us(&self) -> u64 {
        self.sim_time_us
    }

    pub fn real_time_us(&self) -> u64 {
        self.real_time_us
    }

    /// Simulation time in seconds
    pub fn simulation_time(&self) -> f64 {
        micros_to_seconds(self.sim_time_us)
    }

    pub fn real_time(&self) -> f64 {
        micros_to_seconds(self.real_time_us)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_applies_time_scale() {
        let mut clock = SimulationClock::new(2.0);
        let tick = clock.advance(0.5);
        assert_eq!(clock.sim_time_us(), 1_000_000);
        assert_eq!(clock.real_time_us(), 500_000);
        assert_eq!(tick.delta_sim_time, 1.0);
        assert_eq!(tick.simulation_time, 1.0);
    }

    #[test]
    fn test_paused_clock_only_advances_real_time() {
        let mut clock = SimulationClock::default();
        clock.set_paused(true);
        let tick = clock.advance(1.0);
        assert_eq!(tick.delta_sim_time, 0.0);
        assert_eq!(clock.simulation_time(), 0.0);
        assert_eq!(clock.real_time(), 1.0);
    }

    #[test]
    fn test_change_time_settings_keeps_scale_when_invalid() {
        let mut clock = SimulationClock::new(1.5);
        clock.change_time_settings(10.0, 0.0);
        assert_eq!(clock.simulation_time(), 10.0);
        assert_eq!(clock.time_scale(), 1.5);
    }
}
