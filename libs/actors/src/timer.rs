//! # Timer Scheduler
//!
//! Named, optionally repeating timers delivered as `TimerElapsed` messages.
//!
//! Entries live in a map ordered by `(fire_time_us, sequence)`. The sequence
//! number is taken at registration, so timers sharing a fire time fire in the
//! order they were set. Identity of a timer is the full
//! `(name, about_actor, fire_time, interval, repeat)` tuple: several actors
//! may use the same timer name.
//!
//! [`TimerScheduler::process_timers`] stops at the first entry still in the
//! future. Repeating timers are re-armed at `fire_time + interval` only after
//! the pass, so one call never fires the same timer twice.

use sim_types::{
    micros_to_seconds, seconds_to_micros, ActorId, Message, MessageFactory, MessageType,
    TimerElapsedPayload,
};
use std::collections::BTreeMap;
use tracing::{debug, error};

/// One scheduled timer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerEntry {
    pub name: String,
    pub about_actor: Option<ActorId>,
    pub fire_time_us: u64,
    pub interval_us: u64,
    pub repeat: bool,
}

#[derive(Debug, Default)]
pub struct TimerScheduler {
    timers: BTreeMap<(u64, u64), TimerEntry>,
    next_sequence: u64,
}

impl TimerScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a timer to fire `interval_secs` after `now_us`
    pub fn set_timer(
        &mut self,
        name: &str,
        about_actor: Option<ActorId>,
        now_us: u64,
        interval_secs: f64,
        repeat: bool,
    ) -> bool {
        let interval_us = seconds_to_micros(interval_secs);
        self.insert(TimerEntry {
            name: name.to_string(),
            about_actor,
            fire_time_us: now_us.saturating_add(interval_us),
            interval_us,
            repeat,
        })
    }

    /// Insert an entry; an identical entry already scheduled makes this a no-op
    pub fn insert(&mut self, entry: TimerEntry) -> bool {
        let fire_time = entry.fire_time_us;
        let duplicate = self
            .timers
            .range((fire_time, 0)..=(fire_time, u64::MAX))
            .any(|(_, existing)| *existing == entry);
        if duplicate {
            debug!(
                "Timer '{}' already scheduled at {}us, ignoring",
                entry.name, fire_time
            );
            return false;
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.timers.insert((fire_time, sequence), entry);
        true
    }

    /// Remove every entry with this name and about-actor
    pub fn clear_timer(&mut self, name: &str, about_actor: Option<ActorId>) -> bool {
        let before = self.timers.len();
        self.timers
            .retain(|_, t| !(t.name == name && t.about_actor == about_actor));
        let removed = before != self.timers.len();
        if !removed {
            debug!("No timer '{}' to clear", name);
        }
        removed
    }

    /// Remove every timer about `actor`, returning how many were dropped
    pub fn clear_actor_timers(&mut self, actor: ActorId) -> usize {
        let before = self.timers.len();
        self.timers.retain(|_, t| t.about_actor != Some(actor));
        before - self.timers.len()
    }

    /// Fire every timer due at `now_us`, in fire time order
    pub fn process_timers(&mut self, now_us: u64, factory: &MessageFactory) -> Vec<Message> {
        let mut fired = Vec::new();
        let mut rearmed = Vec::new();

        while let Some(entry) = self.timers.first_entry() {
            if entry.key().0 > now_us {
                break;
            }
            let timer = entry.remove();

            let payload = TimerElapsedPayload {
                timer_name: timer.name.clone(),
                late_time: micros_to_seconds(now_us - timer.fire_time_us),
            };
            match factory.create_with(MessageType::TimerElapsed, &payload) {
                Ok(message) => fired.push(match timer.about_actor {
                    Some(actor) => message.with_about_actor(actor),
                    None => message,
                }),
                Err(e) => error!("Failed to build timer message for '{}': {}", timer.name, e),
            }

            if timer.repeat {
                rearmed.push(TimerEntry {
                    fire_time_us: timer.fire_time_us.saturating_add(timer.interval_us),
                    ..timer
                });
            }
        }

        for timer in rearmed {
            self.insert(timer);
        }
        fired
    }

    pub fn next_fire_time_us(&self) -> Option<u64> {
        self.timers.keys().next().map(|(fire_time, _)| *fire_time)
    }

    pub fn find(&self, name: &str, about_actor: Option<ActorId>) -> Option<&TimerEntry> {
        self.timers
            .values()
            .find(|t| t.name == name && t.about_actor == about_actor)
    }

    /// Entries in firing order
    pub fn entries(&self) -> impl Iterator<Item = &TimerEntry> {
        self.timers.values()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn clear(&mut self) {
        self.timers.clear();
    }
}
