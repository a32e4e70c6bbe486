//! Test utilities for actor system consumers

use crate::error::Result;
use crate::system::SystemComponent;
use crate::world::World;
use sim_types::{Message, MessageType};

/// System component that records every message it sees
#[derive(Debug, Default)]
pub struct MessageCollector {
    messages: Vec<Message>,
    include_ticks: bool,
}

impl MessageCollector {
    pub const NAME: &'static str = "message_collector";

    /// Collector that skips tick messages
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ticks(mut self) -> Self {
        self.include_ticks = true;
        self
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn of_type(&self, message_type: &MessageType) -> Vec<&Message> {
        self.messages
            .iter()
            .filter(|m| m.message_type() == message_type)
            .collect()
    }

    pub fn count(&self, message_type: &MessageType) -> usize {
        self.of_type(message_type).len()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

impl SystemComponent for MessageCollector {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn process_message(&mut self, message: &Message, _world: &mut World) -> Result<()> {
        if self.include_ticks || !message.message_type().is_tick() {
            self.messages.push(message.clone());
        }
        Ok(())
    }
}
