//! Default message processor
//!
//! Mirrors actors owned by other machines: creation and update notifications
//! from a foreign sender create or update a remote proxy, deletion
//! notifications remove it. Messages stamped with the local machine identity
//! are ignored, since the local registry already reflects them.

use crate::error::Result;
use crate::system::SystemComponent;
use crate::world::World;
use sim_types::{ActorUpdatePayload, Message, MessageType};
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct DefaultMessageProcessor;

impl DefaultMessageProcessor {
    pub const NAME: &'static str = "default_message_processor";

    pub fn new() -> Self {
        Self
    }

    fn apply_remote_update(&self, message: &Message, world: &mut World) -> Result<()> {
        let Some(actor) = message.about_actor() else {
            warn!("{} without an about actor, ignoring", message.message_type());
            return Ok(());
        };
        if world.find_actor(actor).is_some_and(|a| !a.is_remote()) {
            debug!(
                "{} from {} is about local actor {}, ignoring",
                message.message_type(),
                message.sender(),
                actor
            );
            return Ok(());
        }

        let update: ActorUpdatePayload = message.payload()?;
        let create = *message.message_type() == MessageType::ActorCreated
            || update.actor_type.is_some();
        if world.apply_actor_update(actor, &update, create, true)? {
            debug!("Created remote actor {} from {}", actor, message.sender());
        }
        Ok(())
    }

    fn remove_remote(&self, message: &Message, world: &mut World) {
        let Some(actor) = message.about_actor() else {
            return;
        };
        match world.find_actor(actor) {
            Some(proxy) if proxy.is_remote() => {
                world.mark_actor_for_removal(actor);
            }
            Some(_) => warn!("Remote delete of local actor {} ignored", actor),
            None => debug!("Remote delete of unknown actor {}", actor),
        }
    }
}

impl SystemComponent for DefaultMessageProcessor {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn process_message(&mut self, message: &Message, world: &mut World) -> Result<()> {
        if message.sender() == world.machine_info() {
            return Ok(());
        }
        match message.message_type() {
            MessageType::ActorCreated | MessageType::ActorUpdated => {
                self.apply_remote_update(message, world)
            }
            MessageType::ActorDeleted => {
                self.remove_remote(message, world);
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
