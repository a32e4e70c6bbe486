//! # Messages
//!
//! A [`Message`] is a type tag, a sender identity, an optional "about actor"
//! id and an ordered parameter map. Messages are built by value and handed to
//! the orchestrator; from then on every consumer only sees `&Message`, so a
//! dispatched message cannot change underneath later consumers.
//!
//! Typed content is read and written through [`MessagePayload`]
//! implementations, which check the message type before touching parameters.

use crate::{
    ActorId, FromParameter, MachineInfo, MessageError, MessageType, ParameterValue, Parameters,
};
use serde::{Deserialize, Serialize};

/// Typed, parameterised event flowing through the runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    message_type: MessageType,
    sender: MachineInfo,
    about_actor: Option<ActorId>,
    sending_actor: Option<ActorId>,
    parameters: Parameters,
}

impl Message {
    pub fn new(message_type: MessageType, sender: MachineInfo) -> Self {
        Self {
            message_type,
            sender,
            about_actor: None,
            sending_actor: None,
            parameters: Parameters::new(),
        }
    }

    pub fn message_type(&self) -> &MessageType {
        &self.message_type
    }

    pub fn sender(&self) -> &MachineInfo {
        &self.sender
    }

    pub fn about_actor(&self) -> Option<ActorId> {
        self.about_actor
    }

    pub fn sending_actor(&self) -> Option<ActorId> {
        self.sending_actor
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn with_about_actor(mut self, actor: ActorId) -> Self {
        self.about_actor = Some(actor);
        self
    }

    pub fn with_sending_actor(mut self, actor: ActorId) -> Self {
        self.sending_actor = Some(actor);
        self
    }

    /// Re-source a message, e.g. when replaying it from a log
    pub fn with_sender(mut self, sender: MachineInfo) -> Self {
        self.sender = sender;
        self
    }

    pub fn with_parameter(
        mut self,
        name: impl Into<String>,
        value: impl Into<ParameterValue>,
    ) -> Self {
        self.parameters.set(name, value);
        self
    }

    /// Typed parameter read
    pub fn parameter<T: FromParameter>(&self, name: &str) -> Result<T, MessageError> {
        self.parameters.get_as(name)
    }

    /// Attach a typed payload, checking that this message type carries it
    pub fn with_payload<P: MessagePayload>(mut self, payload: &P) -> Result<Self, MessageError> {
        ensure_carries::<P>(&self.message_type)?;
        payload.write_parameters(&mut self.parameters);
        Ok(self)
    }

    /// Read a typed payload, checking that this message type carries it
    pub fn payload<P: MessagePayload>(&self) -> Result<P, MessageError> {
        ensure_carries::<P>(&self.message_type)?;
        P::read_parameters(&self.parameters)
    }
}

fn ensure_carries<P: MessagePayload>(message_type: &MessageType) -> Result<(), MessageError> {
    if P::accepts(message_type) {
        Ok(())
    } else {
        Err(MessageError::WrongMessageType {
            payload: P::NAME,
            message_type: message_type.name().to_string(),
        })
    }
}

/// Typed view of a message's parameters
pub trait MessagePayload: Sized {
    const NAME: &'static str;

    /// Whether messages of `message_type` carry this payload
    fn accepts(message_type: &MessageType) -> bool;

    fn write_parameters(&self, parameters: &mut Parameters);

    fn read_parameters(parameters: &Parameters) -> Result<Self, MessageError>;
}

/// Creates messages stamped with the local machine identity
#[derive(Debug, Clone)]
pub struct MessageFactory {
    sender: MachineInfo,
}

impl MessageFactory {
    pub fn new(sender: MachineInfo) -> Self {
        Self { sender }
    }

    pub fn machine_info(&self) -> &MachineInfo {
        &self.sender
    }

    pub fn create(&self, message_type: MessageType) -> Message {
        Message::new(message_type, self.sender.clone())
    }

    pub fn create_with<P: MessagePayload>(
        &self,
        message_type: MessageType,
        payload: &P,
    ) -> Result<Message, MessageError> {
        self.create(message_type).with_payload(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{StateChangedPayload, TimerElapsedPayload};

    fn factory() -> MessageFactory {
        MessageFactory::new(MachineInfo::new("test"))
    }

    #[test]
    fn test_factory_stamps_sender() {
        let factory = factory();
        let message = factory.create(MessageType::TickLocal);
        assert_eq!(message.sender(), factory.machine_info());
        assert_eq!(message.about_actor(), None);
    }

    #[test]
    fn test_payload_on_wrong_type_fails_closed() {
        let payload = TimerElapsedPayload {
            timer_name: "heartbeat".into(),
            late_time: 0.5,
        };
        let err = factory()
            .create_with(MessageType::ActorCreated, &payload)
            .unwrap_err();
        assert!(matches!(err, MessageError::WrongMessageType { .. }));

        let message = factory()
            .create_with(MessageType::TimerElapsed, &payload)
            .unwrap();
        assert!(message.payload::<StateChangedPayload>().is_err());
        assert_eq!(message.payload::<TimerElapsedPayload>().unwrap(), payload);
    }

    #[test]
    fn test_message_survives_bincode() {
        let actor = ActorId::new();
        let message = factory()
            .create(MessageType::ActorUpdated)
            .with_about_actor(actor)
            .with_parameter("health", 75i64)
            .with_parameter("position", [1.0, 2.0, 3.0]);

        let bytes = bincode::serialize(&message).unwrap();
        let decoded: Message = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, message);
        assert_eq!(decoded.parameter::<i64>("health").unwrap(), 75);
    }
}
