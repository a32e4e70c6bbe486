//! # Typed Payloads
//!
//! Payload structs for the message types the runtime itself defines. Each
//! payload declares which message types carry it; reading it from any other
//! type fails with [`MessageError::WrongMessageType`].

use crate::{ActorId, ActorType, MessageError, MessagePayload, MessageType, Parameters};

/// Clock snapshot carried by every tick message
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickPayload {
    /// Simulated seconds elapsed since the previous step
    pub delta_sim_time: f64,
    /// Wall clock seconds elapsed since the previous step
    pub delta_real_time: f64,
    pub time_scale: f64,
    /// Absolute simulation time in seconds
    pub simulation_time: f64,
}

impl MessagePayload for TickPayload {
    const NAME: &'static str = "TickPayload";

    fn accepts(message_type: &MessageType) -> bool {
        message_type.is_tick()
    }

    fn write_parameters(&self, parameters: &mut Parameters) {
        parameters.set("delta_sim_time", self.delta_sim_time);
        parameters.set("delta_real_time", self.delta_real_time);
        parameters.set("time_scale", self.time_scale);
        parameters.set("simulation_time", self.simulation_time);
    }

    fn read_parameters(parameters: &Parameters) -> Result<Self, MessageError> {
        Ok(Self {
            delta_sim_time: parameters.get_as("delta_sim_time")?,
            delta_real_time: parameters.get_as("delta_real_time")?,
            time_scale: parameters.get_as("time_scale")?,
            simulation_time: parameters.get_as("simulation_time")?,
        })
    }
}

/// A timer came due; the owning actor travels as the message's about actor
#[derive(Debug, Clone, PartialEq)]
pub struct TimerElapsedPayload {
    pub timer_name: String,
    /// Seconds between the scheduled fire time and the processing time
    pub late_time: f64,
}

impl MessagePayload for TimerElapsedPayload {
    const NAME: &'static str = "TimerElapsedPayload";

    fn accepts(message_type: &MessageType) -> bool {
        *message_type == MessageType::TimerElapsed
    }

    fn write_parameters(&self, parameters: &mut Parameters) {
        parameters.set("timer_name", self.timer_name.as_str());
        parameters.set("late_time", self.late_time);
    }

    fn read_parameters(parameters: &Parameters) -> Result<Self, MessageError> {
        Ok(Self {
            timer_name: parameters.get_as("timer_name")?,
            late_time: parameters.get_as("late_time")?,
        })
    }
}

/// Full or partial actor state, carried by created/updated notifications and
/// written into keyframes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActorUpdatePayload {
    pub name: Option<String>,
    pub actor_type: Option<ActorType>,
    pub parent: Option<ActorId>,
    pub properties: Parameters,
}

impl MessagePayload for ActorUpdatePayload {
    const NAME: &'static str = "ActorUpdatePayload";

    fn accepts(message_type: &MessageType) -> bool {
        matches!(
            message_type,
            MessageType::ActorCreated | MessageType::ActorUpdated
        )
    }

    fn write_parameters(&self, parameters: &mut Parameters) {
        if let Some(name) = &self.name {
            parameters.set("name", name.as_str());
        }
        if let Some(actor_type) = &self.actor_type {
            parameters.set("actor_category", actor_type.category());
            parameters.set("actor_type", actor_type.name());
        }
        if let Some(parent) = self.parent {
            parameters.set("parent", parent);
        }
        parameters.set("properties", self.properties.clone());
    }

    fn read_parameters(parameters: &Parameters) -> Result<Self, MessageError> {
        let category: Option<String> = parameters.get_optional("actor_category")?;
        let type_name: Option<String> = parameters.get_optional("actor_type")?;
        let actor_type = match (category, type_name) {
            (Some(category), Some(name)) => Some(ActorType::new(category, name)),
            (None, None) => None,
            _ => {
                return Err(MessageError::invalid_value(
                    "actor_type",
                    "category and type name must be sent together",
                ))
            }
        };

        Ok(Self {
            name: parameters.get_optional("name")?,
            actor_type,
            parent: parameters.get_optional("parent")?,
            properties: parameters.get_optional("properties")?.unwrap_or_default(),
        })
    }
}

/// Names of the maps now loaded
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapChangedPayload {
    pub map_names: Vec<String>,
}

impl MessagePayload for MapChangedPayload {
    const NAME: &'static str = "MapChangedPayload";

    fn accepts(message_type: &MessageType) -> bool {
        *message_type == MessageType::MapChanged
    }

    fn write_parameters(&self, parameters: &mut Parameters) {
        parameters.set("map_names", self.map_names.clone());
    }

    fn read_parameters(parameters: &Parameters) -> Result<Self, MessageError> {
        Ok(Self {
            map_names: parameters.get_as("map_names")?,
        })
    }
}

/// Ask a state machine to fire `event`
///
/// When `machine` is set only the state machine with that name reacts.
#[derive(Debug, Clone, PartialEq)]
pub struct StateTransitionRequest {
    pub event: String,
    pub machine: Option<String>,
}

impl MessagePayload for StateTransitionRequest {
    const NAME: &'static str = "StateTransitionRequest";

    fn accepts(message_type: &MessageType) -> bool {
        *message_type == MessageType::RequestStateTransition
    }

    fn write_parameters(&self, parameters: &mut Parameters) {
        parameters.set("event", self.event.as_str());
        if let Some(machine) = &self.machine {
            parameters.set("machine", machine.as_str());
        }
    }

    fn read_parameters(parameters: &Parameters) -> Result<Self, MessageError> {
        Ok(Self {
            event: parameters.get_as("event")?,
            machine: parameters.get_optional("machine")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateChangedPayload {
    pub machine: String,
    pub event: String,
    pub old_state: String,
    pub new_state: String,
}

impl MessagePayload for StateChangedPayload {
    const NAME: &'static str = "StateChangedPayload";

    fn accepts(message_type: &MessageType) -> bool {
        *message_type == MessageType::StateChanged
    }

    fn write_parameters(&self, parameters: &mut Parameters) {
        parameters.set("machine", self.machine.as_str());
        parameters.set("event", self.event.as_str());
        parameters.set("old_state", self.old_state.as_str());
        parameters.set("new_state", self.new_state.as_str());
    }

    fn read_parameters(parameters: &Parameters) -> Result<Self, MessageError> {
        Ok(Self {
            machine: parameters.get_as("machine")?,
            event: parameters.get_as("event")?,
            old_state: parameters.get_as("old_state")?,
            new_state: parameters.get_as("new_state")?,
        })
    }
}

/// Begin/end marker of a keyframe block
#[derive(Debug, Clone, PartialEq)]
pub struct KeyframeTransactionPayload {
    pub keyframe_name: String,
    /// Only meaningful on the end marker
    pub success: bool,
}

impl MessagePayload for KeyframeTransactionPayload {
    const NAME: &'static str = "KeyframeTransactionPayload";

    fn accepts(message_type: &MessageType) -> bool {
        message_type.is_keyframe_marker()
    }

    fn write_parameters(&self, parameters: &mut Parameters) {
        parameters.set("keyframe_name", self.keyframe_name.as_str());
        parameters.set("success", self.success);
    }

    fn read_parameters(parameters: &Parameters) -> Result<Self, MessageError> {
        Ok(Self {
            keyframe_name: parameters.get_as("keyframe_name")?,
            success: parameters.get_as("success")?,
        })
    }
}

/// A component refused a request
#[derive(Debug, Clone, PartialEq)]
pub struct RequestRejectedPayload {
    /// Name of the rejected message type
    pub request: String,
    pub reason: String,
}

impl MessagePayload for RequestRejectedPayload {
    const NAME: &'static str = "RequestRejectedPayload";

    fn accepts(message_type: &MessageType) -> bool {
        *message_type == MessageType::RequestRejected
    }

    fn write_parameters(&self, parameters: &mut Parameters) {
        parameters.set("request", self.request.as_str());
        parameters.set("reason", self.reason.as_str());
    }

    fn read_parameters(parameters: &Parameters) -> Result<Self, MessageError> {
        Ok(Self {
            request: parameters.get_as("request")?,
            reason: parameters.get_as("reason")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MachineInfo, MessageFactory};

    #[test]
    fn test_tick_payload_is_shared_by_all_tick_types() {
        let factory = MessageFactory::new(MachineInfo::new("test"));
        let tick = TickPayload {
            delta_sim_time: 0.1,
            delta_real_time: 0.05,
            time_scale: 2.0,
            simulation_time: 10.0,
        };
        for message_type in [
            MessageType::TickLocal,
            MessageType::TickRemote,
            MessageType::TickEndOfFrame,
        ] {
            let message = factory.create_with(message_type, &tick).unwrap();
            assert_eq!(message.payload::<TickPayload>().unwrap(), tick);
        }
        assert!(factory.create_with(MessageType::TimerElapsed, &tick).is_err());
    }

    #[test]
    fn test_actor_update_optional_fields() {
        let sparse = ActorUpdatePayload {
            properties: Parameters::new().with("health", 10i64),
            ..Default::default()
        };
        let mut params = Parameters::new();
        sparse.write_parameters(&mut params);
        assert!(!params.contains("name"));
        assert_eq!(ActorUpdatePayload::read_parameters(&params).unwrap(), sparse);

        let parent = ActorId::new();
        let full = ActorUpdatePayload {
            name: Some("truck".into()),
            actor_type: Some(ActorType::new("vehicles", "Truck")),
            parent: Some(parent),
            properties: Parameters::new(),
        };
        let mut params = Parameters::new();
        full.write_parameters(&mut params);
        assert_eq!(ActorUpdatePayload::read_parameters(&params).unwrap(), full);
    }

    #[test]
    fn test_actor_update_rejects_half_type() {
        let params = Parameters::new().with("actor_category", "vehicles");
        let err = ActorUpdatePayload::read_parameters(&params).unwrap_err();
        assert!(matches!(err, MessageError::InvalidValue { .. }));
    }

    #[test]
    fn test_state_transition_request_machine_is_optional() {
        let params = Parameters::new().with("event", "start");
        let request = StateTransitionRequest::read_parameters(&params).unwrap();
        assert_eq!(request.event, "start");
        assert_eq!(request.machine, None);
    }
}
