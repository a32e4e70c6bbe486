//! Payloads of the replay recorder's request and reply messages
//!
//! Ignore-list requests carry no payload; the actor travels as the message's
//! about actor.

use crate::records::{LogKeyframe, LogStatus, LogTag};
use sim_types::{MessageError, MessagePayload, MessageType, Parameters};

/// Recorder status, sent in reply to most requests
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LogStatusPayload {
    pub status: LogStatus,
}

impl MessagePayload for LogStatusPayload {
    const NAME: &'static str = "LogStatusPayload";

    fn accepts(message_type: &MessageType) -> bool {
        *message_type == MessageType::LogInfoStatus
    }

    fn write_parameters(&self, parameters: &mut Parameters) {
        parameters.merge(&self.status.to_parameters());
    }

    fn read_parameters(parameters: &Parameters) -> Result<Self, MessageError> {
        Ok(Self {
            status: LogStatus::from_parameters(parameters)?,
        })
    }
}

/// Keyframe to capture or to jump to
#[derive(Debug, Clone, PartialEq)]
pub struct KeyframeRequest {
    pub keyframe: LogKeyframe,
}

impl MessagePayload for KeyframeRequest {
    const NAME: &'static str = "KeyframeRequest";

    fn accepts(message_type: &MessageType) -> bool {
        matches!(
            message_type,
            MessageType::LogRequestCaptureKeyframe | MessageType::LogRequestJumpToKeyframe
        )
    }

    fn write_parameters(&self, parameters: &mut Parameters) {
        parameters.set("keyframe", self.keyframe.to_parameters());
    }

    fn read_parameters(parameters: &Parameters) -> Result<Self, MessageError> {
        let keyframe: Parameters = parameters.get_as("keyframe")?;
        Ok(Self {
            keyframe: LogKeyframe::from_parameters(&keyframe)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertTagRequest {
    pub tag: LogTag,
}

impl MessagePayload for InsertTagRequest {
    const NAME: &'static str = "InsertTagRequest";

    fn accepts(message_type: &MessageType) -> bool {
        *message_type == MessageType::LogRequestInsertTag
    }

    fn write_parameters(&self, parameters: &mut Parameters) {
        parameters.set("tag", self.tag.to_parameters());
    }

    fn read_parameters(parameters: &Parameters) -> Result<Self, MessageError> {
        let tag: Parameters = parameters.get_as("tag")?;
        Ok(Self {
            tag: LogTag::from_parameters(&tag)?,
        })
    }
}

/// Log to select or delete
#[derive(Debug, Clone, PartialEq)]
pub struct LogFileRequest {
    pub log_file: String,
}

impl MessagePayload for LogFileRequest {
    const NAME: &'static str = "LogFileRequest";

    fn accepts(message_type: &MessageType) -> bool {
        matches!(
            message_type,
            MessageType::LogRequestSetLogFile | MessageType::LogRequestDeleteLog
        )
    }

    fn write_parameters(&self, parameters: &mut Parameters) {
        parameters.set("log_file", self.log_file.as_str());
    }

    fn read_parameters(parameters: &Parameters) -> Result<Self, MessageError> {
        Ok(Self {
            log_file: parameters.get_as("log_file")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoKeyframeIntervalRequest {
    pub interval: f64,
}

impl MessagePayload for AutoKeyframeIntervalRequest {
    const NAME: &'static str = "AutoKeyframeIntervalRequest";

    fn accepts(message_type: &MessageType) -> bool {
        *message_type == MessageType::LogRequestSetAutoKeyframeInterval
    }

    fn write_parameters(&self, parameters: &mut Parameters) {
        parameters.set("interval", self.interval);
    }

    fn read_parameters(parameters: &Parameters) -> Result<Self, MessageError> {
        Ok(Self {
            interval: parameters.get_as("interval")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeyframeList {
    pub keyframes: Vec<LogKeyframe>,
}

impl MessagePayload for KeyframeList {
    const NAME: &'static str = "KeyframeList";

    fn accepts(message_type: &MessageType) -> bool {
        *message_type == MessageType::LogInfoKeyframes
    }

    fn write_parameters(&self, parameters: &mut Parameters) {
        let keyframes: Vec<Parameters> = self.keyframes.iter().map(LogKeyframe::to_parameters).collect();
        parameters.set("keyframes", keyframes);
    }

    fn read_parameters(parameters: &Parameters) -> Result<Self, MessageError> {
        let groups: Vec<Parameters> = parameters.get_as("keyframes")?;
        Ok(Self {
            keyframes: groups
                .iter()
                .map(LogKeyframe::from_parameters)
                .collect::<Result<_, _>>()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TagList {
    pub tags: Vec<LogTag>,
}

impl MessagePayload for TagList {
    const NAME: &'static str = "TagList";

    fn accepts(message_type: &MessageType) -> bool {
        *message_type == MessageType::LogInfoTags
    }

    fn write_parameters(&self, parameters: &mut Parameters) {
        let tags: Vec<Parameters> = self.tags.iter().map(LogTag::to_parameters).collect();
        parameters.set("tags", tags);
    }

    fn read_parameters(parameters: &Parameters) -> Result<Self, MessageError> {
        let groups: Vec<Parameters> = parameters.get_as("tags")?;
        Ok(Self {
            tags: groups
                .iter()
                .map(LogTag::from_parameters)
                .collect::<Result<_, _>>()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LogList {
    pub logs: Vec<String>,
}

impl MessagePayload for LogList {
    const NAME: &'static str = "LogList";

    fn accepts(message_type: &MessageType) -> bool {
        *message_type == MessageType::LogInfoLogs
    }

    fn write_parameters(&self, parameters: &mut Parameters) {
        parameters.set("logs", self.logs.clone());
    }

    fn read_parameters(parameters: &Parameters) -> Result<Self, MessageError> {
        Ok(Self {
            logs: parameters.get_as("logs")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::LogState;
    use sim_types::{MachineInfo, MessageFactory};

    #[test]
    fn test_keyframe_request_only_on_keyframe_requests() {
        let factory = MessageFactory::new(MachineInfo::new("test"));
        let request = KeyframeRequest {
            keyframe: LogKeyframe::new("checkpoint"),
        };
        let message = factory
            .create_with(MessageType::LogRequestJumpToKeyframe, &request)
            .unwrap();
        assert_eq!(message.payload::<KeyframeRequest>().unwrap(), request);
        assert!(factory
            .create_with(MessageType::LogRequestInsertTag, &request)
            .is_err());
    }

    #[test]
    fn test_status_payload_is_flat() {
        let factory = MessageFactory::new(MachineInfo::new("test"));
        let payload = LogStatusPayload {
            status: LogStatus {
                state: LogState::Record,
                log_file: "session".into(),
                num_messages: 12,
                ..Default::default()
            },
        };
        let message = factory
            .create_with(MessageType::LogInfoStatus, &payload)
            .unwrap();
        assert_eq!(message.parameter::<String>("state").unwrap(), "Record");
        assert_eq!(message.payload::<LogStatusPayload>().unwrap(), payload);
    }

    #[test]
    fn test_keyframe_list_preserves_order() {
        let list = KeyframeList {
            keyframes: vec![LogKeyframe::new("a"), LogKeyframe::new("b")],
        };
        let mut params = Parameters::new();
        list.write_parameters(&mut params);
        let names: Vec<String> = KeyframeList::read_parameters(&params)
            .unwrap()
            .keyframes
            .into_iter()
            .map(|k| k.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
