//! # Replay Records
//!
//! Keyframe and tag metadata stored in a log index, the recorder's
//! [`LogState`] machine and the [`LogStatus`] it reports.
//!
//! Records cross the message bus as parameter groups and hit the disk through
//! `serde`; both encodings live here.

use serde::{Deserialize, Serialize};
use sim_types::{MessageError, Parameters};
use std::fmt;
use uuid::Uuid;

/// Recorder state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LogState {
    #[default]
    Idle,
    Record,
    Playback,
}

impl LogState {
    /// Only Idle to Record, Idle to Playback and back to Idle are allowed
    pub fn can_transition_to(&self, next: LogState) -> bool {
        matches!(
            (self, next),
            (LogState::Idle, LogState::Record)
                | (LogState::Idle, LogState::Playback)
                | (LogState::Record, LogState::Idle)
                | (LogState::Playback, LogState::Idle)
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            LogState::Idle => "Idle",
            LogState::Record => "Record",
            LogState::Playback => "Playback",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Idle" => Some(LogState::Idle),
            "Record" => Some(LogState::Record),
            "Playback" => Some(LogState::Playback),
            _ => None,
        }
    }
}

impl fmt::Display for LogState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Seek point in a log: the position of a keyframe block and its metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogKeyframe {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    /// Simulation seconds at capture
    pub sim_time: f64,
    pub active_maps: Vec<String>,
    /// Tag whose insertion triggered the capture
    pub tag_id: Option<Uuid>,
    /// Stream position of the block's begin marker
    pub position: u64,
}

impl LogKeyframe {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            sim_time: 0.0,
            active_maps: Vec::new(),
            tag_id: None,
            position: 0,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn to_parameters(&self) -> Parameters {
        let mut parameters = Parameters::new()
            .with("id", self.id.to_string())
            .with("name", self.name.as_str())
            .with("description", self.description.as_str())
            .with("sim_time", self.sim_time)
            .with("active_maps", self.active_maps.clone())
            .with("position", position_param(self.position));
        if let Some(tag_id) = self.tag_id {
            parameters.set("tag_id", tag_id.to_string());
        }
        parameters
    }

    pub fn from_parameters(parameters: &Parameters) -> Result<Self, MessageError> {
        Ok(Self {
            id: read_uuid(parameters, "id")?,
            name: parameters.get_as("name")?,
            description: parameters.get_optional("description")?.unwrap_or_default(),
            sim_time: parameters.get_optional("sim_time")?.unwrap_or_default(),
            active_maps: parameters.get_optional("active_maps")?.unwrap_or_default(),
            tag_id: read_optional_uuid(parameters, "tag_id")?,
            position: read_position(parameters)?,
        })
    }
}

/// Named marker at a point of a recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogTag {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub sim_time: f64,
    /// Keyframe captured alongside the tag
    pub keyframe_id: Option<Uuid>,
    /// Request a keyframe capture when the tag is inserted
    pub capture_keyframe: bool,
    pub position: u64,
}

impl LogTag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            sim_time: 0.0,
            keyframe_id: None,
            capture_keyframe: false,
            position: 0,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_keyframe_capture(mut self) -> Self {
        self.capture_keyframe = true;
        self
    }

    pub fn to_parameters(&self) -> Parameters {
        let mut parameters = Parameters::new()
            .with("id", self.id.to_string())
            .with("name", self.name.as_str())
            .with("description", self.description.as_str())
            .with("sim_time", self.sim_time)
            .with("capture_keyframe", self.capture_keyframe)
            .with("position", position_param(self.position));
        if let Some(keyframe_id) = self.keyframe_id {
            parameters.set("keyframe_id", keyframe_id.to_string());
        }
        parameters
    }

    pub fn from_parameters(parameters: &Parameters) -> Result<Self, MessageError> {
        Ok(Self {
            id: read_uuid(parameters, "id")?,
            name: parameters.get_as("name")?,
            description: parameters.get_optional("description")?.unwrap_or_default(),
            sim_time: parameters.get_optional("sim_time")?.unwrap_or_default(),
            keyframe_id: read_optional_uuid(parameters, "keyframe_id")?,
            capture_keyframe: parameters
                .get_optional("capture_keyframe")?
                .unwrap_or_default(),
            position: read_position(parameters)?,
        })
    }
}

/// Snapshot of the recorder reported in status messages
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LogStatus {
    pub state: LogState,
    pub log_file: String,
    /// Seconds between automatic keyframes; 0 disables them
    pub auto_keyframe_interval: f64,
    pub current_sim_time: f64,
    /// Simulated seconds covered by the current recording
    pub record_duration: f64,
    /// Messages recorded or played back since the last state change
    pub num_messages: u64,
    pub active_maps: Vec<String>,
}

impl LogStatus {
    pub fn to_parameters(&self) -> Parameters {
        Parameters::new()
            .with("state", self.state.name())
            .with("log_file", self.log_file.as_str())
            .with("auto_keyframe_interval", self.auto_keyframe_interval)
            .with("current_sim_time", self.current_sim_time)
            .with("record_duration", self.record_duration)
            .with("num_messages", position_param(self.num_messages))
            .with("active_maps", self.active_maps.clone())
    }

    pub fn from_parameters(parameters: &Parameters) -> Result<Self, MessageError> {
        let state: String = parameters.get_as("state")?;
        let state = LogState::from_name(&state)
            .ok_or_else(|| MessageError::invalid_value("state", format!("unknown state '{}'", state)))?;
        let num_messages: i64 = parameters.get_as("num_messages")?;
        Ok(Self {
            state,
            log_file: parameters.get_as("log_file")?,
            auto_keyframe_interval: parameters.get_as("auto_keyframe_interval")?,
            current_sim_time: parameters.get_as("current_sim_time")?,
            record_duration: parameters.get_as("record_duration")?,
            num_messages: u64::try_from(num_messages)
                .map_err(|_| MessageError::invalid_value("num_messages", "negative count"))?,
            active_maps: parameters.get_optional("active_maps")?.unwrap_or_default(),
        })
    }
}

fn position_param(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn read_position(parameters: &Parameters) -> Result<u64, MessageError> {
    let position: Option<i64> = parameters.get_optional("position")?;
    u64::try_from(position.unwrap_or_default())
        .map_err(|_| MessageError::invalid_value("position", "negative stream position"))
}

fn read_uuid(parameters: &Parameters, name: &str) -> Result<Uuid, MessageError> {
    let text: String = parameters.get_as(name)?;
    Uuid::parse_str(&text).map_err(|e| MessageError::invalid_value(name, e.to_string()))
}

fn read_optional_uuid(parameters: &Parameters, name: &str) -> Result<Option<Uuid>, MessageError> {
    match parameters.get_optional::<String>(name)? {
        Some(text) => Uuid::parse_str(&text)
            .map(Some)
            .map_err(|e| MessageError::invalid_value(name, e.to_string())),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        use LogState::*;
        assert!(Idle.can_transition_to(Record));
        assert!(Idle.can_transition_to(Playback));
        assert!(Record.can_transition_to(Idle));
        assert!(Playback.can_transition_to(Idle));
        assert!(!Record.can_transition_to(Playback));
        assert!(!Playback.can_transition_to(Record));
        assert!(!Idle.can_transition_to(Idle));
    }

    #[test]
    fn test_keyframe_parameters_keep_optional_tag() {
        let mut keyframe = LogKeyframe::new("start").with_description("first");
        keyframe.sim_time = 10.0;
        keyframe.position = 4096;
        keyframe.active_maps = vec!["harbor".into()];
        let restored = LogKeyframe::from_parameters(&keyframe.to_parameters()).unwrap();
        assert_eq!(restored, keyframe);
        assert!(restored.tag_id.is_none());

        keyframe.tag_id = Some(Uuid::new_v4());
        let restored = LogKeyframe::from_parameters(&keyframe.to_parameters()).unwrap();
        assert_eq!(restored.tag_id, keyframe.tag_id);
    }

    #[test]
    fn test_bad_uuid_is_invalid_value() {
        let params = LogTag::new("x").to_parameters().with("id", "not-a-uuid");
        let err = LogTag::from_parameters(&params).unwrap_err();
        assert!(matches!(err, MessageError::InvalidValue { .. }));
    }

    #[test]
    fn test_status_rejects_unknown_state() {
        let params = LogStatus::default().to_parameters().with("state", "Paused");
        assert!(LogStatus::from_parameters(&params).is_err());
    }
}
