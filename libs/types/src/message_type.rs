//! # Message Types
//!
//! Stable identifiers for every message the runtime produces or consumes.
//! Applications extend the set through [`MessageType::Custom`].
//!
//! Every type belongs to a [`MessageCategory`]; the replay recorder uses the
//! category to decide what is recordable (ticks and logger control traffic are
//! never written to a log).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse grouping of message types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageCategory {
    /// Per-step clock notifications
    Tick,
    /// Notifications about something that already happened
    Info,
    /// Requests that a component act
    Request,
    /// Replay recorder control and replies
    Log,
    /// Application defined
    Custom,
}

/// Identifier of a message kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MessageType {
    // Ticks
    TickLocal,
    TickRemote,
    TickEndOfFrame,

    // Infos
    TimerElapsed,
    ActorCreated,
    ActorUpdated,
    ActorDeleted,
    ActorPublished,
    EnvironmentChanged,
    MapChanged,
    StateChanged,
    RequestRejected,

    // Requests
    RequestStateTransition,

    // Replay recorder requests
    LogRequestChangeStateRecord,
    LogRequestChangeStatePlayback,
    LogRequestChangeStateIdle,
    LogRequestCaptureKeyframe,
    LogRequestJumpToKeyframe,
    LogRequestInsertTag,
    LogRequestSetAutoKeyframeInterval,
    LogRequestSetLogFile,
    LogRequestGetStatus,
    LogRequestGetKeyframes,
    LogRequestGetTags,
    LogRequestGetLogs,
    LogRequestDeleteLog,
    LogRequestAddIgnoredActor,
    LogRequestRemoveIgnoredActor,
    LogRequestClearIgnoreList,

    // Replay recorder replies and stream markers
    LogInfoStatus,
    LogInfoKeyframes,
    LogInfoTags,
    LogInfoLogs,
    LogBeginKeyframeTransaction,
    LogEndKeyframeTransaction,

    /// Application defined message type
    Custom(String),
}

impl MessageType {
    pub fn category(&self) -> MessageCategory {
        use MessageType::*;
        match self {
            TickLocal | TickRemote | TickEndOfFrame => MessageCategory::Tick,
            TimerElapsed | ActorCreated | ActorUpdated | ActorDeleted | ActorPublished
            | EnvironmentChanged | MapChanged | StateChanged | RequestRejected => {
                MessageCategory::Info
            }
            RequestStateTransition => MessageCategory::Request,
            LogRequestChangeStateRecord
            | LogRequestChangeStatePlayback
            | LogRequestChangeStateIdle
            | LogRequestCaptureKeyframe
            | LogRequestJumpToKeyframe
            | LogRequestInsertTag
            | LogRequestSetAutoKeyframeInterval
            | LogRequestSetLogFile
            | LogRequestGetStatus
            | LogRequestGetKeyframes
            | LogRequestGetTags
            | LogRequestGetLogs
            | LogRequestDeleteLog
            | LogRequestAddIgnoredActor
            | LogRequestRemoveIgnoredActor
            | LogRequestClearIgnoreList
            | LogInfoStatus
            | LogInfoKeyframes
            | LogInfoTags
            | LogInfoLogs
            | LogBeginKeyframeTransaction
            | LogEndKeyframeTransaction => MessageCategory::Log,
            Custom(_) => MessageCategory::Custom,
        }
    }

    /// Stable name used in logs and rejection reasons
    pub fn name(&self) -> &str {
        use MessageType::*;
        match self {
            TickLocal => "tick_local",
            TickRemote => "tick_remote",
            TickEndOfFrame => "tick_end_of_frame",
            TimerElapsed => "timer_elapsed",
            ActorCreated => "actor_created",
            ActorUpdated => "actor_updated",
            ActorDeleted => "actor_deleted",
            ActorPublished => "actor_published",
            EnvironmentChanged => "environment_changed",
            MapChanged => "map_changed",
            StateChanged => "state_changed",
            RequestRejected => "request_rejected",
            RequestStateTransition => "request_state_transition",
            LogRequestChangeStateRecord => "log_request_change_state_record",
            LogRequestChangeStatePlayback => "log_request_change_state_playback",
            LogRequestChangeStateIdle => "log_request_change_state_idle",
            LogRequestCaptureKeyframe => "log_request_capture_keyframe",
            LogRequestJumpToKeyframe => "log_request_jump_to_keyframe",
            LogRequestInsertTag => "log_request_insert_tag",
            LogRequestSetAutoKeyframeInterval => "log_request_set_auto_keyframe_interval",
            LogRequestSetLogFile => "log_request_set_log_file",
            LogRequestGetStatus => "log_request_get_status",
            LogRequestGetKeyframes => "log_request_get_keyframes",
            LogRequestGetTags => "log_request_get_tags",
            LogRequestGetLogs => "log_request_get_logs",
            LogRequestDeleteLog => "log_request_delete_log",
            LogRequestAddIgnoredActor => "log_request_add_ignored_actor",
            LogRequestRemoveIgnoredActor => "log_request_remove_ignored_actor",
            LogRequestClearIgnoreList => "log_request_clear_ignore_list",
            LogInfoStatus => "log_info_status",
            LogInfoKeyframes => "log_info_keyframes",
            LogInfoTags => "log_info_tags",
            LogInfoLogs => "log_info_logs",
            LogBeginKeyframeTransaction => "log_begin_keyframe_transaction",
            LogEndKeyframeTransaction => "log_end_keyframe_transaction",
            Custom(name) => name,
        }
    }

    pub fn is_tick(&self) -> bool {
        self.category() == MessageCategory::Tick
    }

    /// Keyframe transaction markers bound a keyframe block in a replay stream
    pub fn is_keyframe_marker(&self) -> bool {
        matches!(
            self,
            MessageType::LogBeginKeyframeTransaction | MessageType::LogEndKeyframeTransaction
        )
    }

    /// Lifecycle notifications that describe actor existence and state
    pub fn is_actor_lifecycle(&self) -> bool {
        matches!(
            self,
            MessageType::ActorCreated | MessageType::ActorUpdated | MessageType::ActorDeleted
        )
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(MessageType::TickLocal.category(), MessageCategory::Tick);
        assert_eq!(MessageType::ActorCreated.category(), MessageCategory::Info);
        assert_eq!(
            MessageType::RequestStateTransition.category(),
            MessageCategory::Request
        );
        assert_eq!(
            MessageType::LogBeginKeyframeTransaction.category(),
            MessageCategory::Log
        );
        assert_eq!(
            MessageType::Custom("game.Score".into()).category(),
            MessageCategory::Custom
        );
    }

    #[test]
    fn test_custom_name_is_passed_through() {
        let custom = MessageType::Custom("game.Score".into());
        assert_eq!(custom.name(), "game.Score");
        assert_eq!(custom.to_string(), "game.Score");
    }

    #[test]
    fn test_predicates() {
        assert!(MessageType::TickEndOfFrame.is_tick());
        assert!(!MessageType::TimerElapsed.is_tick());
        assert!(MessageType::LogEndKeyframeTransaction.is_keyframe_marker());
        assert!(MessageType::ActorDeleted.is_actor_lifecycle());
        assert!(!MessageType::ActorPublished.is_actor_lifecycle());
    }
}
