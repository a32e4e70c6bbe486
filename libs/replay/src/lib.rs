//! # Simulation Replay
//!
//! Record a running simulation into a log and play it back, with keyframes
//! that restore every actor's state at a point of the recording.
//!
//! ## Components
//!
//! - [`LogStream`]: contract of a log backend, implemented by
//!   [`MemoryLogStream`] and the file-backed [`BinaryLogStream`]
//! - [`ReplayRecorder`]: system component driving the record and playback
//!   state machine through `LogRequest*` messages
//! - [`LogKeyframe`], [`LogTag`], [`LogStatus`]: index records and status
//!   reports, carried on the message bus by the payloads in [`messages`]
//!
//! ## Quick Start
//!
//! ```rust
//! use sim_actors::{ActorSystem, ComponentPriority, InMemorySceneGraph, SimContext};
//! use sim_replay::{LogState, MemoryLogStream, ReplayRecorder};
//! use sim_types::{MachineInfo, MessageType};
//!
//! let mut system = ActorSystem::new(
//!     SimContext::new(MachineInfo::new("local")),
//!     Box::new(InMemorySceneGraph::new()),
//! );
//! let recorder = ReplayRecorder::new(Box::new(MemoryLogStream::new()));
//! system.add_component(Box::new(recorder), ComponentPriority::HIGHER).unwrap();
//!
//! let start = system.world().create_message(MessageType::LogRequestChangeStateRecord);
//! system.send_message(start);
//! system.step(0.1);
//!
//! let recorder = system.component::<ReplayRecorder>(ReplayRecorder::NAME).unwrap();
//! assert_eq!(recorder.state(), LogState::Record);
//! ```

pub mod binary_stream;
pub mod error;
pub mod messages;
pub mod recorder;
pub mod records;
pub mod stream;

pub use binary_stream::BinaryLogStream;
pub use error::{LogStreamError, ReplayError, Result};
pub use messages::{
    AutoKeyframeIntervalRequest, InsertTagRequest, KeyframeList, KeyframeRequest, LogFileRequest,
    LogList, LogStatusPayload, TagList,
};
pub use recorder::{
    ReplayRecorder, AUTO_KEYFRAME_TIMER_NAME, DEFAULT_LOG_NAME, FIRST_KEYFRAME_NAME,
};
pub use records::{LogKeyframe, LogState, LogStatus, LogTag};
pub use stream::{LogRecord, LogStream, MemoryLogStream};
