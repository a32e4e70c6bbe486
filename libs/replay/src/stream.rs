//! # Replay Streams
//!
//! A log is a linear, appendable sequence of timestamped messages with
//! keyframe blocks and tags addressable by position. [`LogStream`] is the
//! contract the recorder drives; [`MemoryLogStream`] keeps logs in process and
//! [`BinaryLogStream`](crate::binary_stream::BinaryLogStream) keeps them on disk.
//!
//! A stream has at most one open log, either being written (after
//! [`LogStream::create`]) or being read (after [`LogStream::open`]).

use crate::error::LogStreamError;
use crate::records::{LogKeyframe, LogTag};
use serde::{Deserialize, Serialize};
use sim_types::Message;
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

/// One recorded message and the simulation time it was recorded at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub sim_time: f64,
    pub message: Message,
}

pub trait LogStream {
    /// Start writing a new log, replacing any log with the same name
    fn create(&mut self, log_name: &str) -> Result<(), LogStreamError>;

    /// Open an existing log for reading from its first record
    fn open(&mut self, log_name: &str) -> Result<(), LogStreamError>;

    /// Close the open log, persisting its index; closing nothing is a no-op
    fn close(&mut self) -> Result<(), LogStreamError>;

    fn delete(&mut self, log_name: &str) -> Result<(), LogStreamError>;

    /// Names of every stored log, sorted
    fn available_logs(&self) -> Result<Vec<String>, LogStreamError>;

    fn write_message(&mut self, message: &Message, sim_time: f64) -> Result<(), LogStreamError>;

    /// Next record of a log open for reading; `None` at the end
    fn read_message(&mut self) -> Result<Option<LogRecord>, LogStreamError>;

    /// Index a keyframe at the current write position
    fn insert_keyframe(&mut self, keyframe: &mut LogKeyframe) -> Result<(), LogStreamError>;

    /// Index a tag at the current write position
    fn insert_tag(&mut self, tag: &mut LogTag) -> Result<(), LogStreamError>;

    fn keyframes(&self) -> Result<Vec<LogKeyframe>, LogStreamError>;

    fn tags(&self) -> Result<Vec<LogTag>, LogStreamError>;

    /// Move the read position to a keyframe's block, returning its stored metadata
    fn jump_to_keyframe(&mut self, keyframe_id: Uuid) -> Result<LogKeyframe, LogStreamError>;

    fn set_record_duration(&mut self, seconds: f64);

    fn record_duration(&self) -> f64;

    fn is_end_of_stream(&self) -> bool;

    /// Name of the open log
    fn current_log(&self) -> Option<&str>;
}

#[derive(Debug, Clone, Default)]
struct MemoryLog {
    records: Vec<LogRecord>,
    keyframes: Vec<LogKeyframe>,
    tags: Vec<LogTag>,
    record_duration: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Write,
    Read,
}

#[derive(Debug)]
struct OpenLog {
    name: String,
    mode: Mode,
    cursor: usize,
}

/// In-process log store; logs outlive `close` for the lifetime of the stream
#[derive(Debug, Default)]
pub struct MemoryLogStream {
    logs: BTreeMap<String, MemoryLog>,
    open: Option<OpenLog>,
}

impl MemoryLogStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded messages of a stored log
    pub fn records(&self, log_name: &str) -> Option<&[LogRecord]> {
        self.logs.get(log_name).map(|log| log.records.as_slice())
    }

    fn open_log(&self) -> Result<(&OpenLog, &MemoryLog), LogStreamError> {
        let open = self.open.as_ref().ok_or(LogStreamError::NotOpen)?;
        let log = self
            .logs
            .get(&open.name)
            .ok_or_else(|| LogStreamError::UnknownLog {
                name: open.name.clone(),
            })?;
        Ok((open, log))
    }

    fn writable_log(&mut self) -> Result<&mut MemoryLog, LogStreamError> {
        let open = self.open.as_ref().ok_or(LogStreamError::NotOpen)?;
        if open.mode != Mode::Write {
            return Err(LogStreamError::ReadOnly {
                name: open.name.clone(),
            });
        }
        self.logs
            .get_mut(&open.name)
            .ok_or_else(|| LogStreamError::UnknownLog {
                name: open.name.clone(),
            })
    }
}

impl LogStream for MemoryLogStream {
    fn create(&mut self, log_name: &str) -> Result<(), LogStreamError> {
        self.close()?;
        self.logs.insert(log_name.to_string(), MemoryLog::default());
        self.open = Some(OpenLog {
            name: log_name.to_string(),
            mode: Mode::Write,
            cursor: 0,
        });
        debug!("Created in-memory log '{}'", log_name);
        Ok(())
    }

    fn open(&mut self, log_name: &str) -> Result<(), LogStreamError> {
        self.close()?;
        if !self.logs.contains_key(log_name) {
            return Err(LogStreamError::UnknownLog {
                name: log_name.to_string(),
            });
        }
        self.open = Some(OpenLog {
            name: log_name.to_string(),
            mode: Mode::Read,
            cursor: 0,
        });
        Ok(())
    }

    fn close(&mut self) -> Result<(), LogStreamError> {
        self.open = None;
        Ok(())
    }

    fn delete(&mut self, log_name: &str) -> Result<(), LogStreamError> {
        if self.open.as_ref().is_some_and(|open| open.name == log_name) {
            self.open = None;
        }
        self.logs
            .remove(log_name)
            .map(|_| ())
            .ok_or_else(|| LogStreamError::UnknownLog {
                name: log_name.to_string(),
            })
    }

    fn available_logs(&self) -> Result<Vec<String>, LogStreamError> {
        Ok(self.logs.keys().cloned().collect())
    }

    fn write_message(&mut self, message: &Message, sim_time: f64) -> Result<(), LogStreamError> {
        self.writable_log()?.records.push(LogRecord {
            sim_time,
            message: message.clone(),
        });
        Ok(())
    }

    fn read_message(&mut self) -> Result<Option<LogRecord>, LogStreamError> {
        let open = self.open.as_mut().ok_or(LogStreamError::NotOpen)?;
        let Some(log) = self.logs.get(&open.name) else {
            return Err(LogStreamError::UnknownLog {
                name: open.name.clone(),
            });
        };
        let record = log.records.get(open.cursor).cloned();
        if record.is_some() {
            open.cursor += 1;
        }
        Ok(record)
    }

    fn insert_keyframe(&mut self, keyframe: &mut LogKeyframe) -> Result<(), LogStreamError> {
        let log = self.writable_log()?;
        keyframe.position = log.records.len() as u64;
        log.keyframes.push(keyframe.clone());
        Ok(())
    }

    fn insert_tag(&mut self, tag: &mut LogTag) -> Result<(), LogStreamError> {
        let log = self.writable_log()?;
        tag.position = log.records.len() as u64;
        log.tags.push(tag.clone());
        Ok(())
    }

    fn keyframes(&self) -> Result<Vec<LogKeyframe>, LogStreamError> {
        Ok(self.open_log()?.1.keyframes.clone())
    }

    fn tags(&self) -> Result<Vec<LogTag>, LogStreamError> {
        Ok(self.open_log()?.1.tags.clone())
    }

    fn jump_to_keyframe(&mut self, keyframe_id: Uuid) -> Result<LogKeyframe, LogStreamError> {
        let (_, log) = self.open_log()?;
        let keyframe = log
            .keyframes
            .iter()
            .find(|k| k.id == keyframe_id)
            .cloned()
            .ok_or(LogStreamError::UnknownKeyframe { id: keyframe_id })?;
        if let Some(open) = self.open.as_mut() {
            open.cursor = keyframe.position as usize;
        }
        Ok(keyframe)
    }

    fn set_record_duration(&mut self, seconds: f64) {
        if let Ok(log) = self.writable_log() {
            log.record_duration = seconds;
        }
    }

    fn record_duration(&self) -> f64 {
        self.open_log()
            .map(|(_, log)| log.record_duration)
            .unwrap_or_default()
    }

    fn is_end_of_stream(&self) -> bool {
        match self.open_log() {
            Ok((open, log)) => open.mode == Mode::Read && open.cursor >= log.records.len(),
            Err(_) => true,
        }
    }

    fn current_log(&self) -> Option<&str> {
        self.open.as_ref().map(|open| open.name.as_str())
    }
}
