//! # Binary Log Stream
//!
//! File-backed [`LogStream`]. Each log is two files in the stream's
//! directory:
//!
//! - `<log>.simlog`: an 8 byte magic and a little-endian `u16` format version,
//!   then one frame per record: a little-endian `u32` length followed by the
//!   `bincode` encoded [`LogRecord`]
//! - `<log>.simidx`: magic, version, then the `bincode` encoded index of
//!   keyframes, tags and the record duration
//!
//! Keyframe and tag positions are byte offsets into `<log>.simlog`. The index is
//! rewritten whenever a keyframe or tag is inserted and when the log is closed.

use crate::error::LogStreamError;
use crate::records::{LogKeyframe, LogTag};
use crate::stream::{LogRecord, LogStream};
use serde::{Deserialize, Serialize};
use sim_types::Message;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const LOG_EXTENSION: &str = "simlog";
pub const INDEX_EXTENSION: &str = "simidx";

const LOG_MAGIC: &[u8; 8] = b"SIMLOGDB";
const INDEX_MAGIC: &[u8; 8] = b"SIMLOGIX";
const FORMAT_VERSION: u16 = 1;
const HEADER_LEN: u64 = 10;
const MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;

#[derive(Debug, Default, Serialize, Deserialize)]
struct LogIndex {
    record_duration: f64,
    keyframes: Vec<LogKeyframe>,
    tags: Vec<LogTag>,
}

enum Access {
    Write { writer: BufWriter<File>, position: u64 },
    Read { reader: BufReader<File>, at_end: bool },
}

struct OpenFile {
    name: String,
    index: LogIndex,
    access: Access,
}

pub struct BinaryLogStream {
    directory: PathBuf,
    open: Option<OpenFile>,
}

impl std::fmt::Debug for BinaryLogStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinaryLogStream")
            .field("directory", &self.directory)
            .field("open", &self.current_log())
            .finish()
    }
}

impl BinaryLogStream {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            open: None,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn log_path(&self, log_name: &str) -> PathBuf {
        self.directory
            .join(format!("{}.{}", log_name, LOG_EXTENSION))
    }

    pub fn index_path(&self, log_name: &str) -> PathBuf {
        self.directory
            .join(format!("{}.{}", log_name, INDEX_EXTENSION))
    }

    fn write_index(&self, open: &OpenFile) -> Result<(), LogStreamError> {
        let path = self.index_path(&open.name);
        let file = File::create(&path).map_err(|e| LogStreamError::io(&path, e))?;
        let mut writer = BufWriter::new(file);
        write_header(&mut writer, INDEX_MAGIC).map_err(|e| LogStreamError::io(&path, e))?;
        bincode::serialize_into(&mut writer, &open.index)?;
        writer.flush().map_err(|e| LogStreamError::io(&path, e))
    }

    fn read_index(&self, log_name: &str) -> Result<LogIndex, LogStreamError> {
        let path = self.index_path(log_name);
        let file = File::open(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => LogStreamError::malformed(log_name, "missing index file"),
            _ => LogStreamError::io(&path, e),
        })?;
        let mut reader = BufReader::new(file);
        read_header(&mut reader, INDEX_MAGIC, log_name, &path)?;
        Ok(bincode::deserialize_from(&mut reader)?)
    }

    fn writable(&mut self) -> Result<(&mut OpenFile, &Path), LogStreamError> {
        let open = self.open.as_mut().ok_or(LogStreamError::NotOpen)?;
        if !matches!(open.access, Access::Write { .. }) {
            return Err(LogStreamError::ReadOnly {
                name: open.name.clone(),
            });
        }
        Ok((open, &self.directory))
    }

    fn flush_index(&mut self) -> Result<(), LogStreamError> {
        match &self.open {
            Some(open) if matches!(open.access, Access::Write { .. }) => self.write_index(open),
            _ => Ok(()),
        }
    }

    fn write_position(open: &OpenFile) -> u64 {
        match &open.access {
            Access::Write { position, .. } => *position,
            Access::Read { .. } => 0,
        }
    }
}

fn write_header(writer: &mut impl Write, magic: &[u8; 8]) -> io::Result<()> {
    writer.write_all(magic)?;
    writer.write_all(&FORMAT_VERSION.to_le_bytes())
}

fn read_header(
    reader: &mut impl Read,
    magic: &[u8; 8],
    log_name: &str,
    path: &Path,
) -> Result<(), LogStreamError> {
    let mut found = [0u8; 8];
    let mut version = [0u8; 2];
    reader
        .read_exact(&mut found)
        .and_then(|_| reader.read_exact(&mut version))
        .map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => LogStreamError::malformed(log_name, "truncated header"),
            _ => LogStreamError::io(path, e),
        })?;
    if &found != magic {
        return Err(LogStreamError::malformed(log_name, "bad magic number"));
    }
    let version = u16::from_le_bytes(version);
    if version != FORMAT_VERSION {
        return Err(LogStreamError::malformed(
            log_name,
            format!("unsupported format version {}", version),
        ));
    }
    Ok(())
}

impl LogStream for BinaryLogStream {
    fn create(&mut self, log_name: &str) -> Result<(), LogStreamError> {
        self.close()?;
        fs::create_dir_all(&self.directory).map_err(|e| LogStreamError::io(&self.directory, e))?;

        let path = self.log_path(log_name);
        let file = File::create(&path).map_err(|e| LogStreamError::io(&path, e))?;
        let mut writer = BufWriter::new(file);
        write_header(&mut writer, LOG_MAGIC).map_err(|e| LogStreamError::io(&path, e))?;

        let open = OpenFile {
            name: log_name.to_string(),
            index: LogIndex::default(),
            access: Access::Write {
                writer,
                position: HEADER_LEN,
            },
        };
        self.write_index(&open)?;
        self.open = Some(open);
        info!("Created log {}", path.display());
        Ok(())
    }

    fn open(&mut self, log_name: &str) -> Result<(), LogStreamError> {
        self.close()?;
        let path = self.log_path(log_name);
        let file = File::open(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => LogStreamError::UnknownLog {
                name: log_name.to_string(),
            },
            _ => LogStreamError::io(&path, e),
        })?;
        let mut reader = BufReader::new(file);
        read_header(&mut reader, LOG_MAGIC, log_name, &path)?;
        let index = self.read_index(log_name)?;

        debug!(
            "Opened log {} ({} keyframes, {} tags)",
            path.display(),
            index.keyframes.len(),
            index.tags.len()
        );
        self.open = Some(OpenFile {
            name: log_name.to_string(),
            index,
            access: Access::Read {
                reader,
                at_end: false,
            },
        });
        Ok(())
    }

    fn close(&mut self) -> Result<(), LogStreamError> {
        let Some(mut open) = self.open.take() else {
            return Ok(());
        };
        if let Access::Write { writer, .. } = &mut open.access {
            let path = self.log_path(&open.name);
            writer.flush().map_err(|e| LogStreamError::io(&path, e))?;
            self.write_index(&open)?;
            debug!("Closed log '{}'", open.name);
        }
        Ok(())
    }

    fn delete(&mut self, log_name: &str) -> Result<(), LogStreamError> {
        if self.current_log() == Some(log_name) {
            self.close()?;
        }
        let path = self.log_path(log_name);
        fs::remove_file(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => LogStreamError::UnknownLog {
                name: log_name.to_string(),
            },
            _ => LogStreamError::io(&path, e),
        })?;
        let index = self.index_path(log_name);
        if let Err(e) = fs::remove_file(&index) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("Failed to remove index {}: {}", index.display(), e);
            }
        }
        info!("Deleted log {}", path.display());
        Ok(())
    }

    fn available_logs(&self) -> Result<Vec<String>, LogStreamError> {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(LogStreamError::io(&self.directory, e)),
        };
        let mut logs = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| LogStreamError::io(&self.directory, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(LOG_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                logs.push(stem.to_string());
            }
        }
        logs.sort();
        Ok(logs)
    }

    fn write_message(&mut self, message: &Message, sim_time: f64) -> Result<(), LogStreamError> {
        let (open, directory) = self.writable()?;
        let record = LogRecord {
            sim_time,
            message: message.clone(),
        };
        let frame = bincode::serialize(&record)?;
        let len = u32::try_from(frame.len())
            .ok()
            .filter(|len| *len <= MAX_FRAME_LEN)
            .ok_or_else(|| LogStreamError::malformed(&open.name, "record exceeds frame limit"))?;

        if let Access::Write { writer, position } = &mut open.access {
            let path = directory.join(format!("{}.{}", open.name, LOG_EXTENSION));
            writer
                .write_all(&len.to_le_bytes())
                .and_then(|_| writer.write_all(&frame))
                .map_err(|e| LogStreamError::io(&path, e))?;
            *position += 4 + u64::from(len);
        }
        Ok(())
    }

    fn read_message(&mut self) -> Result<Option<LogRecord>, LogStreamError> {
        let open = self.open.as_mut().ok_or(LogStreamError::NotOpen)?;
        let Access::Read { reader, at_end } = &mut open.access else {
            return Err(LogStreamError::malformed(&open.name, "log is open for writing"));
        };
        if *at_end {
            return Ok(None);
        }

        let mut len = [0u8; 4];
        match reader.read_exact(&mut len) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                *at_end = true;
                return Ok(None);
            }
            Err(e) => return Err(LogStreamError::io(&open.name, e)),
        }
        let len = u32::from_le_bytes(len);
        if len > MAX_FRAME_LEN {
            return Err(LogStreamError::malformed(
                &open.name,
                format!("frame of {} bytes exceeds limit", len),
            ));
        }

        let mut frame = vec![0u8; len as usize];
        reader.read_exact(&mut frame).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => LogStreamError::malformed(&open.name, "truncated frame"),
            _ => LogStreamError::io(&open.name, e),
        })?;
        Ok(Some(bincode::deserialize(&frame)?))
    }

    fn insert_keyframe(&mut self, keyframe: &mut LogKeyframe) -> Result<(), LogStreamError> {
        let (open, _) = self.writable()?;
        keyframe.position = Self::write_position(open);
        open.index.keyframes.push(keyframe.clone());
        self.flush_index()
    }

    fn insert_tag(&mut self, tag: &mut LogTag) -> Result<(), LogStreamError> {
        let (open, _) = self.writable()?;
        tag.position = Self::write_position(open);
        open.index.tags.push(tag.clone());
        self.flush_index()
    }

    fn keyframes(&self) -> Result<Vec<LogKeyframe>, LogStreamError> {
        let open = self.open.as_ref().ok_or(LogStreamError::NotOpen)?;
        Ok(open.index.keyframes.clone())
    }

    fn tags(&self) -> Result<Vec<LogTag>, LogStreamError> {
        let open = self.open.as_ref().ok_or(LogStreamError::NotOpen)?;
        Ok(open.index.tags.clone())
    }

    fn jump_to_keyframe(&mut self, keyframe_id: Uuid) -> Result<LogKeyframe, LogStreamError> {
        let open = self.open.as_mut().ok_or(LogStreamError::NotOpen)?;
        let keyframe = open
            .index
            .keyframes
            .iter()
            .find(|k| k.id == keyframe_id)
            .cloned()
            .ok_or(LogStreamError::UnknownKeyframe { id: keyframe_id })?;
        let Access::Read { reader, at_end } = &mut open.access else {
            return Err(LogStreamError::malformed(&open.name, "log is open for writing"));
        };
        reader
            .seek(SeekFrom::Start(keyframe.position))
            .map_err(|e| LogStreamError::io(&open.name, e))?;
        *at_end = false;
        Ok(keyframe)
    }

    fn set_record_duration(&mut self, seconds: f64) {
        if let Ok((open, _)) = self.writable() {
            open.index.record_duration = seconds;
        }
    }

    fn record_duration(&self) -> f64 {
        self.open
            .as_ref()
            .map(|open| open.index.record_duration)
            .unwrap_or_default()
    }

    fn is_end_of_stream(&self) -> bool {
        match &self.open {
            Some(OpenFile {
                access: Access::Read { at_end, .. },
                ..
            }) => *at_end,
            Some(_) => false,
            None => true,
        }
    }

    fn current_log(&self) -> Option<&str> {
        self.open.as_ref().map(|open| open.name.as_str())
    }
}

impl Drop for BinaryLogStream {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close log on drop: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_types::{MachineInfo, MessageType};
    use tempfile::TempDir;

    fn message(name: &str) -> Message {
        Message::new(MessageType::Custom(name.into()), MachineInfo::new("test"))
            .with_parameter("payload", name)
    }

    #[test]
    fn test_records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let mut stream = BinaryLogStream::new(dir.path());
        stream.create("session").unwrap();
        stream.write_message(&message("first"), 0.5).unwrap();
        let mut keyframe = LogKeyframe::new("checkpoint");
        stream.insert_keyframe(&mut keyframe).unwrap();
        stream.write_message(&message("second"), 1.5).unwrap();
        stream.set_record_duration(2.0);
        stream.close().unwrap();

        assert!(dir.path().join("session.simlog").exists());
        assert!(dir.path().join("session.simidx").exists());

        let mut stream = BinaryLogStream::new(dir.path());
        stream.open("session").unwrap();
        assert_eq!(stream.record_duration(), 2.0);
        assert_eq!(stream.keyframes().unwrap(), vec![keyframe.clone()]);

        let first = stream.read_message().unwrap().unwrap();
        assert_eq!(first.sim_time, 0.5);
        assert_eq!(first.message, message("first"));

        stream.jump_to_keyframe(keyframe.id).unwrap();
        let second = stream.read_message().unwrap().unwrap();
        assert_eq!(second.message, message("second"));
        assert!(stream.read_message().unwrap().is_none());
        assert!(stream.is_end_of_stream());
    }

    #[test]
    fn test_bad_magic_is_malformed() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("junk.simlog"), b"NOTALOG!\x01\x00").unwrap();
        let mut stream = BinaryLogStream::new(dir.path());
        let err = stream.open("junk").unwrap_err();
        assert!(matches!(err, LogStreamError::Malformed { .. }));
    }

    #[test]
    fn test_missing_log_is_not_found() {
        let dir = TempDir::new().unwrap();
        let mut stream = BinaryLogStream::new(dir.path());
        assert!(stream.open("nothing").unwrap_err().is_not_found());
        assert!(stream.delete("nothing").unwrap_err().is_not_found());
    }

    #[test]
    fn test_available_logs_and_delete() {
        let dir = TempDir::new().unwrap();
        let mut stream = BinaryLogStream::new(dir.path().join("logs"));
        assert!(stream.available_logs().unwrap().is_empty());

        stream.create("beta").unwrap();
        stream.create("alpha").unwrap();
        stream.close().unwrap();
        assert_eq!(stream.available_logs().unwrap(), vec!["alpha", "beta"]);

        stream.delete("beta").unwrap();
        assert_eq!(stream.available_logs().unwrap(), vec!["alpha"]);
        assert!(!dir.path().join("logs/beta.simidx").exists());
    }

    #[test]
    fn test_writing_a_read_log_fails() {
        let dir = TempDir::new().unwrap();
        let mut stream = BinaryLogStream::new(dir.path());
        stream.create("session").unwrap();
        stream.close().unwrap();
        stream.open("session").unwrap();
        assert!(matches!(
            stream.write_message(&message("late"), 0.0).unwrap_err(),
            LogStreamError::ReadOnly { .. }
        ));
    }
}
