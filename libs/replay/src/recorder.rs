//! # Replay Recorder
//!
//! System component that records the message stream of a simulation into a
//! [`LogStream`] and plays recordings back.
//!
//! ## States
//!
//! ```text
//!            record request             idle request
//!   Idle ─────────────────────▶ Record ─────────────▶ Idle
//!   Idle ─────────────────────▶ Playback ───────────▶ Idle
//!           playback request            idle request
//! ```
//!
//! Any other transition is rejected with a `RequestRejected` reply and leaves
//! the state unchanged.
//!
//! ## Recording
//!
//! While recording, every dispatched message is appended to the log except
//! ticks, timer notifications, recorder traffic, ignored message types and
//! messages about ignored actors. A keyframe is a block of one `ActorUpdated`
//! record per actor bracketed by transaction markers; one is captured when
//! recording starts and then every auto keyframe interval.
//!
//! ## Playback
//!
//! On `TickLocal` the recorder replays every record earlier than the current
//! simulation time. Actor lifecycle records are applied to the world directly
//! and the actors they create are tracked so that leaving playback removes
//! them. Everything else is re-sent under the playback identity.

use crate::error::{ReplayError, Result};
use crate::messages::{
    AutoKeyframeIntervalRequest, InsertTagRequest, KeyframeList, KeyframeRequest, LogFileRequest,
    LogList, LogStatusPayload, TagList,
};
use crate::records::{LogKeyframe, LogState, LogStatus, LogTag};
use crate::stream::{LogRecord, LogStream};
use sim_actors::{SystemComponent, World};
use sim_types::{
    ActorId, ActorUpdatePayload, KeyframeTransactionPayload, MachineInfo, MapChangedPayload,
    Message, MessageCategory, MessageType, RequestRejectedPayload, TickPayload,
    TimerElapsedPayload,
};
use std::collections::HashSet;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub const DEFAULT_LOG_NAME: &str = "default_log";
pub const AUTO_KEYFRAME_TIMER_NAME: &str = "replay_auto_keyframe";
pub const FIRST_KEYFRAME_NAME: &str = "Default First Keyframe";

pub struct ReplayRecorder {
    status: LogStatus,
    stream: Box<dyn LogStream>,
    playback_identity: MachineInfo,
    ignored_actors: HashSet<ActorId>,
    ignored_types: HashSet<MessageType>,
    /// Actors created by playback, removed when playback stops
    playback_actors: Vec<ActorId>,
    /// Record read ahead of the simulation clock
    next_record: Option<LogRecord>,
    in_keyframe_block: bool,
    end_of_stream_reported: bool,
}

impl std::fmt::Debug for ReplayRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayRecorder")
            .field("status", &self.status)
            .field("log", &self.stream.current_log())
            .field("ignored_actors", &self.ignored_actors.len())
            .field("playback_actors", &self.playback_actors.len())
            .finish()
    }
}

impl ReplayRecorder {
    pub const NAME: &'static str = "replay_recorder";

    pub fn new(stream: Box<dyn LogStream>) -> Self {
        Self {
            status: LogStatus {
                log_file: DEFAULT_LOG_NAME.to_string(),
                ..LogStatus::default()
            },
            stream,
            playback_identity: MachineInfo::new("playback"),
            ignored_actors: HashSet::new(),
            ignored_types: HashSet::new(),
            playback_actors: Vec::new(),
            next_record: None,
            in_keyframe_block: false,
            end_of_stream_reported: false,
        }
    }

    pub fn with_auto_keyframe_interval(mut self, seconds: f64) -> Self {
        self.status.auto_keyframe_interval = seconds.max(0.0);
        self
    }

    pub fn with_log_file(mut self, log_file: impl Into<String>) -> Self {
        self.status.log_file = log_file.into();
        self
    }

    pub fn with_playback_identity(mut self, identity: MachineInfo) -> Self {
        self.playback_identity = identity;
        self
    }

    pub fn status(&self) -> &LogStatus {
        &self.status
    }

    pub fn state(&self) -> LogState {
        self.status.state
    }

    pub fn stream(&self) -> &dyn LogStream {
        self.stream.as_ref()
    }

    pub fn playback_identity(&self) -> &MachineInfo {
        &self.playback_identity
    }

    pub fn is_playback_actor(&self, actor: ActorId) -> bool {
        self.playback_actors.contains(&actor)
    }

    pub fn playback_actors(&self) -> &[ActorId] {
        &self.playback_actors
    }

    pub fn is_ignored_actor(&self, actor: ActorId) -> bool {
        self.ignored_actors.contains(&actor)
    }

    /// Stop recording messages of this type
    pub fn ignore_message_type(&mut self, message_type: MessageType) -> bool {
        self.ignored_types.insert(message_type)
    }

    pub fn unignore_message_type(&mut self, message_type: &MessageType) -> bool {
        self.ignored_types.remove(message_type)
    }

    // Recording

    fn should_record(&self, message: &Message) -> bool {
        let message_type = message.message_type();
        if message_type.is_tick()
            || message_type.category() == MessageCategory::Log
            || *message_type == MessageType::TimerElapsed
            || self.ignored_types.contains(message_type)
        {
            return false;
        }
        message
            .about_actor()
            .map_or(true, |actor| !self.ignored_actors.contains(&actor))
    }

    fn record(&mut self, message: &Message, world: &World) {
        match self.stream.write_message(message, world.simulation_time()) {
            Ok(()) => self.status.num_messages += 1,
            Err(e) => error!("Failed to record {}: {}", message.message_type(), e),
        }
    }

    fn start_recording(&mut self, world: &mut World) -> Result<()> {
        if !self.status.state.can_transition_to(LogState::Record) {
            return Err(ReplayError::wrong_state("start recording", self.status.state));
        }
        if let Err(e) = self.begin_recording(world) {
            self.status.state = LogState::Idle;
            if let Err(close) = self.stream.close() {
                warn!("Failed to close log after failed record start: {}", close);
            }
            self.send_status(world);
            return Err(e);
        }
        info!(
            "Recording to log '{}' from {:.3}s",
            self.status.log_file, self.status.current_sim_time
        );
        self.send_status(world);
        Ok(())
    }

    fn begin_recording(&mut self, world: &mut World) -> Result<()> {
        if self.status.log_file.is_empty() {
            self.status.log_file = DEFAULT_LOG_NAME.to_string();
        }
        self.stream.create(&self.status.log_file)?;
        self.status.num_messages = 0;
        self.status.record_duration = 0.0;
        self.status.current_sim_time = world.simulation_time();
        self.status.active_maps = world.active_maps().to_vec();
        self.status.state = LogState::Record;

        self.capture_keyframe(LogKeyframe::new(FIRST_KEYFRAME_NAME), world)?;
        self.arm_auto_keyframe_timer(world);
        Ok(())
    }

    fn arm_auto_keyframe_timer(&mut self, world: &mut World) {
        world.clear_timer(AUTO_KEYFRAME_TIMER_NAME, None);
        let interval = self.status.auto_keyframe_interval;
        if self.status.state == LogState::Record && interval > 0.0 {
            world.set_timer(AUTO_KEYFRAME_TIMER_NAME, None, interval, true, false);
            debug!("Auto keyframe every {:.3}s", interval);
        }
    }

    /// Write a keyframe block for every registered actor
    fn capture_keyframe(&mut self, mut keyframe: LogKeyframe, world: &World) -> Result<LogKeyframe> {
        if self.status.state != LogState::Record {
            return Err(ReplayError::wrong_state("capture a keyframe", self.status.state));
        }
        let now = world.simulation_time();
        keyframe.sim_time = now;
        keyframe.active_maps = world.active_maps().to_vec();
        self.stream.insert_keyframe(&mut keyframe)?;

        let factory = world.message_factory();
        let marker = KeyframeTransactionPayload {
            keyframe_name: keyframe.name.clone(),
            success: true,
        };
        let begin = factory.create_with(MessageType::LogBeginKeyframeTransaction, &marker)?;
        self.stream.write_message(&begin, now)?;

        let mut captured = 0;
        for actor in world.actors().filter(|a| a.is_in_registry()) {
            if self.ignored_actors.contains(&actor.id()) {
                continue;
            }
            let record = factory
                .create_with(MessageType::ActorUpdated, &actor.populate_update())?
                .with_about_actor(actor.id())
                .with_sending_actor(actor.id());
            self.stream.write_message(&record, now)?;
            captured += 1;
        }

        let end = factory.create_with(MessageType::LogEndKeyframeTransaction, &marker)?;
        self.stream.write_message(&end, now)?;
        info!(
            "Captured keyframe '{}' at {:.3}s ({} actors)",
            keyframe.name, now, captured
        );
        Ok(keyframe)
    }

    fn insert_tag(&mut self, mut tag: LogTag, world: &World) -> Result<LogTag> {
        if self.status.state != LogState::Record {
            return Err(ReplayError::wrong_state("insert a tag", self.status.state));
        }
        tag.sim_time = world.simulation_time();

        let keyframe = tag.capture_keyframe.then(|| {
            let mut keyframe =
                LogKeyframe::new(tag.name.clone()).with_description(tag.description.clone());
            keyframe.tag_id = Some(tag.id);
            keyframe
        });
        tag.keyframe_id = keyframe.as_ref().map(|k| k.id);

        self.stream.insert_tag(&mut tag)?;
        if let Some(keyframe) = keyframe {
            self.capture_keyframe(keyframe, world)?;
        }
        debug!("Inserted tag '{}' at {:.3}s", tag.name, tag.sim_time);
        Ok(tag)
    }

    // Playback

    fn start_playback(&mut self, world: &mut World) -> Result<()> {
        if !self.status.state.can_transition_to(LogState::Playback) {
            return Err(ReplayError::wrong_state("start playback", self.status.state));
        }
        if let Err(e) = self.begin_playback(world) {
            self.status.state = LogState::Idle;
            if let Err(close) = self.stream.close() {
                warn!("Failed to close log after failed playback start: {}", close);
            }
            self.send_status(world);
            return Err(e);
        }
        info!("Playing back log '{}'", self.status.log_file);
        self.send_status(world);
        Ok(())
    }

    fn begin_playback(&mut self, world: &mut World) -> Result<()> {
        if self.status.log_file.is_empty() {
            self.status.log_file = DEFAULT_LOG_NAME.to_string();
        }
        self.stream.open(&self.status.log_file)?;
        let first = self
            .stream
            .keyframes()?
            .into_iter()
            .min_by_key(|k| k.position)
            .ok_or_else(|| ReplayError::NoInitialKeyframe {
                log: self.status.log_file.clone(),
            })?;

        self.status.state = LogState::Playback;
        self.status.num_messages = 0;
        self.status.record_duration = self.stream.record_duration();
        self.playback_actors.clear();
        self.jump_to_keyframe(first.id, world)?;
        Ok(())
    }

    /// Restore the world to a keyframe of the open log
    ///
    /// Deletions are computed from the actors registered before the jump so
    /// actors created by the jump itself are never removed. The keyframe block
    /// is read before the transaction is announced; once announced, every
    /// exit sends a matching end marker.
    fn jump_to_keyframe(&mut self, keyframe_id: Uuid, world: &mut World) -> Result<LogKeyframe> {
        if self.status.state != LogState::Playback {
            return Err(ReplayError::wrong_state("jump to a keyframe", self.status.state));
        }
        let keyframe = self.stream.jump_to_keyframe(keyframe_id)?;
        let records = self.read_keyframe_block(&keyframe)?;
        let marker = KeyframeTransactionPayload {
            keyframe_name: keyframe.name.clone(),
            success: false,
        };

        // 1. announce
        let begin = world
            .message_factory()
            .create_with(MessageType::LogBeginKeyframeTransaction, &marker)?;
        world.send_message(begin);

        // 2. maps
        if !keyframe.active_maps.is_empty() && keyframe.active_maps != world.active_maps() {
            if let Err(e) = world.change_map(&keyframe.active_maps) {
                error!("Jump to keyframe '{}' aborted: {}", keyframe.name, e);
                if let Err(end) = end_keyframe_transaction(world, &marker, false) {
                    warn!("Failed to close keyframe transaction: {}", end);
                }
                return Err(e.into());
            }
            self.status.active_maps = keyframe.active_maps.clone();
        }

        // 3. create and update actors
        let before_jump = world.actor_ids();
        let mut in_keyframe = HashSet::with_capacity(records.len());
        for (actor, update) in &records {
            in_keyframe.insert(*actor);
            if self.ignored_actors.contains(actor) {
                continue;
            }
            match world.apply_actor_update(*actor, update, true, false) {
                Ok(true) => self.track_playback_actor(*actor),
                Ok(false) => {}
                Err(e) => warn!("Failed to restore actor {} from keyframe: {}", actor, e),
            }
        }
        for (actor, update) in &records {
            let Some(parent) = update.parent else {
                continue;
            };
            let current = world.find_actor(*actor).and_then(|a| a.parent());
            if current != Some(parent) && world.find_actor(parent).is_some() {
                if let Err(e) = world.set_parent_actor(*actor, Some(parent)) {
                    warn!("Failed to restore parent of {}: {}", actor, e);
                }
            }
        }

        // 4. delete local actors the keyframe does not know
        let mut deleted = 0;
        for actor in before_jump {
            if in_keyframe.contains(&actor) || self.ignored_actors.contains(&actor) {
                continue;
            }
            let Some(proxy) = world.find_actor(actor) else {
                continue;
            };
            if proxy.is_remote() {
                continue;
            }
            let kept_children: Vec<ActorId> = proxy
                .children()
                .iter()
                .copied()
                .filter(|child| in_keyframe.contains(child))
                .collect();
            for child in kept_children {
                if let Err(e) = world.set_parent_actor(child, None) {
                    warn!("Failed to detach {} from deleted parent: {}", child, e);
                }
            }
            if world.mark_actor_for_removal(actor) {
                deleted += 1;
            }
            self.playback_actors.retain(|a| *a != actor);
        }

        // 5. clock
        let time_scale = world.clock().time_scale();
        world.change_time_settings(keyframe.sim_time, time_scale);
        world.set_paused(false);
        self.status.current_sim_time = keyframe.sim_time;
        self.next_record = None;
        self.in_keyframe_block = false;
        self.end_of_stream_reported = false;

        // 6. announce completion
        end_keyframe_transaction(world, &marker, true)?;

        info!(
            "Jumped to keyframe '{}' at {:.3}s ({} actors restored, {} deleted)",
            keyframe.name,
            keyframe.sim_time,
            records.len(),
            deleted
        );
        self.send_status(world);
        Ok(keyframe)
    }

    /// Read the actor records of the keyframe block at the read position
    fn read_keyframe_block(
        &mut self,
        keyframe: &LogKeyframe,
    ) -> Result<Vec<(ActorId, ActorUpdatePayload)>> {
        let first = self
            .stream
            .read_message()?
            .ok_or_else(|| ReplayError::malformed_keyframe(&keyframe.name, "empty block"))?;
        if *first.message.message_type() != MessageType::LogBeginKeyframeTransaction {
            return Err(ReplayError::malformed_keyframe(
                &keyframe.name,
                format!("block starts with {}", first.message.message_type()),
            ));
        }

        let mut records = Vec::new();
        loop {
            let record = self.stream.read_message()?.ok_or_else(|| {
                ReplayError::malformed_keyframe(&keyframe.name, "missing end marker")
            })?;
            let message = record.message;
            match message.message_type() {
                MessageType::LogEndKeyframeTransaction => break,
                MessageType::ActorUpdated | MessageType::ActorCreated => {
                    let Some(actor) = message.about_actor() else {
                        warn!("Keyframe record without an actor, skipping");
                        continue;
                    };
                    records.push((actor, message.payload::<ActorUpdatePayload>()?));
                }
                other => debug!("Skipping {} inside keyframe '{}'", other, keyframe.name),
            }
        }
        Ok(records)
    }

    fn track_playback_actor(&mut self, actor: ActorId) {
        if !self.playback_actors.contains(&actor) {
            self.playback_actors.push(actor);
        }
    }

    fn play_back(&mut self, world: &mut World) -> Result<()> {
        let now = world.simulation_time();
        loop {
            let record = match self.next_record.take() {
                Some(record) => record,
                None => match self.stream.read_message()? {
                    Some(record) => record,
                    None => {
                        self.reach_end_of_stream(world);
                        return Ok(());
                    }
                },
            };
            if record.sim_time > now {
                self.next_record = Some(record);
                return Ok(());
            }
            self.play_record(record.message, world);
        }
    }

    fn play_record(&mut self, message: Message, world: &mut World) {
        let message_type = message.message_type().clone();
        match message_type {
            MessageType::LogBeginKeyframeTransaction => {
                self.in_keyframe_block = true;
                return;
            }
            MessageType::LogEndKeyframeTransaction => {
                self.in_keyframe_block = false;
                return;
            }
            _ if self.in_keyframe_block => return,
            _ if message_type.is_tick()
                || message_type.category() == MessageCategory::Log
                || message_type == MessageType::TimerElapsed =>
            {
                return
            }
            MessageType::ActorCreated | MessageType::ActorUpdated => {
                if let Err(e) = self.play_actor_update(message, world) {
                    warn!("Failed to play back {}: {}", message_type, e);
                }
            }
            MessageType::ActorDeleted => {
                if let Some(actor) = message.about_actor() {
                    if world.find_actor(actor).is_some() {
                        world.mark_actor_for_removal(actor);
                    }
                    self.playback_actors.retain(|a| *a != actor);
                }
            }
            _ => world.send_message(message.with_sender(self.playback_identity.clone())),
        }
        self.status.num_messages += 1;
    }

    fn play_actor_update(&mut self, message: Message, world: &mut World) -> Result<()> {
        let Some(actor) = message.about_actor() else {
            return Ok(());
        };
        if self.ignored_actors.contains(&actor) {
            return Ok(());
        }
        let update: ActorUpdatePayload = message.payload()?;
        let create = *message.message_type() == MessageType::ActorCreated
            || update.actor_type.is_some();
        let existed = world.find_actor(actor).is_some();
        if world.apply_actor_update(actor, &update, create, false)? {
            self.track_playback_actor(actor);
        }
        if existed && *message.message_type() == MessageType::ActorUpdated {
            world.send_message(message.with_sender(self.playback_identity.clone()));
        }
        Ok(())
    }

    fn reach_end_of_stream(&mut self, world: &mut World) {
        if self.end_of_stream_reported {
            return;
        }
        self.end_of_stream_reported = true;
        world.set_paused(true);
        info!(
            "End of log '{}' at {:.3}s, simulation paused",
            self.status.log_file,
            world.simulation_time()
        );
        self.send_status(world);
    }

    // Idle

    fn stop(&mut self, world: &mut World) -> Result<()> {
        let previous = self.status.state;
        if !previous.can_transition_to(LogState::Idle) {
            return Err(ReplayError::wrong_state("go idle", previous));
        }
        if previous == LogState::Record {
            self.stream.set_record_duration(self.status.record_duration);
        }
        world.clear_timer(AUTO_KEYFRAME_TIMER_NAME, None);
        let closed = self.stream.close();

        self.status.state = LogState::Idle;
        self.next_record = None;
        self.in_keyframe_block = false;
        self.end_of_stream_reported = false;

        if previous == LogState::Playback {
            let actors = std::mem::take(&mut self.playback_actors);
            let count = actors.len();
            for actor in actors {
                if world.find_actor(actor).is_some() {
                    world.mark_actor_for_removal(actor);
                }
            }
            world.set_paused(false);
            debug!("Removed {} playback actors", count);
        }
        info!("Replay recorder idle (was {})", previous);
        self.send_status(world);
        closed.map_err(ReplayError::from)
    }

    // Requests

    fn on_tick(&mut self, message: &Message, world: &mut World) -> Result<()> {
        let tick: TickPayload = message.payload()?;
        self.status.current_sim_time = tick.simulation_time;
        match self.status.state {
            LogState::Record => {
                self.status.record_duration += tick.delta_sim_time;
                Ok(())
            }
            LogState::Playback => self.play_back(world),
            LogState::Idle => Ok(()),
        }
    }

    fn on_timer(&mut self, message: &Message, world: &mut World) -> Result<()> {
        let timer: TimerElapsedPayload = message.payload()?;
        if timer.timer_name != AUTO_KEYFRAME_TIMER_NAME || message.about_actor().is_some() {
            return Ok(());
        }
        if self.status.state != LogState::Record {
            warn!("Auto keyframe timer fired in {} state", self.status.state);
            world.clear_timer(AUTO_KEYFRAME_TIMER_NAME, None);
            return Ok(());
        }
        let name = format!("AutoKeyFrame {:.3}", world.simulation_time());
        self.capture_keyframe(LogKeyframe::new(name), world)?;
        Ok(())
    }

    fn on_capture_keyframe(&mut self, message: &Message, world: &World) -> Result<()> {
        let keyframe = if message.parameters().contains("keyframe") {
            message.payload::<KeyframeRequest>()?.keyframe
        } else {
            LogKeyframe::new(format!("Keyframe {:.3}", world.simulation_time()))
        };
        self.capture_keyframe(keyframe, world)?;
        Ok(())
    }

    fn on_jump_to_keyframe(&mut self, message: &Message, world: &mut World) -> Result<()> {
        let request: KeyframeRequest = message.payload()?;
        self.jump_to_keyframe(request.keyframe.id, world)?;
        Ok(())
    }

    fn on_set_auto_keyframe_interval(&mut self, message: &Message, world: &mut World) -> Result<()> {
        let request: AutoKeyframeIntervalRequest = message.payload()?;
        if !request.interval.is_finite() || request.interval < 0.0 {
            return Err(ReplayError::invalid_request(format!(
                "auto keyframe interval must be zero or positive, got {}",
                request.interval
            )));
        }
        self.status.auto_keyframe_interval = request.interval;
        self.arm_auto_keyframe_timer(world);
        self.send_status(world);
        Ok(())
    }

    fn on_set_log_file(&mut self, message: &Message, world: &mut World) -> Result<()> {
        if self.status.state != LogState::Idle {
            return Err(ReplayError::wrong_state("change the log file", self.status.state));
        }
        let request: LogFileRequest = message.payload()?;
        if request.log_file.trim().is_empty() {
            return Err(ReplayError::invalid_request("log file name is empty"));
        }
        self.status.log_file = request.log_file;
        self.send_status(world);
        Ok(())
    }

    fn on_delete_log(&mut self, message: &Message, world: &mut World) -> Result<()> {
        if self.status.state != LogState::Idle {
            return Err(ReplayError::wrong_state("delete a log", self.status.state));
        }
        let request: LogFileRequest = message.payload()?;
        self.stream.delete(&request.log_file)?;
        info!("Deleted log '{}'", request.log_file);
        self.send_logs(world)
    }

    /// Keyframes and tags of the selected log, opening it briefly when idle
    fn log_index(&mut self) -> Result<(Vec<LogKeyframe>, Vec<LogTag>)> {
        if self.stream.current_log().is_some() {
            return Ok((self.stream.keyframes()?, self.stream.tags()?));
        }
        self.stream.open(&self.status.log_file)?;
        let index = self
            .stream
            .keyframes()
            .and_then(|keyframes| Ok((keyframes, self.stream.tags()?)));
        self.stream.close()?;
        Ok(index?)
    }

    fn send_keyframes(&mut self, world: &mut World) -> Result<()> {
        let (keyframes, _) = self.log_index()?;
        let reply = world
            .message_factory()
            .create_with(MessageType::LogInfoKeyframes, &KeyframeList { keyframes })?;
        world.send_message(reply);
        Ok(())
    }

    fn send_tags(&mut self, world: &mut World) -> Result<()> {
        let (_, tags) = self.log_index()?;
        let reply = world
            .message_factory()
            .create_with(MessageType::LogInfoTags, &TagList { tags })?;
        world.send_message(reply);
        Ok(())
    }

    fn send_logs(&mut self, world: &mut World) -> Result<()> {
        let logs = self.stream.available_logs()?;
        let reply = world
            .message_factory()
            .create_with(MessageType::LogInfoLogs, &LogList { logs })?;
        world.send_message(reply);
        Ok(())
    }

    fn send_status(&self, world: &mut World) {
        let payload = LogStatusPayload {
            status: self.status.clone(),
        };
        match world
            .message_factory()
            .create_with(MessageType::LogInfoStatus, &payload)
        {
            Ok(message) => world.send_message(message),
            Err(e) => error!("Failed to build recorder status: {}", e),
        }
    }

    fn reject(&self, request: &Message, reason: &ReplayError, world: &mut World) {
        warn!(
            "Replay recorder rejected {}: {}",
            request.message_type(),
            reason
        );
        let payload = RequestRejectedPayload {
            request: request.message_type().name().to_string(),
            reason: reason.to_string(),
        };
        match world
            .message_factory()
            .create_with(MessageType::RequestRejected, &payload)
        {
            Ok(message) => world.send_message(message),
            Err(e) => error!("Failed to build rejection: {}", e),
        }
    }

    fn ignore_list_request(&mut self, message: &Message) -> Result<()> {
        if *message.message_type() == MessageType::LogRequestClearIgnoreList {
            debug!("Cleared {} ignored actors", self.ignored_actors.len());
            self.ignored_actors.clear();
            return Ok(());
        }
        let actor = message
            .about_actor()
            .ok_or_else(|| ReplayError::invalid_request("ignore list request without an actor"))?;
        if *message.message_type() == MessageType::LogRequestAddIgnoredActor {
            self.ignored_actors.insert(actor);
            debug!("Ignoring actor {}", actor);
        } else if !self.ignored_actors.remove(&actor) {
            debug!("Actor {} was not ignored", actor);
        }
        Ok(())
    }

    fn handle_request(&mut self, message: &Message, world: &mut World) -> Result<()> {
        match message.message_type() {
            MessageType::LogRequestChangeStateRecord => self.start_recording(world),
            MessageType::LogRequestChangeStatePlayback => self.start_playback(world),
            MessageType::LogRequestChangeStateIdle => self.stop(world),
            MessageType::LogRequestCaptureKeyframe => self.on_capture_keyframe(message, world),
            MessageType::LogRequestJumpToKeyframe => self.on_jump_to_keyframe(message, world),
            MessageType::LogRequestInsertTag => {
                let request: InsertTagRequest = message.payload()?;
                self.insert_tag(request.tag, world).map(|_| ())
            }
            MessageType::LogRequestSetAutoKeyframeInterval => {
                self.on_set_auto_keyframe_interval(message, world)
            }
            MessageType::LogRequestSetLogFile => self.on_set_log_file(message, world),
            MessageType::LogRequestGetStatus => {
                self.send_status(world);
                Ok(())
            }
            MessageType::LogRequestGetKeyframes => self.send_keyframes(world),
            MessageType::LogRequestGetTags => self.send_tags(world),
            MessageType::LogRequestGetLogs => self.send_logs(world),
            MessageType::LogRequestDeleteLog => self.on_delete_log(message, world),
            MessageType::LogRequestAddIgnoredActor
            | MessageType::LogRequestRemoveIgnoredActor
            | MessageType::LogRequestClearIgnoreList => self.ignore_list_request(message),
            _ => Ok(()),
        }
    }
}

fn end_keyframe_transaction(
    world: &mut World,
    marker: &KeyframeTransactionPayload,
    success: bool,
) -> Result<()> {
    let end = world.message_factory().create_with(
        MessageType::LogEndKeyframeTransaction,
        &KeyframeTransactionPayload {
            success,
            ..marker.clone()
        },
    )?;
    world.send_message(end);
    Ok(())
}

impl SystemComponent for ReplayRecorder {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn on_removed_from_system(&mut self, world: &mut World) {
        if self.status.state != LogState::Idle {
            if let Err(e) = self.stop(world) {
                warn!("Failed to stop replay recorder: {}", e);
            }
        }
    }

    fn process_message(&mut self, message: &Message, world: &mut World) -> sim_actors::Result<()> {
        if self.status.state == LogState::Record && self.should_record(message) {
            self.record(message, world);
        }

        match message.message_type() {
            MessageType::TickLocal => {
                if let Err(e) = self.on_tick(message, world) {
                    error!("Replay recorder failed on tick: {}", e);
                }
            }
            MessageType::TimerElapsed => {
                if let Err(e) = self.on_timer(message, world) {
                    error!("Auto keyframe capture failed: {}", e);
                }
            }
            MessageType::MapChanged if message.sender() == world.machine_info() => {
                let maps: MapChangedPayload = message.payload()?;
                self.status.active_maps = maps.map_names;
            }
            message_type if message_type.category() == MessageCategory::Log => {
                if let Err(e) = self.handle_request(message, world) {
                    self.reject(message, &e, world);
                }
            }
            _ => {}
        }
        Ok(())
    }
}
