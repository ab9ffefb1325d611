//! Replay session: routes recorded events through the stabilizers.

use std::collections::{BTreeMap, HashMap};

use fer_models::{ClassLayout, EmotionPrediction, ProbabilityVector, SmoothingConfig};
use fer_stabilizer::{ConfigHandle, ProbabilityTimeline, StabilizerRegistry, TrackId, TrackedStabilizers};
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::config::{resolve_settings, ReplayConfig, ReplayMode};
use crate::control::PipelineControl;
use crate::error::ReplayResult;
use crate::event::{FaceInput, FaceOutput, FrameInput, FrameOutput, ReplayEvent};

/// Counters reported at the end of a replay.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReplaySummary {
    pub frames_processed: u64,
    pub frames_skipped: u64,
    pub config_updates: u64,
    pub rejected_configs: u64,
    pub malformed_lines: u64,
    /// Frames per dominant class, summed over faces
    pub dominant_counts: BTreeMap<&'static str, u64>,
}

/// Key of a display timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaceKey {
    /// Position among the faces routed by slot
    Slot(usize),
    /// Persistent tracker ID
    Track(TrackId),
}

/// Slot registry plus the missed-frame hysteresis the registry leaves to its
/// caller.
#[derive(Debug)]
struct SlotFaces {
    registry: StabilizerRegistry,
    /// Consecutive frames with no faces while slots are live
    missed_frames: u32,
}

impl SlotFaces {
    fn new(config: ConfigHandle) -> Self {
        Self {
            registry: StabilizerRegistry::new(config),
            missed_frames: 0,
        }
    }

    /// Route `faces` by position. An empty frame keeps every slot until more
    /// than `max_gap` empty frames have passed in a row.
    fn route(
        &mut self,
        faces: &[&FaceInput],
        max_gap: u32,
        timelines: &mut HashMap<FaceKey, ProbabilityTimeline>,
    ) -> ReplayResult<Vec<ProbabilityVector>> {
        if faces.is_empty() {
            if self.registry.slot_count() == 0 {
                return Ok(Vec::new());
            }
            self.missed_frames += 1;
            if self.missed_frames <= max_gap {
                debug!(missed = self.missed_frames, "No faces, keeping slot state");
                return Ok(Vec::new());
            }
            info!(missed = self.missed_frames, "Faces lost, dropping slot state");
        }
        self.missed_frames = 0;

        if self.registry.slot_count() != faces.len() {
            timelines.retain(|key, _| !matches!(key, FaceKey::Slot(_)));
        }
        self.registry.ensure(faces.len());

        let mut stable = Vec::with_capacity(faces.len());
        for (slot, face) in faces.iter().enumerate() {
            stable.push(self.registry.route(slot, &face.probabilities)?);
        }
        Ok(stable)
    }
}

#[derive(Debug)]
enum Stabilizers {
    Slots(SlotFaces),
    Tracked {
        tracked: TrackedStabilizers,
        /// Faces that arrive without a track ID
        untracked: SlotFaces,
    },
}

/// State of one replay run.
#[derive(Debug)]
pub struct ReplaySession {
    layout: ClassLayout,
    config: ConfigHandle,
    stabilizers: Stabilizers,
    control: PipelineControl,
    /// Frames a face may go missing before its state is dropped
    max_gap: u32,
    timeline_size: usize,
    timelines: HashMap<FaceKey, ProbabilityTimeline>,
    summary: ReplaySummary,
}

impl ReplaySession {
    pub fn new(replay: &ReplayConfig, smoothing: SmoothingConfig, control: PipelineControl) -> Self {
        let config = ConfigHandle::new(smoothing);
        let stabilizers = match replay.mode {
            ReplayMode::Slots => Stabilizers::Slots(SlotFaces::new(config.clone())),
            ReplayMode::Tracked => Stabilizers::Tracked {
                tracked: TrackedStabilizers::new(config.clone(), replay.track_max_gap),
                untracked: SlotFaces::new(config.clone()),
            },
        };
        info!(mode = %replay.mode, classes = replay.layout.len(), "Replay session created");

        Self {
            layout: replay.layout.clone(),
            config,
            stabilizers,
            control,
            max_gap: replay.track_max_gap,
            timeline_size: replay.timeline_size,
            timelines: HashMap::new(),
            summary: ReplaySummary::default(),
        }
    }

    /// Apply one event. Returns output only for processed frames.
    pub fn handle_event(&mut self, event: ReplayEvent) -> ReplayResult<Option<FrameOutput>> {
        match event {
            ReplayEvent::Frame(frame) => {
                if self.control.is_paused() {
                    debug!(frame = frame.frame, "Paused, skipping frame");
                    self.summary.frames_skipped += 1;
                    return Ok(None);
                }
                self.process_frame(frame).map(Some)
            }
            ReplayEvent::Config { config } => {
                self.apply_settings(config);
                Ok(None)
            }
            ReplayEvent::Control { paused } => {
                info!(paused, "Pipeline pause toggled");
                self.control.set_paused(paused);
                Ok(None)
            }
        }
    }

    fn process_frame(&mut self, frame: FrameInput) -> ReplayResult<FrameOutput> {
        // (slot in frame, track ID, timeline key, stabilized vector)
        let mut faces = Vec::with_capacity(frame.faces.len());

        match &mut self.stabilizers {
            Stabilizers::Slots(slots) => {
                let inputs: Vec<&FaceInput> = frame.faces.iter().collect();
                let stable = slots.route(&inputs, self.max_gap, &mut self.timelines)?;
                for ((slot, face), stable) in frame.faces.iter().enumerate().zip(stable) {
                    faces.push((slot, face.track_id, FaceKey::Slot(slot), stable));
                }
            }
            Stabilizers::Tracked { tracked, untracked } => {
                let mut loose = Vec::new();
                for (slot, face) in frame.faces.iter().enumerate() {
                    match face.track_id {
                        Some(track_id) => {
                            let stable = tracked.observe(track_id, &face.probabilities);
                            faces.push((slot, Some(track_id), FaceKey::Track(track_id), stable));
                        }
                        None => loose.push(slot),
                    }
                }
                for evicted in tracked.end_frame() {
                    self.timelines.remove(&FaceKey::Track(evicted));
                }

                if !loose.is_empty() {
                    warn!(frame = frame.frame, count = loose.len(), "Faces without track_id, routing by position");
                }
                let inputs: Vec<&FaceInput> = loose.iter().map(|&slot| &frame.faces[slot]).collect();
                let stable = untracked.route(&inputs, self.max_gap, &mut self.timelines)?;
                for (position, (slot, stable)) in loose.into_iter().zip(stable).enumerate() {
                    faces.push((slot, None, FaceKey::Slot(position), stable));
                }
                faces.sort_by_key(|(slot, ..)| *slot);
            }
        }

        let mut outputs = Vec::with_capacity(faces.len());
        for (slot, track_id, key, stable) in faces {
            let prediction = EmotionPrediction::from_probabilities(&stable, &self.layout);
            if let Some(p) = prediction {
                *self.summary.dominant_counts.entry(p.label()).or_insert(0) += 1;
            }
            let timeline_size = self.timeline_size;
            self.timelines
                .entry(key)
                .or_insert_with(|| ProbabilityTimeline::new(timeline_size))
                .push(stable.clone());
            outputs.push(FaceOutput::new(slot, track_id, stable, prediction));
        }

        self.summary.frames_processed += 1;
        Ok(FrameOutput {
            frame: frame.frame,
            faces: outputs,
        })
    }

    fn apply_settings(&mut self, document: serde_json::Value) {
        let config = match resolve_settings(document, &self.layout) {
            Ok(config) => config,
            Err(e) => {
                warn!("Rejected settings change: {}", e);
                self.summary.rejected_configs += 1;
                return;
            }
        };
        if let Err(e) = config.validate() {
            warn!("Rejected settings change: {}", e);
            self.summary.rejected_configs += 1;
            return;
        }

        // Publishing through the handle is what a settings UI on another
        // thread would do; the registries pick it up on their next frame.
        self.config.publish(config);
        self.summary.config_updates += 1;
    }

    /// Count a line that could not be parsed as an event.
    pub fn record_malformed(&mut self) {
        self.summary.malformed_lines += 1;
    }

    pub fn summary(&self) -> &ReplaySummary {
        &self.summary
    }

    pub fn control(&self) -> &PipelineControl {
        &self.control
    }

    pub fn config_handle(&self) -> &ConfigHandle {
        &self.config
    }

    /// Display timelines, keyed by slot position or track ID.
    pub fn timelines(&self) -> &HashMap<FaceKey, ProbabilityTimeline> {
        &self.timelines
    }
}

/// Replay every event from `reader`, writing one JSON line per processed
/// frame to `writer`. Stops early when the session's control is cancelled.
pub async fn run_replay<R, W>(session: &mut ReplaySession, reader: R, mut writer: W) -> ReplayResult<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut line_no = 0u64;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if session.control().is_cancelled() {
            info!(line = line_no, "Replay cancelled");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let event: ReplayEvent = match serde_json::from_str(trimmed) {
            Ok(event) => event,
            Err(e) => {
                warn!(line = line_no, "Skipping malformed event: {}", e);
                session.record_malformed();
                continue;
            }
        };

        if let Some(output) = session.handle_event(event)? {
            let mut json = serde_json::to_vec(&output)?;
            json.push(b'\n');
            writer.write_all(&json).await?;
        }
    }

    writer.flush().await?;
    Ok(())
}
