//! Stabilizers keyed by persistent face track IDs.
//!
//! Unlike the slot registry, a face keeps its smoothing state for as long as
//! its tracker ID lives. Tracks missing from a frame age by one; a track
//! unseen for more than `max_gap` frames is evicted and bootstraps fresh if
//! it ever comes back.

use std::collections::HashMap;

use fer_models::{ProbabilityVector, SmoothingConfig};
use tracing::{debug, info};

use crate::config_handle::ConfigHandle;
use crate::metrics;
use crate::stabilizer::ProbabilityStabilizer;

/// Persistent identity assigned by the external face tracker.
pub type TrackId = u64;

#[derive(Debug)]
struct TrackedFace {
    stabilizer: ProbabilityStabilizer,
    /// Frames since last observation
    age: u32,
    /// Observed during the current frame
    seen: bool,
}

/// Stabilizer arena keyed by track ID with face-lost hysteresis.
#[derive(Debug)]
pub struct TrackedStabilizers {
    config: ConfigHandle,
    applied_version: u64,
    /// Maximum frames a track may go unobserved before eviction
    max_gap: u32,
    tracks: HashMap<TrackId, TrackedFace>,
}

impl TrackedStabilizers {
    /// Create an empty arena.
    pub fn new(config: ConfigHandle, max_gap: u32) -> Self {
        let applied_version = config.version();
        Self {
            config,
            applied_version,
            max_gap,
            tracks: HashMap::new(),
        }
    }

    /// Smooth `raw` for `track_id`, creating its stabilizer on first sight.
    pub fn observe(&mut self, track_id: TrackId, raw: &[f32]) -> ProbabilityVector {
        self.sync_config();

        let config = &self.config;
        let face = self.tracks.entry(track_id).or_insert_with(|| {
            debug!(track_id, "New face track, creating stabilizer");
            TrackedFace {
                stabilizer: ProbabilityStabilizer::new(config.snapshot()),
                age: 0,
                seen: false,
            }
        });
        face.age = 0;
        face.seen = true;
        face.stabilizer.smooth(raw)
    }

    /// Close the current frame.
    ///
    /// Ages every track not observed since the previous call and evicts
    /// tracks older than `max_gap`. Returns the evicted IDs.
    pub fn end_frame(&mut self) -> Vec<TrackId> {
        let max_gap = self.max_gap;
        let mut evicted = Vec::new();

        for (id, face) in self.tracks.iter_mut() {
            if face.seen {
                face.seen = false;
                continue;
            }
            face.age += 1;
            if face.age > max_gap {
                evicted.push(*id);
            }
        }

        for id in &evicted {
            self.tracks.remove(id);
        }
        if !evicted.is_empty() {
            info!(?evicted, remaining = self.tracks.len(), "Evicted lost face tracks");
            metrics::record_evictions(evicted.len());
        }
        evicted
    }

    /// Publish `config` and apply it to every live track without resetting.
    pub fn update_config(&mut self, config: SmoothingConfig) {
        self.config.publish(config);
        self.sync_config();
    }

    pub fn contains(&self, track_id: TrackId) -> bool {
        self.tracks.contains_key(&track_id)
    }

    pub fn get(&self, track_id: TrackId) -> Option<&ProbabilityStabilizer> {
        self.tracks.get(&track_id).map(|face| &face.stabilizer)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Drop every track.
    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    fn sync_config(&mut self) {
        let (version, snapshot) = self.config.versioned_snapshot();
        if version == self.applied_version {
            return;
        }
        for face in self.tracks.values_mut() {
            face.stabilizer.reconfigure(snapshot.clone());
        }
        self.applied_version = version;
        metrics::record_config_reload(self.tracks.len());
        debug!(version, tracks = self.tracks.len(), "Applied config snapshot to tracks");
    }
}
