//! Slot-indexed stabilizer registry.
//!
//! Holds one [`ProbabilityStabilizer`] per face slot. Slot identity is not
//! stable across count changes, so a count change rebuilds every slot. For
//! persistent track IDs use [`TrackedStabilizers`](crate::TrackedStabilizers).

use fer_models::{ProbabilityVector, SmoothingConfig};
use tracing::{debug, info, warn};

use crate::config_handle::ConfigHandle;
use crate::error::{StabilizerError, StabilizerResult};
use crate::metrics;
use crate::stabilizer::ProbabilityStabilizer;

/// One stabilizer per face slot, sharing a config handle.
#[derive(Debug)]
pub struct StabilizerRegistry {
    config: ConfigHandle,
    /// Handle version last applied to the slots
    applied_version: u64,
    slots: Vec<ProbabilityStabilizer>,
}

impl StabilizerRegistry {
    /// Create an empty registry reading config from `config`.
    pub fn new(config: ConfigHandle) -> Self {
        let applied_version = config.version();
        Self {
            config,
            applied_version,
            slots: Vec::new(),
        }
    }

    /// Make the registry hold exactly `slot_count` stabilizers.
    ///
    /// Any count change discards every existing stabilizer and creates
    /// fresh ones under the current config. Call on count transitions only.
    pub fn ensure(&mut self, slot_count: usize) {
        if self.slots.len() == slot_count {
            return;
        }

        let (version, snapshot) = self.config.versioned_snapshot();
        info!(
            previous = self.slots.len(),
            slot_count, "Rebuilding stabilizer slots"
        );
        self.slots = (0..slot_count)
            .map(|_| ProbabilityStabilizer::new(snapshot.clone()))
            .collect();
        self.applied_version = version;
        metrics::record_rebuild();
    }

    /// Publish `config` and apply it to every live stabilizer without
    /// resetting their state.
    pub fn update_config(&mut self, config: SmoothingConfig) {
        self.config.publish(config);
        self.sync_config();
    }

    /// Smooth `raw` with the stabilizer in `slot`.
    ///
    /// Picks up any config published through the handle since the last call
    /// before smoothing.
    pub fn route(&mut self, slot: usize, raw: &[f32]) -> StabilizerResult<ProbabilityVector> {
        let slot_count = self.slots.len();
        if slot >= slot_count {
            warn!(slot, slot_count, "Routed to a slot outside the registry");
            return Err(StabilizerError::SlotOutOfRange { slot, slot_count });
        }

        self.sync_config();
        Ok(self.slots[slot].smooth(raw))
    }

    /// Reset every slot, e.g. after switching classifier models.
    pub fn reset_all(&mut self) {
        debug!(slot_count = self.slots.len(), "Resetting all stabilizer slots");
        for stabilizer in &mut self.slots {
            stabilizer.reset();
        }
    }

    /// Reset one slot, e.g. when its face is re-acquired after loss.
    pub fn reset_slot(&mut self, slot: usize) -> StabilizerResult<()> {
        let slot_count = self.slots.len();
        let stabilizer = self
            .slots
            .get_mut(slot)
            .ok_or(StabilizerError::SlotOutOfRange { slot, slot_count })?;
        stabilizer.reset();
        Ok(())
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn slot(&self, slot: usize) -> Option<&ProbabilityStabilizer> {
        self.slots.get(slot)
    }

    pub fn config_handle(&self) -> &ConfigHandle {
        &self.config
    }

    fn sync_config(&mut self) {
        let (version, snapshot) = self.config.versioned_snapshot();
        if version == self.applied_version {
            return;
        }
        for stabilizer in &mut self.slots {
            stabilizer.reconfigure(snapshot.clone());
        }
        self.applied_version = version;
        metrics::record_config_reload(self.slots.len());
        debug!(version, slots = self.slots.len(), "Applied config snapshot to slots");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fer_models::AggregatePolicy;

    fn passthrough() -> SmoothingConfig {
        SmoothingConfig {
            neutral_boost: 1.0,
            ema_alpha: 1.0,
            history_window_size: 4,
            frames_for_aggregate: 1,
            aggregate_policy: AggregatePolicy::Mean,
            ..Default::default()
        }
    }

    #[test]
    fn test_ensure_creates_slots() {
        let mut registry = StabilizerRegistry::new(ConfigHandle::default());
        assert_eq!(registry.slot_count(), 0);
        registry.ensure(2);
        assert_eq!(registry.slot_count(), 2);
        assert!(registry.slot(1).map(|s| !s.is_initialized()).unwrap_or(false));
    }

    #[test]
    fn test_ensure_same_count_keeps_state() {
        let mut registry = StabilizerRegistry::new(ConfigHandle::new(passthrough()));
        registry.ensure(1);
        registry.route(0, &[0.5, 0.5]).unwrap();
        registry.ensure(1);
        assert_eq!(registry.slot(0).unwrap().history_len(), 1);
    }

    #[test]
    fn test_count_change_rebuilds_everything() {
        let mut registry = StabilizerRegistry::new(ConfigHandle::new(passthrough()));
        registry.ensure(1);
        registry.route(0, &[0.5, 0.5]).unwrap();

        registry.ensure(2);
        assert!(!registry.slot(0).unwrap().is_initialized());
        assert!(!registry.slot(1).unwrap().is_initialized());
    }

    #[test]
    fn test_huge_history_window_routes() {
        let config = SmoothingConfig {
            history_window_size: usize::MAX / 4,
            ..passthrough()
        };
        assert!(config.validate().is_ok());

        let mut registry = StabilizerRegistry::new(ConfigHandle::new(config));
        registry.ensure(1);
        assert_eq!(registry.route(0, &[0.25, 0.75]).unwrap(), vec![0.25, 0.75]);
        assert_eq!(registry.slot(0).unwrap().history_len(), 1);
    }

    #[test]
    fn test_route_out_of_range() {
        let mut registry = StabilizerRegistry::new(ConfigHandle::default());
        registry.ensure(1);
        assert_eq!(
            registry.route(1, &[1.0]),
            Err(StabilizerError::SlotOutOfRange { slot: 1, slot_count: 1 })
        );
    }

    #[test]
    fn test_slots_are_independent() {
        let mut registry = StabilizerRegistry::new(ConfigHandle::new(passthrough()));
        registry.ensure(2);
        registry.route(0, &[1.0, 0.0]).unwrap();
        let out = registry.route(1, &[0.0, 1.0]).unwrap();
        assert_eq!(out, vec![0.0, 1.0]);
        assert_eq!(registry.slot(0).unwrap().ema().unwrap(), &[1.0, 0.0]);
    }

    #[test]
    fn test_update_config_keeps_state() {
        let mut registry = StabilizerRegistry::new(ConfigHandle::new(passthrough()));
        registry.ensure(1);
        registry.route(0, &[1.0, 0.0]).unwrap();

        registry.update_config(SmoothingConfig {
            ema_alpha: 0.5,
            ..passthrough()
        });
        let stabilizer = registry.slot(0).unwrap();
        assert_eq!(stabilizer.history_len(), 1);
        assert_eq!(stabilizer.config().ema_alpha, 0.5);

        let out = registry.route(0, &[0.0, 1.0]).unwrap();
        assert_eq!(out, vec![0.5, 0.5]);
    }

    #[test]
    fn test_route_picks_up_published_config() {
        let handle = ConfigHandle::new(passthrough());
        let mut registry = StabilizerRegistry::new(handle.clone());
        registry.ensure(1);
        registry.route(0, &[1.0, 0.0]).unwrap();

        // Published from the settings side, not through the registry
        handle.publish(SmoothingConfig {
            ema_alpha: 0.5,
            ..passthrough()
        });
        let out = registry.route(0, &[0.0, 1.0]).unwrap();
        assert_eq!(out, vec![0.5, 0.5]);
    }

    #[test]
    fn test_reset_slot() {
        let mut registry = StabilizerRegistry::new(ConfigHandle::new(passthrough()));
        registry.ensure(2);
        registry.route(0, &[1.0, 0.0]).unwrap();
        registry.route(1, &[1.0, 0.0]).unwrap();

        registry.reset_slot(0).unwrap();
        assert!(!registry.slot(0).unwrap().is_initialized());
        assert!(registry.slot(1).unwrap().is_initialized());
        assert!(registry.reset_slot(5).is_err());

        registry.reset_all();
        assert!(!registry.slot(1).unwrap().is_initialized());
    }
}
