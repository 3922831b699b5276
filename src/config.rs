//! Engine tuning knobs, loaded from environment variables.
//!
//! Every knob has a compiled-in default in [`crate::consts`]. Missing
//! variables fall back to the default; unparseable ones do too, with a
//! warning, so a bad environment can never prevent a board from opening.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::time::Duration;

use tracing::warn;

use crate::consts::{AUTOSAVE_DEBOUNCE_MS, CULL_PADDING_PX, HISTORY_MAX_DEPTH, SAVE_QUEUE_CAPACITY, SNAP_THRESHOLD_PX};

/// Runtime configuration for [`crate::engine::EngineCore`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Maximum undo depth.
    pub history_depth: usize,
    /// Quiet period before an autosave fires.
    pub autosave_debounce: Duration,
    /// Snap distance in screen pixels.
    pub snap_threshold_px: f64,
    /// Culling padding in screen pixels.
    pub cull_padding_px: f64,
    /// Bounded capacity of the save worker queue.
    pub save_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_depth: HISTORY_MAX_DEPTH,
            autosave_debounce: Duration::from_millis(AUTOSAVE_DEBOUNCE_MS),
            snap_threshold_px: SNAP_THRESHOLD_PX,
            cull_padding_px: CULL_PADDING_PX,
            save_queue_capacity: SAVE_QUEUE_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Read the configuration from `REFBOARD_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            history_depth: env_parse("REFBOARD_HISTORY_DEPTH", HISTORY_MAX_DEPTH).max(1),
            autosave_debounce: Duration::from_millis(env_parse("REFBOARD_AUTOSAVE_DEBOUNCE_MS", AUTOSAVE_DEBOUNCE_MS)),
            snap_threshold_px: env_parse("REFBOARD_SNAP_THRESHOLD_PX", SNAP_THRESHOLD_PX).max(0.0),
            cull_padding_px: env_parse("REFBOARD_CULL_PADDING_PX", CULL_PADDING_PX).max(0.0),
            save_queue_capacity: env_parse("REFBOARD_SAVE_QUEUE_CAPACITY", SAVE_QUEUE_CAPACITY).max(1),
        }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    let Ok(raw) = std::env::var(key) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => value,
        Err(_) => {
            warn!(key, raw = %raw, "invalid config value; using default");
            default
        }
    }
}
