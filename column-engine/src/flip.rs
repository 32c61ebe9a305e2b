//! FILENAME: column-engine/src/flip.rs
//! FLIP Bookkeeping - First, Last, Invert, Play for animated panel reflow.
//!
//! The host measures each row's `top` before a reorder (`First`) and after it
//! (`Last`). Rows that moved get a compensating offset (`Invert`) which is
//! cleared on the next animation frame so the transition animates (`Play`).
//! Measuring is the host's job; this module only does the arithmetic and
//! tracks which phase each frame is in.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Moves smaller than this are not animated.
pub const FLIP_THRESHOLD_PX: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlipRect {
    pub top: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlipOffset {
    pub key: String,
    pub delta_y: f64,
}

/// Records the measured tops of the rendered rows.
pub fn capture_flip_rects<I, K>(rows: I) -> BTreeMap<String, FlipRect>
where
    I: IntoIterator<Item = (K, f64)>,
    K: Into<String>,
{
    rows.into_iter()
        .map(|(key, top)| (key.into(), FlipRect { top }))
        .collect()
}

/// Offsets for every row present in both measurements, except the dragged
/// row, that moved at least `FLIP_THRESHOLD_PX`.
pub fn compute_flip_offsets(
    prev: &BTreeMap<String, FlipRect>,
    next: &BTreeMap<String, FlipRect>,
    drag_key: Option<&str>,
) -> Vec<FlipOffset> {
    next.iter()
        .filter(|(key, _)| drag_key != Some(key.as_str()))
        .filter_map(|(key, after)| {
            let before = prev.get(key)?;
            let delta_y = before.top - after.top;
            if !delta_y.is_finite() || delta_y.abs() < FLIP_THRESHOLD_PX {
                return None;
            }
            Some(FlipOffset {
                key: key.clone(),
                delta_y,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlipPhase {
    #[default]
    Idle,
    /// Offsets applied, waiting for the next frame.
    Inverted,
    /// Offsets cleared, rows transitioning to their new place.
    Playing,
}

/// Per-animation state: the pending offsets and the current phase.
#[derive(Debug, Clone, Default)]
pub struct FlipPlayback {
    phase: FlipPhase,
    offsets: BTreeMap<String, f64>,
}

impl FlipPlayback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> FlipPhase {
        self.phase
    }

    /// Applies `offsets`. An empty set leaves the playback idle.
    pub fn invert(&mut self, offsets: Vec<FlipOffset>) {
        self.offsets = offsets.into_iter().map(|o| (o.key, o.delta_y)).collect();
        self.phase = if self.offsets.is_empty() {
            FlipPhase::Idle
        } else {
            FlipPhase::Inverted
        };
    }

    /// Vertical translate for `key` in the current phase.
    pub fn transform_for(&self, key: &str) -> Option<f64> {
        match self.phase {
            FlipPhase::Inverted => self.offsets.get(key).copied(),
            _ => None,
        }
    }

    /// Advances from `Inverted` to `Playing`. Returns the keys whose
    /// transform must be cleared this frame.
    pub fn next_frame(&mut self) -> Vec<String> {
        if self.phase != FlipPhase::Inverted {
            return Vec::new();
        }
        self.phase = FlipPhase::Playing;
        std::mem::take(&mut self.offsets).into_keys().collect()
    }

    /// Transition end.
    pub fn finish(&mut self) {
        self.phase = FlipPhase::Idle;
        self.offsets.clear();
    }
}
