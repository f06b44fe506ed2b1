#![forbid(unsafe_code)]

//! Temporal stabilization of tracked touch contacts.
//!
//! Removes frame-to-frame jitter and rejects detections that flicker in and
//! out of existence, using a sliding window of previously seen frames.
//!
//! # Algorithm
//!
//! For every tracked contact (one carrying an `index`) the counterpart with
//! the same index in the most recent stored frame is looked up:
//!
//! - **Size**: if any axis of `|size - prev.size|` exceeds the configured
//!   threshold, the new size is replaced by the previous one.
//! - **Movement**: with limits `(min, max)` and `d = |mean - prev.mean|`, a
//!   displacement inside `[min, max]` is shortened by exactly `min` along its
//!   own direction. Anything outside the band pins the contact to its
//!   previous position.
//!
//! After correction, a tracked contact is only reported if its index was
//! present in every frame of the trailing window. Untracked contacts always
//! pass.
//!
//! # Invariants
//!
//! 1. The stored history always keeps every corrected contact, filtered or not
//! 2. Untracked contacts are never corrected and never dropped
//! 3. With temporal checks disabled, the frame length never changes
//! 4. History is a fixed ring; no allocation once the frame buffers have grown
//!
//! # Failure Modes
//!
//! - A fast real motion classified as a jump stays pinned until it slows
//!   down into the `[min, max]` band.

use crate::contacts::{Contact, Frame};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Dead-zone / clamp band for centroid displacement between frames.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MovementLimits {
    /// Displacements shorter than this are jitter.
    pub min: f64,
    /// Displacements longer than this are implausible jumps.
    pub max: f64,
}

impl MovementLimits {
    #[inline]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

/// Configuration for contact stabilization.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StabilizerConfig {
    /// Number of consecutive frames a tracked contact must appear in before
    /// it is reported. History depth is `max(temporal_window, 2)`.
    /// Default: 3
    pub temporal_window: usize,

    /// Drop contacts that fail the temporal presence test.
    /// Default: true
    pub check_temporal_stability: bool,

    /// Maximum per-axis size change between consecutive frames.
    /// Default: None (size correction disabled)
    pub size_difference_threshold: Option<f64>,

    /// Displacement band, see [`MovementLimits`].
    /// Default: None (movement correction disabled)
    pub movement_limits: Option<MovementLimits>,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            temporal_window: 3,
            check_temporal_stability: true,
            size_difference_threshold: None,
            movement_limits: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Stabilizer
// ---------------------------------------------------------------------------

/// Stateful contact stabilizer owning a ring of the last frames.
///
/// Feed one frame per sensor tick via [`stabilize`](Stabilizer::stabilize).
/// Not thread-safe; use one instance per touch surface.
#[derive(Debug)]
pub struct Stabilizer {
    config: StabilizerConfig,

    /// Ring of stored frames, `frames[head]` is the oldest.
    frames: Vec<Frame>,

    /// Slot of the oldest stored frame.
    head: usize,

    /// Frames stored since construction or the last reset, saturating at
    /// the ring length.
    filled: usize,

    /// Diagnostic: total contacts removed for temporal instability.
    dropped: u64,
}

impl Stabilizer {
    /// Create a new stabilizer with the given configuration.
    #[must_use]
    pub fn new(config: StabilizerConfig) -> Self {
        let depth = config.temporal_window.max(2);

        Self {
            config,
            frames: vec![Frame::new(); depth],
            head: 0,
            filled: 0,
            dropped: 0,
        }
    }

    /// Clear all stored frames. Configuration is kept.
    pub fn reset(&mut self) {
        for frame in &mut self.frames {
            frame.clear();
        }
        self.head = 0;
        self.filled = 0;
    }

    /// Stabilize all contacts of a frame in place.
    ///
    /// Tracked contacts are corrected against the previous frame, then
    /// contacts that are not temporally stable are removed (if enabled).
    pub fn stabilize(&mut self, frame: &mut Frame) {
        let depth = self.frames.len();
        let newest = (self.head + depth - 1) % depth;

        for contact in frame.iter_mut() {
            self.stabilize_contact(contact, &self.frames[newest]);
        }

        // Recycle the oldest slot for the new frame.
        let slot = self.head;
        self.frames[slot].clear();
        self.frames[slot].extend_from_slice(frame);

        if self.checks_temporal() && self.filled + 1 >= depth {
            let before = frame.len();
            frame.retain(|contact| self.check_temporal(contact, slot));

            let removed = before - frame.len();
            if removed > 0 {
                self.dropped += removed as u64;
                crate::trace!(removed, "dropped temporally unstable contacts");
            }
        }

        self.head = (slot + 1) % depth;
        self.filled = (self.filled + 1).min(depth);
    }

    /// Get the number of contacts dropped so far (diagnostic).
    #[inline]
    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }

    /// Number of frames held in history.
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Get a reference to the current configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &StabilizerConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    /// Temporal filtering needs a requested window of at least two frames.
    fn checks_temporal(&self) -> bool {
        self.config.check_temporal_stability && self.config.temporal_window >= 2
    }

    /// Whether the contact is present in every stored frame except `skip`,
    /// the slot that already holds the current frame.
    fn check_temporal(&self, contact: &Contact, skip: usize) -> bool {
        let Some(index) = contact.index else {
            return true;
        };

        self.frames
            .iter()
            .enumerate()
            .filter(|(slot, _)| *slot != skip)
            .all(|(_, frame)| Contact::find_in_frame(index, frame).is_some())
    }

    fn stabilize_contact(&self, contact: &mut Contact, previous: &[Contact]) {
        let Some(index) = contact.index else {
            return;
        };

        let Some(last) = Contact::find_in_frame(index, previous) else {
            return;
        };

        if let Some(threshold) = self.config.size_difference_threshold {
            stabilize_size(contact, last, threshold);
        }

        if let Some(limits) = self.config.movement_limits {
            stabilize_movement(contact, last, limits);
        }
    }
}

/// Reject rapid size changes.
fn stabilize_size(current: &mut Contact, last: &Contact, threshold: f64) {
    let delta = (current.size - last.size).abs();

    if !delta.all_le(threshold) {
        current.size = last.size;
    }
}

/// Absorb jitter and pin implausible jumps.
fn stabilize_movement(current: &mut Contact, last: &Contact, limits: MovementLimits) {
    let delta = current.mean - last.mean;
    let distance = delta.norm();

    if distance >= limits.min && distance <= limits.max {
        // A zero displacement has no direction and nothing to absorb.
        if distance > 0.0 {
            current.mean -= limits.min * (delta / distance);
        }
    } else {
        current.mean = last.mean;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
