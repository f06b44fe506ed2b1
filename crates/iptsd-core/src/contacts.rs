#![forbid(unsafe_code)]

//! Tracked touch contacts.

use crate::geometry::Vec2;

/// One tracked touch blob in one frame.
///
/// `index` is assigned by the upstream tracker and stays stable across frames
/// for the same physical touch. `None` means the contact could not be tracked
/// this frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Contact {
    /// Stable track identifier.
    #[cfg_attr(feature = "serde", serde(default))]
    pub index: Option<usize>,
    /// Centroid in normalized surface coordinates.
    pub mean: Vec2,
    /// Ellipse axis lengths (major, minor) in normalized units.
    pub size: Vec2,
}

/// One sensor tick worth of contacts.
pub type Frame = Vec<Contact>;

impl Contact {
    /// Create an untracked contact.
    #[inline]
    pub const fn new(mean: Vec2, size: Vec2) -> Self {
        Self {
            index: None,
            mean,
            size,
        }
    }

    /// Attach a track index.
    #[inline]
    #[must_use]
    pub const fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Find the contact carrying `index` in `frame`.
    ///
    /// Linear scan; frames hold at most a few dozen contacts.
    #[must_use]
    pub fn find_in_frame(index: usize, frame: &[Contact]) -> Option<&Contact> {
        frame.iter().find(|c| c.index == Some(index))
    }
}
