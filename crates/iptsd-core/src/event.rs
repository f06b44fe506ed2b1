#![forbid(unsafe_code)]

//! Input event model shared by every [`OutputSink`](crate::sink::OutputSink).
//!
//! Numeric codes match `linux/input-event-codes.h` so a kernel-facing sink
//! can forward them without translation.

use std::fmt;

/// Event class (the kernel's `EV_*` type).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventClass {
    /// Report boundaries (`EV_SYN`).
    Syn,
    /// Discrete buttons (`EV_KEY`).
    Key,
    /// Absolute axes (`EV_ABS`).
    Abs,
}

impl EventClass {
    /// Kernel type code.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::Syn => 0x00,
            Self::Key => 0x01,
            Self::Abs => 0x03,
        }
    }
}

impl fmt::Display for EventClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syn => write!(f, "SYN"),
            Self::Key => write!(f, "KEY"),
            Self::Abs => write!(f, "ABS"),
        }
    }
}

/// Synchronization codes.
pub mod syn {
    pub const REPORT: u16 = 0x00;
}

/// Button codes.
pub mod key {
    pub const BTN_TOOL_PEN: u16 = 0x140;
    pub const BTN_TOOL_RUBBER: u16 = 0x141;
    pub const BTN_TOUCH: u16 = 0x14a;
    pub const BTN_STYLUS: u16 = 0x14b;
}

/// Absolute axis codes.
pub mod abs {
    pub const X: u16 = 0x00;
    pub const Y: u16 = 0x01;
    pub const PRESSURE: u16 = 0x18;
    pub const TILT_X: u16 = 0x1a;
    pub const TILT_Y: u16 = 0x1b;
    pub const MISC: u16 = 0x28;
}

/// Device property codes (`INPUT_PROP_*`).
pub mod prop {
    pub const POINTER: u16 = 0x00;
    pub const DIRECT: u16 = 0x01;
}

/// Range and resolution of an absolute axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbsInfo {
    pub min: i32,
    pub max: i32,
    /// Units per millimetre (X/Y) or per radian (tilt). Zero = unspecified.
    pub resolution: i32,
}

impl AbsInfo {
    #[inline]
    pub const fn new(min: i32, max: i32, resolution: i32) -> Self {
        Self {
            min,
            max,
            resolution,
        }
    }
}

/// A single emitted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InputEvent {
    pub class: EventClass,
    pub code: u16,
    pub value: i32,
}

impl InputEvent {
    #[inline]
    pub const fn new(class: EventClass, code: u16, value: i32) -> Self {
        Self { class, code, value }
    }
}

impl fmt::Display for InputEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:#x}={}", self.class, self.code, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_codes_match_kernel() {
        assert_eq!(EventClass::Syn.code(), 0);
        assert_eq!(EventClass::Key.code(), 1);
        assert_eq!(EventClass::Abs.code(), 3);
    }

    #[test]
    fn display_is_compact() {
        let ev = InputEvent::new(EventClass::Key, key::BTN_TOUCH, 1);
        assert_eq!(ev.to_string(), "KEY 0x14a=1");

        let ev = InputEvent::new(EventClass::Abs, abs::TILT_Y, -4500);
        assert_eq!(ev.to_string(), "ABS 0x1b=-4500");
    }
}
