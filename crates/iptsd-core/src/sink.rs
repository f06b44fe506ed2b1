#![forbid(unsafe_code)]

//! Output device abstraction.
//!
//! An [`OutputSink`] is configured with identity and capabilities, finalized
//! with [`create`](OutputSink::create), then fed discrete values that are
//! committed as one atomic report by [`sync`](OutputSink::sync).
//!
//! [`RecordingSink`] keeps everything in memory for tests and dry runs.

use crate::error::{DeviceError, DeviceResult};
use crate::event::{AbsInfo, EventClass, InputEvent};

/// Kernel-facing virtual input device.
///
/// Emission is fire-and-forget: implementations log delivery failures
/// instead of surfacing them to the per-sample pipeline.
pub trait OutputSink {
    /// Device name shown to userspace.
    fn set_name(&mut self, name: &str);

    /// USB-style vendor/product identifiers.
    fn set_id(&mut self, vendor: u16, product: u16);

    /// Declare an input property (`INPUT_PROP_*`).
    fn set_property(&mut self, prop: u16);

    /// Declare a discrete button.
    fn set_key(&mut self, code: u16);

    /// Declare an absolute axis.
    fn set_abs(&mut self, code: u16, info: AbsInfo);

    /// Finalize capabilities and bring the device up.
    fn create(&mut self) -> DeviceResult<()>;

    /// Queue one value for the current report.
    fn emit(&mut self, class: EventClass, code: u16, value: i32);

    /// Commit everything emitted since the last sync as one report.
    fn sync(&mut self);
}

impl<S: OutputSink + ?Sized> OutputSink for Box<S> {
    fn set_name(&mut self, name: &str) {
        (**self).set_name(name);
    }

    fn set_id(&mut self, vendor: u16, product: u16) {
        (**self).set_id(vendor, product);
    }

    fn set_property(&mut self, prop: u16) {
        (**self).set_property(prop);
    }

    fn set_key(&mut self, code: u16) {
        (**self).set_key(code);
    }

    fn set_abs(&mut self, code: u16, info: AbsInfo) {
        (**self).set_abs(code, info);
    }

    fn create(&mut self) -> DeviceResult<()> {
        (**self).create()
    }

    fn emit(&mut self, class: EventClass, code: u16, value: i32) {
        (**self).emit(class, code, value);
    }

    fn sync(&mut self) {
        (**self).sync();
    }
}

/// Reject axes whose range is empty.
pub fn validate_axes(axes: &[(u16, AbsInfo)]) -> DeviceResult<()> {
    for (code, info) in axes {
        if info.min > info.max {
            return Err(DeviceError::InvalidCapability(format!(
                "axis {code:#x}: min {} > max {}",
                info.min, info.max
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// RecordingSink
// ---------------------------------------------------------------------------

/// In-memory sink that records capabilities and committed reports.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    name: String,
    id: (u16, u16),
    properties: Vec<u16>,
    keys: Vec<u16>,
    axes: Vec<(u16, AbsInfo)>,
    created: bool,
    fail_create: bool,
    pending: Vec<InputEvent>,
    reports: Vec<Vec<InputEvent>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose `create` always fails, for exercising setup errors.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_create: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn id(&self) -> (u16, u16) {
        self.id
    }

    #[must_use]
    pub fn is_created(&self) -> bool {
        self.created
    }

    #[must_use]
    pub fn has_property(&self, prop: u16) -> bool {
        self.properties.contains(&prop)
    }

    #[must_use]
    pub fn has_key(&self, code: u16) -> bool {
        self.keys.contains(&code)
    }

    /// Declared range of an axis.
    #[must_use]
    pub fn axis(&self, code: u16) -> Option<AbsInfo> {
        self.axes
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, info)| *info)
    }

    /// Events emitted but not yet committed.
    #[must_use]
    pub fn pending(&self) -> &[InputEvent] {
        &self.pending
    }

    /// Every committed report, oldest first.
    #[must_use]
    pub fn reports(&self) -> &[Vec<InputEvent>] {
        &self.reports
    }

    #[must_use]
    pub fn last_report(&self) -> Option<&[InputEvent]> {
        self.reports.last().map(Vec::as_slice)
    }

    /// Drain committed reports.
    pub fn take_reports(&mut self) -> Vec<Vec<InputEvent>> {
        std::mem::take(&mut self.reports)
    }
}

impl OutputSink for RecordingSink {
    fn set_name(&mut self, name: &str) {
        self.name = name.to_owned();
    }

    fn set_id(&mut self, vendor: u16, product: u16) {
        self.id = (vendor, product);
    }

    fn set_property(&mut self, prop: u16) {
        if !self.properties.contains(&prop) {
            self.properties.push(prop);
        }
    }

    fn set_key(&mut self, code: u16) {
        if !self.keys.contains(&code) {
            self.keys.push(code);
        }
    }

    fn set_abs(&mut self, code: u16, info: AbsInfo) {
        self.axes.retain(|(c, _)| *c != code);
        self.axes.push((code, info));
    }

    fn create(&mut self) -> DeviceResult<()> {
        if self.created {
            return Err(DeviceError::AlreadyCreated);
        }
        if self.fail_create {
            return Err(DeviceError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "recording sink configured to fail",
            )));
        }
        validate_axes(&self.axes)?;

        self.created = true;
        Ok(())
    }

    fn emit(&mut self, class: EventClass, code: u16, value: i32) {
        self.pending.push(InputEvent::new(class, code, value));
    }

    fn sync(&mut self) {
        self.reports.push(std::mem::take(&mut self.pending));
    }
}
