#![forbid(unsafe_code)]

use std::fmt;

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{
    AbsInfo as EvdevAbsInfo, AbsoluteAxisCode, AttributeSet, BusType, InputEvent, InputId,
    KeyCode, PropType, UinputAbsSetup,
};

use iptsd_core::error::{DeviceError, DeviceResult};
use iptsd_core::event::{AbsInfo, EventClass};
use iptsd_core::sink::{OutputSink, validate_axes};

/// uinput virtual device.
pub struct UinputSink {
    name: String,
    vendor: u16,
    product: u16,
    properties: AttributeSet<PropType>,
    keys: AttributeSet<KeyCode>,
    axes: Vec<(u16, AbsInfo)>,
    device: Option<VirtualDevice>,

    /// Values emitted since the last sync.
    batch: Vec<InputEvent>,

    /// Diagnostic: failed writes and dropped batches.
    write_errors: u64,
}

impl fmt::Debug for UinputSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UinputSink")
            .field("name", &self.name)
            .field("vendor", &self.vendor)
            .field("product", &self.product)
            .field("axes", &self.axes)
            .field("created", &self.device.is_some())
            .field("pending", &self.batch.len())
            .field("write_errors", &self.write_errors)
            .finish()
    }
}

impl Default for UinputSink {
    fn default() -> Self {
        Self::new()
    }
}

impl UinputSink {
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: String::new(),
            vendor: 0,
            product: 0,
            properties: AttributeSet::new(),
            keys: AttributeSet::new(),
            axes: Vec::new(),
            device: None,
            batch: Vec::new(),
            write_errors: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_created(&self) -> bool {
        self.device.is_some()
    }

    /// Number of batches that could not be delivered.
    #[inline]
    #[must_use]
    pub fn write_errors(&self) -> u64 {
        self.write_errors
    }

    /// Values queued for the next sync.
    #[inline]
    #[must_use]
    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    fn build(&self) -> std::io::Result<VirtualDevice> {
        let mut builder = VirtualDeviceBuilder::new()?
            .name(&self.name)
            .input_id(InputId::new(BusType::BUS_VIRTUAL, self.vendor, self.product, 0))
            .with_properties(&self.properties)?
            .with_keys(&self.keys)?;

        for (code, info) in &self.axes {
            let setup = UinputAbsSetup::new(AbsoluteAxisCode(*code), to_evdev_abs(*info));
            builder = builder.with_absolute_axis(&setup)?;
        }

        builder.build()
    }
}

/// Kernel absinfo with no fuzz/flat filtering; the pipeline smooths upstream.
fn to_evdev_abs(info: AbsInfo) -> EvdevAbsInfo {
    EvdevAbsInfo::new(info.min, info.min, info.max, 0, 0, info.resolution)
}

fn to_evdev_event(class: EventClass, code: u16, value: i32) -> InputEvent {
    InputEvent::new(class.code(), code, value)
}

impl OutputSink for UinputSink {
    fn set_name(&mut self, name: &str) {
        self.name = name.to_owned();
    }

    fn set_id(&mut self, vendor: u16, product: u16) {
        self.vendor = vendor;
        self.product = product;
    }

    fn set_property(&mut self, prop: u16) {
        self.properties.insert(PropType(prop));
    }

    fn set_key(&mut self, code: u16) {
        self.keys.insert(KeyCode::new(code));
    }

    fn set_abs(&mut self, code: u16, info: AbsInfo) {
        self.axes.retain(|(c, _)| *c != code);
        self.axes.push((code, info));
    }

    fn create(&mut self) -> DeviceResult<()> {
        if self.device.is_some() {
            return Err(DeviceError::AlreadyCreated);
        }
        if self.name.is_empty() {
            return Err(DeviceError::InvalidCapability("device name is empty".into()));
        }
        validate_axes(&self.axes)?;

        let device = self.build()?;
        tracing::info!(name = %self.name, "uinput device created");
        self.device = Some(device);
        Ok(())
    }

    fn emit(&mut self, class: EventClass, code: u16, value: i32) {
        // Report boundaries are written by the kernel on sync.
        if class == EventClass::Syn {
            return;
        }
        self.batch.push(to_evdev_event(class, code, value));
    }

    fn sync(&mut self) {
        let Some(device) = self.device.as_mut() else {
            if !self.batch.is_empty() {
                self.write_errors += 1;
                tracing::warn!(
                    dropped = self.batch.len(),
                    "{}",
                    DeviceError::NotCreated
                );
            }
            self.batch.clear();
            return;
        };

        if let Err(e) = device.emit(&self.batch) {
            self.write_errors += 1;
            tracing::warn!(error = %e, "failed to write uinput report");
        }
        self.batch.clear();
    }
}
