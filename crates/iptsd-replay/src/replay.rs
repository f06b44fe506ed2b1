#![forbid(unsafe_code)]

//! Drives recorded events through the stabilizer and the stylus shaper.

use std::fmt::Write as _;

use iptsd_core::event::InputEvent;
use iptsd_core::{
    Config, Contact, DeviceError, Frame, KalmanPredictor, OutputSink, Stabilizer, StylusShaper,
};

use crate::trace::TraceEvent;

/// What one trace event produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// A stylus sample was processed (or skipped while disabled).
    Stylus { processed: bool },
    /// A contact frame after stabilization.
    Frame(Frame),
    Reset,
}

/// Pipeline state for one replay run.
#[derive(Debug)]
pub struct Replay<S> {
    stabilizer: Stabilizer,
    stylus: StylusShaper<KalmanPredictor, S>,
    frames: u64,
    samples: u64,
}

impl<S: OutputSink> Replay<S> {
    /// Build the pipeline. The stylus device is created on `sink` here.
    pub fn new(sink: S, config: &Config) -> Result<Self, DeviceError> {
        let mut stylus = StylusShaper::new(sink, KalmanPredictor::default(), config)?;
        if config.stylus.disable {
            stylus.disable();
        }

        Ok(Self {
            stabilizer: Stabilizer::new(config.contacts.clone()),
            stylus,
            frames: 0,
            samples: 0,
        })
    }

    pub fn step(&mut self, event: TraceEvent) -> Step {
        match event {
            TraceEvent::Stylus(sample) => {
                // A disabled channel ignores input entirely.
                if !self.stylus.enabled() {
                    return Step::Stylus { processed: false };
                }
                self.samples += 1;
                self.stylus.update(&sample);
                Step::Stylus { processed: true }
            }
            TraceEvent::Contacts(mut frame) => {
                self.frames += 1;
                self.stabilizer.stabilize(&mut frame);
                Step::Frame(frame)
            }
            TraceEvent::Reset(true) => {
                self.stabilizer.reset();
                tracing::debug!("stabilizer reset");
                Step::Reset
            }
            TraceEvent::Reset(false) => Step::Reset,
        }
    }

    #[must_use]
    pub fn stylus(&self) -> &StylusShaper<KalmanPredictor, S> {
        &self.stylus
    }

    pub fn sink_mut(&mut self) -> &mut S {
        self.stylus.sink_mut()
    }

    #[must_use]
    pub fn stabilizer(&self) -> &Stabilizer {
        &self.stabilizer
    }

    /// Contact frames processed.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Stylus samples processed.
    #[must_use]
    pub fn samples(&self) -> u64 {
        self.samples
    }
}

/// `report 3: KEY 0x14a=1 KEY 0x140=1 ... ABS 0x1b=-4500`
#[must_use]
pub fn format_report(number: usize, events: &[InputEvent]) -> String {
    let mut line = format!("report {number}:");
    for ev in events {
        let _ = write!(line, " {ev}");
    }
    line
}

/// `frame 2: #0 (0.5000, 0.5000) 0.0100x0.0100, ? (0.1000, 0.1000) ...`
#[must_use]
pub fn format_frame(number: u64, frame: &[Contact]) -> String {
    if frame.is_empty() {
        return format!("frame {number}: (none)");
    }

    let contacts: Vec<String> = frame
        .iter()
        .map(|c| {
            let index = c
                .index
                .map_or_else(|| "?".to_owned(), |i| format!("#{i}"));
            format!(
                "{index} ({:.4}, {:.4}) {:.4}x{:.4}",
                c.mean.x, c.mean.y, c.size.x, c.size.y
            )
        })
        .collect();
    format!("frame {number}: {}", contacts.join(", "))
}
