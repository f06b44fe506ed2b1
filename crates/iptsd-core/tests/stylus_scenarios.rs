//! Scenario tests for the stylus motion shaper.
//!
//! A scripted predictor stands in for the Kalman filter so every report can
//! be checked exactly.

use std::time::Duration;

use iptsd_core::event::{EventClass, InputEvent, abs, key};
use iptsd_core::{Config, Predictor, RecordingSink, StylusSample, StylusShaper, Vec2};

/// Predictor that shifts the last update by a fixed offset once it has
/// seen `warmup` samples.
#[derive(Debug, Default)]
struct ScriptedPredictor {
    warmup: usize,
    offset: Vec2,
    seen: usize,
    resets: usize,
    updates: usize,
    last: (Vec2, f64),
}

impl Predictor for ScriptedPredictor {
    fn reset(&mut self) {
        self.resets += 1;
        self.seen = 0;
    }

    fn update(&mut self, position: Vec2, pressure: f64) {
        self.seen += 1;
        self.updates += 1;
        self.last = (position, pressure);
    }

    fn predict(&mut self, _horizon: Duration) -> bool {
        self.seen >= self.warmup
    }

    fn position(&self) -> Vec2 {
        self.last.0 + self.offset
    }

    fn pressure(&self) -> f64 {
        self.last.1
    }
}

fn config(prediction_ms: u64) -> Config {
    let mut config = Config::default();
    config.stylus.prediction_target_ms = prediction_ms;
    config
}

fn shaper(
    predictor: ScriptedPredictor,
    prediction_ms: u64,
) -> StylusShaper<ScriptedPredictor, RecordingSink> {
    StylusShaper::new(RecordingSink::new(), predictor, &config(prediction_ms))
        .expect("recording sink creates")
}

fn value(report: &[InputEvent], class: EventClass, code: u16) -> Option<i32> {
    report
        .iter()
        .find(|e| e.class == class && e.code == code)
        .map(|e| e.value)
}

fn is_lift(report: &[InputEvent]) -> bool {
    report.len() == 4
        && [
            key::BTN_TOUCH,
            key::BTN_TOOL_PEN,
            key::BTN_TOOL_RUBBER,
            key::BTN_STYLUS,
        ]
        .iter()
        .all(|code| value(report, EventClass::Key, *code) == Some(0))
}

fn hover(x: f64, y: f64) -> StylusSample {
    StylusSample {
        x,
        y,
        proximity: true,
        ..Default::default()
    }
}

fn touch(x: f64, y: f64, pressure: f64) -> StylusSample {
    StylusSample {
        x,
        y,
        pressure,
        proximity: true,
        contact: true,
        ..Default::default()
    }
}

#[test]
fn hover_touch_move_leave_round_trip() {
    let mut s = shaper(
        ScriptedPredictor {
            warmup: 1,
            ..Default::default()
        },
        10,
    );

    s.update(&hover(0.1, 0.1));
    assert_eq!(s.predictor().resets, 0);

    s.update(&touch(0.2, 0.2, 0.5));
    assert_eq!(s.predictor().resets, 1, "tip-down resets the predictor");

    s.update(&touch(0.3, 0.2, 0.6));
    assert_eq!(s.predictor().resets, 1);

    s.update(&StylusSample::default());

    let reports = s.sink().reports();
    assert_eq!(reports.len(), 4);

    // Hovering: in range but not touching.
    let r = &reports[0];
    assert_eq!(value(r, EventClass::Key, key::BTN_TOUCH), Some(0));
    assert_eq!(value(r, EventClass::Key, key::BTN_TOOL_PEN), Some(1));
    assert_eq!(value(r, EventClass::Abs, abs::X), Some(960));

    // Touching and moving.
    for (r, x) in [(&reports[1], 1920), (&reports[2], 2880)] {
        assert_eq!(value(r, EventClass::Key, key::BTN_TOUCH), Some(1));
        assert_eq!(value(r, EventClass::Key, key::BTN_TOOL_PEN), Some(1));
        assert_eq!(value(r, EventClass::Key, key::BTN_TOOL_RUBBER), Some(0));
        assert_eq!(value(r, EventClass::Abs, abs::X), Some(x));
        assert_eq!(value(r, EventClass::Abs, abs::Y), Some(1440));
    }
    assert_eq!(value(&reports[2], EventClass::Abs, abs::PRESSURE), Some(2458));

    // Out of range.
    assert!(is_lift(&reports[3]));
    assert!(!s.active());
}

#[test]
fn tool_flip_lifts_for_one_frame() {
    let mut s = shaper(ScriptedPredictor::default(), 0);

    s.update(&touch(0.5, 0.5, 0.5));
    let eraser = StylusSample {
        rubber: true,
        ..touch(0.5, 0.5, 0.5)
    };
    s.update(&eraser);
    assert!(!s.active(), "flip frame is inactive");
    s.update(&eraser);
    assert!(s.active());

    let reports = s.sink().reports();
    assert_eq!(reports.len(), 3);
    assert!(is_lift(&reports[1]));
    assert_eq!(value(&reports[2], EventClass::Key, key::BTN_TOOL_RUBBER), Some(1));
    assert_eq!(value(&reports[2], EventClass::Key, key::BTN_TOOL_PEN), Some(0));
}

#[test]
fn flip_back_to_pen_also_lifts() {
    let mut s = shaper(ScriptedPredictor::default(), 0);
    let eraser = StylusSample {
        rubber: true,
        ..hover(0.5, 0.5)
    };

    // Initial state is pen, so the first eraser sample flips.
    s.update(&eraser);
    s.update(&eraser);
    s.update(&hover(0.5, 0.5));
    s.update(&hover(0.5, 0.5));

    let reports = s.sink().reports();
    assert!(is_lift(&reports[0]));
    assert!(!is_lift(&reports[1]));
    assert!(is_lift(&reports[2]));
    assert!(!is_lift(&reports[3]));
}

#[test]
fn prediction_replaces_position_when_available() {
    let mut s = shaper(
        ScriptedPredictor {
            warmup: 2,
            offset: Vec2::new(0.1, 0.0),
            ..Default::default()
        },
        8,
    );

    s.update(&touch(0.5, 0.5, 0.5));
    s.update(&touch(0.5, 0.5, 0.5));

    let reports = s.sink().reports();
    // First sample: predictor not warmed up, raw position.
    assert_eq!(value(&reports[0], EventClass::Abs, abs::X), Some(4800));
    // Second: predicted 0.6.
    assert_eq!(value(&reports[1], EventClass::Abs, abs::X), Some(5760));
}

#[test]
fn no_prediction_while_hovering_or_disabled() {
    let mut s = shaper(
        ScriptedPredictor {
            offset: Vec2::new(0.1, 0.1),
            ..Default::default()
        },
        8,
    );
    s.update(&hover(0.5, 0.5));
    assert_eq!(s.predictor().updates, 0);

    let mut s = shaper(
        ScriptedPredictor {
            offset: Vec2::new(0.1, 0.1),
            ..Default::default()
        },
        0,
    );
    s.update(&touch(0.5, 0.5, 0.5));
    assert_eq!(s.predictor().updates, 0);
    let report = s.sink().last_report().expect("report");
    assert_eq!(value(report, EventClass::Abs, abs::X), Some(4800));
}

#[test]
fn every_update_commits_one_report() {
    let mut s = shaper(ScriptedPredictor::default(), 0);
    let samples = [
        hover(0.1, 0.1),
        touch(0.1, 0.1, 0.2),
        StylusSample {
            rubber: true,
            ..touch(0.1, 0.1, 0.2)
        },
        StylusSample::default(),
    ];
    for (i, sample) in samples.iter().enumerate() {
        s.update(sample);
        assert_eq!(s.sink().reports().len(), i + 1);
        assert!(s.sink().pending().is_empty());
    }
    assert_eq!(s.last(), &samples[3]);
}

#[test]
fn tilt_is_forwarded() {
    let mut s = shaper(ScriptedPredictor::default(), 0);
    s.update(&StylusSample {
        altitude: std::f64::consts::FRAC_PI_4,
        azimuth: 0.0,
        ..hover(0.5, 0.5)
    });

    let report = s.sink().last_report().expect("report");
    assert_eq!(value(report, EventClass::Abs, abs::TILT_X), Some(4500));
    assert_eq!(value(report, EventClass::Abs, abs::TILT_Y), Some(0));
}

#[test]
fn disable_then_enable_resumes_on_next_update() {
    let mut s = shaper(ScriptedPredictor::default(), 0);
    s.update(&touch(0.5, 0.5, 0.5));
    s.disable();
    s.enable();
    assert_eq!(s.sink().reports().len(), 2);
    assert!(is_lift(&s.sink().reports()[1]));

    s.update(&touch(0.5, 0.5, 0.5));
    assert!(s.active());
    assert_eq!(s.sink().reports().len(), 3);
}
