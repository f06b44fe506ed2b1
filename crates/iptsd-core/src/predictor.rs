#![forbid(unsafe_code)]

//! Look-ahead prediction for stylus motion.
//!
//! The [`Predictor`] trait is the seam consumed by
//! [`StylusShaper`](crate::stylus::StylusShaper). [`KalmanPredictor`] is the
//! default implementation: an independent constant-velocity Kalman filter per
//! channel (x, y, pressure), driven by the measured interval between updates.
//!
//! # Failure Modes
//!
//! - Fewer than `min_updates` samples since reset: `predict` fails and the
//!   caller falls back to the raw sample.
//! - Horizon beyond `max_horizon`: `predict` fails; extrapolating that far
//!   overshoots more than it helps.

use std::time::{Duration, Instant};

use crate::geometry::Vec2;

/// Stateful look-ahead estimator.
pub trait Predictor {
    /// Forget all history.
    fn reset(&mut self);

    /// Feed the latest measured position and pressure.
    fn update(&mut self, position: Vec2, pressure: f64);

    /// Extrapolate `horizon` into the future. Returns `false` when no
    /// estimate is available; the accessors are only valid after `true`.
    fn predict(&mut self, horizon: Duration) -> bool;

    /// Predicted position.
    fn position(&self) -> Vec2;

    /// Predicted pressure.
    fn pressure(&self) -> f64;
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tuning for [`KalmanPredictor`].
#[derive(Debug, Clone, PartialEq)]
pub struct PredictorConfig {
    /// White-noise acceleration variance, in (units/s²)².
    /// Default: 10.0
    pub process_noise: f64,

    /// Measurement variance, in units².
    /// Default: 1e-6
    pub measurement_noise: f64,

    /// Samples required after a reset before predictions are produced.
    /// Default: 3
    pub min_updates: usize,

    /// Longest horizon that will be extrapolated.
    /// Default: 50ms
    pub max_horizon: Duration,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            process_noise: 10.0,
            measurement_noise: 1e-6,
            min_updates: 3,
            max_horizon: Duration::from_millis(50),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-channel filter
// ---------------------------------------------------------------------------

/// Constant-velocity Kalman filter over one scalar channel.
#[derive(Debug, Clone, Copy, Default)]
struct AxisFilter {
    value: f64,
    velocity: f64,
    /// Covariance `[[p00, p01], [p10, p11]]`.
    cov: [[f64; 2]; 2],
}

impl AxisFilter {
    /// Initial velocity variance; large so the second sample dominates.
    const INITIAL_VELOCITY_VARIANCE: f64 = 1e3;

    fn start(value: f64, measurement_noise: f64) -> Self {
        Self {
            value,
            velocity: 0.0,
            cov: [
                [measurement_noise, 0.0],
                [0.0, Self::INITIAL_VELOCITY_VARIANCE],
            ],
        }
    }

    /// Time update: `x = F x`, `P = F P Fᵀ + Q`.
    fn advance(&mut self, dt: f64, process_noise: f64) {
        if dt <= 0.0 {
            return;
        }

        self.value += self.velocity * dt;

        let [[p00, p01], [p10, p11]] = self.cov;
        let dt2 = dt * dt;
        let q00 = process_noise * dt2 * dt2 / 4.0;
        let q01 = process_noise * dt2 * dt / 2.0;
        let q11 = process_noise * dt2;

        self.cov = [
            [
                p00 + dt * (p10 + p01) + dt2 * p11 + q00,
                p01 + dt * p11 + q01,
            ],
            [p10 + dt * p11 + q01, p11 + q11],
        ];
    }

    /// Measurement update with observation `H = [1, 0]`.
    fn correct(&mut self, measured: f64, measurement_noise: f64) {
        let [[p00, p01], [p10, p11]] = self.cov;

        let s = p00 + measurement_noise;
        if s <= 0.0 {
            return;
        }

        let k0 = p00 / s;
        let k1 = p10 / s;
        let innovation = measured - self.value;

        self.value += k0 * innovation;
        self.velocity += k1 * innovation;

        self.cov = [
            [(1.0 - k0) * p00, (1.0 - k0) * p01],
            [p10 - k1 * p00, p11 - k1 * p01],
        ];
    }

    fn extrapolate(&self, horizon: f64) -> f64 {
        self.value + self.velocity * horizon
    }
}

// ---------------------------------------------------------------------------
// KalmanPredictor
// ---------------------------------------------------------------------------

/// Default [`Predictor`]: constant-velocity Kalman filters on x, y and pressure.
#[derive(Debug, Clone)]
pub struct KalmanPredictor {
    config: PredictorConfig,
    x: AxisFilter,
    y: AxisFilter,
    p: AxisFilter,
    last_update: Option<Instant>,
    updates: usize,
    predicted_position: Vec2,
    predicted_pressure: f64,
}

impl Default for KalmanPredictor {
    fn default() -> Self {
        Self::new(PredictorConfig::default())
    }
}

impl KalmanPredictor {
    #[must_use]
    pub fn new(config: PredictorConfig) -> Self {
        Self {
            config,
            x: AxisFilter::default(),
            y: AxisFilter::default(),
            p: AxisFilter::default(),
            last_update: None,
            updates: 0,
            predicted_position: Vec2::ZERO,
            predicted_pressure: 0.0,
        }
    }

    /// Feed a measurement taken at `now`.
    pub fn update_at(&mut self, now: Instant, position: Vec2, pressure: f64) {
        let r = self.config.measurement_noise;
        let q = self.config.process_noise;

        match self.last_update {
            None => {
                self.x = AxisFilter::start(position.x, r);
                self.y = AxisFilter::start(position.y, r);
                self.p = AxisFilter::start(pressure, r);
            }
            Some(last) => {
                let dt = now.saturating_duration_since(last).as_secs_f64();
                for (filter, measured) in [
                    (&mut self.x, position.x),
                    (&mut self.y, position.y),
                    (&mut self.p, pressure),
                ] {
                    filter.advance(dt, q);
                    filter.correct(measured, r);
                }
            }
        }

        self.last_update = Some(now);
        self.updates = self.updates.saturating_add(1);
    }

    /// Samples seen since the last reset.
    #[inline]
    #[must_use]
    pub fn update_count(&self) -> usize {
        self.updates
    }

    /// Current filtered velocity in units per second.
    #[must_use]
    pub fn velocity(&self) -> Vec2 {
        Vec2::new(self.x.velocity, self.y.velocity)
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }
}

impl Predictor for KalmanPredictor {
    fn reset(&mut self) {
        self.x = AxisFilter::default();
        self.y = AxisFilter::default();
        self.p = AxisFilter::default();
        self.last_update = None;
        self.updates = 0;
        self.predicted_position = Vec2::ZERO;
        self.predicted_pressure = 0.0;
    }

    fn update(&mut self, position: Vec2, pressure: f64) {
        self.update_at(Instant::now(), position, pressure);
    }

    fn predict(&mut self, horizon: Duration) -> bool {
        if self.updates < self.config.min_updates.max(1) {
            return false;
        }
        if horizon > self.config.max_horizon {
            return false;
        }

        let h = horizon.as_secs_f64();
        self.predicted_position =
            Vec2::new(self.x.extrapolate(h), self.y.extrapolate(h)).clamp(0.0, 1.0);
        self.predicted_pressure = self.p.extrapolate(h).clamp(0.0, 1.0);
        true
    }

    fn position(&self) -> Vec2 {
        self.predicted_position
    }

    fn pressure(&self) -> f64 {
        self.predicted_pressure
    }
}
