//! The smooth counter.
//!
//! Emits `sin(t) + t` where `t = now * π / period`, tagged
//! `counter_name:<name>`. The `t` term grows without bound, so the emitted
//! "counter" is the phase itself rather than a delta. Collectors that sum
//! counters will see runaway totals; that is the established behaviour and
//! is kept.

use std::f64::consts::PI;

use serde::Deserialize;

use super::Waveform;
use crate::metric::Observation;

fn default_metric() -> String {
    "dustin.ac1062.smooth_count".to_string()
}

fn default_tick_milliseconds() -> u64 {
    3_000
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
/// Configuration of this generator.
pub struct Config {
    /// Value of the `counter_name` tag
    pub name: String,
    /// Seconds per π radians of phase
    pub period_seconds: f64,
    /// The metric name to emit under
    #[serde(default = "default_metric")]
    pub metric: String,
    /// Milliseconds to sleep between ticks
    #[serde(default = "default_tick_milliseconds")]
    pub tick_milliseconds: u64,
}

impl Config {
    /// A smooth counter named `name` with the given period and every other
    /// field defaulted.
    #[must_use]
    pub fn new(name: impl Into<String>, period_seconds: f64) -> Self {
        Self {
            name: name.into(),
            period_seconds,
            metric: default_metric(),
            tick_milliseconds: default_tick_milliseconds(),
        }
    }
}

#[derive(Debug)]
/// The smooth counter waveform.
pub struct SmoothCounter {
    metric: String,
    tag: String,
    period: f64,
}

impl SmoothCounter {
    /// Create a new [`SmoothCounter`] instance
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            metric: config.metric.clone(),
            tag: format!("counter_name:{}", config.name),
            period: config.period_seconds,
        }
    }

    /// The value emitted at unix time `now`.
    #[must_use]
    pub fn value_at(&self, now: f64) -> f64 {
        let t = now * PI / self.period;
        t.sin() + t
    }
}

impl Waveform for SmoothCounter {
    fn sample(&mut self, now: f64) -> Option<Observation> {
        Some(Observation::counter(&self.metric, self.value_at(now)).with_tag(&self.tag))
    }
}
