//! The wave gauge.
//!
//! Evaluates a function of unix time each tick and emits the result as a
//! gauge tagged `func_name:<label>`. Library users may supply any function;
//! configuration offers `sin`, `cos` and `tan` of `now / divisor`.

use std::fmt;

use serde::Deserialize;

use super::Waveform;
use crate::metric::Observation;

fn default_metric() -> String {
    "dustin.ac1062.wave".to_string()
}

fn default_tick_milliseconds() -> u64 {
    1_000
}

fn default_divisor() -> f64 {
    100.0
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Named functions available from configuration.
pub enum Function {
    /// `sin(now / divisor)`
    Sin,
    /// `cos(now / divisor)`
    Cos,
    /// `tan(now / divisor)`
    Tan,
}

impl Function {
    fn name(self) -> &'static str {
        match self {
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
        }
    }

    fn apply(self, x: f64) -> f64 {
        match self {
            Self::Sin => x.sin(),
            Self::Cos => x.cos(),
            Self::Tan => x.tan(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
/// Configuration of this generator.
pub struct Config {
    /// The function to evaluate
    pub function: Function,
    /// Unix time is divided by this before the function is applied
    #[serde(default = "default_divisor")]
    pub divisor: f64,
    /// Value of the `func_name` tag, defaults to the function's name
    #[serde(default)]
    pub label: Option<String>,
    /// The metric name to emit under
    #[serde(default = "default_metric")]
    pub metric: String,
    /// Milliseconds to sleep between ticks
    #[serde(default = "default_tick_milliseconds")]
    pub tick_milliseconds: u64,
}

impl Config {
    /// A wave gauge over `function` with every other field defaulted.
    #[must_use]
    pub fn new(function: Function) -> Self {
        Self {
            function,
            divisor: default_divisor(),
            label: None,
            metric: default_metric(),
            tick_milliseconds: default_tick_milliseconds(),
        }
    }

    /// The `func_name` tag value.
    #[must_use]
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(self.function.name())
    }
}

/// The wave gauge waveform.
pub struct WaveGauge {
    metric: String,
    tag: String,
    func: Box<dyn Fn(f64) -> f64 + Send + Sync>,
}

impl fmt::Debug for WaveGauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaveGauge")
            .field("metric", &self.metric)
            .field("tag", &self.tag)
            .finish_non_exhaustive()
    }
}

impl WaveGauge {
    /// Create a new [`WaveGauge`] instance from configuration
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let function = config.function;
        let divisor = config.divisor;
        let mut gauge = Self::from_fn(config.label(), move |now| function.apply(now / divisor));
        gauge.metric.clone_from(&config.metric);
        gauge
    }

    /// Create a [`WaveGauge`] over an arbitrary function of unix time,
    /// emitting under the default metric name.
    #[must_use]
    pub fn from_fn<F>(label: &str, func: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        Self {
            metric: default_metric(),
            tag: format!("func_name:{label}"),
            func: Box::new(func),
        }
    }
}

impl Waveform for WaveGauge {
    fn sample(&mut self, now: f64) -> Option<Observation> {
        Some(Observation::gauge(&self.metric, (self.func)(now)).with_tag(&self.tag))
    }
}
