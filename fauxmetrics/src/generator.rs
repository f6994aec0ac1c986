//! fauxmetrics generators
//!
//! A generator is a control loop wrapped around a [`Waveform`]. Each tick the
//! loop asks the waveform for an observation, hands anything it gets to the
//! shared [`Emitter`] and then sleeps for a fixed interval. The loop has no
//! exit condition of its own. It ends when the shutdown signal fires during a
//! sleep or when an emission fails, in which case the error is returned to
//! the supervisor and the generator is gone for good.
//!
//! ## Metrics
//!
//! `observations_emitted`: Observations sent successfully
//! `bytes_written`: Bytes written successfully
//! `emission_failure`: Number of failed emissions; each is fatal to the generator
//!

use std::{
    fmt,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use fauxmetrics_signal::Watcher;
use metrics::counter;
use serde::Deserialize;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::{emitter::Emitter, metric::Observation};

pub mod smooth_counter;
pub mod spiky_counter;
pub mod wave_gauge;

#[derive(thiserror::Error, Debug)]
/// Errors produced by [`Server`].
pub enum Error {
    /// See [`crate::emitter::Error`] for details.
    #[error(transparent)]
    Emit(#[from] crate::emitter::Error),
}

/// A source of observations, sampled once per tick.
pub trait Waveform: fmt::Debug + Send {
    /// Produce this tick's observation, if there is one. `now` is the current
    /// unix time in seconds.
    fn sample(&mut self, now: f64) -> Option<Observation>;
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
/// Configuration for [`Server`]
pub struct Config {
    /// Common generator configs
    #[serde(flatten)]
    pub general: General,
    /// The generator config
    #[serde(flatten)]
    pub inner: Inner,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
/// Configurations common to all [`Server`] variants
pub struct General {
    /// The ID assigned to this generator
    pub id: Option<String>,
    /// Whether this generator is started. Disabled generators are parsed and
    /// validated but never run.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for General {
    fn default() -> Self {
        Self {
            id: None,
            enabled: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
/// Configuration for [`Server`]
pub enum Inner {
    /// See [`crate::generator::spiky_counter::Config`] for details.
    SpikyCounter(spiky_counter::Config),
    /// See [`crate::generator::smooth_counter::Config`] for details.
    SmoothCounter(smooth_counter::Config),
    /// See [`crate::generator::wave_gauge::Config`] for details.
    WaveGauge(wave_gauge::Config),
}

impl Inner {
    fn component_name(&self) -> &'static str {
        match self {
            Self::SpikyCounter(_) => "spiky_counter",
            Self::SmoothCounter(_) => "smooth_counter",
            Self::WaveGauge(_) => "wave_gauge",
        }
    }
}

/// The unix time in fractional seconds.
#[must_use]
pub fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |d| d.as_secs_f64())
}

#[derive(Debug)]
/// The control loop around a [`Waveform`].
pub struct Generator<W> {
    waveform: W,
    tick: Duration,
    emitter: Emitter,
    shutdown: Watcher,
    metric_labels: Vec<(String, String)>,
}

impl<W> Generator<W>
where
    W: Waveform,
{
    /// Create a new [`Generator`]
    #[must_use]
    pub fn new(
        waveform: W,
        tick: Duration,
        emitter: Emitter,
        shutdown: Watcher,
        metric_labels: Vec<(String, String)>,
    ) -> Self {
        Self {
            waveform,
            tick,
            emitter,
            shutdown,
            metric_labels,
        }
    }

    /// Run [`Generator`] until a shutdown signal is received.
    ///
    /// The shutdown signal is only observed while sleeping between ticks.
    ///
    /// # Errors
    ///
    /// Function will return an error the first time an emission fails.
    pub async fn spin(self) -> Result<(), Error> {
        let Self {
            mut waveform,
            tick,
            emitter,
            shutdown,
            metric_labels,
        } = self;
        debug!("{waveform:?} generator running");

        let shutdown_wait = shutdown.recv();
        tokio::pin!(shutdown_wait);
        loop {
            if let Some(observation) = waveform.sample(unix_now()) {
                match emitter.emit(&observation).await {
                    Ok(bytes) => {
                        counter!("observations_emitted", &metric_labels).increment(1);
                        counter!("bytes_written", &metric_labels).increment(bytes as u64);
                    }
                    Err(err) => {
                        let mut error_labels = metric_labels.clone();
                        error_labels.push(("error".to_string(), err.to_string()));
                        counter!("emission_failure", &error_labels).increment(1);
                        return Err(err.into());
                    }
                }
            }

            tokio::select! {
                () = sleep(tick) => {},
                () = &mut shutdown_wait => {
                    info!("shutdown signal received");
                    return Ok(());
                }
            }
        }
    }
}

#[derive(Debug)]
/// The generator server.
///
/// All generators supported by fauxmetrics are a variant of this enum. Please
/// see variant documentation for details.
pub enum Server {
    /// See [`crate::generator::spiky_counter::SpikyCounter`] for details.
    SpikyCounter(Generator<spiky_counter::SpikyCounter>),
    /// See [`crate::generator::smooth_counter::SmoothCounter`] for details.
    SmoothCounter(Generator<smooth_counter::SmoothCounter>),
    /// See [`crate::generator::wave_gauge::WaveGauge`] for details.
    WaveGauge(Generator<wave_gauge::WaveGauge>),
}

impl Server {
    /// Create a new [`Server`]
    ///
    /// This function creates a new [`Server`] instance, deferring to the
    /// underlying waveform for its state.
    #[must_use]
    pub fn new(config: Config, emitter: Emitter, shutdown: Watcher) -> Self {
        let mut labels = vec![
            ("component".to_string(), "generator".to_string()),
            (
                "component_name".to_string(),
                config.inner.component_name().to_string(),
            ),
        ];
        if let Some(id) = config.general.id {
            labels.push(("id".to_string(), id));
        }

        match config.inner {
            Inner::SpikyCounter(conf) => Self::SpikyCounter(Generator::new(
                spiky_counter::SpikyCounter::new(&conf),
                Duration::from_millis(conf.tick_milliseconds),
                emitter,
                shutdown,
                labels,
            )),
            Inner::SmoothCounter(conf) => Self::SmoothCounter(Generator::new(
                smooth_counter::SmoothCounter::new(&conf),
                Duration::from_millis(conf.tick_milliseconds),
                emitter,
                shutdown,
                labels,
            )),
            Inner::WaveGauge(conf) => Self::WaveGauge(Generator::new(
                wave_gauge::WaveGauge::new(&conf),
                Duration::from_millis(conf.tick_milliseconds),
                emitter,
                shutdown,
                labels,
            )),
        }
    }

    /// Run this [`Server`] to completion
    ///
    /// # Errors
    ///
    /// Function will return an error if the underlying generator signals
    /// error.
    pub async fn run(self) -> Result<(), Error> {
        match self {
            Server::SpikyCounter(inner) => inner.spin().await,
            Server::SmoothCounter(inner) => inner.spin().await,
            Server::WaveGauge(inner) => inner.spin().await,
        }
    }
}

/// A human-readable name for the generator `config` describes, used to
/// identify it in logs.
#[must_use]
pub fn label(config: &Config) -> String {
    match config.general.id {
        Some(ref id) => id.clone(),
        None => match config.inner {
            Inner::SpikyCounter(ref conf) => conf.metric.clone(),
            Inner::SmoothCounter(ref conf) => format!("{}[{}]", conf.metric, conf.name),
            Inner::WaveGauge(ref conf) => format!("{}[{}]", conf.metric, conf.label()),
        },
    }
}
