//! The spiky counter.
//!
//! Each tick draws an increment uniformly from `[0, 20]`. Increments above 5
//! are scaled by 10 and emitted as a counter; anything else is a quiet tick.
//! The scaled increments are also summed into a running total, which is kept
//! but not emitted.

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::Deserialize;

use super::Waveform;
use crate::metric::Observation;

/// The largest increment drawn in a tick.
pub const MAX_INCREMENT: u32 = 20;
/// Increments at or below this value are not emitted.
pub const QUIET_THRESHOLD: u32 = 5;
/// Emitted increments are multiplied by this.
pub const SCALE: u32 = 10;

fn default_metric() -> String {
    "dustin.ac1062.page_views.inc".to_string()
}

fn default_tick_milliseconds() -> u64 {
    1_000
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
/// Configuration of this generator.
pub struct Config {
    /// The seed for random operations. Seeded from the OS when absent.
    #[serde(default)]
    pub seed: Option<[u8; 32]>,
    /// The metric name to emit under
    #[serde(default = "default_metric")]
    pub metric: String,
    /// Milliseconds to sleep between ticks
    #[serde(default = "default_tick_milliseconds")]
    pub tick_milliseconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed: None,
            metric: default_metric(),
            tick_milliseconds: default_tick_milliseconds(),
        }
    }
}

#[derive(Debug)]
/// The spiky counter waveform.
pub struct SpikyCounter {
    metric: String,
    rng: StdRng,
    total: u64,
}

impl SpikyCounter {
    /// Create a new [`SpikyCounter`] instance
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::from_seed(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            metric: config.metric.clone(),
            rng,
            total: 0,
        }
    }

    /// Apply one drawn `increment`, returning the observation to emit if the
    /// increment clears the quiet threshold.
    pub fn step(&mut self, increment: u32) -> Option<Observation> {
        if increment <= QUIET_THRESHOLD {
            return None;
        }
        let scaled = increment * SCALE;
        self.total += u64::from(scaled);
        Some(Observation::counter(&self.metric, i64::from(scaled)))
    }

    /// The sum of every emitted increment so far.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }
}

impl Waveform for SpikyCounter {
    fn sample(&mut self, _now: f64) -> Option<Observation> {
        let increment = self.rng.random_range(0..=MAX_INCREMENT);
        self.step(increment)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{Config, MAX_INCREMENT, SpikyCounter};
    use crate::{
        generator::Waveform,
        metric::{Kind, Value},
    };

    fn counter() -> SpikyCounter {
        SpikyCounter::new(&Config {
            seed: Some([7; 32]),
            ..Config::default()
        })
    }

    // Emission happens if and only if the increment exceeds 5, and the
    // emitted value is ten times the increment.
    proptest! {
        #[test]
        fn emits_scaled_increment_above_threshold(increment in 0..=MAX_INCREMENT) {
            let mut spiky = counter();
            match spiky.step(increment) {
                Some(obs) => {
                    prop_assert!(increment > 5);
                    prop_assert_eq!(obs.value, Value::Int(i64::from(increment) * 10));
                    prop_assert_eq!(obs.kind, Kind::Counter);
                    prop_assert!(obs.tags.is_empty());
                    prop_assert_eq!(obs.name, "dustin.ac1062.page_views.inc");
                }
                None => prop_assert!(increment <= 5),
            }
        }
    }

    // The running total is the sum of emitted values.
    proptest! {
        #[test]
        fn total_tracks_emitted(increments in proptest::collection::vec(0..=MAX_INCREMENT, 0..100)) {
            let mut spiky = counter();
            let mut emitted = 0;
            for inc in increments {
                if let Some(obs) = spiky.step(inc) {
                    let Value::Int(v) = obs.value else { panic!("spiky counter emits integers") };
                    emitted += v;
                }
            }
            prop_assert_eq!(spiky.total(), u64::try_from(emitted).unwrap());
        }
    }

    #[test]
    fn sampled_values_stay_in_range() {
        let mut spiky = counter();
        for _ in 0..1_000 {
            if let Some(obs) = spiky.sample(0.0) {
                let Value::Int(v) = obs.value else {
                    panic!("spiky counter emits integers")
                };
                assert!((60..=200).contains(&v));
                assert_eq!(v % 10, 0);
            }
        }
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = counter();
        let mut b = counter();
        for _ in 0..100 {
            assert_eq!(a.sample(0.0), b.sample(0.0));
        }
    }
}
