//! This module controls configuration parsing from the end user, providing a
//! convenience mechanism for the rest of the program. Crashes are most likely
//! to originate from this code, intentionally.
//!
//! Every field has a default. The default configuration selects the spiky
//! counter alone and points it at a collector on `127.0.0.1:8125`; the smooth
//! counters and wave gauges are present but disabled.

use std::{
    fs,
    io,
    net::{Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
};

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;

use crate::generator::{
    self, General, Inner, smooth_counter, spiky_counter,
    wave_gauge::{self, Function},
};

/// Errors produced by [`Config`]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Error for a serde [`serde_yaml`].
    #[error("Failed to deserialize yaml: {0}")]
    SerdeYaml(#[from] serde_yaml::Error),
    /// Error for duplicate IDs in generators
    #[error("Duplicate generator ID found: {0}")]
    DuplicateGeneratorId(String),
    /// Error reading config file
    #[error("Failed to read config file {path:?}: {source}")]
    ReadFile {
        /// File path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: Box<io::Error>,
    },
}

/// The default collector address, `127.0.0.1:8125`.
#[must_use]
pub fn default_destination() -> SocketAddr {
    (Ipv4Addr::LOCALHOST, 8125).into()
}

fn disabled(inner: Inner) -> generator::Config {
    generator::Config {
        general: General {
            id: None,
            enabled: false,
        },
        inner,
    }
}

/// The reference generator selection: every generator is listed, only the
/// spiky counter is enabled.
#[must_use]
pub fn default_generators() -> Vec<generator::Config> {
    vec![
        disabled(Inner::WaveGauge(wave_gauge::Config::new(Function::Sin))),
        disabled(Inner::WaveGauge(wave_gauge::Config::new(Function::Cos))),
        disabled(Inner::WaveGauge(wave_gauge::Config::new(Function::Tan))),
        generator::Config {
            general: General::default(),
            inner: Inner::SpikyCounter(spiky_counter::Config::default()),
        },
        disabled(Inner::SmoothCounter(smooth_counter::Config::new("min", 60.0))),
        disabled(Inner::SmoothCounter(smooth_counter::Config::new("2min", 120.0))),
        disabled(Inner::SmoothCounter(smooth_counter::Config::new("5min", 300.0))),
    ]
}

/// Main configuration struct for this program
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Where every datagram is sent
    #[serde(default = "default_destination")]
    pub destination: SocketAddr,
    /// The method by which to express self-telemetry, if any
    #[serde(default)]
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub telemetry: Option<Telemetry>,
    /// The generators, enabled or not
    #[serde(default = "default_generators")]
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    pub generator: Vec<generator::Config>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            destination: default_destination(),
            telemetry: None,
            generator: default_generators(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
/// Defines the manner of fauxmetrics' own telemetry.
pub enum Telemetry {
    /// In prometheus mode fauxmetrics will emit its internal telemetry for
    /// scraping at a prometheus poll endpoint.
    Prometheus {
        /// Address and port for prometheus exporter
        addr: SocketAddr,
        /// Additional labels to include in every metric
        #[serde(default)]
        global_labels: FxHashMap<String, String>,
    },
}

impl Config {
    /// Parse and validate a YAML configuration.
    ///
    /// # Errors
    ///
    /// Function will error if the YAML is malformed or if two generators share
    /// an id.
    pub fn from_yaml(contents: &str) -> Result<Self, Error> {
        let config: Self = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Function will error if the file cannot be read or fails
    /// [`Config::from_yaml`].
    pub fn load(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path).map_err(|source| Error::ReadFile {
            path: path.to_path_buf(),
            source: Box::new(source),
        })?;
        Self::from_yaml(&contents)
    }

    /// Check invariants serde cannot express.
    ///
    /// # Errors
    ///
    /// Function will error if two generators share an id.
    pub fn validate(&self) -> Result<(), Error> {
        let mut seen_ids = FxHashSet::default();
        for generator_config in &self.generator {
            if let Some(ref id) = generator_config.general.id
                && !seen_ids.insert(id.clone())
            {
                return Err(Error::DuplicateGeneratorId(id.clone()));
            }
        }
        Ok(())
    }

    /// The generators that will actually run.
    pub fn enabled_generators(&self) -> impl Iterator<Item = &generator::Config> {
        self.generator.iter().filter(|g| g.general.enabled)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{Config, Error, Telemetry};
    use crate::generator::{Inner, smooth_counter, spiky_counter, wave_gauge::Function};

    #[test]
    fn default_selects_spiky_counter_only() {
        let config = Config::default();

        assert_eq!(config.destination.to_string(), "127.0.0.1:8125");
        assert_eq!(config.generator.len(), 7);
        let enabled: Vec<_> = config.enabled_generators().collect();
        assert_eq!(enabled.len(), 1);
        assert!(matches!(enabled[0].inner, Inner::SpikyCounter(_)));
    }

    #[test]
    fn empty_yaml_is_default() -> Result<(), Error> {
        let config = Config::from_yaml("{}")?;
        assert_eq!(config, Config::default());
        Ok(())
    }

    #[test]
    fn config_deserializes() -> Result<(), Error> {
        let contents = r#"
destination: "127.0.0.1:9125"
telemetry:
  prometheus:
    addr: "0.0.0.0:9000"
generator:
  - id: "page_views"
    spiky_counter:
      seed: [0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0]
  - enabled: false
    smooth_counter:
      name: "min"
      period_seconds: 60.0
  - wave_gauge:
      function: tan
      divisor: 50.0
      tick_milliseconds: 250
"#;
        let config = Config::from_yaml(contents)?;

        assert_eq!(config.destination.to_string(), "127.0.0.1:9125");
        assert!(matches!(
            config.telemetry,
            Some(Telemetry::Prometheus { ref global_labels, .. }) if global_labels.is_empty()
        ));
        assert_eq!(config.generator.len(), 3);

        let spiky = &config.generator[0];
        assert_eq!(spiky.general.id.as_deref(), Some("page_views"));
        assert!(spiky.general.enabled);
        assert_eq!(
            spiky.inner,
            Inner::SpikyCounter(spiky_counter::Config {
                seed: Some([0; 32]),
                ..spiky_counter::Config::default()
            })
        );

        let smooth = &config.generator[1];
        assert!(!smooth.general.enabled);
        assert_eq!(
            smooth.inner,
            Inner::SmoothCounter(smooth_counter::Config::new("min", 60.0))
        );

        let Inner::WaveGauge(ref wave) = config.generator[2].inner else {
            panic!("expected a wave gauge");
        };
        assert_eq!(wave.function, Function::Tan);
        assert!((wave.divisor - 50.0).abs() < f64::EPSILON);
        assert_eq!(wave.tick_milliseconds, 250);
        assert_eq!(wave.label(), "tan");

        assert_eq!(config.enabled_generators().count(), 2);
        Ok(())
    }

    #[test]
    fn telemetry_global_labels() -> Result<(), Error> {
        let contents = r#"
telemetry:
  prometheus:
    addr: "127.0.0.1:9001"
    global_labels:
      env: "staging"
"#;
        let config = Config::from_yaml(contents)?;

        let Some(Telemetry::Prometheus {
            addr,
            global_labels,
        }) = config.telemetry
        else {
            panic!("expected prometheus telemetry");
        };
        assert_eq!(addr.port(), 9001);
        assert_eq!(global_labels.get("env").map(String::as_str), Some("staging"));
        assert_eq!(config.generator.len(), 7);
        Ok(())
    }

    #[test]
    fn unknown_telemetry_rejected() {
        let contents = r#"
telemetry:
  statsd:
    addr: "127.0.0.1:9001"
"#;
        assert!(matches!(
            Config::from_yaml(contents),
            Err(Error::SerdeYaml(_))
        ));
    }

    #[test]
    fn duplicate_ids_rejected() {
        let contents = r#"
generator:
  - id: "twin"
    spiky_counter: {}
  - id: "twin"
    wave_gauge:
      function: sin
"#;
        let res = Config::from_yaml(contents);
        assert!(matches!(res, Err(Error::DuplicateGeneratorId(ref id)) if id == "twin"));
    }

    #[test]
    fn unknown_generator_rejected() {
        let contents = r#"
generator:
  - square_wave: {}
"#;
        assert!(matches!(
            Config::from_yaml(contents),
            Err(Error::SerdeYaml(_))
        ));
    }

    #[test]
    fn load_from_file() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(b"destination: \"127.0.0.1:18125\"\n")?;

        let config = Config::load(file.path())?;
        assert_eq!(config.destination.port(), 18125);
        assert_eq!(config.generator.len(), 7);
        Ok(())
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let res = Config::load(&dir.path().join("absent.yaml"));
        assert!(matches!(res, Err(Error::ReadFile { .. })));
    }
}
