//! A single metric observation and its `DogStatsD` wire line.
//!
//! An [`Observation`] exists only long enough to be rendered. Its `Display`
//! implementation is the wire format:
//!
//! ```text
//! <NAME>:<VALUE>|<TYPE>[|#<TAG_1>,<TAG_2>,...]
//! ```
//!
//! Tags are written verbatim. A tag containing `,` or `|` corrupts the line;
//! no escaping is done.

use std::fmt;

/// The `DogStatsD` metric types fauxmetrics emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Rendered as `c`.
    Counter,
    /// Rendered as `g`.
    Gauge,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Counter => write!(f, "c"),
            Self::Gauge => write!(f, "g"),
        }
    }
}

/// A numeric metric value.
///
/// Integers render without a decimal point. Floats render with the shortest
/// decimal representation that round-trips and always carry a fractional
/// part, so `1.0` stays `1.0` on the wire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// Integral value
    Int(i64),
    /// Floating point value
    Float(f64),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(val) => write!(f, "{val}"),
            Self::Float(val) => {
                let rendered = val.to_string();
                if val.is_finite() && !rendered.contains('.') {
                    write!(f, "{rendered}.0")
                } else {
                    write!(f, "{rendered}")
                }
            }
        }
    }
}

impl From<i64> for Value {
    fn from(val: i64) -> Self {
        Self::Int(val)
    }
}

impl From<f64> for Value {
    fn from(val: f64) -> Self {
        Self::Float(val)
    }
}

/// One metric observation, ready to be rendered as a wire line.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Dot-delimited metric name.
    pub name: String,
    /// The observed value.
    pub value: Value,
    /// Counter or gauge.
    pub kind: Kind,
    /// `key:value` tags, written in order.
    pub tags: Vec<String>,
}

impl Observation {
    /// Create a counter observation with no tags.
    #[must_use]
    pub fn counter(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            kind: Kind::Counter,
            tags: Vec::new(),
        }
    }

    /// Create a gauge observation with no tags.
    #[must_use]
    pub fn gauge(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            kind: Kind::Gauge,
            tags: Vec::new(),
        }
    }

    /// Append a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{name}:{value}|{kind}",
            name = self.name,
            value = self.value,
            kind = self.kind
        )?;
        if !self.tags.is_empty() {
            write!(f, "|#")?;
            let mut commas_remaining = self.tags.len() - 1;
            for tag in &self.tags {
                write!(f, "{tag}")?;
                if commas_remaining != 0 {
                    write!(f, ",")?;
                    commas_remaining -= 1;
                }
            }
        }
        Ok(())
    }
}
