//! The fauxmetrics synthetic metrics traffic generator.
//!
//! This library supports the fauxmetrics binary found elsewhere in this
//! project. Generators manufacture counter and gauge time series and push
//! them, one `DogStatsD` line per datagram, at a metrics collector. Nothing
//! here waits on the collector; delivery is best effort.

#![deny(clippy::all)]
#![deny(clippy::cargo)]
#![deny(clippy::pedantic)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::dbg_macro)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]
#![deny(missing_copy_implementations)]
#![deny(missing_debug_implementations)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::multiple_crate_versions)]

pub mod config;
pub mod emitter;
pub mod generator;
pub mod metric;
pub mod supervisor;
