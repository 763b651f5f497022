//! Test infrastructure for the OTF decoder
//!
//! Provides fixture loading, stochastic buffer variations, and event
//! formatting helpers.

#![allow(dead_code)]

mod loader;
mod harness;
mod generators;
mod schemas;

#[allow(unused_imports)]
pub use loader::{TestCase, TokenDef, load_fixtures_by_name, parse_hex};
#[allow(unused_imports)]
pub use harness::{collect_events, run_test, run_with_variations, EventLog, TestResult};
#[allow(unused_imports)]
pub use generators::Gen;
#[allow(unused_imports)]
pub use schemas::*;
