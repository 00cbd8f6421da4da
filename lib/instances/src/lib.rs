pub use anyhow::Result;

use std::fmt;

pub type Map<K, V> = fnv::FnvHashMap<K, V>;

/// Instance-level data errors. These are surfaced before any model is
/// constructed; an instance that fails validation is unusable.
#[derive(Debug, Clone)]
pub enum InstanceError {
  NegativeDemand { node: usize, demand: f64 },
  ReversedTimeWindow { node: usize, start: f64, end: f64 },
  NegativeServiceTime { node: usize, service_time: f64 },
  DemandExceedsCapacity { node: usize, demand: f64, capacity: f64 },
  NotEnoughCustomers { requested: usize, available: usize },
}

impl fmt::Display for InstanceError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Debug::fmt(self, f)
  }
}

impl std::error::Error for InstanceError {}

pub mod dataset;
pub mod raw;

mod parsers;
pub use parsers::{ParseInstance, SolomonFmt};
