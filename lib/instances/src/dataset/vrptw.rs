use std::borrow::Cow;
use std::path::Path;

use anyhow::Context;
use itertools::Itertools;

use crate::{InstanceError, Map, Result};
use crate::parsers::{parse_solomon_str, ParseInstance, SolomonFmt};
use crate::raw::solomon::Solomon;
use crate::raw::FromRaw;

pub type Time = f64;
pub type Cost = f64;
pub type Demand = f64;
pub type Node = u16;

/// Distances are truncated to one decimal, the convention under which the
/// published best-known Solomon results are comparable. Travel times carry
/// the service time of the source node on top of the truncated distance.
pub const COST_SCALE: f64 = 10.0;

/// A VRPTW instance with split depots: node `0` is the origin depot, nodes
/// `1..=n` are customers and node `n + 1` is a copy of the depot acting as
/// the destination, so every route is a simple path.
#[allow(non_snake_case)]
#[derive(Debug, Clone, Default)]
pub struct VrptwInstance {
  pub id: String,
  pub n: Node,
  pub C: Vec<Node>,
  pub N: Vec<Node>,
  pub num_vehicles: usize,
  pub capacity: Demand,
  pub cost: Map<(Node, Node), Cost>,
  pub travel_time: Map<(Node, Node), Time>,
  pub demand: Map<Node, Demand>,
  pub service_time: Map<Node, Time>,
  pub tw_start: Map<Node, Time>,
  pub tw_end: Map<Node, Time>,
  pub o_depot: Node,
  pub d_depot: Node,
}

impl FromRaw<Solomon> for VrptwInstance {
  fn from_raw(raw: Solomon, id: Cow<str>) -> VrptwInstance {
    let n = raw.num_customers() as Node;
    let customers: Vec<Node> = (1..=n).collect();
    let locations: Vec<Node> = (0..=n + 1).collect();
    let o_depot: Node = 0;
    let d_depot: Node = n + 1;

    // Duplicate the depot row as the destination node.
    let mut coords = raw.coords.clone();
    coords.push(raw.coords[0]);

    let row = |i: Node| if i == d_depot { 0 } else { i as usize };

    // symmetric Euclidean distance under the benchmark truncation
    let dist = |i: Node, j: Node| {
      let (xi, yi) = coords[i as usize];
      let (xj, yj) = coords[j as usize];
      let d = ((xi - xj) * (xi - xj) + (yi - yj) * (yi - yj)).sqrt();
      (d * COST_SCALE).trunc() / COST_SCALE
    };

    let service_time: Map<_, _> = locations.iter()
      .map(|&i| (i, raw.service_time[row(i)]))
      .collect();

    let cost: Map<_, _> = locations.iter()
      .cartesian_product(locations.iter())
      .map(|(&i, &j)| ((i, j), dist(i, j)))
      .collect();

    let travel_time: Map<_, _> = locations.iter()
      .cartesian_product(locations.iter())
      .map(|(&i, &j)| ((i, j), dist(i, j) + service_time[&i]))
      .collect();

    let tw_start: Map<_, _> = locations.iter().map(|&i| (i, raw.tw_start[row(i)])).collect();
    let tw_end: Map<_, _> = locations.iter().map(|&i| (i, raw.tw_end[row(i)])).collect();
    let demand: Map<_, _> = locations.iter().map(|&i| (i, raw.demand[row(i)])).collect();

    VrptwInstance {
      id: id.into_owned(),
      n,
      C: customers,
      N: locations,
      num_vehicles: raw.num_vehicles,
      capacity: raw.vehicle_capacity,
      cost,
      travel_time,
      demand,
      service_time,
      tw_start,
      tw_end,
      o_depot,
      d_depot,
    }
  }
}

impl VrptwInstance {
  pub fn validate(&self) -> std::result::Result<(), InstanceError> {
    for &i in &self.N {
      let node = i as usize;
      let q = self.demand[&i];
      if q < 0.0 {
        return Err(InstanceError::NegativeDemand { node, demand: q });
      }
      if q > self.capacity {
        return Err(InstanceError::DemandExceedsCapacity { node, demand: q, capacity: self.capacity });
      }
      let s = self.service_time[&i];
      if s < 0.0 {
        return Err(InstanceError::NegativeServiceTime { node, service_time: s });
      }
      let (a, b) = (self.tw_start[&i], self.tw_end[&i]);
      if a > b {
        return Err(InstanceError::ReversedTimeWindow { node, start: a, end: b });
      }
    }
    Ok(())
  }
}

fn build(mut raw: Solomon, id: &str, n_customers: Option<usize>) -> Result<VrptwInstance> {
  if let Some(n) = n_customers {
    if n > raw.num_customers() {
      return Err(InstanceError::NotEnoughCustomers { requested: n, available: raw.num_customers() }.into());
    }
    raw.truncate(n);
  }
  let instance = VrptwInstance::from_raw(raw, Cow::Borrowed(id));
  instance.validate()?;
  Ok(instance)
}

/// Load and validate a Solomon-format instance, optionally truncated to the
/// first `n_customers` customers.
pub fn load_instance(path: impl AsRef<Path>, n_customers: Option<usize>) -> Result<VrptwInstance> {
  let path = path.as_ref();
  let raw = Solomon::parse(SolomonFmt(path)).context(format!("failed to load {:?}", path))?;
  let id = path.file_stem()
    .map(|s| s.to_string_lossy().into_owned())
    .unwrap_or_else(|| "unnamed".to_string());
  build(raw, &id, n_customers)
}

/// As [`load_instance`], from instance text instead of a file.
pub fn from_solomon_str(data: &str, id: &str, n_customers: Option<usize>) -> Result<VrptwInstance> {
  build(parse_solomon_str(data)?, id, n_customers)
}

#[cfg(test)]
mod tests {
  use super::*;

  const TOY: &str = "\
TOY

VEHICLE
NUMBER     CAPACITY
   2          10

CUSTOMER
CUST NO.  XCOORD.   YCOORD.    DEMAND   READY TIME  DUE DATE   SERVICE   TIME

    0       0          0          0          0        100          0
    1       3          4          4          0         50          2
    2       6          0          5         10         60          3
";

  #[test]
  fn split_depots() -> Result<()> {
    let data = from_solomon_str(TOY, "toy", None)?;
    assert_eq!(data.n, 2);
    assert_eq!(data.o_depot, 0);
    assert_eq!(data.d_depot, 3);
    assert_eq!(data.N, vec![0, 1, 2, 3]);
    assert_eq!(data.C, vec![1, 2]);
    // destination is a copy of the depot row
    assert_eq!(data.cost[&(1, 0)], data.cost[&(1, 3)]);
    assert_eq!(data.tw_end[&3], 100.0);
    assert_eq!(data.demand[&3], 0.0);
    Ok(())
  }

  #[test]
  fn truncated_distances() -> Result<()> {
    let data = from_solomon_str(TOY, "toy", None)?;
    // d(0, 1) = 5 exactly; d(1, 2) = sqrt(9 + 16) = 5
    assert_eq!(data.cost[&(0, 1)], 5.0);
    assert_eq!(data.cost[&(1, 2)], 5.0);
    assert_eq!(data.cost[&(2, 1)], data.cost[&(1, 2)]);
    assert_eq!(data.cost[&(1, 1)], 0.0);
    // d(0, 2) = 6; truncation leaves integers alone
    assert_eq!(data.cost[&(0, 2)], 6.0);
    // travel time absorbs the service time at the source
    assert_eq!(data.travel_time[&(1, 2)], 5.0 + 2.0);
    assert_eq!(data.travel_time[&(2, 3)], 6.0 + 3.0);
    Ok(())
  }

  #[test]
  fn truncation_convention() {
    let t = |d: f64| (d * COST_SCALE).trunc() / COST_SCALE;
    assert_eq!(t(2.0f64.sqrt()), 1.4);
    assert_eq!(t(9.99), 9.9);
  }

  #[test]
  fn validate_rejects_reversed_window() -> Result<()> {
    let mut data = from_solomon_str(TOY, "toy", None)?;
    data.tw_start.insert(1, 80.0);
    assert!(matches!(
      data.validate(),
      Err(InstanceError::ReversedTimeWindow { node: 1, .. })
    ));
    Ok(())
  }

  #[test]
  fn validate_rejects_oversized_demand() -> Result<()> {
    let mut data = from_solomon_str(TOY, "toy", None)?;
    data.demand.insert(2, 11.0);
    assert!(matches!(
      data.validate(),
      Err(InstanceError::DemandExceedsCapacity { node: 2, .. })
    ));
    Ok(())
  }

  #[test]
  fn truncate_to_subset() -> Result<()> {
    let data = from_solomon_str(TOY, "toy", Some(1))?;
    assert_eq!(data.n, 1);
    assert_eq!(data.d_depot, 2);
    Ok(())
  }

  #[test]
  fn truncate_beyond_available() {
    assert!(from_solomon_str(TOY, "toy", Some(5)).is_err());
  }
}
