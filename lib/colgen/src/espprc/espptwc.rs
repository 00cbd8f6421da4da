use crate::{Error, Map};
use crate::data::{Cost, Demand, Node, Time};
use super::model::{EspprcModel, PricingData};
use super::resource::{ResourceDef, Window};

/// Pricing-problem data for the ESPPTWC: the arc-filtered graph with true
/// and dual-adjusted costs, travel times (service at the source absorbed),
/// demands and time windows. Origin depot `0`, destination depot `n + 1`.
#[derive(Debug, Clone)]
pub struct EspptwcData {
  pub num_customers: usize,
  pub capacity: Demand,
  neighbours: Vec<Vec<Node>>,
  cost: Map<(Node, Node), Cost>,
  adjusted_cost: Map<(Node, Node), Cost>,
  travel_time: Map<(Node, Node), Time>,
  demand: Vec<Demand>,
  tw_start: Vec<Time>,
  tw_end: Vec<Time>,
}

impl EspptwcData {
  pub fn new(
    num_customers: usize,
    capacity: Demand,
    cost: Map<(Node, Node), Cost>,
    travel_time: Map<(Node, Node), Time>,
    demand: Vec<Demand>,
    tw_start: Vec<Time>,
    tw_end: Vec<Time>,
  ) -> Self {
    let num_nodes = num_customers + 2;
    debug_assert_eq!(demand.len(), num_nodes);
    debug_assert_eq!(tw_start.len(), num_nodes);
    debug_assert_eq!(tw_end.len(), num_nodes);
    debug_assert!(cost.keys().all(|k| travel_time.contains_key(k)));

    let mut neighbours = vec![Vec::new(); num_nodes];
    for &(i, j) in cost.keys() {
      neighbours[i as usize].push(j);
    }
    for adj in &mut neighbours {
      adj.sort_unstable();
    }

    let adjusted_cost = cost.clone();
    return EspptwcData {
      num_customers,
      capacity,
      neighbours,
      cost,
      adjusted_cost,
      travel_time,
      demand,
      tw_start,
      tw_end,
    };
  }

  #[inline]
  pub fn tw_start(&self, i: Node) -> Time {
    self.tw_start[i as usize]
  }

  #[inline]
  pub fn tw_end(&self, i: Node) -> Time {
    self.tw_end[i as usize]
  }

  pub fn num_arcs(&self) -> usize {
    self.cost.len()
  }
}

impl PricingData for EspptwcData {
  fn num_customers(&self) -> usize {
    self.num_customers
  }

  fn neighbours(&self, node: Node) -> &[Node] {
    self.neighbours.get(node as usize).map(Vec::as_slice).unwrap_or(&[])
  }

  fn true_cost(&self, i: Node, j: Node) -> Option<f64> {
    self.cost.get(&(i, j)).copied()
  }

  fn adjust_costs(&mut self, duals: &Map<Node, f64>) {
    let depart = duals.get(&0).copied().unwrap_or(0.0);
    for (&(i, j), &c) in &self.cost {
      let mut adjusted = c - duals.get(&j).copied().unwrap_or(0.0);
      if i == 0 {
        adjusted -= depart;
      }
      self.adjusted_cost.insert((i, j), adjusted);
    }
  }
}

fn ref_cost(data: &EspptwcData, i: Node, j: Node, cost: f64) -> f64 {
  cost + data.adjusted_cost[&(i, j)]
}

fn ref_time(data: &EspptwcData, i: Node, j: Node, time: f64) -> f64 {
  let arrival = time + data.travel_time[&(i, j)];
  arrival.max(data.tw_start[j as usize])
}

fn ref_load(data: &EspptwcData, _i: Node, j: Node, load: f64) -> f64 {
  load + data.demand[j as usize]
}

/// The concrete ESPPTWC model: `cost`, `time`, `load` and the elementarity
/// bit-set, in that order. Variants (backhauls, pickup-and-delivery) swap
/// this constructor for one registering their own resources.
pub fn espptwc_model(data: EspptwcData) -> Result<EspprcModel<EspptwcData>, Error> {
  let time_window = Window::PerNode(data.tw_start.clone(), data.tw_end.clone());
  let t0 = data.tw_start[0];
  let load_window = Window::Constant(0.0, data.capacity);

  let resources = vec![
    ResourceDef::scalar("cost", ref_cost, Window::Unbounded, 0.0),
    ResourceDef::scalar("time", ref_time, time_window, t0),
    ResourceDef::scalar("load", ref_load, load_window, 0.0),
    ResourceDef::visited("visited"),
  ];
  EspprcModel::new(data, resources)
}

#[cfg(test)]
pub(crate) mod test_data {
  use super::*;
  use proptest::prelude::*;

  /// Three customers on a line-ish graph; capacity forbids pairing
  /// customers 1 and 2 (4 + 7 > 10).
  pub fn three_customers() -> EspptwcData {
    let costs = [
      ((0, 1), 3.0), ((0, 2), 6.0), ((0, 3), 7.0),
      ((1, 2), 2.0), ((1, 3), 5.0), ((1, 4), 8.0),
      ((2, 3), 1.0), ((2, 4), 3.0),
      ((3, 4), 2.0),
    ];
    let times = [
      ((0, 1), 6.0), ((0, 2), 10.0), ((0, 3), 12.0),
      ((1, 2), 8.0), ((1, 3), 15.0), ((1, 4), 5.0),
      ((2, 3), 4.0), ((2, 4), 6.0),
      ((3, 4), 5.0),
    ];
    EspptwcData::new(
      3,
      10.0,
      costs.iter().cloned().collect(),
      times.iter().cloned().collect(),
      vec![0.0, 4.0, 7.0, 3.0, 0.0],
      vec![0.0, 0.0, 0.0, 0.0, 0.0],
      vec![100.0, 20.0, 25.0, 40.0, 100.0],
    )
  }

  fn full_arcs(n: usize) -> Vec<(Node, Node)> {
    let dest = (n + 1) as Node;
    let mut arcs = Vec::with_capacity(n * n + n);
    for i in 1..=n as Node {
      arcs.push((0, i));
      arcs.push((i, dest));
      for j in 1..=n as Node {
        if i != j {
          arcs.push((i, j));
        }
      }
    }
    return arcs;
  }

  prop_compose! {
    /// Random instance on the complete customer graph. `min_cost` below
    /// zero exercises the pricing side; the master needs nonnegative
    /// route costs.
    pub(crate) fn arb_espptwc(max_customers: usize, min_cost: f64)
      (n in 1..=max_customers)
      (
        n in Just(n),
        costs in prop::collection::vec(min_cost..10.0f64, n * n + n),
        times in prop::collection::vec(0.0..10.0f64, n * n + n),
        demands in prop::collection::vec(0.0..5.0f64, n),
        starts in prop::collection::vec(0.0..20.0f64, n),
        widths in prop::collection::vec(0.0..30.0f64, n),
      ) -> EspptwcData {
      let arcs = full_arcs(n);
      let cost: Map<(Node, Node), f64> = arcs.iter().cloned().zip(costs.iter().cloned()).collect();
      let travel: Map<(Node, Node), f64> = arcs.iter().cloned().zip(times.iter().cloned()).collect();

      let mut demand = Vec::with_capacity(n + 2);
      demand.push(0.0);
      demand.extend_from_slice(&demands);
      demand.push(0.0);

      let mut tw_start = Vec::with_capacity(n + 2);
      let mut tw_end = Vec::with_capacity(n + 2);
      tw_start.push(0.0);
      tw_end.push(100.0);
      for k in 0..n {
        tw_start.push(starts[k]);
        tw_end.push(starts[k] + widths[k]);
      }
      tw_start.push(0.0);
      tw_end.push(100.0);

      EspptwcData::new(n, 8.0, cost, travel, demand, tw_start, tw_end)
    }
  }

  /// Complete graph over `n` customers with every arc at `cost` and zero
  /// time pressure; handy for the scenario tests.
  pub fn uniform(n: usize, cost: f64, demand: f64, capacity: f64) -> EspptwcData {
    let dest = (n + 1) as Node;
    let mut costs = Map::default();
    for i in 1..=n as Node {
      costs.insert((0, i), cost);
      costs.insert((i, dest), cost);
      for j in 1..=n as Node {
        if i != j {
          costs.insert((i, j), cost);
        }
      }
    }
    let times = costs.clone();
    let mut demands = vec![demand; n + 2];
    demands[0] = 0.0;
    demands[n + 1] = 0.0;
    EspptwcData::new(
      n,
      capacity,
      costs,
      times,
      demands,
      vec![0.0; n + 2],
      vec![1000.0; n + 2],
    )
  }
}
