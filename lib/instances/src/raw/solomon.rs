pub type Time = f64;
pub type Demand = f64;

/// Verbatim contents of a Solomon-format VRPTW file. Row 0 is the depot,
/// rows `1..` are customers, in file order.
#[derive(Debug, Clone)]
pub struct Solomon {
  pub num_vehicles: usize,
  pub vehicle_capacity: Demand,
  pub coords: Vec<(f64, f64)>,
  pub demand: Vec<Demand>,
  pub tw_start: Vec<Time>,
  pub tw_end: Vec<Time>,
  pub service_time: Vec<Time>,
}

impl Solomon {
  pub fn num_customers(&self) -> usize {
    self.coords.len() - 1
  }

  /// Keep the depot row and the first `n` customer rows. Benchmarks are
  /// commonly run on the 25- or 50-customer prefix of a 100-customer file.
  pub fn truncate(&mut self, n: usize) {
    debug_assert!(n <= self.num_customers());
    self.coords.truncate(n + 1);
    self.demand.truncate(n + 1);
    self.tw_start.truncate(n + 1);
    self.tw_end.truncate(n + 1);
    self.service_time.truncate(n + 1);
  }
}
