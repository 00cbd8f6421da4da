use arrayvec::ArrayVec;
use itertools::Itertools;
use tracing::*;

use crate::{Error, Map};
use crate::data::Node;
use super::label::{Label, NodeSet, MAX_SCALARS};
use super::resource::{ResourceDef, ResourceKind, Window};

/// Problem data consumed by the pricing model. Node `0` is the origin depot
/// and node `num_customers() + 1` the destination depot; customers are
/// `1..=num_customers()`.
pub trait PricingData {
  fn num_customers(&self) -> usize;

  /// Outgoing neighbours of `node`, sorted ascending. Arcs absent from the
  /// graph are not traversable.
  fn neighbours(&self, node: Node) -> &[Node];

  /// True (undualized) arc cost, `None` if the arc does not exist.
  fn true_cost(&self, i: Node, j: Node) -> Option<f64>;

  /// Install dual prices: the adjusted cost of `(i, j)` becomes
  /// `c_ij - dual[j]` (zero for nodes without a dual). A dual keyed by the
  /// origin is charged on every arc leaving it, which is where a fleet-size
  /// dual lands since no arc enters the origin.
  fn adjust_costs(&mut self, duals: &Map<Node, f64>);
}

/// Outcome of extending a label along an arc. Infeasibility is an ordinary
/// outcome of the search, not an error.
pub enum Extension {
  Feasible(Label),
  Infeasible,
}

/// An ESPPRC instance: problem data bound to a resource catalog. The
/// catalog is fixed at construction; [`EspprcModel::new`] rejects
/// misdeclared catalogs up front.
pub struct EspprcModel<D> {
  data: D,
  resources: Vec<ResourceDef<D>>,
  cost_slot: usize,
}

impl<D: PricingData> EspprcModel<D> {
  pub fn new(data: D, resources: Vec<ResourceDef<D>>) -> Result<Self, Error> {
    let num_nodes = data.num_customers() + 2;
    if num_nodes > NodeSet::capacity() {
      return Err(Error::ResourceMisdeclared(
        format!("{} nodes exceed the visited-set capacity of {}", num_nodes, NodeSet::capacity())
      ));
    }

    let mut cost_slot = None;
    let mut num_visited = 0;
    let mut slot = 0;
    for r in &resources {
      match &r.kind {
        ResourceKind::Scalar { window, initial, .. } => {
          validate_window(r.name, window, num_nodes)?;
          if !window.contains(0, *initial) {
            return Err(Error::ResourceMisdeclared(
              format!("initial value {} of '{}' is outside the origin window", initial, r.name)
            ));
          }
          if r.name == "cost" {
            cost_slot = Some(slot);
          }
          slot += 1;
        }
        ResourceKind::Visited => num_visited += 1,
      }
    }
    if slot > MAX_SCALARS {
      return Err(Error::ResourceMisdeclared(
        format!("{} scalar resources exceed the limit of {}", slot, MAX_SCALARS)
      ));
    }
    if num_visited > 1 {
      return Err(Error::ResourceMisdeclared("more than one visited-set resource".to_string()));
    }
    let cost_slot = cost_slot.ok_or_else(|| {
      Error::ResourceMisdeclared("no scalar resource named 'cost'".to_string())
    })?;

    return Ok(EspprcModel { data, resources, cost_slot });
  }

  #[inline]
  pub fn data(&self) -> &D {
    &self.data
  }

  #[inline]
  pub fn num_customers(&self) -> usize {
    self.data.num_customers()
  }

  #[inline]
  pub fn num_nodes(&self) -> usize {
    self.data.num_customers() + 2
  }

  #[inline]
  pub fn origin(&self) -> Node {
    0
  }

  #[inline]
  pub fn destination(&self) -> Node {
    (self.data.num_customers() + 1) as Node
  }

  #[inline]
  pub fn is_customer(&self, i: Node) -> bool {
    0 < i && (i as usize) <= self.data.num_customers()
  }

  #[inline]
  pub fn neighbours(&self, i: Node) -> &[Node] {
    self.data.neighbours(i)
  }

  /// Scalar slot of the resource called `name`, in registration order.
  pub fn scalar_slot(&self, name: &str) -> Option<usize> {
    let mut slot = 0;
    for r in &self.resources {
      if let ResourceKind::Scalar { .. } = r.kind {
        if r.name == name {
          return Some(slot);
        }
        slot += 1;
      }
    }
    return None;
  }

  /// Value of the `cost` resource (the reduced cost under the currently
  /// installed duals).
  #[inline]
  pub fn cost(&self, label: &Label) -> f64 {
    label.scalars[self.cost_slot]
  }

  /// Root label at the origin: every scalar at its initial value, nothing
  /// visited.
  pub fn initial_label(&self) -> Label {
    let scalars: ArrayVec<f64, MAX_SCALARS> = self.resources.iter()
      .filter_map(|r| match &r.kind {
        ResourceKind::Scalar { initial, .. } => Some(*initial),
        ResourceKind::Visited => None,
      })
      .collect();
    return Label {
      node: self.origin(),
      depth: 0,
      scalars,
      visited: NodeSet::new(),
      pred: None,
    };
  }

  /// Extend `label` along the arc to `dest`, applying every registered REF
  /// in order and checking feasibility at `dest`. Aborts at the first
  /// infeasible resource. The returned label has no predecessor set; the
  /// solver owns the label tree.
  pub fn extend(&self, label: &Label, dest: Node) -> Extension {
    let from = label.node;
    if self.data.true_cost(from, dest).is_none() {
      return Extension::Infeasible;
    }

    let mut scalars: ArrayVec<f64, MAX_SCALARS> = ArrayVec::new();
    let mut visited = label.visited;
    let mut slot = 0;
    for r in &self.resources {
      match &r.kind {
        ResourceKind::Scalar { extend, window, .. } => {
          let value = extend(&self.data, from, dest, label.scalars[slot]);
          debug_assert!(!value.is_nan(), "REF for '{}' produced NaN on ({}, {})", r.name, from, dest);
          if !window.contains(dest, value) {
            return Extension::Infeasible;
          }
          scalars.push(value);
          slot += 1;
        }
        ResourceKind::Visited => {
          if self.is_customer(dest) {
            if visited.contains(dest) {
              return Extension::Infeasible;
            }
            visited.insert(dest);
          }
        }
      }
    }

    return Extension::Feasible(Label {
      node: dest,
      depth: label.depth + 1,
      scalars,
      visited,
      pred: None,
    });
  }

  #[inline]
  pub fn is_terminal(&self, label: &Label) -> bool {
    label.node == self.destination()
  }

  /// Component-wise weak dominance: every scalar of `a` is `<=` the
  /// corresponding scalar of `b` and `a.visited ⊆ b.visited`. Both labels
  /// must sit at the same node. Ties (identical labels) dominate each
  /// other; the solver keeps the first-inserted one.
  pub fn dominates(&self, a: &Label, b: &Label) -> bool {
    debug_assert_eq!(a.node, b.node);
    a.scalars.iter().zip(b.scalars.iter()).all(|(x, y)| x <= y)
      && a.visited.is_subset(&b.visited)
  }

  /// Install new arc costs from dual prices; called between pricing rounds,
  /// never while a search is running.
  pub fn set_arc_costs(&mut self, duals: &Map<Node, f64>) {
    self.data.adjust_costs(duals);
  }

  /// True (undualized) cost of a route.
  pub fn path_cost(&self, path: &[Node]) -> f64 {
    path.iter()
      .tuple_windows()
      .map(|(&i, &j)| match self.data.true_cost(i, j) {
        Some(c) => c,
        None => {
          error!(i, j, "no arc in route");
          panic!("bug - route must follow graph arcs")
        }
      })
      .sum()
  }

  /// Spot-check REF monotonicity over every arc: for each sample pair
  /// `(s, s')` with `s <= s'`, `f(arc, s) <= f(arc, s')` must hold. The
  /// catalog cannot prove the contract, but this catches gross violations.
  pub fn check_monotone(&self, samples: &[(f64, f64)]) -> Result<(), Error> {
    for i in 0..self.num_nodes() {
      let i = i as Node;
      for &j in self.data.neighbours(i) {
        for r in &self.resources {
          if let ResourceKind::Scalar { extend, .. } = &r.kind {
            for &(a, b) in samples {
              let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
              if extend(&self.data, i, j, lo) > extend(&self.data, i, j, hi) + 1e-9 {
                return Err(Error::ResourceMisdeclared(
                  format!("REF for '{}' is not monotone on arc ({}, {})", r.name, i, j)
                ));
              }
            }
          }
        }
      }
    }
    Ok(())
  }
}

fn validate_window(name: &str, window: &Window, num_nodes: usize) -> Result<(), Error> {
  match window {
    Window::Unbounded => {}
    Window::Constant(lo, hi) => {
      if lo > hi {
        return Err(Error::ResourceMisdeclared(
          format!("reversed window [{}, {}] on '{}'", lo, hi, name)
        ));
      }
    }
    Window::PerNode(lo, hi) => {
      if lo.len() < num_nodes || hi.len() < num_nodes {
        return Err(Error::ResourceMisdeclared(
          format!("per-node window on '{}' covers {} of {} nodes", name, lo.len().min(hi.len()), num_nodes)
        ));
      }
      for node in 0..num_nodes {
        if lo[node] > hi[node] {
          return Err(Error::ResourceMisdeclared(
            format!("reversed window [{}, {}] on '{}' at node {}", lo[node], hi[node], name, node)
          ));
        }
      }
    }
  }
  Ok(())
}
