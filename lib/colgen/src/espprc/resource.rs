use crate::data::Node;

/// Resource extension function for a scalar resource: maps the value held
/// at the source node to the value at the target node of an arc.
///
/// Contract (cannot be verified by the catalog): the function must be
/// monotone in its `value` argument for every fixed arc. Dominance-based
/// pruning is unsound otherwise.
pub type ScalarRef<D> = fn(&D, Node, Node, f64) -> f64;

/// Feasible range of a scalar resource, checked at the target node of every
/// extension.
#[derive(Debug, Clone)]
pub enum Window {
  Unbounded,
  Constant(f64, f64),
  PerNode(Vec<f64>, Vec<f64>),
}

impl Window {
  #[inline]
  pub fn contains(&self, node: Node, value: f64) -> bool {
    let (lo, hi) = match self {
      Window::Unbounded => return true,
      Window::Constant(lo, hi) => (*lo, *hi),
      Window::PerNode(lo, hi) => (lo[node as usize], hi[node as usize]),
    };
    return lo <= value && value <= hi;
  }

  pub fn lower(&self, node: Node) -> f64 {
    match self {
      Window::Unbounded => f64::NEG_INFINITY,
      Window::Constant(lo, _) => *lo,
      Window::PerNode(lo, _) => lo[node as usize],
    }
  }
}

pub enum ResourceKind<D> {
  /// Real-valued resource with an extension function and a window.
  Scalar {
    extend: ScalarRef<D>,
    window: Window,
    initial: f64,
  },
  /// Node bit-set enforcing elementarity: extension inserts the target
  /// customer, feasibility requires it absent. Depots are exempt.
  Visited,
}

/// A named resource. Resources are iterated in registration order during
/// extension and feasibility checking, and extension aborts at the first
/// infeasible resource.
pub struct ResourceDef<D> {
  pub name: &'static str,
  pub kind: ResourceKind<D>,
}

impl<D> ResourceDef<D> {
  pub fn scalar(name: &'static str, extend: ScalarRef<D>, window: Window, initial: f64) -> Self {
    ResourceDef { name, kind: ResourceKind::Scalar { extend, window, initial } }
  }

  pub fn visited(name: &'static str) -> Self {
    ResourceDef { name, kind: ResourceKind::Visited }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn window_contains() {
    let w = Window::Constant(0.0, 10.0);
    assert!(w.contains(0, 0.0));
    assert!(w.contains(0, 10.0));
    assert!(!w.contains(0, 10.5));
    assert!(!w.contains(0, -0.1));

    let w = Window::PerNode(vec![0.0, 5.0], vec![1.0, 6.0]);
    assert!(w.contains(1, 5.5));
    assert!(!w.contains(0, 5.5));

    assert!(Window::Unbounded.contains(3, f64::MIN));
  }

  #[test]
  fn window_lower() {
    assert_eq!(Window::Constant(2.0, 3.0).lower(7), 2.0);
    assert_eq!(Window::PerNode(vec![1.0, 4.0], vec![9.0, 9.0]).lower(1), 4.0);
  }
}
