pub use instances::dataset::vrptw::{Cost, Demand, Node, Time, VrptwInstance};

pub trait VrptwInstanceExt {
  fn is_customer(&self, i: Node) -> bool;
  fn is_depot(&self, i: Node) -> bool;
}

impl VrptwInstanceExt for VrptwInstance {
  #[inline]
  fn is_customer(&self, i: Node) -> bool {
    return 0 < i && i <= self.n;
  }

  #[inline]
  fn is_depot(&self, i: Node) -> bool {
    return i == self.o_depot || i == self.d_depot;
  }
}
