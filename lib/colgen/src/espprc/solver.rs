use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use tracing::*;

use crate::data::Node;
use super::label::{Label, LabelArena, LabelId};
use super::model::{EspprcModel, Extension, PricingData};

pub const LABEL_SELECTION_STRINGS: [&str; 6] =
  ["fifo", "lifo", "min-cost", "min-time", "min-load", "min-path"];

/// Order in which frontier labels are processed. The strategy changes how
/// fast the search converges, never what it returns.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LabelSelection {
  Fifo,
  Lifo,
  MinCost,
  MinTime,
  MinLoad,
  MinPathLen,
}

impl Default for LabelSelection {
  fn default() -> Self {
    LabelSelection::Fifo
  }
}

impl FromStr for LabelSelection {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    return match s {
      "fifo" => Ok(Self::Fifo),
      "lifo" => Ok(Self::Lifo),
      "min-cost" => Ok(Self::MinCost),
      "min-time" => Ok(Self::MinTime),
      "min-load" => Ok(Self::MinLoad),
      "min-path" => Ok(Self::MinPathLen),
      _ => Err(format!("invalid string: {}", s)),
    };
  }
}

/// Cooperative cancellation flag, checked at frontier-pop boundaries.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn cancel(&self) {
    self.0.store(true, AtomicOrdering::Relaxed);
  }

  pub fn is_cancelled(&self) -> bool {
    self.0.load(AtomicOrdering::Relaxed)
  }
}

struct HeapEntry {
  key: f64,
  seq: u64,
  id: LabelId,
}

impl PartialEq for HeapEntry {
  fn eq(&self, other: &Self) -> bool {
    self.seq == other.seq
  }
}

impl Eq for HeapEntry {}

impl Ord for HeapEntry {
  fn cmp(&self, other: &Self) -> Ordering {
    // BinaryHeap is a max-heap; invert so the smallest key pops first,
    // insertion order breaking ties.
    other.key.total_cmp(&self.key).then_with(|| other.seq.cmp(&self.seq))
  }
}

impl PartialOrd for HeapEntry {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

enum Frontier {
  Queue(VecDeque<LabelId>),
  Stack(Vec<LabelId>),
  Heap(BinaryHeap<HeapEntry>),
}

impl Frontier {
  fn new(strategy: LabelSelection) -> Self {
    match strategy {
      LabelSelection::Fifo => Frontier::Queue(VecDeque::new()),
      LabelSelection::Lifo => Frontier::Stack(Vec::new()),
      _ => Frontier::Heap(BinaryHeap::new()),
    }
  }

  fn push(&mut self, id: LabelId, key: f64, seq: u64) {
    match self {
      Frontier::Queue(q) => q.push_back(id),
      Frontier::Stack(s) => s.push(id),
      Frontier::Heap(h) => h.push(HeapEntry { key, seq, id }),
    }
  }

  fn pop(&mut self) -> Option<LabelId> {
    match self {
      Frontier::Queue(q) => q.pop_front(),
      Frontier::Stack(s) => s.pop(),
      Frontier::Heap(h) => h.pop().map(|e| e.id),
    }
  }
}

/// A non-dominated path to the destination depot, with its cost under the
/// duals that were installed when the search ran.
#[derive(Debug, Clone)]
pub struct PricedRoute {
  pub path: Vec<Node>,
  pub reduced_cost: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SearchStats {
  pub generated: usize,
  pub dominated: usize,
  pub popped: usize,
}

/// Solver output: the sink's non-dominated labels as routes, sorted by
/// reduced cost (insertion order on ties), and the minimum among them.
/// An unreachable destination yields no routes and `+inf`.
#[derive(Debug, Clone)]
pub struct PricingSolution {
  pub routes: Vec<PricedRoute>,
  pub min_reduced_cost: f64,
  pub complete: bool,
  pub stats: SearchStats,
}

/// Frontier-based forward labeling with full elementarity.
#[derive(Debug, Clone, Default)]
pub struct LabelingSolver {
  pub strategy: LabelSelection,
  cancel: CancelToken,
}

impl LabelingSolver {
  pub fn new(strategy: LabelSelection) -> Self {
    LabelingSolver { strategy, cancel: CancelToken::new() }
  }

  pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
    self.cancel = cancel;
    self
  }

  #[instrument(level = "debug", name = "labeling", skip(self, model), fields(strategy = ?self.strategy))]
  pub fn solve<D: PricingData>(&self, model: &EspprcModel<D>) -> PricingSolution {
    let key_slot = self.key_slot(model);

    let mut arena = LabelArena::new();
    let mut buckets: Vec<Vec<LabelId>> = vec![Vec::new(); model.num_nodes()];
    let mut frontier = Frontier::new(self.strategy);
    let mut seq: u64 = 0;
    let mut stats = SearchStats::default();
    let mut complete = true;

    let root = arena.push(model.initial_label());
    buckets[model.origin() as usize].push(root);
    frontier.push(root, self.key(model, key_slot, arena.get(root)), seq);
    seq += 1;

    while let Some(id) = frontier.pop() {
      if self.cancel.is_cancelled() {
        debug!(popped = stats.popped, "search cancelled");
        complete = false;
        break;
      }
      // tombstoned since it was pushed
      if arena.is_dominated(id) {
        continue;
      }
      stats.popped += 1;

      let node = arena.get(id).node;
      for &dest in model.neighbours(node) {
        let mut child = match model.extend(arena.get(id), dest) {
          Extension::Feasible(l) => l,
          Extension::Infeasible => continue,
        };
        child.pred = Some(id);
        stats.generated += 1;

        let bucket = dest as usize;
        if buckets[bucket].iter().any(|&other| {
          !arena.is_dominated(other) && model.dominates(arena.get(other), &child)
        }) {
          stats.dominated += 1;
          continue;
        }
        for &other in &buckets[bucket] {
          if !arena.is_dominated(other) && model.dominates(&child, arena.get(other)) {
            arena.mark_dominated(other);
            stats.dominated += 1;
          }
        }
        let arena_ref = &arena;
        buckets[bucket].retain(|&other| !arena_ref.is_dominated(other));

        let terminal = model.is_terminal(&child);
        let key = self.key(model, key_slot, &child);
        let cid = arena.push(child);
        buckets[bucket].push(cid);
        if !terminal {
          frontier.push(cid, key, seq);
          seq += 1;
        }
      }
    }

    let sink = &buckets[model.destination() as usize];
    let mut routes: Vec<PricedRoute> = sink.iter()
      .filter(|&&id| !arena.is_dominated(id))
      .map(|&id| PricedRoute {
        path: arena.path(id),
        reduced_cost: model.cost(arena.get(id)),
      })
      .collect();
    routes.sort_by(|a, b| a.reduced_cost.total_cmp(&b.reduced_cost));
    let min_reduced_cost = routes.first().map(|r| r.reduced_cost).unwrap_or(f64::INFINITY);

    debug!(
      labels = arena.len(),
      generated = stats.generated,
      dominated = stats.dominated,
      popped = stats.popped,
      sink = routes.len(),
      min_reduced_cost,
      complete,
      "labeling finished"
    );

    PricingSolution { routes, min_reduced_cost, complete, stats }
  }

  fn key_slot<D: PricingData>(&self, model: &EspprcModel<D>) -> Option<usize> {
    let named = |name: &str| match model.scalar_slot(name) {
      Some(slot) => Some(slot),
      None => {
        warn!(name, "model has no such resource, ordering by cost instead");
        model.scalar_slot("cost")
      }
    };
    match self.strategy {
      LabelSelection::Fifo | LabelSelection::Lifo | LabelSelection::MinPathLen => None,
      LabelSelection::MinCost => named("cost"),
      LabelSelection::MinTime => named("time"),
      LabelSelection::MinLoad => named("load"),
    }
  }

  #[inline]
  fn key<D: PricingData>(&self, _model: &EspprcModel<D>, slot: Option<usize>, label: &Label) -> f64 {
    match (self.strategy, slot) {
      (LabelSelection::MinPathLen, _) => label.depth as f64,
      (_, Some(slot)) => label.scalars[slot],
      _ => 0.0,
    }
  }
}
