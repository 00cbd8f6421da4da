use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::*;

use crate::data::Node;
use crate::espprc::{CancelToken, EspprcModel, Extension, LabelSelection, LabelingSolver, PricingData};
use crate::lp::LpBackend;
use crate::master::SetCoveringMaster;

#[derive(Debug, Clone)]
pub struct CgConfig {
    pub max_iterations: usize,
    /// Columns with reduced cost in `[-tolerance, 0)` are not added; this
    /// is what "no improving column" means.
    pub tolerance: f64,
    pub strategy: LabelSelection,
    pub solve_integer_after: bool,
    /// `None` adds every improving non-dominated column per round.
    pub columns_per_iter: Option<usize>,
    pub time_limit: Option<Duration>,
    pub fleet_limit: Option<usize>,
}

impl Default for CgConfig {
    fn default() -> Self {
        CgConfig {
            max_iterations: 100,
            tolerance: 1e-6,
            strategy: LabelSelection::MinCost,
            solve_integer_after: false,
            columns_per_iter: None,
            time_limit: None,
            fleet_limit: None,
        }
    }
}

/// How a run ended. Budget exhaustion still returns the best-known bound
/// and the column set; it is not an error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CgStatus {
    /// Pricing certified that no column with reduced cost below
    /// `-tolerance` exists.
    Optimal,
    IterationLimit,
    TimeLimit,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Phase {
    Init,
    Master,
    Pricing,
    Done,
    Abort(CgStatus),
}

#[derive(Debug, Clone)]
pub struct CgOutcome {
    pub status: CgStatus,
    /// LP bound of the final restricted master.
    pub objective: f64,
    /// Routes with nonzero allocation in the final LP.
    pub routes: Vec<(Vec<Node>, f64)>,
    pub iterations: usize,
    pub num_columns: usize,
    /// Integer restoration, when requested and the run ended `Optimal`.
    pub integer: Option<(f64, Vec<(Vec<Node>, f64)>)>,
}

/// The column-generation loop: solve the restricted master, transfer duals
/// into arc costs, price with the labeling solver, add improving columns,
/// repeat until none exists or a budget runs out.
pub struct ColumnGeneration<D, B> {
    model: EspprcModel<D>,
    master: SetCoveringMaster,
    backend: B,
    config: CgConfig,
    cancel: CancelToken,
    seeded: bool,
    last_primal: Vec<f64>,
}

impl<D: PricingData, B: LpBackend> ColumnGeneration<D, B> {
    pub fn new(model: EspprcModel<D>, backend: B, config: CgConfig) -> Self {
        let master = SetCoveringMaster::new(model.num_customers(), config.fleet_limit);
        ColumnGeneration {
            model,
            master,
            backend,
            config,
            cancel: CancelToken::new(),
            seeded: false,
            last_primal: Vec::new(),
        }
    }

    /// Token shared with the labeling solver; cancelling it makes the run
    /// return with [`CgStatus::TimeLimit`] at the next pop boundary.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn model(&self) -> &EspprcModel<D> {
        &self.model
    }

    /// Seed one trivial route per customer where the pricing model accepts
    /// it; a Big-M slack keeps the row feasible otherwise.
    fn seed(&mut self) {
        let dest = self.model.destination();
        for i in 1..=self.model.num_customers() as Node {
            let root = self.model.initial_label();
            let trivial = match self.model.extend(&root, i) {
                Extension::Feasible(at_customer) => match self.model.extend(&at_customer, dest) {
                    Extension::Feasible(_) => Some(vec![0, i, dest]),
                    Extension::Infeasible => None,
                },
                Extension::Infeasible => None,
            };
            match trivial {
                Some(path) => {
                    let cost = self.model.path_cost(&path);
                    self.master.add_column(path, cost);
                }
                None => {
                    self.master.add_slack(i);
                }
            }
        }
    }

    #[instrument(level = "info", name = "column_generation", skip(self))]
    pub fn run(&mut self) -> Result<CgOutcome> {
        let deadline = self.config.time_limit.map(|d| Instant::now() + d);
        let solver = LabelingSolver::new(self.config.strategy).with_cancel(self.cancel.clone());

        let mut phase = Phase::Init;
        let mut objective = f64::INFINITY;
        let mut iterations = 0usize;
        let status;

        loop {
            match phase {
                Phase::Init => {
                    if !self.seeded {
                        self.seed();
                        self.seeded = true;
                    }
                    phase = Phase::Master;
                }
                Phase::Master => {
                    let sol = self.master.solve_relaxation(&mut self.backend)?;
                    debug_assert!(
                        sol.objective <= objective + 1e-6,
                        "master objective increased: {} -> {}", objective, sol.objective
                    );
                    objective = sol.objective;
                    self.last_primal = sol.primal.clone();
                    debug!(iterations, objective, columns = self.master.num_columns(), "master solved");

                    let mut duals = sol.duals;
                    if let Some(pi0) = sol.fleet_dual {
                        duals.insert(0, pi0);
                    }
                    self.model.set_arc_costs(&duals);

                    phase = match deadline {
                        Some(d) if Instant::now() >= d => Phase::Abort(CgStatus::TimeLimit),
                        _ => Phase::Pricing,
                    };
                }
                Phase::Pricing => {
                    if iterations >= self.config.max_iterations {
                        warn!(iterations, "iteration limit reached");
                        phase = Phase::Abort(CgStatus::IterationLimit);
                        continue;
                    }
                    iterations += 1;

                    let pricing = solver.solve(&self.model);
                    if !pricing.complete {
                        phase = Phase::Abort(CgStatus::TimeLimit);
                        continue;
                    }

                    if pricing.min_reduced_cost < -self.config.tolerance {
                        let limit = self.config.columns_per_iter.unwrap_or(usize::MAX);
                        let mut added = 0;
                        for route in &pricing.routes {
                            if route.reduced_cost >= -self.config.tolerance || added >= limit {
                                break;
                            }
                            let cost = self.model.path_cost(&route.path);
                            self.master.add_column(route.path.clone(), cost);
                            added += 1;
                        }
                        debug!(
                            iterations,
                            added,
                            min_reduced_cost = pricing.min_reduced_cost,
                            "pricing round finished"
                        );
                        phase = Phase::Master;
                    } else {
                        debug!(
                            iterations,
                            min_reduced_cost = pricing.min_reduced_cost,
                            "no improving column"
                        );
                        phase = Phase::Done;
                    }
                }
                Phase::Done => {
                    status = CgStatus::Optimal;
                    break;
                }
                Phase::Abort(s) => {
                    status = s;
                    break;
                }
            }
        }

        let integer = if self.config.solve_integer_after && status == CgStatus::Optimal {
            let (obj, primal) = self.master.solve_integer(&mut self.backend)?;
            Some((obj, self.allocations(&primal)))
        } else {
            None
        };

        let outcome = CgOutcome {
            status,
            objective,
            routes: self.allocations(&self.last_primal),
            iterations,
            num_columns: self.master.num_columns(),
            integer,
        };
        info!(
            status = ?outcome.status,
            objective = outcome.objective,
            iterations = outcome.iterations,
            columns = outcome.num_columns,
            "column generation finished"
        );
        return Ok(outcome);
    }

    /// Every known column with its cost and its allocation in the last LP.
    pub fn get_columns(&self) -> Vec<(Vec<Node>, f64, f64)> {
        self.master.columns().iter()
            .map(|c| {
                let usage = self.last_primal.get(c.var.index()).copied().unwrap_or(0.0);
                (c.path.clone(), c.cost, usage)
            })
            .collect()
    }

    fn allocations(&self, primal: &[f64]) -> Vec<(Vec<Node>, f64)> {
        self.master.columns().iter()
            .filter_map(|c| {
                let x = primal.get(c.var.index()).copied().unwrap_or(0.0);
                if x > 1e-9 { Some((c.path.clone(), x)) } else { None }
            })
            .collect()
    }
}
