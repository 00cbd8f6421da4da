use anyhow::Result;
use tracing::*;

use crate::{Error, Map};
use crate::data::Node;
use crate::lp::{Cons, ConstrSense, LpBackend, LpModel, SolveStatus, Var};

/// Objective coefficient of a seed slack. Any real column is cheaper, so a
/// slack only stays basic while no route covers its customer.
pub const SLACK_COST: f64 = 1e6;

/// A route column of the master problem. Columns are never removed.
#[derive(Debug, Clone)]
pub struct Column {
    pub path: Vec<Node>,
    pub cost: f64,
    pub var: Var,
}

/// Solution of the LP relaxation: objective, per-variable primals, and the
/// dual price of every covering row (plus the fleet row's, if present).
#[derive(Debug, Clone)]
pub struct MasterSolution {
    pub objective: f64,
    pub primal: Vec<f64>,
    pub duals: Map<Node, f64>,
    pub fleet_dual: Option<f64>,
}

/// The restricted master problem: a set-covering LP over the known routes,
/// one `>= 1` row per customer and optionally a fleet-size row.
pub struct SetCoveringMaster {
    model: LpModel,
    columns: Vec<Column>,
    cover_rows: Vec<Cons>,
    fleet_row: Option<Cons>,
    num_customers: usize,
}

impl SetCoveringMaster {
    pub fn new(num_customers: usize, fleet_limit: Option<usize>) -> Self {
        let mut model = LpModel::new("set_covering_master");
        let cover_rows = (1..=num_customers)
            .map(|i| model.add_constr(format!("cover_{}", i), ConstrSense::Ge, 1.0))
            .collect();
        let fleet_row = fleet_limit.map(|k| {
            model.add_constr("fleet", ConstrSense::Le, k as f64)
        });
        return SetCoveringMaster {
            model,
            columns: Vec::new(),
            cover_rows,
            fleet_row,
            num_customers,
        };
    }

    fn cover_row(&self, customer: Node) -> Cons {
        debug_assert!(0 < customer && (customer as usize) <= self.num_customers);
        self.cover_rows[customer as usize - 1]
    }

    /// Add a route as a nonnegative column with its true cost. Keeping
    /// columns unbounded above (rather than `<= 1`) means every variable
    /// has nonnegative reduced cost at LP optimality, so pricing can never
    /// regenerate a column the master already owns.
    pub fn add_column(&mut self, path: Vec<Node>, cost: f64) -> Var {
        debug_assert!(path.len() >= 2);
        let mut col: Vec<(Cons, f64)> = path[1..path.len() - 1].iter()
            .map(|&i| (self.cover_row(i), 1.0))
            .collect();
        if let Some(fleet) = self.fleet_row {
            col.push((fleet, 1.0));
        }
        let var = self.model.add_var(
            format!("p_{}", self.columns.len()),
            cost,
            0.0,
            f64::INFINITY,
            false,
            &col,
        );
        trace!(?path, cost, var = var.index(), "column added");
        self.columns.push(Column { path, cost, var });
        return var;
    }

    /// Big-M slack keeping the RMP feasible when a customer has no seed
    /// route. Slacks are not columns; they never appear in the output.
    pub fn add_slack(&mut self, customer: Node) -> Var {
        let row = self.cover_row(customer);
        debug!(customer, "seeding slack");
        self.model.add_var(
            format!("slack_{}", customer),
            SLACK_COST,
            0.0,
            f64::INFINITY,
            false,
            &[(row, 1.0)],
        )
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn solve_relaxation(&self, backend: &mut dyn LpBackend) -> Result<MasterSolution> {
        let sol = backend.solve_lp(&self.model)?;
        match sol.status {
            SolveStatus::Optimal => {}
            SolveStatus::Infeasible => return Err(Error::InfeasibleMaster.into()),
            SolveStatus::Unbounded => {
                return Err(Error::BackendFailure("unbounded master LP".to_string()).into());
            }
        }

        let duals: Map<Node, f64> = self.cover_rows.iter()
            .enumerate()
            .map(|(k, row)| ((k + 1) as Node, sol.dual[row.index()]))
            .collect();
        let fleet_dual = self.fleet_row.map(|row| sol.dual[row.index()]);

        return Ok(MasterSolution {
            objective: sol.objective,
            primal: sol.primal,
            duals,
            fleet_dual,
        });
    }

    /// Solve the RMP with integral route variables (the final restoration
    /// step). Duals are meaningless here and not returned.
    pub fn solve_integer(&self, backend: &mut dyn LpBackend) -> Result<(f64, Vec<f64>)> {
        let sol = backend.solve_mip(&self.model.as_integer())?;
        match sol.status {
            SolveStatus::Optimal => Ok((sol.objective, sol.primal)),
            SolveStatus::Infeasible => Err(Error::InfeasibleMaster.into()),
            SolveStatus::Unbounded => {
                Err(Error::BackendFailure("unbounded integer master".to_string()).into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lp::SimplexBackend;

    #[test]
    fn trivial_seed_duals() {
        let mut master = SetCoveringMaster::new(3, None);
        for i in 1..=3u16 {
            master.add_column(vec![0, i, 4], 2.0 * i as f64);
        }
        let sol = master.solve_relaxation(&mut SimplexBackend::default()).unwrap();
        assert!((sol.objective - 12.0).abs() < 1e-6);
        // every trivial column is basic at one, so its dual is its cost
        for i in 1..=3u16 {
            assert!((sol.duals[&i] - 2.0 * i as f64).abs() < 1e-6);
        }
        assert!(sol.fleet_dual.is_none());
    }

    #[test]
    fn slack_keeps_master_feasible() {
        let mut master = SetCoveringMaster::new(2, None);
        master.add_column(vec![0, 1, 3], 4.0);
        master.add_slack(2);
        let sol = master.solve_relaxation(&mut SimplexBackend::default()).unwrap();
        assert!((sol.objective - (4.0 + SLACK_COST)).abs() < 1e-3);
    }

    #[test]
    fn better_column_displaces_seeds() {
        let mut master = SetCoveringMaster::new(2, None);
        master.add_column(vec![0, 1, 3], 4.0);
        master.add_column(vec![0, 2, 3], 4.0);
        master.add_column(vec![0, 1, 2, 3], 5.0);
        let sol = master.solve_relaxation(&mut SimplexBackend::default()).unwrap();
        assert!((sol.objective - 5.0).abs() < 1e-6);
        assert!((sol.primal[2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn fleet_row_prices_departures() {
        // two customers, two vehicles allowed but only one needed
        let mut master = SetCoveringMaster::new(2, Some(1));
        master.add_column(vec![0, 1, 3], 4.0);
        master.add_column(vec![0, 2, 3], 4.0);
        master.add_column(vec![0, 1, 2, 3], 6.0);
        let sol = master.solve_relaxation(&mut SimplexBackend::default()).unwrap();
        // singles together would break the fleet row
        assert!((sol.objective - 6.0).abs() < 1e-6);
        let fleet_dual = sol.fleet_dual.unwrap();
        assert!(fleet_dual <= 1e-9);
    }

    #[test]
    fn integer_restoration() {
        let mut master = SetCoveringMaster::new(3, None);
        // fractional LP optimum: three pair-routes at one half each
        master.add_column(vec![0, 1, 2, 4], 2.0);
        master.add_column(vec![0, 2, 3, 4], 2.0);
        master.add_column(vec![0, 1, 3, 4], 2.0);
        master.add_column(vec![0, 1, 4], 1.5);
        let mut backend = SimplexBackend::default();
        let lp = master.solve_relaxation(&mut backend).unwrap();
        assert!((lp.objective - 3.0).abs() < 1e-6);
        let (mip_obj, primal) = master.solve_integer(&mut backend).unwrap();
        assert!(mip_obj >= lp.objective - 1e-9);
        assert!(primal.iter().all(|&x| (x - x.round()).abs() < 1e-6));
    }
}
