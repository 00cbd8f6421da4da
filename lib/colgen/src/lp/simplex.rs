//! Dense tableau simplex with Big-M artificials, plus a depth-first
//! branch-and-bound wrapper for the integer restoration solve. Bland's rule
//! keeps pivoting finite and deterministic; dual values are read off the
//! columns that formed the initial basis.

use anyhow::Result;
use tracing::*;

use crate::Error;
use super::{ConstrSense, LpBackend, LpModel, LpSolution, SolveStatus};

const EPS: f64 = 1e-9;
// entering threshold is looser than the pivot threshold: reduced costs mix
// Big-M terms, whose rounding noise sits well above machine epsilon
const RC_EPS: f64 = 1e-7;
const BIG_M: f64 = 1e7;
const INT_TOL: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct SimplexBackend {
    pub max_pivots: usize,
    pub max_nodes: usize,
}

impl Default for SimplexBackend {
    fn default() -> Self {
        SimplexBackend { max_pivots: 50_000, max_nodes: 20_000 }
    }
}

impl LpBackend for SimplexBackend {
    fn solve_lp(&mut self, model: &LpModel) -> Result<LpSolution> {
        self.lp_with_bounds(model, &[])
    }

    fn solve_mip(&mut self, model: &LpModel) -> Result<LpSolution> {
        let int_vars: Vec<usize> = model.vars().iter()
            .enumerate()
            .filter_map(|(j, v)| if v.integer { Some(j) } else { None })
            .collect();
        if int_vars.is_empty() {
            return self.solve_lp(model);
        }

        let mut stack: Vec<Vec<(usize, f64, f64)>> = vec![Vec::new()];
        let mut best: Option<(f64, Vec<f64>)> = None;
        let mut nodes = 0usize;

        while let Some(overrides) = stack.pop() {
            nodes += 1;
            if nodes > self.max_nodes {
                match best {
                    Some(_) => {
                        warn!(nodes, "node limit hit, returning incumbent");
                        break;
                    }
                    None => {
                        return Err(Error::BackendFailure(
                            format!("branch-and-bound node limit of {} exhausted", self.max_nodes)
                        ).into());
                    }
                }
            }

            let sol = self.lp_with_bounds(model, &overrides)?;
            match sol.status {
                SolveStatus::Infeasible => continue,
                SolveStatus::Unbounded => {
                    return Err(Error::BackendFailure("unbounded MIP relaxation".to_string()).into());
                }
                SolveStatus::Optimal => {}
            }
            if let Some((incumbent, _)) = &best {
                if sol.objective >= *incumbent - 1e-9 {
                    continue;
                }
            }

            let fractional = int_vars.iter()
                .filter_map(|&j| {
                    let x = sol.primal[j];
                    let f = (x - x.round()).abs();
                    if f > INT_TOL { Some((j, x, f)) } else { None }
                })
                .max_by(|a, b| a.2.total_cmp(&b.2));

            match fractional {
                None => {
                    trace!(objective = sol.objective, "new incumbent");
                    best = Some((sol.objective, sol.primal));
                }
                Some((j, x, _)) => {
                    let (lb, ub) = bounds_of(model, &overrides, j);
                    let mut up = overrides.clone();
                    up.push((j, x.ceil(), ub));
                    let mut down = overrides;
                    down.push((j, lb, x.floor()));
                    // down-branch explored first
                    stack.push(up);
                    stack.push(down);
                }
            }
        }

        let sol = match best {
            Some((objective, primal)) => LpSolution {
                status: SolveStatus::Optimal,
                objective,
                primal,
                dual: Vec::new(),
            },
            None => LpSolution {
                status: SolveStatus::Infeasible,
                objective: f64::INFINITY,
                primal: Vec::new(),
                dual: Vec::new(),
            },
        };
        return Ok(sol);
    }
}

fn bounds_of(model: &LpModel, overrides: &[(usize, f64, f64)], j: usize) -> (f64, f64) {
    let v = &model.vars()[j];
    let mut bounds = (v.lb, v.ub);
    for &(k, lb, ub) in overrides {
        if k == j {
            bounds = (lb, ub);
        }
    }
    return bounds;
}

struct Row {
    coeffs: Vec<f64>,
    sense: ConstrSense,
    rhs: f64,
    negated: bool,
}

impl SimplexBackend {
    fn lp_with_bounds(&self, model: &LpModel, overrides: &[(usize, f64, f64)]) -> Result<LpSolution> {
        let n = model.num_vars();
        let mut lb = vec![0.0; n];
        let mut ub = vec![f64::INFINITY; n];
        for (j, v) in model.vars().iter().enumerate() {
            debug_assert!(v.lb >= 0.0, "negative lower bounds are not supported");
            lb[j] = v.lb;
            ub[j] = v.ub;
        }
        for &(j, l, u) in overrides {
            lb[j] = l;
            ub[j] = u;
        }
        if (0..n).any(|j| lb[j] > ub[j] + EPS) {
            return Ok(LpSolution {
                status: SolveStatus::Infeasible,
                objective: f64::INFINITY,
                primal: Vec::new(),
                dual: Vec::new(),
            });
        }

        // model rows first (their duals are reported), bound rows after
        let mut rows = Vec::with_capacity(model.num_conss());
        for cons in model.conss() {
            rows.push(Row { coeffs: vec![0.0; n], sense: cons.sense, rhs: cons.rhs, negated: false });
        }
        for (j, v) in model.vars().iter().enumerate() {
            for &(cons, coef) in &v.col {
                rows[cons.index()].coeffs[j] += coef;
            }
        }
        for j in 0..n {
            if ub[j].is_finite() {
                let mut coeffs = vec![0.0; n];
                coeffs[j] = 1.0;
                rows.push(Row { coeffs, sense: ConstrSense::Le, rhs: ub[j], negated: false });
            }
            if lb[j] > EPS {
                let mut coeffs = vec![0.0; n];
                coeffs[j] = 1.0;
                rows.push(Row { coeffs, sense: ConstrSense::Ge, rhs: lb[j], negated: false });
            }
        }

        let obj: Vec<f64> = model.vars().iter().map(|v| v.obj).collect();
        self.solve_tableau(rows, &obj, model.num_conss())
    }

    fn solve_tableau(&self, mut rows: Vec<Row>, obj: &[f64], num_model_rows: usize) -> Result<LpSolution> {
        let n = obj.len();
        let m = rows.len();

        for row in &mut rows {
            if row.rhs < 0.0 {
                for c in &mut row.coeffs {
                    *c = -*c;
                }
                row.rhs = -row.rhs;
                row.negated = true;
                row.sense = match row.sense {
                    ConstrSense::Le => ConstrSense::Ge,
                    ConstrSense::Ge => ConstrSense::Le,
                    ConstrSense::Eq => ConstrSense::Eq,
                };
            }
        }

        // count auxiliary columns: slack/surplus per inequality, artificial
        // for >= and = rows
        let num_slack = rows.iter().filter(|r| r.sense != ConstrSense::Eq).count();
        let num_artificial = rows.iter().filter(|r| r.sense != ConstrSense::Le).count();
        let ncols = n + num_slack + num_artificial;

        let mut cost = vec![0.0; ncols];
        cost[..n].copy_from_slice(obj);

        let mut t: Vec<Vec<f64>> = Vec::with_capacity(m);
        let mut basis = vec![0usize; m];
        let mut init_col = vec![0usize; m];
        let mut is_artificial = vec![false; ncols];

        let mut next_slack = n;
        let mut next_artificial = n + num_slack;
        for (i, row) in rows.iter().enumerate() {
            let mut trow = vec![0.0; ncols + 1];
            trow[..n].copy_from_slice(&row.coeffs);
            trow[ncols] = row.rhs;
            match row.sense {
                ConstrSense::Le => {
                    trow[next_slack] = 1.0;
                    basis[i] = next_slack;
                    init_col[i] = next_slack;
                    next_slack += 1;
                }
                ConstrSense::Ge => {
                    trow[next_slack] = -1.0;
                    next_slack += 1;
                    trow[next_artificial] = 1.0;
                    cost[next_artificial] = BIG_M;
                    is_artificial[next_artificial] = true;
                    basis[i] = next_artificial;
                    init_col[i] = next_artificial;
                    next_artificial += 1;
                }
                ConstrSense::Eq => {
                    trow[next_artificial] = 1.0;
                    cost[next_artificial] = BIG_M;
                    is_artificial[next_artificial] = true;
                    basis[i] = next_artificial;
                    init_col[i] = next_artificial;
                    next_artificial += 1;
                }
            }
            t.push(trow);
        }

        let reduced_cost = |t: &[Vec<f64>], basis: &[usize], j: usize| -> f64 {
            let mut rc = cost[j];
            for i in 0..m {
                rc -= cost[basis[i]] * t[i][j];
            }
            return rc;
        };

        let mut pivots = 0usize;
        loop {
            // Bland's rule: smallest column index with negative reduced cost
            let entering = (0..ncols).find(|&j| reduced_cost(&t, &basis, j) < -RC_EPS);
            let entering = match entering {
                Some(j) => j,
                None => break,
            };

            let mut leaving: Option<usize> = None;
            let mut best_ratio = f64::INFINITY;
            for i in 0..m {
                if t[i][entering] > EPS {
                    let ratio = t[i][ncols] / t[i][entering];
                    if ratio < best_ratio - EPS
                        || (ratio < best_ratio + EPS
                            && leaving.map_or(true, |l| basis[i] < basis[l]))
                    {
                        best_ratio = ratio;
                        leaving = Some(i);
                    }
                }
            }
            let leaving = match leaving {
                Some(i) => i,
                None => {
                    return Ok(LpSolution {
                        status: SolveStatus::Unbounded,
                        objective: f64::NEG_INFINITY,
                        primal: Vec::new(),
                        dual: Vec::new(),
                    });
                }
            };

            pivot(&mut t, leaving, entering);
            basis[leaving] = entering;

            pivots += 1;
            if pivots > self.max_pivots {
                return Err(Error::BackendFailure(
                    format!("simplex pivot limit of {} exhausted", self.max_pivots)
                ).into());
            }
        }

        // a positive artificial at optimality certifies infeasibility
        for i in 0..m {
            if is_artificial[basis[i]] && t[i][ncols] > 1e-6 {
                return Ok(LpSolution {
                    status: SolveStatus::Infeasible,
                    objective: f64::INFINITY,
                    primal: Vec::new(),
                    dual: Vec::new(),
                });
            }
        }

        // pivot degenerate artificials out of the basis so the duals read
        // from the initial-identity columns are free of Big-M terms
        for i in 0..m {
            if is_artificial[basis[i]] {
                let col = (0..ncols)
                    .filter(|&j| !is_artificial[j] && t[i][j].abs() > EPS)
                    .min_by(|&a, &b| {
                        reduced_cost(&t, &basis, a).abs().total_cmp(&reduced_cost(&t, &basis, b).abs())
                    });
                match col {
                    Some(j) => {
                        pivot(&mut t, i, j);
                        basis[i] = j;
                    }
                    None => trace!(row = i, "redundant row, artificial stays basic at zero"),
                }
            }
        }

        let mut primal = vec![0.0; n];
        for i in 0..m {
            if basis[i] < n {
                primal[basis[i]] = t[i][ncols];
            }
        }
        let objective: f64 = (0..n).map(|j| obj[j] * primal[j]).sum();

        let mut dual = Vec::with_capacity(num_model_rows);
        for (i, row) in rows.iter().enumerate().take(num_model_rows) {
            let mut y = 0.0;
            for k in 0..m {
                y += cost[basis[k]] * t[k][init_col[i]];
            }
            dual.push(if row.negated { -y } else { y });
        }

        return Ok(LpSolution {
            status: SolveStatus::Optimal,
            objective,
            primal,
            dual,
        });
    }
}

fn pivot(t: &mut [Vec<f64>], row: usize, col: usize) {
    let p = t[row][col];
    debug_assert!(p.abs() > EPS);
    for v in &mut t[row] {
        *v /= p;
    }
    let ncols = t[row].len();
    for i in 0..t.len() {
        if i != row {
            let factor = t[i][col];
            if factor.abs() > EPS {
                for j in 0..ncols {
                    t[i][j] -= factor * t[row][j];
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lp::{ConstrSense, LpModel};

    fn backend() -> SimplexBackend {
        SimplexBackend::default()
    }

    #[test]
    fn covering_lp_with_duals() {
        let mut m = LpModel::new("cover");
        let row = m.add_constr("cover", ConstrSense::Ge, 1.0);
        m.add_var("x1", 1.0, 0.0, 1.0, false, &[(row, 1.0)]);
        m.add_var("x2", 1.0, 0.0, 1.0, false, &[(row, 1.0)]);
        let sol = backend().solve_lp(&m).unwrap();
        assert_eq!(sol.status, SolveStatus::Optimal);
        assert!((sol.objective - 1.0).abs() < 1e-6);
        assert!((sol.dual[0] - 1.0).abs() < 1e-6);
        assert!((sol.primal.iter().sum::<f64>() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn binding_upper_bound() {
        // min 2a + 3b  s.t.  a + b >= 2,  a <= 1, b <= 2
        let mut m = LpModel::new("ub");
        let row = m.add_constr("cover", ConstrSense::Ge, 2.0);
        m.add_var("a", 2.0, 0.0, 1.0, false, &[(row, 1.0)]);
        m.add_var("b", 3.0, 0.0, 2.0, false, &[(row, 1.0)]);
        let sol = backend().solve_lp(&m).unwrap();
        assert_eq!(sol.status, SolveStatus::Optimal);
        assert!((sol.objective - 5.0).abs() < 1e-6);
        assert!((sol.primal[0] - 1.0).abs() < 1e-6);
        assert!((sol.primal[1] - 1.0).abs() < 1e-6);
        // b is basic in the cover row, so its reduced cost pins the dual
        assert!((sol.dual[0] - 3.0).abs() < 1e-6);
    }

    #[test]
    fn equality_constraint() {
        // min a + b  s.t.  a + 2b = 4
        let mut m = LpModel::new("eq");
        let row = m.add_constr("eq", ConstrSense::Eq, 4.0);
        m.add_var("a", 1.0, 0.0, 10.0, false, &[(row, 1.0)]);
        m.add_var("b", 1.0, 0.0, 10.0, false, &[(row, 2.0)]);
        let sol = backend().solve_lp(&m).unwrap();
        assert_eq!(sol.status, SolveStatus::Optimal);
        assert!((sol.objective - 2.0).abs() < 1e-6);
        assert!((sol.primal[1] - 2.0).abs() < 1e-6);
        assert!((sol.dual[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn negated_row_dual_sign() {
        // min x  s.t.  -x <= -2   (x >= 2)
        let mut m = LpModel::new("neg");
        let row = m.add_constr("neg", ConstrSense::Le, -2.0);
        m.add_var("x", 1.0, 0.0, 10.0, false, &[(row, -1.0)]);
        let sol = backend().solve_lp(&m).unwrap();
        assert_eq!(sol.status, SolveStatus::Optimal);
        assert!((sol.objective - 2.0).abs() < 1e-6);
        assert!((sol.dual[0] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn infeasible_detected() {
        let mut m = LpModel::new("inf");
        let row = m.add_constr("high", ConstrSense::Ge, 2.0);
        m.add_var("x", 1.0, 0.0, 1.0, false, &[(row, 1.0)]);
        let sol = backend().solve_lp(&m).unwrap();
        assert_eq!(sol.status, SolveStatus::Infeasible);
    }

    #[test]
    fn unbounded_detected() {
        let mut m = LpModel::new("unb");
        m.add_var("x", -1.0, 0.0, f64::INFINITY, false, &[]);
        let sol = backend().solve_lp(&m).unwrap();
        assert_eq!(sol.status, SolveStatus::Unbounded);
    }

    #[test]
    fn degenerate_covering() {
        // two rows covered by the same column; duals split the cost
        let mut m = LpModel::new("deg");
        let r1 = m.add_constr("c1", ConstrSense::Ge, 1.0);
        let r2 = m.add_constr("c2", ConstrSense::Ge, 1.0);
        m.add_var("both", 3.0, 0.0, 1.0, false, &[(r1, 1.0), (r2, 1.0)]);
        m.add_var("one", 2.0, 0.0, 1.0, false, &[(r1, 1.0)]);
        let sol = backend().solve_lp(&m).unwrap();
        assert_eq!(sol.status, SolveStatus::Optimal);
        assert!((sol.objective - 3.0).abs() < 1e-6);
        assert!((sol.dual[0] + sol.dual[1] - 3.0).abs() < 1e-6);
        assert!(sol.dual.iter().all(|&y| y >= -1e-9));
    }

    #[test]
    fn mip_rounds_up() {
        // LP relaxation is 1.5; integrality forces both to one
        let mut m = LpModel::new("mip");
        let row = m.add_constr("cover", ConstrSense::Ge, 1.5);
        m.add_var("x1", 1.0, 0.0, 1.0, true, &[(row, 1.0)]);
        m.add_var("x2", 1.0, 0.0, 1.0, true, &[(row, 1.0)]);
        let sol = backend().solve_mip(&m).unwrap();
        assert_eq!(sol.status, SolveStatus::Optimal);
        assert!((sol.objective - 2.0).abs() < 1e-6);
        assert!(sol.primal.iter().all(|&x| (x - x.round()).abs() < 1e-6));
    }

    #[test]
    fn mip_packing() {
        // max x1 + x2 (as min of the negation) with x1 + x2 <= 1, binary
        let mut m = LpModel::new("pack");
        let row = m.add_constr("pack", ConstrSense::Le, 1.0);
        m.add_var("x1", -1.0, 0.0, 1.0, true, &[(row, 1.0)]);
        m.add_var("x2", -1.0, 0.0, 1.0, true, &[(row, 1.0)]);
        let sol = backend().solve_mip(&m).unwrap();
        assert_eq!(sol.status, SolveStatus::Optimal);
        assert!((sol.objective + 1.0).abs() < 1e-6);
        assert!((sol.primal[0] + sol.primal[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn mip_infeasible() {
        let mut m = LpModel::new("mipinf");
        let row = m.add_constr("high", ConstrSense::Ge, 3.0);
        m.add_var("x", 1.0, 0.0, 1.0, true, &[(row, 1.0)]);
        m.add_var("y", 1.0, 0.0, 1.0, true, &[(row, 1.0)]);
        let sol = backend().solve_mip(&m).unwrap();
        assert_eq!(sol.status, SolveStatus::Infeasible);
    }

    #[test]
    fn mip_without_integers_is_lp() {
        let mut m = LpModel::new("relax");
        let row = m.add_constr("cover", ConstrSense::Ge, 1.5);
        m.add_var("x1", 1.0, 0.0, 1.0, false, &[(row, 1.0)]);
        m.add_var("x2", 1.0, 0.0, 1.0, false, &[(row, 1.0)]);
        let sol = backend().solve_mip(&m).unwrap();
        assert!((sol.objective - 1.5).abs() < 1e-6);
    }
}
