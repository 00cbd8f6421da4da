//! Minimal LP/MIP modeling layer and the backend capability the master
//! problem is solved through. The backend trait is the pluggable boundary:
//! [`SimplexBackend`] is self-contained, and a binding to a commercial
//! solver can implement the same trait.

use anyhow::Result;

pub mod simplex;
pub use simplex::SimplexBackend;

/// Handle to a variable of an [`LpModel`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Var(pub(crate) usize);

impl Var {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Handle to a constraint of an [`LpModel`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Cons(pub(crate) usize);

impl Cons {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ConstrSense {
    Le,
    Eq,
    Ge,
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub obj: f64,
    pub lb: f64,
    pub ub: f64,
    pub integer: bool,
    /// Nonzero column coefficients, keyed by constraint.
    pub col: Vec<(Cons, f64)>,
}

#[derive(Debug, Clone)]
pub struct Constraint {
    pub name: String,
    pub sense: ConstrSense,
    pub rhs: f64,
}

/// Column-oriented minimisation model. Constraints are added first; each
/// variable carries its own column, which is the natural shape for column
/// generation.
#[derive(Debug, Clone, Default)]
pub struct LpModel {
    pub name: String,
    vars: Vec<Variable>,
    conss: Vec<Constraint>,
}

impl LpModel {
    pub fn new(name: &str) -> Self {
        LpModel { name: name.to_string(), vars: Vec::new(), conss: Vec::new() }
    }

    pub fn add_constr(&mut self, name: impl Into<String>, sense: ConstrSense, rhs: f64) -> Cons {
        let id = Cons(self.conss.len());
        self.conss.push(Constraint { name: name.into(), sense, rhs });
        return id;
    }

    pub fn add_var(
        &mut self,
        name: impl Into<String>,
        obj: f64,
        lb: f64,
        ub: f64,
        integer: bool,
        col: &[(Cons, f64)],
    ) -> Var {
        debug_assert!(col.iter().all(|(c, _)| c.index() < self.conss.len()));
        let id = Var(self.vars.len());
        self.vars.push(Variable {
            name: name.into(),
            obj,
            lb,
            ub,
            integer,
            col: col.to_vec(),
        });
        return id;
    }

    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    pub fn num_conss(&self) -> usize {
        self.conss.len()
    }

    pub fn vars(&self) -> &[Variable] {
        &self.vars
    }

    pub fn conss(&self) -> &[Constraint] {
        &self.conss
    }

    /// Copy of the model with every variable declared integer; used for the
    /// final restoration solve.
    pub fn as_integer(&self) -> LpModel {
        let mut m = self.clone();
        for v in &mut m.vars {
            v.integer = true;
        }
        return m;
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    Unbounded,
}

/// Primal/dual solution of a solve. `dual` is indexed like the model's
/// constraints and is empty for MIP solves.
#[derive(Debug, Clone)]
pub struct LpSolution {
    pub status: SolveStatus,
    pub objective: f64,
    pub primal: Vec<f64>,
    pub dual: Vec<f64>,
}

/// Abstract LP/MIP capability: solve the relaxation reading primals and
/// duals, or solve with integrality enforced.
pub trait LpBackend {
    fn solve_lp(&mut self, model: &LpModel) -> Result<LpSolution>;
    fn solve_mip(&mut self, model: &LpModel) -> Result<LpSolution>;
}
