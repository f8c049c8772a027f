//! Solvers that an [`LpProblem`] can be handed to.
//!
//! Every backend owns whatever process-wide state its solver needs (licences,
//! environments) for as long as the backend lives, and releases it on drop.

#[cfg(feature = "gurobi")]
pub mod gurobi;
pub mod microlp;

use crate::models::lp_problem::LpProblem;
use derive_more::Display;
use good_lp::Variable;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::Path};

#[cfg(feature = "gurobi")]
pub use self::gurobi::GurobiBackend;
pub use self::microlp::MicrolpBackend;

/// Termination status reported by a backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum Status {
    Optimal,
    Infeasible,
    Unbounded,
    InfeasibleOrUnbounded,
    /// The time limit was reached. A solution is available if one was found before that.
    TimeLimit,
    #[display(fmt = "{}", _0)]
    Other(String),
}

/// The outcome of a solve. `values` holds every variable of the problem when a
/// solution is available and is `None` otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub status: Status,
    pub objective: Option<f64>,
    pub values: Option<HashMap<Variable, f64>>,
}

impl Solution {
    pub fn without_values(status: Status) -> Solution {
        Solution {
            status,
            objective: None,
            values: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Display)]
pub enum SolverError {
    /// The requested backend is not compiled into this build
    #[display(fmt = "solver backend `{}` is not available in this build", _0)]
    Unavailable(String),
    /// An error reported by the underlying solver library
    #[display(fmt = "{} error: {}", backend, message)]
    Backend {
        backend: &'static str,
        message: String,
    },
    #[display(fmt = "invalid solver configuration: {}", _0)]
    Config(String),
}

impl std::error::Error for SolverError {}

/// Tuning parameters. A backend ignores whatever it cannot honour.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverConfig {
    /// Time limit in seconds
    pub time_limit: Option<f64>,
    /// Relative MIP optimality gap
    pub mip_gap: Option<f64>,
    /// Number of threads the solver may use
    pub threads: Option<usize>,
    /// Let the solver print its own log
    pub verbose: bool,
}

impl SolverConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<SolverConfig, SolverError> {
        let file =
            std::fs::File::open(path).map_err(|e| SolverError::Config(e.to_string()))?;
        let reader = std::io::BufReader::new(file);
        serde_json::from_reader(reader).map_err(|e| SolverError::Config(e.to_string()))
    }
}

pub trait Backend {
    /// Name of the backend, used in logs
    fn name(&self) -> &'static str;

    /// Optimize `problem`. Infeasibility and unboundedness are reported through [`Status`],
    /// errors are reserved for failures of the solver itself.
    fn solve(&mut self, problem: LpProblem) -> Result<Solution, SolverError>;
}

/// The backends a binary can choose between at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[display(fmt = "microlp")]
    Microlp,
    #[display(fmt = "gurobi")]
    Gurobi,
}

impl std::str::FromStr for BackendKind {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "microlp" => Ok(BackendKind::Microlp),
            "gurobi" => Ok(BackendKind::Gurobi),
            other => Err(SolverError::Unavailable(other.to_string())),
        }
    }
}

/// Creates the backend of the given kind
pub fn backend(kind: BackendKind, config: SolverConfig) -> Result<Box<dyn Backend>, SolverError> {
    match kind {
        BackendKind::Microlp => Ok(Box::new(MicrolpBackend::new(&config))),
        #[cfg(feature = "gurobi")]
        BackendKind::Gurobi => Ok(Box::new(GurobiBackend::new(config)?)),
        #[cfg(not(feature = "gurobi"))]
        BackendKind::Gurobi => Err(SolverError::Unavailable(kind.to_string())),
    }
}
