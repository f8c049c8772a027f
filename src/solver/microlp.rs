use super::{Backend, Solution, SolverConfig, SolverError, Status};
use crate::models::lp_problem::LpProblem;
use good_lp::{
    solvers::microlp::microlp, IntoAffineExpression, ResolutionError, Solution as _, SolverModel,
};
use log::{debug, trace};
use std::collections::HashMap;

/// Pure-Rust branch-and-bound solver, through good_lp. Always available.
#[derive(Debug, Default)]
pub struct MicrolpBackend;

impl MicrolpBackend {
    pub fn new(config: &SolverConfig) -> Self {
        if *config != SolverConfig::default() {
            debug!("microlp does not support solver parameters, ignoring {:?}", config);
        }
        MicrolpBackend
    }
}

impl Backend for MicrolpBackend {
    fn name(&self) -> &'static str {
        "microlp"
    }

    fn solve(&mut self, problem: LpProblem) -> Result<Solution, SolverError> {
        let vars = problem.variables();
        let objective = problem.objective().clone();
        trace!("handing {} to microlp", problem);

        match problem.into_model(microlp).solve() {
            Ok(solution) => {
                let values = vars
                    .into_iter()
                    .map(|v| (v, solution.value(v)))
                    .collect::<HashMap<_, _>>();
                Ok(Solution {
                    status: Status::Optimal,
                    objective: Some((&objective).eval_with(&values)),
                    values: Some(values),
                })
            }
            Err(ResolutionError::Infeasible) => Ok(Solution::without_values(Status::Infeasible)),
            Err(ResolutionError::Unbounded) => Ok(Solution::without_values(Status::Unbounded)),
            Err(err) => Err(SolverError::Backend {
                backend: "microlp",
                message: err.to_string(),
            }),
        }
    }
}
