use super::{Backend, Solution, SolverConfig, SolverError, Status};
use crate::models::lp_problem::{LpProblem, Sense};
use good_lp::{Expression, IntoAffineExpression, Variable};
use grb::{attr, c, expr::GurobiSum, param, Env, Expr, Model, Status as GrbStatus, Var, VarType};
use log::{debug, info};
use std::{collections::HashMap, f64::INFINITY};

impl From<grb::Error> for SolverError {
    fn from(err: grb::Error) -> Self {
        SolverError::Backend {
            backend: "gurobi",
            message: err.to_string(),
        }
    }
}

/// Gurobi through the `grb` bindings.
///
/// The licence and environment live in the [`Env`] owned by this backend: it is
/// started in [`GurobiBackend::new`], shared by every model solved with this
/// backend, and released when the backend is dropped.
pub struct GurobiBackend {
    env: Env,
}

impl GurobiBackend {
    pub fn new(config: SolverConfig) -> Result<GurobiBackend, SolverError> {
        let mut env = Env::new("")?;
        env.set(param::OutputFlag, if config.verbose { 1 } else { 0 })?;
        if let Some(limit) = config.time_limit {
            env.set(param::TimeLimit, limit)?;
        }
        if let Some(gap) = config.mip_gap {
            env.set(param::MIPGap, gap)?;
        }
        if let Some(threads) = config.threads {
            env.set(param::Threads, threads as i32)?;
        }
        debug!("Started Gurobi environment with {:?}", config);

        Ok(GurobiBackend { env })
    }

    /// Translates `problem` into a Gurobi model owned by this backend's environment
    fn build(&self, problem: &LpProblem) -> grb::Result<(Model, HashMap<Variable, Var>)> {
        let mut model = Model::with_env(problem.name(), &self.env)?;

        let mut vars = HashMap::with_capacity(problem.num_vars());
        for var in problem.variables() {
            let (vtype, ub) = match problem.is_binary(var) {
                true => (VarType::Binary, 1.0),
                false => (VarType::Continuous, INFINITY),
            };
            let handle = model.add_var(&problem.var_name(var), vtype, 0.0, 0.0, ub, std::iter::empty())?;
            vars.insert(var, handle);
        }

        // integrate all the variables into the model
        model.update()?;

        let linear = |expr: &Expression| -> Expr {
            expr.linear_coefficients()
                .into_iter()
                .map(|(v, coeff)| coeff * vars[&v])
                .grb_sum()
        };

        for row in problem.rows() {
            let lhs = linear(&row.lhs);
            let rhs = row.rhs - (&row.lhs).constant();
            let ineq = match row.sense {
                Sense::Le => c!(lhs <= rhs),
                Sense::Eq => c!(lhs == rhs),
            };
            model.add_constr(&row.name, ineq)?;
        }

        let objective = linear(problem.objective()) + problem.objective().constant();
        model.set_objective(objective, grb::ModelSense::Minimize)?;

        model.update()?;

        Ok((model, vars))
    }

    /// Writes `problem` to `path`. Gurobi picks the format from the extension (`.lp`, `.mps`, ...).
    pub fn write(&self, problem: &LpProblem, path: &str) -> Result<(), SolverError> {
        let (model, _) = self.build(problem)?;
        model.write(path)?;
        info!("Wrote {} to {}", problem.name(), path);
        Ok(())
    }
}

impl Backend for GurobiBackend {
    fn name(&self) -> &'static str {
        "gurobi"
    }

    fn solve(&mut self, problem: LpProblem) -> Result<Solution, SolverError> {
        let (mut model, vars) = self.build(&problem)?;

        model.optimize()?;

        let status = match model.status()? {
            GrbStatus::Optimal => Status::Optimal,
            GrbStatus::Infeasible => Status::Infeasible,
            GrbStatus::Unbounded => Status::Unbounded,
            GrbStatus::InfOrUnbd => Status::InfeasibleOrUnbounded,
            GrbStatus::TimeLimit => Status::TimeLimit,
            other => Status::Other(format!("{:?}", other)),
        };
        info!("Gurobi finished with status {}", status);

        if model.get_attr(attr::SolCount)? == 0 {
            return Ok(Solution::without_values(status));
        }

        let mut values = HashMap::with_capacity(vars.len());
        for (var, handle) in &vars {
            values.insert(*var, model.get_obj_attr(attr::X, handle)?);
        }

        Ok(Solution {
            status,
            objective: Some(model.get_attr(attr::ObjVal)?),
            values: Some(values),
        })
    }
}
