use derive_more::Display;
use good_lp::{
    constraint, variable, Constraint, Expression, IntoAffineExpression, ProblemVariables, Solution,
    Solver, SolverModel, Variable,
};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Sense {
    #[display(fmt = "<=")]
    Le,
    #[display(fmt = "=")]
    Eq,
}

/// The coefficient of `var` in `expr`, 0 if it does not appear
pub fn coefficient(expr: &Expression, var: Variable) -> f64 {
    expr.linear_coefficients()
        .into_iter()
        .filter(|&(v, _)| v == var)
        .map(|(_, coeff)| coeff)
        .sum()
}

/// Number of variables with a non-zero coefficient in `expr`
pub fn num_terms(expr: &Expression) -> usize {
    expr.linear_coefficients()
        .into_iter()
        .filter(|&(_, coeff)| coeff != 0.0)
        .count()
}

/// A named constraint `lhs <sense> rhs`. good_lp's `Constraint` can not be
/// inspected once created, so rows keep their parts until they are handed to a solver.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub name: String,
    pub lhs: Expression,
    pub sense: Sense,
    pub rhs: f64,
}

impl Row {
    pub fn constraint(&self) -> Constraint {
        let lhs = self.lhs.clone();
        let rhs = self.rhs;
        let constraint = match self.sense {
            Sense::Le => constraint!(lhs <= rhs),
            Sense::Eq => constraint!(lhs == rhs),
        };
        constraint.set_name(self.name.clone())
    }

    /// The coefficient of `var` on the left hand side, 0 if it does not appear
    pub fn coefficient(&self, var: Variable) -> f64 {
        coefficient(&self.lhs, var)
    }

    pub fn num_terms(&self) -> usize {
        num_terms(&self.lhs)
    }

    /// Whether the row holds for `values`, up to `tol`
    pub fn holds<S: Solution>(&self, values: &S, tol: f64) -> bool {
        let lhs = (&self.lhs).eval_with(values);
        match self.sense {
            Sense::Le => lhs <= self.rhs + tol,
            Sense::Eq => (lhs - self.rhs).abs() <= tol,
        }
    }
}

/// Variables, objective and rows of a minimisation problem, before it is handed to a solver.
///
/// Continuous variables are non-negative and the rest are binary, which is all the
/// facility location model needs. Backends rely on this when translating the problem.
pub struct LpProblem {
    name: String,
    variables: ProblemVariables,
    binaries: Vec<Variable>,
    objective: Expression,
    rows: Vec<Row>,
}

impl std::fmt::Debug for LpProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LpProblem")
            .field("name", &self.name)
            .field("binaries", &self.binaries)
            .field("objective", &self.objective)
            .field("rows", &self.rows)
            .finish_non_exhaustive()
    }
}

impl LpProblem {
    pub fn new(name: &str) -> LpProblem {
        LpProblem {
            name: name.to_string(),
            variables: ProblemVariables::new(),
            binaries: Vec::new(),
            objective: Expression::default(),
            rows: Vec::new(),
        }
    }

    /// Adds a continuous non-negative variable
    pub fn add_cont(&mut self, name: String) -> Variable {
        self.variables.add(variable().min(0).name(name))
    }

    pub fn add_binary(&mut self, name: String) -> Variable {
        let var = self.variables.add(variable().binary().name(name));
        self.binaries.push(var);
        var
    }

    pub fn add_row(&mut self, name: String, lhs: Expression, sense: Sense, rhs: f64) {
        self.rows.push(Row {
            name,
            lhs,
            sense,
            rhs,
        });
    }

    pub fn set_objective(&mut self, objective: Expression) {
        self.objective = objective;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn objective(&self) -> &Expression {
        &self.objective
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, name: &str) -> Option<&Row> {
        self.rows.iter().find(|row| row.name == name)
    }

    /// Handles to every variable, in the order they were added
    pub fn variables(&self) -> Vec<Variable> {
        self.variables
            .iter_variables_with_def()
            .map(|(var, _)| var)
            .collect()
    }

    pub fn num_vars(&self) -> usize {
        self.variables.len()
    }

    pub fn num_binary(&self) -> usize {
        self.binaries.len()
    }

    pub fn is_binary(&self, var: Variable) -> bool {
        self.binaries.contains(&var)
    }

    pub fn var_name(&self, var: Variable) -> String {
        self.variables.display(&var).to_string()
    }

    /// Looks a variable up by name
    pub fn var(&self, name: &str) -> Option<Variable> {
        self.variables().into_iter().find(|&var| self.var_name(var) == name)
    }

    /// Renders a row with variable names, e.g. `demand[R1]: x[DC1,R1] + x[DC2,R1] = 30`
    pub fn display_row(&self, row: &Row) -> String {
        format!(
            "{}: {} {} {}",
            row.name,
            self.variables.display(&row.lhs),
            row.sense,
            row.rhs
        )
    }

    /// Hands the problem to a good_lp solver, with every row added as a constraint
    pub fn into_model<S: Solver>(self, solver: S) -> S::Model {
        let mut model = self.variables.minimise(self.objective).using(solver);
        for row in &self.rows {
            model.add_constraint(row.constraint());
        }
        model
    }
}

impl fmt::Display for LpProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} variables ({} binary), {} constraints",
            self.name,
            self.num_vars(),
            self.num_binary(),
            self.rows.len()
        )
    }
}
