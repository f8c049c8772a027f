use super::sets_and_parameters::{Parameters, Sets};
use crate::models::lp_problem::{LpProblem, Sense};
use crate::models::utils::{AddVars, ConvertVars};
use crate::problem::{Cost, DcIndex, PlantIndex, Problem, Quantity, RdcIndex};
use crate::solver::{Backend, Solution, SolverError, Status};
use derive_more::{Display, From};
use good_lp::{Expression, Variable};
use itertools::iproduct;
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};
use typed_index_collections::TiVec;

/// Values below this are treated as zero when reporting flows
const FLOW_EPS: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Display)]
pub enum BuildError {
    /// A set refers to an index that has no parameter value
    #[display(fmt = "no {} for index {}", what, index)]
    MissingParameter { what: &'static str, index: usize },
    /// Variables are stored densely, so every set must be `0..n` in order
    #[display(fmt = "the set of {} must be contiguous and start at 0", _0)]
    NonContiguousSet(&'static str),
}

impl std::error::Error for BuildError {}

#[derive(Debug, Clone, PartialEq, Display, From)]
pub enum SolveError {
    #[display(fmt = "{}", _0)]
    Build(BuildError),
    #[display(fmt = "{}", _0)]
    Solver(SolverError),
}

impl std::error::Error for SolveError {}

fn get<'a, K, V>(what: &'static str, values: &'a TiVec<K, V>, key: K) -> Result<&'a V, BuildError>
where
    K: From<usize> + Into<usize> + Copy,
{
    values.get(key).ok_or(BuildError::MissingParameter {
        what,
        index: key.into(),
    })
}

fn contiguous<K: Into<usize> + Copy>(what: &'static str, set: &[K]) -> Result<(), BuildError> {
    match set.iter().enumerate().all(|(n, &k)| Into::<usize>::into(k) == n) {
        true => Ok(()),
        false => Err(BuildError::NonContiguousSet(what)),
    }
}

/// Handles to the three variable families of a built model
#[derive(Debug, Clone, PartialEq)]
pub struct Variables {
    /// quantity shipped from DC i to RDC j
    pub x: TiVec<DcIndex, TiVec<RdcIndex, Variable>>,
    /// 1 if DC i is opened, 0 otherwise
    pub y: TiVec<DcIndex, Variable>,
    /// quantity shipped from plant p to DC i
    pub z: TiVec<PlantIndex, TiVec<DcIndex, Variable>>,
}

impl Variables {
    pub fn x(&self, i: DcIndex, j: RdcIndex) -> Variable {
        self.x[i][j]
    }

    pub fn y(&self, i: DcIndex) -> Variable {
        self.y[i]
    }

    pub fn z(&self, p: PlantIndex, i: DcIndex) -> Variable {
        self.z[p][i]
    }
}

pub struct FacilityLocationModel {}

#[allow(non_snake_case)]
impl FacilityLocationModel {
    /// builds the two-echelon facility location model
    pub fn build(sets: &Sets, parameters: &Parameters) -> Result<(LpProblem, Variables), BuildError> {
        info!(
            "Building facility location model with {} plants, {} DCs and {} RDCs",
            sets.P.len(),
            sets.I.len(),
            sets.J.len()
        );

        contiguous("plants", &sets.P)?;
        contiguous("DCs", &sets.I)?;
        contiguous("RDCs", &sets.J)?;

        let mut model = LpProblem::new("Facility_Location");

        //*************CREATE VARIABLES*************//

        let (P, I, J) = (sets.P.len(), sets.I.len(), sets.J.len());

        // quantity shipped from DC i to RDC j
        let x: Vec<Vec<Variable>> = (I, J).vars_with(|(i, j)| {
            let dc = get("DC name", &parameters.dc_names, i.into())?;
            let rdc = get("RDC name", &parameters.rdc_names, j.into())?;
            Ok::<_, BuildError>(model.add_cont(format!("x[{},{}]", dc, rdc)))
        })?;

        // 1 if DC i is opened, 0 otherwise
        let y: Vec<Variable> = I.vars_with(|i| {
            let dc = get("DC name", &parameters.dc_names, i.into())?;
            Ok::<_, BuildError>(model.add_binary(format!("y[{}]", dc)))
        })?;

        // quantity shipped from plant p to DC i
        let z: Vec<Vec<Variable>> = (P, I).vars_with(|(p, i)| {
            let plant = get("plant name", &parameters.plant_names, p.into())?;
            let dc = get("DC name", &parameters.dc_names, i.into())?;
            Ok::<_, BuildError>(model.add_cont(format!("z[{},{}]", plant, dc)))
        })?;

        let x: TiVec<DcIndex, TiVec<RdcIndex, Variable>> = x.into_iter().map(TiVec::from).collect();
        let y: TiVec<DcIndex, Variable> = y.into();
        let z: TiVec<PlantIndex, TiVec<DcIndex, Variable>> = z.into_iter().map(TiVec::from).collect();

        debug!("Added {} variables", model.num_vars());

        // ******************** SET OBJECTIVE ********************
        let mut fixed_costs = Expression::default();
        for &i in &sets.I {
            fixed_costs += *get("fixed cost", &parameters.F, i)? * y[i];
        }

        let mut outbound_costs = Expression::default();
        for (&i, &j) in iproduct!(&sets.I, &sets.J) {
            let dc_cost = *get("DC variable cost", &parameters.C_dc, i)?;
            let ship = *get("outbound cost", get("outbound cost", &parameters.C_out, i)?, j)?;
            outbound_costs += (dc_cost + ship) * x[i][j];
        }

        let mut inbound_costs = Expression::default();
        for (&p, &i) in iproduct!(&sets.P, &sets.I) {
            let plant_cost = *get("plant variable cost", &parameters.C_plant, p)?;
            let ship = *get("inbound cost", get("inbound cost", &parameters.C_in, p)?, i)?;
            inbound_costs += (plant_cost + ship) * z[p][i];
        }

        model.set_objective(fixed_costs + outbound_costs + inbound_costs);

        // ******************** ADD CONSTRAINTS ********************
        // the demand of every RDC is met exactly
        for &j in &sets.J {
            let lhs: Expression = sets.I.iter().map(|&i| x[i][j]).sum();
            let D = *get("demand", &parameters.D, j)?;
            let rdc = get("RDC name", &parameters.rdc_names, j)?;
            trace!("demand[{}] = {}", rdc, D);
            model.add_row(format!("demand[{}]", rdc), lhs, Sense::Eq, D);
        }

        // a DC ships nothing unless it is open, and at most its capacity if it is
        for &i in &sets.I {
            let shipped: Expression = sets.J.iter().map(|&j| x[i][j]).sum();
            let K = *get("capacity", &parameters.K, i)?;
            let dc = get("DC name", &parameters.dc_names, i)?;
            trace!("capacity[{}] = {}", dc, K);
            model.add_row(format!("capacity[{}]", dc), shipped - K * y[i], Sense::Le, 0.0);
        }

        // flow balance: everything a DC receives from the plants is shipped on to the RDCs
        for &i in &sets.I {
            let inflow: Expression = sets.P.iter().map(|&p| z[p][i]).sum();
            let outflow: Expression = sets.J.iter().map(|&j| x[i][j]).sum();
            let dc = get("DC name", &parameters.dc_names, i)?;
            model.add_row(format!("flow[{}]", dc), inflow - outflow, Sense::Eq, 0.0);
        }

        info!("Successfully built facility location model: {}", model);

        Ok((model, Variables { x, y, z }))
    }

    /// Builds the sets and parameters of `problem` and then the model
    pub fn from_problem(problem: &Problem) -> Result<(LpProblem, Variables, Parameters), BuildError> {
        let sets = Sets::new(problem);
        let parameters = Parameters::new(problem, &sets);
        let (model, vars) = FacilityLocationModel::build(&sets, &parameters)?;
        Ok((model, vars, parameters))
    }

    pub fn solve(
        problem: &Problem,
        backend: &mut dyn Backend,
    ) -> Result<FacilityLocationResult, SolveError> {
        // build model
        let (model, vars, parameters) = FacilityLocationModel::from_problem(problem)?;

        // optimize model
        info!("Solving {} with {}", model.name(), backend.name());
        let solution = backend.solve(model)?;
        info!("Finished with status {}", solution.status);

        Ok(FacilityLocationResult::new(&vars, &parameters, &solution))
    }
}

/// The objective split by where the cost is incurred
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// fixed costs of opened DCs
    pub fixed: Cost,
    /// handling at the DCs plus shipping to the RDCs
    pub outbound: Cost,
    /// production at the plants plus shipping to the DCs
    pub inbound: Cost,
}

impl CostBreakdown {
    pub fn total(&self) -> Cost {
        self.fixed + self.outbound + self.inbound
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FacilityLocationResult {
    pub status: Status,
    pub objective: Option<f64>,
    /// quantities shipped from DC i to RDC j, empty if no solution is available
    pub x: TiVec<DcIndex, TiVec<RdcIndex, Quantity>>,
    /// open (1) / closed (0) DCs, empty if no solution is available
    pub y: TiVec<DcIndex, f64>,
    /// quantities shipped from plant p to DC i, empty if no solution is available
    pub z: TiVec<PlantIndex, TiVec<DcIndex, Quantity>>,
    pub costs: Option<CostBreakdown>,
    dc_names: TiVec<DcIndex, String>,
    rdc_names: TiVec<RdcIndex, String>,
    plant_names: TiVec<PlantIndex, String>,
}

impl FacilityLocationResult {
    pub fn new(
        variables: &Variables,
        parameters: &Parameters,
        solution: &Solution,
    ) -> FacilityLocationResult {
        let mut result = FacilityLocationResult {
            status: solution.status.clone(),
            objective: solution.objective,
            x: TiVec::new(),
            y: TiVec::new(),
            z: TiVec::new(),
            costs: None,
            dc_names: parameters.dc_names.clone(),
            rdc_names: parameters.rdc_names.clone(),
            plant_names: parameters.plant_names.clone(),
        };

        let values = match &solution.values {
            Some(values) => values,
            None => return result,
        };

        result.x = variables.x.convert(values);
        result.y = variables.y.convert(values);
        result.z = variables.z.convert(values);

        let fixed = result
            .y
            .iter_enumerated()
            .map(|(i, open)| parameters.F[i] * open)
            .sum();
        let outbound = result
            .x
            .iter_enumerated()
            .flat_map(|(i, row)| row.iter_enumerated().map(move |(j, q)| (i, j, *q)))
            .map(|(i, j, q)| parameters.outbound_unit_cost(i, j) * q)
            .sum();
        let inbound = result
            .z
            .iter_enumerated()
            .flat_map(|(p, row)| row.iter_enumerated().map(move |(i, q)| (p, i, *q)))
            .map(|(p, i, q)| parameters.inbound_unit_cost(p, i) * q)
            .sum();
        result.costs = Some(CostBreakdown {
            fixed,
            outbound,
            inbound,
        });

        result
    }

    /// Whether DC i is open in the solution
    pub fn is_open(&self, i: DcIndex) -> bool {
        self.y.get(i).map_or(false, |&v| v > 0.5)
    }

    /// Names of the DCs opened in the solution
    pub fn open_dcs(&self) -> Vec<&str> {
        self.y
            .keys()
            .filter(|&i| self.is_open(i))
            .map(|i| self.dc_names[i].as_str())
            .collect()
    }

    /// A name-keyed summary of the solution, with zero flows left out
    pub fn report(&self) -> SolutionReport {
        let outbound = self
            .x
            .iter_enumerated()
            .flat_map(|(i, row)| row.iter_enumerated().map(move |(j, q)| (i, j, *q)))
            .filter(|(_, _, q)| *q > FLOW_EPS)
            .map(|(i, j, q)| Flow {
                from: self.dc_names[i].clone(),
                to: self.rdc_names[j].clone(),
                quantity: q,
            })
            .collect();
        let inbound = self
            .z
            .iter_enumerated()
            .flat_map(|(p, row)| row.iter_enumerated().map(move |(i, q)| (p, i, *q)))
            .filter(|(_, _, q)| *q > FLOW_EPS)
            .map(|(p, i, q)| Flow {
                from: self.plant_names[p].clone(),
                to: self.dc_names[i].clone(),
                quantity: q,
            })
            .collect();

        SolutionReport {
            status: self.status.clone(),
            objective: self.objective,
            costs: self.costs,
            open_dcs: self.open_dcs().into_iter().map(String::from).collect(),
            inbound,
            outbound,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    pub from: String,
    pub to: String,
    pub quantity: Quantity,
}

/// What gets written to disk after a solve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionReport {
    pub status: Status,
    pub objective: Option<f64>,
    pub costs: Option<CostBreakdown>,
    pub open_dcs: Vec<String>,
    /// plant -> DC flows
    pub inbound: Vec<Flow>,
    /// DC -> RDC flows
    pub outbound: Vec<Flow>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::lp_problem::{coefficient, num_terms};
    use crate::problem::{Dc, Lane, Plant, Rdc};

    fn problem() -> Problem {
        Problem::new(
            vec![Plant::new("P1", 1.0), Plant::new("P2", 2.0)],
            vec![
                Dc::new("DC1", 100.0, 50.0, 3.0),
                Dc::new("DC2", 60.0, 20.0, 4.0),
                Dc::new("DC3", 10.0, 5.0, 5.0),
            ],
            vec![Rdc::new("R1", 30.0), Rdc::new("R2", 20.0)],
            vec![
                Lane::new("P1", "DC1", 1.0),
                Lane::new("P1", "DC2", 2.0),
                Lane::new("P1", "DC3", 3.0),
                Lane::new("P2", "DC1", 4.0),
                Lane::new("P2", "DC2", 5.0),
                Lane::new("P2", "DC3", 6.0),
            ],
            vec![
                Lane::new("DC1", "R1", 7.0),
                Lane::new("DC1", "R2", 8.0),
                Lane::new("DC2", "R1", 9.0),
                Lane::new("DC2", "R2", 10.0),
                Lane::new("DC3", "R1", 11.0),
                Lane::new("DC3", "R2", 12.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn variable_families_have_the_right_sizes() {
        let (model, vars, _) = FacilityLocationModel::from_problem(&problem()).unwrap();

        assert_eq!(vars.x.len() * vars.x[DcIndex::from(0)].len(), 3 * 2);
        assert_eq!(vars.y.len(), 3);
        assert_eq!(vars.z.len() * vars.z[PlantIndex::from(0)].len(), 2 * 3);
        assert_eq!(model.num_vars(), 6 + 3 + 6);
        assert_eq!(model.num_binary(), 3);
        assert!(model.is_binary(vars.y(DcIndex::from(1))));
        assert!(!model.is_binary(vars.x(DcIndex::from(1), RdcIndex::from(0))));
        assert_eq!(model.var_name(vars.x(DcIndex::from(2), RdcIndex::from(1))), "x[DC3,R2]");
        assert_eq!(model.var_name(vars.z(PlantIndex::from(1), DcIndex::from(0))), "z[P2,DC1]");
    }

    #[test]
    fn one_constraint_per_family_member() {
        let (model, vars, _) = FacilityLocationModel::from_problem(&problem()).unwrap();
        assert_eq!(model.rows().len(), 2 + 3 + 3);

        let demand = model.row("demand[R2]").unwrap();
        assert_eq!(demand.sense, Sense::Eq);
        assert_eq!(demand.rhs, 20.0);
        assert_eq!(demand.num_terms(), 3);
        for i in vars.y.keys() {
            assert_eq!(demand.coefficient(vars.x(i, RdcIndex::from(1))), 1.0);
        }

        let capacity = model.row("capacity[DC2]").unwrap();
        let dc2 = DcIndex::from(1);
        assert_eq!(capacity.sense, Sense::Le);
        assert_eq!(capacity.rhs, 0.0);
        assert_eq!(capacity.coefficient(vars.y(dc2)), -60.0);
        assert_eq!(capacity.coefficient(vars.x(dc2, RdcIndex::from(0))), 1.0);
        assert_eq!(capacity.num_terms(), 3);

        let flow = model.row("flow[DC3]").unwrap();
        let dc3 = DcIndex::from(2);
        assert_eq!(flow.sense, Sense::Eq);
        assert_eq!(flow.rhs, 0.0);
        assert_eq!(flow.coefficient(vars.z(PlantIndex::from(0), dc3)), 1.0);
        assert_eq!(flow.coefficient(vars.x(dc3, RdcIndex::from(1))), -1.0);
        assert_eq!(flow.num_terms(), 4);
    }

    #[test]
    fn objective_combines_handling_and_shipping() {
        let (model, vars, _) = FacilityLocationModel::from_problem(&problem()).unwrap();
        let obj = model.objective();
        let (dc1, dc2) = (DcIndex::from(0), DcIndex::from(1));

        assert_eq!(coefficient(obj, vars.y(dc1)), 50.0);
        // DC2 handling 4 + DC2->R2 shipping 10
        assert_eq!(coefficient(obj, vars.x(dc2, RdcIndex::from(1))), 14.0);
        // P2 production 2 + P2->DC1 shipping 4
        assert_eq!(coefficient(obj, vars.z(PlantIndex::from(1), dc1)), 6.0);
        assert_eq!(num_terms(obj), 15);
    }

    #[test]
    fn building_twice_gives_the_same_model() {
        let problem = problem();
        let (a, _, _) = FacilityLocationModel::from_problem(&problem).unwrap();
        let (b, _, _) = FacilityLocationModel::from_problem(&problem).unwrap();

        assert_eq!(a.rows(), b.rows());
        assert_eq!(a.objective(), b.objective());
        let names = |lp: &LpProblem| lp.variables().into_iter().map(|v| lp.var_name(v)).collect::<Vec<_>>();
        assert_eq!(names(&a), names(&b));
    }

    #[test]
    fn mismatched_parameters_are_reported() {
        let problem = problem();
        let sets = Sets::new(&problem);
        let mut parameters = Parameters::new(&problem, &sets);
        parameters.K.pop();

        let err = FacilityLocationModel::build(&sets, &parameters).unwrap_err();
        assert_eq!(
            err,
            BuildError::MissingParameter {
                what: "capacity",
                index: 2
            }
        );

        let mut sets = Sets::new(&problem);
        sets.J.remove(0);
        let err = FacilityLocationModel::build(&sets, &Parameters::new(&problem, &Sets::new(&problem)))
            .unwrap_err();
        assert_eq!(err, BuildError::NonContiguousSet("RDCs"));

        // without DCs no x variable looks up an RDC name, so the demand rows must
        let mut sets = Sets::new(&problem);
        sets.I.clear();
        let mut parameters = Parameters::new(&problem, &sets);
        parameters.rdc_names.pop();
        let err = FacilityLocationModel::build(&sets, &parameters).unwrap_err();
        assert_eq!(
            err,
            BuildError::MissingParameter {
                what: "RDC name",
                index: 1
            }
        );

        let sets = Sets::new(&problem);
        let mut parameters = Parameters::new(&problem, &sets);
        parameters.dc_names.pop();
        let err = FacilityLocationModel::build(&sets, &parameters).unwrap_err();
        assert_eq!(
            err,
            BuildError::MissingParameter {
                what: "DC name",
                index: 2
            }
        );
    }

    #[test]
    fn result_is_empty_without_values() {
        let (_, vars, parameters) = FacilityLocationModel::from_problem(&problem()).unwrap();
        let result =
            FacilityLocationResult::new(&vars, &parameters, &Solution::without_values(Status::Infeasible));

        assert_eq!(result.status, Status::Infeasible);
        assert!(result.costs.is_none());
        assert!(result.open_dcs().is_empty());
        assert!(result.report().outbound.is_empty());
    }
}
