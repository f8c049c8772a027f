use std::{collections::HashMap, path::Path};

use derive_more::{Deref, Display, From, Into};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use typed_index_collections::TiVec;

/// The type used for shipped and stored quantities
pub type Quantity = f64;
/// The type used for cost.
pub type Cost = f64;

#[derive(Deref, Debug, PartialEq, Eq, PartialOrd, Ord, From, Into, Clone, Copy, Hash, Display)]
pub struct PlantIndex(usize);

#[derive(Deref, Debug, PartialEq, Eq, PartialOrd, Ord, From, Into, Clone, Copy, Hash, Display)]
pub struct DcIndex(usize);

#[derive(Deref, Debug, PartialEq, Eq, PartialOrd, Ord, From, Into, Clone, Copy, Hash, Display)]
pub struct RdcIndex(usize);

/// A supply source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plant {
    name: String,
    /// Unit production/handling cost at the plant
    var_cost: Cost,
}

impl Plant {
    pub fn new(name: impl Into<String>, var_cost: Cost) -> Plant {
        Plant {
            name: name.into(),
            var_cost,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unit production/handling cost at the plant
    pub fn var_cost(&self) -> Cost {
        self.var_cost
    }
}

/// A distribution center that may be opened or kept closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dc {
    name: String,
    /// The maximum throughput if the DC is opened
    capacity: Quantity,
    /// Cost incurred only if the DC is opened
    fixed_cost: Cost,
    /// Unit handling cost
    var_cost: Cost,
}

impl Dc {
    pub fn new(name: impl Into<String>, capacity: Quantity, fixed_cost: Cost, var_cost: Cost) -> Dc {
        Dc {
            name: name.into(),
            capacity,
            fixed_cost,
            var_cost,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The maximum throughput if the DC is opened
    pub fn capacity(&self) -> Quantity {
        self.capacity
    }

    /// Cost incurred only if the DC is opened
    pub fn fixed_cost(&self) -> Cost {
        self.fixed_cost
    }

    /// Unit handling cost
    pub fn var_cost(&self) -> Cost {
        self.var_cost
    }
}

/// A regional distribution center, i.e. a demand point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rdc {
    name: String,
    /// The quantity that must be delivered, exactly
    demand: Quantity,
}

impl Rdc {
    pub fn new(name: impl Into<String>, demand: Quantity) -> Rdc {
        Rdc {
            name: name.into(),
            demand,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The quantity that must be delivered, exactly
    pub fn demand(&self) -> Quantity {
        self.demand
    }
}

/// Unit shipping cost of an arc, keyed by the names of its end points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lane {
    pub from: String,
    pub to: String,
    pub cost: Cost,
}

impl Lane {
    pub fn new(from: impl Into<String>, to: impl Into<String>, cost: Cost) -> Lane {
        Lane {
            from: from.into(),
            to: to.into(),
            cost,
        }
    }
}

/// The on-disk layout of a problem. Lanes refer to plants, DCs and RDCs by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemData {
    pub plants: Vec<Plant>,
    pub dcs: Vec<Dc>,
    pub rdcs: Vec<Rdc>,
    /// Plant -> DC shipping costs
    pub inbound: Vec<Lane>,
    /// DC -> RDC shipping costs
    pub outbound: Vec<Lane>,
}

#[derive(Debug, Display, From)]
pub enum ProblemError {
    /// Two entities of the same kind share a name
    #[display(fmt = "duplicate {} name `{}`", kind, name)]
    DuplicateName { kind: &'static str, name: String },
    /// A lane starts or ends at a plant that does not exist
    #[display(fmt = "unknown plant `{}`", _0)]
    UnknownPlant(String),
    /// A lane starts or ends at a DC that does not exist
    #[display(fmt = "unknown DC `{}`", _0)]
    UnknownDc(String),
    /// A lane ends at an RDC that does not exist
    #[display(fmt = "unknown RDC `{}`", _0)]
    UnknownRdc(String),
    /// No shipping cost is given for this pair
    #[display(fmt = "no shipping cost from `{}` to `{}`", from, to)]
    MissingLane { from: String, to: String },
    /// Names end up in variable and constraint names, so they are limited to characters
    /// that LP and MPS files accept
    #[display(fmt = "invalid {} name `{}`: use letters, digits and _.!#$%&()/;?@'{{}}|~", kind, name)]
    InvalidName { kind: &'static str, name: String },
    /// The same pair is given more than one shipping cost
    #[display(fmt = "more than one shipping cost from `{}` to `{}`", from, to)]
    DuplicateLane { from: String, to: String },
    #[display(fmt = "{} of `{}` is negative ({})", what, name, value)]
    NegativeValue {
        what: &'static str,
        name: String,
        value: f64,
    },
    #[display(fmt = "{} of `{}` is not finite", what, name)]
    NonFinite { what: &'static str, name: String },
    #[display(fmt = "failed to read problem: {}", _0)]
    #[from]
    Io(std::io::Error),
    #[display(fmt = "failed to parse problem: {}", _0)]
    #[from]
    Json(serde_json::Error),
}

impl std::error::Error for ProblemError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProblemError::Io(err) => Some(err),
            ProblemError::Json(err) => Some(err),
            _ => None,
        }
    }
}

/// A validated two-echelon network: plants supply DCs, which supply RDCs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ProblemData", into = "ProblemData")]
pub struct Problem {
    plants: TiVec<PlantIndex, Plant>,
    dcs: TiVec<DcIndex, Dc>,
    rdcs: TiVec<RdcIndex, Rdc>,
    /// inbound[p][i] is the unit cost of shipping from plant p to DC i
    inbound: TiVec<PlantIndex, TiVec<DcIndex, Cost>>,
    /// outbound[i][j] is the unit cost of shipping from DC i to RDC j
    outbound: TiVec<DcIndex, TiVec<RdcIndex, Cost>>,
}

fn check(what: &'static str, name: &str, value: f64) -> Result<(), ProblemError> {
    if !value.is_finite() {
        return Err(ProblemError::NonFinite {
            what,
            name: name.to_string(),
        });
    }
    if value < 0.0 {
        return Err(ProblemError::NegativeValue {
            what,
            name: name.to_string(),
            value,
        });
    }
    Ok(())
}

/// Characters allowed in names besides ASCII letters and digits
const NAME_SYMBOLS: &str = "_.!#$%&()/;?@'{}|~";

fn check_name(kind: &'static str, name: &str) -> Result<(), ProblemError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || NAME_SYMBOLS.contains(c));
    match valid {
        true => Ok(()),
        false => Err(ProblemError::InvalidName {
            kind,
            name: name.to_string(),
        }),
    }
}

/// Maps names to typed indices, rejecting duplicates
fn lookup<'a, K: From<usize>>(
    kind: &'static str,
    names: impl Iterator<Item = &'a str>,
) -> Result<HashMap<&'a str, K>, ProblemError> {
    let mut map = HashMap::new();
    for (i, name) in names.enumerate() {
        check_name(kind, name)?;
        if map.insert(name, K::from(i)).is_some() {
            return Err(ProblemError::DuplicateName {
                kind,
                name: name.to_string(),
            });
        }
    }
    Ok(map)
}

/// Resolves a list of lanes into a dense cost matrix. Every pair must be given exactly once.
fn cost_matrix<F, T>(
    lanes: &[Lane],
    from: &HashMap<&str, F>,
    to: &HashMap<&str, T>,
    from_names: &[&str],
    to_names: &[&str],
    unknown_from: fn(String) -> ProblemError,
    unknown_to: fn(String) -> ProblemError,
) -> Result<TiVec<F, TiVec<T, Cost>>, ProblemError>
where
    F: From<usize> + Into<usize> + Copy,
    T: From<usize> + Into<usize> + Copy,
{
    let mut costs: Vec<Vec<Option<Cost>>> = vec![vec![None; to_names.len()]; from_names.len()];

    for lane in lanes {
        let f: usize = (*from
            .get(lane.from.as_str())
            .ok_or_else(|| unknown_from(lane.from.clone()))?)
        .into();
        let t: usize = (*to
            .get(lane.to.as_str())
            .ok_or_else(|| unknown_to(lane.to.clone()))?)
        .into();
        check("shipping cost", &format!("{}->{}", lane.from, lane.to), lane.cost)?;

        if costs[f][t].replace(lane.cost).is_some() {
            return Err(ProblemError::DuplicateLane {
                from: lane.from.clone(),
                to: lane.to.clone(),
            });
        }
    }

    costs
        .into_iter()
        .enumerate()
        .map(|(f, row)| {
            row.into_iter()
                .enumerate()
                .map(|(t, cost)| {
                    cost.ok_or_else(|| ProblemError::MissingLane {
                        from: from_names[f].to_string(),
                        to: to_names[t].to_string(),
                    })
                })
                .collect::<Result<TiVec<T, Cost>, _>>()
        })
        .collect()
}

impl Problem {
    pub fn new(
        plants: Vec<Plant>,
        dcs: Vec<Dc>,
        rdcs: Vec<Rdc>,
        inbound: Vec<Lane>,
        outbound: Vec<Lane>,
    ) -> Result<Problem, ProblemError> {
        for plant in &plants {
            check("variable cost", plant.name(), plant.var_cost())?;
        }
        for dc in &dcs {
            check("capacity", dc.name(), dc.capacity())?;
            check("fixed cost", dc.name(), dc.fixed_cost())?;
            check("variable cost", dc.name(), dc.var_cost())?;
        }
        for rdc in &rdcs {
            check("demand", rdc.name(), rdc.demand())?;
        }

        let plant_names = plants.iter().map(|p| p.name()).collect::<Vec<_>>();
        let dc_names = dcs.iter().map(|d| d.name()).collect::<Vec<_>>();
        let rdc_names = rdcs.iter().map(|r| r.name()).collect::<Vec<_>>();

        let plant_idx = lookup::<PlantIndex>("plant", plant_names.iter().copied())?;
        let dc_idx = lookup::<DcIndex>("DC", dc_names.iter().copied())?;
        let rdc_idx = lookup::<RdcIndex>("RDC", rdc_names.iter().copied())?;

        let inbound = cost_matrix(
            &inbound,
            &plant_idx,
            &dc_idx,
            &plant_names,
            &dc_names,
            ProblemError::UnknownPlant,
            ProblemError::UnknownDc,
        )?;
        let outbound = cost_matrix(
            &outbound,
            &dc_idx,
            &rdc_idx,
            &dc_names,
            &rdc_names,
            ProblemError::UnknownDc,
            ProblemError::UnknownRdc,
        )?;

        let problem = Problem {
            plants: plants.into(),
            dcs: dcs.into(),
            rdcs: rdcs.into(),
            inbound,
            outbound,
        };

        debug!(
            "Loaded problem with {} plants, {} DCs and {} RDCs",
            problem.plants.len(),
            problem.dcs.len(),
            problem.rdcs.len()
        );

        // Not an input error: the solver is the one that reports infeasibility
        if problem.total_capacity() < problem.total_demand() {
            warn!(
                "Total DC capacity ({}) is below total RDC demand ({}), the model will be infeasible",
                problem.total_capacity(),
                problem.total_demand()
            );
        }

        Ok(problem)
    }

    pub fn from_json(string: &str) -> Result<Problem, ProblemError> {
        Ok(serde_json::from_str(string)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Problem, ProblemError> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn plants(&self) -> &TiVec<PlantIndex, Plant> {
        &self.plants
    }

    pub fn dcs(&self) -> &TiVec<DcIndex, Dc> {
        &self.dcs
    }

    pub fn rdcs(&self) -> &TiVec<RdcIndex, Rdc> {
        &self.rdcs
    }

    /// Unit cost of shipping from plant `p` to DC `i`
    pub fn inbound_cost(&self, p: PlantIndex, i: DcIndex) -> Cost {
        self.inbound[p][i]
    }

    /// Unit cost of shipping from DC `i` to RDC `j`
    pub fn outbound_cost(&self, i: DcIndex, j: RdcIndex) -> Cost {
        self.outbound[i][j]
    }

    pub fn total_demand(&self) -> Quantity {
        self.rdcs.iter().map(|r| r.demand()).sum()
    }

    pub fn total_capacity(&self) -> Quantity {
        self.dcs.iter().map(|d| d.capacity()).sum()
    }
}

impl TryFrom<ProblemData> for Problem {
    type Error = ProblemError;

    fn try_from(data: ProblemData) -> Result<Self, Self::Error> {
        Problem::new(data.plants, data.dcs, data.rdcs, data.inbound, data.outbound)
    }
}

impl From<Problem> for ProblemData {
    fn from(problem: Problem) -> Self {
        let inbound = problem
            .inbound
            .iter_enumerated()
            .flat_map(|(p, row)| {
                let plants = &problem.plants;
                let dcs = &problem.dcs;
                row.iter_enumerated()
                    .map(move |(i, &cost)| Lane::new(plants[p].name(), dcs[i].name(), cost))
            })
            .collect();
        let outbound = problem
            .outbound
            .iter_enumerated()
            .flat_map(|(i, row)| {
                let dcs = &problem.dcs;
                let rdcs = &problem.rdcs;
                row.iter_enumerated()
                    .map(move |(j, &cost)| Lane::new(dcs[i].name(), rdcs[j].name(), cost))
            })
            .collect();

        ProblemData {
            plants: problem.plants.iter().cloned().collect(),
            dcs: problem.dcs.iter().cloned().collect(),
            rdcs: problem.rdcs.iter().cloned().collect(),
            inbound,
            outbound,
        }
    }
}
