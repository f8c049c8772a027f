use crate::problem::{Cost, DcIndex, PlantIndex, Problem, Quantity, RdcIndex};
use log::trace;
use typed_index_collections::TiVec;

/// sets for the facility location model
#[derive(Debug, Clone, PartialEq)]
#[allow(non_snake_case)]
pub struct Sets {
    /// Set of plants
    pub P: Vec<PlantIndex>,
    /// Set of distribution centers
    pub I: Vec<DcIndex>,
    /// Set of regional distribution centers (demand points)
    pub J: Vec<RdcIndex>,
}

/// parameters for the facility location model
#[derive(Debug, Clone, PartialEq)]
#[allow(non_snake_case)]
pub struct Parameters {
    /// demand of RDC j, which must be met exactly
    pub D: TiVec<RdcIndex, Quantity>,
    /// throughput capacity of DC i if it is opened
    pub K: TiVec<DcIndex, Quantity>,
    /// fixed cost of opening DC i
    pub F: TiVec<DcIndex, Cost>,
    /// unit handling cost at DC i
    pub C_dc: TiVec<DcIndex, Cost>,
    /// unit production cost at plant p
    pub C_plant: TiVec<PlantIndex, Cost>,
    /// unit shipping cost from plant p to DC i
    pub C_in: TiVec<PlantIndex, TiVec<DcIndex, Cost>>,
    /// unit shipping cost from DC i to RDC j
    pub C_out: TiVec<DcIndex, TiVec<RdcIndex, Cost>>,
    /// names used when naming variables and constraints
    pub plant_names: TiVec<PlantIndex, String>,
    pub dc_names: TiVec<DcIndex, String>,
    pub rdc_names: TiVec<RdcIndex, String>,
}

#[allow(non_snake_case)]
impl Sets {
    pub fn new(problem: &Problem) -> Sets {
        let sets = Sets {
            P: problem.plants().keys().collect(),
            I: problem.dcs().keys().collect(),
            J: problem.rdcs().keys().collect(),
        };
        trace!(
            "sets: |P| = {}, |I| = {}, |J| = {}",
            sets.P.len(),
            sets.I.len(),
            sets.J.len()
        );
        sets
    }
}

#[allow(non_snake_case)]
impl Parameters {
    pub fn new(problem: &Problem, sets: &Sets) -> Parameters {
        let D = sets.J.iter().map(|&j| problem.rdcs()[j].demand()).collect();
        let K = sets.I.iter().map(|&i| problem.dcs()[i].capacity()).collect();
        let F = sets.I.iter().map(|&i| problem.dcs()[i].fixed_cost()).collect();
        let C_dc = sets.I.iter().map(|&i| problem.dcs()[i].var_cost()).collect();
        let C_plant = sets
            .P
            .iter()
            .map(|&p| problem.plants()[p].var_cost())
            .collect();

        let C_in = sets
            .P
            .iter()
            .map(|&p| {
                sets.I
                    .iter()
                    .map(|&i| problem.inbound_cost(p, i))
                    .collect()
            })
            .collect();

        let C_out = sets
            .I
            .iter()
            .map(|&i| {
                sets.J
                    .iter()
                    .map(|&j| problem.outbound_cost(i, j))
                    .collect()
            })
            .collect();

        Parameters {
            D,
            K,
            F,
            C_dc,
            C_plant,
            C_in,
            C_out,
            plant_names: problem.plants().iter().map(|p| p.name().to_string()).collect(),
            dc_names: problem.dcs().iter().map(|d| d.name().to_string()).collect(),
            rdc_names: problem.rdcs().iter().map(|r| r.name().to_string()).collect(),
        }
    }

    /// Unit cost of flow from DC i to RDC j: handling at the DC plus shipping
    pub fn outbound_unit_cost(&self, i: DcIndex, j: RdcIndex) -> Cost {
        self.C_dc[i] + self.C_out[i][j]
    }

    /// Unit cost of flow from plant p to DC i: production at the plant plus shipping
    pub fn inbound_unit_cost(&self, p: PlantIndex, i: DcIndex) -> Cost {
        self.C_plant[p] + self.C_in[p][i]
    }
}
