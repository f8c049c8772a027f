use facility_location::{
    models::facility_location::{FacilityLocationModel, Sets},
    problem::{Dc, DcIndex, Lane, Plant, PlantIndex, Problem, Rdc, RdcIndex},
    solver::{Backend, MicrolpBackend, Status},
};
use good_lp::IntoAffineExpression;

const TOL: f64 = 1e-6;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < TOL
}

/// One plant, one DC and one RDC with free shipping
fn single_chain(capacity: f64, demand: f64) -> Problem {
    Problem::new(
        vec![Plant::new("P", 0.0)],
        vec![Dc::new("DC", capacity, 50.0, 0.0)],
        vec![Rdc::new("R", demand)],
        vec![Lane::new("P", "DC", 0.0)],
        vec![Lane::new("DC", "R", 0.0)],
    )
    .unwrap()
}

/// Two candidate DCs serving one RDC: DC1 is expensive to open but cheap to use
fn two_dcs(capacity: f64, demand: f64) -> Problem {
    Problem::new(
        vec![Plant::new("P", 0.0)],
        vec![
            Dc::new("DC1", capacity, 100.0, 1.0),
            Dc::new("DC2", capacity, 10.0, 2.0),
        ],
        vec![Rdc::new("R", demand)],
        vec![Lane::new("P", "DC1", 0.0), Lane::new("P", "DC2", 0.0)],
        vec![Lane::new("DC1", "R", 0.0), Lane::new("DC2", "R", 0.0)],
    )
    .unwrap()
}

#[test]
fn single_chain_opens_the_dc() {
    let problem = single_chain(100.0, 30.0);
    let result = FacilityLocationModel::solve(&problem, &mut MicrolpBackend::default()).unwrap();

    let (dc, rdc, plant) = (DcIndex::from(0), RdcIndex::from(0), PlantIndex::from(0));
    assert_eq!(result.status, Status::Optimal);
    assert!(close(result.objective.unwrap(), 50.0));
    assert!(close(result.y[dc], 1.0));
    assert!(close(result.x[dc][rdc], 30.0));
    assert!(close(result.z[plant][dc], 30.0));
    assert_eq!(result.open_dcs(), vec!["DC"]);

    let costs = result.costs.unwrap();
    assert!(close(costs.fixed, 50.0));
    assert!(close(costs.total(), 50.0));
}

#[test]
fn insufficient_capacity_builds_but_is_infeasible() {
    let problem = single_chain(20.0, 30.0);
    assert!(FacilityLocationModel::from_problem(&problem).is_ok());

    let result = FacilityLocationModel::solve(&problem, &mut MicrolpBackend::default()).unwrap();
    assert_eq!(result.status, Status::Infeasible);
    assert_eq!(result.objective, None);
    assert!(result.open_dcs().is_empty());
}

#[test]
fn cheapest_total_cost_decides_which_dc_opens() {
    // DC1: 100 + 1 * 50 = 150, DC2: 10 + 2 * 50 = 110
    let problem = two_dcs(100.0, 50.0);
    let result = FacilityLocationModel::solve(&problem, &mut MicrolpBackend::default()).unwrap();

    assert_eq!(result.status, Status::Optimal);
    assert!(close(result.objective.unwrap(), 110.0));
    assert_eq!(result.open_dcs(), vec!["DC2"]);
    assert!(close(result.x[DcIndex::from(0)][RdcIndex::from(0)], 0.0));
}

#[test]
fn capacity_forces_demand_to_be_split() {
    // neither DC can serve 50 alone, so both open and DC1 (cheaper per unit) runs full
    let problem = two_dcs(30.0, 50.0);
    let result = FacilityLocationModel::solve(&problem, &mut MicrolpBackend::default()).unwrap();

    assert_eq!(result.status, Status::Optimal);
    assert_eq!(result.open_dcs(), vec!["DC1", "DC2"]);
    let rdc = RdcIndex::from(0);
    assert!(close(result.x[DcIndex::from(0)][rdc], 30.0));
    assert!(close(result.x[DcIndex::from(1)][rdc], 20.0));
    assert!(close(result.objective.unwrap(), 100.0 + 10.0 + 30.0 + 2.0 * 20.0));
}

#[test]
fn solution_satisfies_every_constraint() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/small.json");
    let problem = Problem::from_path(path).unwrap();
    let (model, vars, _) = FacilityLocationModel::from_problem(&problem).unwrap();

    let rows = model.rows().to_vec();
    let objective = model.objective().clone();

    let solution = MicrolpBackend::default().solve(model).unwrap();
    assert_eq!(solution.status, Status::Optimal);
    let values = solution.values.unwrap();
    for row in &rows {
        assert!(row.holds(&values, TOL), "{} is violated", row.name);
    }

    // what enters a DC leaves it, and nothing leaves a closed DC
    for i in problem.dcs().keys() {
        let inflow: f64 = problem.plants().keys().map(|p| values[&vars.z(p, i)]).sum();
        let outflow: f64 = problem.rdcs().keys().map(|j| values[&vars.x(i, j)]).sum();
        assert!(close(inflow, outflow));
        if values[&vars.y(i)] < 0.5 {
            assert!(close(outflow, 0.0));
        }
    }

    // every RDC gets exactly its demand
    for (j, rdc) in problem.rdcs().iter_enumerated() {
        let delivered: f64 = problem.dcs().keys().map(|i| values[&vars.x(i, j)]).sum();
        assert!(close(delivered, rdc.demand()));
    }

    assert!(close((&objective).eval_with(&values), solution.objective.unwrap()));
}

#[test]
fn model_size_matches_the_index_sets() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/small.json");
    let problem = Problem::from_path(path).unwrap();
    let (model, _, _) = FacilityLocationModel::from_problem(&problem).unwrap();

    let (p, i, j) = (2, 3, 3);
    assert_eq!(model.num_vars(), i * j + i + p * i);
    assert_eq!(model.num_binary(), i);
    assert_eq!(model.rows().len(), j + i + i);

    let sets = Sets::new(&problem);
    assert_eq!((sets.P.len(), sets.I.len(), sets.J.len()), (p, i, j));
}

#[test]
fn building_is_deterministic() {
    let problem = two_dcs(30.0, 50.0);
    let (a, _, _) = FacilityLocationModel::from_problem(&problem).unwrap();
    let (b, _, _) = FacilityLocationModel::from_problem(&problem).unwrap();

    assert_eq!(a.rows(), b.rows());
    assert_eq!(a.objective(), b.objective());
    assert_eq!(a.to_string(), b.to_string());
}

#[test]
fn rows_are_named_after_the_network() {
    let (model, vars, _) = FacilityLocationModel::from_problem(&two_dcs(30.0, 50.0)).unwrap();
    let names = model.rows().iter().map(|row| row.name.as_str()).collect::<Vec<_>>();

    assert_eq!(
        names,
        vec!["demand[R]", "capacity[DC1]", "capacity[DC2]", "flow[DC1]", "flow[DC2]"]
    );
    assert_eq!(model.var("y[DC2]"), Some(vars.y(DcIndex::from(1))));
    assert_eq!(model.var("z[P,DC1]"), Some(vars.z(PlantIndex::from(0), DcIndex::from(0))));

    let capacity = model.row("capacity[DC1]").unwrap();
    let shown = model.display_row(capacity);
    assert!(shown.starts_with("capacity[DC1]: ") && shown.ends_with(" <= 0"), "{}", shown);
    assert!(shown.contains("x[DC1,R]") && shown.contains("y[DC1]"), "{}", shown);
}

#[test]
fn degenerate_networks() {
    // nothing to deliver: every DC stays closed
    let problem = Problem::new(
        vec![Plant::new("P", 1.0)],
        vec![Dc::new("DC", 10.0, 5.0, 1.0)],
        vec![],
        vec![Lane::new("P", "DC", 1.0)],
        vec![],
    )
    .unwrap();
    let result = FacilityLocationModel::solve(&problem, &mut MicrolpBackend::default()).unwrap();
    assert_eq!(result.status, Status::Optimal);
    assert!(close(result.objective.unwrap(), 0.0));
    assert!(result.open_dcs().is_empty());

    // demand but no DC to serve it
    let problem = Problem::new(vec![Plant::new("P", 1.0)], vec![], vec![Rdc::new("R", 5.0)], vec![], vec![])
        .unwrap();
    let (model, _, _) = FacilityLocationModel::from_problem(&problem).unwrap();
    assert_eq!(model.row("demand[R]").map(|row| row.num_terms()), Some(0));
    let result = FacilityLocationModel::solve(&problem, &mut MicrolpBackend::default()).unwrap();
    assert_eq!(result.status, Status::Infeasible);
}

#[test]
fn report_lists_nonzero_flows_by_name() {
    let result =
        FacilityLocationModel::solve(&two_dcs(100.0, 50.0), &mut MicrolpBackend::default())
            .unwrap();
    let report = result.report();

    assert_eq!(report.open_dcs, vec!["DC2".to_string()]);
    assert_eq!(report.outbound.len(), 1);
    assert_eq!(report.outbound[0].from, "DC2");
    assert_eq!(report.outbound[0].to, "R");
    assert!(close(report.outbound[0].quantity, 50.0));
    assert_eq!(report.inbound.len(), 1);
    assert_eq!(report.inbound[0].from, "P");

    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"status\":\"Optimal\""));
}
