use std::{error::Error, path::PathBuf};

use clap::{Parser, Subcommand};
use facility_location::{
    models::facility_location::FacilityLocationModel,
    problem::Problem,
    solver::{self, BackendKind, SolverConfig},
};
use log::info;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Two-echelon facility location: plants -> DCs -> RDCs")]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build and solve the model, writing the solution as JSON
    Solve {
        /// Problem file (JSON)
        #[clap(parse(from_os_str))]
        problem: PathBuf,
        /// Solver backend: microlp or gurobi
        #[clap(short, long, default_value = "microlp")]
        backend: BackendKind,
        /// Solver configuration file (JSON). Flags below override it.
        #[clap(long, parse(from_os_str))]
        config: Option<PathBuf>,
        /// Time limit in seconds
        #[clap(long)]
        time_limit: Option<f64>,
        /// Relative MIP gap
        #[clap(long)]
        mip_gap: Option<f64>,
        #[clap(long)]
        threads: Option<usize>,
        /// Show the solver's own log
        #[clap(short, long)]
        verbose: bool,
        /// Where to write the solution. Defaults to a timestamped file in the working directory.
        #[clap(short, long, parse(from_os_str))]
        output: Option<PathBuf>,
    },
    /// Write the model through Gurobi. The extension picks the format (.lp, .mps, ...).
    #[cfg(feature = "gurobi")]
    Export {
        #[clap(parse(from_os_str))]
        problem: PathBuf,
        #[clap(short, long, default_value = "facility_location.lp")]
        output: String,
    },
    /// Print the size of the model
    Stats {
        #[clap(parse(from_os_str))]
        problem: PathBuf,
        /// Also print every constraint
        #[clap(long)]
        rows: bool,
    },
}

fn solve(
    problem: PathBuf,
    kind: BackendKind,
    config: SolverConfig,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let problem = Problem::from_path(&problem)?;
    let mut backend = solver::backend(kind, config)?;

    let result = FacilityLocationModel::solve(&problem, backend.as_mut())?;
    let report = result.report();

    println!("Status: {}", report.status);
    if let Some(objective) = report.objective {
        println!("Total cost: {}", objective);
    }
    if let Some(costs) = report.costs {
        println!(
            "  fixed = {}, outbound = {}, inbound = {}",
            costs.fixed, costs.outbound, costs.inbound
        );
    }
    println!("Open DCs: {}", report.open_dcs.join(", "));

    let path = output.unwrap_or_else(|| {
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        PathBuf::from(format!("solution-{}.json", stamp))
    });
    let file = std::fs::File::create(&path)?;
    serde_json::to_writer_pretty(file, &report)?;
    info!("Wrote solution to {}", path.display());

    Ok(())
}

pub fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Solve {
            problem,
            backend,
            config,
            time_limit,
            mip_gap,
            threads,
            verbose,
            output,
        } => {
            let mut solver_config = match config {
                Some(path) => SolverConfig::from_path(path)?,
                None => SolverConfig::default(),
            };
            solver_config.time_limit = time_limit.or(solver_config.time_limit);
            solver_config.mip_gap = mip_gap.or(solver_config.mip_gap);
            solver_config.threads = threads.or(solver_config.threads);
            solver_config.verbose |= verbose;

            solve(problem, backend, solver_config, output)
        }
        #[cfg(feature = "gurobi")]
        Command::Export { problem, output } => {
            let problem = Problem::from_path(&problem)?;
            let (model, _, _) = FacilityLocationModel::from_problem(&problem)?;
            let backend = solver::GurobiBackend::new(SolverConfig::default())?;
            backend.write(&model, &output)?;
            Ok(())
        }
        Command::Stats { problem, rows } => {
            let problem = Problem::from_path(&problem)?;
            let (model, _, _) = FacilityLocationModel::from_problem(&problem)?;
            println!("{}", model);
            if rows {
                for row in model.rows() {
                    println!("  {}", model.display_row(row));
                }
            }
            println!(
                "plants = {}, DCs = {}, RDCs = {}",
                problem.plants().len(),
                problem.dcs().len(),
                problem.rdcs().len()
            );
            println!(
                "total demand = {}, total capacity = {}",
                problem.total_demand(),
                problem.total_capacity()
            );
            Ok(())
        }
    }
}
