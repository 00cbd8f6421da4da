use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use itertools::Itertools;
use structopt::StructOpt;
use tracing::*;

use colgen::*;
use colgen::espprc::{espptwc::espptwc_model, preprocessing, solver::LABEL_SELECTION_STRINGS, LabelSelection};
use colgen::lp::SimplexBackend;
use colgen::orchestrator::{CgConfig, CgOutcome, CgStatus, ColumnGeneration};
use instances::dataset::vrptw::{load_instance, Node};

#[derive(Debug, StructOpt)]
struct ClArgs {
    /// Solomon-format instance file
    #[structopt(parse(from_os_str))]
    instance: PathBuf,
    /// Restrict to the first n customers
    #[structopt(long, short = "n")]
    customers: Option<usize>,
    #[structopt(long, default_value = "100")]
    max_iterations: usize,
    #[structopt(long, default_value = "1e-6")]
    tolerance: f64,
    #[structopt(long, parse(try_from_str), default_value = "min-cost", possible_values = &LABEL_SELECTION_STRINGS)]
    strategy: LabelSelection,
    /// Cap on columns added per pricing round
    #[structopt(long)]
    columns_per_iter: Option<usize>,
    /// Solve the integer master after convergence
    #[structopt(long)]
    integer: bool,
    /// Enforce the instance's vehicle count as a fleet-size row
    #[structopt(long)]
    fleet: bool,
    /// Wall-clock budget in seconds
    #[structopt(long)]
    time_limit: Option<u64>,
    /// Report only the bound and counters, without per-route allocations
    #[structopt(long)]
    summary: bool,
    /// Write the JSON report here instead of stdout
    #[structopt(long, short = "o")]
    output: Option<PathBuf>,
    #[structopt(long)]
    log: Option<PathBuf>,
}

fn status_str(status: CgStatus) -> &'static str {
    match status {
        CgStatus::Optimal => "optimal",
        CgStatus::IterationLimit => "iteration_limit",
        CgStatus::TimeLimit => "time_limit",
    }
}

fn route_records(routes: &[(Vec<Node>, f64)]) -> json::JsonValue {
    routes.iter()
        .map(|(path, alloc)| json::object! {
            path: json::JsonValue::from(path.clone()),
            allocation: *alloc,
        })
        .collect_vec()
        .into()
}

fn report(id: &str, outcome: &CgOutcome, summary: bool) -> json::JsonValue {
    let mut root = json::object! {
        instance: id,
        status: status_str(outcome.status),
        objective: outcome.objective,
        iterations: outcome.iterations,
        columns: outcome.num_columns,
    };
    if !summary {
        root["routes"] = route_records(&outcome.routes);
        if let Some((obj, routes)) = &outcome.integer {
            root["integer_objective"] = (*obj).into();
            root["integer_routes"] = route_records(routes);
        }
    }
    return root;
}

fn write_report(root: &json::JsonValue, output: Option<&PathBuf>) -> Result<()> {
    match output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            root.write_pretty(&mut writer, 2)?;
            writer.flush()?;
        }
        None => {
            root.write_pretty(&mut std::io::stdout(), 2)?;
            println!();
        }
    }
    return Ok(());
}

fn main() -> Result<()> {
    let args: ClArgs = StructOpt::from_args();
    let _g = init_logging(args.log.clone());
    debug!(?args);

    let instance = load_instance(&args.instance, args.customers)?;
    info!(id = %instance.id, n = instance.n, "instance loaded");

    let data = preprocessing::build_pricing_data(&instance);
    let model = espptwc_model(data)?;

    let config = CgConfig {
        max_iterations: args.max_iterations,
        tolerance: args.tolerance,
        strategy: args.strategy,
        solve_integer_after: args.integer,
        columns_per_iter: args.columns_per_iter,
        time_limit: args.time_limit.map(Duration::from_secs),
        fleet_limit: if args.fleet { Some(instance.num_vehicles) } else { None },
    };

    let mut cg = ColumnGeneration::new(model, SimplexBackend::default(), config);
    let outcome = cg.run()?;

    let root = report(&instance.id, &outcome, args.summary);
    write_report(&root, args.output.as_ref())
}
