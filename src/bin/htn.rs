//! htn - plan a goal from a domain file and a world-state file.
//!
//! Prints one primitive task per line, or a JSON array with `--json`.
//! Exit status is 0 when a plan is found, 2 when the search is exhausted
//! and 1 on usage errors or when the input cannot be loaded.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use htn_plan::trace;
use htn_plan::{parse_domain, parse_world_state, PlanError, Planner, SymbolStore};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Domain file with constants, axioms and methods
    #[arg(long, value_name = "FILE")]
    domain: PathBuf,

    /// World-state file with one fact per declaration
    #[arg(long, value_name = "FILE")]
    world: PathBuf,

    /// Parameterless method to plan from; defaults to the `top` method
    #[arg(long, value_name = "ID")]
    goal: Option<String>,

    /// Print the plan as a JSON array
    #[arg(long)]
    json: bool,

    /// Print search counters to stderr
    #[arg(long)]
    stats: bool,
}

fn read(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))
}

fn main() -> ExitCode {
    trace::init_subscriber();
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            // Help and version go to stdout; anything else is a usage error.
            return if err.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let symbols = Arc::new(SymbolStore::new());
    let domain = match read(&args.domain).and_then(|text| {
        parse_domain(&text, symbols).map_err(|e| format!("{}: {}", args.domain.display(), e))
    }) {
        Ok(domain) => domain,
        Err(message) => {
            eprintln!("error: {}", message);
            return ExitCode::from(1);
        }
    };
    let world = match read(&args.world).and_then(|text| {
        parse_world_state(&text, domain.symbols())
            .map_err(|e| format!("{}: {}", args.world.display(), e))
    }) {
        Ok(world) => world,
        Err(message) => {
            eprintln!("error: {}", message);
            return ExitCode::from(1);
        }
    };

    let goal = match args.goal {
        Some(goal) => goal,
        None => match domain.top_level() {
            Some(method) => domain.name(method.name).to_string(),
            None => {
                eprintln!("error: no --goal given and the domain has no `top method`");
                return ExitCode::from(1);
            }
        },
    };

    let report = Planner::new(&domain, &world).make_plan_with_report(&goal);
    if args.stats {
        eprint!("{}", report.metrics);
    }
    match report.outcome {
        Ok(plan) => {
            if args.json {
                println!("{}", plan.to_json());
            } else {
                print!("{}", plan);
            }
            ExitCode::SUCCESS
        }
        Err(err @ PlanError::Exhausted { .. }) => {
            eprintln!("{}", err);
            ExitCode::from(2)
        }
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::from(1)
        }
    }
}
