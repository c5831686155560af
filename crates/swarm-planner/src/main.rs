//! swarm-planner: build and inspect swarm trajectory cost models
//!
//! - `defaults`  -- Print the default configuration as JSON
//! - `scenarios` -- List the preset scenarios
//! - `build`     -- Build the cost model and export the problem file
//! - `evaluate`  -- Evaluate the cost of a control sequence for a scenario

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use swarm_planner::config::PlannerConfig;
use swarm_planner::problem::{JsonExporter, OptimizerProblem, SolverGenerator};
use swarm_planner::rollout::Rollout;
use swarm_planner::scenarios::Scenario;
use swarm_planner::{build_cost_model, CostBreakdown};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "swarm-planner", version, about)]
struct Cli {
    /// Path to a JSON configuration file (overrides the scenario's configuration).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the default configuration.
    Defaults,

    /// List the preset scenarios.
    Scenarios,

    /// Build the cost model and export it for the solver generator.
    Build {
        /// Scenario providing the configuration when --config is not given.
        #[arg(long, default_value = "two_vehicle_swap")]
        scenario: String,

        /// Override the build directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Also print the cost expression.
        #[arg(long, default_value_t = false)]
        print_cost: bool,
    },

    /// Evaluate the cost of a control sequence for a scenario.
    Evaluate {
        #[arg(long, default_value = "two_vehicle_swap")]
        scenario: String,

        /// JSON array with the decision vector (zero input when omitted).
        #[arg(long)]
        controls: Option<PathBuf>,
    },
}

// ---------------------------------------------------------------------------
// Entrypoint
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    // Initialise tracing (reads RUST_LOG env var, defaults to info).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Defaults => cmd_defaults(),
        Commands::Scenarios => cmd_scenarios(),
        Commands::Build {
            scenario,
            output_dir,
            print_cost,
        } => cmd_build(cli.config.as_deref(), &scenario, output_dir, print_cost),
        Commands::Evaluate { scenario, controls } => {
            cmd_evaluate(cli.config.as_deref(), &scenario, controls.as_deref())
        }
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_defaults() -> Result<()> {
    println!("{}", PlannerConfig::default().to_json_string()?);
    Ok(())
}

fn cmd_scenarios() -> Result<()> {
    for scenario in Scenario::all() {
        println!(
            "{:<22} {} vehicles, N={}  {}",
            scenario.name,
            scenario.config.dimensions.num_vehicles,
            scenario.config.horizon.num_steps,
            scenario.description
        );
    }
    Ok(())
}

fn cmd_build(
    config_path: Option<&Path>,
    scenario: &str,
    output_dir: Option<PathBuf>,
    print_cost: bool,
) -> Result<()> {
    let scenario = load_scenario(config_path, scenario)?;
    let mut config = scenario.config;
    if let Some(dir) = output_dir {
        config.build.build_directory = dir;
    }

    tracing::info!(
        scenario = scenario.name,
        num_vehicles = config.dimensions.num_vehicles,
        num_steps = config.horizon.num_steps,
        "Building cost model"
    );
    let problem = OptimizerProblem::from_config(&config).context("Failed to build cost model")?;

    if print_cost {
        println!("{}", problem.model().cost());
    }

    let path = JsonExporter::default()
        .generate(&problem)
        .context("Failed to export problem")?;
    println!("{}", path.display());
    Ok(())
}

fn cmd_evaluate(config_path: Option<&Path>, scenario: &str, controls: Option<&Path>) -> Result<()> {
    let scenario = load_scenario(config_path, scenario)?;
    let z0 = scenario.parameters()?;
    let u = match controls {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read controls from {}", path.display()))?;
            serde_json::from_str::<Vec<f64>>(&text)
                .with_context(|| format!("Failed to parse controls from {}", path.display()))?
        }
        None => scenario.zero_controls(),
    };

    let model = build_cost_model(&scenario.config)?;
    if !model.bounds().contains(&u) {
        tracing::warn!("Control sequence violates the input bounds");
    }

    let symbolic = model.evaluate_terms(&u, &z0)?;
    let rollout = Rollout::simulate(&scenario.config, &u, &z0)?;
    let mismatch = (symbolic.total() - rollout.total_cost()).abs();
    if mismatch > 1e-9 * (1.0 + rollout.total_cost().abs()) {
        tracing::warn!(mismatch, "Symbolic and numeric cost disagree");
    }

    println!("scenario: {}", scenario.name);
    print_breakdown(&symbolic);
    match rollout.min_separation_squared() {
        Some(d2) => println!("min separation: {:.4} m", d2.sqrt()),
        None => println!("min separation: n/a"),
    }
    println!("collision free: {}", rollout.collision_free());
    for (i, p) in rollout.final_positions().iter().enumerate() {
        println!(
            "vehicle {}: final ({:.3}, {:.3}, {:.3}) reference ({:.3}, {:.3}, {:.3})",
            i, p.x, p.y, p.z, rollout.references[i].x, rollout.references[i].y, rollout.references[i].z
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_scenario(config_path: Option<&Path>, name: &str) -> Result<Scenario> {
    let Some(mut scenario) = Scenario::by_name(name) else {
        bail!(
            "Unknown scenario '{}' (expected one of: {})",
            name,
            Scenario::NAMES.join(", ")
        );
    };
    if let Some(path) = config_path {
        scenario.config = PlannerConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?;
    }
    Ok(scenario)
}

fn print_breakdown(terms: &CostBreakdown<f64>) {
    println!("tracking:  {:>14.6}", terms.tracking);
    println!("effort:    {:>14.6}", terms.effort);
    println!("collision: {:>14.6}", terms.collision);
    println!("terminal:  {:>14.6}", terms.terminal);
    println!("total:     {:>14.6}", terms.total());
}
