//! runnel CLI: validate, explain, and run YAML pipelines.

use clap::{Parser, Subcommand};
use runnel_core::config::PipelineOptions;
use runnel_exec::LocalEngine;
use runnel_operators::map::render;
use runnel_translate::{
    estimate_rows, parse_yaml_pipeline, ParsedPipeline, PipelineConfig, PipelineRunner,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "runnel")]
#[command(about = "runnel: translate DAG pipelines into physical plans and run them locally", long_about = None)]
struct Cli {
    /// Log at debug level unless RUNNEL_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate and execute a pipeline from a YAML file
    Run {
        /// Path to the pipeline YAML file
        #[arg(short, long)]
        pipeline: PathBuf,

        /// Job name (overrides config)
        #[arg(long)]
        job_name: Option<String>,

        /// Emit a pass-through union for one-input flattens
        #[arg(long)]
        no_flatten_alias: bool,

        /// Element cap per materialized batch (overrides config)
        #[arg(long)]
        max_batch_rows: Option<usize>,

        /// Print the elements of every output, sorted
        #[arg(long)]
        show: bool,
    },

    /// Validate a pipeline YAML file (parse + translate, no execution)
    Validate {
        /// Path to the pipeline YAML file
        #[arg(short, long)]
        pipeline: PathBuf,
    },

    /// Show the physical plan for a pipeline (EXPLAIN)
    Explain {
        /// Path to the pipeline YAML file
        #[arg(short, long)]
        pipeline: PathBuf,

        /// Emit a pass-through union for one-input flattens
        #[arg(long)]
        no_flatten_alias: bool,
    },
}

/// Overrides given on the command line; applied after env and file config.
#[derive(Debug, Default)]
struct CliOverrides {
    job_name: Option<String>,
    no_flatten_alias: bool,
    max_batch_rows: Option<usize>,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("RUNNEL_LOG").unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            pipeline,
            job_name,
            no_flatten_alias,
            max_batch_rows,
            show,
        } => {
            let overrides = CliOverrides {
                job_name,
                no_flatten_alias,
                max_batch_rows,
            };
            if let Err(e) = run_pipeline(&pipeline, &overrides, show) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Validate { pipeline } => {
            if let Err(e) = validate_pipeline(&pipeline) {
                eprintln!("Validation failed: {}", e);
                std::process::exit(1);
            }
            println!("✓ Pipeline is valid");
        }
        Commands::Explain {
            pipeline,
            no_flatten_alias,
        } => {
            let overrides = CliOverrides {
                no_flatten_alias,
                ..Default::default()
            };
            if let Err(e) = explain_pipeline(&pipeline, &overrides) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}

/// Parse the file and resolve options against the environment.
fn load(
    pipeline_path: &Path,
    overrides: &CliOverrides,
) -> Result<(ParsedPipeline, PipelineOptions), Box<dyn std::error::Error>> {
    let yaml_content = fs::read_to_string(pipeline_path)?;
    let parsed = parse_yaml_pipeline(&yaml_content)?;

    let options = resolve_options(PipelineOptions::from_env(), &parsed.config, overrides)?;
    debug!(?options, path = %pipeline_path.display(), "resolved options");
    Ok((parsed, options))
}

/// Layer the file config, then CLI flags, over `base`; validate the result.
fn resolve_options(
    base: PipelineOptions,
    config: &PipelineConfig,
    overrides: &CliOverrides,
) -> Result<PipelineOptions, Box<dyn std::error::Error>> {
    let mut options = base;
    apply_pipeline_config(&mut options, config)?;
    if let Some(name) = &overrides.job_name {
        options.job_name = name.clone();
    }
    if overrides.no_flatten_alias {
        options.alias_single_input_flatten = false;
    }
    if let Some(rows) = overrides.max_batch_rows {
        options.max_batch_rows = rows;
    }
    options.validate()?;
    Ok(options)
}

fn run_pipeline(
    pipeline_path: &Path,
    overrides: &CliOverrides,
    show: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (parsed, options) = load(pipeline_path, overrides)?;

    let engine = LocalEngine::new(options.clone());
    let mut runner = PipelineRunner::new(engine, options);
    let result = runner.run(&parsed.pipeline)?;
    let manifest = &result.manifest;

    println!("✓ Pipeline executed successfully");
    println!("  Job: {}", manifest.job_name);
    println!("  Duration: {}ms", manifest.duration_ms());
    println!("  Nodes executed: {}", manifest.nodes_executed);
    println!("  Plan hash: {}", manifest.plan_hash);
    if let Some(digest) = manifest.outputs_digest {
        println!("  Outputs digest: {}", digest);
    }
    println!();
    println!("Outputs:");
    for (collection, batch) in result.outputs() {
        let step = parsed.step_of(collection).unwrap_or("?");
        println!("  {} ({}): {} elements", step, batch.coder, batch.len());
        if show {
            for v in batch.sorted().values {
                println!("    {}", render(&v));
            }
        }
    }

    Ok(())
}

fn validate_pipeline(pipeline_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let (parsed, options) = load(pipeline_path, &CliOverrides::default())?;
    let runner = PipelineRunner::new(LocalEngine::new(options.clone()), options);
    let _ = runner.translate(&parsed.pipeline)?;
    Ok(())
}

fn explain_pipeline(
    pipeline_path: &Path,
    overrides: &CliOverrides,
) -> Result<(), Box<dyn std::error::Error>> {
    let (parsed, options) = load(pipeline_path, overrides)?;
    let runner = PipelineRunner::new(LocalEngine::new(options.clone()), options);
    let plan = runner.translate(&parsed.pipeline)?;
    let estimate = estimate_rows(&plan);

    println!("Pipeline Execution Plan");
    println!("=======================");
    println!();
    println!("Logical:");
    print!("{}", parsed.pipeline);
    println!();
    println!("Physical:");
    print!("{}", plan);
    println!();
    println!("Row Estimate:");
    println!("  Output Rows: {}", estimate.output_rows);
    println!("  Max Fan-in: {}", estimate.max_fan_in);
    for node in &plan.nodes {
        let rows = estimate.rows.get(&node.id).copied().unwrap_or(0);
        println!("  #{} {}: ~{} rows", node.id.get(), node.label, rows);
    }

    Ok(())
}

fn apply_pipeline_config(
    opts: &mut PipelineOptions,
    doc: &PipelineConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    doc.apply_to(opts)?;
    Ok(())
}
