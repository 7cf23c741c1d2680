//! CHREST CLI Entry Point
//!
//! Trains a model on a file of patterns and prints what it learned.

use anyhow::{Context, Result};
use chrest_cognition::{Model, NodeId, TracingAuditSink};
use chrest_core::{DomainSpecifics, GenericDomain, ModelConfig, Pattern, SortedDomain, Time};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// CHREST memory engine
#[derive(Parser, Debug)]
#[command(name = "chrest")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Model configuration (YAML); defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train on a pattern file and print the model snapshot as JSON
    Learn(TrainArgs),

    /// Train, then print the node a pattern is recognised as
    Recognise(RecogniseArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
enum DomainKind {
    Generic,
    Sorted,
}

impl DomainKind {
    fn build(self) -> Box<dyn DomainSpecifics> {
        match self {
            DomainKind::Generic => Box::new(GenericDomain),
            DomainKind::Sorted => Box::new(SortedDomain),
        }
    }
}

#[derive(Args, Debug)]
struct TrainArgs {
    /// One pattern per line, e.g. `visual: <A 1 1> <B 2 1> $`
    #[arg(short, long)]
    patterns: PathBuf,

    /// Times the whole file is presented
    #[arg(long, default_value_t = 1)]
    passes: usize,

    /// Logical time between presentations
    #[arg(long, default_value_t = 0)]
    time_step: Time,

    #[arg(long, value_enum, default_value_t = DomainKind::Generic)]
    domain: DomainKind,

    /// Log every operation to the `chrest::audit` target
    #[arg(long)]
    audit: bool,
}

#[derive(Args, Debug)]
struct RecogniseArgs {
    #[command(flatten)]
    train: TrainArgs,

    /// Pattern to recognise after training
    #[arg(long)]
    pattern: String,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => ModelConfig::from_file(path)?,
        None => ModelConfig::default(),
    };

    match cli.command {
        Commands::Learn(args) => cmd_learn(config, &args),
        Commands::Recognise(args) => cmd_recognise(config, &args),
    }
}

fn cmd_learn(config: ModelConfig, args: &TrainArgs) -> Result<()> {
    let model = train(config, args)?;
    let snapshot = model.snapshot(model.clocks().cognition);
    println!("{}", snapshot.to_json_pretty()?);
    Ok(())
}

fn cmd_recognise(config: ModelConfig, args: &RecogniseArgs) -> Result<()> {
    let pattern: Pattern = args
        .pattern
        .parse()
        .with_context(|| format!("invalid pattern: {}", args.pattern))?;

    let mut model = train(config, &args.train)?;
    let time = model.clocks().cognition;
    let node = model.recognise(&pattern, time)?;
    print_node(&model, node)
}

fn print_node(model: &Model, node: NodeId) -> Result<()> {
    let snapshot = model.snapshot(model.clocks().cognition);
    let view = snapshot
        .networks
        .iter()
        .flat_map(|network| network.nodes.iter())
        .find(|view| view.id == node)
        .with_context(|| format!("node {} missing from snapshot", node))?;
    println!("{}", serde_json::to_string_pretty(view)?);
    Ok(())
}

/// Present every pattern `passes` times, waiting for cognition when busy
fn train(config: ModelConfig, args: &TrainArgs) -> Result<Model> {
    let patterns = load_patterns(&args.patterns)?;
    let mut model = Model::with_domain(config, args.domain.build(), 0)?;
    if args.audit {
        model.set_audit_sink(Some(Box::new(TracingAuditSink)));
    }

    let mut time: Time = 0;
    for pass in 0..args.passes {
        for pattern in &patterns {
            time = time.max(model.clocks().cognition);
            model.recognise_and_learn(pattern, time)?;
            time += args.time_step;
        }
        info!("Pass {} finished at {}", pass + 1, time);
    }
    Ok(model)
}

fn load_patterns(path: &Path) -> Result<Vec<Pattern>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    content
        .lines()
        .enumerate()
        .map(|(number, line)| (number + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(number, line)| {
            line.parse::<Pattern>()
                .with_context(|| format!("{}:{}: invalid pattern", path.display(), number))
        })
        .collect()
}
