use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use fdeb::compatibility::CompatibilityGraph;
use fdeb::io::{EdgeTable, FormatRegistry, IoError, Writer};
use fdeb::{BundleConfig, bundle_edges, bundle_weighted_edges};

/// Force-directed edge bundling for node-link diagrams.
#[derive(Parser)]
#[command(name = "fdeb")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log output (-v info, -vv debug, -vvv trace); RUST_LOG applies otherwise
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Bundle the edges of an input file
    Bundle(BundleArgs),
    /// Report how many edge pairs are compatible, without bundling
    Compat(CompatArgs),
}

/// Named parameter sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Profile {
    /// K=1.0, S=0.04, I=50, eps=1e-8
    Default,
    /// K=0.1, S=0.1, I=90, eps=1e-6
    Reference,
}

impl Profile {
    fn config(self) -> BundleConfig {
        match self {
            Profile::Default => BundleConfig::default(),
            Profile::Reference => BundleConfig::reference(),
        }
    }
}

/// Where run parameters come from before any overrides
#[derive(Args)]
struct ConfigSource {
    /// Configuration file (.yaml, .yml or .json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Parameter profile to start from
    #[arg(long, value_enum, conflicts_with = "config")]
    profile: Option<Profile>,
}

impl ConfigSource {
    fn load(&self) -> anyhow::Result<BundleConfig> {
        match &self.config {
            Some(path) => BundleConfig::from_path(path)
                .with_context(|| format!("failed to load config {}", path.display())),
            None => Ok(self.profile.unwrap_or(Profile::Default).config()),
        }
    }
}

#[derive(Args)]
struct BundleArgs {
    /// Input edge file (.csv or .json)
    #[arg(short, long)]
    input: PathBuf,

    /// Output file; records go to stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format (csv, json); defaults to the output file's extension, then csv
    #[arg(short, long)]
    format: Option<String>,

    #[command(flatten)]
    source: ConfigSource,

    #[command(flatten)]
    overrides: ParameterOverrides,
}

/// Per-parameter overrides applied on top of the profile or config file
#[derive(Args, Default)]
struct ParameterOverrides {
    /// Spring constant K
    #[arg(short = 'K', long)]
    spring_constant: Option<f64>,

    /// Electrostatic constant E
    #[arg(short = 'E', long)]
    electrostatic_constant: Option<f64>,

    /// Number of cycles C
    #[arg(short = 'C', long)]
    cycles: Option<usize>,

    /// Initial interior subdivision points P
    #[arg(short = 'P', long)]
    subdivisions: Option<usize>,

    /// Subdivision growth factor per cycle
    #[arg(long)]
    subdivision_rate: Option<usize>,

    /// Initial step size S
    #[arg(short = 'S', long)]
    step_size: Option<f64>,

    /// Iterations in the first cycle I
    #[arg(short = 'I', long)]
    iterations: Option<usize>,

    /// Iteration decay factor per cycle
    #[arg(long)]
    iteration_rate: Option<f64>,

    /// Minimum compatibility score in [0, 1]
    #[arg(short = 't', long)]
    threshold: Option<f64>,

    /// Floor for near-zero lengths and distances
    #[arg(long)]
    eps: Option<f64>,
}

impl ParameterOverrides {
    fn apply(&self, mut config: BundleConfig) -> BundleConfig {
        if let Some(k) = self.spring_constant {
            config.spring_constant = k;
        }
        if let Some(e) = self.electrostatic_constant {
            config.electrostatic_constant = e;
        }
        if let Some(c) = self.cycles {
            config.cycles = c;
        }
        if let Some(p) = self.subdivisions {
            config.subdivisions = p;
        }
        if let Some(rate) = self.subdivision_rate {
            config.subdivision_rate = rate;
        }
        if let Some(s) = self.step_size {
            config.step_size = s;
        }
        if let Some(i) = self.iterations {
            config.iterations = i;
        }
        if let Some(rate) = self.iteration_rate {
            config.iteration_rate = rate;
        }
        if let Some(t) = self.threshold {
            config.compatibility_threshold = t;
        }
        if let Some(eps) = self.eps {
            config.eps = eps;
        }
        config
    }
}

impl BundleArgs {
    fn resolve_config(&self) -> anyhow::Result<BundleConfig> {
        let config = self.overrides.apply(self.source.load()?);
        config.validate()?;
        Ok(config)
    }

    fn output_format(&self) -> String {
        self.format
            .clone()
            .or_else(|| {
                self.output
                    .as_deref()
                    .and_then(FormatRegistry::extension_from_path)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "csv".to_string())
    }
}

#[derive(Args)]
struct CompatArgs {
    /// Input edge file (.csv or .json)
    #[arg(short, long)]
    input: PathBuf,

    #[command(flatten)]
    source: ConfigSource,

    /// Minimum compatibility score in [0, 1]
    #[arg(short = 't', long)]
    threshold: Option<f64>,

    /// Also print the compatible partners of every edge
    #[arg(long)]
    neighbors: bool,
}

impl CompatArgs {
    fn resolve_config(&self) -> anyhow::Result<BundleConfig> {
        let mut config = self.source.load()?;
        if let Some(threshold) = self.threshold {
            config.compatibility_threshold = threshold;
        }
        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn read_edges(registry: &FormatRegistry, input: &Path) -> anyhow::Result<EdgeTable> {
    let table = registry
        .read_path(input)
        .with_context(|| format!("failed to read edges from {}", input.display()))?;
    info!(edges = table.len(), path = %input.display(), "Read edge table");
    Ok(table)
}

fn bundle(args: &BundleArgs) -> anyhow::Result<()> {
    let config = args.resolve_config()?;
    let registry = FormatRegistry::with_defaults();

    let format = args.output_format();
    let writer: &dyn Writer = registry
        .writer_for_format(&format)
        .ok_or_else(|| IoError::UnsupportedFormat(format.clone()))?;

    let table = read_edges(&registry, &args.input)?;
    let records = match &table.weights {
        Some(weights) => bundle_weighted_edges(&table.edges, weights, &config)?,
        None => bundle_edges(&table.edges, &config)?,
    };

    match &args.output {
        Some(path) => {
            writer
                .write(&records, path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!(
                "Bundled {} edges into {} points in {}",
                table.len(),
                records.len(),
                path.display()
            );
        }
        None => {
            let mut stdout = io::stdout().lock();
            writer.write_to(&records, &mut stdout)?;
        }
    }
    Ok(())
}

fn compat(args: &CompatArgs) -> anyhow::Result<()> {
    let config = args.resolve_config()?;
    let registry = FormatRegistry::with_defaults();
    let table = read_edges(&registry, &args.input)?;
    let graph = CompatibilityGraph::build(&table.edges, config.compatibility_threshold, config.eps);
    let stats = graph.stats();

    println!("edges: {}", graph.len());
    println!("threshold: {}", config.compatibility_threshold);
    println!("pairs: {}", stats.total_pairs);
    println!("candidate pairs: {}", stats.candidate_pairs);
    println!("compatible pairs: {}", stats.compatible_pairs);

    if args.neighbors {
        for edge in 0..graph.len() {
            let partners: Vec<String> = graph
                .neighbors(edge)
                .iter()
                .map(|j| j.to_string())
                .collect();
            println!("{edge}: {}", partners.join(" "));
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Bundle(args) => bundle(args),
        Commands::Compat(args) => compat(args),
    }
}
