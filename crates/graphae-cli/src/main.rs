//! graphae CLI - train graph autoencoders from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Train a GAE and write 16-dim embeddings
//! graphae train --model gae --edgefile cora.edges --features cora.features -o cora.emb
//!
//! # VGAE with overrides on top of a JSON config file
//! graphae train --model vgae --adjfile g.adj --features g.feat \
//!     --config params.json --epochs 50 --hiddens 64,32 -o g.emb
//!
//! # Show statistics about a graph
//! graphae stats cora.edges --features cora.features
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use graphae_core::AttributedGraph;
use graphae_nn::config::TrainParams;
use graphae_nn::{export, fit_with_callback, GraphAutoencoder, ModelKind};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "graphae")]
#[command(about = "Graph autoencoder embeddings", long_about = None)]
struct Cli {
    /// Log filter (error, warn, info, debug, trace, or a tracing directive)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a GAE or VGAE and write node embeddings
    Train(TrainArgs),

    /// Show statistics about a graph
    Stats {
        /// Input file (edge list unless --adjlist)
        input: PathBuf,

        /// Treat the input as an adjacency list
        #[arg(long)]
        adjlist: bool,

        /// Edge list has a weight column
        #[arg(long)]
        weighted: bool,

        /// Keep edge direction
        #[arg(long)]
        directed: bool,

        /// Node feature file
        #[arg(long)]
        features: Option<PathBuf>,

        /// Node label file
        #[arg(long)]
        labelfile: Option<PathBuf>,
    },
}

#[derive(Args)]
struct TrainArgs {
    /// Model to train
    #[arg(long, default_value = "gae")]
    model: ModelKind,

    /// Edge list input (`src dst [weight]`)
    #[arg(long, conflicts_with = "adjfile", required_unless_present = "adjfile")]
    edgefile: Option<PathBuf>,

    /// Adjacency list input (`node n1 n2 ...`)
    #[arg(long)]
    adjfile: Option<PathBuf>,

    /// Node feature file (`node f1 .. fF`)
    #[arg(long)]
    features: PathBuf,

    /// Node label file (`node l1 l2 ...`)
    #[arg(long)]
    labelfile: Option<PathBuf>,

    /// Edge list has a weight column
    #[arg(long)]
    weighted: bool,

    /// Keep edge direction
    #[arg(long)]
    directed: bool,

    /// JSON file with hyperparameters; flags below take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// Learning rate
    #[arg(long, allow_negative_numbers = true)]
    lr: Option<f64>,

    /// Number of epochs
    #[arg(long, allow_negative_numbers = true)]
    epochs: Option<i64>,

    /// Dropout rate
    #[arg(long, allow_negative_numbers = true)]
    dropout: Option<f64>,

    /// Weight decay (only used with --apply-weight-decay)
    #[arg(long, allow_negative_numbers = true)]
    weight_decay: Option<f64>,

    /// Early stopping patience in epochs
    #[arg(long, allow_negative_numbers = true)]
    early_stopping: Option<i64>,

    /// Hidden layer sizes, comma separated
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    hiddens: Option<Vec<i64>>,

    /// Embedding dimension
    #[arg(long, allow_negative_numbers = true)]
    output_dim: Option<i64>,

    /// Chebyshev degree (0 = renormalized adjacency)
    #[arg(long, allow_negative_numbers = true)]
    max_degree: Option<i64>,

    /// Store features sparsely during preprocessing
    #[arg(long)]
    sparse: bool,

    /// Give each layer one weight per Chebyshev operator
    #[arg(long)]
    use_all_supports: bool,

    /// Pass weight decay to the optimizer
    #[arg(long)]
    apply_weight_decay: bool,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Place tensors on a CUDA device when one is available
    #[arg(long)]
    use_gpu: bool,

    /// CUDA ordinal used with --use-gpu
    #[arg(long)]
    gpu_device_id: Option<usize>,

    /// Output embedding file
    #[arg(short, long)]
    output: PathBuf,
}

impl TrainArgs {
    /// Hyperparameters given on the command line. Boolean flags only
    /// override when set.
    fn params(&self) -> TrainParams {
        TrainParams {
            lr: self.lr,
            epochs: self.epochs,
            dropout: self.dropout,
            weight_decay: self.weight_decay,
            early_stopping: self.early_stopping,
            hiddens: self.hiddens.clone(),
            output_dim: self.output_dim,
            max_degree: self.max_degree,
            sparse: self.sparse.then_some(true),
            seed: self.seed,
            use_all_supports: self.use_all_supports.then_some(true),
            apply_weight_decay: self.apply_weight_decay.then_some(true),
            use_gpu: self.use_gpu.then_some(true),
            gpu_device_id: self.gpu_device_id,
            ..Default::default()
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Train(args) => cmd_train(&args),
        Commands::Stats {
            input,
            adjlist,
            weighted,
            directed,
            features,
            labelfile,
        } => cmd_stats(&input, adjlist, weighted, directed, features.as_deref(), labelfile.as_deref()),
    }
}

fn load_graph(
    input: &Path,
    adjlist: bool,
    weighted: bool,
    directed: bool,
    features: Option<&Path>,
    labels: Option<&Path>,
) -> Result<AttributedGraph> {
    let start = Instant::now();
    let pb = ProgressBar::new_spinner();
    pb.set_message(format!("Loading {}...", input.display()));

    let mut graph = if adjlist {
        AttributedGraph::from_adjlist_file(input, directed)
            .with_context(|| format!("Failed to load adjacency list {}", input.display()))?
    } else {
        AttributedGraph::from_edgelist_file(input, weighted, directed)
            .with_context(|| format!("Failed to load edge list {}", input.display()))?
    };

    if let Some(path) = features {
        graph
            .load_features_file(path)
            .with_context(|| format!("Failed to load features {}", path.display()))?;
    }
    if let Some(path) = labels {
        graph
            .load_labels_file(path)
            .with_context(|| format!("Failed to load labels {}", path.display()))?;
    }

    pb.finish_with_message(format!("Loaded in {:.2?}", start.elapsed()));
    Ok(graph)
}

fn cmd_train(args: &TrainArgs) -> Result<()> {
    let (input, adjlist) = match (&args.edgefile, &args.adjfile) {
        (Some(path), _) => (path.as_path(), false),
        (None, Some(path)) => (path.as_path(), true),
        (None, None) => anyhow::bail!("one of --edgefile or --adjfile is required"),
    };

    let file_params = match &args.config {
        Some(path) => TrainParams::from_json_file(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?,
        None => TrainParams::default(),
    };
    let params = args.params().or(file_params);

    let config = match args.model.check_train_parameters(&params) {
        Ok(config) => config,
        Err(err) => {
            for violation in &err.violations {
                eprintln!("invalid parameter {violation}");
            }
            return Err(err).context("Invalid training configuration");
        }
    };

    let graph = load_graph(
        input,
        adjlist,
        args.weighted,
        args.directed,
        Some(&args.features),
        args.labelfile.as_deref(),
    )?;

    let mut model = GraphAutoencoder::new(args.model);
    model.check_graphtype(&graph)?;

    info!(model = %args.model, ?config, "training");
    let pb = ProgressBar::new(config.epochs as u64);
    pb.set_style(ProgressStyle::with_template(
        "{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} {msg}",
    )?);

    let start = Instant::now();
    let result = fit_with_callback(&mut model, &graph, config, |_, step| {
        pb.inc(1);
        pb.set_message(format!("loss {:.5}", step.loss));
    })
    .context("Training failed")?;
    pb.finish_and_clear();

    println!(
        "Trained {} for {} epochs in {:.2?} (best loss {:.5} at epoch {}{})",
        args.model,
        result.loss_history.len(),
        start.elapsed(),
        result.best_loss,
        result.best_epoch,
        if result.stopped_early { ", stopped early" } else { "" }
    );

    export::save_embeddings(&args.output, &model)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    println!(
        "Wrote {} embeddings of dimension {} to {}",
        result.embeddings.len(),
        model.dimensions().last().copied().unwrap_or(0),
        args.output.display()
    );

    Ok(())
}

fn cmd_stats(
    input: &Path,
    adjlist: bool,
    weighted: bool,
    directed: bool,
    features: Option<&Path>,
    labels: Option<&Path>,
) -> Result<()> {
    let graph = load_graph(input, adjlist, weighted, directed, features, labels)?;
    let stats = graph.stats();

    println!("Graph Statistics");
    println!("================");
    println!("Nodes:          {}", stats.node_count);
    println!("Edges:          {}", stats.edge_count);
    println!("Directed:       {}", stats.directed);
    println!("Weighted:       {}", stats.weighted);
    println!("Attributed:     {}", stats.attributed);
    println!("Feature dim:    {}", stats.feature_dim);
    println!("Labels:         {}", stats.label_count);
    println!("Isolated nodes: {}", stats.isolated_nodes);
    println!("Avg degree:     {:.2}", stats.avg_degree);

    Ok(())
}
