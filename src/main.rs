use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use strata_nn::data::csv;
use strata_nn::{ConfigDoc, Error, NetConfig, Network, Result, TargetKind};

/// Trains a feed-forward network on columnar CSV event tables, with
/// optional greedy layer-wise autoencoder pretraining.
#[derive(Parser, Debug)]
#[command(name = "strata-train", version)]
struct Cli {
    /// CSV event files, concatenated in the order given.
    #[arg(short, long = "file", num_args = 1.., required = true)]
    file: Vec<PathBuf>,

    /// Where to write the trained model (default: neural_net_<stamp>.yaml).
    #[arg(short, long)]
    save: Option<PathBuf>,

    /// Resume training from a previously saved model.
    #[arg(long)]
    load: Option<PathBuf>,

    /// YAML run configuration; entries there override these flags.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Column formula, e.g. "bottom + charm ~ * -pt -eta".
    #[arg(long)]
    formula: Option<String>,

    /// Layer widths from input to output, e.g. --struct 12 8 4 3.
    #[arg(long = "struct", num_args = 1..)]
    structure: Vec<usize>,

    /// Output flavor: regress, multiclass or binary.
    #[arg(short = 'T', long = "type", default_value = "regress")]
    target: String,

    /// Learning rate.
    #[arg(long, default_value_t = 0.1)]
    learning: f64,

    /// Momentum coefficient.
    #[arg(long, default_value_t = 0.5)]
    momentum: f64,

    /// L2 regularization strength.
    #[arg(long, default_value_t = 1e-5)]
    regularize: f64,

    /// Mini-batch size.
    #[arg(long, default_value_t = 10)]
    batch: usize,

    /// Training epochs (also used for each pretraining stage).
    #[arg(long, default_value_t = 10)]
    epochs: usize,

    /// How many transitions to pretrain; negative means all but the output.
    #[arg(short = 'd', long, default_value_t = -1, allow_negative_numbers = true)]
    deepauto: i64,

    /// First row of the table to train on.
    #[arg(long, default_value_t = 0)]
    start: usize,

    /// One past the last row to train on; negative means the end of the table.
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    end: i64,

    /// Epochs between progress reports and checkpoint saves.
    #[arg(long, default_value_t = 1)]
    prog: usize,

    /// Seed for reproducible weight initialization.
    #[arg(long)]
    seed: Option<u64>,

    /// Log per-stage and per-check detail.
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .compact()
        .with_max_level(level)
        .init();
}

fn default_save_path() -> PathBuf {
    let stamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    PathBuf::from(format!("neural_net_{}.yaml", stamp))
}

fn run(cli: Cli) -> Result<()> {
    let doc = match &cli.config {
        Some(path) => ConfigDoc::load(path)?,
        None => ConfigDoc::default(),
    };

    let formula = doc.formula.clone().or_else(|| cli.formula.clone()).ok_or(
        Error::Config("no formula given: pass --formula or set one in the config file".into()),
    )?;
    let structure = doc.structure.clone().unwrap_or_else(|| cli.structure.clone());
    let learning = doc.learning.unwrap_or(cli.learning);
    let momentum = doc.momentum.unwrap_or(cli.momentum);
    let regularize = doc.regularize.unwrap_or(cli.regularize);
    let batch = doc.batch.unwrap_or(cli.batch);
    let epochs = doc.epochs.unwrap_or(cli.epochs);

    let target = match cli.target.as_str() {
        "regress" => TargetKind::Regress,
        "multiclass" => TargetKind::Multiclass,
        "binary" => TargetKind::Binary,
        other => {
            return Err(Error::Config(format!(
                "unknown output type '{}': expected regress, multiclass or binary",
                other
            )))
        }
    };
    let depth = if cli.deepauto < 0 {
        None
    } else {
        Some(cli.deepauto as usize)
    };

    let table = csv::read_paths(&cli.file)?;
    let rows = table.rows();
    let end = if cli.end < 0 { rows } else { cli.end as usize };
    let table = if cli.start != 0 || end != rows {
        table.slice(cli.start, end)?
    } else {
        table
    };
    info!(
        rows = table.rows(),
        columns = table.names().len(),
        files = cli.file.len(),
        "loaded event table"
    );

    let resumed = cli.load.is_some();
    let mut net = match &cli.load {
        Some(path) => {
            info!(path = %path.display(), "resuming from saved model");
            strata_nn::load_yaml(path)?
        }
        None => {
            if structure.is_empty() {
                return Err(Error::Config(
                    "no layer structure given: pass --struct or set one in the config file".into(),
                ));
            }
            let mut config = NetConfig::new(structure, target);
            config.seed = cli.seed;
            Network::new(&config)?
        }
    };

    net.set_learning(learning);
    net.set_momentum(momentum);
    net.set_regularizer(regularize);
    net.set_batch_size(batch);
    net.set_pretrain_depth(depth);

    let save = cli.save.clone().unwrap_or_else(default_save_path);
    net.set_checkpoint(save.clone());

    net.bind_data(&table, &formula)?;
    net.check(0)?;

    // A resumed model already carries trained weights; greedy stage-wise
    // reconstruction would clobber them.
    if !resumed {
        net.pretrain(epochs)?;
    }
    let loss = net.train(epochs, cli.prog)?;

    net.save(&save)?;
    info!(loss, path = %save.display(), "training finished");
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
