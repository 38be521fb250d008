use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;

use jungle_io::{ExperimentName, FrameReader, PredictionWriter};
use jungle_tree::{JungleConfig, Model, Predictions, TreeConfig, metrics};

#[derive(Parser)]
#[command(name = "jungle")]
#[command(about = "Decision trees and bagged jungles for tabular classification and regression")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Task {
    /// Predict a class label (Gini-scored splits, majority vote)
    Classification,
    /// Predict a continuous value (squared-error splits, averaging)
    Regression,
}

/// Tree-growth parameters shared by single trees and jungles.
#[derive(Args, Debug, Clone)]
struct GrowthArgs {
    /// Maximum tree depth (0 = a single leaf)
    #[arg(long, default_value_t = 10)]
    max_depth: usize,

    /// Nodes holding fewer than this fraction of the rows become leaves
    #[arg(long)]
    min_split_fraction: Option<f64>,
}

#[derive(Subcommand)]
enum Command {
    /// Fit a tree, or a jungle when --trees is given, and save it
    Train {
        /// Path to the training CSV file
        #[arg(long)]
        data: PathBuf,

        /// Name of the target column
        #[arg(long)]
        target: String,

        /// Kind of target
        #[arg(long, value_enum)]
        task: Task,

        /// Path to write the trained model binary
        #[arg(long)]
        model: PathBuf,

        /// Number of trees; omit to train a single tree
        #[arg(long)]
        trees: Option<usize>,

        /// Rows drawn without replacement for each jungle tree (defaults to all rows)
        #[arg(long, requires = "trees")]
        bootstrap_size: Option<usize>,

        #[command(flatten)]
        growth: GrowthArgs,
    },

    /// Predict every row of a CSV file with a saved model
    Predict {
        /// Path to the trained model binary
        #[arg(long)]
        model: PathBuf,

        /// Path to the CSV file to predict
        #[arg(long)]
        data: PathBuf,

        /// Target column to skip if the file carries one
        #[arg(long)]
        target: Option<String>,

        /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct TrainOutput {
    model_kind: &'static str,
    n_rows: usize,
    n_features: usize,
    n_trees: usize,
    max_depth: usize,
    training_accuracy: Option<f64>,
    training_r_squared: Option<f64>,
    training_mean_absolute_error: Option<f64>,
    training_root_mean_squared_error: Option<f64>,
}

#[derive(Serialize)]
struct PredictOutput {
    experiment: String,
    model_kind: &'static str,
    n_rows: usize,
    output: PathBuf,
}

/// Settings for one `train` invocation.
struct TrainPlan {
    target: String,
    task: Task,
    trees: Option<usize>,
    bootstrap_size: Option<usize>,
    growth: GrowthArgs,
    seed: u64,
}

impl TrainPlan {
    fn tree_config(&self) -> Result<TreeConfig> {
        let config = TreeConfig::new(self.growth.max_depth);
        match self.growth.min_split_fraction {
            Some(fraction) => Ok(config.with_min_split_fraction(fraction)?),
            None => Ok(config),
        }
    }

    fn jungle_config(&self, tree_count: usize, n_rows: usize) -> Result<JungleConfig> {
        let bootstrap_size = self.bootstrap_size.unwrap_or(n_rows);
        let config = JungleConfig::new(tree_count, bootstrap_size)?
            .with_max_depth(self.growth.max_depth)
            .with_seed(self.seed);
        match self.growth.min_split_fraction {
            Some(fraction) => Ok(config.with_min_split_fraction(fraction)?),
            None => Ok(config),
        }
    }
}

/// Training-set scores; only the fields matching the task are filled.
#[derive(Default)]
struct TrainingScores {
    accuracy: Option<f64>,
    r_squared: Option<f64>,
    mean_absolute_error: Option<f64>,
    root_mean_squared_error: Option<f64>,
}

/// Fit the requested model and score it on its own training rows.
fn train(plan: &TrainPlan, data: &Path) -> Result<(Model, TrainOutput)> {
    let reader = FrameReader::new(data).with_target(&plan.target);
    let (model, n_rows, n_features, scores) = match plan.task {
        Task::Classification => {
            let table = reader
                .read_labels()
                .context("failed to read training CSV")?;
            let n_rows = table.targets().len();
            let model: Model = match plan.trees {
                Some(tree_count) => plan
                    .jungle_config(tree_count, n_rows)?
                    .fit_classifier(&table)
                    .context("jungle training failed")?
                    .into(),
                None => plan
                    .tree_config()?
                    .fit_classifier(&table)
                    .context("tree training failed")?
                    .into(),
            };
            let Predictions::Labels(predicted) = model.predict(&table)? else {
                anyhow::bail!("classification model produced numeric predictions");
            };
            let accuracy = metrics::accuracy(&predicted, table.targets())?;
            let n_features = model.feature_names().len();
            let scores = TrainingScores {
                accuracy: Some(accuracy),
                ..TrainingScores::default()
            };
            (model, n_rows, n_features, scores)
        }
        Task::Regression => {
            let table = reader
                .read_responses()
                .context("failed to read training CSV")?;
            let n_rows = table.targets().len();
            let model: Model = match plan.trees {
                Some(tree_count) => plan
                    .jungle_config(tree_count, n_rows)?
                    .fit_regressor(&table)
                    .context("jungle training failed")?
                    .into(),
                None => plan
                    .tree_config()?
                    .fit_regressor(&table)
                    .context("tree training failed")?
                    .into(),
            };
            let Predictions::Values(predicted) = model.predict(&table)? else {
                anyhow::bail!("regression model produced label predictions");
            };
            let actual = table.targets();
            let scores = TrainingScores {
                r_squared: Some(metrics::r_squared(&predicted, actual)?),
                mean_absolute_error: Some(metrics::mean_absolute_error(&predicted, actual)?),
                root_mean_squared_error: Some(metrics::root_mean_squared_error(&predicted, actual)?),
                ..TrainingScores::default()
            };
            let n_features = model.feature_names().len();
            (model, n_rows, n_features, scores)
        }
    };

    let output = TrainOutput {
        model_kind: model.kind(),
        n_rows,
        n_features,
        n_trees: model.n_trees(),
        max_depth: plan.growth.max_depth,
        training_accuracy: scores.accuracy,
        training_r_squared: scores.r_squared,
        training_mean_absolute_error: scores.mean_absolute_error,
        training_root_mean_squared_error: scores.root_mean_squared_error,
    };
    Ok((model, output))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Train {
            data,
            target,
            task,
            model,
            trees,
            bootstrap_size,
            growth,
        } => {
            let plan = TrainPlan {
                target,
                task,
                trees,
                bootstrap_size,
                growth,
                seed: cli.seed,
            };
            let (fitted, output) = train(&plan, &data)?;
            info!(
                kind = fitted.kind(),
                n_trees = fitted.n_trees(),
                "model trained"
            );

            fitted
                .save(&model)
                .with_context(|| format!("failed to save model to {}", model.display()))?;

            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Predict {
            model,
            data,
            target,
            experiment,
            output_dir,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;

            // 1. Load model
            let fitted = Model::load(&model).context("failed to load model")?;
            info!(
                kind = fitted.kind(),
                n_trees = fitted.n_trees(),
                n_features = fitted.feature_names().len(),
                "model loaded"
            );

            // 2. Read features
            let mut reader = FrameReader::new(&data);
            if let Some(target) = target {
                reader = reader.with_target(target);
            }
            let table = reader
                .read_features()
                .context("failed to read prediction CSV")?;

            // 3. Predict
            let predictions = fitted.predict(&table).context("prediction failed")?;

            // 4. Write predictions JSON
            let writer = PredictionWriter::new(&output_dir, experiment_name)?;
            let path = writer.write(fitted.kind(), &predictions)?;

            // 5. Print summary
            let output = PredictOutput {
                experiment,
                model_kind: fitted.kind(),
                n_rows: predictions.len(),
                output: path,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
