// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the five subcommands and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::{
    evaluate_use_case::EvaluateConfig,
    preprocess_use_case::PreprocessConfig,
    train_use_case::TrainConfig,
};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Clean, encode, scale and combine one raw data split
    Preprocess(PreprocessArgs),

    /// Log categorical values that differ between two raw tables
    DiffVocab(DiffVocabArgs),

    /// Train the temporal attention model with early stopping
    Train(TrainArgs),

    /// Score a saved model on a preprocessed split
    Evaluate(EvaluateArgs),

    /// Export per-timestep attention weights for a preprocessed split
    Attention(EvaluateArgs),
}

/// All arguments for the `preprocess` command.
#[derive(Args, Debug)]
pub struct PreprocessArgs {
    /// Split name used in output file names (train, validation, test, ...)
    #[arg(long, default_value = "train")]
    pub split: String,

    /// Weather tensor .npy, shape (samples, timesteps, weather_vars)
    #[arg(long)]
    pub weather: String,

    /// Categorical table .csv: MG, Genotype ID, State, Year, Location
    #[arg(long)]
    pub other: String,

    /// Genotype → cluster table .npy
    #[arg(long, default_value = "data/clusterID_genotype.npy")]
    pub clusters: String,

    /// The categorical .csv starts with a header row
    #[arg(long)]
    pub has_header: bool,

    /// Raw yield .npy; when given, scaled labels are written too
    #[arg(long)]
    pub yield_path: Option<String>,

    /// Outputs go to <data-dir>/<split>/
    #[arg(long, default_value = "data")]
    pub data_dir: String,

    /// Where fitted scalers and the vocabulary are stored
    #[arg(long, default_value = "artifacts")]
    pub artifacts_dir: String,

    /// Reference split: fit and save scalers and vocabulary
    /// instead of loading them
    #[arg(long)]
    pub fit: bool,

    /// Expected one-hot width; preprocessing fails on mismatch
    #[arg(long, default_value_t = 229)]
    pub onehot_width: usize,

    /// Location codes dropped before encoding (repeatable)
    #[arg(long = "exclude-location", default_values_t = vec![162])]
    pub excluded_locations: Vec<i64>,
}

impl From<PreprocessArgs> for PreprocessConfig {
    fn from(a: PreprocessArgs) -> Self {
        PreprocessConfig {
            split:              a.split,
            weather_path:       a.weather,
            other_path:         a.other,
            cluster_path:       a.clusters,
            has_header:         a.has_header,
            yield_path:         a.yield_path,
            data_dir:           a.data_dir,
            artifacts_dir:      a.artifacts_dir,
            fit:                a.fit,
            onehot_width:       a.onehot_width,
            excluded_locations: a.excluded_locations,
        }
    }
}

/// All arguments for the `diff-vocab` command
#[derive(Args, Debug)]
pub struct DiffVocabArgs {
    /// Categorical .csv of the reference split
    #[arg(long)]
    pub reference: String,

    /// Categorical .csv to compare against it
    #[arg(long)]
    pub candidate: String,

    #[arg(long)]
    pub has_header: bool,
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    #[arg(long, default_value = "data/train/combined_train.npy")]
    pub train_data: String,

    #[arg(long, default_value = "data/train/scaled_yield_train.npy")]
    pub train_labels: String,

    #[arg(long, default_value = "data/validation/combined_validation.npy")]
    pub val_data: String,

    #[arg(long, default_value = "data/validation/scaled_yield_validation.npy")]
    pub val_labels: String,

    /// Directory to save the best checkpoint and its config
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Directory for training_history.json and metrics files
    #[arg(long, default_value = "results")]
    pub results_dir: String,

    /// Directory holding yield_scaler.json from `preprocess --fit`
    #[arg(long, default_value = "artifacts")]
    pub artifacts_dir: String,

    /// Hidden units of both LSTM layers
    #[arg(long, default_value_t = 128)]
    pub hidden_size: usize,

    /// Dropout after each LSTM layer
    #[arg(long, default_value_t = 0.23)]
    pub dropout: f64,

    #[arg(long, default_value_t = 512)]
    pub batch_size: usize,

    /// Upper bound on epochs; early stopping usually ends sooner
    #[arg(long, default_value_t = 50)]
    pub epochs: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Reduce the attention context to this size before the head
    #[arg(long)]
    pub context_dim: Option<usize>,

    /// Epochs without validation improvement before stopping
    #[arg(long, default_value_t = 3)]
    pub patience: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            train_data:     a.train_data,
            train_labels:   a.train_labels,
            val_data:       a.val_data,
            val_labels:     a.val_labels,
            checkpoint_dir: a.checkpoint_dir,
            results_dir:    a.results_dir,
            artifacts_dir:  a.artifacts_dir,
            input_size:     None,
            hidden_size:    a.hidden_size,
            dropout:        a.dropout,
            batch_size:     a.batch_size,
            epochs:         a.epochs,
            lr:             a.lr,
            context_dim:    a.context_dim,
            patience:       a.patience,
            seed:           a.seed,
        }
    }
}

/// Arguments shared by `evaluate` and `attention`
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    #[arg(long, default_value = "test")]
    pub split: String,

    /// Combined tensor written by `preprocess`
    #[arg(long)]
    pub data: String,

    /// Scaled labels written by `preprocess`
    #[arg(long)]
    pub labels: Option<String>,

    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    #[arg(long, default_value = "results")]
    pub results_dir: String,

    #[arg(long, default_value = "artifacts")]
    pub artifacts_dir: String,
}

impl From<EvaluateArgs> for EvaluateConfig {
    fn from(a: EvaluateArgs) -> Self {
        EvaluateConfig {
            split:          a.split,
            data:           a.data,
            labels:         a.labels,
            checkpoint_dir: a.checkpoint_dir,
            results_dir:    a.results_dir,
            artifacts_dir:  a.artifacts_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_defaults_match_config_defaults() {
        let cli = Cli::try_parse_from(["crop-yield", "train"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        let def = TrainConfig::default();
        assert_eq!(cfg.hidden_size, def.hidden_size);
        assert_eq!(cfg.batch_size, def.batch_size);
        assert_eq!(cfg.patience, def.patience);
        assert_eq!(cfg.dropout, def.dropout);
        assert_eq!(cfg.context_dim, None);
    }

    #[test]
    fn test_preprocess_excluded_locations() {
        let cli = Cli::try_parse_from([
            "crop-yield", "preprocess", "--weather", "w.npy", "--other", "o.csv",
        ])
        .unwrap();
        let Commands::Preprocess(args) = cli.command else { panic!("expected preprocess") };
        assert_eq!(args.excluded_locations, vec![162]);
        assert!(!args.fit);

        let cli = Cli::try_parse_from([
            "crop-yield", "preprocess", "--weather", "w.npy", "--other", "o.csv",
            "--fit", "--exclude-location", "5", "--exclude-location", "7",
        ])
        .unwrap();
        let Commands::Preprocess(args) = cli.command else { panic!("expected preprocess") };
        let cfg: PreprocessConfig = args.into();
        assert!(cfg.fit);
        assert_eq!(cfg.excluded_locations, vec![5, 7]);
    }

    #[test]
    fn test_evaluate_requires_data() {
        assert!(Cli::try_parse_from(["crop-yield", "evaluate"]).is_err());
    }
}
