// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// All business logic is delegated to Layer 2 (application).
//
// A typical run:
//   1. `preprocess --fit` on the training split
//   2. `preprocess` on validation and test (reuses the fit)
//   3. `train`
//   4. `evaluate` / `attention` on the test split
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use std::path::Path;

use commands::{Commands, DiffVocabArgs, EvaluateArgs, PreprocessArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "crop-yield",
    version = "0.1.0",
    about = "Predict crop yield from weather sequences with a temporal attention LSTM."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Preprocess(args) => run_preprocess(args),
            Commands::DiffVocab(args)  => run_diff_vocab(args),
            Commands::Train(args)      => run_train(args),
            Commands::Evaluate(args)   => run_evaluate(args),
            Commands::Attention(args)  => run_attention(args),
        }
    }
}

fn run_preprocess(args: PreprocessArgs) -> Result<()> {
    use crate::application::preprocess_use_case::PreprocessUseCase;

    tracing::info!("Preprocessing split '{}' (fit = {})", args.split, args.fit);
    let summary = PreprocessUseCase::new(args.into()).execute()?;

    println!(
        "Kept {} of {} samples. Combined tensor {:?} saved to {}",
        summary.samples_kept,
        summary.samples_in,
        summary.combined_shape,
        summary.combined_path.display()
    );
    if let Some(path) = summary.labels_path {
        println!("Scaled labels saved to {}", path.display());
    }
    Ok(())
}

fn run_diff_vocab(args: DiffVocabArgs) -> Result<()> {
    use crate::application::preprocess_use_case::diff_vocabulary;

    let report = diff_vocabulary(Path::new(&args.reference), Path::new(&args.candidate), args.has_header)?;
    if report.is_empty() {
        println!("No differences.");
    }
    for drift in report {
        println!("{}:", drift.column);
        println!("  only in reference: {:?}", drift.only_in_reference);
        println!("  only in candidate: {:?}", drift.only_in_candidate);
    }
    Ok(())
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on '{}'", args.train_data);
    let metrics = TrainUseCase::new(args.into()).execute()?;

    println!(
        "Training complete. Validation RMSE {:.3}, MAE {:.3}, R² {:.3}",
        metrics.rmse, metrics.mae, metrics.r2_score
    );
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let metrics = EvaluateUseCase::new(args.into()).execute()?;
    println!(
        "{}: RMSE {:.3}, MAE {:.3}, R² {:.3} over {} samples",
        metrics.split, metrics.rmse, metrics.mae, metrics.r2_score, metrics.samples
    );
    Ok(())
}

fn run_attention(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::AttentionUseCase;

    let path = AttentionUseCase::new(args.into()).execute()?;
    println!("Attention weights saved to {}", path.display());
    Ok(())
}
