// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All model, training and inference code built on Burn.
//
//   model.rs      - Temporal attention regressor
//                   • Two stacked LSTM encoders with dropout
//                   • Per-timestep energy: ReLU(Linear(h → 1))
//                   • Softmax over time → attention weights
//                   • Weighted sum of hidden states → context
//                   • Optional Linear(h → context_dim)
//                   • Linear(· → 1) yield head
//
//   trainer.rs    - The training loop
//                   MSE + Adam, per-epoch validation,
//                   patience-based early stopping, best
//                   checkpoint kept
//
//   inferencer.rs - Loads the best checkpoint and runs it over
//                   a split in order, for predictions or
//                   attention weights
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Bahdanau et al. (2015) attention over RNN states

/// Temporal attention LSTM architecture
pub mod model;

/// Training loop with validation and early stopping
pub mod trainer;

/// Ordered batch inference from a checkpoint
pub mod inferencer;
