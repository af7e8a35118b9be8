// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting persistence used by several layers:
//
//   checkpoint.rs      - Model weights via Burn's recorder, plus
//                        the TrainConfig and best epoch as JSON
//                        so inference can rebuild the model.
//
//   artifact_store.rs  - Fitted preprocessing state (weather
//                        scaler, yield scaler, categorical
//                        vocabulary) as JSON, written by the
//                        reference split and read by all others.
//
//   metrics.rs         - Epoch losses, training history and
//                        RMSE / MAE / R² written as JSON.
//
// Reference: Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Fitted scaler and vocabulary persistence
pub mod artifact_store;

/// Loss history and regression metrics
pub mod metrics;
