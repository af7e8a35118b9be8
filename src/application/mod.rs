// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// one user-facing goal per subcommand.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No printing here (that's Layer 1)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern

// Raw split → combined tensor + scaled labels
pub mod preprocess_use_case;

// The training workflow
pub mod train_use_case;

// Metrics and attention export from a saved checkpoint
pub mod evaluate_use_case;
