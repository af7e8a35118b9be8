// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from raw competition files to tensor batches.
//
//   weather .npy        other .csv + cluster .npy
//       │                     │
//       ▼                     ▼
//   MinMaxScaler          clean → filter → CategoricalEncoder
//   (fit on train,        (vocabulary fit on train,
//    reused elsewhere)     width checked)
//       │                     │
//       └────────┬────────────┘
//                ▼
//           combiner          → (samples, T, vars + one-hot)
//                │
//                ▼
//           YieldDataset      → implements Burn's Dataset trait
//                │
//                ▼
//           YieldBatcher      → stacks samples into tensor batches
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads weather, categorical and cluster files; .npy helpers
pub mod loader;

/// Per-column min-max scaling, fit once and reused
pub mod scaler;

/// Categorical cleaning, one-hot vocabulary, drift report
pub mod categorical;

/// Broadcasts one-hot vectors across timesteps and concatenates
pub mod combiner;

/// Implements Burn's Dataset trait for yield samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
