// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs and traits describing the crop-yield data:
// one categorical record per field trial, and the seams other
// layers implement (sources of raw splits, persisted artifacts).
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits

// Raw and cleaned categorical records
pub mod record;

// Core abstractions (traits) that other layers implement
pub mod traits;
