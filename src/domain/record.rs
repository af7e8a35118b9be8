// ============================================================
// Layer 3 — Categorical Record Types
// ============================================================
// Each field trial comes with five categorical attributes
// alongside its weather series:
//
//   Maturity Group | Genotype ID | State | Year | Location
//
// RawRecord holds them exactly as read from disk (strings,
// because State is text and the numeric columns are often
// written as floats like "3.0"). CleanRecord holds them after
// the cleaning step: integers coerced, genotype mapped to its
// cluster, state reduced to letters.

use serde::{Deserialize, Serialize};

/// Column names in file order
pub const COLUMN_NAMES: [&str; 5] = ["Maturity Group", "Genotype ID", "State", "Year", "Location"];

/// Index of the Genotype ID column (ignored by vocabulary diffs,
/// since raw genotype ids are far more numerous than clusters)
pub const GENOTYPE_COLUMN: usize = 1;

/// Index of the Location column
pub const LOCATION_COLUMN: usize = 4;

/// One row of the categorical table as it appears on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub maturity_group: String,
    pub genotype_id:    String,
    pub state:          String,
    pub year:           String,
    pub location:       String,
}

impl RawRecord {
    pub fn new(
        maturity_group: impl Into<String>,
        genotype_id:    impl Into<String>,
        state:          impl Into<String>,
        year:           impl Into<String>,
        location:       impl Into<String>,
    ) -> Self {
        Self {
            maturity_group: maturity_group.into(),
            genotype_id:    genotype_id.into(),
            state:          state.into(),
            year:           year.into(),
            location:       location.into(),
        }
    }

    /// Borrow the cell at `col` (0..5, file order)
    pub fn column(&self, col: usize) -> &str {
        match col {
            0 => &self.maturity_group,
            1 => &self.genotype_id,
            2 => &self.state,
            3 => &self.year,
            _ => &self.location,
        }
    }
}

/// A single categorical value. Numeric columns become `Int`,
/// the State column stays `Text`. Ordering is derived so that
/// categories sort numerically within an integer column and
/// lexicographically within a text column.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CategoryValue {
    Int(i64),
    Text(String),
}

impl std::fmt::Display for CategoryValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CategoryValue::Int(v)  => write!(f, "{v}"),
            CategoryValue::Text(s) => write!(f, "{s}"),
        }
    }
}

/// A categorical record after cleaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanRecord {
    pub maturity_group: i64,
    /// Cluster id looked up from the raw genotype id
    pub cluster_id:     i64,
    /// Letters only, e.g. "IA" from "IA_1"
    pub state:          String,
    pub year:           i64,
    pub location:       i64,
}

impl CleanRecord {
    /// The five values in column order, ready for encoding
    pub fn values(&self) -> [CategoryValue; 5] {
        [
            CategoryValue::Int(self.maturity_group),
            CategoryValue::Int(self.cluster_id),
            CategoryValue::Text(self.state.clone()),
            CategoryValue::Int(self.year),
            CategoryValue::Int(self.location),
        ]
    }
}
