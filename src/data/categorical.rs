// ============================================================
// Layer 4 — Categorical Cleaning and One-Hot Encoding
// ============================================================
// Turns the raw five-column categorical table into a fixed-width
// one-hot matrix.
//
// Cleaning steps (per row):
//   1. Numeric columns are parsed as floats and truncated to
//      integers ("3.0" → 3)
//   2. Genotype ID is shifted down by one and looked up in the
//      genotype → cluster table (ids on disk start at 1)
//   3. State keeps letters only ("IA_1" → "IA")
//
// Row filtering:
//   Locations listed as excluded are always dropped. When a
//   reference vocabulary exists, rows whose location it has never
//   seen are dropped too, so train and test encode to the same
//   width. The indices of surviving rows are returned so the
//   weather tensor and labels can be filtered the same way.
//
// Encoding:
//   Each column contributes one block of indicator columns, one
//   per category, sorted. Blocks are concatenated in column
//   order. The total width is checked against a known constant;
//   a different width means the vocabularies drifted between
//   splits and the run stops.

use anyhow::{bail, ensure, Context, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use crate::domain::record::{
    CategoryValue, CleanRecord, RawRecord, COLUMN_NAMES, GENOTYPE_COLUMN, LOCATION_COLUMN,
};
use crate::domain::traits::Persistable;
use crate::infra::artifact_store::{read_json, write_json};

// ─── Cleaning ─────────────────────────────────────────────────────────────────

/// Keep alphabetic characters only
pub fn sanitize_state(state: &str) -> String {
    state.chars().filter(|c| c.is_alphabetic()).collect()
}

/// Parse a numeric-looking cell: float first, then truncate toward zero
fn parse_int(cell: &str, row: usize, col: usize) -> Result<i64> {
    let value: f32 = cell.trim().parse().with_context(|| {
        format!("Row {row}: '{}' value '{cell}' is not numeric", COLUMN_NAMES[col])
    })?;
    ensure!(
        value.is_finite(),
        "Row {row}: '{}' value '{cell}' is not finite",
        COLUMN_NAMES[col]
    );
    Ok(value.trunc() as i64)
}

/// Clean every raw row. Fails on the first unparsable cell or
/// genotype id outside the cluster table.
pub fn clean_records(raw: &[RawRecord], cluster_ids: &[i64]) -> Result<Vec<CleanRecord>> {
    raw.iter()
        .enumerate()
        .map(|(row, r)| -> Result<CleanRecord> {
            let genotype = parse_int(&r.genotype_id, row, GENOTYPE_COLUMN)?;
            // Genotype ids on disk are 1-based, the cluster table is 0-based
            let index = genotype - 1;
            let cluster_id = usize::try_from(index)
                .ok()
                .and_then(|i| cluster_ids.get(i).copied())
                .with_context(|| {
                    format!(
                        "Row {row}: genotype id {genotype} has no cluster (table has {} entries)",
                        cluster_ids.len()
                    )
                })?;

            Ok(CleanRecord {
                maturity_group: parse_int(&r.maturity_group, row, 0)?,
                cluster_id,
                state:          sanitize_state(&r.state),
                year:           parse_int(&r.year, row, 3)?,
                location:       parse_int(&r.location, row, LOCATION_COLUMN)?,
            })
        })
        .collect()
}

/// Drop rows at excluded locations, and rows whose location the
/// reference vocabulary does not know. Returns the surviving rows
/// together with their original indices.
pub fn filter_locations(
    records:   Vec<CleanRecord>,
    excluded:  &[i64],
    reference: Option<&CategoricalEncoder>,
) -> (Vec<CleanRecord>, Vec<usize>) {
    let total = records.len();
    let (kept_rows, kept): (Vec<usize>, Vec<CleanRecord>) = records
        .into_iter()
        .enumerate()
        .filter(|(_, r)| !excluded.contains(&r.location))
        .filter(|(_, r)| reference.map_or(true, |enc| enc.knows_location(r.location)))
        .unzip();

    if kept.len() < total {
        tracing::info!(
            "Dropped {} of {} rows at excluded or unknown locations",
            total - kept.len(),
            total
        );
    }
    (kept, kept_rows)
}

// ─── CategoricalEncoder ───────────────────────────────────────────────────────

/// One-hot vocabulary: the sorted categories of each of the five columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalEncoder {
    pub categories: Vec<Vec<CategoryValue>>,
}

impl CategoricalEncoder {
    /// Collect and sort the categories seen in each column
    pub fn fit(records: &[CleanRecord]) -> Result<Self> {
        ensure!(!records.is_empty(), "cannot fit an encoder on zero records");

        let mut columns: Vec<BTreeSet<CategoryValue>> = vec![BTreeSet::new(); COLUMN_NAMES.len()];
        for r in records {
            for (set, value) in columns.iter_mut().zip(r.values()) {
                set.insert(value);
            }
        }

        let categories: Vec<Vec<CategoryValue>> =
            columns.into_iter().map(|s| s.into_iter().collect()).collect();
        for (name, cats) in COLUMN_NAMES.iter().zip(&categories) {
            tracing::debug!("Column '{}': {} categories", name, cats.len());
        }
        Ok(Self { categories })
    }

    /// Total one-hot width (sum of category counts)
    pub fn width(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    pub fn knows_location(&self, location: i64) -> bool {
        self.categories[LOCATION_COLUMN]
            .binary_search(&CategoryValue::Int(location))
            .is_ok()
    }

    /// Encode rows into a (rows, width) indicator matrix.
    /// Any category missing from the vocabulary is an error.
    pub fn transform(&self, records: &[CleanRecord]) -> Result<Array2<f32>> {
        let offsets: Vec<usize> = self
            .categories
            .iter()
            .scan(0usize, |acc, cats| {
                let start = *acc;
                *acc += cats.len();
                Some(start)
            })
            .collect();
        let lookup: Vec<HashMap<&CategoryValue, usize>> = self
            .categories
            .iter()
            .map(|cats| cats.iter().enumerate().map(|(i, c)| (c, i)).collect())
            .collect();

        let mut out = Array2::<f32>::zeros((records.len(), self.width()));
        for (row, r) in records.iter().enumerate() {
            for (col, value) in r.values().iter().enumerate() {
                let Some(&pos) = lookup[col].get(value) else {
                    bail!(
                        "Vocabulary drift: '{}' value '{}' (row {}) was not seen in the reference split",
                        COLUMN_NAMES[col],
                        value,
                        row
                    );
                };
                out[[row, offsets[col] + pos]] = 1.0;
            }
        }
        Ok(out)
    }
}

impl Persistable for CategoricalEncoder {
    fn save(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }

    fn load(path: &Path) -> Result<Self> {
        let enc: Self = read_json(path)?;
        ensure!(
            enc.categories.len() == COLUMN_NAMES.len(),
            "encoder in '{}' has {} columns, expected {}",
            path.display(),
            enc.categories.len(),
            COLUMN_NAMES.len()
        );
        Ok(enc)
    }
}

/// Encode and check the width against the known constant
pub fn encode_checked(
    encoder:        &CategoricalEncoder,
    records:        &[CleanRecord],
    expected_width: usize,
) -> Result<Array2<f32>> {
    let onehot = encoder.transform(records)?;
    ensure!(
        onehot.ncols() == expected_width,
        "One-hot width is {} but {} was expected; categorical vocabulary has drifted",
        onehot.ncols(),
        expected_width
    );
    Ok(onehot)
}

// ─── Vocabulary drift report ──────────────────────────────────────────────────

/// Values present in only one of two splits, for one column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDrift {
    pub column:            &'static str,
    pub only_in_reference: Vec<String>,
    pub only_in_candidate: Vec<String>,
}

/// Compare raw categorical columns of two splits (Genotype ID is
/// skipped) and log every difference. Nothing is corrected.
pub fn vocabulary_drift(reference: &[RawRecord], candidate: &[RawRecord]) -> Vec<ColumnDrift> {
    let mut report = Vec::new();
    for (col, &name) in COLUMN_NAMES.iter().enumerate() {
        if col == GENOTYPE_COLUMN {
            continue;
        }
        let ref_set: BTreeSet<&str> = reference.iter().map(|r| r.column(col)).collect();
        let cand_set: BTreeSet<&str> = candidate.iter().map(|r| r.column(col)).collect();

        let only_in_reference: Vec<String> =
            ref_set.difference(&cand_set).map(|s| s.to_string()).collect();
        let only_in_candidate: Vec<String> =
            cand_set.difference(&ref_set).map(|s| s.to_string()).collect();

        if only_in_reference.is_empty() && only_in_candidate.is_empty() {
            continue;
        }
        tracing::info!(
            "Column '{}' differs: reference has {} values, candidate has {}",
            name,
            ref_set.len(),
            cand_set.len()
        );
        tracing::info!(
            "  only in reference: {:?}; only in candidate: {:?}",
            only_in_reference,
            only_in_candidate
        );
        report.push(ColumnDrift { column: name, only_in_reference, only_in_candidate });
    }
    report
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> Vec<RawRecord> {
        vec![
            RawRecord::new("3.0", "1", "IA_1", "2004", "101"),
            RawRecord::new("4.0", "2", "IL",   "2005", "162"),
            RawRecord::new("3.0", "3", "NE-2", "2004", "205"),
            RawRecord::new("5.0", "2", "IA",   "2006", "101"),
        ]
    }

    fn clusters() -> Vec<i64> {
        vec![7, 9, 7]
    }

    #[test]
    fn test_state_keeps_letters_only() {
        assert_eq!(sanitize_state("IA_1"), "IA");
        assert_eq!(sanitize_state(" n-e 2"), "ne");
        assert_eq!(sanitize_state("42"), "");
    }

    #[test]
    fn test_cleaning_maps_genotype_to_cluster() {
        let clean = clean_records(&raw(), &clusters()).unwrap();
        assert_eq!(clean[0].cluster_id, 7);
        assert_eq!(clean[1].cluster_id, 9);
        assert_eq!(clean[2].cluster_id, 7);
        assert_eq!(clean[2].state, "NE");
        assert_eq!(clean[0].maturity_group, 3);
    }

    #[test]
    fn test_genotype_outside_cluster_table_fails() {
        let bad = vec![RawRecord::new("3", "4", "IA", "2004", "101")];
        assert!(clean_records(&bad, &clusters()).is_err());
        let zero = vec![RawRecord::new("3", "0", "IA", "2004", "101")];
        assert!(clean_records(&zero, &clusters()).is_err());
    }

    #[test]
    fn test_non_numeric_cell_fails() {
        let bad = vec![RawRecord::new("three", "1", "IA", "2004", "101")];
        assert!(clean_records(&bad, &clusters()).is_err());
    }

    #[test]
    fn test_excluded_location_rows_are_dropped_with_indices() {
        let clean           = clean_records(&raw(), &clusters()).unwrap();
        let (kept, indices) = filter_locations(clean, &[162], None);
        assert_eq!(kept.len(), 3);
        assert_eq!(indices, vec![0, 2, 3]);
    }

    #[test]
    fn test_unknown_locations_are_dropped_against_reference() {
        let clean        = clean_records(&raw(), &clusters()).unwrap();
        let (train, _)   = filter_locations(clean.clone(), &[162], None);
        let encoder      = CategoricalEncoder::fit(&train).unwrap();

        let test = clean_records(
            &[
                RawRecord::new("3", "1", "IA", "2004", "999"),
                RawRecord::new("3", "1", "IA", "2004", "205"),
            ],
            &clusters(),
        )
        .unwrap();
        let (kept, indices) = filter_locations(test, &[162], Some(&encoder));
        assert_eq!(indices, vec![1]);
        assert_eq!(kept[0].location, 205);
    }

    #[test]
    fn test_onehot_layout_and_width() {
        let clean      = clean_records(&raw(), &clusters()).unwrap();
        let (train, _) = filter_locations(clean, &[162], None);
        let encoder    = CategoricalEncoder::fit(&train).unwrap();

        // MG {3,5} + cluster {7,9} + state {IA,NE} + year {2004,2006} + loc {101,205}
        assert_eq!(encoder.width(), 10);
        let onehot = encode_checked(&encoder, &train, 10).unwrap();
        assert_eq!(onehot.dim(), (3, 10));
        // Each row has exactly one hot entry per column block
        for row in onehot.rows() {
            assert_eq!(row.sum(), 5.0);
        }
        // Row 0: MG 3, cluster 7, IA, 2004, loc 101 → first slot of every block
        let expected = [1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0];
        assert_eq!(onehot.row(0).to_vec(), expected);
    }

    #[test]
    fn test_width_is_stable_across_runs() {
        let clean      = clean_records(&raw(), &clusters()).unwrap();
        let first      = CategoricalEncoder::fit(&clean).unwrap();
        let mut shuffled = clean.clone();
        shuffled.reverse();
        let second     = CategoricalEncoder::fit(&shuffled).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.width(), second.width());
    }

    #[test]
    fn test_width_mismatch_fails_loudly() {
        let clean   = clean_records(&raw(), &clusters()).unwrap();
        let encoder = CategoricalEncoder::fit(&clean).unwrap();
        assert!(encode_checked(&encoder, &clean, 229).is_err());
    }

    #[test]
    fn test_unseen_category_is_drift_error() {
        let clean   = clean_records(&raw(), &clusters()).unwrap();
        let encoder = CategoricalEncoder::fit(&clean).unwrap();
        let new_year = vec![CleanRecord {
            maturity_group: 3,
            cluster_id:     7,
            state:          "IA".into(),
            year:           1999,
            location:       101,
        }];
        let err = encoder.transform(&new_year).unwrap_err().to_string();
        assert!(err.contains("Year"));
    }

    #[test]
    fn test_drift_report_skips_genotype_column() {
        let reference = raw();
        let candidate = vec![
            RawRecord::new("3.0", "999", "IA_1", "2004", "101"),
            RawRecord::new("3.0", "998", "MO",   "2004", "101"),
        ];
        let report = vocabulary_drift(&reference, &candidate);
        assert!(report.iter().all(|d| d.column != "Genotype ID"));

        let state = report.iter().find(|d| d.column == "State").unwrap();
        assert_eq!(state.only_in_candidate, vec!["MO".to_string()]);
        assert!(state.only_in_reference.contains(&"IL".to_string()));
    }

    #[test]
    fn test_identical_splits_report_nothing() {
        assert!(vocabulary_drift(&raw(), &raw()).is_empty());
    }

    #[test]
    fn test_encoder_save_and_load() {
        let dir     = tempfile::tempdir().unwrap();
        let path    = dir.path().join("enc.json");
        let clean   = clean_records(&raw(), &clusters()).unwrap();
        let encoder = CategoricalEncoder::fit(&clean).unwrap();
        encoder.save(&path).unwrap();
        assert_eq!(CategoricalEncoder::load(&path).unwrap(), encoder);
    }
}
