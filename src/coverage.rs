//! Per-gene coverage records and their scaled profiles.
//!
//! A [`CoverageTable`] holds the rows of one direction's coverage file as read.
//! Parameter estimation works on [`ScaledProfile`]s, which are only built for
//! *complete* rows (no missing value anywhere, at least one non-zero bin).
//! Every bin vector is transformed with the configured [`ObservationScale`]
//! and divided by its own maximum so values lie in `[0, 1]` whatever the gene's
//! expression level.

use clap::ValueEnum;
use log::info;
use std::path::PathBuf;

use crate::{
    config::ObservationScale,
    error::UtrExtError,
    io::parsers::coverage::{CoverageIterator, CoverageRow},
    Position,
};

/// Which side of the gene a coverage table describes, relative to transcription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum)]
pub enum Direction {
    Upstream,
    Downstream,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Upstream => write!(f, "upstream"),
            Direction::Downstream => write!(f, "downstream"),
        }
    }
}

/// One gene's row of a coverage table.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneCoverageRecord {
    pub gene_id: String,
    /// Known UTR length, in basepairs.
    pub utr_length: Option<Position>,
    /// Log10-scaled terminal exon coverage.
    pub exon_coverage: Option<f64>,
    /// Raw coverage per bin; bin 0 is the terminal exon.
    pub bins: Vec<Option<f64>>,
}

impl From<CoverageRow> for GeneCoverageRecord {
    fn from(row: CoverageRow) -> Self {
        Self {
            gene_id: row.gene_id,
            utr_length: row.utr,
            exon_coverage: row.exon,
            bins: row.bins,
        }
    }
}

impl GeneCoverageRecord {
    /// Whether the gene passes the expression cutoff. A missing exon coverage does not.
    pub fn is_expressed(&self, min_exon_coverage: f64) -> bool {
        self.exon_coverage
            .map_or(false, |coverage| coverage >= min_exon_coverage)
    }

    /// Whether every field of the row is present.
    pub fn is_complete(&self) -> bool {
        self.utr_length.is_some()
            && self.exon_coverage.is_some()
            && self.bins.iter().all(|bin| bin.is_some())
    }
}

/// A complete row, transformed and scaled to `[0, 1]` by its maximum.
#[derive(Clone, Debug, PartialEq)]
pub struct ScaledProfile {
    pub gene_id: String,
    pub utr_length: Position,
    pub exon_coverage: f64,
    pub values: Vec<f64>,
}

/// Transform `values` with `scale`, then divide by their maximum.
///
/// Returns `None` when the maximum is not positive, since such a row cannot be
/// normalized.
pub fn scale_by_max(values: &[f64], scale: ObservationScale) -> Option<Vec<f64>> {
    let transformed: Vec<f64> = values.iter().map(|&x| scale.apply(x)).collect();
    let max = transformed.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !(max > 0.0) {
        return None;
    }
    Some(transformed.into_iter().map(|x| x / max).collect())
}

/// Counts of the rows dropped while building scaled profiles.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProfileSummary {
    pub rows: usize,
    pub incomplete: usize,
    pub all_zero: usize,
    pub profiles: usize,
}

/// All rows of one direction's coverage table.
#[derive(Clone, Debug)]
pub struct CoverageTable {
    pub direction: Direction,
    pub n_bins: usize,
    pub records: Vec<GeneCoverageRecord>,
}

impl CoverageTable {
    /// Read a coverage table from `filepath`. Any malformed row is an error.
    pub fn from_path(
        filepath: impl Into<PathBuf>,
        direction: Direction,
    ) -> Result<Self, UtrExtError> {
        let filepath = filepath.into();
        info!("processing {}", filepath.display());
        let iter = CoverageIterator::new(&filepath)?;
        let n_bins = iter.n_bins();
        let records = iter
            .map(|row| row.map(GeneCoverageRecord::from))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            direction,
            n_bins,
            records,
        })
    }

    /// Build a table from records already in memory.
    pub fn from_records(direction: Direction, records: Vec<GeneCoverageRecord>) -> Self {
        let n_bins = records.iter().map(|r| r.bins.len()).max().unwrap_or(0);
        Self {
            direction,
            n_bins,
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over the gene IDs in the table.
    pub fn gene_ids(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.gene_id.as_str())
    }

    /// Scaled profiles of all complete, non-zero rows, with a summary of what was dropped.
    pub fn scaled_profiles(&self, scale: ObservationScale) -> (Vec<ScaledProfile>, ProfileSummary) {
        let mut summary = ProfileSummary {
            rows: self.records.len(),
            ..Default::default()
        };
        let mut profiles = Vec::new();

        for record in &self.records {
            if !record.is_complete() {
                summary.incomplete += 1;
                continue;
            }
            let counts: Vec<f64> = record.bins.iter().flatten().copied().collect();
            let values = match scale_by_max(&counts, scale) {
                Some(values) => values,
                None => {
                    summary.all_zero += 1;
                    continue;
                }
            };
            // complete rows always carry both
            if let (Some(utr_length), Some(exon_coverage)) =
                (record.utr_length, record.exon_coverage)
            {
                profiles.push(ScaledProfile {
                    gene_id: record.gene_id.clone(),
                    utr_length,
                    exon_coverage,
                    values,
                });
            }
        }
        summary.profiles = profiles.len();
        info!(
            "{}: {} rows, {} incomplete, {} without coverage, {} complete profiles",
            self.direction, summary.rows, summary.incomplete, summary.all_zero, summary.profiles
        );
        (profiles, summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn record(gene_id: &str, utr: Option<Position>, bins: Vec<Option<f64>>) -> GeneCoverageRecord {
        GeneCoverageRecord {
            gene_id: gene_id.to_string(),
            utr_length: utr,
            exon_coverage: Some(2.0),
            bins,
        }
    }

    #[test]
    fn test_scale_by_max() {
        let scaled = scale_by_max(&[99.0, 9.0, 0.0], ObservationScale::Log).unwrap();
        assert_relative_eq!(scaled[0], 1.0);
        assert_relative_eq!(scaled[1], 0.5);
        assert_relative_eq!(scaled[2], 0.0);

        let scaled = scale_by_max(&[4.0, 2.0], ObservationScale::Linear).unwrap();
        assert_eq!(scaled, vec![1.0, 0.5]);

        assert!(scale_by_max(&[0.0, 0.0], ObservationScale::Log).is_none());
    }

    #[test]
    fn test_scaled_profiles_drop_incomplete_and_zero() {
        let table = CoverageTable::from_records(
            Direction::Downstream,
            vec![
                record("complete", Some(100), vec![Some(9.0), Some(99.0)]),
                record("missing_bin", Some(100), vec![Some(9.0), None]),
                record("missing_utr", None, vec![Some(9.0), Some(9.0)]),
                record("zero", Some(100), vec![Some(0.0), Some(0.0)]),
            ],
        );
        let (profiles, summary) = table.scaled_profiles(ObservationScale::Log);
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].gene_id, "complete");
        assert_relative_eq!(profiles[0].values[0], 0.5);
        assert_eq!(
            summary,
            ProfileSummary {
                rows: 4,
                incomplete: 2,
                all_zero: 1,
                profiles: 1
            }
        );
    }

    #[test]
    fn test_is_expressed() {
        let mut r = record("g", Some(100), vec![]);
        assert!(r.is_expressed(1.0));
        r.exon_coverage = Some(0.5);
        assert!(!r.is_expressed(1.0));
        r.exon_coverage = None;
        assert!(!r.is_expressed(1.0));
    }
}
