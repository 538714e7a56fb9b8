//! Per-gene Viterbi decoding of coverage into UTR extensions.
//!
//! Each expressed gene's bins (missing values dropped) are scaled to `[0, 1]`
//! by their maximum (raw counts unless `--observation-scale log`), nudged off
//! the boundaries and decoded. The new UTR ends
//! one bin before the first notUTR state; bin 0 is the terminal exon itself.

use indexmap::IndexMap;
use log::{debug, info, trace};
use rayon::prelude::*;

use crate::{
    beta::nudge_boundaries,
    config::ExtensionConfig,
    coverage::{scale_by_max, CoverageTable, GeneCoverageRecord},
    error::UtrExtError,
    hmm::{BetaHmm, State},
    traits::HmmDecoder,
    Position,
};

/// Progress is logged every this many genes.
const PROGRESS_INTERVAL: usize = 100;

/// The decoded UTR of one gene on one side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UtrExtension {
    /// Known UTR length from the coverage table.
    pub old_utr_length: Option<Position>,
    pub new_utr_length: Position,
    /// The longest UTR the observed territory could hold.
    pub max_extent: Position,
}

/// What happened to one gene.
#[derive(Debug)]
pub enum DecodeOutcome {
    Success(UtrExtension),
    /// Exon coverage missing or below the cutoff.
    NotExpressed,
    /// Too few or all-zero observations.
    Empty(UtrExtError),
    /// The decoder failed.
    Error(UtrExtError),
}

/// Counts of per-gene outcomes over one direction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodeCounter {
    pub input: usize,
    pub skipped_notexpressed: usize,
    pub skipped_empty: usize,
    pub skipped_error: usize,
    pub success: usize,
}

impl DecodeCounter {
    pub fn record(&mut self, outcome: &DecodeOutcome) {
        self.input += 1;
        match outcome {
            DecodeOutcome::Success(_) => self.success += 1,
            DecodeOutcome::NotExpressed => self.skipped_notexpressed += 1,
            DecodeOutcome::Empty(_) => self.skipped_empty += 1,
            DecodeOutcome::Error(_) => self.skipped_error += 1,
        }
    }
}

impl std::fmt::Display for DecodeCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "input={}, skipped_notexpressed={}, skipped_empty={}, skipped_error={}, success={}",
            self.input,
            self.skipped_notexpressed,
            self.skipped_empty,
            self.skipped_error,
            self.success
        )
    }
}

/// Build the observation sequence of a record: present bins only, scaled to
/// `[0, 1]` by their maximum and moved off exact 0 and 1.
///
/// # Errors
///
/// [`UtrExtError::ObservationsTooShort`] with fewer than two present bins,
/// [`UtrExtError::ObservationsAllZero`] when no bin has coverage.
pub fn observation_sequence(
    record: &GeneCoverageRecord,
    config: &ExtensionConfig,
) -> Result<Vec<f64>, UtrExtError> {
    let counts: Vec<f64> = record.bins.iter().flatten().copied().collect();
    if counts.len() < 2 {
        return Err(UtrExtError::ObservationsTooShort(counts.len()));
    }
    let mut observations =
        scale_by_max(&counts, config.observation_scale).ok_or(UtrExtError::ObservationsAllZero)?;
    nudge_boundaries(&mut observations, config.boundary_epsilon);
    Ok(observations)
}

/// New UTR length and maximum extent from a decoded path.
///
/// If the path never leaves UTR (or only passes through otherTranscript), the
/// whole territory is UTR.
pub fn utr_from_path(path: &[State], bin_size: Position) -> (Position, Position) {
    let last = path.len().saturating_sub(1) as Position;
    let max_extent = bin_size * last;
    let new_utr_length = match path.iter().position(|s| *s == State::NotUtr) {
        Some(first) => bin_size * (first as Position).saturating_sub(1),
        None => max_extent,
    };
    (new_utr_length, max_extent)
}

/// Decodes every gene of a direction against one shared model.
pub struct SequenceDecoder<'a, D: HmmDecoder> {
    model: &'a BetaHmm,
    decoder: D,
    config: &'a ExtensionConfig,
}

impl<'a, D: HmmDecoder> SequenceDecoder<'a, D> {
    pub fn new(model: &'a BetaHmm, decoder: D, config: &'a ExtensionConfig) -> Self {
        Self {
            model,
            decoder,
            config,
        }
    }

    /// Decode a single gene.
    pub fn decode_gene(&self, record: &GeneCoverageRecord) -> DecodeOutcome {
        if !record.is_expressed(self.config.min_exon_coverage) {
            return DecodeOutcome::NotExpressed;
        }
        let observations = match observation_sequence(record, self.config) {
            Ok(observations) => observations,
            Err(e) => return DecodeOutcome::Empty(e),
        };
        let path = match self.decoder.decode(self.model, &observations) {
            Ok(path) => path,
            Err(e) => return DecodeOutcome::Error(e),
        };
        let (new_utr_length, max_extent) = utr_from_path(&path, self.config.bin_size);
        DecodeOutcome::Success(UtrExtension {
            old_utr_length: record.utr_length,
            new_utr_length,
            max_extent,
        })
    }
}

impl<'a, D: HmmDecoder + Sync> SequenceDecoder<'a, D> {
    /// Decode all genes of `table` in parallel.
    ///
    /// Returns the successful extensions keyed by gene ID, in table order, and
    /// the outcome counts.
    pub fn decode_all(
        &self,
        table: &CoverageTable,
    ) -> (IndexMap<String, UtrExtension>, DecodeCounter) {
        info!("{}: decoding {} genes", table.direction, table.len());
        let n = table.len();
        let outcomes: Vec<DecodeOutcome> = table
            .records
            .par_iter()
            .enumerate()
            .map(|(i, record)| {
                if i % PROGRESS_INTERVAL == 0 {
                    debug!("processing gene {}/{}", i, n);
                }
                self.decode_gene(record)
            })
            .collect();

        let mut counter = DecodeCounter::default();
        let mut extensions = IndexMap::new();
        for (record, outcome) in table.records.iter().zip(outcomes) {
            counter.record(&outcome);
            match outcome {
                DecodeOutcome::Success(extension) => {
                    extensions.insert(record.gene_id.clone(), extension);
                }
                DecodeOutcome::Empty(e) | DecodeOutcome::Error(e) => {
                    trace!("{}: skipped {}: {}", table.direction, record.gene_id, e);
                }
                DecodeOutcome::NotExpressed => {}
            }
        }
        info!("{}: decoding: {}", table.direction, counter);
        (extensions, counter)
    }
}
