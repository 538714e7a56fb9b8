//! Test cases and test utility functions.
//!

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::{
    beta::BetaParams,
    error::UtrExtError,
    hmm::{BetaHmm, TransitionMatrix},
    io::file::OutputFile,
    traits::BetaFitter,
    Position,
};

// Simulated coverage defaults
//
// Known UTRs span bins 1..=utr_bins, so the decoded boundary of a
// simulated gene should land on its known UTR length.
pub const SIM_BIN_SIZE: Position = 100;
pub const SIM_N_BINS: usize = 60;
pub const SIM_MIN_UTR_BINS: usize = 3;
pub const SIM_MAX_UTR_BINS: usize = 40;

// counts
pub const SIM_EXON_COUNT: f64 = 1000.0;
pub const SIM_MIN_UTR_COUNT: u32 = 200;
pub const SIM_MAX_UTR_COUNT: u32 = 1000;
pub const SIM_MAX_BACKGROUND_COUNT: u32 = 3;

/// A small hand-specified model: UTR emissions near 1, notUTR near 0 and
/// otherTranscript peaks high.
pub fn toy_model() -> BetaHmm {
    let transitions =
        TransitionMatrix::from_weights([[0.9, 0.1, 0.0], [0.0, 0.95, 0.05], [0.0, 0.9, 0.1]])
            .expect("valid toy transitions");
    let emissions = [
        BetaParams::new(5.0, 1.0).expect("valid UTR emission"),
        BetaParams::new(1.0, 10.0).expect("valid notUTR emission"),
        BetaParams::new(8.0, 1.5).expect("valid otherTranscript emission"),
    ];
    BetaHmm::new(transitions, emissions).expect("valid toy model")
}

/// A [`BetaFitter`] that ignores its samples, for testing estimation plumbing.
#[derive(Clone, Debug)]
pub struct FixedBetaFitter {
    pub params: BetaParams,
}

impl Default for FixedBetaFitter {
    fn default() -> Self {
        Self {
            params: BetaParams {
                shape1: 2.0,
                shape2: 2.0,
            },
        }
    }
}

impl BetaFitter for FixedBetaFitter {
    fn fit(&self, samples: &[f64]) -> Result<BetaParams, UtrExtError> {
        if samples.is_empty() {
            return Err(UtrExtError::EmptyEmissionPool("samples".to_string()));
        }
        Ok(self.params)
    }
}

/// A simulated gene: high coverage over the exon and its UTR, background after.
#[derive(Clone, Debug)]
pub struct SimulatedGene {
    pub gene_id: String,
    pub utr_bins: usize,
    /// Log10-scaled exon coverage.
    pub exon: f64,
    pub counts: Vec<f64>,
}

impl SimulatedGene {
    pub fn utr_length(&self) -> Position {
        self.utr_bins as Position * SIM_BIN_SIZE
    }
}

/// Simulate `n` genes from a seeded RNG.
pub fn simulate_genes(n: usize, seed: u64) -> Vec<SimulatedGene> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            let utr_bins = rng.gen_range(SIM_MIN_UTR_BINS..=SIM_MAX_UTR_BINS);
            let mut counts = Vec::with_capacity(SIM_N_BINS);
            counts.push(SIM_EXON_COUNT);
            for bin in 1..SIM_N_BINS {
                let count = if bin <= utr_bins {
                    rng.gen_range(SIM_MIN_UTR_COUNT..SIM_MAX_UTR_COUNT)
                } else {
                    rng.gen_range(0..=SIM_MAX_BACKGROUND_COUNT)
                };
                counts.push(count as f64);
            }
            SimulatedGene {
                gene_id: format!("gene{}", i),
                utr_bins,
                exon: (SIM_EXON_COUNT + 1.0).log10(),
                counts,
            }
        })
        .collect()
}

/// Write genes as a coverage table, with a header that does not name the
/// gene ID column (as R's `write.table()` does).
pub fn write_coverage_table(
    genes: &[SimulatedGene],
    path: impl AsRef<Path>,
) -> Result<(), UtrExtError> {
    let n_bins = genes.iter().map(|g| g.counts.len()).max().unwrap_or(0);
    let mut header = vec!["utr".to_string(), "exon".to_string()];
    header.extend((0..n_bins).map(|bin| bin.to_string()));

    let output = OutputFile::new(path.as_ref(), Some(header));
    let mut writer = output.writer()?;
    for gene in genes {
        let counts: Vec<String> = gene.counts.iter().map(|c| c.to_string()).collect();
        writeln!(
            writer,
            "{}\t{}\t{}\t{}",
            gene.gene_id,
            gene.utr_length(),
            gene.exon,
            counts.join("\t")
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a gene-info table for `genes`, alternating strands; gene `i` spans
/// `[10_000 * (i + 1), 10_000 * (i + 1) + 2_000]` on `chr1`.
pub fn write_gene_info(genes: &[SimulatedGene], path: impl AsRef<Path>) -> Result<(), UtrExtError> {
    let header = ["gene_id", "contig", "strand", "start", "end"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let output = OutputFile::new(path.as_ref(), Some(header));
    let mut writer = output.writer()?;
    for (i, gene) in genes.iter().enumerate() {
        let start = 10_000 * (i as Position + 1);
        let strand = if i % 2 == 0 { "+" } else { "-" };
        writeln!(
            writer,
            "{}\tchr1\t{}\t{}\t{}",
            gene.gene_id,
            strand,
            start,
            start + 2_000
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Simulate `n` genes into a temporary (plaintext) coverage table.
pub fn random_coverage_file(n: usize, seed: u64) -> Result<NamedTempFile, UtrExtError> {
    let file = NamedTempFile::new()?;
    write_coverage_table(&simulate_genes(n, seed), file.path())?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::{CoverageTable, Direction};

    #[test]
    fn test_simulation_is_seeded() {
        let a = simulate_genes(5, 7);
        let b = simulate_genes(5, 7);
        assert_eq!(a.len(), 5);
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.utr_bins, y.utr_bins);
            assert_eq!(x.counts, y.counts);
        }
    }

    #[test]
    fn test_written_table_reads_back() {
        let genes = simulate_genes(3, 1);
        let file = random_coverage_file(3, 1).unwrap();

        let table = CoverageTable::from_path(file.path(), Direction::Downstream).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.n_bins, SIM_N_BINS);
        assert_eq!(table.records[1].gene_id, "gene1");
        assert_eq!(table.records[1].utr_length, Some(genes[1].utr_length()));
        assert_eq!(table.records[1].bins[0], Some(SIM_EXON_COUNT));
    }
}
