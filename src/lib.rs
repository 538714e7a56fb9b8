//! Estimate untranslated region (UTR) extensions from binned read coverage.
//!
//! Coverage upstream and downstream of each gene's terminal exon is modelled
//! with a three state hidden Markov model (UTR, notUTR, otherTranscript) with
//! beta distributed emissions. Parameters are estimated from genes with known
//! UTRs, and every gene is then Viterbi-decoded to place a new UTR boundary.

pub mod beta;
pub mod commands;
pub mod config;
pub mod coverage;
pub mod decode;
pub mod error;
pub mod estimate;
pub mod hmm;
pub mod io;
pub mod reconcile;
pub mod reporting;
pub mod test_utilities;
pub mod traits;

/// Genomic coordinates and lengths, in basepairs.
pub type Position = u64;

pub mod prelude {
    pub use crate::config::{ExtensionConfig, ObservationScale};
    pub use crate::coverage::{CoverageTable, Direction, GeneCoverageRecord};
    pub use crate::decode::{DecodeCounter, SequenceDecoder, UtrExtension};
    pub use crate::error::UtrExtError;
    pub use crate::estimate::{ModelParameters, ParameterEstimator};
    pub use crate::hmm::{BetaHmm, LogSpaceViterbi, State, TransitionMatrix};
    pub use crate::io::parsers::geneinfo::{read_gene_info, GeneInfo, Strand};
    pub use crate::traits::{BetaFitter, HmmDecoder, TsvSerialize};
}
