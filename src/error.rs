//! The [`UtrExtError`] `enum` definition and error messages.
//!
use std::num::{ParseFloatError, ParseIntError};
use thiserror::Error;

/// The [`UtrExtError`] defines the standard set of errors that should
/// be passed to the user.
#[derive(Debug, Error)]
pub enum UtrExtError {
    // IO related errors
    #[error("File reading error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("TSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    // File parsing related errors
    #[error("Integer parsing error: {0}")]
    ParseIntError(#[from] ParseIntError),
    #[error("Float parsing error: {0}")]
    ParseFloatError(#[from] ParseFloatError),
    #[error("Gene info table is invalid: {0}")]
    InvalidGeneInfo(String),
    #[error("Invalid strand '{0}': must be either '+', '-', or '.'")]
    InvalidStrand(String),
    #[error("Coverage table '{0}' is empty: a header line is required")]
    MissingHeader(String),
    #[error("Coverage table has too few columns: a gene identifier, 'utr' and 'exon' are required.\nHeader: {0}")]
    CoverageTooFewColumns(String),
    #[error("Coverage table line {line} is malformed: {reason}")]
    MalformedCoverageRow { line: usize, reason: String },

    // Parameter estimation errors (fatal for a direction)
    #[error("Emission pool '{0}' is empty: no beta distribution can be fitted")]
    EmptyEmissionPool(String),
    #[error("Beta samples must lie strictly within (0, 1), got {0}")]
    SampleOutOfRange(f64),
    #[error("Beta fit did not converge after {0} iterations")]
    BetaFitDidNotConverge(usize),
    #[error("Beta fit produced non-finite likelihood")]
    BetaFitNonFinite,
    #[error("Beta fit is degenerate: {0}")]
    BetaFitDegenerate(String),
    #[error("Beta fit for emission pool '{pool}' failed: {source}")]
    EmissionFitFailed {
        pool: String,
        #[source]
        source: Box<UtrExtError>,
    },
    #[error("Invalid beta parameters: {0}")]
    InvalidBetaParameters(String),
    #[error("Transition matrix row {0} has no weight and cannot be normalized")]
    DegenerateTransitionRow(usize),

    // Per-gene decoding errors (recoverable)
    #[error("Observation sequence has {0} usable values, at least 2 are required")]
    ObservationsTooShort(usize),
    #[error("Observation sequence is all zero")]
    ObservationsAllZero,
    #[error("Viterbi decoding failed: {0}")]
    DecodingFailed(String),

    // Command line tool related errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Command line argument error: {0}")]
    ArgumentError(#[from] clap::error::Error),
}
