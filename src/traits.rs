//! Traits used by the utrext library.
//!

use crate::{
    beta::BetaParams,
    error::UtrExtError,
    hmm::{BetaHmm, State},
    io::tsv::TsvConfig,
};

/// Defines how to serialize something to TSV.
pub trait TsvSerialize {
    fn to_tsv(&self, config: &TsvConfig) -> String;
}

/// Fits the two shape parameters of a beta distribution to samples in `(0, 1)`.
///
/// Implementations may use any optimizer, but should fail rather than return
/// an estimate they did not converge on: the fitted parameters drive every
/// decoding downstream.
pub trait BetaFitter {
    fn fit(&self, samples: &[f64]) -> Result<BetaParams, UtrExtError>;
}

/// Decodes the single most probable state path for a sequence of observations.
pub trait HmmDecoder {
    fn decode(&self, model: &BetaHmm, observations: &[f64]) -> Result<Vec<State>, UtrExtError>;
}
