//! Parameter estimation from genes with known UTRs.
//!
//! Each expressed, complete gene contributes:
//!
//!  - transition counts: `utr_bins` UTR -> UTR, one UTR -> notUTR, and the
//!    remaining territory bins notUTR -> notUTR;
//!  - emissions: scaled values inside its known UTR (bin 0, the exon itself,
//!    excluded; only values above a threshold) to the UTR pool, everything after
//!    the UTR to the notUTR pool, and the high values after the UTR to the
//!    otherTranscript pool as well.
//!
//! The otherTranscript transitions are not estimated: they are fixed heuristics
//! (see [`ExtensionConfig`]), since estimating them from known UTRs would
//! dilute the UTR extensions.

use log::{debug, info};
use num_traits::Float;
use serde::Serialize;
use std::io::Write;
use std::iter::Sum;
use std::path::PathBuf;

use crate::{
    beta::{nudge_boundaries, BetaParams},
    config::ExtensionConfig,
    coverage::{Direction, ScaledProfile},
    error::UtrExtError,
    hmm::{BetaHmm, State, TransitionMatrix, NSTATES},
    io::file::OutputFile,
    traits::BetaFitter,
};

/// Calculate the mean; `None` if `values` is empty.
pub fn mean<F: Float + Sum>(values: &[F]) -> Option<F> {
    if values.is_empty() {
        return None;
    }
    let sum: F = values.iter().copied().sum();
    Some(sum / F::from(values.len())?)
}

/// Observed values pooled per state, across all genes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EmissionPools {
    pub within_utr: Vec<f64>,
    pub outside_utr: Vec<f64>,
    pub other_transcript: Vec<f64>,
}

impl EmissionPools {
    pub fn pool(&self, state: State) -> &[f64] {
        match state {
            State::Utr => &self.within_utr,
            State::NotUtr => &self.outside_utr,
            State::OtherTranscript => &self.other_transcript,
        }
    }

    /// The pool's name in log and error messages.
    pub fn pool_name(state: State) -> &'static str {
        match state {
            State::Utr => "within_utr",
            State::NotUtr => "outside_utr",
            State::OtherTranscript => "other_transcript",
        }
    }

    /// Keep only the first `max_size` values of each pool.
    pub fn truncate(&mut self, max_size: usize) {
        self.within_utr.truncate(max_size);
        self.outside_utr.truncate(max_size);
        self.other_transcript.truncate(max_size);
    }
}

/// Transition counts observed from known UTRs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransitionCounts {
    pub utr_to_utr: f64,
    pub utr_to_notutr: f64,
    pub notutr_to_notutr: f64,
}

impl TransitionCounts {
    /// The unnormalized transition weights, with the otherTranscript heuristics filled in.
    pub fn weights(&self, config: &ExtensionConfig) -> [[f64; NSTATES]; NSTATES] {
        [
            [self.utr_to_utr, self.utr_to_notutr, 0.0],
            [
                0.0,
                self.notutr_to_notutr,
                self.notutr_to_notutr * config.notutr_to_other_fraction,
            ],
            [0.0, config.other_to_notutr_weight, config.other_self_weight],
        ]
    }
}

/// Pool emissions and count transitions over the expressed profiles.
///
/// Returns the (uncapped) pools, the counts and the number of genes used.
pub fn build_pools(
    profiles: &[ScaledProfile],
    config: &ExtensionConfig,
) -> (EmissionPools, TransitionCounts, usize) {
    let mut pools = EmissionPools::default();
    let mut counts = TransitionCounts::default();
    let mut genes_used = 0;

    for profile in profiles {
        if profile.exon_coverage < config.min_exon_coverage {
            continue;
        }
        genes_used += 1;

        let utr_bins = (profile.utr_length / config.bin_size) as usize;
        let nonutr_bins = config.territory_size.saturating_sub(profile.utr_length) / config.bin_size;

        counts.utr_to_utr += utr_bins as f64;
        counts.utr_to_notutr += 1.0;
        counts.notutr_to_notutr += nonutr_bins as f64;

        let values = &profile.values;
        let utr_end = utr_bins.min(values.len());
        if utr_end > 1 {
            pools.within_utr.extend(
                values[1..utr_end]
                    .iter()
                    .filter(|&&x| x > config.within_utr_threshold),
            );
        }
        let outside = &values[utr_end.max(1).min(values.len())..];
        pools.outside_utr.extend(outside);
        pools.other_transcript.extend(
            outside
                .iter()
                .filter(|&&x| x > config.other_transcript_threshold),
        );
    }
    (pools, counts, genes_used)
}

/// Fitted parameters for one direction.
#[derive(Clone, Debug)]
pub struct ModelParameters {
    /// Emission parameters, indexed by [`State::index()`].
    pub emissions: [BetaParams; NSTATES],
    pub transitions: TransitionMatrix,
    /// Samples each emission was fitted on, after capping.
    pub pool_sizes: [usize; NSTATES],
    pub pool_means: [f64; NSTATES],
    pub genes_used: usize,
}

impl ModelParameters {
    /// The decodable model.
    pub fn hmm(&self) -> Result<BetaHmm, UtrExtError> {
        BetaHmm::new(self.transitions.clone(), self.emissions)
    }
}

/// Estimates [`ModelParameters`] with an injected [`BetaFitter`].
pub struct ParameterEstimator<'a, F: BetaFitter> {
    config: &'a ExtensionConfig,
    fitter: F,
}

impl<'a, F: BetaFitter> ParameterEstimator<'a, F> {
    pub fn new(config: &'a ExtensionConfig, fitter: F) -> Self {
        Self { config, fitter }
    }

    /// Estimate all parameters from scaled profiles.
    ///
    /// # Errors
    ///
    /// Any empty pool or failed fit is an error: there is no sensible
    /// decoding without valid parameters.
    pub fn estimate(&self, profiles: &[ScaledProfile]) -> Result<ModelParameters, UtrExtError> {
        let (mut pools, counts, genes_used) = build_pools(profiles, self.config);
        debug!(
            "estimation: {} profiles, {} expressed genes used",
            profiles.len(),
            genes_used
        );
        pools.truncate(self.config.max_pool_size);

        let describe = |state: State| {
            let pool = pools.pool(state);
            format!("{}={},{:.6}", state, pool.len(), mean(pool).unwrap_or(f64::NAN))
        };
        info!(
            "counting: (n,mean): {} {} {}",
            describe(State::Utr),
            describe(State::NotUtr),
            describe(State::OtherTranscript)
        );

        let mut emissions = Vec::with_capacity(NSTATES);
        let mut pool_sizes = [0; NSTATES];
        let mut pool_means = [0.0; NSTATES];
        for state in State::ALL {
            let name = EmissionPools::pool_name(state);
            let mut samples = pools.pool(state).to_vec();
            if samples.is_empty() {
                return Err(UtrExtError::EmptyEmissionPool(name.to_string()));
            }
            pool_sizes[state.index()] = samples.len();
            pool_means[state.index()] = mean(&samples).unwrap_or(f64::NAN);

            nudge_boundaries(&mut samples, self.config.boundary_epsilon);
            let params =
                self.fitter
                    .fit(&samples)
                    .map_err(|e| UtrExtError::EmissionFitFailed {
                        pool: name.to_string(),
                        source: Box::new(e),
                    })?;
            emissions.push(params);
        }
        let emissions = [emissions[0], emissions[1], emissions[2]];
        info!(
            "beta estimates: within_utr={} outside={} other={}",
            emissions[0], emissions[1], emissions[2]
        );

        let transitions = TransitionMatrix::from_weights(counts.weights(self.config))?;
        debug!("transition matrix: {}", transitions);

        Ok(ModelParameters {
            emissions,
            transitions,
            pool_sizes,
            pool_means,
            genes_used,
        })
    }
}

/// One row of the fitted model report: a state's emission and outgoing transitions.
#[derive(Debug, Serialize)]
struct ModelReportRow {
    direction: String,
    state: &'static str,
    shape1: f64,
    shape2: f64,
    pool_size: usize,
    pool_mean: f64,
    #[serde(rename = "to_UTR")]
    to_utr: f64,
    #[serde(rename = "to_notUTR")]
    to_notutr: f64,
    #[serde(rename = "to_otherTranscript")]
    to_other_transcript: f64,
}

/// Write fitted models as a TSV, three rows (one per state) per direction.
pub fn write_model_report(
    models: &[(Direction, &ModelParameters)],
    output: Option<&PathBuf>,
) -> Result<(), UtrExtError> {
    let output_stream = output.map_or(OutputFile::new_stdout(None), |file| {
        OutputFile::new(file, None)
    });
    let writer: Box<dyn Write> = output_stream.writer()?;
    let mut tsv_writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer);

    for (direction, model) in models {
        for state in State::ALL {
            let i = state.index();
            let row = model.transitions.rows()[i];
            tsv_writer.serialize(ModelReportRow {
                direction: direction.to_string(),
                state: state.name(),
                shape1: model.emissions[i].shape1,
                shape2: model.emissions[i].shape2,
                pool_size: model.pool_sizes[i],
                pool_mean: model.pool_means[i],
                to_utr: row[0],
                to_notutr: row[1],
                to_other_transcript: row[2],
            })?;
        }
    }
    tsv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beta::MaximumLikelihoodBeta;
    use crate::test_utilities::FixedBetaFitter;
    use approx::assert_relative_eq;

    fn profile(utr_length: u64, exon_coverage: f64, values: Vec<f64>) -> ScaledProfile {
        ScaledProfile {
            gene_id: "g".to_string(),
            utr_length,
            exon_coverage,
            values,
        }
    }

    fn small_config() -> ExtensionConfig {
        ExtensionConfig {
            territory_size: 1000,
            ..Default::default()
        }
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
        assert_eq!(mean::<f64>(&[]), None);
    }

    #[test]
    fn test_build_pools() {
        let config = small_config();
        // utr 300bp -> 3 UTR bins; bin 0 is the exon
        let values = vec![1.0, 0.9, 0.05, 0.8, 0.2, 0.6, 0.0, 0.0, 0.0, 0.0];
        let (pools, counts, used) = build_pools(&[profile(300, 2.0, values)], &config);

        assert_eq!(used, 1);
        assert_eq!(pools.within_utr, vec![0.9]);
        assert_eq!(pools.outside_utr, vec![0.8, 0.2, 0.6, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(pools.other_transcript, vec![0.8, 0.6]);
        assert_eq!(
            counts,
            TransitionCounts {
                utr_to_utr: 3.0,
                utr_to_notutr: 1.0,
                notutr_to_notutr: 7.0
            }
        );
    }

    #[test]
    fn test_build_pools_skips_low_expression() {
        let config = small_config();
        let (pools, counts, used) =
            build_pools(&[profile(300, 0.5, vec![1.0, 0.9, 0.9, 0.1])], &config);
        assert_eq!(used, 0);
        assert_eq!(pools, EmissionPools::default());
        assert_eq!(counts, TransitionCounts::default());
    }

    #[test]
    fn test_build_pools_no_utr_skips_exon() {
        let config = small_config();
        let (pools, counts, _) = build_pools(&[profile(0, 2.0, vec![1.0, 0.7, 0.1])], &config);
        assert!(pools.within_utr.is_empty());
        assert_eq!(pools.outside_utr, vec![0.7, 0.1]);
        assert_eq!(counts.utr_to_utr, 0.0);
        assert_eq!(counts.notutr_to_notutr, 10.0);
    }

    #[test]
    fn test_transition_weights() {
        let config = ExtensionConfig::default();
        let counts = TransitionCounts {
            utr_to_utr: 40.0,
            utr_to_notutr: 2.0,
            notutr_to_notutr: 200.0,
        };
        let matrix = TransitionMatrix::from_weights(counts.weights(&config)).unwrap();
        assert_relative_eq!(matrix.prob(State::Utr, State::Utr), 40.0 / 42.0);
        assert_relative_eq!(matrix.prob(State::NotUtr, State::OtherTranscript), 10.0 / 210.0);
        assert_relative_eq!(matrix.prob(State::OtherTranscript, State::NotUtr), 0.9);
        for row in matrix.rows() {
            assert_relative_eq!(row.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_empty_pool_is_fatal() {
        let config = small_config();
        // nothing above the otherTranscript threshold
        let profiles = vec![profile(300, 2.0, vec![1.0, 0.9, 0.8, 0.2, 0.1, 0.0])];
        let estimator = ParameterEstimator::new(&config, FixedBetaFitter::default());
        assert!(matches!(
            estimator.estimate(&profiles),
            Err(UtrExtError::EmptyEmissionPool(pool)) if pool == "other_transcript"
        ));
    }

    #[test]
    fn test_pool_cap() {
        let config = ExtensionConfig {
            territory_size: 1000,
            max_pool_size: 2,
            ..Default::default()
        };
        let profiles = vec![profile(300, 2.0, vec![1.0, 0.9, 0.8, 0.7, 0.6, 0.2, 0.1, 0.0])];
        let estimator = ParameterEstimator::new(&config, FixedBetaFitter::default());
        let model = estimator.estimate(&profiles).unwrap();
        assert_eq!(model.pool_sizes, [2, 2, 2]);
        assert_relative_eq!(model.pool_means[State::NotUtr.index()], 0.65);
    }

    #[test]
    fn test_fit_failure_is_fatal() {
        let config = small_config();
        let profiles = vec![profile(300, 2.0, vec![1.0, 0.9, 0.8, 0.7, 0.2, 0.0])];
        let fitter = MaximumLikelihoodBeta {
            max_iterations: 1,
            ..Default::default()
        };
        let estimator = ParameterEstimator::new(&config, fitter);
        assert!(matches!(
            estimator.estimate(&profiles),
            Err(UtrExtError::EmissionFitFailed { .. })
        ));
    }

    #[test]
    fn test_write_model_report() {
        let config = small_config();
        let profiles = vec![profile(300, 2.0, vec![1.0, 0.9, 0.8, 0.7, 0.2, 0.0])];
        let model = ParameterEstimator::new(&config, FixedBetaFitter::default())
            .estimate(&profiles)
            .unwrap();

        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();
        write_model_report(&[(Direction::Downstream, &model)], Some(&path)).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("direction\tstate\tshape1\tshape2"));
        assert!(lines[0].ends_with("to_UTR\tto_notUTR\tto_otherTranscript"));
        assert!(lines[1].starts_with("downstream\tUTR\t"));
    }
}
