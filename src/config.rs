//! Run configuration: binning, pool thresholds and the otherTranscript heuristics.
//!
//! Every constant the model depends on is exposed here so it can be set from
//! the command line; [`ExtensionConfig::default()`] gives the values the
//! pipeline has always used.

use clap::{Args, ValueEnum};

use crate::{error::UtrExtError, Position};

/// Width of one coverage bin.
pub const DEFAULT_BIN_SIZE: Position = 100;
/// Size of the window scanned beyond the terminal exon.
pub const DEFAULT_TERRITORY_SIZE: Position = 15_000;
/// Log10-scaled exon coverage below which a gene counts as not expressed (raw count 10).
pub const DEFAULT_MIN_EXON_COVERAGE: f64 = 1.0;
/// Scaled values above this inside a known UTR enter the UTR emission pool.
pub const DEFAULT_WITHIN_UTR_THRESHOLD: f64 = 0.1;
/// Scaled values above this outside a known UTR also enter the otherTranscript pool.
pub const DEFAULT_OTHER_TRANSCRIPT_THRESHOLD: f64 = 0.5;
/// notUTR -> otherTranscript weight as a fraction of the notUTR self weight.
pub const DEFAULT_NOTUTR_TO_OTHER_FRACTION: f64 = 0.05;
/// Unnormalized otherTranscript -> notUTR weight.
pub const DEFAULT_OTHER_TO_NOTUTR_WEIGHT: f64 = 900.0;
/// Unnormalized otherTranscript -> otherTranscript weight.
pub const DEFAULT_OTHER_SELF_WEIGHT: f64 = 100.0;
/// Emission pools are truncated to this many samples before fitting.
pub const DEFAULT_MAX_POOL_SIZE: usize = 10_000;
/// Exact 0 and 1 are moved this far into (0, 1) to keep beta densities finite.
pub const DEFAULT_BOUNDARY_EPSILON: f64 = 0.001;

/// How raw bin counts are transformed before each row is divided by its maximum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ObservationScale {
    /// `log10(count + 1)`
    Log,
    /// raw counts
    Linear,
}

impl ObservationScale {
    #[inline(always)]
    pub fn apply(&self, count: f64) -> f64 {
        match self {
            ObservationScale::Log => (count + 1.0).log10(),
            ObservationScale::Linear => count,
        }
    }
}

/// All tunable parameters of UTR extension estimation.
#[derive(Args, Clone, Debug, PartialEq)]
pub struct ExtensionConfig {
    /// width of each coverage bin, in basepairs
    #[arg(long, default_value_t = DEFAULT_BIN_SIZE)]
    pub bin_size: Position,

    /// size of the territory scanned up/downstream of each gene, in basepairs
    #[arg(long, default_value_t = DEFAULT_TERRITORY_SIZE)]
    pub territory_size: Position,

    /// minimum (log10-scaled) terminal exon coverage for a gene to be used or decoded
    #[arg(long, default_value_t = DEFAULT_MIN_EXON_COVERAGE)]
    pub min_exon_coverage: f64,

    /// scaled coverage above which a bin within a known UTR is pooled for the UTR state
    #[arg(long, default_value_t = DEFAULT_WITHIN_UTR_THRESHOLD)]
    pub within_utr_threshold: f64,

    /// scaled coverage above which a bin outside a known UTR is pooled for the otherTranscript state
    #[arg(long, default_value_t = DEFAULT_OTHER_TRANSCRIPT_THRESHOLD)]
    pub other_transcript_threshold: f64,

    /// notUTR -> otherTranscript transition weight, as a fraction of notUTR -> notUTR
    #[arg(long, default_value_t = DEFAULT_NOTUTR_TO_OTHER_FRACTION)]
    pub notutr_to_other_fraction: f64,

    /// otherTranscript -> notUTR transition weight (before normalization)
    #[arg(long, default_value_t = DEFAULT_OTHER_TO_NOTUTR_WEIGHT)]
    pub other_to_notutr_weight: f64,

    /// otherTranscript -> otherTranscript transition weight (before normalization)
    #[arg(long, default_value_t = DEFAULT_OTHER_SELF_WEIGHT)]
    pub other_self_weight: f64,

    /// maximum number of samples per emission pool used for fitting
    #[arg(long, default_value_t = DEFAULT_MAX_POOL_SIZE)]
    pub max_pool_size: usize,

    /// amount exact 0 and 1 observations are moved into the open interval (0, 1)
    #[arg(long, default_value_t = DEFAULT_BOUNDARY_EPSILON)]
    pub boundary_epsilon: f64,

    /// transform applied to bin counts before building the emission pools
    #[arg(long, value_enum, default_value_t = ObservationScale::Log)]
    pub estimation_scale: ObservationScale,

    /// transform applied to bin counts before decoding (each row is then divided by its maximum)
    #[arg(long, value_enum, default_value_t = ObservationScale::Linear)]
    pub observation_scale: ObservationScale,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            bin_size: DEFAULT_BIN_SIZE,
            territory_size: DEFAULT_TERRITORY_SIZE,
            min_exon_coverage: DEFAULT_MIN_EXON_COVERAGE,
            within_utr_threshold: DEFAULT_WITHIN_UTR_THRESHOLD,
            other_transcript_threshold: DEFAULT_OTHER_TRANSCRIPT_THRESHOLD,
            notutr_to_other_fraction: DEFAULT_NOTUTR_TO_OTHER_FRACTION,
            other_to_notutr_weight: DEFAULT_OTHER_TO_NOTUTR_WEIGHT,
            other_self_weight: DEFAULT_OTHER_SELF_WEIGHT,
            max_pool_size: DEFAULT_MAX_POOL_SIZE,
            boundary_epsilon: DEFAULT_BOUNDARY_EPSILON,
            estimation_scale: ObservationScale::Log,
            observation_scale: ObservationScale::Linear,
        }
    }
}

impl ExtensionConfig {
    /// Number of bins in a full territory.
    pub fn territory_bins(&self) -> usize {
        (self.territory_size / self.bin_size) as usize
    }

    /// Check the configuration is usable, returning the first problem found.
    pub fn validate(&self) -> Result<(), UtrExtError> {
        if self.bin_size == 0 {
            return Err(UtrExtError::InvalidConfig(
                "bin size must be greater than zero".to_string(),
            ));
        }
        if self.territory_size < self.bin_size {
            return Err(UtrExtError::InvalidConfig(format!(
                "territory size ({}) must be at least one bin ({})",
                self.territory_size, self.bin_size
            )));
        }
        for (name, value) in [
            ("within-utr threshold", self.within_utr_threshold),
            ("other-transcript threshold", self.other_transcript_threshold),
            ("notUTR -> otherTranscript fraction", self.notutr_to_other_fraction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(UtrExtError::InvalidConfig(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        if !(self.boundary_epsilon > 0.0 && self.boundary_epsilon < 0.5) {
            return Err(UtrExtError::InvalidConfig(format!(
                "boundary epsilon must be within (0, 0.5), got {}",
                self.boundary_epsilon
            )));
        }
        if !(self.other_to_notutr_weight > 0.0) || !(self.other_self_weight >= 0.0) {
            return Err(UtrExtError::InvalidConfig(
                "otherTranscript transition weights must be positive".to_string(),
            ));
        }
        if self.max_pool_size == 0 {
            return Err(UtrExtError::InvalidConfig(
                "maximum pool size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ExtensionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.territory_bins(), 150);
        assert_eq!(config.estimation_scale, ObservationScale::Log);
        assert_eq!(config.observation_scale, ObservationScale::Linear);
    }

    #[test]
    fn test_invalid_configs() {
        let config = ExtensionConfig {
            bin_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(UtrExtError::InvalidConfig(_))));

        let config = ExtensionConfig {
            territory_size: 50,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ExtensionConfig {
            within_utr_threshold: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ExtensionConfig {
            boundary_epsilon: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_observation_scale() {
        assert_eq!(ObservationScale::Log.apply(9.0), 1.0);
        assert_eq!(ObservationScale::Log.apply(0.0), 0.0);
        assert_eq!(ObservationScale::Linear.apply(9.0), 9.0);
    }
}
