//! The three state UTR hidden Markov model and its Viterbi decoder.
//!
//! ```text
//! UTR --|--> notUTR --|--> otherTranscript --|
//!   ^---|      ^------|              ^-------|
//!              ^-----------------------------|
//! ```
//!
//! Every chain starts in UTR (the territory begins at the terminal exon) and
//! ends in notUTR or otherTranscript. otherTranscript models short peaks of
//! coverage downstream of a UTR, e.g. unannotated exons or transcripts, which
//! would otherwise pull the UTR boundary out to them.
//!
//! All probabilities are kept in log space.

use statrs::distribution::{Beta, Continuous};

use crate::{beta::BetaParams, error::UtrExtError, traits::HmmDecoder};

/// Hidden states, in transition matrix order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum State {
    Utr = 0,
    NotUtr = 1,
    OtherTranscript = 2,
}

/// Number of hidden states.
pub const NSTATES: usize = 3;

/// The chain always starts in [`State::Utr`].
pub const INITIAL_DISTRIBUTION: [f64; NSTATES] = [1.0, 0.0, 0.0];

impl State {
    pub const ALL: [State; NSTATES] = [State::Utr, State::NotUtr, State::OtherTranscript];

    #[inline(always)]
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn name(&self) -> &'static str {
        match self {
            State::Utr => "UTR",
            State::NotUtr => "notUTR",
            State::OtherTranscript => "otherTranscript",
        }
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A row-stochastic 3x3 transition matrix, indexed `[from][to]`.
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionMatrix {
    probs: [[f64; NSTATES]; NSTATES],
}

impl TransitionMatrix {
    /// Normalize non-negative weights so each row sums to one.
    ///
    /// # Errors
    ///
    /// A row with a negative or non-finite weight, or no weight at all, is
    /// [`UtrExtError::DegenerateTransitionRow`].
    pub fn from_weights(weights: [[f64; NSTATES]; NSTATES]) -> Result<Self, UtrExtError> {
        let mut probs = [[0.0; NSTATES]; NSTATES];
        for (i, row) in weights.iter().enumerate() {
            if row.iter().any(|w| !w.is_finite() || *w < 0.0) {
                return Err(UtrExtError::DegenerateTransitionRow(i));
            }
            let total: f64 = row.iter().sum();
            if !(total > 0.0) {
                return Err(UtrExtError::DegenerateTransitionRow(i));
            }
            for (p, w) in probs[i].iter_mut().zip(row) {
                *p = w / total;
            }
        }
        Ok(Self { probs })
    }

    #[inline(always)]
    pub fn prob(&self, from: State, to: State) -> f64 {
        self.probs[from.index()][to.index()]
    }

    pub fn rows(&self) -> &[[f64; NSTATES]; NSTATES] {
        &self.probs
    }
}

impl std::fmt::Display for TransitionMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rows: Vec<String> = self
            .probs
            .iter()
            .map(|row| {
                row.iter()
                    .map(|p| format!("{:.6}", p))
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .collect();
        write!(f, "[{}]", rows.join("; "))
    }
}

/// A fitted HMM with beta emissions, shared read-only by every decoding.
#[derive(Clone, Debug)]
pub struct BetaHmm {
    distributions: [Beta; NSTATES],
    log_initial: [f64; NSTATES],
    log_transitions: [[f64; NSTATES]; NSTATES],
}

impl BetaHmm {
    /// Build the model; `emissions` are indexed by [`State::index()`].
    pub fn new(
        transitions: TransitionMatrix,
        emissions: [BetaParams; NSTATES],
    ) -> Result<Self, UtrExtError> {
        let distributions = [
            emissions[0].distribution()?,
            emissions[1].distribution()?,
            emissions[2].distribution()?,
        ];
        let log_initial = INITIAL_DISTRIBUTION.map(f64::ln);
        let log_transitions = transitions.probs.map(|row| row.map(f64::ln));
        Ok(Self {
            distributions,
            log_initial,
            log_transitions,
        })
    }

    #[inline(always)]
    pub fn log_initial(&self, state: State) -> f64 {
        self.log_initial[state.index()]
    }

    #[inline(always)]
    pub fn log_transition(&self, from: State, to: State) -> f64 {
        self.log_transitions[from.index()][to.index()]
    }

    #[inline(always)]
    pub fn log_emission(&self, state: State, x: f64) -> f64 {
        self.distributions[state.index()].ln_pdf(x)
    }
}

/// Standard Viterbi decoding by dynamic programming over log probabilities,
/// O(states² × length). Ties go to the lower state index.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSpaceViterbi;

impl HmmDecoder for LogSpaceViterbi {
    fn decode(&self, model: &BetaHmm, observations: &[f64]) -> Result<Vec<State>, UtrExtError> {
        let obs_count = observations.len();
        if obs_count == 0 {
            return Err(UtrExtError::DecodingFailed("no observations".to_string()));
        }

        let emission = |state: State, position: usize| -> Result<f64, UtrExtError> {
            let log_prob = model.log_emission(state, observations[position]);
            if log_prob.is_nan() || log_prob == f64::INFINITY {
                return Err(UtrExtError::DecodingFailed(format!(
                    "emission of {} at position {} is not a finite probability",
                    observations[position], position
                )));
            }
            Ok(log_prob)
        };

        let mut scores = vec![[f64::NEG_INFINITY; NSTATES]; obs_count];
        let mut back_pointer = vec![[State::Utr; NSTATES]; obs_count];

        for state in State::ALL {
            scores[0][state.index()] = model.log_initial(state) + emission(state, 0)?;
        }

        for position in 1..obs_count {
            for to in State::ALL {
                let mut max_from = State::Utr;
                let mut max_log_prob = f64::NEG_INFINITY;
                for from in State::ALL {
                    let log_prob =
                        scores[position - 1][from.index()] + model.log_transition(from, to);
                    if log_prob > max_log_prob {
                        max_from = from;
                        max_log_prob = log_prob;
                    }
                }
                scores[position][to.index()] = max_log_prob + emission(to, position)?;
                back_pointer[position][to.index()] = max_from;
            }
        }

        let mut max_state = State::Utr;
        let mut max_log_prob = f64::NEG_INFINITY;
        for state in State::ALL {
            if scores[obs_count - 1][state.index()] > max_log_prob {
                max_state = state;
                max_log_prob = scores[obs_count - 1][state.index()];
            }
        }
        if max_log_prob == f64::NEG_INFINITY {
            return Err(UtrExtError::DecodingFailed(
                "no state path has non-zero probability".to_string(),
            ));
        }

        let mut path = vec![State::Utr; obs_count];
        for position in (0..obs_count).rev() {
            path[position] = max_state;
            max_state = back_pointer[position][max_state.index()];
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utilities::toy_model;
    use approx::assert_relative_eq;

    fn path_log_prob(model: &BetaHmm, path: &[State], observations: &[f64]) -> f64 {
        let mut log_prob = model.log_initial(path[0]) + model.log_emission(path[0], observations[0]);
        for i in 1..path.len() {
            log_prob += model.log_transition(path[i - 1], path[i])
                + model.log_emission(path[i], observations[i]);
        }
        log_prob
    }

    #[test]
    fn test_transition_rows_sum_to_one() {
        let matrix =
            TransitionMatrix::from_weights([[30.0, 2.0, 0.0], [0.0, 200.0, 10.0], [0.0, 900.0, 100.0]])
                .unwrap();
        for row in matrix.rows() {
            assert_relative_eq!(row.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        }
        assert_relative_eq!(matrix.prob(State::OtherTranscript, State::OtherTranscript), 0.1);
        assert_eq!(matrix.prob(State::Utr, State::OtherTranscript), 0.0);
    }

    #[test]
    fn test_degenerate_transition_row() {
        let result =
            TransitionMatrix::from_weights([[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 9.0, 1.0]]);
        assert!(matches!(result, Err(UtrExtError::DegenerateTransitionRow(0))));

        let result =
            TransitionMatrix::from_weights([[1.0, 0.0, 0.0], [0.0, -1.0, 2.0], [0.0, 9.0, 1.0]]);
        assert!(matches!(result, Err(UtrExtError::DegenerateTransitionRow(1))));
    }

    #[test]
    fn test_viterbi_switches_at_drop() {
        let model = toy_model();
        let mut observations = vec![0.999];
        observations.extend(vec![0.9; 5]);
        observations.extend(vec![0.025; 10]);

        let path = LogSpaceViterbi.decode(&model, &observations).unwrap();
        assert_eq!(path.len(), 16);
        assert!(path[..6].iter().all(|s| *s == State::Utr));
        assert!(path[6..].iter().all(|s| *s == State::NotUtr));
    }

    #[test]
    fn test_viterbi_always_starts_in_utr() {
        let model = toy_model();
        let path = LogSpaceViterbi.decode(&model, &[0.01, 0.01, 0.01]).unwrap();
        assert_eq!(path[0], State::Utr);
    }

    #[test]
    fn test_viterbi_matches_exhaustive_search() {
        let model = toy_model();
        let observations = [0.95, 0.7, 0.2, 0.9, 0.05, 0.6];
        let path = LogSpaceViterbi.decode(&model, &observations).unwrap();
        let viterbi_log_prob = path_log_prob(&model, &path, &observations);

        let n = observations.len();
        let mut best = f64::NEG_INFINITY;
        for code in 0..NSTATES.pow(n as u32) {
            let mut rest = code;
            let candidate: Vec<State> = (0..n)
                .map(|_| {
                    let state = State::ALL[rest % NSTATES];
                    rest /= NSTATES;
                    state
                })
                .collect();
            best = best.max(path_log_prob(&model, &candidate, &observations));
        }
        assert_relative_eq!(viterbi_log_prob, best, epsilon = 1e-9);
    }

    #[test]
    fn test_viterbi_errors() {
        let model = toy_model();
        assert!(matches!(
            LogSpaceViterbi.decode(&model, &[]),
            Err(UtrExtError::DecodingFailed(_))
        ));
        // outside the support of every emission
        assert!(LogSpaceViterbi.decode(&model, &[0.5, 1.5]).is_err());
    }
}
