//! Beta distributed emissions: parameters and their maximum-likelihood estimate.
//!
//! The estimate minimizes the negative log-likelihood
//!
//! ```text
//! -l(a, b) / n = ln B(a, b) - (a - 1) mean(ln x) - (b - 1) mean(ln(1 - x))
//! ```
//!
//! with a Nelder-Mead simplex over `(ln a, ln b)`, so both shapes stay positive.
//! The two sample means are sufficient statistics, so each evaluation is O(1)
//! however large the pool is.

use statrs::distribution::Beta;
use statrs::function::gamma::ln_gamma;

use crate::{error::UtrExtError, traits::BetaFitter};

/// Shape parameters of a beta distribution. Both are positive and finite.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BetaParams {
    pub shape1: f64,
    pub shape2: f64,
}

impl BetaParams {
    pub fn new(shape1: f64, shape2: f64) -> Result<Self, UtrExtError> {
        let valid = |x: f64| x.is_finite() && x > 0.0;
        if !valid(shape1) || !valid(shape2) {
            return Err(UtrExtError::InvalidBetaParameters(format!(
                "shape1={}, shape2={}",
                shape1, shape2
            )));
        }
        Ok(Self { shape1, shape2 })
    }

    /// The [`statrs`] distribution with these shapes.
    pub fn distribution(&self) -> Result<Beta, UtrExtError> {
        Beta::new(self.shape1, self.shape2)
            .map_err(|e| UtrExtError::InvalidBetaParameters(e.to_string()))
    }

}

impl std::fmt::Display for BetaParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6},{:.6}", self.shape1, self.shape2)
    }
}

/// Move exact 0 and 1 values `epsilon` into the open interval.
pub fn nudge_boundaries(values: &mut [f64], epsilon: f64) {
    for x in values.iter_mut() {
        if *x == 0.0 {
            *x = epsilon;
        } else if *x == 1.0 {
            *x = 1.0 - epsilon;
        }
    }
}

/// `ln B(a, b)`
fn ln_beta(a: f64, b: f64) -> f64 {
    ln_gamma(a) + ln_gamma(b) - ln_gamma(a + b)
}

/// Maximum-likelihood beta fit.
///
/// The defaults start from `shape1 = shape2 = 0.5` and stop on the same relative
/// tolerance rule as R's `optim()`.
///
/// A sample without spread has no maximum-likelihood estimate: the likelihood
/// keeps growing as both shapes go to infinity. Such samples, and fits that
/// end with a shape above `max_shape`, are [`UtrExtError::BetaFitDegenerate`].
#[derive(Clone, Debug)]
pub struct MaximumLikelihoodBeta {
    pub start: (f64, f64),
    pub initial_step: f64,
    pub relative_tolerance: f64,
    pub max_iterations: usize,
    pub max_shape: f64,
}

impl Default for MaximumLikelihoodBeta {
    fn default() -> Self {
        Self {
            start: (0.5, 0.5),
            initial_step: 0.5,
            relative_tolerance: 1e-8,
            max_iterations: 5_000,
            max_shape: 1e6,
        }
    }
}

impl BetaFitter for MaximumLikelihoodBeta {
    fn fit(&self, samples: &[f64]) -> Result<BetaParams, UtrExtError> {
        if samples.is_empty() {
            return Err(UtrExtError::EmptyEmissionPool("samples".to_string()));
        }
        if let Some(&bad) = samples.iter().find(|&&x| !(x > 0.0 && x < 1.0)) {
            return Err(UtrExtError::SampleOutOfRange(bad));
        }

        let first = samples[0];
        if samples.iter().all(|&x| x == first) {
            return Err(UtrExtError::BetaFitDegenerate(format!(
                "{} sample(s), all equal to {}",
                samples.len(),
                first
            )));
        }

        let n = samples.len() as f64;
        let mean_ln_x = samples.iter().map(|x| x.ln()).sum::<f64>() / n;
        let mean_ln_1mx = samples.iter().map(|x| (1.0 - x).ln()).sum::<f64>() / n;

        let negative_log_likelihood = |theta: &[f64]| {
            let (a, b) = (theta[0].exp(), theta[1].exp());
            ln_beta(a, b) - (a - 1.0) * mean_ln_x - (b - 1.0) * mean_ln_1mx
        };

        let start = [self.start.0.ln(), self.start.1.ln()];
        let (theta, _) = nelder_mead(
            negative_log_likelihood,
            &start,
            self.initial_step,
            self.relative_tolerance,
            self.max_iterations,
        )?;
        let (shape1, shape2) = (theta[0].exp(), theta[1].exp());
        if shape1 > self.max_shape || shape2 > self.max_shape {
            return Err(UtrExtError::BetaFitDegenerate(format!(
                "shapes {}, {} exceed {}",
                shape1, shape2, self.max_shape
            )));
        }
        BetaParams::new(shape1, shape2)
    }
}

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Minimize `f` with the Nelder-Mead simplex method.
///
/// Converged when the spread of function values over the simplex is within
/// `reltol * (|f_best| + reltol)`. Non-finite evaluations count as `+inf`.
/// Returns the best vertex and its value.
fn nelder_mead<F: Fn(&[f64]) -> f64>(
    f: F,
    start: &[f64],
    step: f64,
    reltol: f64,
    max_iterations: usize,
) -> Result<(Vec<f64>, f64), UtrExtError> {
    let eval = |x: &[f64]| {
        let value = f(x);
        if value.is_nan() {
            f64::INFINITY
        } else {
            value
        }
    };
    let dim = start.len();

    let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(dim + 1);
    simplex.push((start.to_vec(), eval(start)));
    for i in 0..dim {
        let mut vertex = start.to_vec();
        vertex[i] += step;
        let value = eval(&vertex);
        simplex.push((vertex, value));
    }

    for _iteration in 0..max_iterations {
        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
        let best = simplex[0].1;
        let worst = simplex[dim].1;
        if !best.is_finite() {
            return Err(UtrExtError::BetaFitNonFinite);
        }
        if (worst - best).abs() <= reltol * (best.abs() + reltol) {
            let (x, value) = simplex.swap_remove(0);
            return Ok((x, value));
        }

        let mut centroid = vec![0.0; dim];
        for (vertex, _) in &simplex[..dim] {
            for (c, v) in centroid.iter_mut().zip(vertex) {
                *c += v / dim as f64;
            }
        }
        let toward = |from: &[f64], coefficient: f64| -> Vec<f64> {
            centroid
                .iter()
                .zip(from)
                .map(|(c, x)| c + coefficient * (x - c))
                .collect()
        };

        let reflected = toward(&simplex[dim].0, -REFLECTION);
        let f_reflected = eval(&reflected);

        if f_reflected < best {
            let expanded = toward(&reflected, EXPANSION);
            let f_expanded = eval(&expanded);
            simplex[dim] = if f_expanded < f_reflected {
                (expanded, f_expanded)
            } else {
                (reflected, f_reflected)
            };
            continue;
        }
        if f_reflected < simplex[dim - 1].1 {
            simplex[dim] = (reflected, f_reflected);
            continue;
        }

        let (contracted, accept_below) = if f_reflected < worst {
            (toward(&reflected, CONTRACTION), f_reflected)
        } else {
            (toward(&simplex[dim].0, CONTRACTION), worst)
        };
        let f_contracted = eval(&contracted);
        if f_contracted < accept_below {
            simplex[dim] = (contracted, f_contracted);
            continue;
        }

        // shrink toward the best vertex
        let best_vertex = simplex[0].0.clone();
        for (vertex, value) in simplex.iter_mut().skip(1) {
            for (x, b) in vertex.iter_mut().zip(&best_vertex) {
                *x = b + SHRINK * (*x - b);
            }
            *value = eval(vertex);
        }
    }
    Err(UtrExtError::BetaFitDidNotConverge(max_iterations))
}
