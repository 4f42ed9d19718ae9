//! Eta-ranged parameterization of the calorimeter energy resolution.

use serde::{Deserialize, Serialize};

use crate::DetectorError;

/// One resolution term covering a range of |eta|.
///
/// The standard deviation it contributes is
/// `sqrt(noise² + stochastic²·E + constant²·E²)` for mean energy `E`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolutionTerm {
    /// Inclusive lower bound on |eta|.
    pub eta_min: f64,
    /// Exclusive upper bound on |eta|.
    pub eta_max: f64,
    /// Stochastic (sampling) coefficient.
    pub stochastic: f64,
    /// Constant (calibration) coefficient.
    pub constant: f64,
    /// Noise (electronics) coefficient.
    pub noise: f64,
}

/// Per-layer resolution function `σ(eta, mean energy)`.
///
/// Regions of |eta| not covered by any term resolve with zero width, so the
/// empty formula models a perfect detector.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolutionFormula {
    terms: Vec<ResolutionTerm>,
}

impl ResolutionFormula {
    /// Builds a formula from validated terms.
    ///
    /// Every term needs finite, non-negative coefficients and a non-empty
    /// eta range starting at a non-negative |eta|.
    pub fn new(terms: Vec<ResolutionTerm>) -> Result<Self, DetectorError> {
        for (index, term) in terms.iter().enumerate() {
            validate_term(index, term)?;
        }
        Ok(Self { terms })
    }

    /// Formula with zero width everywhere.
    #[must_use]
    pub fn perfect() -> Self {
        Self::default()
    }

    /// Evaluates the standard deviation at the given eta and mean energy.
    ///
    /// Negative mean energies are clamped to zero before evaluation; the
    /// first term covering |eta| wins.
    #[must_use]
    pub fn evaluate(&self, eta: f64, mean_energy: f64) -> f64 {
        let abs_eta = eta.abs();
        let energy = mean_energy.max(0.0);
        self.terms
            .iter()
            .find(|term| abs_eta >= term.eta_min && abs_eta < term.eta_max)
            .map(|term| {
                (term.noise * term.noise
                    + term.stochastic * term.stochastic * energy
                    + term.constant * term.constant * energy * energy)
                    .sqrt()
            })
            .unwrap_or(0.0)
    }

    /// Terms of the formula in evaluation order.
    #[must_use]
    pub fn terms(&self) -> &[ResolutionTerm] {
        &self.terms
    }
}

fn validate_term(index: usize, term: &ResolutionTerm) -> Result<(), DetectorError> {
    let invalid = |reason| DetectorError::InvalidResolutionTerm { index, reason };
    if !term.eta_min.is_finite() || !term.eta_max.is_finite() {
        return Err(invalid("eta bounds must be finite"));
    }
    if term.eta_min < 0.0 {
        return Err(invalid("eta bounds apply to |eta| and must be non-negative"));
    }
    if term.eta_min >= term.eta_max {
        return Err(invalid("eta range is empty"));
    }
    for coefficient in [term.stochastic, term.constant, term.noise] {
        if !coefficient.is_finite() || coefficient < 0.0 {
            return Err(invalid("coefficients must be finite and non-negative"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{ResolutionFormula, ResolutionTerm};
    use crate::DetectorError;

    fn term(eta_min: f64, eta_max: f64, stochastic: f64, constant: f64, noise: f64) -> ResolutionTerm {
        ResolutionTerm {
            eta_min,
            eta_max,
            stochastic,
            constant,
            noise,
        }
    }

    #[test]
    fn perfect_formula_has_zero_width_everywhere() {
        let formula = ResolutionFormula::perfect();
        assert_eq!(formula.evaluate(0.5, 100.0), 0.0);
        assert_eq!(formula.evaluate(-3.2, 1.0), 0.0);
    }

    #[test]
    fn evaluation_combines_the_three_coefficients() {
        let formula =
            ResolutionFormula::new(vec![term(0.0, 3.0, 0.1, 0.01, 0.5)]).expect("valid");
        let energy = 100.0;
        let expected = (0.5_f64 * 0.5 + 0.1 * 0.1 * energy + 0.01 * 0.01 * energy * energy).sqrt();
        assert!((formula.evaluate(1.0, energy) - expected).abs() < 1.0e-12);
        // Negative eta uses |eta|.
        assert!((formula.evaluate(-1.0, energy) - expected).abs() < 1.0e-12);
    }

    #[test]
    fn uncovered_eta_regions_resolve_with_zero_width() {
        let formula =
            ResolutionFormula::new(vec![term(0.0, 1.5, 0.1, 0.0, 0.0)]).expect("valid");
        assert_eq!(formula.evaluate(2.0, 100.0), 0.0);
    }

    #[test]
    fn negative_mean_energy_is_clamped_to_zero() {
        let formula =
            ResolutionFormula::new(vec![term(0.0, 3.0, 0.1, 0.0, 0.25)]).expect("valid");
        assert_eq!(formula.evaluate(0.5, -4.0), 0.25);
    }

    #[test]
    fn malformed_terms_are_rejected() {
        assert!(matches!(
            ResolutionFormula::new(vec![term(1.0, 1.0, 0.1, 0.0, 0.0)]),
            Err(DetectorError::InvalidResolutionTerm { index: 0, .. })
        ));
        assert!(matches!(
            ResolutionFormula::new(vec![term(0.0, 1.0, -0.1, 0.0, 0.0)]),
            Err(DetectorError::InvalidResolutionTerm { index: 0, .. })
        ));
        assert!(matches!(
            ResolutionFormula::new(vec![
                term(0.0, 1.0, 0.1, 0.0, 0.0),
                term(0.0, f64::INFINITY, 0.1, 0.0, 0.0)
            ]),
            Err(DetectorError::InvalidResolutionTerm { index: 1, .. })
        ));
    }
}
