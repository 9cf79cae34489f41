use crate::models::{BarrierDirection, BarrierParams, ProbabilityModel};
use statrs::distribution::{ContinuousCDF, Normal};

/// Black-Scholes terminal (European digital) probability.
///
/// Up:   P(S_T >= K) = Phi(d2)
/// Down: P(S_T <= K) = Phi(-d2)
///
/// where d2 = (ln(S/K) + (r - sigma^2/2)*T) / (sigma * sqrt(T)).
///
/// Only looks at the price at expiry, so it is a lower bound for the touch
/// probability of the same barrier; the ratio between the two is reported
/// next to every estimate.
pub struct EuropeanDigital {
    /// Standard normal distribution (created once, reused)
    normal: Normal,
}

impl EuropeanDigital {
    pub fn new() -> Self {
        Self {
            normal: Normal::standard(),
        }
    }
}

impl Default for EuropeanDigital {
    fn default() -> Self {
        Self::new()
    }
}

impl ProbabilityModel for EuropeanDigital {
    #[inline]
    fn name(&self) -> &'static str {
        "European digital"
    }

    #[inline]
    fn probability(&self, params: &BarrierParams) -> f64 {
        if params.is_degenerate() {
            return params.boundary_outcome();
        }

        // d2 = (ln(S/K) + mu*T) / (sigma*sqrt(T)), and ln(S/K) = -ln(K/S)
        let d2 = (-params.ln_k_s + params.mu * params.ttl_years) / params.sigma_sqrt_t;

        let p = match params.direction {
            BarrierDirection::Up => self.normal.cdf(d2),
            BarrierDirection::Down => self.normal.cdf(-d2),
        };

        if p.is_finite() {
            p.clamp(0.0, 1.0)
        } else {
            params.boundary_outcome()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atm_near_half() {
        let model = EuropeanDigital::new();
        let params = BarrierParams::with_direction(
            100_000.0,
            100_000.0,
            0.25,
            0.5,
            0.0,
            BarrierDirection::Up,
        );
        let p = model.probability(&params);
        // ATM digital is slightly below 0.5 due to the -sigma^2/2 drift
        assert!(p < 0.5 && p > 0.4, "ATM prob={p}");
    }

    #[test]
    fn test_deep_itm() {
        let model = EuropeanDigital::new();
        let params = BarrierParams::with_direction(
            130_000.0,
            100_000.0,
            0.1,
            0.5,
            0.0,
            BarrierDirection::Up,
        );
        let p = model.probability(&params);
        assert!(p > 0.9, "deep ITM prob={p}");
    }

    #[test]
    fn test_deep_otm() {
        let model = EuropeanDigital::new();
        let params = BarrierParams::new(70_000.0, 100_000.0, 0.1, 0.5, 0.0);
        let p = model.probability(&params);
        assert!(p < 0.1, "deep OTM prob={p}");
    }

    #[test]
    fn test_up_and_down_are_complements() {
        let model = EuropeanDigital::new();
        let up = BarrierParams::with_direction(100.0, 110.0, 1.0, 0.4, 0.03, BarrierDirection::Up);
        let down =
            BarrierParams::with_direction(100.0, 110.0, 1.0, 0.4, 0.03, BarrierDirection::Down);
        let sum = model.probability(&up) + model.probability(&down);
        assert!((sum - 1.0).abs() < 1e-12, "sum={sum}");
    }

    #[test]
    fn test_expired_uses_boundary_outcome() {
        let model = EuropeanDigital::new();
        assert_eq!(model.probability(&BarrierParams::new(90.0, 100.0, 0.0, 0.5, 0.0)), 0.0);
        assert_eq!(model.probability(&BarrierParams::new(100.0, 100.0, 0.0, 0.5, 0.0)), 1.0);
    }
}
