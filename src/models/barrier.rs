use crate::models::{BarrierDirection, BarrierParams, ProbabilityModel};
use statrs::distribution::{ContinuousCDF, Normal};

/// Below this argument the normal CDF is taken in log space from the
/// asymptotic Mills-ratio expansion instead of `ln(cdf(x))`, which underflows.
const LN_CDF_ASYMPTOTIC_BELOW: f64 = -30.0;

/// Continuous-monitoring touch probability for GBM (reflection principle).
///
/// With mu = r - sigma^2/2, a = mu / sigma^2, b = ln(K/S):
///
///   z = (b - mu*T) / (sigma*sqrt(T))
///   y = (b + mu*T) / (sigma*sqrt(T))
///
///   up   (K >= S): P = Phi(-z) + (K/S)^(2a) * Phi(-y)
///   down (K < S):  P = Phi(z)  + (K/S)^(2a) * Phi(y)
///
/// The (K/S)^(2a) factor is the Girsanov weight of the reflected path. It is
/// combined with its CDF term in log space so a large |a| (tiny sigma, or
/// a barrier far from spot) cannot produce inf * 0.
pub struct ReflectionTouch {
    normal: Normal,
}

impl ReflectionTouch {
    pub fn new() -> Self {
        Self {
            normal: Normal::standard(),
        }
    }

    #[inline]
    fn cdf(&self, x: f64) -> f64 {
        self.normal.cdf(x)
    }

    /// ln(Phi(x)), finite for every finite x.
    fn ln_cdf(&self, x: f64) -> f64 {
        if x >= LN_CDF_ASYMPTOTIC_BELOW {
            return self.cdf(x).ln();
        }
        // Phi(x) ~ phi(x)/(-x) * (1 - 1/x^2 + 3/x^4) for x -> -inf
        let x2 = x * x;
        let series = 1.0 - 1.0 / x2 + 3.0 / (x2 * x2);
        -0.5 * x2 - (-x).ln() - 0.5 * (2.0 * std::f64::consts::PI).ln() + series.ln()
    }
}

impl Default for ReflectionTouch {
    fn default() -> Self {
        Self::new()
    }
}

impl ProbabilityModel for ReflectionTouch {
    #[inline]
    fn name(&self) -> &'static str {
        "Reflection touch"
    }

    fn probability(&self, params: &BarrierParams) -> f64 {
        if params.already_reached() {
            return 1.0;
        }
        if params.is_degenerate() {
            return params.boundary_outcome();
        }

        let b = params.ln_k_s;
        let mu_t = params.mu * params.ttl_years;
        let z = (b - mu_t) / params.sigma_sqrt_t;
        let y = (b + mu_t) / params.sigma_sqrt_t;
        let two_a = 2.0 * params.mu / (params.sigma * params.sigma);
        let ln_weight = two_a * b;

        let (direct, reflected_arg) = match params.direction {
            BarrierDirection::Up => (self.cdf(-z), -y),
            BarrierDirection::Down => (self.cdf(z), y),
        };

        // The reflected term is itself a probability; cap its log at 0.
        let ln_reflected = (ln_weight + self.ln_cdf(reflected_arg)).min(0.0);
        let reflected = if ln_reflected.is_finite() {
            ln_reflected.exp()
        } else {
            0.0
        };

        let p = direct + reflected;
        if p.is_finite() {
            p.clamp(0.0, 1.0)
        } else {
            tracing::warn!(
                spot = params.spot,
                barrier = params.barrier,
                sigma = params.sigma,
                "non-finite touch probability, using boundary outcome"
            );
            params.boundary_outcome()
        }
    }
}

/// Convenience wrapper: spot, barrier, time (years), vol (decimal), rate.
/// Direction is inferred from barrier vs spot.
pub fn touch_probability(spot: f64, barrier: f64, ttl_years: f64, sigma: f64, rate: f64) -> f64 {
    ReflectionTouch::new().probability(&BarrierParams::new(spot, barrier, ttl_years, sigma, rate))
}
