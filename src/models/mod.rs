pub mod barrier;
pub mod black_scholes;

use serde::{Deserialize, Serialize};

/// Days per year used to convert calendar time into `T`.
pub const DAYS_PER_YEAR: f64 = 365.25;

/// All analytic probability models implement this trait.
/// probability() must be a pure function: deterministic output from inputs only.
pub trait ProbabilityModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns a probability in [0, 1]. Never panics, never NaN.
    fn probability(&self, params: &BarrierParams) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarrierDirection {
    Up,
    Down,
}

impl BarrierDirection {
    /// Up when the barrier sits at or above spot, Down otherwise.
    #[inline]
    pub fn infer(spot: f64, barrier: f64) -> Self {
        if barrier >= spot {
            Self::Up
        } else {
            Self::Down
        }
    }
}

impl std::fmt::Display for BarrierDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Up => f.pad("up"),
            Self::Down => f.pad("down"),
        }
    }
}

/// Model inputs with the shared intermediate terms precomputed.
#[derive(Debug, Clone, Copy)]
pub struct BarrierParams {
    pub spot: f64,
    pub barrier: f64,
    pub ttl_years: f64,
    pub sigma: f64,
    pub rate: f64,
    pub direction: BarrierDirection,
    // Precomputed
    pub ln_k_s: f64,
    pub sigma_sqrt_t: f64,
    /// Log drift r - sigma^2/2
    pub mu: f64,
}

impl BarrierParams {
    #[inline]
    pub fn new(spot: f64, barrier: f64, ttl_years: f64, sigma: f64, rate: f64) -> Self {
        let direction = BarrierDirection::infer(spot, barrier);
        Self::with_direction(spot, barrier, ttl_years, sigma, rate, direction)
    }

    #[inline]
    pub fn with_direction(
        spot: f64,
        barrier: f64,
        ttl_years: f64,
        sigma: f64,
        rate: f64,
        direction: BarrierDirection,
    ) -> Self {
        let ln_k_s = (barrier / spot).ln();
        let sigma_sqrt_t = sigma * ttl_years.max(0.0).sqrt();
        let mu = rate - 0.5 * sigma * sigma;
        Self {
            spot,
            barrier,
            ttl_years,
            sigma,
            rate,
            direction,
            ln_k_s,
            sigma_sqrt_t,
            mu,
        }
    }

    /// Spot has already reached or passed the barrier in its direction.
    #[inline]
    pub fn already_reached(&self) -> bool {
        match self.direction {
            BarrierDirection::Up => self.spot >= self.barrier,
            BarrierDirection::Down => self.spot <= self.barrier,
        }
    }

    /// Any input that makes the diffusion undefined or its outcome known today:
    /// non-positive or non-finite spot/barrier, T <= 0, sigma <= 0.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        !(self.spot > 0.0 && self.spot.is_finite())
            || !(self.barrier > 0.0 && self.barrier.is_finite())
            || !(self.ttl_years > 0.0 && self.ttl_years.is_finite())
            || !(self.sigma > 0.0 && self.sigma.is_finite())
            || !self.rate.is_finite()
            || self.sigma_sqrt_t < 1e-12
    }

    /// 0/1 outcome used whenever the diffusion cannot move the price.
    #[inline]
    pub fn boundary_outcome(&self) -> f64 {
        if self.already_reached() {
            1.0
        } else {
            0.0
        }
    }
}
