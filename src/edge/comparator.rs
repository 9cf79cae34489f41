//! Edge between an observed touch probability and our reference estimate.
//!
//! reference = replicated probability when defined, else analytic
//! edge      = observed - reference
//!
//! Replication comes from live bid/ask and is the actionable benchmark; the
//! analytic model is the fallback anchor.
//!
//! Pure function, no side effects, no allocations.

use serde::{Deserialize, Serialize};

/// Classification thresholds. Stack-allocated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeThresholds {
    /// edge > +overpriced flags the observed claim as too expensive
    pub overpriced: f64,
    /// edge < -underpriced flags it as too cheap
    pub underpriced: f64,
}

impl Default for EdgeThresholds {
    fn default() -> Self {
        Self {
            overpriced: 0.10,
            underpriced: 0.10,
        }
    }
}

impl EdgeThresholds {
    pub fn symmetric(threshold: f64) -> Self {
        Self {
            overpriced: threshold,
            underpriced: threshold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Overpriced,
    Underpriced,
    NoSignal,
}

impl Classification {
    #[inline]
    pub fn is_signal(&self) -> bool {
        !matches!(self, Self::NoSignal)
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Overpriced => f.pad("overpriced"),
            Self::Underpriced => f.pad("underpriced"),
            Self::NoSignal => f.pad("no signal"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceSource {
    Replication,
    Analytic,
}

/// Result of one comparison. Stack-allocated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Comparison {
    pub reference_probability: f64,
    pub reference_source: ReferenceSource,
    /// observed - reference, unrounded
    pub edge: f64,
    pub classification: Classification,
}

#[inline]
pub fn compare(
    analytic: f64,
    replicated: Option<f64>,
    observed: f64,
    thresholds: &EdgeThresholds,
) -> Comparison {
    let (reference_probability, reference_source) = match replicated {
        Some(p) => (p, ReferenceSource::Replication),
        None => (analytic, ReferenceSource::Analytic),
    };

    let edge = observed - reference_probability;

    let classification = if edge > thresholds.overpriced {
        Classification::Overpriced
    } else if edge < -thresholds.underpriced {
        Classification::Underpriced
    } else {
        Classification::NoSignal
    };

    Comparison {
        reference_probability,
        reference_source,
        edge,
        classification,
    }
}
