use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::Thresholds;
use crate::sensors::Sample;

/// Event severity, ordered so that escalation can use plain comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Minor,
    Moderate,
    Severe,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Minor => "minor",
            Severity::Moderate => "moderate",
            Severity::Severe => "severe",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying one sample. `level` is `None` below the minor
/// threshold.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Classification {
    pub deviation: f64,
    pub level: Option<Severity>,
}

/// Scalar deviation for one sample: the maximum absolute value among the
/// three axis readings.
///
/// Deliberately not the Euclidean norm — the deployed firmware triggers on
/// single-axis shock, and switching to root-sum-square would change trigger
/// sensitivity for every installed node.
pub fn deviation(sample: &Sample) -> f64 {
    sample.ax.abs().max(sample.ay.abs()).max(sample.az.abs())
}

/// Pure classification against the three ordered thresholds, checked
/// highest first so a deviation at exactly the severe threshold is severe.
/// Each band is inclusive on its lower bound.
pub fn classify(sample: &Sample, thresholds: &Thresholds) -> Classification {
    let dev = deviation(sample);
    let level = if dev >= thresholds.severe {
        Some(Severity::Severe)
    } else if dev >= thresholds.moderate {
        Some(Severity::Moderate)
    } else if dev >= thresholds.minor {
        Some(Severity::Minor)
    } else {
        None
    };
    Classification {
        deviation: dev,
        level,
    }
}
