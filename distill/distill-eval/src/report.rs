//! Evaluation report: the processed tables a deployment decision reads.
//!
//! Four tables: overall power statistics, savings per wind stratum, oracle
//! performance on held-out data, and the robustness curve over wind speed.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use alloc_core::PowerStatistics;
use distill_oracle::FidelityReport;

use crate::error::Result;

/// Paired power statistics of the oracle against the minimum-norm baseline.
///
/// Both sides are distributions of per-episode mean true power over the
/// same wind conditions and gust realizations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerComparison {
    /// Baseline flights (`z = 0`).
    pub baseline: PowerStatistics,
    /// Oracle flights.
    pub oracle: PowerStatistics,
    /// Mean savings of the oracle over the baseline, percent.
    pub savings_percent: f64,
}

/// Energy savings within one wind-speed stratum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StratumSavings {
    /// Lower bin edge (m/s).
    pub lower: f64,
    /// Upper bin edge (m/s).
    pub upper: f64,
    /// Surviving episode pairs behind the numbers.
    pub episodes: usize,
    /// Episode pairs rejected for divergence.
    pub rejected: usize,
    /// Per-episode mean power of the baseline flights.
    pub power_baseline: PowerStatistics,
    /// Per-episode mean power of the oracle flights.
    pub power_oracle: PowerStatistics,
    /// Mean savings of the oracle over the baseline, percent.
    pub savings_percent: f64,
}

/// Oracle quality on data it never flew.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OraclePerformance {
    /// Fidelity recomputed on the held-out test split.
    pub fidelity: FidelityReport,
    /// Mean inference latency measured at acceptance.
    pub latency: Duration,
}

/// One point of the robustness sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobustnessPoint {
    /// Wind speed flown (m/s).
    pub wind_speed: f64,
    /// Whether the speed lies inside the training strata.
    pub in_distribution: bool,
    /// Surviving episode pairs at this point.
    pub episodes: usize,
    /// Episode pairs rejected for divergence.
    pub rejected: usize,
    /// Oracle fidelity against the reference search on the states the
    /// oracle itself visited.
    pub fidelity: FidelityReport,
    /// Mean savings of the oracle over the baseline, percent.
    pub savings_percent: f64,
}

/// Everything the evaluation produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Overall power comparison across the in-distribution flights.
    pub power_statistics: PowerComparison,
    /// Savings per training stratum.
    pub savings_by_stratum: Vec<StratumSavings>,
    /// Held-out fidelity and accepted latency.
    pub oracle_performance: OraclePerformance,
    /// Fidelity and savings as wind strengthens past the training envelope.
    pub robustness_curve: Vec<RobustnessPoint>,
}

impl EvaluationReport {
    /// Serialize to JSON.
    ///
    /// # Errors
    ///
    /// Returns a serialization error from `serde_json`.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a JSON report.
    ///
    /// # Errors
    ///
    /// Returns a parse error from `serde_json`.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Returns a human-readable summary.
    #[must_use]
    #[allow(clippy::let_underscore_must_use)] // String::write_fmt is infallible
    pub fn summary(&self) -> String {
        use std::fmt::Write;

        let mut s = String::new();
        let _ = writeln!(s, "Evaluation Summary");
        let _ = writeln!(s, "==================");
        let _ = writeln!(
            s,
            "Power: baseline {:.2} -> oracle {:.2} ({:+.2}% saved)",
            self.power_statistics.baseline.mean,
            self.power_statistics.oracle.mean,
            self.power_statistics.savings_percent
        );

        let _ = writeln!(s, "Savings by stratum:");
        for stratum in &self.savings_by_stratum {
            let _ = writeln!(
                s,
                "  [{:.1}, {:.1}] m/s: {:+.2}% over {} episodes",
                stratum.lower, stratum.upper, stratum.savings_percent, stratum.episodes
            );
        }

        if let Some((dim, r2)) = self.oracle_performance.fidelity.worst() {
            let _ = writeln!(
                s,
                "Fidelity on {} held-out samples: worst R^2 {:.4} (dimension {})",
                self.oracle_performance.fidelity.samples, r2, dim
            );
        }
        let _ = writeln!(
            s,
            "Accepted latency: {:.1} us",
            self.oracle_performance.latency.as_secs_f64() * 1e6
        );

        let _ = writeln!(s, "Robustness sweep:");
        for point in &self.robustness_curve {
            let tag = if point.in_distribution { "in" } else { "out of" };
            let worst = point.fidelity.worst().map_or(f64::NAN, |(_, r2)| r2);
            let _ = writeln!(
                s,
                "  {:.1} m/s ({tag} distribution): worst R^2 {:.4}, savings {:+.2}%",
                point.wind_speed, worst, point.savings_percent
            );
        }
        s
    }
}
