//! Baseline comparison.
//!
//! Each current benchmark is matched to the baseline entry of the same name
//! and given a ratio oriented so that larger always means worse:
//! `current / baseline` for durations, `baseline / current` for throughput.
//! Ratios strictly above the threshold become alerts.

use crate::result::{BenchResult, BenchSuite, Direction};
use crate::threshold::Threshold;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchDelta {
    pub name: String,
    pub unit: String,
    pub current: f64,
    pub baseline: Option<f64>,
    /// `None` when there is no baseline or the ratio is undefined.
    pub ratio: Option<f64>,
    pub alert: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub name: String,
    pub unit: String,
    pub current: f64,
    pub baseline: f64,
    pub ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub direction: Direction,
    pub threshold: String,
    pub deltas: Vec<BenchDelta>,
    /// Sorted by descending ratio, then name.
    pub alerts: Vec<Alert>,
    /// Current benchmarks without a baseline entry.
    pub new: Vec<String>,
    /// Baseline benchmarks absent from the current run.
    pub missing: Vec<String>,
}

impl Comparison {
    pub fn has_alerts(&self) -> bool {
        !self.alerts.is_empty()
    }
}

/// Ratio oriented so that values above 1.0 are regressions.
pub fn regression_ratio(direction: Direction, current: f64, baseline: f64) -> Option<f64> {
    let (num, den) = match direction {
        Direction::SmallerIsBetter => (current, baseline),
        Direction::BiggerIsBetter => (baseline, current),
    };
    if den == 0.0 {
        return None;
    }
    let ratio = num / den;
    ratio.is_finite().then_some(ratio)
}

pub fn compare(
    current: &BenchSuite,
    baseline: Option<&BenchSuite>,
    direction: Direction,
    threshold: Threshold,
) -> Comparison {
    let mut deltas = Vec::with_capacity(current.len());
    let mut alerts = Vec::new();
    let mut new = Vec::new();

    for bench in current.iter() {
        let prev = baseline.and_then(|b| b.get(&bench.name));
        let delta = match prev {
            None => {
                new.push(bench.name.clone());
                delta_without_baseline(bench)
            }
            Some(prev) => {
                let ratio = regression_ratio(direction, bench.value, prev.value);
                if ratio.is_none() {
                    tracing::warn!(
                        bench = %bench.name,
                        current = bench.value,
                        baseline = prev.value,
                        "ratio undefined; skipping comparison"
                    );
                }
                let alert = ratio.is_some_and(|r| threshold.exceeded_by(r));
                if let (true, Some(ratio)) = (alert, ratio) {
                    alerts.push(Alert {
                        name: bench.name.clone(),
                        unit: bench.unit.clone(),
                        current: bench.value,
                        baseline: prev.value,
                        ratio,
                    });
                }
                BenchDelta {
                    name: bench.name.clone(),
                    unit: bench.unit.clone(),
                    current: bench.value,
                    baseline: Some(prev.value),
                    ratio,
                    alert,
                }
            }
        };
        deltas.push(delta);
    }

    let missing = baseline
        .map(|b| {
            b.iter()
                .filter(|prev| current.get(&prev.name).is_none())
                .map(|prev| prev.name.clone())
                .collect()
        })
        .unwrap_or_default();

    alerts.sort_by(|a, b| {
        b.ratio
            .partial_cmp(&a.ratio)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });

    Comparison {
        direction,
        threshold: threshold.to_string(),
        deltas,
        alerts,
        new,
        missing,
    }
}

fn delta_without_baseline(bench: &BenchResult) -> BenchDelta {
    BenchDelta {
        name: bench.name.clone(),
        unit: bench.unit.clone(),
        current: bench.value,
        baseline: None,
        ratio: None,
        alert: false,
    }
}
