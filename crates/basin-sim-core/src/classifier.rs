//! Reduces a recorded metrics series to a qualitative basin label.
//!
//! The window is defined on cycles, not on sample counts, and every reduction
//! weights a sample by the number of cycles it covers. Feeding the same run
//! sampled every cycle or every 50 cycles therefore yields the same label as
//! long as the underlying trajectory is the same.

use crate::config::{BasinMetric, SimulationConfig};
use crate::metrics::MetricsSample;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BasinLabel {
    /// Nothing left to measure in the window.
    Extinct,
    Low,
    /// Only produced when an upper threshold is configured.
    Mid,
    High,
}

impl BasinLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            BasinLabel::Extinct => "extinct",
            BasinLabel::Low => "low",
            BasinLabel::Mid => "mid",
            BasinLabel::High => "high",
        }
    }
}

impl std::fmt::Display for BasinLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BasinCriteria {
    pub metric: BasinMetric,
    pub window_fraction: f64,
    pub threshold: f64,
    pub upper_threshold: Option<f64>,
}

impl BasinCriteria {
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            metric: config.basin_metric,
            window_fraction: config.basin_window_fraction,
            threshold: config.basin_threshold,
            upper_threshold: config.basin_upper_threshold,
        }
    }
}

impl Default for BasinCriteria {
    fn default() -> Self {
        Self::from_config(&SimulationConfig::default())
    }
}

/// Samples whose cycle lies in the final `window_fraction` of the recorded span.
/// Never empty for a non-empty series: the last sample is always included.
pub fn window(series: &[MetricsSample], window_fraction: f64) -> &[MetricsSample] {
    let (Some(first), Some(last)) = (series.first(), series.last()) else {
        return &[];
    };
    let start = first.cycle.saturating_sub(first.interval_cycles);
    let span = last.cycle.saturating_sub(start) as f64;
    let cutoff = last.cycle as f64 - span * window_fraction.clamp(0.0, 1.0);
    let begin = series
        .iter()
        .position(|s| s.cycle as f64 > cutoff)
        .unwrap_or(series.len() - 1);
    &series[begin..]
}

/// Cycle-weighted reduction of the chosen metric over the window.
/// `None` when the window holds nothing measurable.
pub fn window_value(series: &[MetricsSample], criteria: &BasinCriteria) -> Option<f64> {
    let samples = window(series, criteria.window_fraction);
    if samples.is_empty() {
        return None;
    }
    let weight = |s: &MetricsSample| s.interval_cycles.max(1) as f64;
    let value = match criteria.metric {
        BasinMetric::PopulationSize => {
            let total: f64 = samples.iter().map(weight).sum();
            samples
                .iter()
                .map(|s| s.population_size as f64 * weight(s))
                .sum::<f64>()
                / total
        }
        BasinMetric::CompositionRate => {
            let total: f64 = samples.iter().map(weight).sum();
            samples
                .iter()
                .map(|s| s.composition_count as f64)
                .sum::<f64>()
                / total
        }
        BasinMetric::EnergyDensity => {
            let mut total = 0.0;
            let mut acc = 0.0;
            for s in samples {
                if let Some(density) = s.energy_density {
                    total += weight(s);
                    acc += density * weight(s);
                }
            }
            if total == 0.0 {
                return None;
            }
            acc / total
        }
    };
    value.is_finite().then_some(value)
}

/// Label a run. Pure: the same series and criteria always give the same label.
///
/// `Extinct` only when the window is empty or holds no live agents; a live
/// window with nothing measured on the chosen metric is `Low`.
pub fn classify(series: &[MetricsSample], criteria: &BasinCriteria) -> BasinLabel {
    let samples = window(series, criteria.window_fraction);
    if samples.iter().all(|s| s.population_size == 0) {
        return BasinLabel::Extinct;
    }
    let Some(value) = window_value(series, criteria) else {
        return BasinLabel::Low;
    };
    match criteria.upper_threshold {
        Some(upper) if value >= upper => BasinLabel::High,
        Some(_) if value >= criteria.threshold => BasinLabel::Mid,
        None if value >= criteria.threshold => BasinLabel::High,
        _ => BasinLabel::Low,
    }
}

/// Holds criteria so callers can classify many series without re-reading config.
#[derive(Clone, Copy, Debug, Default)]
pub struct BasinClassifier {
    criteria: BasinCriteria,
}

impl BasinClassifier {
    pub fn new(criteria: BasinCriteria) -> Self {
        Self { criteria }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(BasinCriteria::from_config(config))
    }

    pub fn criteria(&self) -> &BasinCriteria {
        &self.criteria
    }

    pub fn classify(&self, series: &[MetricsSample]) -> BasinLabel {
        classify(series, &self.criteria)
    }
}
