//! The orchestrator: fetches every requested timeframe, fans detection out
//! across them, merges the per-timeframe results into cross-timeframe
//! agreement, and assembles one plain-data report.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;

use itertools::Itertools;
use rayon::prelude::*;

use crate::analysis::{confluence, features, level_detection};
use crate::config::AnalysisConfig;
use crate::data::{CandleCache, CandleProvider, TimeframeAggregator};
use crate::domain::{Timeframe, TimeframeDataset};
use crate::models::{
    AnalysisReport, AnalysisSummary, DetectedLine, FeatureVector, PatternCandidate,
    ValidationResult,
};
use crate::patterns;
use crate::{EngineError, Result};

/// Confidence at or above which a line counts as high-confidence in the
/// report summary.
const HIGH_CONFIDENCE: f64 = 0.8;

pub struct MultiTimeframeAnalyzer<P> {
    aggregator: TimeframeAggregator<P>,
    config: AnalysisConfig,
}

impl<P: CandleProvider> MultiTimeframeAnalyzer<P> {
    /// Rejects an invalid configuration up front, so a bad threshold is a
    /// constructor error rather than a run that silently returns nothing.
    pub fn new(provider: Arc<P>, config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        let aggregator = TimeframeAggregator::new(provider, config.fetch.clone());
        Ok(MultiTimeframeAnalyzer { aggregator, config })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn cache(&self) -> &CandleCache {
        self.aggregator.cache()
    }

    /// Full analysis of one symbol across the requested timeframes. Failed
    /// timeframes are omitted (the report says which survived); an empty
    /// request is the caller's bug and errors out.
    pub async fn analyze(&self, symbol: &str, timeframes: &[Timeframe]) -> Result<AnalysisReport> {
        if timeframes.is_empty() {
            return Err(EngineError::EmptyTimeframeSet);
        }
        let datasets = self.aggregator.fetch(symbol, timeframes).await;
        Ok(self.analyze_datasets(symbol, &datasets))
    }

    /// The pure core of [`analyze`](Self::analyze): everything after the
    /// data layer. Deterministic for a given dataset map.
    pub fn analyze_datasets(
        &self,
        symbol: &str,
        datasets: &HashMap<Timeframe, TimeframeDataset>,
    ) -> AnalysisReport {
        let started = Instant::now();

        // BTreeMap fixes the iteration order so identical inputs always
        // produce identical reports.
        let ordered: BTreeMap<Timeframe, &TimeframeDataset> =
            datasets.iter().map(|(&tf, ds)| (tf, ds)).collect();

        let entries: Vec<(Timeframe, &TimeframeDataset)> =
            ordered.iter().map(|(&tf, &ds)| (tf, ds)).collect();
        let detected: BTreeMap<Timeframe, Vec<DetectedLine>> = entries
            .par_iter()
            .map(|&(tf, ds)| (tf, level_detection::detect_levels(ds, &self.config)))
            .collect();

        let by_timeframe = cross_timeframe_support(&detected, &self.config);

        let mut lines: Vec<DetectedLine> =
            by_timeframe.values().flatten().cloned().collect();
        let zones = confluence::build_confluence_zones(&lines, &self.config);

        lines.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.id.cmp(&b.id))
        });
        lines.truncate(self.config.max_lines);

        // Patterns come from the finest surviving timeframe: it has the most
        // candles per formation and the coarser ones echo the same shapes.
        let mut patterns: Vec<PatternCandidate> = ordered
            .values()
            .next()
            .map(|ds| patterns::scan(&ds.candles, &self.config.pattern))
            .unwrap_or_default();
        patterns.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.start_index.cmp(&b.start_index))
                .then_with(|| a.end_index.cmp(&b.end_index))
        });
        patterns.truncate(self.config.pattern.max_proposals);

        let summary = summarize(&lines, started.elapsed().as_millis() as u64);
        log::info!(
            "{symbol}: {} lines, {} zones, {} patterns across {} timeframes in {}ms",
            lines.len(),
            zones.len(),
            patterns.len(),
            ordered.len(),
            summary.detection_time_ms
        );

        AnalysisReport {
            symbol: symbol.to_string(),
            timeframes_analyzed: ordered.keys().copied().collect(),
            lines,
            zones,
            patterns,
            summary,
        }
    }

    /// Scores an arbitrary price against freshly detected levels on every
    /// requested timeframe. The price need not be a detected level.
    pub async fn validate(
        &self,
        symbol: &str,
        price: f64,
        timeframes: &[Timeframe],
    ) -> Result<ValidationResult> {
        if timeframes.is_empty() {
            return Err(EngineError::EmptyTimeframeSet);
        }
        let datasets = self.aggregator.fetch(symbol, timeframes).await;
        Ok(self.validate_against_datasets(price, &datasets))
    }

    /// Pure counterpart of [`validate`](Self::validate).
    pub fn validate_against_datasets(
        &self,
        price: f64,
        datasets: &HashMap<Timeframe, TimeframeDataset>,
    ) -> ValidationResult {
        let by_timeframe: BTreeMap<Timeframe, Vec<DetectedLine>> = datasets
            .iter()
            .map(|(&tf, ds)| (tf, level_detection::detect_levels(ds, &self.config)))
            .collect();
        confluence::validate_price(price, &by_timeframe, &self.config)
    }

    /// Feature vector for one line against the dataset it was detected on.
    /// `analyzed_timeframes` should be the timeframe count of the run the
    /// line came from.
    pub fn extract_features(
        &self,
        line: &DetectedLine,
        dataset: &TimeframeDataset,
        analyzed_timeframes: usize,
    ) -> FeatureVector {
        let current_price = dataset.last_close().unwrap_or(line.price);
        features::extract_features(
            line,
            &dataset.candles,
            current_price,
            analyzed_timeframes,
            &self.config.feature,
        )
    }
}

/// For every line, collect the timeframes that detected a line at (nearly)
/// the same price. Lines are immutable, so agreement produces new instances.
fn cross_timeframe_support(
    detected: &BTreeMap<Timeframe, Vec<DetectedLine>>,
    config: &AnalysisConfig,
) -> BTreeMap<Timeframe, Vec<DetectedLine>> {
    detected
        .iter()
        .map(|(&tf, lines)| {
            let enriched = lines
                .iter()
                .map(|line| {
                    let tolerance = line.price * config.level.price_tolerance_pct / 100.0;
                    let mut supporting = BTreeSet::from([tf]);
                    for (&other_tf, other_lines) in detected {
                        if other_tf == tf {
                            continue;
                        }
                        if other_lines
                            .iter()
                            .any(|o| (o.price - line.price).abs() <= tolerance)
                        {
                            supporting.insert(other_tf);
                        }
                    }
                    line.clone().with_supporting_timeframes(supporting)
                })
                .collect_vec();
            (tf, enriched)
        })
        .collect()
}

fn summarize(lines: &[DetectedLine], detection_time_ms: u64) -> AnalysisSummary {
    let average_strength = if lines.is_empty() {
        0.0
    } else {
        lines.iter().map(|l| l.strength).sum::<f64>() / lines.len() as f64
    };
    AnalysisSummary {
        total_lines: lines.len(),
        high_confidence_lines: lines
            .iter()
            .filter(|l| l.confidence >= HIGH_CONFIDENCE)
            .count(),
        multi_timeframe_lines: lines
            .iter()
            .filter(|l| l.supporting_timeframes.len() >= 2)
            .count(),
        average_strength,
        detection_time_ms,
    }
}
