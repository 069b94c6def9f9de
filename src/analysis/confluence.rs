//! Cross-timeframe confluence: merging per-timeframe lines into consensus
//! zones, and validating arbitrary prices against every timeframe at once.

use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;

use crate::config::AnalysisConfig;
use crate::domain::Timeframe;
use crate::models::{ConfluenceZone, DetectedLine, LineKind, ValidationResult, ZoneKind};

/// Group lines whose prices fall within a percentage band of each other into
/// consensus zones. The band scales with price, so the same config works for
/// a 0.5-dollar altcoin and a 100k-dollar pair.
pub fn build_confluence_zones(
    lines: &[DetectedLine],
    config: &AnalysisConfig,
) -> Vec<ConfluenceZone> {
    if lines.is_empty() {
        return Vec::new();
    }

    let sorted: Vec<&DetectedLine> = lines
        .iter()
        .sorted_by(|a, b| a.price.total_cmp(&b.price))
        .collect();

    let mut zones = Vec::new();
    let mut group: Vec<&DetectedLine> = Vec::new();

    for line in sorted {
        let fits = group
            .last()
            .map(|prev| {
                let center = weighted_center(&group);
                (line.price - prev.price).abs()
                    <= center * config.confluence.zone_tolerance_pct / 100.0
            })
            .unwrap_or(true);
        if !fits {
            if let Some(zone) = finalize_zone(&group, config) {
                zones.push(zone);
            }
            group.clear();
        }
        group.push(line);
    }
    if let Some(zone) = finalize_zone(&group, config) {
        zones.push(zone);
    }
    zones
}

/// Touch-count-weighted mean price of a group.
fn weighted_center(group: &[&DetectedLine]) -> f64 {
    let total_touches: usize = group.iter().map(|l| l.touch_count()).sum();
    if total_touches == 0 {
        return group.iter().map(|l| l.price).sum::<f64>() / group.len() as f64;
    }
    group
        .iter()
        .map(|l| l.price * l.touch_count() as f64)
        .sum::<f64>()
        / total_touches as f64
}

fn finalize_zone(group: &[&DetectedLine], config: &AnalysisConfig) -> Option<ConfluenceZone> {
    if group.is_empty() {
        return None;
    }

    let supporting: BTreeSet<Timeframe> = group
        .iter()
        .flat_map(|l| l.supporting_timeframes.iter().copied())
        .collect();
    if supporting.len() < config.confluence.min_timeframes {
        log::debug!(
            "dropping zone near {:.4}: {} timeframes < {}",
            group[0].price,
            supporting.len(),
            config.confluence.min_timeframes
        );
        return None;
    }

    let center = weighted_center(group);
    let mut min = group.iter().map(|l| l.price).fold(f64::INFINITY, f64::min);
    let mut max = group
        .iter()
        .map(|l| l.price)
        .fold(f64::NEG_INFINITY, f64::max);

    // A single-price group still needs a non-degenerate band.
    if min >= max {
        let half_band = center * config.confluence.zone_tolerance_pct / 200.0;
        min = center - half_band;
        max = center + half_band;
    }

    let kinds: BTreeSet<&'static str> = group
        .iter()
        .map(|l| match l.kind {
            LineKind::Support => "support",
            LineKind::Resistance => "resistance",
            LineKind::Trendline => "trendline",
        })
        .collect();
    let kind = if kinds.len() == 1 && kinds.contains("support") {
        ZoneKind::Support
    } else if kinds.len() == 1 && kinds.contains("resistance") {
        ZoneKind::Resistance
    } else {
        ZoneKind::Pivot
    };

    Some(ConfluenceZone {
        price_min: min,
        price_center: center.clamp(min, max),
        price_max: max,
        kind,
        timeframe_count: supporting.len(),
        supporting_timeframes: supporting,
    })
}

/// Distance beyond the tolerance band, measured in band widths, at which a
/// nearest line stops contributing any credit.
const CREDIT_DECAY_BANDS: f64 = 8.0;

/// How well an arbitrary price holds up across timeframes: scores the
/// nearest detected line per timeframe and aggregates. The price need not
/// have been detected as a level beforehand.
///
/// A line inside the tolerance band counts as full support. Beyond the band
/// credit decays linearly with distance, so a price one band away from a
/// strong level still strictly outscores a price sitting in empty space.
pub fn validate_price(
    price: f64,
    lines_by_timeframe: &BTreeMap<Timeframe, Vec<DetectedLine>>,
    config: &AnalysisConfig,
) -> ValidationResult {
    let tolerance = price * config.confluence.zone_tolerance_pct / 100.0;

    let mut supporting = Vec::new();
    let mut touch_counts = BTreeMap::new();
    let mut strengths = Vec::new();
    let mut credit_sum = 0.0;

    for (&timeframe, lines) in lines_by_timeframe {
        let nearest = lines.iter().min_by(|a, b| {
            (a.price - price)
                .abs()
                .total_cmp(&(b.price - price).abs())
        });
        let Some(line) = nearest else { continue };

        let distance = (line.price - price).abs();
        let credit = if distance <= tolerance {
            1.0
        } else if tolerance > 0.0 {
            (1.0 - (distance - tolerance) / (tolerance * CREDIT_DECAY_BANDS)).max(0.0)
        } else {
            0.0
        };
        if credit <= 0.0 {
            continue;
        }

        // Only an in-band line counts as actual support; decayed credit
        // contributes to the score without claiming the timeframe.
        if distance <= tolerance {
            supporting.push(timeframe);
            touch_counts.insert(timeframe, line.touch_count());
        }
        strengths.push(line.strength * credit);
        credit_sum += credit;
    }

    let avg_strength = if strengths.is_empty() {
        0.0
    } else {
        strengths.iter().sum::<f64>() / strengths.len() as f64
    };
    let coverage = if lines_by_timeframe.is_empty() {
        0.0
    } else {
        credit_sum / lines_by_timeframe.len() as f64
    };
    let validation_score = (0.6 * coverage + 0.4 * avg_strength).clamp(0.0, 1.0);

    ValidationResult {
        price,
        validation_score,
        supporting_timeframes: supporting,
        touch_counts,
        avg_strength,
    }
}
