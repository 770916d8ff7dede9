// Backward-looking workload features over a player's career timeline.
//
// Each week's features are emitted before that week is folded into the
// running state, so nothing from week `w` or later reaches week `w`.

use crate::config::FeatureConfig;
use crate::record::{WeeklyRecord, WorkloadFeatures};

/// Arithmetic mean; 0.0 for an empty window.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Least-squares slope of `values` against `0..n`; 0.0 with fewer than two
/// points.
pub fn slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = mean(values);
    let mut num = 0.0;
    let mut den = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        num += dx * (y - y_mean);
        den += dx * dx;
    }
    num / den
}

/// Compute workload features for one player's records.
///
/// `records` must be a single player's history ordered by `(season, week)`;
/// the returned vector is index-aligned with it. Career features run across
/// season boundaries, `season_*` features restart at each season's first week.
pub fn workload_features(records: &[WeeklyRecord], config: &FeatureConfig) -> Vec<WorkloadFeatures> {
    let window = config.recent_window.max(1);
    let mut out = Vec::with_capacity(records.len());

    let mut career_touches = 0u32;
    let mut career_games = 0u32;
    let mut injured_weeks = 0u32;
    let mut season_touches = 0u32;
    let mut season_games = 0u32;
    let mut current_season: Option<i32> = None;
    let mut season_experience = 0u32;

    for (i, record) in records.iter().enumerate() {
        if current_season != Some(record.season) {
            current_season = Some(record.season);
            season_touches = 0;
            season_games = 0;
            season_experience += 1;
        }

        let prev = |k: usize| if i >= k { records[i - k].touches() } else { 0 };

        let recent = &records[i.saturating_sub(window)..i];
        let recent_touches: Vec<f64> = recent.iter().map(|r| r.touches() as f64).collect();
        let recent_yards: Vec<f64> = recent
            .iter()
            .map(|r| r.stats.scrimmage_yds() as f64)
            .collect();

        let weeks_prior = i as u32;
        out.push(WorkloadFeatures {
            touches_prev_1: prev(1),
            touches_prev_2: prev(2),
            touches_prev_3: prev(3),
            career_touches_prior: career_touches,
            career_weeks_prior: weeks_prior,
            career_games_prior: career_games,
            recent_touches_avg: mean(&recent_touches),
            recent_yards_avg: mean(&recent_yards),
            touches_trend: slope(&recent_touches),
            injured_weeks_prior: injured_weeks,
            injury_rate_prior: if weeks_prior == 0 {
                0.0
            } else {
                injured_weeks as f64 / weeks_prior as f64
            },
            prior_multiweek_prev: recent.iter().filter(|r| r.injured).count() as u32,
            season_touches_prior: season_touches,
            season_games_prior: season_games,
            season_experience,
            late_season: record.week > config.late_season_week,
        });

        let touches = record.touches();
        career_touches += touches;
        season_touches += touches;
        if record.played {
            career_games += 1;
            season_games += 1;
        }
        if record.injured {
            injured_weeks += 1;
        }
    }

    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
