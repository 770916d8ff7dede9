// Season aggregation: one player-season's weekly records reduced to a single
// season-level row.

use std::collections::BTreeMap;

use crate::error::PipelineError;
use crate::record::{SeasonRecord, WeeklyRecord};

/// Most frequent value; ties go to the smallest. `None` for no values.
pub fn modal_value<I>(values: I) -> Option<u32>
where
    I: IntoIterator<Item = u32>,
{
    let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
    for v in values {
        *counts.entry(v).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
        .map(|(v, _)| v)
}

/// Longest run of consecutive weeks with `played = false`.
pub fn max_consecutive_missed(records: &[WeeklyRecord]) -> u32 {
    let mut run = 0;
    let mut longest = 0;
    for record in records {
        if record.played {
            run = 0;
        } else {
            run += 1;
            longest = longest.max(run);
        }
    }
    longest
}

/// Reduce one player-season's records, ordered by week, to a SeasonRecord.
///
/// Fails on an empty set, on records from more than one player-season, and on
/// weeks that are duplicated or out of order.
pub fn aggregate_season(records: &[WeeklyRecord]) -> Result<SeasonRecord, PipelineError> {
    let first = records.first().ok_or_else(|| PipelineError::malformed("", 0, "no weekly records"))?;
    let (player_id, season) = (first.player_id.as_str(), first.season);

    if let Some(other) = records
        .iter()
        .find(|r| r.player_id != player_id || r.season != season)
    {
        return Err(PipelineError::malformed(
            player_id,
            season,
            format!("mixed with {} {}", other.player_id, other.season),
        ));
    }
    if let Some(pair) = records.windows(2).find(|pair| pair[0].week >= pair[1].week) {
        return Err(PipelineError::malformed(
            player_id,
            season,
            format!("week {} followed by week {}", pair[0].week, pair[1].week),
        ));
    }

    let scheduled_weeks = records.len() as u32;
    let games_played = records.iter().filter(|r| r.played).count() as u32;
    let total_touches: u32 = records.iter().map(WeeklyRecord::touches).sum();
    let total_rush_yds: i32 = records.iter().map(|r| r.stats.rush_yds).sum();
    let total_rec_yds: i32 = records.iter().map(|r| r.stats.rec_yds).sum();
    let injury_games = records.iter().filter(|r| r.injured).count() as u32;
    let max_missed = max_consecutive_missed(records);

    Ok(SeasonRecord {
        player_id: player_id.to_string(),
        player: first.player.clone(),
        season,
        team: first.team.clone(),
        age: modal_value(records.iter().filter_map(|r| r.age)),
        scheduled_weeks,
        games_played,
        games_missed: scheduled_weeks - games_played,
        total_touches,
        touches_per_game: if games_played > 0 {
            total_touches as f64 / games_played as f64
        } else {
            0.0
        },
        total_rush_yds,
        total_rec_yds,
        yards_per_touch: if total_touches > 0 {
            (total_rush_yds + total_rec_yds) as f64 / total_touches as f64
        } else {
            0.0
        },
        injury_games,
        injury_rate: injury_games as f64 / scheduled_weeks as f64,
        max_consecutive_missed: max_missed,
        multiweek_absences: max_missed >= 2,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{GameStats, InjuryHistory, WorkloadFeatures};

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    /// 17-week season where `missed` weeks are absent and every played week
    /// has 15 carries for 60 yards and 3 catches for 24 yards.
    fn season(missed: &[u32]) -> Vec<WeeklyRecord> {
        (1..=17)
            .map(|week| {
                let played = !missed.contains(&week);
                let stats = if played {
                    GameStats {
                        rush_att: 15,
                        rush_yds: 60,
                        receptions: 3,
                        rec_yds: 24,
                        ..GameStats::default()
                    }
                } else {
                    GameStats::default()
                };
                WeeklyRecord {
                    player_id: "HenrDe00".into(),
                    player: "Derrick Henry".into(),
                    season: 2023,
                    week,
                    team: "TEN".into(),
                    opponent: None,
                    date: None,
                    age: if played { Some(29) } else { None },
                    status: None,
                    reason: None,
                    stats,
                    played,
                    injured: !played,
                    workload: WorkloadFeatures::default(),
                    history: InjuryHistory::default(),
                    injury_recurrence: false,
                    injury_recurrence_alt: false,
                }
            })
            .collect()
    }

    // -- Absence runs --

    #[test]
    fn isolated_miss_is_not_multiweek() {
        let record = aggregate_season(&season(&[3])).unwrap();
        assert_eq!(record.max_consecutive_missed, 1);
        assert!(!record.multiweek_absences);
    }

    #[test]
    fn three_week_absence() {
        let record = aggregate_season(&season(&[6, 7, 8])).unwrap();
        assert_eq!(record.max_consecutive_missed, 3);
        assert!(record.multiweek_absences);
    }

    #[test]
    fn run_resets_on_played_week() {
        let record = aggregate_season(&season(&[2, 3, 5, 15, 16, 17])).unwrap();
        assert_eq!(record.max_consecutive_missed, 3);
    }

    // -- Totals --

    #[test]
    fn totals_and_rates() {
        let record = aggregate_season(&season(&[3, 4])).unwrap();
        assert_eq!(record.scheduled_weeks, 17);
        assert_eq!(record.games_played, 15);
        assert_eq!(record.games_missed, 2);
        assert_eq!(record.games_played + record.games_missed, record.scheduled_weeks);
        assert_eq!(record.total_touches, 15 * 18);
        assert!(approx_eq(record.touches_per_game, 18.0));
        assert_eq!(record.total_rush_yds, 900);
        assert_eq!(record.total_rec_yds, 360);
        assert!(approx_eq(record.yards_per_touch, 1260.0 / 270.0));
        assert_eq!(record.injury_games, 2);
        assert_eq!(record.age, Some(29));
    }

    #[test]
    fn lost_season_has_zero_rates() {
        let all: Vec<u32> = (1..=17).collect();
        let record = aggregate_season(&season(&all)).unwrap();
        assert_eq!(record.games_played, 0);
        assert_eq!(record.touches_per_game, 0.0);
        assert_eq!(record.yards_per_touch, 0.0);
        assert_eq!(record.age, None);
        assert_eq!(record.max_consecutive_missed, 17);
    }

    // -- Age mode --

    #[test]
    fn modal_age_prefers_most_frequent_then_smallest() {
        assert_eq!(modal_value(vec![25, 26, 26]), Some(26));
        assert_eq!(modal_value(vec![26, 25]), Some(25));
        assert_eq!(modal_value(Vec::new()), None);
    }

    // -- Malformed input --

    #[test]
    fn empty_season_is_malformed() {
        let err = aggregate_season(&[]).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedRecord { .. }));
    }

    #[test]
    fn unordered_weeks_are_malformed() {
        let mut records = season(&[]);
        records.swap(0, 1);
        assert!(aggregate_season(&records).is_err());
    }

    #[test]
    fn mixed_seasons_are_malformed() {
        let mut records = season(&[]);
        records[5].season = 2022;
        assert!(aggregate_season(&records).is_err());
    }
}
