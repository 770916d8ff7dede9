// Cross-season injury history.
//
// History for a week in season `s` is built from season summaries of `s - 1`
// and earlier only, so every week of a season shares the same history.

use crate::record::{InjuryHistory, WeeklyRecord};

/// Injury totals for one player-season.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeasonInjurySummary {
    pub season: i32,
    pub injury_games: u32,
    pub total_games: u32,
    pub injury_rate: f64,
}

impl SeasonInjurySummary {
    pub fn is_injury_season(&self) -> bool {
        self.injury_games > 0
    }
}

/// Summarize each season of a player's timeline, in timeline order.
///
/// `records` must be ordered by season; each run of equal seasons becomes one
/// summary.
pub fn season_summaries(records: &[WeeklyRecord]) -> Vec<SeasonInjurySummary> {
    let mut summaries: Vec<SeasonInjurySummary> = Vec::new();
    for record in records {
        match summaries.last_mut() {
            Some(last) if last.season == record.season => {
                last.total_games += 1;
                last.injury_games += u32::from(record.injured);
            }
            _ => summaries.push(SeasonInjurySummary {
                season: record.season,
                injury_games: u32::from(record.injured),
                total_games: 1,
                injury_rate: 0.0,
            }),
        }
    }
    for summary in &mut summaries {
        summary.injury_rate = summary.injury_games as f64 / summary.total_games as f64;
    }
    summaries
}

/// Length of the injury-season run ending at the most recent prior season.
///
/// A healthy season or a gap in season years ends the run.
pub fn consecutive_injury_seasons(prior: &[SeasonInjurySummary]) -> u32 {
    let mut streak = 0;
    let mut expected: Option<i32> = None;
    for summary in prior.iter().rev() {
        if !summary.is_injury_season() || expected.is_some_and(|year| year != summary.season) {
            break;
        }
        streak += 1;
        expected = Some(summary.season - 1);
    }
    streak
}

/// Injury history as of the start of `season`, from the seasons in `prior`.
///
/// `prior` must hold only seasons strictly before `season`, in order.
pub fn history_before(prior: &[SeasonInjurySummary], season: i32) -> InjuryHistory {
    debug_assert!(prior.iter().all(|s| s.season < season));

    let injury_seasons: Vec<&SeasonInjurySummary> =
        prior.iter().filter(|s| s.is_injury_season()).collect();

    let injury_rate_prior_seasons = if prior.is_empty() {
        0.0
    } else {
        prior.iter().map(|s| s.injury_rate).sum::<f64>() / prior.len() as f64
    };

    let injury_severity_prior = if injury_seasons.is_empty() {
        0.0
    } else {
        injury_seasons.iter().map(|s| s.injury_games as f64).sum::<f64>()
            / injury_seasons.len() as f64
    };

    let last_injury_season = injury_seasons.last().map(|s| s.season);

    InjuryHistory {
        has_prior_injury_season: !injury_seasons.is_empty(),
        injury_seasons_count: injury_seasons.len() as u32,
        total_injury_games: prior.iter().map(|s| s.injury_games).sum(),
        injury_rate_prior_seasons,
        consecutive_injury_seasons: consecutive_injury_seasons(prior),
        last_injury_season,
        seasons_since_last_injury: last_injury_season.map(|last| season - last),
        injury_severity_prior,
    }
}

/// Earliest season with at least one injury week.
pub fn first_injury_season(summaries: &[SeasonInjurySummary]) -> Option<i32> {
    summaries
        .iter()
        .filter(|s| s.is_injury_season())
        .map(|s| s.season)
        .min()
}

/// Attach history and recurrence targets to one player's ordered records.
pub fn apply_injury_history(records: &mut [WeeklyRecord]) {
    let summaries = season_summaries(records);
    let first_injury = first_injury_season(&summaries);

    let mut start = 0;
    for (idx, summary) in summaries.iter().enumerate() {
        let history = history_before(&summaries[..idx], summary.season);
        let recurrence = first_injury.is_some_and(|first| summary.season > first);
        let end = start + summary.total_games as usize;
        for record in &mut records[start..end] {
            record.history = history;
            record.injury_recurrence = recurrence;
            record.injury_recurrence_alt = record.injured && history.has_prior_injury_season;
        }
        start = end;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{GameStats, WorkloadFeatures};

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn summary(season: i32, injury_games: u32, total_games: u32) -> SeasonInjurySummary {
        SeasonInjurySummary {
            season,
            injury_games,
            total_games,
            injury_rate: injury_games as f64 / total_games as f64,
        }
    }

    /// A season of `weeks` weeks with the listed weeks injured.
    fn season(season: i32, weeks: u32, injured: &[u32]) -> Vec<WeeklyRecord> {
        (1..=weeks)
            .map(|week| WeeklyRecord {
                player_id: "ChubNi00".into(),
                player: "Nick Chubb".into(),
                season,
                week,
                team: "CLE".into(),
                opponent: None,
                date: None,
                age: None,
                status: None,
                reason: None,
                stats: GameStats::default(),
                played: !injured.contains(&week),
                injured: injured.contains(&week),
                workload: WorkloadFeatures::default(),
                history: InjuryHistory::default(),
                injury_recurrence: false,
                injury_recurrence_alt: false,
            })
            .collect()
    }

    // -- Summaries --

    #[test]
    fn summaries_per_season() {
        let mut records = season(2021, 4, &[2, 3]);
        records.extend(season(2022, 5, &[]));
        let summaries = season_summaries(&records);

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].injury_games, 2);
        assert_eq!(summaries[0].total_games, 4);
        assert!(approx_eq(summaries[0].injury_rate, 0.5));
        assert_eq!(summaries[1].injury_games, 0);
        assert_eq!(summaries[1].total_games, 5);
    }

    // -- Streaks --

    #[test]
    fn streak_broken_by_healthy_season() {
        let prior = [summary(2021, 2, 17), summary(2022, 0, 17)];
        assert_eq!(consecutive_injury_seasons(&prior), 0);
    }

    #[test]
    fn streak_counts_back_to_back_injury_seasons() {
        let prior = [
            summary(2019, 3, 16),
            summary(2020, 0, 16),
            summary(2021, 1, 17),
            summary(2022, 4, 17),
        ];
        assert_eq!(consecutive_injury_seasons(&prior), 2);
    }

    #[test]
    fn streak_broken_by_missing_season_year() {
        let prior = [summary(2019, 3, 16), summary(2021, 1, 17)];
        assert_eq!(consecutive_injury_seasons(&prior), 1);
    }

    // -- History --

    #[test]
    fn empty_prior_is_clean_history() {
        let history = history_before(&[], 2023);
        assert_eq!(history, InjuryHistory::default());
        assert_eq!(history.seasons_since_last_injury, None);
    }

    #[test]
    fn injury_then_healthy_season() {
        // Injury season 2021 (2 games), healthy 2022, asking in 2023.
        let prior = [summary(2021, 2, 17), summary(2022, 0, 17)];
        let history = history_before(&prior, 2023);

        assert!(history.has_prior_injury_season);
        assert_eq!(history.injury_seasons_count, 1);
        assert_eq!(history.total_injury_games, 2);
        assert_eq!(history.last_injury_season, Some(2021));
        assert_eq!(history.seasons_since_last_injury, Some(2));
        assert_eq!(history.consecutive_injury_seasons, 0);
        assert!(approx_eq(history.injury_severity_prior, 2.0));
        assert!(approx_eq(history.injury_rate_prior_seasons, (2.0 / 17.0) / 2.0));
    }

    #[test]
    fn severity_averages_injury_seasons_only() {
        let prior = [summary(2020, 2, 16), summary(2021, 0, 17), summary(2022, 6, 17)];
        let history = history_before(&prior, 2023);
        assert!(approx_eq(history.injury_severity_prior, 4.0));
        assert_eq!(history.injury_seasons_count, 2);
        assert_eq!(history.consecutive_injury_seasons, 1);
    }

    // -- Recurrence targets --

    #[test]
    fn recurrence_marks_seasons_after_first_injury() {
        let mut records = season(2021, 3, &[]);
        records.extend(season(2022, 3, &[2]));
        records.extend(season(2023, 3, &[]));
        records.extend(season(2024, 3, &[1]));
        apply_injury_history(&mut records);

        let flags: Vec<bool> = records.iter().map(|r| r.injury_recurrence).collect();
        assert_eq!(
            flags,
            vec![false, false, false, false, false, false, true, true, true, true, true, true]
        );
    }

    #[test]
    fn alt_recurrence_requires_injury_and_history() {
        let mut records = season(2022, 3, &[2]);
        records.extend(season(2023, 3, &[3]));
        apply_injury_history(&mut records);

        // 2022 week 2 injured but no prior injury season.
        assert!(!records[1].injury_recurrence_alt);
        // 2023 week 3 injured with 2022 on record.
        assert!(records[5].injury_recurrence_alt);
        assert!(!records[3].injury_recurrence_alt);
        assert!(records[3].history.has_prior_injury_season);
    }

    #[test]
    fn history_uses_only_earlier_seasons() {
        let mut records = season(2022, 2, &[]);
        records.extend(season(2023, 2, &[1, 2]));
        apply_injury_history(&mut records);

        // 2023's own injuries are not visible to 2023.
        assert!(!records[2].history.has_prior_injury_season);
        assert!(!records[3].history.has_prior_injury_season);
        assert!(!records[3].injury_recurrence);
    }
}
