// Typed schema for the pipeline's input and output tables.
//
// Optional columns are explicit `Option`s resolved once at ingestion; the
// feature builders never check whether a field is present.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Raw stat line
// ---------------------------------------------------------------------------

/// Countable per-game stats for a running back. Zero for weeks not played.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GameStats {
    pub rush_att: u32,
    pub rush_yds: i32,
    pub rush_td: u32,
    pub targets: u32,
    pub receptions: u32,
    pub rec_yds: i32,
    pub rec_td: u32,
}

impl GameStats {
    /// Rush attempts plus receptions: the workload proxy.
    pub fn touches(&self) -> u32 {
        self.rush_att + self.receptions
    }

    /// Rushing plus receiving yards.
    pub fn scrimmage_yds(&self) -> i32 {
        self.rush_yds + self.rec_yds
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// One row of a player's raw game log. Its existence means the player played.
#[derive(Debug, Clone, PartialEq)]
pub struct GameLogEntry {
    pub player_id: String,
    pub player: String,
    pub season: i32,
    pub week: u32,
    pub team: Option<String>,
    pub opponent: Option<String>,
    pub date: Option<NaiveDate>,
    /// Age in whole years at the time of the game.
    pub age: Option<u32>,
    /// Free-text status column from the source (e.g. "Inactive").
    pub status: Option<String>,
    pub stats: GameStats,
}

/// Upstream explanation for a week the player did not appear in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbsenceNote {
    pub player_id: String,
    pub season: i32,
    pub week: u32,
    pub reason: String,
    pub team: Option<String>,
}

/// One scheduled regular-season game slot for a team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub team: String,
    pub season: i32,
    pub week: u32,
    pub opponent: Option<String>,
    pub date: Option<NaiveDate>,
}

/// Every team's schedule, indexed by `(team, season)` with weeks in order.
///
/// Read-only once built, so it can be shared across worker threads.
#[derive(Debug, Clone, Default)]
pub struct Schedule {
    by_team_season: HashMap<(String, i32), Vec<ScheduleEntry>>,
}

impl Schedule {
    pub fn new(entries: Vec<ScheduleEntry>) -> Self {
        let mut by_team_season: HashMap<(String, i32), Vec<ScheduleEntry>> = HashMap::new();
        for entry in entries {
            by_team_season
                .entry((entry.team.clone(), entry.season))
                .or_default()
                .push(entry);
        }
        for weeks in by_team_season.values_mut() {
            weeks.sort_by_key(|e| e.week);
        }
        Schedule { by_team_season }
    }

    /// Scheduled weeks for a team and season, ordered by week number.
    pub fn weeks(&self, team: &str, season: i32) -> Option<&[ScheduleEntry]> {
        self.by_team_season
            .get(&(team.to_string(), season))
            .map(Vec::as_slice)
            .filter(|weeks| !weeks.is_empty())
    }

    pub fn len(&self) -> usize {
        self.by_team_season.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Derived features
// ---------------------------------------------------------------------------

/// Backward-looking workload features for one week.
///
/// Every field is computed from weeks strictly before the record's own week.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WorkloadFeatures {
    pub touches_prev_1: u32,
    pub touches_prev_2: u32,
    pub touches_prev_3: u32,
    pub career_touches_prior: u32,
    pub career_weeks_prior: u32,
    pub career_games_prior: u32,
    pub recent_touches_avg: f64,
    pub recent_yards_avg: f64,
    pub touches_trend: f64,
    pub injured_weeks_prior: u32,
    pub injury_rate_prior: f64,
    /// Injured weeks inside the trailing window.
    pub prior_multiweek_prev: u32,
    pub season_touches_prior: u32,
    pub season_games_prior: u32,
    /// 1 for the player's first season on record, 2 for the next, ...
    pub season_experience: u32,
    pub late_season: bool,
}

/// Cross-season injury history as of the start of the record's season.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct InjuryHistory {
    pub has_prior_injury_season: bool,
    pub injury_seasons_count: u32,
    pub total_injury_games: u32,
    pub injury_rate_prior_seasons: f64,
    pub consecutive_injury_seasons: u32,
    pub last_injury_season: Option<i32>,
    pub seasons_since_last_injury: Option<i32>,
    pub injury_severity_prior: f64,
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// One row per `(player_id, season, week)` of the team schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyRecord {
    pub player_id: String,
    pub player: String,
    pub season: i32,
    pub week: u32,
    pub team: String,
    pub opponent: Option<String>,
    pub date: Option<NaiveDate>,
    pub age: Option<u32>,
    pub status: Option<String>,
    /// Why the week was missed, when the source says so.
    pub reason: Option<String>,
    pub stats: GameStats,
    pub played: bool,
    pub injured: bool,
    pub workload: WorkloadFeatures,
    pub history: InjuryHistory,
    /// Any week in a season after the player's first injury season.
    pub injury_recurrence: bool,
    /// Injured this week with an injury season already on record.
    pub injury_recurrence_alt: bool,
}

impl WeeklyRecord {
    pub fn touches(&self) -> u32 {
        self.stats.touches()
    }
}

/// Season-level rollup of one player-season's weekly records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonRecord {
    pub player_id: String,
    pub player: String,
    pub season: i32,
    pub team: String,
    pub age: Option<u32>,
    pub scheduled_weeks: u32,
    pub games_played: u32,
    pub games_missed: u32,
    pub total_touches: u32,
    pub touches_per_game: f64,
    pub total_rush_yds: i32,
    pub total_rec_yds: i32,
    pub yards_per_touch: f64,
    pub injury_games: u32,
    pub injury_rate: f64,
    pub max_consecutive_missed: u32,
    pub multiweek_absences: bool,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
