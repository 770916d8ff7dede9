// CSV ingestion and export for the pipeline's tables.
//
// Reads game logs in Pro-Football-Reference style (Week, Tm, Att, Yds, Rec,
// ...) or snake_case headers, team schedules, and optional absence notes.
// Malformed rows are skipped with a warning; a blank stat cell means the
// source recorded nothing for that column and is read as 0.
//
// Game log header contract for the shared PFR columns `Yds` and `TD`:
// - with a `Yds.1` column present (PFR's receiving-and-rushing table as
//   flattened by pandas), `Yds`/`TD` are receiving and `Yds.1`/`TD.1` are
//   rushing;
// - otherwise `Yds`/`TD` are rushing and receiving comes from
//   `Rec_Yds`/`Rec_TD`.
// Explicit snake_case columns (`rush_yds`, `rec_yds`, ...) win over both.
//
// A log row whose status carries a non-participation marker and whose stat
// cells are all blank or zero is an absence, not a game: it is returned as an
// AbsenceNote with the status as its reason.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;
use tracing::warn;

use crate::classify::Classifier;
use crate::pipeline::SeasonOutcome;
use crate::reconcile::normalize_team;
use crate::record::{AbsenceNote, GameLogEntry, GameStats, Schedule, ScheduleEntry, SeasonRecord, WeeklyRecord};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to open file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },

    #[error("validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Loaded game log
// ---------------------------------------------------------------------------

/// Rows of a game log file, split into games played and recorded absences.
#[derive(Debug, Clone, Default)]
pub struct GameLog {
    pub entries: Vec<GameLogEntry>,
    pub absences: Vec<AbsenceNote>,
}

// ---------------------------------------------------------------------------
// Raw CSV serde structs (private)
// ---------------------------------------------------------------------------

/// Game log row. Extra columns are ignored.
#[derive(Debug, Deserialize)]
struct RawGameLogRow {
    player_id: String,
    #[serde(default, alias = "Player", alias = "Name")]
    player: String,
    #[serde(alias = "year", alias = "Year")]
    season: i32,
    #[serde(alias = "Week")]
    week: u32,
    #[serde(default, alias = "Tm", alias = "Team")]
    team: Option<String>,
    #[serde(default, alias = "Opp")]
    opponent: Option<String>,
    #[serde(default, alias = "Date")]
    date: Option<NaiveDate>,
    #[serde(default, alias = "Age")]
    age: Option<f64>,
    #[serde(default, alias = "GS", alias = "Status")]
    status: Option<String>,
    #[serde(default, alias = "Att")]
    rush_att: Option<f64>,
    #[serde(default)]
    rush_yds: Option<f64>,
    #[serde(default)]
    rush_td: Option<f64>,
    #[serde(default, alias = "Tgt")]
    targets: Option<f64>,
    #[serde(default, alias = "Rec")]
    receptions: Option<f64>,
    #[serde(default, alias = "Rec_Yds")]
    rec_yds: Option<f64>,
    #[serde(default, alias = "Rec_TD")]
    rec_td: Option<f64>,
    #[serde(default, rename = "Yds")]
    yds: Option<f64>,
    #[serde(default, rename = "TD")]
    td: Option<f64>,
    #[serde(default, rename = "Yds.1")]
    yds_1: Option<f64>,
    #[serde(default, rename = "TD.1")]
    td_1: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawScheduleRow {
    #[serde(alias = "Tm", alias = "Team")]
    team: String,
    #[serde(alias = "year", alias = "Year")]
    season: i32,
    #[serde(alias = "Week")]
    week: u32,
    #[serde(default, alias = "Opp")]
    opponent: Option<String>,
    #[serde(default, alias = "Date")]
    date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct RawAbsenceRow {
    player_id: String,
    #[serde(alias = "year", alias = "Year")]
    season: i32,
    #[serde(alias = "Week")]
    week: u32,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default, alias = "Tm", alias = "Team")]
    team: Option<String>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Blank cell → 0; negative or non-finite counts are rejected.
fn count(value: Option<f64>, column: &str) -> Result<u32, String> {
    match value {
        None => Ok(0),
        Some(v) if v.is_finite() && v >= 0.0 => Ok(v.round() as u32),
        Some(v) => Err(format!("invalid {column} value {v}")),
    }
}

/// Blank cell → 0; yardage may be negative.
fn yards(value: Option<f64>, column: &str) -> Result<i32, String> {
    match value {
        None => Ok(0),
        Some(v) if v.is_finite() => Ok(v.round() as i32),
        Some(v) => Err(format!("invalid {column} value {v}")),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Which columns the shared `Yds`/`TD` headers stand for in one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum YardsLayout {
    /// `Yds`/`TD` are rushing.
    RushingOnly,
    /// `Yds`/`TD` are receiving, `Yds.1`/`TD.1` are rushing.
    ReceivingThenRushing,
}

impl YardsLayout {
    fn from_headers(headers: &csv::StringRecord) -> Self {
        if headers.iter().any(|h| h.trim() == "Yds.1") {
            YardsLayout::ReceivingThenRushing
        } else {
            YardsLayout::RushingOnly
        }
    }
}

/// A game log row is either a game the player appeared in or a recorded
/// absence.
#[derive(Debug)]
enum LogRow {
    Game(GameLogEntry),
    Absence(AbsenceNote),
}

impl RawGameLogRow {
    /// Resolve the shared columns into `(rush_yds, rush_td, rec_yds, rec_td)`.
    fn resolved_yards(&self, layout: YardsLayout) -> [Option<f64>; 4] {
        let (rush_yds, rush_td, rec_yds, rec_td) = match layout {
            YardsLayout::RushingOnly => (self.yds, self.td, None, None),
            YardsLayout::ReceivingThenRushing => (self.yds_1, self.td_1, self.yds, self.td),
        };
        [
            self.rush_yds.or(rush_yds),
            self.rush_td.or(rush_td),
            self.rec_yds.or(rec_yds),
            self.rec_td.or(rec_td),
        ]
    }

    /// True when no stat cell holds a non-zero value.
    fn is_empty_stat_line(&self, layout: YardsLayout) -> bool {
        [self.rush_att, self.targets, self.receptions]
            .into_iter()
            .chain(self.resolved_yards(layout))
            .flatten()
            .all(|v| v == 0.0)
    }

    fn into_row(self, layout: YardsLayout, classifier: &Classifier) -> Result<LogRow, String> {
        let player_id = self.player_id.trim().to_string();
        if player_id.is_empty() {
            return Err("blank player_id".into());
        }
        let team = self.team.as_deref().and_then(normalize_team);
        let status = non_blank(self.status.clone());

        if let Some(reason) = status.as_deref() {
            if classifier.matches_status(reason) && self.is_empty_stat_line(layout) {
                return Ok(LogRow::Absence(AbsenceNote {
                    player_id,
                    season: self.season,
                    week: self.week,
                    reason: reason.to_string(),
                    team,
                }));
            }
        }

        let [rush_yds, rush_td, rec_yds, rec_td] = self.resolved_yards(layout);
        let stats = GameStats {
            rush_att: count(self.rush_att, "rush_att")?,
            rush_yds: yards(rush_yds, "rush_yds")?,
            rush_td: count(rush_td, "rush_td")?,
            targets: count(self.targets, "targets")?,
            receptions: count(self.receptions, "receptions")?,
            rec_yds: yards(rec_yds, "rec_yds")?,
            rec_td: count(rec_td, "rec_td")?,
        };
        // Ages arrive as whole years or PFR's "years.days".
        let age = match self.age {
            Some(a) if a.is_finite() && a > 0.0 => Some(a.floor() as u32),
            Some(a) => return Err(format!("invalid age value {a}")),
            None => None,
        };
        Ok(LogRow::Game(GameLogEntry {
            player_id,
            player: self.player.trim().to_string(),
            season: self.season,
            week: self.week,
            team,
            opponent: self.opponent.as_deref().and_then(normalize_team),
            date: self.date,
            age,
            status,
            stats,
        }))
    }
}

// ---------------------------------------------------------------------------
// Reader-based loaders (private, enable testing without temp files)
// ---------------------------------------------------------------------------

fn load_game_logs_from_reader<R: Read>(rdr: R, classifier: &Classifier) -> Result<GameLog, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let layout = YardsLayout::from_headers(reader.headers()?);
    let mut log = GameLog::default();
    for result in reader.deserialize::<RawGameLogRow>() {
        match result {
            Ok(raw) => {
                let label = format!("{} {} week {}", raw.player_id.trim(), raw.season, raw.week);
                match raw.into_row(layout, classifier) {
                    Ok(LogRow::Game(entry)) => log.entries.push(entry),
                    Ok(LogRow::Absence(note)) => log.absences.push(note),
                    Err(reason) => warn!("skipping game log row for {label}: {reason}"),
                }
            }
            Err(e) => {
                warn!("skipping malformed game log row: {}", e);
            }
        }
    }
    Ok(log)
}

fn load_schedule_from_reader<R: Read>(rdr: R) -> Result<Vec<ScheduleEntry>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut entries = Vec::new();
    for result in reader.deserialize::<RawScheduleRow>() {
        match result {
            Ok(raw) => {
                let Some(team) = normalize_team(&raw.team) else {
                    warn!("skipping schedule row for {} week {}: blank team", raw.season, raw.week);
                    continue;
                };
                entries.push(ScheduleEntry {
                    team,
                    season: raw.season,
                    week: raw.week,
                    opponent: raw.opponent.as_deref().and_then(normalize_team),
                    date: raw.date,
                });
            }
            Err(e) => {
                warn!("skipping malformed schedule row: {}", e);
            }
        }
    }
    Ok(entries)
}

fn load_absences_from_reader<R: Read>(rdr: R) -> Result<Vec<AbsenceNote>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut notes = Vec::new();
    for result in reader.deserialize::<RawAbsenceRow>() {
        match result {
            Ok(raw) => {
                let Some(reason) = non_blank(raw.reason) else {
                    // A note without a reason says nothing the schedule join
                    // does not already know.
                    continue;
                };
                notes.push(AbsenceNote {
                    player_id: raw.player_id.trim().to_string(),
                    season: raw.season,
                    week: raw.week,
                    reason,
                    team: raw.team.as_deref().and_then(normalize_team),
                });
            }
            Err(e) => {
                warn!("skipping malformed absence row: {}", e);
            }
        }
    }
    Ok(notes)
}

// ---------------------------------------------------------------------------
// Public path-based loaders
// ---------------------------------------------------------------------------

fn open(path: &Path) -> Result<std::fs::File, IngestError> {
    std::fs::File::open(path).map_err(|e| IngestError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

fn csv_error(path: &Path) -> impl FnOnce(csv::Error) -> IngestError + '_ {
    move |e| IngestError::Csv {
        path: path.display().to_string(),
        source: e,
    }
}

/// Load a game log CSV. `classifier` decides which status-only rows are
/// absences rather than games.
pub fn load_game_logs(path: &Path, classifier: &Classifier) -> Result<GameLog, IngestError> {
    let log = load_game_logs_from_reader(open(path)?, classifier).map_err(csv_error(path))?;
    if log.entries.is_empty() && log.absences.is_empty() {
        return Err(IngestError::Validation(format!(
            "game log CSV {} produced zero valid rows",
            path.display()
        )));
    }
    Ok(log)
}

/// Load every team's schedule from a CSV file.
pub fn load_schedule(path: &Path) -> Result<Schedule, IngestError> {
    let entries = load_schedule_from_reader(open(path)?).map_err(csv_error(path))?;
    if entries.is_empty() {
        return Err(IngestError::Validation(format!(
            "schedule CSV {} produced zero valid rows",
            path.display()
        )));
    }
    Ok(Schedule::new(entries))
}

/// Load absence notes from a CSV file.
pub fn load_absences(path: &Path) -> Result<Vec<AbsenceNote>, IngestError> {
    load_absences_from_reader(open(path)?).map_err(csv_error(path))
}

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

/// Flat CSV row for a WeeklyRecord.
#[derive(Debug, Serialize)]
struct WeeklyRow<'a> {
    player_id: &'a str,
    player: &'a str,
    season: i32,
    week: u32,
    team: &'a str,
    opponent: Option<&'a str>,
    date: Option<NaiveDate>,
    age: Option<u32>,
    status: Option<&'a str>,
    reason: Option<&'a str>,
    rush_att: u32,
    rush_yds: i32,
    rush_td: u32,
    targets: u32,
    receptions: u32,
    rec_yds: i32,
    rec_td: u32,
    touches: u32,
    played: u8,
    injured: u8,
    touches_prev_1: u32,
    touches_prev_2: u32,
    touches_prev_3: u32,
    career_touches_prior: u32,
    career_weeks_prior: u32,
    career_games_prior: u32,
    recent_touches_avg: f64,
    recent_yards_avg: f64,
    touches_trend: f64,
    injured_weeks_prior: u32,
    injury_rate_prior: f64,
    prior_multiweek_prev: u32,
    season_touches_prior: u32,
    season_games_prior: u32,
    season_experience: u32,
    late_season: u8,
    has_prior_injury_season: u8,
    injury_seasons_count: u32,
    total_injury_games: u32,
    injury_rate_prior_seasons: f64,
    consecutive_injury_seasons: u32,
    last_injury_season: Option<i32>,
    seasons_since_last_injury: Option<i32>,
    injury_severity_prior: f64,
    injury_recurrence: u8,
    injury_recurrence_alt: u8,
}

impl<'a> From<&'a WeeklyRecord> for WeeklyRow<'a> {
    fn from(r: &'a WeeklyRecord) -> Self {
        let w = &r.workload;
        let h = &r.history;
        WeeklyRow {
            player_id: &r.player_id,
            player: &r.player,
            season: r.season,
            week: r.week,
            team: &r.team,
            opponent: r.opponent.as_deref(),
            date: r.date,
            age: r.age,
            status: r.status.as_deref(),
            reason: r.reason.as_deref(),
            rush_att: r.stats.rush_att,
            rush_yds: r.stats.rush_yds,
            rush_td: r.stats.rush_td,
            targets: r.stats.targets,
            receptions: r.stats.receptions,
            rec_yds: r.stats.rec_yds,
            rec_td: r.stats.rec_td,
            touches: r.touches(),
            played: u8::from(r.played),
            injured: u8::from(r.injured),
            touches_prev_1: w.touches_prev_1,
            touches_prev_2: w.touches_prev_2,
            touches_prev_3: w.touches_prev_3,
            career_touches_prior: w.career_touches_prior,
            career_weeks_prior: w.career_weeks_prior,
            career_games_prior: w.career_games_prior,
            recent_touches_avg: w.recent_touches_avg,
            recent_yards_avg: w.recent_yards_avg,
            touches_trend: w.touches_trend,
            injured_weeks_prior: w.injured_weeks_prior,
            injury_rate_prior: w.injury_rate_prior,
            prior_multiweek_prev: w.prior_multiweek_prev,
            season_touches_prior: w.season_touches_prior,
            season_games_prior: w.season_games_prior,
            season_experience: w.season_experience,
            late_season: u8::from(w.late_season),
            has_prior_injury_season: u8::from(h.has_prior_injury_season),
            injury_seasons_count: h.injury_seasons_count,
            total_injury_games: h.total_injury_games,
            injury_rate_prior_seasons: h.injury_rate_prior_seasons,
            consecutive_injury_seasons: h.consecutive_injury_seasons,
            last_injury_season: h.last_injury_season,
            seasons_since_last_injury: h.seasons_since_last_injury,
            injury_severity_prior: h.injury_severity_prior,
            injury_recurrence: u8::from(r.injury_recurrence),
            injury_recurrence_alt: u8::from(r.injury_recurrence_alt),
        }
    }
}

/// Write the weekly feature table as CSV.
pub fn write_weekly<W: Write>(wtr: W, records: &[WeeklyRecord]) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(wtr);
    for record in records {
        writer.serialize(WeeklyRow::from(record))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the season table as CSV.
pub fn write_seasons<W: Write>(wtr: W, records: &[SeasonRecord]) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(wtr);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

fn create(path: &Path) -> Result<std::fs::File, IngestError> {
    let io_err = |e| IngestError::Io {
        path: path.display().to_string(),
        source: e,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::File::create(path).map_err(io_err)
}

pub fn save_weekly(path: &Path, records: &[WeeklyRecord]) -> Result<(), IngestError> {
    write_weekly(create(path)?, records).map_err(csv_error(path))
}

pub fn save_seasons(path: &Path, records: &[SeasonRecord]) -> Result<(), IngestError> {
    write_seasons(create(path)?, records).map_err(csv_error(path))
}

/// Write the per-player-season manifest as pretty JSON.
pub fn save_manifest(path: &Path, manifest: &[SeasonOutcome]) -> Result<(), IngestError> {
    serde_json::to_writer_pretty(create(path)?, manifest).map_err(|e| IngestError::Json {
        path: path.display().to_string(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
