// Pipeline driver: raw game logs + schedules in, weekly feature table,
// season table and a per-player-season manifest out.
//
// Stages per player: reconcile each season against the schedule, label
// injuries, order the career timeline, attach workload then injury-history
// features, and roll each season up. Players are independent of each other;
// a failing player-season is reported and skipped without touching the rest.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::classify::Classifier;
use crate::config::{Config, FeatureConfig};
use crate::error::PipelineError;
use crate::features::PlayerTimeline;
use crate::reconcile::reconcile;
use crate::record::{AbsenceNote, GameLogEntry, Schedule, SeasonRecord, WeeklyRecord};
use crate::season::aggregate_season;

// ---------------------------------------------------------------------------
// Inputs and outputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct PipelineInput {
    pub game_logs: Vec<GameLogEntry>,
    pub schedule: Schedule,
    pub absences: Vec<AbsenceNote>,
}

/// What happened to one player-season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Weekly rows and the season row were produced.
    Processed { weeks: usize },
    /// Weekly rows were produced but the season rollup failed.
    Partial { weeks: usize, error: String },
    /// Nothing was produced for this player-season.
    Skipped { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeasonOutcome {
    pub player_id: String,
    pub season: i32,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl SeasonOutcome {
    fn skipped(player_id: &str, season: i32, error: &PipelineError) -> Self {
        SeasonOutcome {
            player_id: player_id.to_string(),
            season,
            status: OutcomeStatus::Skipped {
                error: error.to_string(),
            },
        }
    }

    pub fn is_processed(&self) -> bool {
        matches!(self.status, OutcomeStatus::Processed { .. })
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    /// Ordered by `(player_id, season, week)`.
    pub weekly: Vec<WeeklyRecord>,
    /// Ordered by `(player_id, season)`.
    pub seasons: Vec<SeasonRecord>,
    /// Ordered by `(player_id, season)`.
    pub manifest: Vec<SeasonOutcome>,
}

impl PipelineOutput {
    pub fn processed_count(&self) -> usize {
        self.manifest.iter().filter(|o| o.is_processed()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.manifest.len() - self.processed_count()
    }
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct SeasonInput<'a> {
    entries: Vec<&'a GameLogEntry>,
    absences: Vec<&'a AbsenceNote>,
}

type PlayerSeasons<'a> = BTreeMap<i32, SeasonInput<'a>>;

fn group_by_player(input: &PipelineInput) -> BTreeMap<&str, PlayerSeasons<'_>> {
    let mut players: BTreeMap<&str, PlayerSeasons<'_>> = BTreeMap::new();
    for entry in &input.game_logs {
        players
            .entry(entry.player_id.as_str())
            .or_default()
            .entry(entry.season)
            .or_default()
            .entries
            .push(entry);
    }
    for note in &input.absences {
        players
            .entry(note.player_id.as_str())
            .or_default()
            .entry(note.season)
            .or_default()
            .absences
            .push(note);
    }
    players
}

#[derive(Debug, Default)]
struct PlayerOutput {
    weekly: Vec<WeeklyRecord>,
    seasons: Vec<SeasonRecord>,
    manifest: Vec<SeasonOutcome>,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Pipeline {
    features: FeatureConfig,
    classifier: Classifier,
    parallel: bool,
}

impl Default for Pipeline {
    fn default() -> Self {
        Pipeline::new(FeatureConfig::default(), Classifier::default(), true)
    }
}

impl Pipeline {
    pub fn new(features: FeatureConfig, classifier: Classifier, parallel: bool) -> Self {
        Pipeline {
            features,
            classifier,
            parallel,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Pipeline::new(
            config.features.clone(),
            Classifier::from_config(&config.classifier),
            config.runtime.parallel,
        )
    }

    /// Run every player through the pipeline.
    ///
    /// Output order depends only on the input data, never on thread
    /// scheduling, so repeated runs produce identical tables.
    pub fn run(&self, input: &PipelineInput) -> PipelineOutput {
        let players: Vec<(&str, PlayerSeasons<'_>)> = group_by_player(input).into_iter().collect();
        info!(
            "running pipeline: {} players, {} log rows, {} schedule slots",
            players.len(),
            input.game_logs.len(),
            input.schedule.len()
        );

        let results: Vec<PlayerOutput> = if self.parallel {
            players
                .par_iter()
                .map(|(player_id, seasons)| self.process_player(player_id, seasons, &input.schedule))
                .collect()
        } else {
            players
                .iter()
                .map(|(player_id, seasons)| self.process_player(player_id, seasons, &input.schedule))
                .collect()
        };

        let mut output = PipelineOutput::default();
        for result in results {
            output.weekly.extend(result.weekly);
            output.seasons.extend(result.seasons);
            output.manifest.extend(result.manifest);
        }

        info!(
            "pipeline finished: {} weekly rows, {} season rows, {} player-seasons processed, {} failed",
            output.weekly.len(),
            output.seasons.len(),
            output.processed_count(),
            output.failed_count()
        );
        output
    }

    fn process_player(
        &self,
        player_id: &str,
        seasons: &PlayerSeasons<'_>,
        schedule: &Schedule,
    ) -> PlayerOutput {
        let mut out = PlayerOutput::default();
        let mut records = Vec::new();

        for (&season, input) in seasons {
            match reconcile(player_id, season, &input.entries, &input.absences, schedule) {
                Ok(mut weeks) => {
                    self.classifier.label(&mut weeks);
                    records.extend(weeks);
                }
                Err(e) => {
                    warn!("skipping {player_id} {season}: {e}");
                    out.manifest.push(SeasonOutcome::skipped(player_id, season, &e));
                }
            }
        }

        if records.is_empty() {
            return out;
        }

        let timeline = match PlayerTimeline::new(player_id, records) {
            Ok(timeline) => timeline,
            Err(e) => {
                warn!("skipping all seasons for {player_id}: {e}");
                for &season in seasons.keys() {
                    if !out.manifest.iter().any(|o| o.season == season) {
                        out.manifest.push(SeasonOutcome::skipped(player_id, season, &e));
                    }
                }
                out.manifest.sort_by_key(|o| o.season);
                return out;
            }
        };

        let weekly = timeline
            .with_workload_features(&self.features)
            .with_injury_history()
            .into_records();

        for season_weeks in weekly.chunk_by(|a, b| a.season == b.season) {
            let season = season_weeks[0].season;
            let weeks = season_weeks.len();
            let status = match aggregate_season(season_weeks) {
                Ok(record) => {
                    out.seasons.push(record);
                    OutcomeStatus::Processed { weeks }
                }
                Err(e) => {
                    warn!("no season row for {player_id} {season}: {e}");
                    OutcomeStatus::Partial {
                        weeks,
                        error: e.to_string(),
                    }
                }
            };
            out.manifest.push(SeasonOutcome {
                player_id: player_id.to_string(),
                season,
                status,
            });
        }

        out.manifest.sort_by_key(|o| o.season);
        debug!(
            "{player_id}: {} weekly rows over {} seasons",
            weekly.len(),
            out.seasons.len()
        );
        out.weekly = weekly;
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
