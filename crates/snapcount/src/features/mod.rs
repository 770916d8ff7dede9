// Feature builders over a player's ordered weekly history.

pub mod history;
pub mod workload;

use crate::config::FeatureConfig;
use crate::error::PipelineError;
use crate::record::WeeklyRecord;

/// One player's weekly records, sorted by `(season, week)` with no duplicate
/// weeks. This ordering is the only meaning of "previous" and "prior" for
/// the feature builders.
#[derive(Debug, Clone)]
pub struct PlayerTimeline {
    player_id: String,
    records: Vec<WeeklyRecord>,
}

impl PlayerTimeline {
    pub fn new(player_id: &str, mut records: Vec<WeeklyRecord>) -> Result<Self, PipelineError> {
        if let Some(other) = records.iter().find(|r| r.player_id != player_id) {
            return Err(PipelineError::malformed(
                player_id,
                other.season,
                format!("record for {} in {player_id}'s timeline", other.player_id),
            ));
        }
        records.sort_by_key(|r| (r.season, r.week));
        if let Some(pair) = records
            .windows(2)
            .find(|pair| (pair[0].season, pair[0].week) == (pair[1].season, pair[1].week))
        {
            return Err(PipelineError::malformed(
                player_id,
                pair[0].season,
                format!("week {} appears twice", pair[0].week),
            ));
        }
        Ok(PlayerTimeline {
            player_id: player_id.to_string(),
            records,
        })
    }

    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    pub fn records(&self) -> &[WeeklyRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<WeeklyRecord> {
        self.records
    }

    /// Attach the backward-looking workload features.
    pub fn with_workload_features(mut self, config: &FeatureConfig) -> Self {
        let features = workload::workload_features(&self.records, config);
        for (record, workload) in self.records.iter_mut().zip(features) {
            record.workload = workload;
        }
        self
    }

    /// Attach cross-season injury history and recurrence targets.
    pub fn with_injury_history(mut self) -> Self {
        history::apply_injury_history(&mut self.records);
        self
    }
}
