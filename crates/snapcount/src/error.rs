// Errors scoped to a single player-season.
//
// None of these abort a pipeline run: the driver records them in the manifest
// and moves on to the next player-season.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("no team of record for player {player_id} in {season}")]
    MissingTeam { player_id: String, season: i32 },

    #[error("no schedule for {team} in {season}")]
    ScheduleNotFound { team: String, season: i32 },

    #[error("malformed records for player {player_id} in {season}: {reason}")]
    MalformedRecord {
        player_id: String,
        season: i32,
        reason: String,
    },
}

impl PipelineError {
    pub(crate) fn malformed(player_id: &str, season: i32, reason: impl Into<String>) -> Self {
        PipelineError::MalformedRecord {
            player_id: player_id.to_string(),
            season,
            reason: reason.into(),
        }
    }
}
