// Schedule reconciliation: one player-season's sparse game log joined against
// the team's full week list, producing exactly one WeeklyRecord per scheduled
// week.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::record::{AbsenceNote, GameLogEntry, InjuryHistory, Schedule, WeeklyRecord, WorkloadFeatures};

// ---------------------------------------------------------------------------
// Team of record
// ---------------------------------------------------------------------------

/// Normalize a team code: trimmed, upper case, `None` when blank.
pub fn normalize_team(team: &str) -> Option<String> {
    let code = team.trim().to_uppercase();
    if code.is_empty() {
        None
    } else {
        Some(code)
    }
}

/// Most frequent non-blank team code in the log. Ties go to the
/// alphabetically smallest code so the result never depends on row order.
pub fn team_of_record<'a, I>(teams: I) -> Option<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for code in teams.into_iter().flatten().filter_map(normalize_team) {
        *counts.entry(code).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
        .map(|(code, _)| code)
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// Join a player-season's game log with the team schedule.
///
/// The team comes from the log; when the player has no game rows at all the
/// absence notes are consulted instead. Log rows for weeks the team did not
/// play (e.g. games logged for a previous team after a trade) are dropped.
/// Unmatched schedule weeks are zero-filled and marked not played.
pub fn reconcile(
    player_id: &str,
    season: i32,
    entries: &[&GameLogEntry],
    absences: &[&AbsenceNote],
    schedule: &Schedule,
) -> Result<Vec<WeeklyRecord>, PipelineError> {
    if let Some(stray) = entries
        .iter()
        .find(|e| e.player_id != player_id || e.season != season)
    {
        return Err(PipelineError::malformed(
            player_id,
            season,
            format!(
                "log row for {} {} week {} grouped under the wrong player-season",
                stray.player_id, stray.season, stray.week
            ),
        ));
    }

    let team = team_of_record(entries.iter().map(|e| e.team.as_deref()))
        .or_else(|| team_of_record(absences.iter().map(|a| a.team.as_deref())))
        .ok_or_else(|| PipelineError::MissingTeam {
            player_id: player_id.to_string(),
            season,
        })?;

    let weeks = schedule
        .weeks(&team, season)
        .ok_or_else(|| PipelineError::ScheduleNotFound {
            team: team.clone(),
            season,
        })?;

    if let Some(pair) = weeks.windows(2).find(|pair| pair[0].week == pair[1].week) {
        return Err(PipelineError::malformed(
            player_id,
            season,
            format!("schedule for {team} lists week {} twice", pair[0].week),
        ));
    }

    let mut by_week: HashMap<u32, &GameLogEntry> = HashMap::new();
    for entry in entries {
        if by_week.insert(entry.week, entry).is_some() {
            return Err(PipelineError::malformed(
                player_id,
                season,
                format!("game log lists week {} twice", entry.week),
            ));
        }
    }

    let scheduled = |week: u32| weeks.iter().any(|slot| slot.week == week);
    for week in by_week.keys().filter(|w| !scheduled(**w)) {
        warn!(
            "dropping {player_id} {season} week {week}: not on the {team} schedule"
        );
    }

    let mut reasons: HashMap<u32, &str> = HashMap::new();
    for note in absences {
        if by_week.contains_key(&note.week) {
            warn!(
                "ignoring absence note for {player_id} {season} week {}: player has a game row",
                note.week
            );
            continue;
        }
        if reasons.insert(note.week, note.reason.as_str()).is_some() {
            warn!(
                "duplicate absence note for {player_id} {season} week {}, using latest",
                note.week
            );
        }
    }

    let player = entries
        .iter()
        .map(|e| e.player.trim())
        .find(|name| !name.is_empty())
        .unwrap_or(player_id)
        .to_string();

    let records: Vec<WeeklyRecord> = weeks
        .iter()
        .map(|slot| {
            let entry = by_week.get(&slot.week);
            WeeklyRecord {
                player_id: player_id.to_string(),
                player: player.clone(),
                season,
                week: slot.week,
                team: team.clone(),
                opponent: entry
                    .and_then(|e| e.opponent.clone())
                    .or_else(|| slot.opponent.clone()),
                date: entry.and_then(|e| e.date).or(slot.date),
                age: entry.and_then(|e| e.age),
                status: entry.and_then(|e| e.status.clone()),
                reason: reasons.get(&slot.week).map(|r| r.to_string()),
                stats: entry.map(|e| e.stats).unwrap_or_default(),
                played: entry.is_some(),
                injured: false,
                workload: WorkloadFeatures::default(),
                history: InjuryHistory::default(),
                injury_recurrence: false,
                injury_recurrence_alt: false,
            }
        })
        .collect();

    debug!(
        "reconciled {player_id} {season} ({team}): {} scheduled, {} played",
        records.len(),
        records.iter().filter(|r| r.played).count()
    );

    Ok(records)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
