// Property tests: features for a week never depend on that week's outcome or
// on anything later in the player's career.

use proptest::prelude::*;

use snapcount::pipeline::{Pipeline, PipelineInput};
use snapcount::record::{GameLogEntry, GameStats, Schedule, ScheduleEntry};

const SEASONS: [i32; 2] = [2022, 2023];
const WEEKS: u32 = 17;
const SLOTS: usize = SEASONS.len() * WEEKS as usize;

fn schedule() -> Schedule {
    let mut entries = Vec::new();
    for season in SEASONS {
        for week in 1..=WEEKS {
            entries.push(ScheduleEntry {
                team: "BAL".into(),
                season,
                week,
                opponent: None,
                date: None,
            });
        }
    }
    Schedule::new(entries)
}

/// One log row per slot whose stat line is `Some`; `None` slots are missed.
fn game_logs(lines: &[Option<(u32, u32)>]) -> Vec<GameLogEntry> {
    lines
        .iter()
        .enumerate()
        .filter_map(|(i, line)| {
            let (rush_att, receptions) = (*line)?;
            Some(GameLogEntry {
                player_id: "DobbJK00".into(),
                player: "J.K. Dobbins".into(),
                season: SEASONS[i / WEEKS as usize],
                week: (i % WEEKS as usize) as u32 + 1,
                team: Some("BAL".into()),
                opponent: None,
                date: None,
                age: Some(24),
                status: None,
                stats: GameStats {
                    rush_att,
                    rush_yds: rush_att as i32 * 5,
                    receptions,
                    rec_yds: receptions as i32 * 7,
                    ..GameStats::default()
                },
            })
        })
        .collect()
}

/// Each season needs at least one game row to place the player on a team.
fn anchor(lines: &mut [Option<(u32, u32)>]) {
    for first in [0, WEEKS as usize] {
        if lines[first].is_none() {
            lines[first] = Some((10, 1));
        }
    }
}

fn stat_line() -> impl Strategy<Value = Option<(u32, u32)>> {
    prop::option::weighted(0.85, (0u32..30, 0u32..8))
}

proptest! {
    #[test]
    fn rewriting_the_future_leaves_past_features_alone(
        original in prop::collection::vec(stat_line(), SLOTS),
        replacement in prop::collection::vec(stat_line(), SLOTS),
        cut in 0..SLOTS,
    ) {
        let mut original = original;
        anchor(&mut original);

        let mut rewritten = original.clone();
        rewritten[cut..].clone_from_slice(&replacement[cut..]);
        anchor(&mut rewritten);

        let pipeline = Pipeline::default();
        let before = pipeline.run(&PipelineInput {
            game_logs: game_logs(&original),
            schedule: schedule(),
            absences: Vec::new(),
        });
        let after = pipeline.run(&PipelineInput {
            game_logs: game_logs(&rewritten),
            schedule: schedule(),
            absences: Vec::new(),
        });

        prop_assert_eq!(before.weekly.len(), SLOTS);
        prop_assert_eq!(after.weekly.len(), SLOTS);
        for (a, b) in before.weekly.iter().zip(&after.weekly).take(cut + 1) {
            prop_assert_eq!(a.workload, b.workload, "week {} {}", a.season, a.week);
            prop_assert_eq!(a.history, b.history, "week {} {}", a.season, a.week);
        }
    }

    #[test]
    fn season_history_is_constant_within_a_season(
        lines in prop::collection::vec(stat_line(), SLOTS),
    ) {
        let mut lines = lines;
        anchor(&mut lines);

        let output = Pipeline::default().run(&PipelineInput {
            game_logs: game_logs(&lines),
            schedule: schedule(),
            absences: Vec::new(),
        });
        for season in output.weekly.chunk_by(|a, b| a.season == b.season) {
            prop_assert!(season.iter().all(|r| r.history == season[0].history));
        }
    }
}
