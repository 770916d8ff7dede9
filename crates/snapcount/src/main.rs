// Main entry point for the snapcount feature pipeline.
//
// Startup sequence:
// 1. Initialize tracing (stderr, so stdout stays clean for shell pipelines)
// 2. Load config (seeding config/pipeline.toml from defaults/ on first run)
// 3. Load game logs, schedules and absence notes
// 4. Run the pipeline
// 5. Write the weekly table, season table and manifest

use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use tracing::{info, warn};

use snapcount::classify::Classifier;
use snapcount::config;
use snapcount::ingest;
use snapcount::pipeline::{Pipeline, PipelineInput};

fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("snapcount starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "config loaded: recent_window={}, late_season_week={}, parallel={}",
        config.features.recent_window, config.features.late_season_week, config.runtime.parallel
    );
    let paths = &config.data_paths;

    // 3. Load inputs
    let started = Instant::now();
    let classifier = Classifier::from_config(&config.classifier);
    let game_log = ingest::load_game_logs(Path::new(&paths.game_logs), &classifier)
        .context("failed to load game logs")?;
    let schedule = ingest::load_schedule(Path::new(&paths.schedules))
        .context("failed to load schedules")?;
    let mut absences = match &paths.absences {
        Some(path) if Path::new(path).exists() => {
            ingest::load_absences(Path::new(path)).context("failed to load absence notes")?
        }
        Some(path) => {
            warn!("absence notes file {} not found; continuing without it", path);
            Vec::new()
        }
        None => Vec::new(),
    };
    // Status-only log rows (e.g. "Inactive" with no stats) are absences too.
    absences.extend(game_log.absences);
    let game_logs = game_log.entries;
    info!(
        "loaded {} game log rows, {} schedule slots, {} absence notes",
        game_logs.len(),
        schedule.len(),
        absences.len()
    );

    // 4. Run the pipeline
    let input = PipelineInput {
        game_logs,
        schedule,
        absences,
    };
    let output = Pipeline::from_config(&config).run(&input);

    // 5. Write outputs
    ingest::save_weekly(Path::new(&paths.weekly_out), &output.weekly)
        .context("failed to write weekly features")?;
    ingest::save_seasons(Path::new(&paths.seasons_out), &output.seasons)
        .context("failed to write season features")?;
    ingest::save_manifest(Path::new(&paths.manifest_out), &output.manifest)
        .context("failed to write manifest")?;

    if output.failed_count() > 0 {
        warn!(
            "{} player-seasons were not fully processed; see {}",
            output.failed_count(),
            paths.manifest_out
        );
    }
    info!(
        "wrote {} weekly rows and {} season rows in {:.2?}",
        output.weekly.len(),
        output.seasons.len(),
        started.elapsed()
    );

    Ok(())
}

/// Initialize tracing to stderr.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("snapcount=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
