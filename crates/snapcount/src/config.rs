// Configuration loading and parsing (config/pipeline.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::classify::DEFAULT_STATUS_MARKERS;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid TOML in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid value for `{field}`: {message}")]
    Invalid { field: String, message: String },

    #[error("neither config/pipeline.toml nor defaults/pipeline.toml exists under {0}")]
    Missing(PathBuf),

    #[error("cannot seed {path} from defaults: {source}")]
    Seed {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Live settings, relative to the working directory.
pub const CONFIG_FILE: &str = "config/pipeline.toml";
/// Shipped defaults; copied to `CONFIG_FILE` on first run.
pub const DEFAULTS_FILE: &str = "defaults/pipeline.toml";

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub features: FeatureConfig,
    pub classifier: ClassifierConfig,
    pub runtime: RuntimeConfig,
    pub data_paths: DataPaths,
}

// ---------------------------------------------------------------------------
// pipeline.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire pipeline.toml file.
#[derive(Debug, Clone, Deserialize)]
struct PipelineFile {
    #[serde(default)]
    features: FeatureConfig,
    #[serde(default)]
    classifier: ClassifierConfig,
    #[serde(default)]
    runtime: RuntimeConfig,
    data_paths: DataPaths,
}

/// Window sizes for the workload features.
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureConfig {
    /// Trailing weeks used by the recent-average, trend and multiweek
    /// features.
    pub recent_window: usize,
    /// Weeks after this one are flagged `late_season`.
    pub late_season_week: u32,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        FeatureConfig {
            recent_window: 3,
            late_season_week: 12,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_status_markers")]
    pub status_markers: Vec<String>,
    #[serde(default = "default_true")]
    pub zero_touch_heuristic: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        ClassifierConfig {
            status_markers: default_status_markers(),
            zero_touch_heuristic: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    /// Process players on the rayon thread pool.
    #[serde(default = "default_true")]
    pub parallel: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig { parallel: true }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    pub game_logs: String,
    pub schedules: String,
    /// Optional CSV of absence reasons for missed weeks.
    #[serde(default)]
    pub absences: Option<String>,
    pub weekly_out: String,
    pub seasons_out: String,
    pub manifest_out: String,
}

fn default_status_markers() -> Vec<String> {
    DEFAULT_STATUS_MARKERS.iter().map(|m| m.to_string()).collect()
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Parse and validate `config/pipeline.toml` under `base_dir`. Does not
/// seed from defaults; `load_config()` does.
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join(CONFIG_FILE);
    let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::Read {
        path: path.clone(),
        source: e,
    })?;
    let file: PipelineFile = toml::from_str(&text).map_err(|e| ConfigError::Parse { path, source: e })?;

    let config = Config {
        features: file.features,
        classifier: file.classifier,
        runtime: file.runtime,
        data_paths: file.data_paths,
    };
    validate(&config)?;
    Ok(config)
}

/// Seed `config/pipeline.toml` from `defaults/pipeline.toml` when it does not
/// exist yet. Returns the new file's path if a copy was made; an existing
/// config is never touched.
pub fn seed_pipeline_toml(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let target = base_dir.join(CONFIG_FILE);
    if target.exists() {
        return Ok(None);
    }
    let defaults = base_dir.join(DEFAULTS_FILE);
    if !defaults.exists() {
        return Err(ConfigError::Missing(base_dir.to_path_buf()));
    }

    let seed_err = |e| ConfigError::Seed {
        path: target.clone(),
        source: e,
    };
    if let Some(dir) = target.parent() {
        std::fs::create_dir_all(dir).map_err(seed_err)?;
    }
    std::fs::copy(&defaults, &target).map_err(seed_err)?;
    info!("created {} from {}", target.display(), defaults.display());
    Ok(Some(target))
}

/// Load config relative to the current working directory, seeding it from
/// defaults on first run.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|e| ConfigError::Read {
        path: PathBuf::from("."),
        source: e,
    })?;
    seed_pipeline_toml(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.features.recent_window == 0 {
        return Err(ConfigError::Invalid {
            field: "features.recent_window".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.features.late_season_week == 0 {
        return Err(ConfigError::Invalid {
            field: "features.late_season_week".into(),
            message: "must be greater than 0".into(),
        });
    }

    if let Some(idx) = config
        .classifier
        .status_markers
        .iter()
        .position(|m| m.trim().is_empty())
    {
        return Err(ConfigError::Invalid {
            field: format!("classifier.status_markers[{idx}]"),
            message: "must not be blank".into(),
        });
    }

    let paths = &config.data_paths;
    let path_fields: &[(&str, &str)] = &[
        ("data_paths.game_logs", paths.game_logs.as_str()),
        ("data_paths.schedules", paths.schedules.as_str()),
        ("data_paths.weekly_out", paths.weekly_out.as_str()),
        ("data_paths.seasons_out", paths.seasons_out.as_str()),
        ("data_paths.manifest_out", paths.manifest_out.as_str()),
    ];
    for (name, val) in path_fields {
        if val.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: name.to_string(),
                message: "must not be empty".into(),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Shipped defaults, read through the crate manifest dir so the result
    /// does not depend on where `cargo test` was started.
    fn default_pipeline_toml() -> String {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULTS_FILE);
        fs::read_to_string(path).unwrap()
    }

    /// Fresh temp dir with `config/` created.
    fn temp_base(name: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        tmp
    }

    #[test]
    fn load_valid_config_from_project_files() {
        let tmp = temp_base("snapcount_config_defaults");
        fs::write(tmp.join("config/pipeline.toml"), default_pipeline_toml()).unwrap();

        let config = load_config_from(&tmp).expect("should load valid config");
        assert_eq!(config.features.recent_window, 3);
        assert_eq!(config.features.late_season_week, 12);
        assert!(config.classifier.zero_touch_heuristic);
        assert!(config.classifier.status_markers.iter().any(|m| m == "Inactive"));
        assert!(config.runtime.parallel);
        assert_eq!(config.data_paths.game_logs, "data/game_logs.csv");
        assert_eq!(config.data_paths.absences.as_deref(), Some("data/absences.csv"));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn optional_sections_fall_back_to_defaults() {
        let tmp = temp_base("snapcount_config_minimal");
        let minimal = r#"
[data_paths]
game_logs = "logs.csv"
schedules = "schedules.csv"
weekly_out = "out/weekly.csv"
seasons_out = "out/seasons.csv"
manifest_out = "out/manifest.json"
"#;
        fs::write(tmp.join("config/pipeline.toml"), minimal).unwrap();

        let config = load_config_from(&tmp).expect("should load minimal config");
        assert_eq!(config.features.recent_window, 3);
        assert_eq!(config.classifier.status_markers.len(), DEFAULT_STATUS_MARKERS.len());
        assert!(config.data_paths.absences.is_none());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_window() {
        let tmp = temp_base("snapcount_config_zero_window");
        let modified = default_pipeline_toml().replace("recent_window = 3", "recent_window = 0");
        fs::write(tmp.join("config/pipeline.toml"), modified).unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::Invalid { field, .. } => {
                assert_eq!(field, "features.recent_window");
            }
            other => panic!("expected Invalid, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_blank_marker() {
        let tmp = temp_base("snapcount_config_blank_marker");
        let modified = default_pipeline_toml().replace("\"Suspended\"", "\"  \"");
        fs::write(tmp.join("config/pipeline.toml"), modified).unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::Invalid { field, .. } => {
                assert!(field.starts_with("classifier.status_markers"));
            }
            other => panic!("expected Invalid, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn read_error_for_missing_pipeline_toml() {
        let tmp = temp_base("snapcount_config_missing");

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::Read { path, .. } => {
                assert!(path.ends_with("pipeline.toml"));
            }
            other => panic!("expected Read, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let tmp = temp_base("snapcount_config_invalid");
        fs::write(tmp.join("config/pipeline.toml"), "this is not valid [[[ toml").unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let _ = fs::remove_dir_all(&tmp);
    }

    // -- Seeding from defaults --

    #[test]
    fn seeds_missing_config_from_defaults() {
        let tmp = std::env::temp_dir().join("snapcount_config_seed");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::write(tmp.join(DEFAULTS_FILE), default_pipeline_toml()).unwrap();

        let seeded = seed_pipeline_toml(&tmp).expect("should seed");
        assert_eq!(seeded, Some(tmp.join(CONFIG_FILE)));
        let config = load_config_from(&tmp).expect("seeded config should load");
        assert_eq!(config.features.recent_window, 3);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn seeding_leaves_existing_config_alone() {
        let tmp = temp_base("snapcount_config_seed_existing");
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::write(tmp.join(DEFAULTS_FILE), default_pipeline_toml()).unwrap();
        fs::write(tmp.join(CONFIG_FILE), "# custom\n").unwrap();

        assert_eq!(seed_pipeline_toml(&tmp).expect("should succeed"), None);
        assert_eq!(fs::read_to_string(tmp.join(CONFIG_FILE)).unwrap(), "# custom\n");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn seeding_without_defaults_fails() {
        let tmp = std::env::temp_dir().join("snapcount_config_seed_no_defaults");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        let err = seed_pipeline_toml(&tmp).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
        assert!(!tmp.join(CONFIG_FILE).exists());

        let _ = fs::remove_dir_all(&tmp);
    }
}
