// Week-level injury labelling.
//
// A week is injured when its status or absence reason carries one of the
// non-participation markers, or when the player recorded neither a rush
// attempt nor a reception. The zero-touch rule is a proxy: a healthy scratch
// or a game-plan decision looks the same in the box score.

use crate::config::ClassifierConfig;
use crate::record::WeeklyRecord;

/// Status markers recognised by default (matched case-insensitively as
/// substrings).
pub const DEFAULT_STATUS_MARKERS: &[&str] = &[
    "Did Not Play",
    "Inactive",
    "Injured Reserve",
    "PUP",
    "Physically Unable to Perform",
    "Suspended",
];

#[derive(Debug, Clone)]
pub struct Classifier {
    markers: Vec<String>,
    zero_touch_heuristic: bool,
}

impl Default for Classifier {
    fn default() -> Self {
        Classifier::new(DEFAULT_STATUS_MARKERS.iter().copied(), true)
    }
}

impl Classifier {
    pub fn new<'a, I>(markers: I, zero_touch_heuristic: bool) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Classifier {
            markers: markers
                .into_iter()
                .map(|m| m.trim().to_lowercase())
                .filter(|m| !m.is_empty())
                .collect(),
            zero_touch_heuristic,
        }
    }

    pub fn from_config(config: &ClassifierConfig) -> Self {
        Classifier::new(
            config.status_markers.iter().map(String::as_str),
            config.zero_touch_heuristic,
        )
    }

    /// True if the text contains any status marker.
    pub fn matches_status(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.markers.iter().any(|m| text.contains(m.as_str()))
    }

    /// Decide whether a single week counts as an injury week.
    pub fn is_injured(&self, record: &WeeklyRecord) -> bool {
        let flagged = [record.status.as_deref(), record.reason.as_deref()]
            .into_iter()
            .flatten()
            .any(|text| self.matches_status(text));
        if flagged {
            return true;
        }
        // Every reconciled week is a rostered week.
        self.zero_touch_heuristic && record.stats.rush_att == 0 && record.stats.receptions == 0
    }

    /// Label every record in place.
    pub fn label(&self, records: &mut [WeeklyRecord]) {
        for record in records.iter_mut() {
            record.injured = self.is_injured(record);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
