use serde::Deserialize;
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Input documents
// ---------------------------------------------------------------------------

/// An id field the producer encodes inconsistently: sometimes a JSON number,
/// sometimes a numeric string ("1" and 1 are the same identity upstream).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FlexId {
    Num(i64),
    Text(String),
}

impl FlexId {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FlexId::Num(n) => Some(*n),
            FlexId::Text(s) => s.trim().parse::<i64>().ok(),
        }
    }
}

impl std::fmt::Display for FlexId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlexId::Num(n) => write!(f, "{n}"),
            FlexId::Text(s) => write!(f, "{s}"),
        }
    }
}

/// One producer output file: a single sport with its full championship tree.
#[derive(Debug, Deserialize)]
pub struct DocumentRoot {
    pub sport: Option<SportDoc>,
}

#[derive(Debug, Deserialize)]
pub struct SportDoc {
    #[serde(rename = "sportId")]
    pub sport_id: FlexId,
    #[serde(rename = "sportName", default)]
    pub sport_name: String,
    #[serde(default)]
    pub championships: Vec<ChampionshipDoc>,
}

#[derive(Debug, Deserialize)]
pub struct ChampionshipDoc {
    #[serde(rename = "championshipId")]
    pub championship_id: FlexId,
    #[serde(rename = "championshipName", default)]
    pub championship_name: String,
    #[serde(default)]
    pub matches: Vec<MatchDoc>,
}

#[derive(Debug, Deserialize)]
pub struct MatchDoc {
    /// The producer's own event reference, kept as opaque text.
    #[serde(rename = "eventId")]
    pub event_id: Option<FlexId>,
    #[serde(default)]
    pub team1: String,
    #[serde(default)]
    pub team2: String,
    #[serde(default)]
    pub time: String,
    /// Keys are market labels, some localized; resolved in normalize.rs.
    #[serde(default)]
    pub odds: Map<String, Value>,
    #[serde(default)]
    pub events: Vec<EventDoc>,
}

/// In-play market node. Nests arbitrarily deep via `subEvents`.
#[derive(Debug, Deserialize)]
pub struct EventDoc {
    #[serde(rename = "eventId")]
    pub event_id: Option<FlexId>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub odds: Map<String, Value>,
    #[serde(rename = "subEvents", default)]
    pub sub_events: Vec<EventDoc>,
}

// ---------------------------------------------------------------------------
// Batch accounting
// ---------------------------------------------------------------------------

/// Per-batch tally, logged after every import cycle. Row failures are counted
/// rather than aborting the traversal — the source is noisy and partial
/// capture is preferred.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportStats {
    pub files: usize,
    pub files_skipped: usize,
    pub sports: usize,
    pub championships: usize,
    pub matches: usize,
    pub events: usize,
    pub row_failures: usize,
}

impl ImportStats {
    pub fn absorb(&mut self, other: ImportStats) {
        self.files += other.files;
        self.files_skipped += other.files_skipped;
        self.sports += other.sports;
        self.championships += other.championships;
        self.matches += other.matches;
        self.events += other.events;
        self.row_failures += other.row_failures;
    }
}
