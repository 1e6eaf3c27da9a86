use std::path::Path;

use tracing::{debug, error, info};

use crate::db::models::{ChampionshipRow, EventRow, MatchRow, SportRow};
use crate::db::Sink;
use crate::error::{AppError, Result};
use crate::ids::IdAllocator;
use crate::normalize::MarketOdds;
use crate::types::{DocumentRoot, EventDoc, ImportStats, MatchDoc, SportDoc};

/// Converts one producer document into ordered inserts against the sink.
///
/// The traversal is best-effort at row granularity: an insert failure is
/// logged with the entity id and the traversal continues with siblings, so a
/// noisy source still yields partial data. Only a document that cannot be
/// parsed at all (or lacks its sport object) aborts the file.
pub struct TreeImporter<'a> {
    sink: &'a Sink,
    ids: &'a mut IdAllocator,
    stats: ImportStats,
}

impl<'a> TreeImporter<'a> {
    pub fn new(sink: &'a Sink, ids: &'a mut IdAllocator) -> Self {
        Self { sink, ids, stats: ImportStats::default() }
    }

    /// Reads, parses and imports a single document file.
    pub async fn import_file(mut self, path: &Path) -> Result<ImportStats> {
        info!("Importing document: {}", path.display());

        let raw = std::fs::read_to_string(path)?;
        let root: DocumentRoot = serde_json::from_str(&raw)
            .map_err(|e| AppError::Malformed(format!("{}: {e}", path.display())))?;

        let Some(sport) = root.sport else {
            return Err(AppError::Malformed(format!(
                "{}: no sport object at document root",
                path.display()
            )));
        };

        self.import_sport(&sport).await;
        self.stats.files = 1;
        info!(
            "Finished document {}: {} championships, {} matches, {} events, {} row failures",
            path.display(),
            self.stats.championships,
            self.stats.matches,
            self.stats.events,
            self.stats.row_failures,
        );
        Ok(self.stats)
    }

    async fn import_sport(&mut self, sport: &SportDoc) {
        let Some(sport_id) = sport.sport_id.as_i64() else {
            error!("Skipping sport with unusable id {:?}", sport.sport_id);
            self.stats.row_failures += 1;
            return;
        };

        debug!(sport_id, name = %sport.sport_name, "Processing sport");
        let row = SportRow { id: sport_id, name: sport.sport_name.clone() };
        match self.sink.add_sport(&row).await {
            Ok(()) => self.stats.sports += 1,
            Err(e) => {
                error!("Failed to add sport (id={sport_id}): {e}");
                self.stats.row_failures += 1;
            }
        }

        for championship in &sport.championships {
            let Some(championship_id) = championship.championship_id.as_i64() else {
                error!(
                    "Skipping championship with unusable id {:?} (sport {sport_id})",
                    championship.championship_id
                );
                self.stats.row_failures += 1;
                continue;
            };

            debug!(championship_id, name = %championship.championship_name, "Processing championship");
            let row = ChampionshipRow {
                id: championship_id,
                name: championship.championship_name.clone(),
                sport_id,
            };
            match self.sink.add_championship(&row).await {
                Ok(()) => self.stats.championships += 1,
                Err(e) => {
                    error!("Failed to add championship (id={championship_id}): {e}");
                    self.stats.row_failures += 1;
                }
            }

            for m in &championship.matches {
                self.import_match(championship_id, m).await;
            }
        }
    }

    async fn import_match(&mut self, championship_id: i64, m: &MatchDoc) {
        let match_id = self.ids.next_match_id();
        debug!(match_id, team1 = %m.team1, team2 = %m.team2, "Processing match");

        let row = MatchRow {
            id: match_id,
            external_event_ref: m.event_id.as_ref().map(|id| id.to_string()).unwrap_or_default(),
            team1: m.team1.clone(),
            team2: m.team2.clone(),
            time: m.time.clone(),
            championship_id,
            odds: MarketOdds::from_map(&m.odds),
        };
        match self.sink.add_match(&row).await {
            Ok(()) => self.stats.matches += 1,
            Err(e) => {
                error!("Failed to add match (id={match_id}): {e}");
                self.stats.row_failures += 1;
            }
        }

        self.import_event_tree(match_id, &m.events).await;
    }

    /// Walks the sub-event tree with an explicit stack: source depth is
    /// unbounded, so the call stack is not trusted to hold it. Nodes are
    /// visited in document order and every parent is inserted before its
    /// children, which keeps `parent_event_id` pointing at an existing row.
    async fn import_event_tree(&mut self, match_id: i64, roots: &[EventDoc]) {
        let mut stack: Vec<(&EventDoc, Option<i64>)> =
            roots.iter().rev().map(|e| (e, None)).collect();

        while let Some((event, parent_event_id)) = stack.pop() {
            let event_id = self.ids.next_event_id();
            debug!(event_id, match_id, parent = ?parent_event_id, name = %event.name, "Processing event");

            let row = EventRow {
                id: event_id,
                match_id,
                parent_event_id,
                external_event_ref: event
                    .event_id
                    .as_ref()
                    .map(|id| id.to_string())
                    .unwrap_or_default(),
                name: event.name.clone(),
                time: event.time.clone(),
                description: event.description.clone(),
                odds: MarketOdds::from_map(&event.odds),
            };
            match self.sink.add_event(&row).await {
                Ok(()) => self.stats.events += 1,
                Err(e) => {
                    error!("Failed to add event (id={event_id}): {e}");
                    self.stats.row_failures += 1;
                }
            }

            for sub in event.sub_events.iter().rev() {
                stack.push((sub, Some(event_id)));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
