//! Row types destined for the relational sink, matching migrations/0001_schema.sql.

use crate::normalize::MarketOdds;

#[derive(Debug, Clone)]
pub struct SportRow {
    /// Externally supplied — parsed from the document, never generated.
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct ChampionshipRow {
    /// Externally supplied.
    pub id: i64,
    pub name: String,
    pub sport_id: i64,
}

#[derive(Debug, Clone)]
pub struct MatchRow {
    /// Synthetic, from the match counter of the [`crate::ids::IdAllocator`].
    pub id: i64,
    pub external_event_ref: String,
    pub team1: String,
    pub team2: String,
    /// Opaque display text; never parsed as a timestamp.
    pub time: String,
    pub championship_id: i64,
    pub odds: MarketOdds,
}

#[derive(Debug, Clone)]
pub struct EventRow {
    /// Synthetic, from the event counter (disjoint range from match ids).
    pub id: i64,
    pub match_id: i64,
    /// None for root sub-events; otherwise an event id inserted earlier in
    /// the same traversal.
    pub parent_event_id: Option<i64>,
    pub external_event_ref: String,
    pub name: String,
    pub time: String,
    pub description: String,
    pub odds: MarketOdds,
}
