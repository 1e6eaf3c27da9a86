use sqlx::SqlitePool;

use crate::db::models::{ChampionshipRow, EventRow, MatchRow, SportRow};
use crate::error::Result;

/// Serial access point to the relational sink. The pool is capped at one
/// connection — the whole batch reuses a single handle, and nothing here is
/// safe for concurrent use from more than one logical flow.
pub struct Sink {
    pool: SqlitePool,
}

impl Sink {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Empties all four tables in dependency order (deepest-dependent first)
    /// inside one transaction, with foreign-key checks deferred to commit.
    /// All-or-nothing, and a no-op on already-empty tables.
    pub async fn wipe_all(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("PRAGMA defer_foreign_keys = ON")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM match_events").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM matches").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM championships").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM sports").execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn add_sport(&self, sport: &SportRow) -> Result<()> {
        sqlx::query("INSERT INTO sports (sport_id, sport_name) VALUES (?, ?)")
            .bind(sport.id)
            .bind(&sport.name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn add_championship(&self, championship: &ChampionshipRow) -> Result<()> {
        sqlx::query(
            "INSERT INTO championships (championship_id, championship_name, sport_id) \
             VALUES (?, ?, ?)",
        )
        .bind(championship.id)
        .bind(&championship.name)
        .bind(championship.sport_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn add_match(&self, m: &MatchRow) -> Result<()> {
        sqlx::query(
            "INSERT INTO matches (match_id, external_event_ref, team1, team2, match_time, \
             championship_id, coefficient_first, coefficient_draw, coefficient_second, \
             coefficient_first_fora, coefficient_second_fora, coefficient_total, \
             coefficient_over, coefficient_under) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(m.id)
        .bind(&m.external_event_ref)
        .bind(&m.team1)
        .bind(&m.team2)
        .bind(&m.time)
        .bind(m.championship_id)
        .bind(&m.odds.first)
        .bind(&m.odds.draw)
        .bind(&m.odds.second)
        .bind(&m.odds.first_fora)
        .bind(&m.odds.second_fora)
        .bind(&m.odds.total)
        .bind(&m.odds.over)
        .bind(&m.odds.under)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn add_event(&self, e: &EventRow) -> Result<()> {
        sqlx::query(
            "INSERT INTO match_events (event_id, match_id, parent_event_id, \
             external_event_ref, event_name, event_time, description, \
             coefficient_first, coefficient_draw, coefficient_second, \
             coefficient_first_fora, coefficient_second_fora, coefficient_total, \
             coefficient_over, coefficient_under) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(e.id)
        .bind(e.match_id)
        .bind(e.parent_event_id)
        .bind(&e.external_event_ref)
        .bind(&e.name)
        .bind(&e.time)
        .bind(&e.description)
        .bind(&e.odds.first)
        .bind(&e.odds.draw)
        .bind(&e.odds.second)
        .bind(&e.odds.first_fora)
        .bind(&e.odds.second_fora)
        .bind(&e.odds.total)
        .bind(&e.odds.over)
        .bind(&e.odds.under)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::MarketOdds;

    async fn test_sink() -> Sink {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory pool");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("migrations");
        Sink::new(pool)
    }

    async fn count(sink: &Sink, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(sink.pool())
            .await
            .expect("count query")
    }

    #[tokio::test]
    async fn wipe_is_idempotent() {
        let sink = test_sink().await;
        sink.add_sport(&SportRow { id: 1, name: "Football".into() })
            .await
            .expect("insert sport");
        sink.add_championship(&ChampionshipRow { id: 10, name: "EPL".into(), sport_id: 1 })
            .await
            .expect("insert championship");

        sink.wipe_all().await.expect("first wipe");
        assert_eq!(count(&sink, "sports").await, 0);
        assert_eq!(count(&sink, "championships").await, 0);
        assert_eq!(count(&sink, "matches").await, 0);
        assert_eq!(count(&sink, "match_events").await, 0);

        // Second wipe on empty tables must succeed and leave them empty.
        sink.wipe_all().await.expect("second wipe");
        assert_eq!(count(&sink, "sports").await, 0);
    }

    #[tokio::test]
    async fn duplicate_sport_insert_fails_without_poisoning_the_sink() {
        let sink = test_sink().await;
        let row = SportRow { id: 1, name: "Football".into() };
        sink.add_sport(&row).await.expect("first insert");
        assert!(sink.add_sport(&row).await.is_err());

        // The sink stays usable after a constraint violation.
        sink.add_sport(&SportRow { id: 2, name: "Tennis".into() })
            .await
            .expect("insert after failure");
        assert_eq!(count(&sink, "sports").await, 2);
    }
}
