//! Player identity rows.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::{parse_datetime, parse_datetime_opt, to_option, Result, Store};
use crate::models::{Player, PlayerListing};

/// Insert or refresh a player row. An absent or blank name never clears a
/// stored one.
pub(super) fn upsert_player(
    conn: &Connection,
    player_id: &str,
    name: Option<&str>,
    now: DateTime<Utc>,
) -> Result<()> {
    let name = name.map(str::trim).filter(|n| !n.is_empty());
    conn.execute(
        r#"
        INSERT INTO players (player_id, player_name, last_updated)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(player_id) DO UPDATE SET
            player_name = COALESCE(excluded.player_name, players.player_name),
            last_updated = excluded.last_updated
        "#,
        params![player_id, name, now.to_rfc3339()],
    )?;
    Ok(())
}

impl Store {
    /// Record that a player was seen, without touching their games.
    pub fn touch_player(&self, player_id: &str, name: Option<&str>) -> Result<()> {
        let conn = self.connect()?;
        upsert_player(&conn, player_id, name, Utc::now())
    }

    /// Set a stored player's name. Returns `false` when the player is not
    /// stored or the name is blank; unknown players are not created.
    pub fn rename_player(&self, player_id: &str, name: &str) -> Result<bool> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(false);
        }
        let conn = self.connect()?;
        let changed = conn.execute(
            "UPDATE players SET player_name = ?1, last_updated = ?2 WHERE player_id = ?3",
            params![name, Utc::now().to_rfc3339(), player_id],
        )?;
        Ok(changed > 0)
    }

    pub fn get_player(&self, player_id: &str) -> Result<Option<Player>> {
        let conn = self.connect()?;
        to_option(conn.query_row(
            "SELECT player_id, player_name, last_updated FROM players WHERE player_id = ?1",
            params![player_id],
            |row| {
                Ok(Player {
                    player_id: row.get(0)?,
                    player_name: row.get(1)?,
                    last_updated: parse_datetime(&row.get::<_, Option<String>>(2)?.unwrap_or_default()),
                })
            },
        ))
    }

    /// Every known player with their stored-game coverage. Players with no
    /// games are included.
    pub fn list_players(&self) -> Result<Vec<PlayerListing>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT
                p.player_id,
                p.player_name,
                p.last_updated,
                COUNT(g.id) AS games,
                MIN(g.year) AS first_year,
                MAX(g.year) AS last_year
            FROM players p
            LEFT JOIN pitching_gamelogs g ON g.player_id = p.player_id
            GROUP BY p.player_id, p.player_name, p.last_updated
            ORDER BY p.player_id
            "#,
        )?;

        let listings = stmt
            .query_map([], |row| {
                Ok(PlayerListing {
                    player_id: row.get(0)?,
                    player_name: row.get(1)?,
                    last_updated: parse_datetime_opt(row.get(2)?),
                    games: row.get(3)?,
                    first_year: row.get(4)?,
                    last_year: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(listings)
    }

    /// Ids of players that already have at least one stored game.
    pub fn players_with_games(&self) -> Result<HashSet<String>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT DISTINCT player_id FROM pitching_gamelogs")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<HashSet<_>, _>>()?;
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GameLogRecord, StatValue};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Store) {
        let dir = TempDir::new().unwrap();
        let store = Store::initialize(&dir.path().join("test.db"), false).unwrap();
        (dir, store)
    }

    #[test]
    fn test_name_is_preserved_when_absent() {
        let (_dir, store) = setup();
        store.touch_player("degroja01", Some("Jacob deGrom")).unwrap();
        let before = store.get_player("degroja01").unwrap().unwrap();

        std::thread::sleep(std::time::Duration::from_millis(5));
        let game = GameLogRecord::new(
            "degroja01",
            NaiveDate::from_ymd_opt(2023, 4, 1).unwrap(),
            2023,
        )
        .with_stat("strikeouts", Some(StatValue::Integer(9)));
        store
            .merge_game_logs("degroja01", &[2023], &[game], None)
            .unwrap();

        let after = store.get_player("degroja01").unwrap().unwrap();
        assert_eq!(after.player_name.as_deref(), Some("Jacob deGrom"));
        assert!(after.last_updated > before.last_updated);
    }

    #[test]
    fn test_blank_name_does_not_clear() {
        let (_dir, store) = setup();
        store.touch_player("degroja01", Some("Jacob deGrom")).unwrap();
        store.touch_player("degroja01", Some("   ")).unwrap();

        let player = store.get_player("degroja01").unwrap().unwrap();
        assert_eq!(player.player_name.as_deref(), Some("Jacob deGrom"));
    }

    #[test]
    fn test_new_name_overwrites() {
        let (_dir, store) = setup();
        store.touch_player("doej01", None).unwrap();
        assert_eq!(store.get_player("doej01").unwrap().unwrap().player_name, None);

        store.touch_player("doej01", Some("John Doe")).unwrap();
        assert_eq!(
            store.get_player("doej01").unwrap().unwrap().player_name.as_deref(),
            Some("John Doe")
        );
    }

    #[test]
    fn test_rename_only_touches_stored_players() {
        let (_dir, store) = setup();
        store.touch_player("degroja01", Some("Jake deGrom")).unwrap();

        assert!(store.rename_player("degroja01", "Jacob deGrom").unwrap());
        assert_eq!(
            store.get_player("degroja01").unwrap().unwrap().player_name.as_deref(),
            Some("Jacob deGrom")
        );

        assert!(!store.rename_player("degroja01", "  ").unwrap());
        assert!(!store.rename_player("nobody01", "No Body").unwrap());
        assert!(store.get_player("nobody01").unwrap().is_none());
    }

    #[test]
    fn test_list_includes_players_without_games() {
        let (_dir, store) = setup();
        store.touch_player("emptyp01", Some("No Games")).unwrap();
        let game = GameLogRecord::new("doej01", NaiveDate::from_ymd_opt(2022, 6, 1).unwrap(), 2022);
        store.merge_game_logs("doej01", &[2022], &[game], None).unwrap();

        let listings = store.list_players().unwrap();
        assert_eq!(listings.len(), 2);

        let doe = &listings[0];
        assert_eq!(doe.player_id, "doej01");
        assert_eq!(doe.games, 1);
        assert_eq!(doe.first_year, Some(2022));

        let empty = &listings[1];
        assert_eq!(empty.games, 0);
        assert_eq!(empty.first_year, None);

        let with_games = store.players_with_games().unwrap();
        assert!(with_games.contains("doej01"));
        assert!(!with_games.contains("emptyp01"));
    }
}
