//! Team season batting rows.

use rusqlite::types::{Value, ValueRef};
use rusqlite::{params_from_iter, Row};
use tracing::{debug, warn};

use super::schema::{self, TEAM_STATS_TABLE, TEAM_STAT_COLUMNS};
use super::{RepositoryError, Result, Store};
use crate::models::{StatLine, StatValue, TeamStatRecord};

fn upsert_sql() -> String {
    let mut columns = vec!["team_id", "year"];
    columns.extend(TEAM_STAT_COLUMNS.iter().map(|c| c.name));
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    format!(
        "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
        TEAM_STATS_TABLE,
        columns.join(", "),
        placeholders.join(", ")
    )
}

fn row_to_team(row: &Row<'_>) -> rusqlite::Result<TeamStatRecord> {
    let mut stats = StatLine::new();
    for column in TEAM_STAT_COLUMNS {
        let value = match row.get_ref(column.name)? {
            ValueRef::Integer(v) => Some(StatValue::Integer(v)),
            ValueRef::Real(v) => Some(StatValue::Real(v)),
            ValueRef::Text(t) => Some(StatValue::Text(String::from_utf8_lossy(t).into_owned())),
            ValueRef::Null | ValueRef::Blob(_) => None,
        };
        stats.insert(column.name.to_string(), value);
    }
    Ok(TeamStatRecord {
        team_id: row.get("team_id")?,
        year: row.get("year")?,
        stats,
    })
}

impl Store {
    /// Write each team row with replace semantics on (team, year). Returns
    /// the number of rows written.
    pub fn merge_team_stats(&self, records: &[TeamStatRecord]) -> Result<usize> {
        for record in records {
            for column in record.stats.keys() {
                if schema::team_stat(column).is_none() {
                    let err = RepositoryError::UnknownColumn {
                        table: TEAM_STATS_TABLE,
                        column: column.clone(),
                    };
                    warn!("Dropping column from {} {}: {}", record.team_id, record.year, err);
                }
            }
        }

        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(&upsert_sql())?;
            for record in records {
                let mut values = vec![
                    Value::Text(record.team_id.clone()),
                    Value::Integer(record.year as i64),
                ];
                values.extend(TEAM_STAT_COLUMNS.iter().map(|c| match record.stat(c.name) {
                    None => Value::Null,
                    Some(StatValue::Integer(v)) => Value::Integer(*v),
                    Some(StatValue::Real(v)) => Value::Real(*v),
                    Some(StatValue::Text(s)) => Value::Text(s.clone()),
                }));
                written += stmt.execute(params_from_iter(values))?;
            }
        }
        tx.commit()?;

        debug!("Wrote {} team stat rows", written);
        Ok(written)
    }

    /// Team rows, optionally filtered, newest season first then by team.
    pub fn get_team_stats(
        &self,
        team_id: Option<&str>,
        year: Option<i32>,
    ) -> Result<Vec<TeamStatRecord>> {
        let conn = self.connect()?;

        let mut sql = String::from("SELECT * FROM team_stats WHERE 1 = 1");
        let mut params_vec: Vec<Value> = Vec::new();
        if let Some(team) = team_id {
            params_vec.push(Value::Text(team.to_uppercase()));
            sql.push_str(&format!(" AND team_id = ?{}", params_vec.len()));
        }
        if let Some(year) = year {
            params_vec.push(Value::Integer(year as i64));
            sql.push_str(&format!(" AND year = ?{}", params_vec.len()));
        }
        sql.push_str(" ORDER BY year DESC, team_id");

        let mut stmt = conn.prepare(&sql)?;
        let teams = stmt
            .query_map(params_from_iter(params_vec), row_to_team)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(teams)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Store) {
        let dir = TempDir::new().unwrap();
        let store = Store::initialize(&dir.path().join("test.db"), false).unwrap();
        (dir, store)
    }

    #[test]
    fn test_replace_semantics() {
        let (_dir, store) = setup();
        let first = TeamStatRecord::new("NYM", 2023)
            .with_stat("runs", Some(StatValue::Integer(717)))
            .with_stat("batting_avg", Some(StatValue::Real(0.238)));
        store.merge_team_stats(&[first]).unwrap();

        // A later row without batting_avg replaces the whole row.
        let second =
            TeamStatRecord::new("NYM", 2023).with_stat("runs", Some(StatValue::Integer(720)));
        store.merge_team_stats(&[second]).unwrap();

        let rows = store.get_team_stats(Some("NYM"), Some(2023)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].stat("runs"), Some(&StatValue::Integer(720)));
        assert_eq!(rows[0].stat("batting_avg"), None);
    }

    #[test]
    fn test_ordering_and_filters() {
        let (_dir, store) = setup();
        store
            .merge_team_stats(&[
                TeamStatRecord::new("NYM", 2022),
                TeamStatRecord::new("ATL", 2023),
                TeamStatRecord::new("NYM", 2023),
            ])
            .unwrap();

        let keys: Vec<(String, i32)> = store
            .get_team_stats(None, None)
            .unwrap()
            .into_iter()
            .map(|t| (t.team_id, t.year))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("ATL".to_string(), 2023),
                ("NYM".to_string(), 2023),
                ("NYM".to_string(), 2022),
            ]
        );

        assert_eq!(store.get_team_stats(Some("nym"), None).unwrap().len(), 2);
        assert_eq!(store.get_team_stats(None, Some(2022)).unwrap().len(), 1);
    }
}
