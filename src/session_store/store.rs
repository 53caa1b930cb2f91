use super::{AnalysisSession, SessionStore};
use crate::emotion::Emotion;
use crate::recommendation::RecommendationSource;
use crate::sqlite_column;
use crate::sqlite_persistence::{
    migrate_if_needed, Column, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};
use anyhow::{Context, Result};
use rusqlite::{params, types::Type, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

const ANALYSIS_SESSIONS_TABLE_V_0: Table = Table {
    name: "analysis_sessions",
    columns: &[
        sqlite_column!("session_id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("face_emotion", &SqlType::Text, non_null = true),
        sqlite_column!("audio_emotion", &SqlType::Text, non_null = true),
        sqlite_column!("text_emotion", &SqlType::Text, non_null = true),
        sqlite_column!("final_emotion", &SqlType::Text, non_null = true),
        sqlite_column!("final_confidence", &SqlType::Real, non_null = true),
        sqlite_column!("recommendation_source", &SqlType::Text, non_null = true),
        sqlite_column!(
            "recommended_movie_ids",
            &SqlType::Text,
            non_null = true,
            default_value = Some("'[]'")
        ), // JSON array
        sqlite_column!(
            "created",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_analysis_sessions_created", "created")],
};

const SESSIONS_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[ANALYSIS_SESSIONS_TABLE_V_0],
    migration: None,
}];

#[derive(Clone)]
pub struct SqliteSessionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSessionStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let mut conn =
            Connection::open(db_path.as_ref()).context("Failed to open sessions database")?;
        migrate_if_needed(&mut conn, SESSIONS_VERSIONED_SCHEMAS, "sessions")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM analysis_sessions", [], |r| r.get(0))
            .unwrap_or(0);
        info!("Opened sessions db: {} recorded sessions", count);

        Ok(SqliteSessionStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn parse_session_row(row: &rusqlite::Row) -> rusqlite::Result<AnalysisSession> {
        let source = match row.get::<_, String>(6)?.as_str() {
            "emotion_match" => RecommendationSource::EmotionMatch,
            "random_fallback" => RecommendationSource::RandomFallback,
            other => {
                return Err(rusqlite::Error::InvalidColumnType(
                    6,
                    other.to_string(),
                    Type::Text,
                ))
            }
        };
        let ids: String = row.get(7)?;
        let recommended_movie_ids: Vec<String> = serde_json::from_str(&ids)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;
        Ok(AnalysisSession {
            session_id: row.get(0)?,
            face_emotion: emotion_column(row, 1)?,
            audio_emotion: emotion_column(row, 2)?,
            text_emotion: emotion_column(row, 3)?,
            final_emotion: emotion_column(row, 4)?,
            final_confidence: row.get(5)?,
            recommendation_source: source,
            recommended_movie_ids,
            created: row.get(8)?,
        })
    }
}

fn emotion_column(row: &rusqlite::Row, index: usize) -> rusqlite::Result<Emotion> {
    let label: String = row.get(index)?;
    label
        .parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

impl SessionStore for SqliteSessionStore {
    fn record_session(&self, session: &AnalysisSession) -> Result<()> {
        let movie_ids = serde_json::to_string(&session.recommended_movie_ids)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO analysis_sessions (session_id, face_emotion, audio_emotion, text_emotion,
                final_emotion, final_confidence, recommendation_source, recommended_movie_ids, created)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                &session.session_id,
                session.face_emotion.as_str(),
                session.audio_emotion.as_str(),
                session.text_emotion.as_str(),
                session.final_emotion.as_str(),
                session.final_confidence,
                session.recommendation_source.as_str(),
                movie_ids,
                session.created,
            ],
        )
        .with_context(|| format!("Failed to record session {}", session.session_id))?;
        Ok(())
    }

    fn get_session(&self, session_id: &str) -> Result<Option<AnalysisSession>> {
        let conn = self.conn.lock().unwrap();
        let session = conn
            .query_row(
                "SELECT session_id, face_emotion, audio_emotion, text_emotion, final_emotion,
                        final_confidence, recommendation_source, recommended_movie_ids, created
                 FROM analysis_sessions WHERE session_id = ?1",
                params![session_id],
                Self::parse_session_row,
            )
            .optional()?;
        Ok(session)
    }

    fn prune_sessions_older_than(&self, cutoff: i64) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM analysis_sessions WHERE created < ?1",
            params![cutoff],
        )?;
        Ok(deleted)
    }

    fn get_sessions_count(&self) -> usize {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM analysis_sessions", [], |r| {
            r.get::<_, i64>(0)
        })
        .unwrap_or(0) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_tmp_store() -> (SqliteSessionStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteSessionStore::new(temp_dir.path().join("sessions.db")).unwrap();
        (store, temp_dir)
    }

    fn session(id: &str, created: i64) -> AnalysisSession {
        AnalysisSession {
            session_id: id.to_string(),
            face_emotion: Emotion::Neutral,
            audio_emotion: Emotion::Neutral,
            text_emotion: Emotion::Happy,
            final_emotion: Emotion::Happy,
            final_confidence: 0.9,
            recommendation_source: RecommendationSource::EmotionMatch,
            recommended_movie_ids: vec!["tt1".to_string(), "tt2".to_string()],
            created,
        }
    }

    #[test]
    fn test_record_and_get_session() {
        let (store, _dir) = create_tmp_store();
        let recorded = session("abc", 1_700_000_000);
        store.record_session(&recorded).unwrap();

        assert_eq!(store.get_session("abc").unwrap(), Some(recorded));
        assert!(store.get_session("missing").unwrap().is_none());
        assert_eq!(store.get_sessions_count(), 1);
    }

    #[test]
    fn test_movie_ids_keep_commas_and_order() {
        let (store, _dir) = create_tmp_store();
        let mut recorded = session("commas", 1);
        recorded.recommended_movie_ids = vec!["tt1,part".to_string(), "b".to_string()];
        store.record_session(&recorded).unwrap();

        let loaded = store.get_session("commas").unwrap().unwrap();
        assert_eq!(loaded.recommended_movie_ids, vec!["tt1,part", "b"]);
    }

    #[test]
    fn test_duplicate_session_id_is_rejected() {
        let (store, _dir) = create_tmp_store();
        store.record_session(&session("abc", 1)).unwrap();
        assert!(store.record_session(&session("abc", 2)).is_err());
    }

    #[test]
    fn test_empty_recommendation_list_round_trips() {
        let (store, _dir) = create_tmp_store();
        let mut recorded = session("empty", 10);
        recorded.recommended_movie_ids.clear();
        recorded.recommendation_source = RecommendationSource::RandomFallback;
        store.record_session(&recorded).unwrap();

        let loaded = store.get_session("empty").unwrap().unwrap();
        assert!(loaded.recommended_movie_ids.is_empty());
        assert_eq!(loaded.recommendation_source, RecommendationSource::RandomFallback);
    }

    #[test]
    fn test_prune_sessions_older_than() {
        let (store, _dir) = create_tmp_store();
        store.record_session(&session("old", 100)).unwrap();
        store.record_session(&session("older", 50)).unwrap();
        store.record_session(&session("new", 1_000)).unwrap();

        assert_eq!(store.prune_sessions_older_than(500).unwrap(), 2);
        assert_eq!(store.get_sessions_count(), 1);
        assert!(store.get_session("new").unwrap().is_some());
    }
}
