//! SQLite-backed catalog store.

use super::models::*;
use super::schema::CATALOG_VERSIONED_SCHEMAS;
use super::trait_def::CatalogStore;
use crate::emotion::Emotion;
use crate::sqlite_persistence::migrate_if_needed;
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

const MOVIE_COLUMNS: &str = "id, title, genre, year, rating, votes, runtime_minutes, \
     emotion_tags, file_path, thumbnail, description";

/// SQLite-backed movie catalog.
///
/// Writes go through a single connection, reads are spread round-robin over
/// a small pool of read-only connections.
#[derive(Clone)]
pub struct SqliteCatalogStore {
    read_pool: Vec<Arc<Mutex<Connection>>>,
    write_conn: Arc<Mutex<Connection>>,
    read_index: Arc<AtomicUsize>,
}

impl SqliteCatalogStore {
    /// Opens (creating if needed) the catalog database at `db_path`.
    ///
    /// # Arguments
    /// * `db_path` - Path to the SQLite database file
    /// * `read_pool_size` - Number of connections for concurrent reads
    pub fn new<P: AsRef<Path>>(db_path: P, read_pool_size: usize) -> Result<Self> {
        let db_path_ref = db_path.as_ref();

        let mut write_conn = Connection::open_with_flags(
            db_path_ref,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open catalog database")?;

        migrate_if_needed(&mut write_conn, CATALOG_VERSIONED_SCHEMAS, "catalog")?;
        write_conn.pragma_update(None, "journal_mode", "WAL")?;

        let movie_count: i64 = write_conn
            .query_row("SELECT COUNT(*) FROM movies", [], |r| r.get(0))
            .unwrap_or(0);
        info!("Opened movie catalog: {} movies", movie_count);

        let mut read_pool = Vec::with_capacity(read_pool_size.max(1));
        for _ in 0..read_pool_size.max(1) {
            let read_conn = Connection::open_with_flags(
                db_path_ref,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            read_pool.push(Arc::new(Mutex::new(read_conn)));
        }

        Ok(SqliteCatalogStore {
            read_pool,
            write_conn: Arc::new(Mutex::new(write_conn)),
            read_index: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn get_read_conn(&self) -> Arc<Mutex<Connection>> {
        let index = self.read_index.fetch_add(1, Ordering::SeqCst) % self.read_pool.len();
        self.read_pool[index].clone()
    }

    fn parse_movie_row(row: &rusqlite::Row) -> rusqlite::Result<Movie> {
        Ok(Movie {
            id: row.get(0)?,
            title: row.get(1)?,
            genre: row.get(2)?,
            year: row.get(3)?,
            rating: row.get(4)?,
            votes: row.get(5)?,
            runtime_minutes: row.get(6)?,
            emotion_tags: row.get(7)?,
            file_path: row.get(8)?,
            thumbnail: row.get(9)?,
            description: row.get(10)?,
        })
    }

    fn get_movie_inner(conn: &Connection, id: &str) -> Result<Option<Movie>> {
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM movies WHERE id = ?1",
            MOVIE_COLUMNS
        ))?;
        Ok(stmt
            .query_row(params![id], Self::parse_movie_row)
            .optional()?)
    }

    fn upsert_movie(conn: &Connection, movie: &Movie) -> Result<()> {
        let mut stmt = conn.prepare_cached(
            "INSERT INTO movies (id, title, genre, year, rating, votes, runtime_minutes,
                                 emotion_tags, file_path, thumbnail, description)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                genre = excluded.genre,
                year = excluded.year,
                rating = excluded.rating,
                votes = excluded.votes,
                runtime_minutes = excluded.runtime_minutes,
                emotion_tags = excluded.emotion_tags,
                file_path = excluded.file_path,
                thumbnail = excluded.thumbnail,
                description = excluded.description",
        )?;
        stmt.execute(params![
            &movie.id,
            &movie.title,
            &movie.genre,
            movie.year,
            movie.rating,
            movie.votes,
            movie.runtime_minutes,
            &movie.emotion_tags,
            &movie.file_path,
            &movie.thumbnail,
            &movie.description,
        ])?;
        Ok(())
    }
}

impl CatalogStore for SqliteCatalogStore {
    fn get_movie(&self, id: &str) -> Result<Option<Movie>> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        Self::get_movie_inner(&conn, id)
    }

    fn get_movies_by_ids(&self, ids: &[String]) -> Result<Vec<Movie>> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let mut movies = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(movie) = Self::get_movie_inner(&conn, id)? {
                movies.push(movie);
            }
        }
        Ok(movies)
    }

    fn list_movie_ids(&self) -> Result<Vec<String>> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached("SELECT id FROM movies ORDER BY id")?;
        let ids = stmt
            .query_map([], |r| r.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    fn get_emotion_candidates(&self, emotion: Emotion, min_rating: f64) -> Result<Vec<Movie>> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();

        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM movies
             WHERE emotion_tags LIKE '%' || ?1 || '%'
               AND rating >= ?2
             ORDER BY rating DESC, COALESCE(votes, 0) DESC, COALESCE(year, 0) DESC, id ASC",
            MOVIE_COLUMNS
        ))?;
        let movies = stmt
            .query_map(params![emotion.as_str(), min_rating], Self::parse_movie_row)?
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            "{} candidate movies for emotion {} at rating >= {}",
            movies.len(),
            emotion,
            min_rating
        );
        Ok(movies)
    }

    fn get_emotion_tag_counts(&self) -> Result<Vec<EmotionTagCount>> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();

        let mut stmt = conn.prepare_cached("SELECT emotion_tags FROM movies WHERE emotion_tags != ''")?;
        let mut counts: HashMap<Emotion, usize> = HashMap::new();
        let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
        for tags in rows {
            let tags = tags?;
            for emotion in Emotion::ALL {
                if split_tag_list(&tags).any(|t| t == emotion.as_str()) {
                    *counts.entry(emotion).or_default() += 1;
                }
            }
        }

        Ok(Emotion::ALL
            .into_iter()
            .map(|emotion| EmotionTagCount {
                emotion,
                movie_count: counts.get(&emotion).copied().unwrap_or(0),
            })
            .collect())
    }

    fn get_movies_count(&self) -> usize {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM movies", [], |r| r.get::<_, i64>(0))
            .unwrap_or(0) as usize
    }

    fn upsert_movies(&self, movies: &[Movie]) -> Result<usize> {
        let conn = self.write_conn.lock().unwrap();
        conn.execute("BEGIN IMMEDIATE", [])?;

        let result = (|| -> Result<usize> {
            for movie in movies {
                Self::upsert_movie(&conn, movie)
                    .with_context(|| format!("Failed to upsert movie {}", movie.id))?;
            }
            Ok(movies.len())
        })();

        match result {
            Ok(written) => {
                conn.execute("COMMIT", [])?;
                Ok(written)
            }
            Err(e) => {
                let _ = conn.execute("ROLLBACK", []);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_tmp_store() -> (SqliteCatalogStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteCatalogStore::new(temp_dir.path().join("catalog.db"), 2).unwrap();
        (store, temp_dir)
    }

    fn movie(id: &str, rating: f64, votes: Option<i64>, year: Option<i32>, tags: &str) -> Movie {
        Movie {
            id: id.to_string(),
            title: format!("Movie {}", id),
            genre: "Drama".to_string(),
            year,
            rating: Some(rating),
            votes,
            runtime_minutes: Some(100),
            emotion_tags: tags.to_string(),
            file_path: None,
            thumbnail: None,
            description: None,
        }
    }

    #[test]
    fn test_upsert_and_get() {
        let (store, _dir) = create_tmp_store();
        assert_eq!(store.get_movies_count(), 0);

        let written = store
            .upsert_movies(&[movie("tt1", 7.0, None, None, "happy")])
            .unwrap();
        assert_eq!(written, 1);

        let loaded = store.get_movie("tt1").unwrap().unwrap();
        assert_eq!(loaded.title, "Movie tt1");
        assert!(store.get_movie("tt2").unwrap().is_none());
    }

    #[test]
    fn test_upsert_replaces_existing_row() {
        let (store, _dir) = create_tmp_store();
        store
            .upsert_movies(&[movie("tt1", 7.0, None, None, "happy")])
            .unwrap();
        store
            .upsert_movies(&[movie("tt1", 8.5, Some(10), None, "sad")])
            .unwrap();

        assert_eq!(store.get_movies_count(), 1);
        let loaded = store.get_movie("tt1").unwrap().unwrap();
        assert_eq!(loaded.rating, Some(8.5));
        assert_eq!(loaded.emotion_tags, "sad");
    }

    #[test]
    fn test_emotion_candidates_ordering() {
        let (store, _dir) = create_tmp_store();
        store
            .upsert_movies(&[
                movie("a", 7.0, Some(10), Some(2000), "happy"),
                movie("b", 7.0, Some(50), Some(1990), "happy"),
                movie("c", 7.0, Some(50), Some(2010), "happy"),
                movie("d", 9.0, None, None, "happy,sad"),
                movie("e", 5.0, Some(999), Some(2020), "happy"),
                movie("f", 8.0, Some(10), Some(2000), "sad"),
            ])
            .unwrap();

        let ids: Vec<String> = store
            .get_emotion_candidates(Emotion::Happy, 6.0)
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec!["d", "c", "b", "a"]);
    }

    #[test]
    fn test_get_movies_by_ids_preserves_order() {
        let (store, _dir) = create_tmp_store();
        store
            .upsert_movies(&[
                movie("a", 7.0, None, None, ""),
                movie("b", 7.0, None, None, ""),
                movie("c", 7.0, None, None, ""),
            ])
            .unwrap();

        let ids = vec!["c".to_string(), "missing".to_string(), "a".to_string()];
        let movies = store.get_movies_by_ids(&ids).unwrap();
        assert_eq!(
            movies.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(),
            vec!["c", "a"]
        );
        assert_eq!(store.list_movie_ids().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_emotion_tag_counts() {
        let (store, _dir) = create_tmp_store();
        store
            .upsert_movies(&[
                movie("a", 7.0, None, None, "happy, sad"),
                movie("b", 7.0, None, None, "sadness"),
                movie("c", 7.0, None, None, "Happy"),
            ])
            .unwrap();

        let counts = store.get_emotion_tag_counts().unwrap();
        let count_of = |e: Emotion| {
            counts
                .iter()
                .find(|c| c.emotion == e)
                .map(|c| c.movie_count)
                .unwrap()
        };
        assert_eq!(count_of(Emotion::Happy), 2);
        assert_eq!(count_of(Emotion::Sad), 1);
        assert_eq!(count_of(Emotion::Fearful), 0);
    }

    #[test]
    fn test_reopen_validates_existing_schema() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("catalog.db");
        {
            let store = SqliteCatalogStore::new(&path, 1).unwrap();
            store
                .upsert_movies(&[movie("a", 7.0, None, None, "happy")])
                .unwrap();
        }
        let store = SqliteCatalogStore::new(&path, 1).unwrap();
        assert_eq!(store.get_movies_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_reads_no_blocking() {
        let (store, _dir) = create_tmp_store();
        store
            .upsert_movies(&[movie("a", 7.0, None, None, "happy")])
            .unwrap();

        let handles: Vec<_> = (0..10)
            .map(|_| {
                tokio::spawn({
                    let store = store.clone();
                    async move {
                        for _ in 0..50 {
                            assert_eq!(store.get_movies_count(), 1);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }
    }
}
