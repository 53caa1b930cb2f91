//! SQLite schema definitions for the movie catalog database.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP};

/// Movies table, keyed by the identifier the loader derives (imdb id,
/// `tmdb_<id>` or `hash_<hex>`).
const MOVIES_TABLE_V_0: Table = Table {
    name: "movies",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!(
            "genre",
            &SqlType::Text,
            non_null = true,
            default_value = Some("''")
        ), // comma-joined
        sqlite_column!("year", &SqlType::Integer),
        sqlite_column!("rating", &SqlType::Real),
        sqlite_column!("votes", &SqlType::Integer),
        sqlite_column!("runtime_minutes", &SqlType::Integer),
        sqlite_column!(
            "emotion_tags",
            &SqlType::Text,
            non_null = true,
            default_value = Some("''")
        ), // comma-joined vocabulary labels
        sqlite_column!("file_path", &SqlType::Text),
        sqlite_column!("thumbnail", &SqlType::Text),
        sqlite_column!("description", &SqlType::Text),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_movies_rating", "rating")],
};

pub const CATALOG_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[MOVIES_TABLE_V_0],
    migration: None,
}];
