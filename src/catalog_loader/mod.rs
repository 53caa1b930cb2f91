//! Catalog ingestion from tabular (CSV) datasets.
//!
//! Bad rows never abort a load: they are skipped or coerced and listed in
//! the [`LoadReport`]. A file without any title column is the one fatal case.

mod columns;
mod normalize;

pub use columns::{CanonicalField, ColumnMapping, ColumnSource};
pub use normalize::{
    derive_movie_id, normalize_emotion_tags, parse_float, parse_genres, parse_integer, parse_year,
};

use crate::catalog_store::{CatalogStore, Movie};
use csv::StringRecord;
use serde::Serialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("No title column found, expected one of {expected:?}, got {found:?}", expected = CanonicalField::Title.accepted_headers())]
    MissingTitleColumn { found: Vec<String> },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Catalog store error: {0}")]
    Store(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LoadProblem {
    /// 1-based data row, header excluded.
    pub row: usize,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub rows_read: usize,
    pub upserted: usize,
    pub skipped: usize,
    pub problems: Vec<LoadProblem>,
}

impl LoadReport {
    fn problem(&mut self, row: usize, message: impl Into<String>) {
        self.problems.push(LoadProblem {
            row,
            message: message.into(),
        });
    }
}

/// Movies parsed from a dataset, deduplicated by id (last row wins).
#[derive(Debug)]
pub struct ParsedCatalog {
    pub movies: Vec<Movie>,
    pub report: LoadReport,
}

pub fn parse_catalog<R: Read>(reader: R) -> Result<ParsedCatalog, LoaderError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::None)
        .from_reader(reader);

    let mapping = ColumnMapping::detect(csv_reader.headers()?)?;
    for field in CanonicalField::ALL {
        if let ColumnSource::Column { header, .. } = mapping.source(field) {
            info!("Mapping {:?} from column \"{}\"", field, header);
        }
    }

    let mut report = LoadReport::default();
    let mut movies: Vec<Movie> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (index, record) in csv_reader.records().enumerate() {
        let row = index + 1;
        report.rows_read += 1;

        let record = match record {
            Ok(record) => record,
            Err(e) => {
                report.skipped += 1;
                report.problem(row, format!("Unreadable row: {}", e));
                continue;
            }
        };

        let Some(movie) = parse_row(&mapping, &record, row, &mut report) else {
            report.skipped += 1;
            continue;
        };

        match positions.get(&movie.id) {
            Some(&existing) => {
                report.problem(
                    row,
                    format!("Duplicate id {}, replacing the earlier row", movie.id),
                );
                movies[existing] = movie;
            }
            None => {
                positions.insert(movie.id.clone(), movies.len());
                movies.push(movie);
            }
        }
    }

    Ok(ParsedCatalog { movies, report })
}

fn parse_row(
    mapping: &ColumnMapping,
    record: &StringRecord,
    row: usize,
    report: &mut LoadReport,
) -> Option<Movie> {
    let Some(title) = normalize::present(mapping.value(CanonicalField::Title, record)) else {
        report.problem(row, "Empty title, row skipped");
        return None;
    };

    let year = mapping.value(CanonicalField::Year, record).and_then(|raw| {
        let year = parse_year(raw);
        if year.is_none() && !normalize::is_missing(raw) {
            report.problem(row, format!("Unparseable year \"{}\"", raw));
        }
        year
    });

    let (emotion_tags, unknown_tags) = mapping
        .value(CanonicalField::EmotionTags, record)
        .map(normalize_emotion_tags)
        .unwrap_or_default();
    if !unknown_tags.is_empty() {
        report.problem(
            row,
            format!("Unknown emotion tags kept as-is: {}", unknown_tags.join(", ")),
        );
    }

    let text = |field: CanonicalField| {
        normalize::present(mapping.value(field, record)).map(|v| v.to_string())
    };

    Some(Movie {
        id: derive_movie_id(
            mapping.value(CanonicalField::NativeId, record),
            mapping.value(CanonicalField::SecondaryId, record),
            title,
            year,
        ),
        title: title.to_string(),
        genre: mapping
            .value(CanonicalField::Genres, record)
            .map(parse_genres)
            .unwrap_or_default(),
        year,
        rating: mapping.value(CanonicalField::Rating, record).and_then(parse_float),
        votes: mapping.value(CanonicalField::Votes, record).and_then(parse_integer),
        runtime_minutes: mapping
            .value(CanonicalField::Runtime, record)
            .and_then(parse_integer)
            .and_then(|m| i32::try_from(m).ok()),
        emotion_tags,
        file_path: text(CanonicalField::FilePath),
        thumbnail: text(CanonicalField::Thumbnail),
        description: text(CanonicalField::Description),
    })
}

/// Parses `reader` and upserts every movie in a single transaction.
pub fn load_catalog<R: Read>(
    reader: R,
    store: &dyn CatalogStore,
) -> Result<LoadReport, LoaderError> {
    let ParsedCatalog { movies, mut report } = parse_catalog(reader)?;
    report.upserted = store
        .upsert_movies(&movies)
        .map_err(|e| LoaderError::Store(format!("{:#}", e)))?;

    info!(
        "Catalog load done: {} rows read, {} upserted, {} skipped, {} problems",
        report.rows_read,
        report.upserted,
        report.skipped,
        report.problems.len()
    );
    if report.skipped > 0 {
        warn!("{} rows were skipped", report.skipped);
    }
    Ok(report)
}

pub fn load_catalog_file<P: AsRef<Path>>(
    path: P,
    store: &dyn CatalogStore,
) -> Result<LoadReport, LoaderError> {
    info!("Loading catalog from {:?}", path.as_ref());
    let file = std::fs::File::open(path.as_ref())?;
    load_catalog(file, store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_store::SqliteCatalogStore;
    use crate::emotion::Emotion;
    use tempfile::TempDir;

    const TMDB_STYLE_CSV: &str = "\
id,imdb_id,title,genres,release_date,vote_average,vote_count,runtime,overview,poster_path,emotions
603,tt0133093,The Matrix,\"[{'id': 28, 'name': 'Action'}, {'id': 878, 'name': 'Science Fiction'}]\",1999-03-30,8.2,24000,136.0,A hacker learns the truth.,/matrix.jpg,\"surprise, fear\"
13,,Forrest Gump,Comedy;Drama;Romance,1994,8.5,25000,142,,,\"joy,sad\"
,,   ,Drama,2000,7.0,10,90,,,
,,Mystery Film,Thriller,someday,nan,,,,,cozy
";

    #[test]
    fn parses_tmdb_style_rows() {
        let parsed = parse_catalog(TMDB_STYLE_CSV.as_bytes()).unwrap();
        let report = &parsed.report;
        assert_eq!(report.rows_read, 4);
        assert_eq!(report.skipped, 1);
        assert_eq!(parsed.movies.len(), 3);

        let matrix = &parsed.movies[0];
        assert_eq!(matrix.id, "tt0133093");
        assert_eq!(matrix.genre, "Action,Science Fiction");
        assert_eq!(matrix.year, Some(1999));
        assert_eq!(matrix.runtime_minutes, Some(136));
        assert_eq!(matrix.thumbnail.as_deref(), Some("/matrix.jpg"));
        assert!(matrix.has_emotion_tag(Emotion::Fearful));
        assert!(matrix.has_emotion_tag(Emotion::Surprised));

        let gump = &parsed.movies[1];
        assert_eq!(gump.id, "tmdb_13");
        assert_eq!(gump.genre, "Comedy,Drama,Romance");
        assert_eq!(gump.emotion_tags, "happy,sad");
        assert_eq!(gump.description, None);

        let mystery = &parsed.movies[2];
        assert!(mystery.id.starts_with("hash_"));
        assert_eq!(mystery.year, None);
        assert_eq!(mystery.rating, None);
        assert_eq!(mystery.emotion_tags, "cozy");

        let messages: Vec<&str> = report.problems.iter().map(|p| p.message.as_str()).collect();
        assert!(messages.iter().any(|m| m.contains("Empty title")));
        assert!(messages.iter().any(|m| m.contains("Unparseable year")));
        assert!(messages.iter().any(|m| m.contains("cozy")));
    }

    #[test]
    fn duplicate_ids_keep_last_row() {
        let csv = "imdb_id,title,rating\ntt1,First,5.0\ntt1,Second,7.0\n";
        let parsed = parse_catalog(csv.as_bytes()).unwrap();
        assert_eq!(parsed.movies.len(), 1);
        assert_eq!(parsed.movies[0].title, "Second");
        assert_eq!(parsed.report.problems.len(), 1);
    }

    #[test]
    fn missing_title_column_aborts() {
        let csv = "id,genres\n1,Drama\n";
        assert!(matches!(
            parse_catalog(csv.as_bytes()),
            Err(LoaderError::MissingTitleColumn { .. })
        ));
    }

    #[test]
    fn loads_into_store_and_reimport_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteCatalogStore::new(temp_dir.path().join("catalog.db"), 1).unwrap();

        let report = load_catalog(TMDB_STYLE_CSV.as_bytes(), &store).unwrap();
        assert_eq!(report.upserted, 3);
        assert_eq!(store.get_movies_count(), 3);

        load_catalog(TMDB_STYLE_CSV.as_bytes(), &store).unwrap();
        assert_eq!(store.get_movies_count(), 3);

        let gump = store.get_movie("tmdb_13").unwrap().unwrap();
        assert_eq!(gump.rating, Some(8.5));
        assert_eq!(gump.votes, Some(25000));
    }

    #[test]
    fn load_catalog_file_reports_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteCatalogStore::new(temp_dir.path().join("catalog.db"), 1).unwrap();
        let result = load_catalog_file(temp_dir.path().join("nope.csv"), &store);
        assert!(matches!(result, Err(LoaderError::Io(_))));
    }
}
