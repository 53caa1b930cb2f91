//! Source header detection.
//!
//! Datasets in the wild name the same thing differently ("title" vs "name",
//! "vote_average" vs "rating"). Each canonical field lists the headers it
//! accepts, in preference order, and the first one present wins.

use super::LoaderError;
use csv::StringRecord;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    Title,
    NativeId,
    SecondaryId,
    Description,
    Genres,
    Year,
    Rating,
    Votes,
    Runtime,
    FilePath,
    Thumbnail,
    EmotionTags,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 12] = [
        CanonicalField::Title,
        CanonicalField::NativeId,
        CanonicalField::SecondaryId,
        CanonicalField::Description,
        CanonicalField::Genres,
        CanonicalField::Year,
        CanonicalField::Rating,
        CanonicalField::Votes,
        CanonicalField::Runtime,
        CanonicalField::FilePath,
        CanonicalField::Thumbnail,
        CanonicalField::EmotionTags,
    ];

    pub fn accepted_headers(&self) -> &'static [&'static str] {
        match self {
            CanonicalField::Title => &["title", "name"],
            CanonicalField::NativeId => &["imdb_id", "imdbID", "imdbId"],
            CanonicalField::SecondaryId => &["id", "movie_id", "tmdb_id"],
            CanonicalField::Description => &["overview", "description", "tagline", "summary"],
            CanonicalField::Genres => &["genres", "genre", "genres_x"],
            CanonicalField::Year => &["release_date", "year", "release_year"],
            CanonicalField::Rating => &["vote_average", "rating", "score"],
            CanonicalField::Votes => &["vote_count", "votes"],
            CanonicalField::Runtime => &["runtime", "runtime_minutes", "length", "duration"],
            CanonicalField::FilePath => &["file_path", "file", "filepath", "video"],
            CanonicalField::Thumbnail => &["thumbnail", "poster_path", "poster"],
            CanonicalField::EmotionTags => &["emotion_tags", "emotions", "tags"],
        }
    }
}

/// Where a canonical field's values come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnSource {
    Column { index: usize, header: String },
    Missing,
}

#[derive(Clone, Debug)]
pub struct ColumnMapping {
    sources: HashMap<CanonicalField, ColumnSource>,
}

impl ColumnMapping {
    /// Picks a source column for every canonical field. Fails only when no
    /// title column exists.
    pub fn detect(headers: &StringRecord) -> Result<Self, LoaderError> {
        let cleaned: Vec<String> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        let sources = CanonicalField::ALL
            .into_iter()
            .map(|field| {
                let source = field
                    .accepted_headers()
                    .iter()
                    .find_map(|accepted| {
                        cleaned
                            .iter()
                            .position(|h| h == accepted)
                            .map(|index| ColumnSource::Column {
                                index,
                                header: accepted.to_string(),
                            })
                    })
                    .unwrap_or(ColumnSource::Missing);
                (field, source)
            })
            .collect::<HashMap<_, _>>();

        if sources.get(&CanonicalField::Title) == Some(&ColumnSource::Missing) {
            return Err(LoaderError::MissingTitleColumn { found: cleaned });
        }
        Ok(ColumnMapping { sources })
    }

    pub fn source(&self, field: CanonicalField) -> &ColumnSource {
        self.sources.get(&field).unwrap_or(&ColumnSource::Missing)
    }

    /// The trimmed value of `field` in `record`, None when the column is
    /// missing, the row is short or the cell is blank.
    pub fn value<'r>(&self, field: CanonicalField, record: &'r StringRecord) -> Option<&'r str> {
        match self.source(field) {
            ColumnSource::Column { index, .. } => record
                .get(*index)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty()),
            ColumnSource::Missing => None,
        }
    }
}
