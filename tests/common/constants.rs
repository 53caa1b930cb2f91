//! Shared constants for end-to-end tests
//!
//! When the fixture catalog changes, update only this file.

// ============================================================================
// Test Catalog
// ============================================================================

/// Rows in `fixtures/movies.csv`, header excluded.
pub const CATALOG_ROWS: usize = 8;

/// Movies actually stored (the untitled row is skipped).
pub const CATALOG_MOVIES: usize = 7;

/// Rated 8.1, tagged happy
pub const SUNNY_DAYS_ID: &str = "tt0000001";

/// Rated 7.9, tagged happy and surprised
pub const GOOD_VIBES_ID: &str = "tt0000002";

/// Rated 6.5, tagged happy
pub const LAUGH_TRACK_ID: &str = "tt0000003";

/// Rated 4.0, tagged happy but below the rating floor
pub const LOW_SCORE_FUN_ID: &str = "tt0000004";

/// Tagged "unhappy", which must not match happy
pub const UNHAPPY_ENDING_ID: &str = "tt0000005";

/// Rated 7.2, tagged sad
pub const RAINY_DAY_ID: &str = "tt0000006";

/// No imdb id in the fixture, keyed by its TMDB id
pub const FIGHT_CLUB_ID: &str = "tmdb_550";

// ============================================================================
// Timeouts
// ============================================================================

/// Max time to wait for the test server to answer `GET /`
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Interval between readiness probes
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;

/// Per-request timeout for the test client
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Uploads
// ============================================================================

/// Smallest payload `infer` recognizes as PNG
pub const PNG_BYTES: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

/// Upload limit used by the test server
pub const TEST_MAX_UPLOAD_BYTES: usize = 64 * 1024;
