//! Test utilities and fixtures for pic-curator tests.
//!
//! This module provides temporary libraries, real image files and mock
//! records to reduce boilerplate in tests.
//!
//! # Example
//!
//! ```ignore
//! use pic_curator::test_utils::{temp_db, write_test_image};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let (pool, dir) = temp_db().await;
//!     write_test_image(dir.path(), "cat.png", 20, 10);
//!     // ... test logic
//! }
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use tempfile::TempDir;

use crate::config::DEFAULT_DB_NAME;
use crate::model::{DEFAULT_RATING, Image, NewImage, Orientation};

/// Creates a temporary database for testing.
///
/// The database lives at `<dir>/db.sqlite` in a temporary directory that is
/// removed when the returned `TempDir` is dropped. Migrations are run
/// automatically. Tests that need files use the same directory as the
/// managed root; the scanner skips the database file.
///
/// ```ignore
/// let (pool, _dir) = temp_db().await;
/// ```
pub async fn temp_db() -> (SqlitePool, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let pool = open_db(dir.path()).await;
    (pool, dir)
}

async fn open_db(dir: &Path) -> SqlitePool {
    let db_url = crate::db::db_url(&dir.join(DEFAULT_DB_NAME));
    crate::db::init_db(&db_url)
        .await
        .expect("Failed to initialize test database")
}

/// Writes a small PNG at `dir/name`, creating parent directories.
///
/// Pixel content is derived from `name`, so different names give different
/// bytes (and different content hashes).
pub fn write_test_image(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create image directory");
    }

    let seed = name
        .bytes()
        .fold(7u32, |acc, b| acc.wrapping_mul(31).wrapping_add(u32::from(b)));
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        let v = seed.wrapping_add(x.wrapping_mul(17)).wrapping_add(y.wrapping_mul(13));
        image::Rgb([v as u8, (v >> 8) as u8, (v >> 16) as u8])
    });
    img.save(&path).expect("Failed to write test image");
    path
}

/// Creates an in-memory record with the given ID, path and rating.
///
/// Customize using struct update syntax:
///
/// ```ignore
/// let boosted = Image { extra_count: 2, ..mock_image(1, "a.jpg", 1200) };
/// ```
pub fn mock_image(id: i64, path: &str, rating: i64) -> Image {
    Image {
        id,
        path: path.to_string(),
        width: 20,
        height: 10,
        orientation: Orientation::Landscape,
        content_hash: Some(format!("hash-{path}")),
        shown_times: 0,
        elo_rating: rating,
        hidden: false,
        extra_count: 0,
        created_at: DateTime::<Utc>::UNIX_EPOCH,
        updated_at: DateTime::<Utc>::UNIX_EPOCH,
    }
}

/// Insert payload for a 20x10 landscape image with a unique fake hash.
pub fn mock_new_image(path: &str) -> NewImage {
    NewImage {
        path: path.to_string(),
        width: 20,
        height: 10,
        orientation: Orientation::Landscape,
        content_hash: Some(format!("hash-{path}")),
    }
}

/// Inserts a mock record with the given rating and returns its ID.
pub async fn insert_mock_image(pool: &SqlitePool, path: &str, rating: i64) -> i64 {
    let mut image = crate::db::insert_image(pool, &mock_new_image(path))
        .await
        .expect("Failed to insert image");

    if rating != DEFAULT_RATING {
        image.elo_rating = rating;
        crate::db::save_round(pool, &image)
            .await
            .expect("Failed to set rating");
    }
    image.id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_temp_db_creates_working_database() {
        let (pool, dir) = temp_db().await;

        assert!(dir.path().join(DEFAULT_DB_NAME).exists());
        assert_eq!(crate::db::count_images(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_insert_mock_image() {
        let (pool, _dir) = temp_db().await;

        let id = insert_mock_image(&pool, "1_good/a.png", 1300).await;
        assert!(id > 0);

        let image = crate::db::get_image_by_id(&pool, id).await.unwrap().unwrap();
        assert_eq!(image.path, "1_good/a.png");
        assert_eq!(image.elo_rating, 1300);
    }

    #[test]
    fn test_write_test_image_varies_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_test_image(dir.path(), "nested/a.png", 8, 4);
        let b = write_test_image(dir.path(), "b.png", 8, 4);

        assert!(a.exists());
        assert_ne!(std::fs::read(&a).unwrap(), std::fs::read(&b).unwrap());
        assert_eq!(image::image_dimensions(&a).unwrap(), (8, 4));
    }

    #[test]
    fn test_mock_image_defaults() {
        let image = mock_image(42, "x.jpg", 1250);
        assert_eq!(image.id, 42);
        assert_eq!(image.elo_rating, 1250);
        assert!(!image.hidden);
        assert_eq!(image.extra_count, 0);
    }
}
