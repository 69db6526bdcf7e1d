//! Image record store.
//!
//! Uses SQLx with SQLite for lightweight, embedded storage. Every query is
//! generic over [`SqliteExecutor`], so callers choose the scope: pass the pool
//! for a one-off read, or `&mut *tx` to run inside the transaction of a single
//! logical operation.
//!
//! # Example
//!
//! ```ignore
//! use pic_curator::db::{init_db, get_image_by_path};
//!
//! let pool = init_db("sqlite:/pics/db.sqlite").await?;
//! let mut tx = pool.begin().await?;
//! let image = get_image_by_path(&mut *tx, "1_good/cat.jpg").await?;
//! tx.commit().await?;
//! ```

use chrono::{SecondsFormat, Utc};
use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqliteExecutor};

use crate::model::{Image, ImageRow, NewImage, Orientation, OrientationPreference};

const IMAGE_COLUMNS: &str = "id, path, width, height, orientation, content_hash, shown_times, \
     elo_rating, hidden, extra_count, created_at, updated_at";

/// Build a SQLite database URL from a file path.
pub fn db_url(path: &std::path::Path) -> String {
    format!("sqlite:{}", path.display())
}

/// Timestamp in the fixed-width format stored in `created_at`/`updated_at`.
///
/// Microsecond precision and a `Z` suffix keep the text sortable.
pub fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Initialize the database connection pool and run migrations.
///
/// Creates the database file if it doesn't exist, establishes a connection
/// pool with up to 5 connections, and runs all pending migrations.
///
/// # Errors
///
/// Returns an error if:
/// - Database creation fails
/// - Connection cannot be established
/// - Migration fails
pub async fn init_db(db_url: &str) -> Result<SqlitePool, sqlx::Error> {
    if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
        Sqlite::create_database(db_url).await?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

// ============================================================================
// Lookups
// ============================================================================

/// Get the record stored at a root-relative path.
pub async fn get_image_by_path<'e, E>(executor: E, path: &str) -> sqlx::Result<Option<Image>>
where
    E: SqliteExecutor<'e>,
{
    let row: Option<ImageRow> =
        sqlx::query_as(&format!("SELECT {IMAGE_COLUMNS} FROM images WHERE path = ?"))
            .bind(path)
            .fetch_optional(executor)
            .await?;
    Ok(row.map(Image::from))
}

/// Get a record by its database ID.
pub async fn get_image_by_id<'e, E>(executor: E, id: i64) -> sqlx::Result<Option<Image>>
where
    E: SqliteExecutor<'e>,
{
    let row: Option<ImageRow> =
        sqlx::query_as(&format!("SELECT {IMAGE_COLUMNS} FROM images WHERE id = ?"))
            .bind(id)
            .fetch_optional(executor)
            .await?;
    Ok(row.map(Image::from))
}

/// Load every record whose path is in `paths`, in one query.
///
/// Unknown paths are silently absent from the result.
pub async fn get_images_by_paths<'e, E>(executor: E, paths: &[String]) -> sqlx::Result<Vec<Image>>
where
    E: SqliteExecutor<'e>,
{
    if paths.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {IMAGE_COLUMNS} FROM images WHERE path IN ("));
    let mut separated = builder.separated(", ");
    for path in paths {
        separated.push_bind(path);
    }
    separated.push_unseparated(")");

    let rows: Vec<ImageRow> = builder.build_query_as().fetch_all(executor).await?;
    Ok(rows.into_iter().map(Image::from).collect())
}

/// All records sharing a content hash, oldest first.
pub async fn get_images_by_hash<'e, E>(executor: E, hash: &str) -> sqlx::Result<Vec<Image>>
where
    E: SqliteExecutor<'e>,
{
    let rows: Vec<ImageRow> = sqlx::query_as(&format!(
        "SELECT {IMAGE_COLUMNS} FROM images WHERE content_hash = ? ORDER BY id"
    ))
    .bind(hash)
    .fetch_all(executor)
    .await?;
    Ok(rows.into_iter().map(Image::from).collect())
}

/// All records whose path lies under the root-relative directory `dir`.
pub async fn get_in_dir<'e, E>(executor: E, dir: &str) -> sqlx::Result<Vec<Image>>
where
    E: SqliteExecutor<'e>,
{
    // substr comparison instead of LIKE: tier names contain `_` wildcards
    let prefix = format!("{}/", dir.trim_end_matches('/'));
    let rows: Vec<ImageRow> = sqlx::query_as(&format!(
        "SELECT {IMAGE_COLUMNS} FROM images WHERE substr(path, 1, length(?)) = ? ORDER BY path"
    ))
    .bind(&prefix)
    .bind(&prefix)
    .fetch_all(executor)
    .await?;
    Ok(rows.into_iter().map(Image::from).collect())
}

/// Which records [`list_images`] returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListFilter {
    #[default]
    All,
    Visible,
    Hidden,
}

/// Records ordered by rating (highest first).
pub async fn list_images<'e, E>(executor: E, filter: ListFilter) -> sqlx::Result<Vec<Image>>
where
    E: SqliteExecutor<'e>,
{
    let condition = match filter {
        ListFilter::All => "1 = 1",
        ListFilter::Visible => "hidden = 0",
        ListFilter::Hidden => "hidden = 1",
    };
    let rows: Vec<ImageRow> = sqlx::query_as(&format!(
        "SELECT {IMAGE_COLUMNS} FROM images WHERE {condition} ORDER BY elo_rating DESC, path"
    ))
    .fetch_all(executor)
    .await?;
    Ok(rows.into_iter().map(Image::from).collect())
}

/// Number of records not hidden.
pub async fn count_visible<'e, E>(executor: E) -> sqlx::Result<i64>
where
    E: SqliteExecutor<'e>,
{
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM images WHERE hidden = 0")
        .fetch_one(executor)
        .await?;
    Ok(count)
}

/// The `n` highest-rated visible records.
pub async fn get_top_n<'e, E>(executor: E, n: i64) -> sqlx::Result<Vec<Image>>
where
    E: SqliteExecutor<'e>,
{
    let rows: Vec<ImageRow> = sqlx::query_as(&format!(
        "SELECT {IMAGE_COLUMNS} FROM images WHERE hidden = 0 \
         ORDER BY elo_rating DESC, shown_times DESC, id ASC LIMIT ?"
    ))
    .bind(n)
    .fetch_all(executor)
    .await?;
    Ok(rows.into_iter().map(Image::from).collect())
}

/// The most recently updated hidden record.
pub async fn get_last_hidden<'e, E>(executor: E) -> sqlx::Result<Option<Image>>
where
    E: SqliteExecutor<'e>,
{
    let row: Option<ImageRow> = sqlx::query_as(&format!(
        "SELECT {IMAGE_COLUMNS} FROM images WHERE hidden = 1 \
         ORDER BY updated_at DESC, id DESC LIMIT 1"
    ))
    .fetch_optional(executor)
    .await?;
    Ok(row.map(Image::from))
}

// ============================================================================
// Selection queries
// ============================================================================

fn orientation_order(pref: OrientationPreference) -> &'static str {
    match pref {
        OrientationPreference::Off => "",
        OrientationPreference::Ascending => "orientation ASC, ",
        OrientationPreference::Descending => "orientation DESC, ",
    }
}

/// Visible record with the highest `extra_count` (> 0), ties broken by
/// fewest showings.
pub async fn get_priority_pivot<'e, E>(executor: E) -> sqlx::Result<Option<Image>>
where
    E: SqliteExecutor<'e>,
{
    let row: Option<ImageRow> = sqlx::query_as(&format!(
        "SELECT {IMAGE_COLUMNS} FROM images WHERE hidden = 0 AND extra_count > 0 \
         ORDER BY extra_count DESC, shown_times ASC, id ASC LIMIT 1"
    ))
    .fetch_optional(executor)
    .await?;
    Ok(row.map(Image::from))
}

/// Least-shown visible record without a boost, ties broken by highest
/// rating then the orientation preference.
pub async fn get_least_shown<'e, E>(
    executor: E,
    pref: OrientationPreference,
) -> sqlx::Result<Option<Image>>
where
    E: SqliteExecutor<'e>,
{
    let row: Option<ImageRow> = sqlx::query_as(&format!(
        "SELECT {IMAGE_COLUMNS} FROM images WHERE hidden = 0 AND extra_count = 0 \
         ORDER BY shown_times ASC, elo_rating DESC, {}id ASC LIMIT 1",
        orientation_order(pref)
    ))
    .fetch_optional(executor)
    .await?;
    Ok(row.map(Image::from))
}

/// Visible, unboosted records closest in rating to `pivot`.
///
/// Ordered by rating distance, then fewest showings, then highest rating.
/// The orientation preference only breaks ties left after those.
pub async fn get_neighbors<'e, E>(
    executor: E,
    pivot: &Image,
    pref: OrientationPreference,
    limit: u32,
) -> sqlx::Result<Vec<Image>>
where
    E: SqliteExecutor<'e>,
{
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT {IMAGE_COLUMNS} FROM images WHERE hidden = 0 AND extra_count = 0 AND id != "
    ));
    builder.push_bind(pivot.id);
    builder.push(" ORDER BY ABS(elo_rating - ");
    builder.push_bind(pivot.elo_rating);
    builder.push(") ASC, shown_times ASC, elo_rating DESC, ");
    builder.push(orientation_order(pref));
    builder.push("id ASC LIMIT ");
    builder.push_bind(i64::from(limit));

    let rows: Vec<ImageRow> = builder.build_query_as().fetch_all(executor).await?;
    Ok(rows.into_iter().map(Image::from).collect())
}

// ============================================================================
// Mutations
// ============================================================================

/// Insert a new record with default rating and counters.
pub async fn insert_image<'e, E>(executor: E, image: &NewImage) -> sqlx::Result<Image>
where
    E: SqliteExecutor<'e>,
{
    let ts = now();
    let row: ImageRow = sqlx::query_as(&format!(
        "INSERT INTO images (path, width, height, orientation, content_hash, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING {IMAGE_COLUMNS}"
    ))
    .bind(&image.path)
    .bind(i64::from(image.width))
    .bind(i64::from(image.height))
    .bind(image.orientation.as_str())
    .bind(&image.content_hash)
    .bind(&ts)
    .bind(&ts)
    .fetch_one(executor)
    .await?;
    Ok(row.into())
}

/// Backfill a missing content hash. A hash already present is never replaced.
pub async fn set_content_hash<'e, E>(executor: E, id: i64, hash: &str) -> sqlx::Result<bool>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE images SET content_hash = ?, updated_at = ? WHERE id = ? AND content_hash IS NULL",
    )
    .bind(hash)
    .bind(now())
    .bind(id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Point a record at a new root-relative path.
pub async fn update_path<'e, E>(executor: E, id: i64, new_path: &str) -> sqlx::Result<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query("UPDATE images SET path = ?, updated_at = ? WHERE id = ?")
        .bind(new_path)
        .bind(now())
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Set the hidden flag.
pub async fn set_hidden<'e, E>(executor: E, id: i64, hidden: bool) -> sqlx::Result<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query("UPDATE images SET hidden = ?, updated_at = ? WHERE id = ?")
        .bind(hidden)
        .bind(now())
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Set the extra_count boost.
pub async fn set_extra_count<'e, E>(executor: E, id: i64, extra_count: i64) -> sqlx::Result<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query("UPDATE images SET extra_count = ?, updated_at = ? WHERE id = ?")
        .bind(extra_count)
        .bind(now())
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Persist the counters and rating produced by one comparison round.
pub async fn save_round<'e, E>(executor: E, image: &Image) -> sqlx::Result<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        "UPDATE images SET shown_times = ?, extra_count = ?, elo_rating = ?, updated_at = ? \
         WHERE id = ?",
    )
    .bind(image.shown_times)
    .bind(image.extra_count)
    .bind(image.elo_rating)
    .bind(now())
    .bind(image.id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Helper used by tests and tooling to check counts quickly.
pub async fn count_images<'e, E>(executor: E) -> sqlx::Result<i64>
where
    E: SqliteExecutor<'e>,
{
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM images")
        .fetch_one(executor)
        .await?;
    Ok(count)
}

/// Orientation counts among visible records.
pub async fn count_visible_by_orientation<'e, E>(
    executor: E,
    orientation: Orientation,
) -> sqlx::Result<i64>
where
    E: SqliteExecutor<'e>,
{
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM images WHERE hidden = 0 AND orientation = ?")
            .bind(orientation.as_str())
            .fetch_one(executor)
            .await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{insert_mock_image, mock_new_image, temp_db};

    #[tokio::test]
    async fn test_init_db_creates_database() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let pool = init_db(&db_url(&db_path)).await.expect("Failed to init db");
        assert!(db_path.exists());
        assert_eq!(count_images(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_insert_uses_defaults() {
        let (pool, _dir) = temp_db().await;

        let image = insert_image(&pool, &mock_new_image("a.png")).await.unwrap();
        assert!(image.id > 0);
        assert_eq!(image.elo_rating, 1200);
        assert_eq!(image.shown_times, 0);
        assert_eq!(image.extra_count, 0);
        assert!(!image.hidden);

        let found = get_image_by_path(&pool, "a.png").await.unwrap().unwrap();
        assert_eq!(found, image);
    }

    #[tokio::test]
    async fn test_path_is_unique() {
        let (pool, _dir) = temp_db().await;

        insert_image(&pool, &mock_new_image("a.png")).await.unwrap();
        assert!(insert_image(&pool, &mock_new_image("a.png")).await.is_err());
    }

    #[tokio::test]
    async fn test_content_hash_is_never_replaced() {
        let (pool, _dir) = temp_db().await;
        let image = insert_image(
            &pool,
            &NewImage {
                content_hash: None,
                ..mock_new_image("a.png")
            },
        )
        .await
        .unwrap();

        assert!(set_content_hash(&pool, image.id, "first").await.unwrap());
        assert!(!set_content_hash(&pool, image.id, "second").await.unwrap());

        let image = get_image_by_id(&pool, image.id).await.unwrap().unwrap();
        assert_eq!(image.content_hash.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_get_images_by_paths() {
        let (pool, _dir) = temp_db().await;
        insert_mock_image(&pool, "a.png", 1200).await;
        insert_mock_image(&pool, "b.png", 1200).await;
        insert_mock_image(&pool, "c.png", 1200).await;

        let paths = vec!["a.png".to_string(), "c.png".to_string(), "zzz.png".to_string()];
        let mut found: Vec<String> = get_images_by_paths(&pool, &paths)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.path)
            .collect();
        found.sort();
        assert_eq!(found, vec!["a.png", "c.png"]);

        assert!(get_images_by_paths(&pool, &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_in_dir_is_literal_prefix() {
        let (pool, _dir) = temp_db().await;
        insert_mock_image(&pool, "0_picked/a.png", 1200).await;
        insert_mock_image(&pool, "0_picked/nested/b.png", 1200).await;
        insert_mock_image(&pool, "0Xpicked/c.png", 1200).await;
        insert_mock_image(&pool, "0_picked_old/d.png", 1200).await;

        let found: Vec<String> = get_in_dir(&pool, "0_picked")
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.path)
            .collect();
        assert_eq!(found, vec!["0_picked/a.png", "0_picked/nested/b.png"]);
    }

    #[tokio::test]
    async fn test_last_hidden_is_most_recent() {
        let (pool, _dir) = temp_db().await;
        let a = insert_mock_image(&pool, "a.png", 1200).await;
        let b = insert_mock_image(&pool, "b.png", 1200).await;

        assert!(get_last_hidden(&pool).await.unwrap().is_none());

        set_hidden(&pool, b, true).await.unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        set_hidden(&pool, a, true).await.unwrap();

        let last = get_last_hidden(&pool).await.unwrap().unwrap();
        assert_eq!(last.id, a);
    }

    #[tokio::test]
    async fn test_top_n_excludes_hidden() {
        let (pool, _dir) = temp_db().await;
        insert_mock_image(&pool, "a.png", 1300).await;
        let b = insert_mock_image(&pool, "b.png", 1400).await;
        insert_mock_image(&pool, "c.png", 1100).await;
        set_hidden(&pool, b, true).await.unwrap();

        let top: Vec<String> = get_top_n(&pool, 2)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.path)
            .collect();
        assert_eq!(top, vec!["a.png", "c.png"]);
        assert_eq!(count_visible(&pool).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_save_round_updates_counters() {
        let (pool, _dir) = temp_db().await;
        let id = insert_mock_image(&pool, "a.png", 1200).await;

        let mut image = get_image_by_id(&pool, id).await.unwrap().unwrap();
        image.shown_times = 4;
        image.extra_count = 1;
        image.elo_rating = 1234;
        save_round(&pool, &image).await.unwrap();

        let saved = get_image_by_id(&pool, id).await.unwrap().unwrap();
        assert_eq!(saved.shown_times, 4);
        assert_eq!(saved.extra_count, 1);
        assert_eq!(saved.elo_rating, 1234);
        assert!(saved.updated_at >= image.updated_at);
    }

    #[tokio::test]
    async fn test_neighbors_ordered_by_rating_distance() {
        let (pool, _dir) = temp_db().await;
        let pivot = insert_mock_image(&pool, "pivot.png", 1200).await;
        insert_mock_image(&pool, "far.png", 1400).await;
        insert_mock_image(&pool, "near.png", 1190).await;
        insert_mock_image(&pool, "mid.png", 1250).await;

        let pivot = get_image_by_id(&pool, pivot).await.unwrap().unwrap();
        let neighbors: Vec<String> = get_neighbors(&pool, &pivot, OrientationPreference::Off, 2)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.path)
            .collect();
        assert_eq!(neighbors, vec!["near.png", "mid.png"]);
    }
}
