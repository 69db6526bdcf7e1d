//! The curation engine.
//!
//! [`Curator`] owns the store, the tier layout and the selection settings for
//! one managed root, and exposes every operation a front end needs. Each call
//! runs as its own transaction; nothing is held open between calls.
//!
//! # Usage
//!
//! ```ignore
//! let curator = Curator::open(config::load()).await?;
//! curator.ingest().await?;
//!
//! let round = curator.select_next(None).await?;
//! let (winner, losers) = round.split_last().unwrap();
//! let losers: Vec<String> = losers.iter().map(|i| i.path.clone()).collect();
//! curator.record_result(&winner.path, &losers).await?;
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::config::{Config, SettingsConfig};
use crate::db::{self, ListFilter};
use crate::error::{Error, Result, ResultExt};
use crate::library::{self, IngestEvent, IngestSummary};
use crate::model::{Image, Orientation, OrientationPreference, Settings};
use crate::ranking::{self, Elo};
use crate::scanner::ImageFilter;
use crate::selection;
use crate::tiers::{self, TierMachine, Top10Report};

/// Counts over the whole store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LibraryStats {
    pub total: usize,
    pub visible: usize,
    pub hidden: usize,
    pub landscape: i64,
    pub portrait: i64,
    /// Records per tier directory, keyed by directory name
    pub tiers: BTreeMap<String, usize>,
    /// Records outside every tier directory
    pub unsorted: usize,
}

/// Curation engine bound to one managed root.
pub struct Curator {
    pool: SqlitePool,
    config: Config,
    tiers: TierMachine,
    elo: Elo,
    filter: ImageFilter,
    settings: RwLock<Settings>,
}

impl Curator {
    /// Open the engine described by `config`.
    ///
    /// Creates the managed root and the database if needed and runs
    /// migrations.
    pub async fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let root = &config.library.root;
        std::fs::create_dir_all(root).map_err(|e| Error::filesystem(root, e))?;
        let root = root.canonicalize().map_err(|e| Error::filesystem(root, e))?;

        let db_path = config.library.database_path();
        let pool = db::init_db(&db::db_url(&db_path))
            .await
            .with_context(format!("opening database {}", db_path.display()))?;

        tracing::info!(root = %root.display(), db = %db_path.display(), "Curator ready");
        Self::with_pool(pool, root, config)
    }

    /// Build the engine on an existing pool, with `root` as the managed root.
    pub fn with_pool(pool: SqlitePool, root: PathBuf, config: Config) -> Result<Self> {
        let settings = config.settings.to_settings()?;
        let tiers = TierMachine::new(root, config.tiers.clone());
        let elo = Elo::new(config.curation.k_factor);
        let filter = ImageFilter::new(&config.curation.extensions);

        Ok(Self {
            pool,
            config,
            tiers,
            elo,
            filter,
            settings: RwLock::new(settings),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn root(&self) -> &Path {
        self.tiers.root()
    }

    /// Scan the managed root and reconcile it with the store.
    pub async fn ingest(&self) -> Result<IngestSummary> {
        self.ingest_with(|_| {}).await
    }

    /// Like [`ingest`](Self::ingest), reporting each file's outcome.
    pub async fn ingest_with<F>(&self, on_event: F) -> Result<IngestSummary>
    where
        F: FnMut(&IngestEvent),
    {
        library::ingest(
            &self.pool,
            &self.tiers,
            self.filter.clone(),
            self.config.curation.batch_size,
            on_event,
        )
        .await
    }

    /// Next comparison set: neighbors first, pivot last. Empty when nothing
    /// is eligible.
    pub async fn select_next(&self, count: Option<u32>) -> Result<Vec<Image>> {
        let settings = self.settings();
        let count = count.unwrap_or(self.config.curation.neighbors);
        selection::select_next(&self.pool, &settings, count).await
    }

    /// Record a comparison round. An unknown winner is a no-op.
    pub async fn record_result(&self, winner: &str, losers: &[String]) -> Result<Vec<Image>> {
        ranking::record_result(&self.pool, &self.tiers, &self.elo, winner, losers).await
    }

    /// Hide the record at `path`; `None` if it is not tracked.
    pub async fn hide(&self, path: &str) -> Result<Option<Image>> {
        tiers::hide(&self.pool, &self.tiers, path).await
    }

    /// Restore the most recently hidden record; `None` if nothing is hidden.
    pub async fn restore_last(&self) -> Result<Option<Image>> {
        tiers::restore_last(&self.pool, &self.tiers).await
    }

    pub async fn build_top10(&self) -> Result<Top10Report> {
        tiers::build_top10(&self.pool, &self.tiers, self.config.curation.top_min_candidates).await
    }

    /// Adjust the selection boost of `path` by `delta`, clamped at zero.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RecordNotFound`] if `path` is not tracked.
    pub async fn bump_extra_count(&self, path: &str, delta: i64) -> Result<Image> {
        let mut tx = self.pool.begin().await?;
        let mut image = db::get_image_by_path(&mut *tx, path)
            .await?
            .ok_or_else(|| Error::not_found(path))?;

        image.extra_count = image.extra_count.saturating_add(delta).max(0);
        db::set_extra_count(&mut *tx, image.id, image.extra_count).await?;
        tx.commit().await?;

        tracing::info!(path, extra_count = image.extra_count, "Updated boost");
        Ok(image)
    }

    /// Cycle the orientation preference (off, ascending, descending).
    pub fn toggle_orientation_preference(&self) -> OrientationPreference {
        let mut settings = self.settings.write();
        settings.same_orientation = settings.same_orientation.next();
        tracing::info!(preference = ?settings.same_orientation, "Orientation preference changed");
        settings.same_orientation
    }

    /// Flip a named toggle and return its new value.
    pub fn toggle_setting(&self, name: &str) -> bool {
        let value = self.settings.write().toggle(name);
        tracing::info!(name, value, "Toggled setting");
        value
    }

    /// Snapshot of the current settings.
    pub fn settings(&self) -> Settings {
        self.settings.read().clone()
    }

    /// The configuration with the current settings folded in, ready to save.
    pub fn config_snapshot(&self) -> Config {
        let mut config = self.config.clone();
        config.settings = SettingsConfig::from_settings(&self.settings.read());
        config
    }

    /// Records ordered by rating, highest first.
    pub async fn list(&self, filter: ListFilter) -> Result<Vec<Image>> {
        Ok(db::list_images(&self.pool, filter).await?)
    }

    pub async fn stats(&self) -> Result<LibraryStats> {
        let images = db::list_images(&self.pool, ListFilter::All).await?;
        let layout = self.tiers.layout();

        let mut stats = LibraryStats {
            total: images.len(),
            landscape: db::count_visible_by_orientation(&self.pool, Orientation::Landscape).await?,
            portrait: db::count_visible_by_orientation(&self.pool, Orientation::Portrait).await?,
            ..Default::default()
        };

        for image in &images {
            if image.hidden {
                stats.hidden += 1;
            } else {
                stats.visible += 1;
            }
            match layout.tier_of(&image.path) {
                Some(tier) => *stats.tiers.entry(layout.dir(tier).to_string()).or_default() += 1,
                None => stats.unsorted += 1,
            }
        }
        Ok(stats)
    }
}
