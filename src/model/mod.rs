//! Core data models for the curation engine.
//!
//! Defines the primary entity [`Image`] plus the small enums that describe it
//! ([`Orientation`], [`Tier`]) and the engine-scoped [`Settings`].
//!
//! # Database Schema
//!
//! [`Image`] maps to the `images` table. Rows are read through [`ImageRow`],
//! which keeps the raw SQLite representation (text orientation, integer
//! booleans, RFC 3339 timestamps) and converts into the typed model.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rating assigned to every newly ingested image.
pub const DEFAULT_RATING: i64 = 1200;

/// Image orientation, derived from raw pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Landscape,
    Portrait,
}

impl Orientation {
    /// `Landscape` iff width > height. Square images count as portrait.
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        if width > height {
            Self::Landscape
        } else {
            Self::Portrait
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Landscape => "landscape",
            Self::Portrait => "portrait",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "landscape" => Ok(Self::Landscape),
            "portrait" => Ok(Self::Portrait),
            other => Err(format!("unknown orientation: {other}")),
        }
    }
}

/// Directory-encoded classification band.
///
/// `Good`, `Lower` and `Bad` follow the rating; `Hidden` and `Restored`
/// follow explicit operator actions; `Top10` and `Other` are owned by the
/// top-10 rebuild only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Top10,
    Other,
    Good,
    Lower,
    Bad,
    Hidden,
    Restored,
}

impl Tier {
    pub const ALL: [Tier; 7] = [
        Tier::Top10,
        Tier::Other,
        Tier::Good,
        Tier::Lower,
        Tier::Bad,
        Tier::Hidden,
        Tier::Restored,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Top10 => "top10",
            Self::Other => "other",
            Self::Good => "good",
            Self::Lower => "lower",
            Self::Bad => "bad",
            Self::Hidden => "hidden",
            Self::Restored => "restored",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked image file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Image {
    /// Database ID (auto-generated)
    pub id: i64,
    /// Root-relative path, `/`-separated (unique)
    pub path: String,
    pub width: u32,
    pub height: u32,
    pub orientation: Orientation,
    /// Content digest; absent until first computed
    pub content_hash: Option<String>,
    /// Comparison rounds the image took part in
    pub shown_times: i64,
    pub elo_rating: i64,
    pub hidden: bool,
    /// Operator-set priority boost
    pub extra_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database row for the `images` table.
#[derive(Debug, sqlx::FromRow)]
pub struct ImageRow {
    pub id: i64,
    pub path: String,
    pub width: i64,
    pub height: i64,
    pub orientation: String,
    pub content_hash: Option<String>,
    pub shown_times: i64,
    pub elo_rating: i64,
    pub hidden: bool,
    pub extra_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ImageRow> for Image {
    fn from(row: ImageRow) -> Self {
        let width = u32::try_from(row.width).unwrap_or(0);
        let height = u32::try_from(row.height).unwrap_or(0);
        Image {
            id: row.id,
            path: row.path,
            width,
            height,
            orientation: row
                .orientation
                .parse()
                .unwrap_or_else(|_| Orientation::from_dimensions(width, height)),
            content_hash: row.content_hash,
            shown_times: row.shown_times,
            elo_rating: row.elo_rating,
            hidden: row.hidden,
            extra_count: row.extra_count,
            created_at: parse_timestamp(&row.created_at),
            updated_at: parse_timestamp(&row.updated_at),
        }
    }
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Attributes of a record about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImage {
    pub path: String,
    pub width: u32,
    pub height: u32,
    pub orientation: Orientation,
    pub content_hash: Option<String>,
}

/// Orientation grouping used by selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum OrientationPreference {
    #[default]
    Off,
    Ascending,
    Descending,
}

impl OrientationPreference {
    /// Cycle 0 -> 1 -> 2 -> 0.
    pub fn next(self) -> Self {
        match self {
            Self::Off => Self::Ascending,
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Off,
        }
    }
}

impl From<OrientationPreference> for u8 {
    fn from(pref: OrientationPreference) -> Self {
        match pref {
            OrientationPreference::Off => 0,
            OrientationPreference::Ascending => 1,
            OrientationPreference::Descending => 2,
        }
    }
}

impl TryFrom<u8> for OrientationPreference {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Off),
            1 => Ok(Self::Ascending),
            2 => Ok(Self::Descending),
            other => Err(format!("same_orientation must be 0, 1 or 2 (got {other})")),
        }
    }
}

/// Engine-scoped settings, mutated only by explicit commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub same_orientation: OrientationPreference,
    pub toggles: BTreeMap<String, bool>,
}

impl Settings {
    /// Flip a named toggle, creating it (as `true`) if unknown.
    /// Returns the new value.
    pub fn toggle(&mut self, name: &str) -> bool {
        let value = self.toggles.entry(name.to_string()).or_insert(false);
        *value = !*value;
        *value
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.toggles.get(name).copied().unwrap_or(false)
    }
}
