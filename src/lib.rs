//! Pic Curator - curate an image collection into ranked tiers.
//!
//! Images under a managed root are ingested into a SQLite store, compared in
//! small rounds chosen by rating proximity, rated with ELO, and physically
//! moved between tier directories as their rating changes.
//!
//! The entry point is [`engine::Curator`]; the other modules are the pieces
//! it is built from.

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod library;
pub mod model;
pub mod mover;
pub mod ranking;
pub mod scanner;
pub mod selection;
#[cfg(test)]
pub mod test_utils;
pub mod tiers;
