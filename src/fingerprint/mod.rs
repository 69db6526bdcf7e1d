//! Image fingerprinting: dimensions, orientation and content hash.
//!
//! Dimensions come from the image header (no full decode), the hash is a
//! SHA-256 digest of the full file bytes. Two files with identical bytes
//! always produce the same hash regardless of name or location.

use image::ImageReader;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::Orientation;

const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Everything ingestion needs to know about a file's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub width: u32,
    pub height: u32,
    pub orientation: Orientation,
    pub content_hash: String,
}

/// Fingerprint an image file.
///
/// # Errors
///
/// Returns [`Error::UnreadableImage`] when the file cannot be opened, is not a
/// recognised image format, or reports zero-sized dimensions.
pub fn fingerprint(path: &Path) -> Result<Fingerprint> {
    let (width, height) = read_dimensions(path)?;

    if width == 0 || height == 0 {
        return Err(Error::unreadable(
            path,
            format!("invalid dimensions {width}x{height}"),
        ));
    }

    let content_hash =
        compute_content_hash(path).map_err(|e| Error::unreadable(path, e.to_string()))?;

    Ok(Fingerprint {
        width,
        height,
        orientation: Orientation::from_dimensions(width, height),
        content_hash,
    })
}

/// Read dimensions from the image header.
///
/// The format is sniffed from the leading bytes so that odd extensions such as
/// `.jpg_large` still resolve.
fn read_dimensions(path: &Path) -> Result<(u32, u32)> {
    let reader = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| Error::unreadable(path, e.to_string()))?;
    reader
        .into_dimensions()
        .map_err(|e| Error::unreadable(path, e.to_string()))
}

/// Compute the SHA-256 digest of an entire file.
///
/// # Returns
///
/// Lowercase hex string (64 characters).
pub fn compute_content_hash(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; READ_CHUNK_SIZE];

    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
