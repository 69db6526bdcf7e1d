//! Collision-safe file relocation.
//!
//! Every tier transition goes through [`move_into`]: the file keeps its name
//! when possible, otherwise it gets the first free numeric suffix
//! (`name.1.ext`, `name.2.ext`, ...). An existing file is never overwritten.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Candidate file names for `file_name`: bare name first, then `.1`, `.2`, ...
/// inserted before the extension.
fn candidate_names(file_name: &Path) -> impl Iterator<Item = OsString> + '_ {
    let stem = file_name
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_default();
    let ext = file_name.extension().map(|e| e.to_os_string());

    (0u64..).map(move |n| {
        let mut name = stem.clone();
        if n > 0 {
            name.push(format!(".{n}"));
        }
        if let Some(ext) = &ext {
            name.push(".");
            name.push(ext);
        }
        name
    })
}

/// First path in `dst_dir` that does not exist yet for `file_name`.
pub fn free_destination(dst_dir: &Path, file_name: &Path) -> PathBuf {
    candidate_names(file_name)
        .map(|name| dst_dir.join(name))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| dst_dir.join(file_name))
}

/// Move `src` into `dst_dir` without overwriting anything.
///
/// Creates `dst_dir` if needed. If `src` already lives in `dst_dir` it is
/// returned unchanged.
///
/// # Errors
///
/// Returns [`Error::Filesystem`] if the directory cannot be created or the
/// rename fails (permissions, cross-device, ...). Nothing is retried.
pub fn move_into(src: &Path, dst_dir: &Path) -> Result<PathBuf> {
    if src.parent() == Some(dst_dir) {
        tracing::debug!(target: "mover", src = %src.display(), "Already in destination, not moving");
        return Ok(src.to_path_buf());
    }

    let file_name = src
        .file_name()
        .ok_or_else(|| {
            Error::filesystem(
                src,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
            )
        })?;

    fs::create_dir_all(dst_dir).map_err(|e| Error::filesystem(dst_dir, e))?;

    let dst = free_destination(dst_dir, Path::new(file_name));
    tracing::debug!(target: "mover", src = %src.display(), dst = %dst.display(), "Moving");
    fs::rename(src, &dst).map_err(|e| Error::filesystem(src, e))?;

    Ok(dst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_candidate_names() {
        let names: Vec<OsString> = candidate_names(Path::new("cat.jpg")).take(3).collect();
        assert_eq!(names, vec!["cat.jpg", "cat.1.jpg", "cat.2.jpg"]);

        let names: Vec<OsString> = candidate_names(Path::new("README")).take(2).collect();
        assert_eq!(names, vec!["README", "README.1"]);

        let names: Vec<OsString> = candidate_names(Path::new("a.b.png")).take(2).collect();
        assert_eq!(names, vec!["a.b.png", "a.b.1.png"]);
    }

    #[test]
    fn test_move_into_moves_file() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("cat.jpg");
        std::fs::write(&src, b"meow").unwrap();

        let dst_dir = temp.path().join("1_good");
        let dst = move_into(&src, &dst_dir).unwrap();

        assert_eq!(dst, dst_dir.join("cat.jpg"));
        assert!(!src.exists());
        assert_eq!(std::fs::read(&dst).unwrap(), b"meow");
    }

    #[test]
    fn test_move_into_same_dir_is_noop() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("cat.jpg");
        std::fs::write(&src, b"meow").unwrap();

        let dst = move_into(&src, temp.path()).unwrap();
        assert_eq!(dst, src);
        assert!(src.exists());
    }

    #[test]
    fn test_move_into_never_overwrites() {
        let temp = tempdir().unwrap();
        let dst_dir = temp.path().join("2_lower");
        std::fs::create_dir_all(&dst_dir).unwrap();
        std::fs::write(dst_dir.join("cat.jpg"), b"resident").unwrap();

        let a = temp.path().join("a").join("cat.jpg");
        let b = temp.path().join("b").join("cat.jpg");
        for (p, body) in [(&a, b"first"), (&b, b"other")] {
            std::fs::create_dir_all(p.parent().unwrap()).unwrap();
            std::fs::write(p, body).unwrap();
        }

        let moved_a = move_into(&a, &dst_dir).unwrap();
        let moved_b = move_into(&b, &dst_dir).unwrap();

        assert_eq!(moved_a, dst_dir.join("cat.1.jpg"));
        assert_eq!(moved_b, dst_dir.join("cat.2.jpg"));
        assert_eq!(std::fs::read(dst_dir.join("cat.jpg")).unwrap(), b"resident");
        assert_eq!(std::fs::read(&moved_a).unwrap(), b"first");
        assert_eq!(std::fs::read(&moved_b).unwrap(), b"other");
    }

    #[test]
    fn test_move_missing_source_is_filesystem_error() {
        let temp = tempdir().unwrap();
        let err = move_into(&temp.path().join("gone.jpg"), &temp.path().join("x")).unwrap_err();
        assert!(matches!(err, Error::Filesystem { .. }));
    }
}

/// Property-based tests using proptest
#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn stem() -> impl Strategy<Value = String> {
        prop::string::string_regex("[a-zA-Z0-9_-]{1,20}").unwrap()
    }

    proptest! {
        /// The chosen destination never collides with an existing file and
        /// uses the first free suffix.
        #[test]
        fn free_destination_skips_taken_names(
            stem in stem(),
            ext in prop::sample::select(vec!["jpg", "png", "webp"]),
            taken in 0usize..6,
        ) {
            let temp = tempfile::tempdir().unwrap();
            let file_name = format!("{stem}.{ext}");
            let existing: Vec<OsString> =
                candidate_names(Path::new(&file_name)).take(taken).collect();
            for name in &existing {
                std::fs::write(temp.path().join(name), b"x").unwrap();
            }

            let dst = free_destination(temp.path(), Path::new(&file_name));
            prop_assert!(!dst.exists());

            let expected = if taken == 0 {
                file_name.clone()
            } else {
                format!("{stem}.{taken}.{ext}")
            };
            prop_assert_eq!(dst.file_name().unwrap().to_str().unwrap(), expected.as_str());
        }

        /// Suffixing preserves the extension.
        #[test]
        fn candidates_keep_extension(
            stem in stem(),
            ext in prop::sample::select(vec!["jpg", "jpeg", "gif", "jpg_large"]),
            n in 0usize..20,
        ) {
            let file_name = format!("{stem}.{ext}");
            let candidate = candidate_names(Path::new(&file_name)).nth(n).unwrap();
            let candidate = PathBuf::from(candidate);
            prop_assert_eq!(candidate.extension().and_then(|e| e.to_str()), Some(ext));
        }
    }
}
