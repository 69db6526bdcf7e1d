use futures::stream::Stream;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use walkdir::WalkDir;

/// Lowercase image extensions (without the dot) that the scanner accepts.
#[derive(Debug, Clone)]
pub struct ImageFilter {
    extensions: Arc<[String]>,
}

impl ImageFilter {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions: Vec<String> = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
            .collect();
        Self {
            extensions: extensions.into(),
        }
    }

    /// Case-insensitive extension match.
    pub fn is_image(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|s| s.to_str())
            .map(|ext| {
                let ext = ext.to_lowercase();
                self.extensions.iter().any(|e| *e == ext)
            })
            .unwrap_or(false)
    }
}

/// Scans the given root directory recursively for image files.
///
/// Returns a Stream of absolute PathBufs; unreadable directory entries are
/// skipped.
pub fn scan(root: PathBuf, filter: ImageFilter) -> impl Stream<Item = PathBuf> {
    let (tx, rx) = mpsc::channel(100);

    // Spawn a blocking task to perform the synchronous file system traversal
    tokio::task::spawn_blocking(move || {
        for entry in WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.file_type().is_file() && filter.is_image(entry.path()) {
                // If the receiver is dropped, blocking_send errors and we stop scanning.
                if tx.blocking_send(entry.into_path()).is_err() {
                    break;
                }
            }
        }
    });

    // Convert the mpsc Receiver into a Stream
    futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|path| (path, rx))
    })
}

/// Root-relative, `/`-separated form of `path`.
///
/// Returns `None` if `path` is outside `root` or not valid UTF-8.
pub fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Option<Vec<&str>> = rel.components().map(|c| c.as_os_str().to_str()).collect();
    let parts = parts?;
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::fs::File;
    use tempfile::tempdir;

    fn default_filter() -> ImageFilter {
        ImageFilter::new(["jpg", "jpeg", "png", "gif", "webp", "jpg_large"])
    }

    #[tokio::test]
    async fn test_scan_image_files() {
        let dir = tempdir().unwrap();
        let root = dir.path();

        File::create(root.join("cat.jpg")).unwrap();
        File::create(root.join("dog.png")).unwrap();
        File::create(root.join("notes.txt")).unwrap(); // Should be ignored
        File::create(root.join("db.sqlite")).unwrap(); // Should be ignored
        File::create(root.join("UPPERCASE.JPEG")).unwrap(); // Case-insensitive

        let subdir = root.join("1_good");
        std::fs::create_dir(&subdir).unwrap();
        File::create(subdir.join("bird.webp")).unwrap();
        File::create(subdir.join("tweet.jpg_large")).unwrap();
        File::create(subdir.join("ignore.doc")).unwrap();

        let paths: Vec<PathBuf> = scan(root.to_path_buf(), default_filter()).collect().await;
        assert_eq!(paths.len(), 5);

        let mut names: Vec<String> = paths
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(|s| s.to_string()))
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec!["UPPERCASE.JPEG", "bird.webp", "cat.jpg", "dog.png", "tweet.jpg_large"]
        );
    }

    #[tokio::test]
    async fn test_scan_empty_dir() {
        let dir = tempdir().unwrap();
        let paths: Vec<PathBuf> = scan(dir.path().to_path_buf(), default_filter())
            .collect()
            .await;
        assert!(paths.is_empty());
    }

    #[test]
    fn test_filter_accepts_dotted_extensions() {
        let filter = ImageFilter::new([".PNG"]);
        assert!(filter.is_image(Path::new("a.png")));
        assert!(!filter.is_image(Path::new("a")));
        assert!(!filter.is_image(Path::new("a.jpg")));
    }

    #[test]
    fn test_relative_path() {
        let root = Path::new("/pics");
        assert_eq!(
            relative_path(root, Path::new("/pics/1_good/a.jpg")),
            Some("1_good/a.jpg".to_string())
        );
        assert_eq!(relative_path(root, Path::new("/other/a.jpg")), None);
        assert_eq!(relative_path(root, Path::new("/pics")), None);
    }
}
