//! Watch targets and the registry that matches event paths to them.
//!
//! Built once at startup from the command-line path list. The only field
//! that changes afterward is each file target's entropy baseline, and only
//! the monitor loop touches it.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::detector::entropy;

/// A single file or directory registered for monitoring.
#[derive(Debug)]
pub struct WatchTarget {
    /// Directory actually marked with fanotify. For a file input this is
    /// the file's parent directory.
    pub watch_path: PathBuf,
    /// The specific file of interest inside `watch_path`, or `None` when
    /// the input was a directory and everything under it is of interest.
    pub target_path: Option<PathBuf>,
    /// Whether the user-supplied input was a directory.
    pub is_dir: bool,
    /// Last successfully computed entropy in bits/byte. `None` until a
    /// computation succeeds; directory targets stay `None` forever.
    pub last_entropy: Option<f64>,
}

/// Ordered collection of watch targets.
#[derive(Debug, Default)]
pub struct WatchRegistry {
    targets: Vec<WatchTarget>,
}

/// Make a path absolute. Canonicalize when it exists, since event paths
/// resolved through /proc/self/fd come back canonical; otherwise fall back
/// to prefixing the current directory.
pub fn normalize(path: &Path) -> PathBuf {
    match std::fs::canonicalize(path) {
        Ok(p) => p,
        Err(_) => std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf()),
    }
}

impl WatchTarget {
    fn from_input(input: &Path) -> Self {
        let path = normalize(input);

        let is_dir = match std::fs::metadata(&path) {
            Ok(meta) => meta.is_dir(),
            Err(e) => {
                // Failure to stat does not abort; compose the watch paths
                // best-effort and treat the input as a file.
                warn!("stat('{}') failed: {}", path.display(), e);
                false
            }
        };

        if is_dir {
            return Self {
                watch_path: path,
                target_path: None,
                is_dir: true,
                last_entropy: None,
            };
        }

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = path.file_name().map(PathBuf::from).unwrap_or_default();
        let target = parent.join(file_name);

        // Prime the baseline now so the first event has something to diff
        // against. A file that cannot be read yet simply starts unknown.
        let last_entropy = entropy::calculate_file(&target).ok();

        Self {
            watch_path: parent,
            target_path: Some(target),
            is_dir: false,
            last_entropy,
        }
    }
}

impl WatchRegistry {
    /// Build the registry from the user-supplied path list.
    pub fn from_paths<P: AsRef<Path>>(paths: &[P]) -> Self {
        let targets = paths
            .iter()
            .map(|p| WatchTarget::from_input(p.as_ref()))
            .collect();
        Self { targets }
    }

    pub fn targets(&self) -> &[WatchTarget] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Every target whose `watch_path` is a prefix of `path`.
    ///
    /// This is a literal byte-prefix test, not a component-aware one, so a
    /// watched `/data` also claims events under `/data-archive`. Kept as
    /// documented behavior; file targets are narrowed further by the exact
    /// target-path comparison in the detector.
    pub fn matches_mut<'a>(
        &'a mut self,
        path: &Path,
    ) -> impl Iterator<Item = &'a mut WatchTarget> + 'a {
        let key = path.as_os_str().as_encoded_bytes().to_vec();
        self.targets
            .iter_mut()
            .filter(move |t| key.starts_with(t.watch_path.as_os_str().as_encoded_bytes()))
    }
}
