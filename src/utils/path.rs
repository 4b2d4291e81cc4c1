//! Path normalization utilities.

use std::path::{Component, Path, PathBuf};

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first (resolves symlinks, `.`, `..`).
/// Falls back to joining with the current directory.
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// Render a relative path with `/` separators on every platform.
///
/// Manifest keys and glob matching both use this form.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_slash() {
        let path: PathBuf = ["css", "main.min.css"].iter().collect();
        assert_eq!(to_slash(&path), "css/main.min.css");
        assert_eq!(to_slash(Path::new("./img/a.png")), "img/a.png");
    }

    #[test]
    fn test_normalize_relative() {
        let path = normalize_path(Path::new("does/not/exist"));
        assert!(path.is_absolute());
        assert!(path.ends_with("does/not/exist"));
    }
}
