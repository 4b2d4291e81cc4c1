//! URL to filesystem path resolution.

use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;

/// Resolve a request URL under the output root; directories map to their `index.html`.
pub fn resolve_path(url: &str, serve_root: &Path) -> Option<PathBuf> {
    let clean = normalize_url(url);

    // Reject paths with suspicious patterns early
    if clean.split('/').any(|segment| segment == "..") {
        return None;
    }

    let canonical = serve_root.join(&clean).canonicalize().ok()?;
    let root_canonical = serve_root.canonicalize().ok()?;

    // symlinks may still point outside
    if !canonical.starts_with(&root_canonical) {
        return None;
    }

    if canonical.is_file() {
        return Some(canonical);
    }

    let index = canonical.join("index.html");
    index.is_file().then_some(index)
}

/// Decode, strip query string and fragment, trim slashes.
pub fn normalize_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let decoded = percent_decode_str(path)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_default();
    decoded.trim_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::testing::write;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("/css/main.min.css?gild=123"), "css/main.min.css");
        assert_eq!(normalize_url("/img/my%20photo.png"), "img/my photo.png");
        assert_eq!(normalize_url("/"), "");
    }

    #[test]
    fn test_resolve_files_and_index() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "dist/index.html", "<html>");
        write(dir.path(), "dist/css/a.css", "a{}");
        let root = dir.path().join("dist");

        assert!(resolve_path("/", &root).unwrap().ends_with("index.html"));
        assert!(resolve_path("/css/a.css?x=1", &root).unwrap().ends_with("css/a.css"));
        assert!(resolve_path("/css/", &root).is_none());
        assert!(resolve_path("/missing.js", &root).is_none());
    }

    #[test]
    fn test_reject_traversal() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "secret.txt", "no");
        write(dir.path(), "dist/index.html", "<html>");
        let root = dir.path().join("dist");

        assert!(resolve_path("/../secret.txt", &root).is_none());
        assert!(resolve_path("/%2e%2e/secret.txt", &root).is_none());
    }
}
