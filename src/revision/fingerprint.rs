//! Content fingerprints and fingerprinted file names.

use std::path::{Path, PathBuf};

/// First `len` hex chars of the blake3 hash of `contents`.
pub fn fingerprint(contents: &[u8], len: usize) -> String {
    let hash = blake3::hash(contents);
    let mut hex = hex::encode(hash.as_bytes());
    hex.truncate(len);
    hex
}

/// Embed `hash` before the last extension: `js/main.min.js` → `js/main.min.<hash>.js`.
pub fn fingerprinted_name(relative: &Path, hash: &str) -> PathBuf {
    let name = relative
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let renamed = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}.{hash}.{ext}"),
        _ => format!("{name}.{hash}"),
    };
    relative.with_file_name(renamed)
}

/// Whether the name already carries the fingerprint of its own contents.
pub fn is_fingerprinted(relative: &Path, contents: &[u8], len: usize) -> bool {
    let Some(name) = relative.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let mut parts = name.rsplit('.');
    let (Some(last), Some(before)) = (parts.next(), parts.next()) else {
        return false;
    };
    // `name.<hash>.ext`, or `name.<hash>` for files without extension
    let expected = fingerprint(contents, len);
    before == expected || last == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_deterministic() {
        let a = fingerprint(b"body{}", 10);
        assert_eq!(a.len(), 10);
        assert_eq!(a, fingerprint(b"body{}", 10));
        assert_ne!(a, fingerprint(b"body{ }", 10));
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fingerprinted_name() {
        assert_eq!(
            fingerprinted_name(Path::new("js/main.min.js"), "abc"),
            PathBuf::from("js/main.min.abc.js")
        );
        assert_eq!(fingerprinted_name(Path::new("LICENSE"), "abc"), PathBuf::from("LICENSE.abc"));
        assert_eq!(fingerprinted_name(Path::new(".htaccess"), "abc"), PathBuf::from(".htaccess.abc"));
    }

    #[test]
    fn test_is_fingerprinted() {
        let contents = b"a{}";
        let hash = fingerprint(contents, 10);
        let name = fingerprinted_name(Path::new("css/a.css"), &hash);

        assert!(is_fingerprinted(&name, contents, 10));
        assert!(!is_fingerprinted(&name, b"changed", 10));
        assert!(!is_fingerprinted(Path::new("css/a.css"), contents, 10));
    }
}
