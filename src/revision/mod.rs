//! Cache busting.
//!
//! ```text
//! dist/css/main.min.css ──▶ blake3 ──▶ dist/css/main.min.3f2a9c01be.css
//!                                        │
//!                     dist/rev.json ◀────┘  {"css/main.min.css": "css/main.min.3f2a9c01be.css"}
//!                          │
//! dist/index.html ◀── rewrite (longest key first)
//! ```
//!
//! Fingerprinting runs on a [`Staging`] copy of the output; the live tree
//! is replaced only after every rename and the manifest are written.

mod fingerprint;
mod manifest;
mod rewrite;
mod stage;

pub use fingerprint::{fingerprint, fingerprinted_name, is_fingerprinted};
pub use manifest::Manifest;
pub use rewrite::rewrite;
pub use stage::Staging;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use jwalk::{Parallelism, WalkDir};
use rayon::prelude::*;
use thiserror::Error;

use crate::config::SiteConfig;
use crate::utils::path::to_slash;
use crate::utils::plural_count;
use crate::{debug, log};

#[derive(Debug, Error)]
pub enum RevisionError {
    #[error("output directory `{}` does not exist, build first", .0.display())]
    NoOutput(PathBuf),

    /// The manifest is missing or unparsable; rewriting cannot proceed.
    #[error("failed to read manifest `{}`: {source}", path.display())]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl RevisionError {
    fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

/// Fingerprint, then rewrite the entry documents.
pub fn run(config: &SiteConfig) -> Result<(), RevisionError> {
    let manifest = fingerprint_output(config)?;
    let rewritten = rewrite_entries(config)?;
    debug!("cache"; "{} entries, {} rewritten", manifest.len(), plural_count(rewritten, "document"));
    Ok(())
}

/// Rename every selected asset to its fingerprinted name and persist the manifest.
pub fn fingerprint_output(config: &SiteConfig) -> Result<Manifest, RevisionError> {
    let started = Instant::now();
    let cache = &config.cache;
    let output = config.output_dir();
    if !output.is_dir() {
        return Err(RevisionError::NoOutput(output.to_path_buf()));
    }

    let staging = Staging::prepare(output).map_err(RevisionError::io(output))?;
    let root = staging.path();
    let manifest_name = Path::new(&cache.manifest);

    let previous = match Manifest::load(&root.join(manifest_name)) {
        Ok(previous) => previous,
        Err(RevisionError::ManifestRead { source, .. }) if is_not_found(&*source) => Manifest::new(),
        Err(e) => {
            log!("cache"; "ignoring previous manifest: {}", e);
            Manifest::new()
        }
    };

    let mut candidates: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(root).sort(true).parallelism(Parallelism::Serial) {
        let entry = entry.map_err(|e| RevisionError::Io {
            path: e.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf),
            source: io::Error::other(e.to_string()),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Ok(rel) = path.strip_prefix(root) else {
            continue;
        };
        let selected = rel
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| cache.selects(ext));
        if selected && rel != manifest_name {
            candidates.push(rel.to_path_buf());
        }
    }

    let renamed: Vec<(String, String)> = candidates
        .par_iter()
        .map(|rel| revise(root, rel, cache.hash_length))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .flatten()
        .collect();

    let mut manifest = Manifest::new();
    for (original, revved) in renamed {
        manifest.insert(original, revved);
    }
    let carried = carry_over(&previous, &mut manifest, root);

    staging
        .write(manifest_name, manifest.to_json().as_bytes())
        .map_err(RevisionError::io(root.join(manifest_name)))?;
    staging.commit().map_err(RevisionError::io(output))?;

    log!(
        "cache";
        "{} fingerprinted in {:.2?}{}",
        plural_count(manifest.len() - carried, "file"),
        started.elapsed(),
        if carried > 0 { format!(", {carried} kept from previous manifest") } else { String::new() }
    );
    Ok(manifest)
}

/// Rename one staged file; `None` when it already carries its own fingerprint.
fn revise(root: &Path, rel: &Path, hash_length: usize) -> Result<Option<(String, String)>, RevisionError> {
    let path = root.join(rel);
    let contents = fs::read(&path).map_err(RevisionError::io(&path))?;
    if is_fingerprinted(rel, &contents, hash_length) {
        return Ok(None);
    }

    let hash = fingerprint(&contents, hash_length);
    let revved = fingerprinted_name(rel, &hash);
    let target = root.join(&revved);
    if target.exists() {
        // same content, already fingerprinted by an earlier run
        fs::remove_file(&path).map_err(RevisionError::io(&path))?;
    } else {
        fs::rename(&path, &target).map_err(RevisionError::io(&path))?;
    }
    Ok(Some((to_slash(rel), to_slash(&revved))))
}

/// Keep earlier entries that still point at an existing file. Returns how many.
fn carry_over(previous: &Manifest, manifest: &mut Manifest, root: &Path) -> usize {
    let mut carried = 0;
    for (original, revved) in previous.iter() {
        if manifest.contains(original) || root.join(original).exists() || !root.join(revved).is_file() {
            continue;
        }
        manifest.insert(original.to_string(), revved.to_string());
        carried += 1;
    }
    carried
}

fn is_not_found(error: &(dyn std::error::Error + Send + Sync + 'static)) -> bool {
    error
        .downcast_ref::<io::Error>()
        .is_some_and(|e| e.kind() == io::ErrorKind::NotFound)
}

/// Substitute manifest keys in every configured entry document.
///
/// Returns the number of documents that changed.
pub fn rewrite_entries(config: &SiteConfig) -> Result<usize, RevisionError> {
    let output = config.output_dir();
    let manifest = Manifest::load(&output.join(&config.cache.manifest))?;

    let mut changed = 0;
    for entry in &config.cache.entries {
        let path = output.join(entry);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log!("cache"; "entry document {} not found, skipped", entry);
                continue;
            }
            Err(e) => return Err(RevisionError::io(&path)(e)),
        };

        let rewritten = rewrite(&text, &manifest);
        if rewritten != text {
            fs::write(&path, rewritten).map_err(RevisionError::io(&path))?;
            changed += 1;
            debug!("cache"; "rewrote {}", entry);
        }
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config_at;
    use crate::task::testing::write;
    use tempfile::TempDir;

    const INDEX: &str = r#"<link rel="stylesheet" href="css/main.min.css">
<img src="img/logo.png"><img src="img/missing.png">
<script src="js/main.min.js"></script>"#;

    fn site() -> (TempDir, SiteConfig) {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "dist/index.html", INDEX);
        write(dir.path(), "dist/css/main.min.css", "a{color:red}");
        write(dir.path(), "dist/js/main.min.js", "console.log(1)");
        write(dir.path(), "dist/img/logo.png", "png");
        write(dir.path(), "dist/resources/robots.txt", "User-agent: *");
        let config = test_config_at(dir.path(), "");
        (dir, config)
    }

    fn revved(rel: &str, contents: &str) -> String {
        to_slash(&fingerprinted_name(Path::new(rel), &fingerprint(contents.as_bytes(), 10)))
    }

    #[test]
    fn test_fingerprint_and_rewrite() {
        let (_dir, config) = site();
        let output = config.output_dir();

        run(&config).unwrap();

        let css = revved("css/main.min.css", "a{color:red}");
        let js = revved("js/main.min.js", "console.log(1)");
        assert!(output.join(&css).is_file());
        assert!(output.join(&js).is_file());
        assert!(!output.join("css/main.min.css").exists());
        assert!(!output.join("js/main.min.js").exists());
        // not a selected extension
        assert!(output.join("resources/robots.txt").is_file());

        let manifest = Manifest::load(&output.join("rev.json")).unwrap();
        assert_eq!(manifest.len(), 3);
        assert_eq!(manifest.get("css/main.min.css"), Some(css.as_str()));

        let index = fs::read_to_string(output.join("index.html")).unwrap();
        assert!(index.contains(&format!("href=\"{css}\"")));
        assert!(index.contains(&format!("src=\"{js}\"")));
        assert!(index.contains("img/missing.png"));

        // every manifest value referenced by the entry exists
        for (_, value) in manifest.iter() {
            assert!(output.join(value).is_file());
        }
    }

    #[test]
    fn test_second_run_keeps_manifest() {
        let (_dir, config) = site();
        let first = fingerprint_output(&config).unwrap();
        let second = fingerprint_output(&config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_rewrite_without_manifest_is_fatal() {
        let (_dir, config) = site();
        let err = rewrite_entries(&config).unwrap_err();
        assert!(matches!(err, RevisionError::ManifestRead { .. }));
    }

    #[test]
    fn test_missing_output() {
        let dir = TempDir::new().unwrap();
        let config = test_config_at(dir.path(), "");
        assert!(matches!(fingerprint_output(&config), Err(RevisionError::NoOutput(_))));
    }

    #[test]
    fn test_missing_manifest_is_not_found() {
        let dir = TempDir::new().unwrap();
        match Manifest::load(&dir.path().join("rev.json")) {
            Err(RevisionError::ManifestRead { source, .. }) => assert!(is_not_found(&*source)),
            other => panic!("expected a read error, got {other:?}"),
        }

        fs::write(dir.path().join("rev.json"), "not json").unwrap();
        match Manifest::load(&dir.path().join("rev.json")) {
            Err(RevisionError::ManifestRead { source, .. }) => assert!(!is_not_found(&*source)),
            other => panic!("expected a read error, got {other:?}"),
        }
    }
}
