//! Glob selection of task inputs.
//!
//! Patterns are relative to the source root and use `/` separators.
//! A leading `!` excludes. Each include pattern has a base directory (its
//! literal prefix); selected files are made relative to that base, so
//! `scss/**/*.scss` turns `src/scss/pages/home.scss` into `pages/home.scss`.

use std::io;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use jwalk::{Parallelism, WalkDir};

use crate::utils::path::to_slash;

/// One include pattern with its base directory.
#[derive(Debug, Clone)]
struct Include {
    matcher: GlobMatcher,
    base: PathBuf,
}

/// A selected input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selected {
    /// Absolute path.
    pub path: PathBuf,
    /// Path relative to the matching pattern's base.
    pub relative: PathBuf,
}

/// Files picked by one walk, plus entries the walk could not read.
#[derive(Debug, Default)]
pub struct Selection {
    pub files: Vec<Selected>,
    pub errors: Vec<(PathBuf, io::Error)>,
}

/// Compiled include/exclude patterns.
#[derive(Debug, Clone)]
pub struct GlobSelector {
    includes: Vec<Include>,
    excludes: GlobSet,
}

impl GlobSelector {
    /// Compile patterns; `!pattern` entries exclude.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, globset::Error> {
        Self::with_excludes(patterns, &[])
    }

    /// Compile patterns plus exclusions that are not user-configurable.
    pub fn with_excludes<S: AsRef<str>>(
        patterns: &[S],
        excluded: &[&str],
    ) -> Result<Self, globset::Error> {
        let mut includes = Vec::new();
        let mut excludes = GlobSetBuilder::new();

        for pattern in patterns {
            let pattern = pattern.as_ref().trim();
            if let Some(negated) = pattern.strip_prefix('!') {
                excludes.add(build_glob(negated)?);
            } else if !pattern.is_empty() {
                includes.push(Include {
                    matcher: build_glob(pattern)?.compile_matcher(),
                    base: glob_base(pattern),
                });
            }
        }
        for pattern in excluded {
            excludes.add(build_glob(pattern)?);
        }

        Ok(Self {
            includes,
            excludes: excludes.build()?,
        })
    }

    /// Whether a source-relative path (`/` separated) is selected.
    pub fn matches(&self, relative: &str) -> bool {
        !self.excludes.is_match(relative)
            && self.includes.iter().any(|inc| inc.matcher.is_match(relative))
    }

    /// Walk `root` and return every selected file, sorted by path.
    ///
    /// The walk is serial: tasks already run on the rayon pool, and a
    /// parallel walk inside a busy pool yields nothing.
    pub fn select(&self, root: &Path) -> Selection {
        let mut selection = Selection::default();

        for dir in self.walk_roots(root) {
            for entry in WalkDir::new(&dir).sort(true).parallelism(Parallelism::Serial) {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        let path = e.path().map_or_else(|| dir.clone(), Path::to_path_buf);
                        selection.errors.push((path, io::Error::other(e.to_string())));
                        continue;
                    }
                };
                if !entry.file_type().is_file() {
                    continue;
                }
                let path = entry.path();
                let Ok(rel) = path.strip_prefix(root) else {
                    continue;
                };
                let rel = to_slash(rel);
                if self.excludes.is_match(&rel) {
                    continue;
                }
                if let Some(include) = self.includes.iter().find(|inc| inc.matcher.is_match(&rel))
                {
                    let relative = path
                        .strip_prefix(root.join(&include.base))
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|_| PathBuf::from(&rel));
                    selection.files.push(Selected { path, relative });
                }
            }
        }

        selection.files.sort_by(|a, b| a.path.cmp(&b.path));
        selection.files.dedup_by(|a, b| a.path == b.path);
        selection
    }

    /// Distinct base directories to walk, dropping ones nested in another.
    fn walk_roots(&self, root: &Path) -> Vec<PathBuf> {
        let mut bases: Vec<PathBuf> = self.includes.iter().map(|i| i.base.clone()).collect();
        bases.sort();
        bases.dedup();

        let mut roots: Vec<PathBuf> = Vec::new();
        for base in bases {
            if !roots.iter().any(|r| base.starts_with(r)) {
                roots.push(base);
            }
        }
        roots
            .into_iter()
            .map(|base| root.join(base))
            .filter(|dir| dir.is_dir())
            .collect()
    }
}

/// Literal directory prefix of a pattern (its "glob parent").
///
/// `scss/**/*.scss` → `scss`, `js/main.js` → `js`, `index.pug` → ``.
pub fn glob_base(pattern: &str) -> PathBuf {
    let parts: Vec<&str> = pattern.split('/').collect();
    let mut base = PathBuf::new();
    for (i, part) in parts.iter().enumerate() {
        let is_last = i + 1 == parts.len();
        if is_last || part.contains(['*', '?', '[', '{']) {
            break;
        }
        base.push(part);
    }
    base
}

fn build_glob(pattern: &str) -> Result<Glob, globset::Error> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .backslash_escape(true)
        .build()
}
