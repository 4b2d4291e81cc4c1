//! In-flight files.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::TransformError;
use crate::utils::path::to_slash;

/// One file moving through a transform chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Output path relative to the task's output directory.
    pub relative: PathBuf,
    /// File the asset was read from.
    pub source: PathBuf,
    /// Name used in error reports (source path relative to the source root).
    pub origin: String,
    pub contents: Vec<u8>,
}

impl Asset {
    pub fn new(relative: impl Into<PathBuf>, source: impl Into<PathBuf>, contents: Vec<u8>) -> Self {
        let relative = relative.into();
        Self {
            origin: to_slash(&relative),
            relative,
            source: source.into(),
            contents,
        }
    }

    /// Read `path`; `relative` is its path below the glob base.
    pub fn read(path: &Path, relative: &Path, source_root: &Path) -> io::Result<Self> {
        let contents = fs::read(path)?;
        let origin = to_slash(path.strip_prefix(source_root).unwrap_or(relative));
        Ok(Self {
            relative: relative.to_path_buf(),
            source: path.to_path_buf(),
            origin,
            contents,
        })
    }

    /// Last extension of the output name.
    pub fn extension(&self) -> Option<&str> {
        self.relative.extension().and_then(OsStr::to_str)
    }

    /// Replace the output extension: `main.scss` → `main.css`.
    pub fn with_extension(mut self, ext: &str) -> Self {
        self.relative.set_extension(ext);
        self
    }

    /// Append to the file stem: `main.css` + `.min` → `main.min.css`.
    pub fn with_suffix(mut self, suffix: &str) -> Self {
        let stem = self
            .relative
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = match self.extension() {
            Some(ext) => format!("{stem}{suffix}.{ext}"),
            None => format!("{stem}{suffix}"),
        };
        self.relative.set_file_name(name);
        self
    }

    pub fn with_contents(mut self, contents: Vec<u8>) -> Self {
        self.contents = contents;
        self
    }

    /// Contents as UTF-8 text.
    pub fn text(&self) -> Result<&str, TransformError> {
        std::str::from_utf8(&self.contents)
            .map_err(|e| TransformError::Invalid(format!("not valid UTF-8: {e}")))
    }

    /// Write into `dir`, creating parents. Returns the written path.
    pub fn write_to(&self, dir: &Path) -> io::Result<PathBuf> {
        let dest = dir.join(&self.relative);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&dest, &self.contents)?;
        Ok(dest)
    }
}
