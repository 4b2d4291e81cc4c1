//! Staging copy of the output tree.
//!
//! Fingerprinting works on a sibling copy built from hard links (copies
//! when linking fails). The copy replaces the live tree in [`Staging::commit`];
//! dropping it uncommitted discards it and leaves the output untouched.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use jwalk::{Parallelism, WalkDir};

use crate::debug;

pub struct Staging {
    live: PathBuf,
    staged: PathBuf,
    committed: bool,
}

impl Staging {
    /// Mirror `output` into a fresh sibling directory.
    pub fn prepare(output: &Path) -> io::Result<Self> {
        let staged = sibling(output, "stage");
        remove_if_exists(&staged)?;
        fs::create_dir_all(&staged)?;

        let staging = Self {
            live: output.to_path_buf(),
            staged,
            committed: false,
        };

        let walk = WalkDir::new(output)
            .sort(true)
            .skip_hidden(false)
            .parallelism(Parallelism::Serial);
        for entry in walk {
            let entry = entry.map_err(|e| io::Error::other(e.to_string()))?;
            let path = entry.path();
            let Ok(relative) = path.strip_prefix(output) else {
                continue;
            };
            if relative.as_os_str().is_empty() {
                continue;
            }
            let target = staging.staged.join(relative);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)?;
            } else if fs::hard_link(&path, &target).is_err() {
                fs::copy(&path, &target)?;
            }
        }
        Ok(staging)
    }

    /// Root of the staged tree.
    pub fn path(&self) -> &Path {
        &self.staged
    }

    /// Write a file in the staged tree without touching a linked live copy.
    pub fn write(&self, relative: &Path, contents: &[u8]) -> io::Result<PathBuf> {
        let path = self.staged.join(relative);
        // a hard link shares its inode with the live file
        match fs::remove_file(&path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
            _ => {}
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Swap the staged tree into place of the live one.
    pub fn commit(mut self) -> io::Result<()> {
        let backup = sibling(&self.live, "old");
        remove_if_exists(&backup)?;

        fs::rename(&self.live, &backup)?;
        if let Err(e) = fs::rename(&self.staged, &self.live) {
            fs::rename(&backup, &self.live)?;
            return Err(e);
        }
        self.committed = true;
        remove_if_exists(&backup)
    }
}

impl Drop for Staging {
    fn drop(&mut self) {
        if !self.committed && let Err(e) = remove_if_exists(&self.staged) {
            debug!("cache"; "failed to remove {}: {}", self.staged.display(), e);
        }
    }
}

/// `/site/dist` → `/site/.dist.gild-<suffix>`
fn sibling(dir: &Path, suffix: &str) -> PathBuf {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".into());
    dir.with_file_name(format!(".{name}.gild-{suffix}"))
}

fn remove_if_exists(dir: &Path) -> io::Result<()> {
    match fs::remove_dir_all(dir) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
