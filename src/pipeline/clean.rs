//! Output directory reset.

use std::fs;
use std::io::ErrorKind;

use anyhow::{Context, Result};

use crate::config::SiteConfig;
use crate::debug;

/// Remove the output directory and everything in it, then recreate it empty.
pub fn clean(config: &SiteConfig) -> Result<()> {
    let output = config.output_dir();
    match fs::remove_dir_all(output) {
        Ok(()) => debug!("clean"; "removed {}", config.root_relative(output).display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to clear output directory: {}", output.display()));
        }
    }
    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create output directory: {}", output.display()))
}
