//! Configuration section definitions.
//!
//! Each module corresponds to one or more sections in `gild.toml`:
//!
//! | Module     | TOML Section                                     | Purpose                         |
//! |------------|--------------------------------------------------|---------------------------------|
//! | `paths`    | `[paths]`                                        | Source and output roots         |
//! | `build`    | `[build]`                                        | Stage failure policy            |
//! | `tasks`    | `[layout]` `[styles]` `[scripts]` `[fonts]` `[resources]` | Per-task globs and commands |
//! | `images`   | `[images]`                                       | Image copy, sprite, recompress  |
//! | `cache`    | `[cache]`                                        | Fingerprinting and rewrite      |
//! | `serve`    | `[serve]`                                        | Preview server and live reload  |
//! | `deploy`   | `[deploy]`                                       | FTP endpoint                    |

mod build;
mod cache;
mod deploy;
mod images;
mod paths;
mod serve;
mod tasks;

pub use build::BuildConfig;
pub use cache::CacheConfig;
pub use deploy::DeployConfig;
pub use images::ImagesConfig;
pub use paths::PathsConfig;
pub use serve::ServeConfig;
pub use tasks::{
    BrowserTargets, FontsConfig, LayoutConfig, ResourcesConfig, ScriptsConfig, StylesConfig,
};

use super::{ConfigDiagnostics, FieldPath};

/// Report every pattern in `globs` that does not compile.
pub(crate) fn validate_globs(field: FieldPath, globs: &[String], diag: &mut ConfigDiagnostics) {
    for pattern in globs {
        if let Err(e) = globset::Glob::new(pattern) {
            diag.error(field, format!("invalid glob `{pattern}`: {e}"));
        }
    }
}

/// Report an empty command array.
pub(crate) fn validate_command(field: FieldPath, command: &[String], diag: &mut ConfigDiagnostics) {
    if command.first().is_none_or(|program| program.trim().is_empty()) {
        diag.error_with_hint(
            field,
            "command must not be empty",
            "e.g. command = [\"sass\", \"--stdin\"]",
        );
    }
}

/// Convert a string list literal into owned strings.
pub(crate) fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}
