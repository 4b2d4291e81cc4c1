//! External command transform.
//!
//! Runs a configured tool on each asset. Arguments may reference:
//!
//! | Variable           | Value                                          |
//! |--------------------|------------------------------------------------|
//! | `$GILD_INPUT`      | Path of the input file                         |
//! | `$GILD_INPUT_DIR`  | Directory of the original source file          |
//! | `$GILD_OUTPUT`     | Scratch path the tool should write to          |
//! | `$GILD_OUTPUT_DIR` | Final output directory of the file             |
//! | `$GILD_ROOT`       | Project root                                   |
//! | `$GILD_MODE`       | `development` or `production`                  |
//!
//! Without `$GILD_INPUT` the asset is piped to stdin; without
//! `$GILD_OUTPUT` the result is read from stdout. The variables are also
//! exported to the child's environment.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use rustc_hash::FxHashMap;

use super::{Transform, TransformEnv};
use crate::task::{Asset, TransformError};
use crate::utils::exec::Cmd;

/// Run an external tool over each asset.
pub struct ExternalCommand {
    label: &'static str,
    argv: Vec<String>,
    extension: Option<String>,
}

impl ExternalCommand {
    /// `command` plus mode-specific `extra` arguments.
    pub fn new(label: &'static str, command: &[String], extra: &[String]) -> Self {
        Self {
            label,
            argv: command.iter().chain(extra).cloned().collect(),
            extension: None,
        }
    }

    /// Extension of the tool's output (`scss` in, `css` out).
    pub fn output_extension(mut self, ext: impl Into<String>) -> Self {
        self.extension = Some(ext.into());
        self
    }

    fn uses(&self, var: &'static str) -> bool {
        self.argv.iter().any(|arg| mentions(arg, var))
    }
}

impl Transform for ExternalCommand {
    fn name(&self) -> &'static str {
        self.label
    }

    fn apply(&self, asset: Asset, env: &TransformEnv<'_>) -> Result<Vec<Asset>, TransformError> {
        let scratch = tempfile::Builder::new().prefix("gild-").tempdir()?;
        let asset = match &self.extension {
            Some(ext) => asset.with_extension(ext),
            None => asset,
        };
        let file_name = asset
            .relative
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("output"));

        let input = if self.uses("GILD_INPUT") {
            Some(input_path(&asset, scratch.path())?)
        } else {
            None
        };
        let output = self
            .uses("GILD_OUTPUT")
            .then(|| scratch.path().join("out").join(&file_name));
        if let Some(output) = &output
            && let Some(parent) = output.parent()
        {
            fs::create_dir_all(parent)?;
        }

        let output_dir = env
            .output
            .join(asset.relative.parent().unwrap_or(Path::new("")));
        let vars = build_vars(env, &asset, input.as_deref(), output.as_deref(), &output_dir);
        let argv = resolve_args(&self.argv, &vars);

        let mut cmd = Cmd::from_slice(&argv).cwd(env.root).envs(&vars);
        if input.is_none() {
            cmd = cmd.stdin(&asset.contents);
        }
        let result = cmd.run().map_err(TransformError::Command)?;

        let contents = match &output {
            Some(path) => fs::read(path).map_err(|e| {
                TransformError::Invalid(format!(
                    "`{}` did not write $GILD_OUTPUT: {e}",
                    argv.first().map(String::as_str).unwrap_or_default()
                ))
            })?,
            None => result.stdout,
        };

        Ok(vec![asset.with_contents(contents)])
    }
}

/// Path handed to the tool as `$GILD_INPUT`.
///
/// The original file is used while its contents are untouched, so tools
/// that resolve imports relative to it (bundlers) keep working.
fn input_path(asset: &Asset, scratch: &Path) -> std::io::Result<PathBuf> {
    let pristine = fs::read(&asset.source)
        .map(|on_disk| on_disk == asset.contents)
        .unwrap_or(false);
    if pristine {
        return Ok(asset.source.clone());
    }

    let name = asset
        .source
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("input"));
    let path = scratch.join("in").join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, &asset.contents)?;
    Ok(path)
}

/// Build the `$GILD_*` variables for one invocation.
fn build_vars(
    env: &TransformEnv<'_>,
    asset: &Asset,
    input: Option<&Path>,
    output: Option<&Path>,
    output_dir: &Path,
) -> FxHashMap<String, String> {
    let mut vars = FxHashMap::default();
    let input_dir = asset.source.parent().unwrap_or(env.source);

    vars.insert("GILD_ROOT".into(), env.root.display().to_string());
    vars.insert("GILD_MODE".into(), env.mode.name.into());
    vars.insert("GILD_INPUT_DIR".into(), input_dir.display().to_string());
    vars.insert("GILD_OUTPUT_DIR".into(), output_dir.display().to_string());
    if let Some(input) = input {
        vars.insert("GILD_INPUT".into(), input.display().to_string());
    }
    if let Some(output) = output {
        vars.insert("GILD_OUTPUT".into(), output.display().to_string());
    }
    vars
}

/// Replace `$GILD_*` references in each argument.
///
/// Longer names go first so `$GILD_INPUT_DIR` is not read as `$GILD_INPUT` + `_DIR`.
pub fn resolve_args(args: &[String], vars: &FxHashMap<String, String>) -> Vec<String> {
    let mut keys: Vec<_> = vars.keys().collect();
    keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    args.iter()
        .map(|arg| {
            let mut result = arg.clone();
            for key in &keys {
                result = result.replace(&format!("${key}"), &vars[key.as_str()]);
            }
            result
        })
        .collect()
}

/// Whether `arg` references exactly `$var` (not a longer name sharing its prefix).
fn mentions(arg: &str, var: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\$(GILD_[A-Z_]+)").unwrap());
    re.captures_iter(arg).any(|c| &c[1] == var)
}
