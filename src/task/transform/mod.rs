//! File transformers.
//!
//! | Transform       | Purpose                                         |
//! |-----------------|-------------------------------------------------|
//! | `Passthrough`   | Copy unchanged                                  |
//! | `ExternalCommand` | Pipe through a configured external tool       |
//! | `Rename`        | Change extension / add a stem suffix            |
//! | `MinifyJs`      | oxc minification                                |
//! | `ProcessCss`    | lightningcss prefixing and minification         |
//! | `SpriteStack`   | Stack SVG icons into one sprite                 |
//! | `Recompress`    | Tinify image recompression                      |
//! | `FanOut`        | Feed every branch a copy of the same input      |
//! | `FailSoft`      | Log failures and drop the file instead          |

mod command;
mod minify;
mod rename;
mod sprite;
mod tinify;

pub use command::ExternalCommand;
pub use minify::{MinifyJs, ProcessCss};
pub use rename::Rename;
pub use sprite::SpriteStack;
pub use tinify::Recompress;

use std::path::Path;

use rayon::prelude::*;

use super::{Asset, FileError, TransformError};
use crate::core::BuildMode;

/// What a transform may know about the run.
#[derive(Debug, Clone, Copy)]
pub struct TransformEnv<'a> {
    pub task: &'static str,
    pub mode: BuildMode,
    /// Project root.
    pub root: &'a Path,
    /// Source root.
    pub source: &'a Path,
    /// Task output directory.
    pub output: &'a Path,
}

/// One step of a task chain.
pub trait Transform: Send + Sync {
    fn name(&self) -> &'static str;

    /// Transform one asset into zero or more assets.
    fn apply(&self, asset: Asset, env: &TransformEnv<'_>) -> Result<Vec<Asset>, TransformError>;

    /// Like `apply`, but may return output and failures together.
    fn apply_all(&self, asset: Asset, env: &TransformEnv<'_>) -> (Vec<Asset>, Vec<TransformError>) {
        match self.apply(asset, env) {
            Ok(assets) => (assets, Vec::new()),
            Err(e) => (Vec::new(), vec![e]),
        }
    }

    /// Called once with every asset that made it through `apply`.
    ///
    /// Collecting transforms (the sprite) buffer here.
    fn flush(&self, assets: Vec<Asset>, _env: &TransformEnv<'_>) -> Result<Vec<Asset>, FileError> {
        Ok(assets)
    }
}

/// Push `assets` through `chain`, step by step. Files within a step run in parallel.
pub fn run_chain(
    chain: &[Box<dyn Transform>],
    mut assets: Vec<Asset>,
    env: &TransformEnv<'_>,
) -> (Vec<Asset>, Vec<FileError>) {
    let mut errors = Vec::new();

    for step in chain {
        let results: Vec<_> = assets
            .into_par_iter()
            .map(|asset| {
                let origin = asset.origin.clone();
                let (out, failures) = step.apply_all(asset, env);
                let failures: Vec<_> = failures
                    .into_iter()
                    .map(|e| FileError::new(origin.clone(), e))
                    .collect();
                (out, failures)
            })
            .collect();

        assets = Vec::with_capacity(results.len());
        for (out, failures) in results {
            assets.extend(out);
            errors.extend(failures);
        }

        match step.flush(assets, env) {
            Ok(flushed) => assets = flushed,
            Err(e) => {
                errors.push(e);
                assets = Vec::new();
            }
        }
    }

    (assets, errors)
}

// ============================================================================
// Structural transforms
// ============================================================================

/// Copy unchanged.
pub struct Passthrough;

impl Transform for Passthrough {
    fn name(&self) -> &'static str {
        "copy"
    }

    fn apply(&self, asset: Asset, _env: &TransformEnv<'_>) -> Result<Vec<Asset>, TransformError> {
        Ok(vec![asset])
    }
}

/// Every branch gets its own copy of the input; outputs are concatenated.
///
/// All branches run to completion even when one of them fails.
pub struct FanOut {
    branches: Vec<Vec<Box<dyn Transform>>>,
}

impl FanOut {
    pub fn new(branches: Vec<Vec<Box<dyn Transform>>>) -> Self {
        Self { branches }
    }
}

impl Transform for FanOut {
    fn name(&self) -> &'static str {
        "fan-out"
    }

    fn apply(&self, asset: Asset, env: &TransformEnv<'_>) -> Result<Vec<Asset>, TransformError> {
        let (assets, mut errors) = self.apply_all(asset, env);
        if errors.is_empty() {
            Ok(assets)
        } else {
            Err(errors.swap_remove(0))
        }
    }

    fn apply_all(&self, asset: Asset, env: &TransformEnv<'_>) -> (Vec<Asset>, Vec<TransformError>) {
        let results: Vec<_> = self
            .branches
            .par_iter()
            .map(|branch| {
                let (assets, errors) = run_chain(branch, vec![asset.clone()], env);
                (assets, errors.into_iter().map(|e| e.error).collect::<Vec<_>>())
            })
            .collect();

        let mut assets = Vec::new();
        let mut errors = Vec::new();
        for (out, failures) in results {
            assets.extend(out);
            errors.extend(failures);
        }
        (assets, errors)
    }
}

/// Failures of the wrapped transform are logged and the file is dropped.
///
/// The task still completes as done; used for the bundler, whose errors
/// must not hold up the rest of the pipeline.
pub struct FailSoft {
    inner: Box<dyn Transform>,
}

impl FailSoft {
    pub fn new(inner: impl Transform + 'static) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }
}

impl Transform for FailSoft {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn apply(&self, asset: Asset, env: &TransformEnv<'_>) -> Result<Vec<Asset>, TransformError> {
        let origin = asset.origin.clone();
        match self.inner.apply(asset, env) {
            Ok(assets) => Ok(assets),
            Err(e) => {
                crate::log!("error"; "[{}] {} skipped: {}", env.task, origin, e);
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::PathBuf;

    pub(crate) fn env(root: &Path) -> TransformEnv<'_> {
        TransformEnv {
            task: "test",
            mode: BuildMode::DEVELOPMENT,
            root,
            source: root,
            output: root,
        }
    }

    /// Appends a marker to the contents and sets an extension.
    struct Tag(&'static str);

    impl Transform for Tag {
        fn name(&self) -> &'static str {
            "tag"
        }

        fn apply(&self, asset: Asset, _env: &TransformEnv<'_>) -> Result<Vec<Asset>, TransformError> {
            let mut contents = asset.contents.clone();
            contents.extend_from_slice(self.0.as_bytes());
            Ok(vec![asset.with_extension(self.0).with_contents(contents)])
        }
    }

    struct Fail;

    impl Transform for Fail {
        fn name(&self) -> &'static str {
            "fail"
        }

        fn apply(&self, _asset: Asset, _env: &TransformEnv<'_>) -> Result<Vec<Asset>, TransformError> {
            Err(TransformError::Invalid("nope".into()))
        }
    }

    fn font() -> Asset {
        Asset::new("a.ttf", "/src/fonts/a.ttf", b"ttf".to_vec())
    }

    #[test]
    fn test_chain_order() {
        let root = PathBuf::from("/site");
        let chain: Vec<Box<dyn Transform>> = vec![Box::new(Tag("x")), Box::new(Tag("y"))];
        let (assets, errors) = run_chain(&chain, vec![font()], &env(&root));

        assert!(errors.is_empty());
        assert_eq!(assets[0].contents, b"ttfxy");
        assert_eq!(assets[0].relative, PathBuf::from("a.y"));
    }

    #[test]
    fn test_fan_out_keeps_both_outputs() {
        let root = PathBuf::from("/site");
        let fan = FanOut::new(vec![vec![Box::new(Tag("woff"))], vec![Box::new(Tag("woff2"))]]);
        let chain: Vec<Box<dyn Transform>> = vec![Box::new(fan)];

        let (assets, errors) = run_chain(&chain, vec![font()], &env(&root));

        assert!(errors.is_empty());
        let names: Vec<_> = assets.iter().map(|a| a.relative.clone()).collect();
        assert_eq!(names, vec![PathBuf::from("a.woff"), PathBuf::from("a.woff2")]);
    }

    #[test]
    fn test_fan_out_settles_every_branch() {
        let root = PathBuf::from("/site");
        let fan = FanOut::new(vec![vec![Box::new(Fail)], vec![Box::new(Tag("woff2"))]]);
        let chain: Vec<Box<dyn Transform>> = vec![Box::new(fan)];

        let (assets, errors) = run_chain(&chain, vec![font()], &env(&root));

        assert_eq!(assets.len(), 1);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].file, "a.ttf");
    }

    #[test]
    fn test_fail_soft_drops_file() {
        let root = PathBuf::from("/site");
        let chain: Vec<Box<dyn Transform>> = vec![Box::new(FailSoft::new(Fail))];
        let (assets, errors) = run_chain(&chain, vec![font()], &env(&root));

        assert!(assets.is_empty());
        assert!(errors.is_empty());
    }
}
