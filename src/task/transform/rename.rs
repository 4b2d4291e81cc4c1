//! Output renaming.

use super::{Transform, TransformEnv};
use crate::task::{Asset, TransformError};

/// Change the extension and/or append a suffix to the stem.
#[derive(Debug, Clone, Default)]
pub struct Rename {
    extension: Option<String>,
    suffix: Option<String>,
}

impl Rename {
    /// `main.scss` → `main.<ext>`
    pub fn extension(ext: impl Into<String>) -> Self {
        Self {
            extension: Some(ext.into()),
            suffix: None,
        }
    }

    /// `main.css` → `main<suffix>.css`
    pub fn suffix(suffix: impl Into<String>) -> Self {
        Self {
            extension: None,
            suffix: Some(suffix.into()),
        }
    }
}

impl Transform for Rename {
    fn name(&self) -> &'static str {
        "rename"
    }

    fn apply(&self, mut asset: Asset, _env: &TransformEnv<'_>) -> Result<Vec<Asset>, TransformError> {
        if let Some(ext) = &self.extension {
            asset = asset.with_extension(ext);
        }
        if let Some(suffix) = &self.suffix {
            asset = asset.with_suffix(suffix);
        }
        Ok(vec![asset])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::transform::tests::env;
    use std::path::{Path, PathBuf};

    #[test]
    fn test_extension_then_suffix() {
        let asset = Asset::new("index.pug", "/src/index.pug", Vec::new());
        let root = Path::new("/");

        let out = Rename::extension("html").apply(asset, &env(root)).unwrap();
        assert_eq!(out[0].relative, PathBuf::from("index.html"));

        let out = Rename::suffix(".min").apply(out[0].clone(), &env(root)).unwrap();
        assert_eq!(out[0].relative, PathBuf::from("index.min.html"));
    }
}
