//! Built-in JS and CSS passes.
//!
//! Uses oxc for JavaScript and lightningcss for CSS. Strength follows
//! `BuildMode::minify`: light keeps output readable, aggressive goes for
//! the smallest result.
//!
//! When the mode keeps source maps, an inline map left by the external
//! tool is composed with the pass's own map and written back inline, so
//! devtools still resolve to the original sources.

use std::path::PathBuf;

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;
use parcel_sourcemap::{SourceMap, SourceMapError};

use super::{Transform, TransformEnv};
use crate::config::BrowserTargets;
use crate::core::MinifyLevel;
use crate::debug;
use crate::task::{Asset, TransformError};

const MAP_COMMENT: &str = "//# sourceMappingURL=";

fn map_error(error: SourceMapError) -> TransformError {
    TransformError::Invalid(format!("source map: {error}"))
}

// ============================================================================
// JavaScript
// ============================================================================

/// Minify JavaScript with oxc.
pub struct MinifyJs;

impl Transform for MinifyJs {
    fn name(&self) -> &'static str {
        "minify-js"
    }

    fn apply(&self, asset: Asset, env: &TransformEnv<'_>) -> Result<Vec<Asset>, TransformError> {
        let source = asset.text()?;
        let code = minify_js(source, &asset.origin, env.mode.minify, env.mode.source_maps)?;
        Ok(vec![asset.with_contents(code.into_bytes())])
    }
}

/// Minify JavaScript source code.
///
/// With `keep_map`, a trailing inline source map is remapped onto the
/// minified output instead of being dropped.
pub fn minify_js(
    source: &str,
    filename: &str,
    level: MinifyLevel,
    keep_map: bool,
) -> Result<String, TransformError> {
    let (source, input_map) = split_inline_map(source);
    let input_map = input_map.filter(|_| keep_map);

    let allocator = Allocator::default();
    let source_type = SourceType::mjs();
    let ret = Parser::new(&allocator, source, source_type).parse();
    if let Some(error) = ret.errors.first() {
        return Err(TransformError::Parse {
            kind: "js",
            message: error.to_string(),
        });
    }

    let aggressive = level == MinifyLevel::Aggressive;
    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: aggressive.then(MangleOptions::default),
        compress: Some(if aggressive {
            CompressOptions::smallest()
        } else {
            CompressOptions::safest()
        }),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);

    let comments = if aggressive {
        CommentOptions::disabled()
    } else {
        CommentOptions::default()
    };
    let output = Codegen::new()
        .with_options(CodegenOptions {
            minify: aggressive,
            comments,
            source_map_path: input_map.map(|_| PathBuf::from(filename)),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program);

    let (Some(input_map), Some(map)) = (input_map, output.map) else {
        return Ok(output.code);
    };
    let url = compose_map(&map.to_json_string(), input_map).map_err(map_error)?;
    Ok(format!("{}\n{MAP_COMMENT}{url}\n", output.code.trim_end()))
}

/// Split a trailing `//# sourceMappingURL=data:...` comment off a script.
fn split_inline_map(source: &str) -> (&str, Option<&str>) {
    let Some(at) = source.rfind(MAP_COMMENT) else {
        return (source, None);
    };
    let url = source[at + MAP_COMMENT.len()..].trim();
    if !url.starts_with("data:") || url.contains(char::is_whitespace) {
        return (source, None);
    }
    (&source[..at], Some(url))
}

/// Chain the minifier's map onto the tool's map, as a data URL.
///
/// An unreadable tool map leaves the minifier's map pointing at the
/// tool output.
fn compose_map(generated: &str, input_url: &str) -> Result<String, SourceMapError> {
    let mut map = SourceMap::from_json("/", generated)?;
    match SourceMap::from_data_url("/", input_url) {
        Ok(mut input) => map.extends(&mut input)?,
        Err(e) => debug!("minify"; "unreadable inline source map: {}", e),
    }
    map.to_data_url(None)
}

// ============================================================================
// CSS
// ============================================================================

/// Vendor prefixing for the configured browsers, plus minification in production.
pub struct ProcessCss {
    browsers: Browsers,
}

impl ProcessCss {
    pub fn new(targets: &BrowserTargets) -> Self {
        Self {
            browsers: browsers(targets),
        }
    }
}

impl Transform for ProcessCss {
    fn name(&self) -> &'static str {
        "process-css"
    }

    fn apply(&self, asset: Asset, env: &TransformEnv<'_>) -> Result<Vec<Asset>, TransformError> {
        let source = asset.text()?;
        let code = process_css(
            source,
            &asset.origin,
            self.browsers,
            env.mode.minify,
            env.mode.source_maps,
        )?;
        Ok(vec![asset.with_contents(code.into_bytes())])
    }
}

/// Prefix and print CSS source code.
///
/// With `keep_map`, an inline `/*# sourceMappingURL=data:... */` map is
/// composed into the output map; lightningcss reads it while parsing.
pub fn process_css(
    source: &str,
    filename: &str,
    browsers: Browsers,
    level: MinifyLevel,
    keep_map: bool,
) -> Result<String, TransformError> {
    let parse_error = |message: String| TransformError::Parse {
        kind: "css",
        message,
    };

    let options = ParserOptions {
        filename: filename.to_string(),
        ..ParserOptions::default()
    };
    let mut stylesheet = StyleSheet::parse(source, options).map_err(|e| parse_error(e.to_string()))?;
    let inline = stylesheet
        .source_map_url(0)
        .is_some_and(|url| url.starts_with("data:"));
    let mut map = (keep_map && inline).then(|| SourceMap::new("/"));

    let targets = Targets::from(browsers);
    stylesheet
        .minify(MinifyOptions {
            targets,
            ..MinifyOptions::default()
        })
        .map_err(|e| parse_error(e.to_string()))?;

    let result = stylesheet
        .to_css(PrinterOptions {
            minify: level == MinifyLevel::Aggressive,
            targets,
            source_map: map.as_mut(),
            ..PrinterOptions::default()
        })
        .map_err(|e| parse_error(e.to_string()))?;

    let Some(mut map) = map else {
        return Ok(result.code);
    };
    let url = map.to_data_url(None).map_err(map_error)?;
    Ok(format!("{}\n/*# sourceMappingURL={url} */\n", result.code.trim_end()))
}

/// Convert configured versions into lightningcss targets.
fn browsers(targets: &BrowserTargets) -> Browsers {
    let version = |v: &Option<String>| v.as_deref().and_then(BrowserTargets::encode);
    Browsers {
        chrome: version(&targets.chrome),
        edge: version(&targets.edge),
        firefox: version(&targets.firefox),
        safari: version(&targets.safari),
        ios_saf: version(&targets.ios_saf),
        samsung: version(&targets.samsung),
        android: version(&targets.android),
        opera: version(&targets.opera),
        ..Browsers::default()
    }
}
