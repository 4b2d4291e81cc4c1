//! Build mode flags.

/// How aggressively outputs are minified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinifyLevel {
    /// Safe compression, no mangling, readable output.
    Light,
    /// Smallest output: full compression and identifier mangling.
    Aggressive,
}

/// Mode-dependent behaviour of every task.
///
/// Tasks never branch on "dev vs prod" directly; they read the flag they
/// care about, so adding a mode means adding a row here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildMode {
    /// Short name, exported to external commands as `$GILD_MODE`.
    pub name: &'static str,

    /// Pretty-printed output (templates, CSS).
    pub pretty: bool,

    /// Keep or request source maps from external tools.
    pub source_maps: bool,

    /// Minification strength for built-in JS/CSS passes.
    pub minify: MinifyLevel,

    /// Run remote image recompression.
    pub recompress: bool,
}

impl BuildMode {
    /// Production mode: compact, aggressive, recompressed images.
    pub const PRODUCTION: Self = Self {
        name: "production",
        pretty: false,
        source_maps: false,
        minify: MinifyLevel::Aggressive,
        recompress: true,
    };

    /// Development mode: readable output with source maps.
    pub const DEVELOPMENT: Self = Self {
        name: "development",
        pretty: true,
        source_maps: true,
        minify: MinifyLevel::Light,
        recompress: false,
    };
}
