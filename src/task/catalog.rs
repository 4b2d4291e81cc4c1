//! The fixed set of tasks, built from configuration.
//!
//! | Task          | Chain                                                  |
//! |---------------|--------------------------------------------------------|
//! | `layout`      | template command → `.html`                             |
//! | `styles`      | preprocessor → `.css` → `.min` → lightningcss          |
//! | `scripts`     | bundler (fail-soft) → oxc → `.min`                     |
//! | `fonts`       | woff command ∥ woff2 command                            |
//! | `img`         | copy                                                   |
//! | `svg-sprites` | stack sprite                                           |
//! | `resources`   | copy                                                   |
//! | `recompress`  | Tinify (production only)                               |

use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use super::transform::{
    ExternalCommand, FailSoft, FanOut, MinifyJs, Passthrough, ProcessCss, Recompress, Rename,
    SpriteStack, Transform,
};
use super::{GlobSelector, Task};
use crate::config::SiteConfig;
use crate::core::BuildMode;
use crate::log;

pub const LAYOUT: &str = "layout";
pub const STYLES: &str = "styles";
pub const SCRIPTS: &str = "scripts";
pub const FONTS: &str = "fonts";
pub const IMG: &str = "img";
pub const SVG_SPRITES: &str = "svg-sprites";
pub const RESOURCES: &str = "resources";
pub const RECOMPRESS: &str = "recompress";

/// Tasks with no ordering between them, run as one stage.
pub const INDEPENDENT: [&str; 6] = [LAYOUT, SCRIPTS, FONTS, RESOURCES, IMG, SVG_SPRITES];

/// Stylesheet partials are only ever imported.
const PARTIALS: &[&str] = &["**/_*.scss"];

/// Build the task called `name`.
pub fn task(name: &str, config: &SiteConfig, mode: BuildMode) -> Result<Task> {
    let task = match name {
        LAYOUT => layout(config, mode),
        STYLES => styles(config, mode),
        SCRIPTS => scripts(config, mode),
        FONTS => fonts(config, mode),
        IMG => img(config, mode),
        SVG_SPRITES => svg_sprites(config, mode),
        RESOURCES => resources(config, mode),
        _ => bail!("unknown task `{name}`"),
    };
    task.with_context(|| format!("invalid globs for task `{name}`"))
}

/// Build several tasks in order.
pub fn tasks(names: &[&str], config: &SiteConfig, mode: BuildMode) -> Result<Vec<Task>> {
    names.iter().map(|name| task(name, config, mode)).collect()
}

/// Every task the watch loop binds: the independent set plus styles.
pub fn watched(config: &SiteConfig, mode: BuildMode) -> Result<Vec<Task>> {
    let mut names = INDEPENDENT.to_vec();
    names.push(STYLES);
    tasks(&names, config, mode)
}

/// The production recompression task, if it can run.
///
/// Returns `None` when disabled or when no API key is configured.
pub fn recompress(config: &SiteConfig, mode: BuildMode) -> Result<Option<Task>> {
    let images = &config.images;
    if !mode.recompress || !images.recompress {
        return Ok(None);
    }
    let Some(key) = images.resolve_api_key() else {
        log!("img"; "no Tinify key (images.api_key or ${}), recompression skipped", images.api_key_env);
        return Ok(None);
    };

    let chain = chain([Box::new(Recompress::new(key, images.api_url.clone()))]);
    Ok(Some(Task {
        name: RECOMPRESS,
        inputs: GlobSelector::new(&images.input)?,
        watch: GlobSelector::new::<&str>(&[])?,
        output: output_dir(config, &images.output),
        chain,
        mode,
    }))
}

// ============================================================================
// Task definitions
// ============================================================================

fn layout(config: &SiteConfig, mode: BuildMode) -> Result<Task, globset::Error> {
    let layout = &config.layout;
    let args = if mode.pretty { &layout.dev_args } else { &layout.build_args };
    let compile = ExternalCommand::new(LAYOUT, &layout.command, args).output_extension(&layout.extension);

    Ok(Task {
        name: LAYOUT,
        inputs: GlobSelector::new(&layout.input)?,
        watch: GlobSelector::new(&layout.watch)?,
        output: output_dir(config, &layout.output),
        chain: chain([Box::new(compile)]),
        mode,
    })
}

fn styles(config: &SiteConfig, mode: BuildMode) -> Result<Task, globset::Error> {
    let styles = &config.styles;
    let args = if mode.source_maps { &styles.dev_args } else { &styles.build_args };
    let compile = ExternalCommand::new(STYLES, &styles.command, args).output_extension("css");

    Ok(Task {
        name: STYLES,
        inputs: GlobSelector::with_excludes(&styles.input, PARTIALS)?,
        watch: GlobSelector::new(&styles.watch)?,
        output: output_dir(config, &styles.output),
        chain: chain([
            Box::new(compile),
            Box::new(Rename::suffix(".min")),
            Box::new(ProcessCss::new(&styles.targets)),
        ]),
        mode,
    })
}

fn scripts(config: &SiteConfig, mode: BuildMode) -> Result<Task, globset::Error> {
    let scripts = &config.scripts;
    let args = if mode.source_maps { &scripts.dev_args } else { &scripts.build_args };
    let bundle = ExternalCommand::new(SCRIPTS, &scripts.command, args).output_extension("js");

    Ok(Task {
        name: SCRIPTS,
        inputs: GlobSelector::new(&scripts.input)?,
        watch: GlobSelector::new(&scripts.watch)?,
        output: output_dir(config, &scripts.output),
        chain: chain([
            Box::new(FailSoft::new(bundle)),
            Box::new(MinifyJs),
            Box::new(Rename::suffix(".min")),
        ]),
        mode,
    })
}

fn fonts(config: &SiteConfig, mode: BuildMode) -> Result<Task, globset::Error> {
    let fonts = &config.fonts;
    let woff = ExternalCommand::new(FONTS, &fonts.woff, &[]).output_extension("woff");
    let woff2 = ExternalCommand::new(FONTS, &fonts.woff2, &[]).output_extension("woff2");

    Ok(Task {
        name: FONTS,
        inputs: GlobSelector::new(&fonts.input)?,
        watch: GlobSelector::new(&fonts.watch)?,
        output: output_dir(config, &fonts.output),
        chain: chain([Box::new(FanOut::new(vec![chain([Box::new(woff)]), chain([Box::new(woff2)])]))]),
        mode,
    })
}

fn img(config: &SiteConfig, mode: BuildMode) -> Result<Task, globset::Error> {
    let images = &config.images;
    Ok(Task {
        name: IMG,
        inputs: GlobSelector::new(&images.input)?,
        watch: GlobSelector::new(&images.watch)?,
        output: output_dir(config, &images.output),
        chain: chain([Box::new(Passthrough)]),
        mode,
    })
}

fn svg_sprites(config: &SiteConfig, mode: BuildMode) -> Result<Task, globset::Error> {
    let images = &config.images;
    Ok(Task {
        name: SVG_SPRITES,
        inputs: GlobSelector::new(&images.sprite_input)?,
        watch: GlobSelector::new(&images.sprite_watch)?,
        output: output_dir(config, &images.output),
        chain: chain([Box::new(SpriteStack::new(images.sprite_name.clone()))]),
        mode,
    })
}

fn resources(config: &SiteConfig, mode: BuildMode) -> Result<Task, globset::Error> {
    let resources = &config.resources;
    Ok(Task {
        name: RESOURCES,
        inputs: GlobSelector::new(&resources.input)?,
        watch: GlobSelector::new(&resources.watch)?,
        output: output_dir(config, &resources.output),
        chain: chain([Box::new(Passthrough)]),
        mode,
    })
}

// ============================================================================
// Helpers
// ============================================================================

fn chain<const N: usize>(steps: [Box<dyn Transform>; N]) -> Vec<Box<dyn Transform>> {
    steps.into()
}

/// `relative` below the output root; empty means the root itself.
fn output_dir(config: &SiteConfig, relative: &str) -> PathBuf {
    let relative = relative.trim_matches('/');
    if relative.is_empty() {
        config.output_dir().to_path_buf()
    } else {
        config.output_dir().join(relative)
    }
}
