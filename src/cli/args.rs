//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// gild asset pipeline CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, disable_version_flag = true)]
pub struct Cli {
    /// Print version
    #[arg(long, action = clap::ArgAction::Version)]
    version: Option<bool>,

    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path, searched upward from the current directory
    #[arg(short = 'C', long, global = true, default_value = "gild.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long, global = true)]
    pub verbose: bool,

    /// subcommands (default: dev)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Clean, build every task, then watch and serve with live reload
    #[command(visible_alias = "d")]
    Dev {
        #[command(flatten)]
        serve: ServeArgs,
    },

    /// Remove the output directory
    Clean,

    /// Compile markup templates
    Layout,

    /// Compile stylesheets
    Styles,

    /// Bundle and minify scripts
    Scripts,

    /// Convert TrueType fonts to woff and woff2
    Fonts,

    /// Stack SVG icons into one sprite
    #[command(name = "svg-sprites", alias = "svgSprites")]
    SvgSprites,

    /// Copy raster images
    Img,

    /// Copy static resources
    Resources,

    /// Full production build: tasks, recompression, cache busting
    #[command(visible_alias = "b")]
    Build {
        /// Abort on the first failed stage
        #[arg(short, long)]
        strict: bool,
    },

    /// Fingerprint assets and rewrite entry documents
    Cache,

    /// Upload files newer than their remote copies over FTP
    Deploy {
        /// Number of concurrent FTP sessions
        #[arg(short, long)]
        parallel: Option<usize>,
    },
}

/// Preview server overrides for the dev command.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
    #[arg(short, long)]
    pub interface: Option<std::net::IpAddr>,

    /// Port number to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Enable file watching for live reload
    #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub watch: Option<bool>,
}

impl Cli {
    /// The effective command; no subcommand means `dev`.
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Dev {
            serve: ServeArgs::default(),
        })
    }
}

impl Commands {
    /// Task name for single-task commands.
    pub const fn task_name(&self) -> Option<&'static str> {
        match self {
            Self::Layout => Some("layout"),
            Self::Styles => Some("styles"),
            Self::Scripts => Some("scripts"),
            Self::Fonts => Some("fonts"),
            Self::SvgSprites => Some("svg-sprites"),
            Self::Img => Some("img"),
            Self::Resources => Some("resources"),
            _ => None,
        }
    }
}
