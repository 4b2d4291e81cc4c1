//! Task composition.
//!
//! A pipeline is an ordered list of stages; the tasks of one stage run
//! concurrently and the next stage starts only after all of them returned.
//!
//! ```text
//! development: clean ─▶ [layout scripts fonts resources img svg-sprites] ─▶ [styles] ─▶ watch
//! production:  clean ─▶ [layout scripts fonts resources img svg-sprites] ─▶ [styles]
//!                    ─▶ [recompress] ─▶ fingerprint ─▶ rewrite
//! ```
//!
//! Styles run last as declared, not because anything feeds them.

mod clean;

pub use clean::clean;

use std::time::Instant;

use anyhow::{Result, bail};
use rayon::prelude::*;

use crate::config::SiteConfig;
use crate::core::{BuildContext, BuildMode};
use crate::task::catalog::{self, STYLES};
use crate::task::{Task, TaskOutcome};
use crate::utils::plural_count;
use crate::{log, revision, watch};

/// Tasks that run concurrently.
pub struct Stage {
    pub label: &'static str,
    pub tasks: Vec<Task>,
}

impl Stage {
    pub fn new(label: &'static str, tasks: Vec<Task>) -> Self {
        Self { label, tasks }
    }

    /// Run every task to completion, in parallel.
    pub fn run(&self, ctx: &BuildContext) -> Vec<(&'static str, TaskOutcome)> {
        self.tasks
            .par_iter()
            .map(|task| (task.name, task.run(ctx)))
            .collect()
    }
}

/// Ordered stages plus the failure policy.
pub struct Pipeline {
    pub stages: Vec<Stage>,
    /// Abort after the first stage with a failed task.
    pub strict: bool,
}

impl Pipeline {
    /// Independent tasks, then styles.
    pub fn development(config: &SiteConfig) -> Result<Self> {
        let mode = BuildMode::DEVELOPMENT;
        Ok(Self {
            stages: base_stages(config, mode)?,
            strict: false,
        })
    }

    /// Development stages plus recompression when a key is available.
    pub fn production(config: &SiteConfig) -> Result<Self> {
        let mode = BuildMode::PRODUCTION;
        let mut stages = base_stages(config, mode)?;
        if let Some(task) = catalog::recompress(config, mode)? {
            stages.push(Stage::new("recompress", vec![task]));
        }
        Ok(Self {
            stages,
            strict: config.build.strict,
        })
    }

    /// Run every stage in order and return each task's outcome.
    pub fn run(&self, ctx: &BuildContext) -> Result<Vec<(&'static str, TaskOutcome)>> {
        let mut outcomes = Vec::new();

        for stage in &self.stages {
            let started = Instant::now();
            let results = stage.run(ctx);

            let failed: Vec<_> = results
                .iter()
                .filter(|(_, outcome)| outcome.is_failed())
                .map(|(name, _)| *name)
                .collect();
            for (name, outcome) in &results {
                log!(name; "{}", outcome.summary());
            }
            crate::debug!("build"; "stage {} in {:?}", stage.label, started.elapsed());

            if self.strict && !failed.is_empty() {
                bail!("stage `{}` failed: {}", stage.label, failed.join(", "));
            }
            outcomes.extend(results);
        }

        Ok(outcomes)
    }
}

fn base_stages(config: &SiteConfig, mode: BuildMode) -> Result<Vec<Stage>> {
    Ok(vec![
        Stage::new("tasks", catalog::tasks(&catalog::INDEPENDENT, config, mode)?),
        Stage::new(STYLES, vec![catalog::task(STYLES, config, mode)?]),
    ])
}

// ============================================================================
// Entry points
// ============================================================================

/// Clean, build, then watch until the process is stopped.
///
/// Returns after the build when watching is disabled.
pub fn run_development(ctx: &BuildContext) -> Result<()> {
    let started = Instant::now();
    clean(&ctx.config)?;
    let outcomes = Pipeline::development(&ctx.config)?.run(ctx)?;
    log_result(&outcomes, started);

    if !ctx.config.serve.watch {
        return Ok(());
    }
    let tasks = catalog::watched(&ctx.config, ctx.mode)?;
    watch::run(ctx.clone(), tasks)
}

/// Clean, build, recompress, fingerprint and rewrite.
pub fn run_production(ctx: &BuildContext) -> Result<()> {
    let started = Instant::now();
    clean(&ctx.config)?;
    let outcomes = Pipeline::production(&ctx.config)?.run(ctx)?;
    revision::run(&ctx.config)?;
    log_result(&outcomes, started);
    Ok(())
}

/// Run a single named task.
pub fn run_task(ctx: &BuildContext, name: &str) -> Result<()> {
    let task = catalog::task(name, &ctx.config, ctx.mode)?;
    let outcome = task.run(ctx);
    log!(task.name; "{}", outcome.summary());
    if outcome.is_failed() {
        bail!("task `{}` failed", task.name);
    }
    Ok(())
}

fn log_result(outcomes: &[(&'static str, TaskOutcome)], started: Instant) {
    let written: usize = outcomes.iter().map(|(_, o)| o.written().len()).sum();
    let failed = outcomes.iter().filter(|(_, o)| o.is_failed()).count();
    if failed == 0 {
        log!("build"; "{} in {:.2?}", plural_count(written, "file"), started.elapsed());
    } else {
        log!(
            "build";
            "{} in {:.2?}, {} with errors",
            plural_count(written, "file"),
            started.elapsed(),
            plural_count(failed, "task")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::testing::{context, write};
    use std::fs;
    use tempfile::TempDir;

    /// Fails on `!error`, otherwise echoes the input file.
    const FAKE_SASS: &str = r#"
[styles]
command = ["sh", "-c", "if grep -q '!error' \"$GILD_INPUT\"; then echo 'expected \"}\"' >&2; exit 1; fi; cat \"$GILD_INPUT\""]
dev_args = []
"#;

    #[cfg(unix)]
    #[test]
    fn test_styles_scenario() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/scss/a.scss", ".a { color: red; !error");
        write(dir.path(), "src/scss/b.scss", ".b { color: blue; }");
        write(dir.path(), "src/scss/_vars.scss", "$x: 1;");
        let (ctx, config) = context(dir.path(), FAKE_SASS, BuildMode::DEVELOPMENT);

        let stage = Stage::new(STYLES, vec![catalog::task(STYLES, &config, ctx.mode).unwrap()]);
        let pipeline = Pipeline {
            stages: vec![stage],
            strict: false,
        };
        let outcomes = pipeline.run(&ctx).unwrap();

        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].1.is_failed());
        let css = config.output_dir().join("css");
        assert!(css.join("b.min.css").is_file());
        assert!(!css.join("a.min.css").exists());
        assert!(!css.join("_vars.min.css").exists());

        let notices = ctx.notifier.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].file, "scss/a.scss");
        assert!(notices[0].message.contains("expected"));
    }

    #[cfg(unix)]
    #[test]
    fn test_strict_pipeline_aborts() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/scss/a.scss", "!error");
        let (ctx, config) = context(dir.path(), FAKE_SASS, BuildMode::PRODUCTION);

        let pipeline = Pipeline {
            stages: vec![
                Stage::new(STYLES, vec![catalog::task(STYLES, &config, ctx.mode).unwrap()]),
                Stage::new("resources", vec![catalog::task("resources", &config, ctx.mode).unwrap()]),
            ],
            strict: true,
        };
        let err = pipeline.run(&ctx).unwrap_err();
        assert!(err.to_string().contains("stage `styles` failed"));
    }

    /// Inlines `import … from './x.js'` lines, like a bundler would.
    const FAKE_BUNDLER: &str = r#"dir=$(dirname "$1")
sed -n "s/^import .* from '\.\/\(.*\)';$/\1/p" "$1" | while read -r dep; do
  sed 's/^export //' "$dir/$dep"
done
grep -v '^import ' "$1"
"#;

    #[cfg(unix)]
    #[test]
    fn test_scripts_scenario() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "bundle.sh", FAKE_BUNDLER);
        write(
            dir.path(),
            "src/js/util.js",
            "export function greet() { return 'from util'; }\n",
        );
        write(
            dir.path(),
            "src/js/main.js",
            "import { greet } from './util.js';\nconsole.log(greet(), 'from main');\n",
        );
        let toml = r#"
[scripts]
command = ["sh", "$GILD_ROOT/bundle.sh", "$GILD_INPUT"]
dev_args = []
"#;
        let (ctx, config) = context(dir.path(), toml, BuildMode::DEVELOPMENT);

        run_task(&ctx, "scripts").unwrap();

        let js = config.output_dir().join("js");
        let files: Vec<_> = fs::read_dir(&js).unwrap().map(|e| e.unwrap().file_name()).collect();
        assert_eq!(files, vec!["main.min.js"]);
        let code = fs::read_to_string(js.join("main.min.js")).unwrap();
        assert!(code.contains("from util"));
        assert!(code.contains("from main"));
    }

    #[cfg(unix)]
    #[test]
    fn test_bundler_failure_is_soft() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/js/main.js", "console.log(1);\n");
        let toml = "[scripts]\ncommand = [\"sh\", \"-c\", \"exit 1\"]\ndev_args = []\n";
        let (ctx, config) = context(dir.path(), toml, BuildMode::DEVELOPMENT);

        run_task(&ctx, "scripts").unwrap();

        assert!(!config.output_dir().join("js/main.min.js").exists());
        assert!(ctx.notifier.notices().is_empty());
    }

    /// Every task wired to a stand-in tool that echoes its input.
    const ECHO_TOOLS: &str = r#"
[layout]
command = ["cat"]
dev_args = []
[styles]
command = ["cat", "$GILD_INPUT"]
dev_args = []
build_args = []
[scripts]
command = ["cat", "$GILD_INPUT"]
dev_args = []
[fonts]
woff = ["cp", "$GILD_INPUT", "$GILD_OUTPUT"]
woff2 = ["cat"]
[images]
api_key_env = "GILD_TEST_NO_SUCH_KEY"
[serve]
watch = false
"#;

    const INDEX: &str = r#"<link rel="stylesheet" href="css/main.min.css">
<link rel="preload" href="fonts/a.woff2">
<img src="img/logo.png"><svg><use href="img/sprite.svg#icon"></use></svg>
<script src="js/main.min.js"></script>
"#;

    fn site(dir: &std::path::Path) {
        write(dir, "src/index.pug", INDEX);
        write(dir, "src/scss/main.scss", ".a { color: red; }\n.b { user-select: none; }\n");
        write(dir, "src/js/main.js", "console.log('hi');\n");
        write(dir, "src/fonts/a.ttf", "glyphs");
        write(dir, "src/img/logo.png", "png");
        write(
            dir,
            "src/img/icon.svg",
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 1 1"><path d="M0 0h1v1z"/></svg>"#,
        );
        write(dir, "src/resources/robots.txt", "User-agent: *");
        write(dir, "dist/stale.css", "old");
    }

    #[cfg(unix)]
    #[test]
    fn test_run_production_builds_site() {
        let dir = TempDir::new().unwrap();
        site(dir.path());
        let (ctx, config) = context(dir.path(), ECHO_TOOLS, BuildMode::PRODUCTION);

        run_production(&ctx).unwrap();

        let output = config.output_dir();
        assert!(!output.join("stale.css").exists());
        assert!(output.join("resources/robots.txt").is_file());
        assert!(ctx.notifier.notices().is_empty());

        let manifest = revision::Manifest::load(&output.join("rev.json")).unwrap();
        for key in [
            "css/main.min.css",
            "js/main.min.js",
            "fonts/a.woff",
            "fonts/a.woff2",
            "img/logo.png",
            "img/sprite.svg",
        ] {
            let revved = manifest.get(key).unwrap_or_else(|| panic!("{key} not fingerprinted"));
            assert!(output.join(revved).is_file(), "{revved} missing");
            assert!(!output.join(key).exists(), "{key} left behind");
        }

        let html = fs::read_to_string(output.join("index.html")).unwrap();
        for key in ["css/main.min.css", "fonts/a.woff2", "img/logo.png", "img/sprite.svg", "js/main.min.js"] {
            let revved = manifest.get(key).unwrap();
            assert!(html.contains(revved), "{revved} not referenced");
            assert!(!html.contains(&format!("\"{key}")), "{key} not rewritten");
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_run_development_builds_site() {
        let dir = TempDir::new().unwrap();
        site(dir.path());
        let (ctx, config) = context(dir.path(), ECHO_TOOLS, BuildMode::DEVELOPMENT);

        run_development(&ctx).unwrap();

        let output = config.output_dir();
        assert!(!output.join("stale.css").exists());
        for built in [
            "index.html",
            "css/main.min.css",
            "js/main.min.js",
            "fonts/a.woff",
            "fonts/a.woff2",
            "img/logo.png",
            "img/sprite.svg",
            "resources/robots.txt",
        ] {
            assert!(output.join(built).is_file(), "{built} missing");
        }
        assert!(!output.join("rev.json").exists());
    }

    #[test]
    fn test_production_stages() {
        let dir = TempDir::new().unwrap();
        let toml = "[images]\napi_key_env = \"GILD_TEST_NO_SUCH_KEY\"\n[build]\nstrict = true\n";
        let (_, config) = context(dir.path(), toml, BuildMode::PRODUCTION);

        let pipeline = Pipeline::production(&config).unwrap();
        let labels: Vec<_> = pipeline.stages.iter().map(|s| s.label).collect();
        assert_eq!(labels, vec!["tasks", STYLES]);
        assert!(pipeline.strict);
        assert_eq!(pipeline.stages[0].tasks.len(), 6);
    }
}
