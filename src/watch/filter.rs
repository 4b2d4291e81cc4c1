//! Raw notify events → source-relative paths worth a re-run.

use std::path::Path;

use notify::event::ModifyKind;
use notify::{Event, EventKind};

use crate::utils::path::{normalize_path, to_slash};

/// Source-relative `/` paths touched by `event`.
///
/// Empty for metadata-only changes, access events, editor artifacts and
/// anything outside `source`.
pub(super) fn changed_paths(event: &Event, source: &Path) -> Vec<String> {
    if !is_content_change(&event.kind) {
        return Vec::new();
    }

    event
        .paths
        .iter()
        .filter(|path| !is_temp_file(path))
        .filter_map(|path| {
            let path = normalize_path(path);
            let relative = path.strip_prefix(source).ok()?;
            let relative = to_slash(relative);
            (!relative.is_empty()).then_some(relative)
        })
        .collect()
}

fn is_content_change(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        // mtime/chmod noise would loop with tasks that touch their inputs
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    }
}

/// Editor swap, backup and lock files.
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "swx" | "tmp")
        || name.ends_with('~')
        || name.starts_with(".#")
        || (name.starts_with('#') && name.ends_with('#'))
        // vim checks directory writability with this name
        || name == "4913"
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind, RemoveKind};
    use std::path::PathBuf;

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        let mut event = Event::new(kind);
        for path in paths {
            event = event.add_path(PathBuf::from(path));
        }
        event
    }

    const SOURCE: &str = "/gild-watch-test/src";

    #[test]
    fn test_relative_paths() {
        let e = event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/gild-watch-test/src/scss/main.scss", "/gild-watch-test/src/index.pug"],
        );
        assert_eq!(
            changed_paths(&e, Path::new(SOURCE)),
            vec!["scss/main.scss", "index.pug"]
        );
    }

    #[test]
    fn test_create_and_remove_count() {
        let source = Path::new(SOURCE);
        let created = event(EventKind::Create(CreateKind::File), &["/gild-watch-test/src/img/a.png"]);
        let removed = event(EventKind::Remove(RemoveKind::File), &["/gild-watch-test/src/img/b.png"]);
        assert_eq!(changed_paths(&created, source), vec!["img/a.png"]);
        assert_eq!(changed_paths(&removed, source), vec!["img/b.png"]);
    }

    #[test]
    fn test_metadata_and_access_ignored() {
        let source = Path::new(SOURCE);
        let meta = event(
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime)),
            &["/gild-watch-test/src/js/main.js"],
        );
        let access = event(
            EventKind::Access(AccessKind::Read),
            &["/gild-watch-test/src/js/main.js"],
        );
        assert!(changed_paths(&meta, source).is_empty());
        assert!(changed_paths(&access, source).is_empty());
    }

    #[test]
    fn test_editor_artifacts_ignored() {
        let e = event(
            EventKind::Create(CreateKind::File),
            &[
                "/gild-watch-test/src/scss/.main.scss.swp",
                "/gild-watch-test/src/scss/main.scss~",
                "/gild-watch-test/src/scss/#main.scss#",
                "/gild-watch-test/src/scss/.#main.scss",
                "/gild-watch-test/src/scss/4913",
                "/gild-watch-test/src/scss/main.scss.tmp",
            ],
        );
        assert!(changed_paths(&e, Path::new(SOURCE)).is_empty());
    }

    #[test]
    fn test_outside_source_ignored() {
        let e = event(
            EventKind::Create(CreateKind::File),
            &["/gild-watch-test/dist/css/main.min.css", "/gild-watch-test/src"],
        );
        assert!(changed_paths(&e, Path::new(SOURCE)).is_empty());
    }
}
