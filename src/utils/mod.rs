//! Shared helpers: external commands, MIME types, paths.

pub mod exec;
pub mod mime;
pub mod path;

/// Pluralize a count for log lines: `plural_count(3, "file")` -> `3 files`.
pub fn plural_count(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plural_count() {
        assert_eq!(plural_count(0, "file"), "0 files");
        assert_eq!(plural_count(1, "file"), "1 file");
        assert_eq!(plural_count(7, "asset"), "7 assets");
    }
}
