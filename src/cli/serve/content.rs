//! Live reload script injection.

use crate::embed::serve::LIVERELOAD_PATH;
use crate::utils::mime;

/// Inject the live reload client if the body is HTML and the hub is running.
pub fn maybe_inject_livereload(body: Vec<u8>, content_type: &str, ws_port: Option<u16>) -> Vec<u8> {
    match (mime::is_html(content_type), ws_port) {
        (true, Some(_)) => inject_livereload_script(&body),
        _ => body,
    }
}

/// Inject the script tag before `</body>`
fn inject_livereload_script(content: &[u8]) -> Vec<u8> {
    let script = format!(r#"<script src="{LIVERELOAD_PATH}"></script>"#);
    let script_bytes = script.as_bytes();

    const PATTERN: &[u8] = b"</body>";

    let pos = content
        .windows(PATTERN.len())
        .rposition(|w| w.eq_ignore_ascii_case(PATTERN))
        .unwrap_or(content.len());

    let mut result = Vec::with_capacity(content.len() + script_bytes.len());
    result.extend_from_slice(&content[..pos]);
    result.extend_from_slice(script_bytes);
    result.extend_from_slice(&content[pos..]);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::mime::types::{CSS, HTML};

    #[test]
    fn test_inject_before_body_end() {
        let body = b"<html><body><p>hi</p></BODY></html>".to_vec();
        let out = String::from_utf8(maybe_inject_livereload(body, HTML, Some(35729))).unwrap();
        assert_eq!(
            out,
            format!(r#"<html><body><p>hi</p><script src="{LIVERELOAD_PATH}"></script></BODY></html>"#)
        );
    }

    #[test]
    fn test_no_body_tag_appends() {
        let out = maybe_inject_livereload(b"<p>hi</p>".to_vec(), HTML, Some(1));
        assert!(out.ends_with(b"</script>"));
    }

    #[test]
    fn test_untouched_without_hub_or_html() {
        let body = b"<body></body>".to_vec();
        assert_eq!(maybe_inject_livereload(body.clone(), HTML, None), body);
        assert_eq!(maybe_inject_livereload(body.clone(), CSS, Some(1)), body);
    }
}
